//! The seam between bru and whatever language model writes the text.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Instructions describing the kind of document wanted.
    pub system: String,
    /// The source material and the specific ask.
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Produces text for a [`Request`].
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &Request) -> Result<String>;
}

/// Runs an external command for every request.
///
/// The system instructions and the prompt are written to the command's
/// stdin, separated by a blank line, and the trimmed stdout is the result.
/// `max_tokens` and `temperature` are passed through the `BRU_MAX_TOKENS` and
/// `BRU_TEMPERATURE` environment variables.
///
/// ```no_run
/// use bru_docs::CommandGenerator;
///
/// let generator = CommandGenerator::new("llm -m gpt-4o-mini").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Splits `command` on whitespace and resolves the program on `PATH`.
    pub fn new(command: &str) -> Result<Self> {
        let mut words = command.split_whitespace();
        let name = words.next().ok_or_raise(|| ErrorKind::GeneratorNotFound(command.to_string()))?;
        let program = which::which(name).or_raise(|| ErrorKind::GeneratorNotFound(name.to_string()))?;
        tracing::debug!(program = %program.display(), "Resolved generator command");
        Ok(Self { program, args: words.map(String::from).collect() })
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    async fn generate(&self, request: &Request) -> Result<String> {
        let program = self.program.display().to_string();
        let failed = || ErrorKind::Generator(program.clone());
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("BRU_MAX_TOKENS", request.max_tokens.to_string())
            .env("BRU_TEMPERATURE", request.temperature.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .or_raise(failed)?;

        let mut stdin = child.stdin.take().ok_or_raise(failed)?;
        let input = format!("{}\n\n{}\n", request.system.trim(), request.prompt.trim());
        stdin.write_all(input.as_bytes()).await.or_raise(failed)?;
        drop(stdin);

        let output = child.wait_with_output().await.or_raise(failed)?;
        if !output.status.success() {
            tracing::warn!(program = %program, status = %output.status, "Generator command failed");
            exn::bail!(ErrorKind::Generator(format!("{program} exited with {}", output.status)));
        }
        let text = String::from_utf8(output.stdout).or_raise(failed)?;
        let text = text.trim();
        if text.is_empty() {
            exn::bail!(ErrorKind::Generator(format!("{program} produced no output")));
        }
        Ok(text.to_string())
    }
}

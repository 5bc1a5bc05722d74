//! One README summarizing every source file in the selected directories.

use crate::error::{ErrorKind, Result};
use crate::generator::{Generator, Request};
use crate::memo::{Memoized, memoize};
use crate::text::{code_fence, to_capital_case};
use crate::{MAX_GENERATE_CONCURRENCY, Options, Workspace, module_stem, selected_dirs};
use bru_cache::{CacheKey, Invalidated};
use bru_config::GeneratorConfig;
use exn::ResultExt;
use futures::{StreamExt, TryStreamExt, stream};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Config document the README generator remembers its answers in.
pub const README_CONFIG: &str = "creadme";
/// Variant extension of cached summaries.
pub const SUMMARY_EXTENSION: &str = ".md";

const SYSTEM: &str = "You are an expert technical writer. Your task is to generate a concise, clear, and accurate \
summary of the given file.
The summary should include:
- **Purpose**: Briefly describe the purpose of the file.
- **Functionality**: Summarize the main functionality provided by the file.
- **Key Functions**: List key functions or classes and their roles.

Avoid lengthy introductions or conclusions. The content should be straightforward and technically informative. \
You can include the file name e.g. file.ts but don't include the full path.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeReport {
    /// The README that was written.
    pub path: PathBuf,
    pub files: usize,
    /// Summaries that were not already cached.
    pub generated: usize,
    /// Outcome of `--cache-remove`, if one was requested and succeeded.
    pub removed: Option<Invalidated>,
}

fn request(key: &CacheKey, source: &str) -> Request {
    Request {
        system: SYSTEM.to_string(),
        prompt: format!(
            "Using the content provided below, create a summary for the file \"{key}\": {}",
            code_fence(source, "ts")
        ),
        max_tokens: 500,
        temperature: 0.5,
    }
}

async fn summarize(workspace: &Workspace, generator: &dyn Generator, key: &CacheKey) -> Result<Memoized> {
    memoize(workspace.cache(), key, SUMMARY_EXTENSION, move || async move {
        let source = workspace.read_source(key).await?;
        tracing::info!(key = %key, "Summarizing");
        generator.generate(&request(key, &source)).await
    })
    .await
}

/// Summaries grouped under their parent directory's name, in first-seen
/// order.
fn render(name: &str, selected: &[PathBuf], summaries: &[(CacheKey, Memoized)]) -> String {
    let mut sections: Vec<(&str, Vec<String>)> = Vec::new();
    for (key, summary) in summaries {
        let directory = key.parent().rsplit('/').next().unwrap_or_default();
        let entry = format!("### {}\n\n{}", to_capital_case(module_stem(key)), summary.content());
        match sections.iter_mut().find(|(d, _)| *d == directory) {
            Some((_, entries)) => entries.push(entry),
            None => sections.push((directory, vec![entry])),
        }
    }

    let title = selected
        .iter()
        .map(|dir| dir.file_name().map(|n| to_capital_case(&n.to_string_lossy())).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ");
    let body = sections
        .iter()
        .map(|(directory, entries)| format!("## {}\n\n{}", to_capital_case(directory), entries.join("\n\n")))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("# {title} Documentation\n\n{body}\n\ngenerated by **{name}**\n")
}

/// Writes `<output dir>/README.md` from per-file summaries, generating only
/// the ones missing from the cache.
///
/// The output directory defaults to the working root. Selected directories
/// come from `options`, else from the previous run; both are remembered.
#[instrument(level = "debug", skip_all)]
pub async fn readme(workspace: &Workspace, generator: &dyn Generator, options: Options) -> Result<ReadmeReport> {
    let removed = match &options.cache_remove {
        Some(raw) => workspace.remove_requested(raw, SUMMARY_EXTENSION).await,
        None => None,
    };

    let remembered = GeneratorConfig::read(workspace.cache_root(), README_CONFIG);
    let output_dir = options.output_dir.or(remembered.output_dir).unwrap_or_else(|| PathBuf::from("."));
    let selected = selected_dirs(options.selected_dirs, remembered.selected_dirs)?;
    GeneratorConfig { output_dir: Some(output_dir.clone()), selected_dirs: Some(selected.clone()), ..Default::default() }
        .write(workspace.cache_root(), README_CONFIG)
        .await
        .or_raise(|| ErrorKind::Config)?;

    let directories = workspace.normalize(&selected)?;
    let keys = workspace.discover(&directories).await?;
    let summaries: Vec<(CacheKey, Memoized)> = stream::iter(keys)
        .map(|key| async move {
            let summary = summarize(workspace, generator, &key).await?;
            Result::Ok((key, summary))
        })
        .buffered(MAX_GENERATE_CONCURRENCY)
        .try_collect()
        .await?;
    let generated = summaries.iter().filter(|(_, summary)| summary.was_generated()).count();

    let content = render(workspace.name(), &selected, &summaries);
    let (root, output) = workspace.output(&output_dir)?;
    let path = root.join("README.md");
    output.write(Path::new("README.md"), content.as_bytes()).await.or_raise(|| ErrorKind::Output(path.clone()))?;
    tracing::info!(path = %path.display(), files = summaries.len(), generated, "Wrote README");

    Ok(ReadmeReport { path, files: summaries.len(), generated, removed })
}

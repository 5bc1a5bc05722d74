use bru_cache::{DEFAULT_EXTENSION, ExtensionMap};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Documentation generator backed by a local content cache.
#[derive(Debug, Parser)]
#[command(name = "bru", version, about)]
pub struct Cli {
    /// Increase log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Namespace of the cache index and generator configs.
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Cache root, relative to the current directory unless absolute.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and maintain the cache directly.
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Summarize source files into a single README.
    Readme(GenerateArgs),
    /// Draft MDX pages and publish them into a documentation site.
    Draft(GenerateArgs),
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print the key if it is cached.
    Lookup { key: String },
    /// Print a cached variant. Exits non-zero on a miss.
    Read {
        key: String,
        #[arg(long, default_value = DEFAULT_EXTENSION)]
        ext: String,
    },
    /// Cache content for a key, from a file or stdin.
    Write {
        key: String,
        #[arg(long, default_value = DEFAULT_EXTENSION)]
        ext: String,
        /// File to read the content from instead of stdin.
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Remove a cached variant and its index entry.
    Remove {
        key: String,
        #[arg(long, default_value = DEFAULT_EXTENSION)]
        ext: String,
    },
    /// List every indexed key.
    List,
    /// Copy the cached variants of selected directories into an output tree.
    Copy {
        /// Output directory.
        #[arg(long)]
        output: PathBuf,
        /// Extension mapping such as `.ts=.mdx`. Repeatable.
        #[arg(long = "map", value_parser = parse_extension_map)]
        maps: Vec<ExtensionMap>,
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Output directory. Remembered for the next run.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Command that turns a prompt on stdin into text on stdout.
    #[arg(long, env = "BRU_GENERATOR", default_value = "llm")]
    pub generator: String,

    /// Drop a key's cached variant before generating.
    #[arg(long, value_name = "KEY")]
    pub cache_remove: Option<String>,

    /// Directories to document. Defaults to the ones used last time.
    pub dirs: Vec<PathBuf>,
}

fn parse_extension_map(s: &str) -> Result<ExtensionMap, String> {
    s.parse::<ExtensionMap>().map_err(|e| e.to_string())
}

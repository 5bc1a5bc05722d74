use super::IntoReport;
use crate::cli::CacheCommand;
use bru_cache::{Cache, CacheKey, Cached, CopyEvent, ExtensionMap, Invalidated, copy_selected};
use bru_config::Settings;
use bru_storage::BackendHandle;
use bru_storage::backend::LocalBackend;
use futures::TryStreamExt;
use miette::IntoDiagnostic;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

pub async fn run(command: CacheCommand, root: &Path, settings: &Settings) -> miette::Result<ExitCode> {
    let cache = Cache::open(settings.cache_root(root), &settings.namespace).into_report()?;
    match command {
        CacheCommand::Lookup { key } => {
            let key = CacheKey::new(&key).into_report()?;
            match cache.lookup(&key).await {
                Some(path) => {
                    println!("{}", path.display());
                    Ok(ExitCode::SUCCESS)
                },
                None => {
                    eprintln!("not cached: {key}");
                    Ok(ExitCode::FAILURE)
                },
            }
        },
        CacheCommand::Read { key, ext } => {
            let key = CacheKey::new(&key).into_report()?;
            match cache.check_and_read(&key, &ext).await {
                Cached::Hit(content) => {
                    print!("{content}");
                    Ok(ExitCode::SUCCESS)
                },
                Cached::Miss => {
                    eprintln!("cache miss");
                    Ok(ExitCode::FAILURE)
                },
            }
        },
        CacheCommand::Write { key, ext, from } => {
            let key = CacheKey::new(&key).into_report()?;
            let content = match from {
                Some(path) => tokio::fs::read_to_string(&path).await.into_diagnostic()?,
                None => {
                    let mut content = String::new();
                    tokio::io::stdin().read_to_string(&mut content).await.into_diagnostic()?;
                    content
                },
            };
            cache.write_through(&key, &content, &ext).await.into_report()?;
            println!("{}", key.blob_path(&ext).display());
            Ok(ExitCode::SUCCESS)
        },
        CacheCommand::Remove { key, ext } => {
            let key = CacheKey::new(&key).into_report()?;
            match cache.invalidate(&key, &ext).await.into_report()? {
                Invalidated::Removed => println!("removed: {key}"),
                Invalidated::AlreadyAbsent => println!("already absent: {key}"),
            }
            Ok(ExitCode::SUCCESS)
        },
        CacheCommand::List => {
            for bucket in cache.entries().await {
                // `a` and `a/a` share an entry; list both.
                println!("{}", bucket.candidates().join(" | "));
            }
            Ok(ExitCode::SUCCESS)
        },
        CacheCommand::Copy { output, maps, dirs } => {
            let output_root = root.join(output);
            let backend = LocalBackend::new("output", &output_root).into_report()?;
            let output: BackendHandle = Arc::new(backend);
            let mut map = ExtensionMap::default();
            map.extend(maps);

            let events = copy_selected(&cache, &output, root, &dirs, &map);
            futures::pin_mut!(events);
            while let Some(event) = events.try_next().await.into_report()? {
                match event {
                    CopyEvent::Started(directories) => {
                        tracing::debug!(?directories, output = %output_root.display(), "Copying cached files");
                    },
                    CopyEvent::DirectoryCopied { directory, copied, skipped } => {
                        println!("{directory}: {copied} copied, {skipped} skipped");
                    },
                    CopyEvent::Complete(summary) => {
                        println!(
                            "{} directories: {} copied, {} skipped",
                            summary.directories, summary.copied, summary.skipped
                        );
                    },
                }
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}

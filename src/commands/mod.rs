mod cache;
mod docs;

use crate::cli::{Cli, Command};
use bru_config::{Overrides, Settings};
use miette::IntoDiagnostic;
use std::process::ExitCode;

/// Converts library errors into reports for display.
///
/// The full error tree, with locations, is kept in the message; the short
/// form is logged at debug level alongside it.
pub(crate) trait IntoReport<T> {
    fn into_report(self) -> miette::Result<T>;
}

impl<T, E> IntoReport<T> for Result<T, exn::Exn<E>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_report(self) -> miette::Result<T> {
        self.map_err(|err| {
            tracing::debug!(error = %&*err, "Command failed");
            miette::miette!("{err:?}")
        })
    }
}

pub async fn run(cli: Cli) -> miette::Result<ExitCode> {
    let root = std::env::current_dir().into_diagnostic()?;
    let overrides = Overrides { namespace: cli.namespace, cache_dir: cli.cache_dir };
    let settings = Settings::load(&root, &overrides).into_report()?;
    match cli.command {
        Command::Cache(command) => cache::run(command, &root, &settings).await,
        Command::Readme(args) => docs::readme(args, &root, &settings).await,
        Command::Draft(args) => docs::draft(args, &root, &settings).await,
    }
}

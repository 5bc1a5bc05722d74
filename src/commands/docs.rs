use super::IntoReport;
use crate::cli::GenerateArgs;
use bru_config::Settings;
use bru_docs::{CommandGenerator, Options, Workspace};
use std::path::Path;
use std::process::ExitCode;

fn prepare(args: GenerateArgs, root: &Path, settings: &Settings) -> miette::Result<(Workspace, CommandGenerator, Options)> {
    let generator = CommandGenerator::new(&args.generator).into_report()?;
    let workspace = Workspace::open(root, settings).into_report()?;
    let options = Options { output_dir: args.output, selected_dirs: args.dirs, cache_remove: args.cache_remove };
    Ok((workspace, generator, options))
}

pub async fn readme(args: GenerateArgs, root: &Path, settings: &Settings) -> miette::Result<ExitCode> {
    let (workspace, generator, options) = prepare(args, root, settings)?;
    let report = bru_docs::readme(&workspace, &generator, options).await.into_report()?;
    println!("{} ({} files, {} generated)", report.path.display(), report.files, report.generated);
    Ok(ExitCode::SUCCESS)
}

pub async fn draft(args: GenerateArgs, root: &Path, settings: &Settings) -> miette::Result<ExitCode> {
    let (workspace, generator, options) = prepare(args, root, settings)?;
    let report = bru_docs::draft(&workspace, &generator, options).await.into_report()?;
    println!(
        "{} ({} files, {} generated, {} published, {} skipped)",
        report.output_dir.display(),
        report.files,
        report.generated,
        report.copy.copied,
        report.copy.skipped
    );
    Ok(ExitCode::SUCCESS)
}

mod cli;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use cli::{Cli, Command};
use tmsync::state_machine::JobReport;
use tmsync::tms::JobId;
use tmsync::translations::{Catalog, JsonTranslationFile};
use tmsync::{TmsConfig, TmsError};
use ui::JobProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = TmsConfig::load(cli.config.as_deref())?;
    if let Some(secs) = cli.check_interval {
        config.check_interval_secs = secs;
    }
    if let Some(secs) = cli.max_execution_time {
        config.max_execution_time_secs = secs;
    }
    let sync = config.build().context("invalid configuration")?;

    match cli.command {
        Command::Export { catalog, staging } => {
            let manager = Catalog::new(config.languages.clone());
            let mut reader = JsonTranslationFile::overwrite(&catalog);
            let mut writer = JsonTranslationFile::overwrite(&staging);

            let progress = JobProgress::start(&format!("Exporting {}", catalog.display()));
            let result = sync
                .export_translations(&manager, &mut reader, &mut writer, &staging)
                .await;
            finish(&progress, result, cli.json)?;
        }
        Command::Import {
            catalog,
            staging,
            languages,
        } => {
            let manager = Catalog::new(languages.unwrap_or_else(|| config.languages.clone()));
            let mut reader = JsonTranslationFile::overwrite(&staging);
            let mut writer = JsonTranslationFile::merge(&catalog);

            let progress = JobProgress::start(&format!("Importing into {}", catalog.display()));
            let result = sync
                .import_translations(&manager, &mut reader, &mut writer, &staging)
                .await;
            finish(&progress, result, cli.json)?;
        }
        Command::Status { direction, id } => {
            let direction = direction.into();
            let state = sync.job_state(direction, JobId(id)).await?;
            println!("{direction} job {id}: {state}");
        }
    }

    Ok(())
}

fn finish(progress: &JobProgress, result: Result<JobReport, TmsError>, json: bool) -> Result<()> {
    match result {
        Ok(report) => {
            progress.complete(&report);
            ui::print_report(&report, json)?;
            Ok(())
        }
        Err(err) => {
            progress.fail(&err);
            Err(err.into())
        }
    }
}

// Nível `info` por padrão, `debug` com --verbose; RUST_LOG tem precedência.
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();
}

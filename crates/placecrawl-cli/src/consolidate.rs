use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use placecrawl_core::AppConfig;
use placecrawl_store::{ConsolidationReport, Storage};

pub(crate) async fn run(config: AppConfig, output_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match output_dir {
        Some(output_dir) => AppConfig {
            output_dir,
            ..config
        },
        None => config,
    };

    let storage = Storage::from_config(&config).context("opening output storage")?;
    let report = placecrawl_store::consolidate(&storage, &config.master_prefix, Utc::now())
        .await
        .with_context(|| {
            format!(
                "consolidating {}",
                storage.location_of(&storage.partials_dir())
            )
        })?;

    println!("{}", format_report(&report));
    Ok(())
}

pub(crate) fn format_report(report: &ConsolidationReport) -> String {
    let master = report
        .master_location
        .as_deref()
        .unwrap_or("none (nothing to consolidate)");
    format!(
        "files read: {}\n\
         files skipped: {}\n\
         records in: {}\n\
         records out: {}\n\
         old masters removed: {}\n\
         master: {master}",
        report.files_read,
        report.files_skipped,
        report.records_in,
        report.records_out,
        report.masters_removed,
    )
}

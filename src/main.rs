//! Eventflow runtime - ingest daily telemetry logs and write rollup reports
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release
//! ```
//!
//! ## Environment Variables
//!
//! - METRICS_START - first date to process, YYYYMMDD (default: 20160201)
//! - METRICS_END - last date to process, YYYYMMDD (default: yesterday)
//! - DAY_STEP - process every nth day (default: 1)
//! - DATA_FOLDER - data root; reads <root>/clean, writes <root>/compiled
//! - REPORTS - comma-separated report names (default: all)
//! - EVENT_STEP - sample every nth line per file (default: 1)
//! - KEEP_TOP_EVENTS - keep only the first n lines per file
//! - POOL_SIZE - max log files with open streams at once (default: 10)
//! - DRY_RUN - set to 1 to skip writing report files
//! - QUIET - set to 1 to silence progress logging
//! - RUST_LOG - logging level (optional, default: info)

use eventflow::output::{flatten_bundle, JsonReportWriter, ReportWriterBackend};
use eventflow::{run, Config, ConfigOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::new(ConfigOptions::from_env())?;
    let dry_run = std::env::var("DRY_RUN")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    log::info!("🚀 Starting eventflow");
    log::info!("   Data folder: {}", config.data_folder.display());
    log::info!(
        "   Date range: {} - {} ({} dates)",
        config.dates.first().copied().unwrap_or(0),
        config.dates.last().copied().unwrap_or(0),
        config.num_dates
    );
    log::info!("   Reports: {}", config.reports.join(", "));
    log::info!("   Event step: {}", config.event_step);
    if let Some(top) = config.keep_top_events {
        log::info!("   Keep top events: {}", top);
    }

    tokio::fs::create_dir_all(&config.data_folder).await?;
    tokio::fs::create_dir_all(&config.compiled_data_folder).await?;

    let compiled_data_folder = config.compiled_data_folder.clone();
    let bundle = run(config).await?;

    if !bundle.missing_days.is_empty() {
        log::warn!("Missing days (date indices): {:?}", bundle.missing_days);
    }

    if dry_run {
        log::info!("Dry run, not writing reports");
        return Ok(());
    }

    let mut writer = JsonReportWriter::new(compiled_data_folder);
    for (name, data) in flatten_bundle(bundle) {
        writer.write_report(&name, &data).await?;
    }

    log::info!("✅ Done");
    Ok(())
}

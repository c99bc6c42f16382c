mod bootstrap;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use permit_core::settings::Settings;
use permit_data::analysis::run_analysis;

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("permit-flow v{} starting", env!("CARGO_PKG_VERSION"));

    let started = Instant::now();
    let config = settings.analysis_config();
    let paths = settings.analysis_paths();

    tracing::debug!("Config: {:?}, paths: {:?}", config, paths);

    let result = run_analysis(&paths, &config).with_context(|| {
        format!(
            "analysis of {} failed",
            settings.input_file_usage.display()
        )
    })?;

    let meta = &result.metadata;
    tracing::info!(
        "Summarized {} applications ({} skipped, {} output rows) and {} users",
        meta.applications_summarized,
        meta.applications_skipped,
        meta.application_rows,
        meta.users_summarized
    );
    tracing::info!(
        "Analysis took {:.3} seconds (load {:.3}s, aggregate {:.3}s)",
        started.elapsed().as_secs_f64(),
        meta.load_time_seconds,
        meta.aggregate_time_seconds
    );

    Ok(())
}

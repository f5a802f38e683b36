//! JSON output of a run's [`Report`].
//!
//! The file is written to `{json_output_dir}/{stem}.json`, where the stem is
//! the run's local timestamp (see [`super::file_stem`]).

use super::Report;
use crate::error::PipelineError;
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize `report` and write it under `json_output_dir`.
///
/// Returns the path of the written file.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(
    report: &Report<'_>,
    json_output_dir: &str,
    stem: &str,
) -> Result<String, PipelineError> {
    let json = serde_json::to_string_pretty(report)?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = format!("{}/{}.json", json_output_dir.trim_end_matches('/'), stem);
    fs::write(&path, json).await?;
    info!(%path, rows = report.table.len(), "Wrote JSON report");
    Ok(path)
}

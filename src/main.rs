//! # promo_extract
//!
//! Extracts promotions and discounts from company websites with an LLM and
//! consolidates them into one normalized table.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=sk-... promo_extract -u "https://a.example/promos, https://b.example" -j ./json -m ./markdown
//! ```
//!
//! ## Architecture
//!
//! The run is a sequential pipeline:
//! 1. **Fetching**: download each page and reduce it to its headings,
//!    paragraphs and list items ([`page_text`])
//! 2. **Extraction**: one structured LLM call per site, accepted only if
//!    every promotion has all eight fields ([`extract`])
//! 3. **Normalization**: one LLM call harmonizes categories across the
//!    whole batch, then day lists are canonicalized ([`normalize`])
//! 4. **Output**: the table, a weekday pivot and a category summary are
//!    written as JSON and Markdown ([`outputs`])

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cache;
mod cli;
mod config;
mod error;
mod extract;
mod models;
mod normalize;
mod outputs;
mod page_text;
mod pipeline;
mod utils;

use api::OpenAiAsk;
use cache::{BatchCache, CachedPipeline};
use cli::{Cli, parse_url_list};
use config::PipelineConfig;
use outputs::calendar::CalendarFilter;
use outputs::{Report, file_stem, json, markdown};
use page_text::PageFetcher;
use pipeline::{Pipeline, validate_inputs};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("promo_extract starting up");

    let args = Cli::parse();
    debug!(
        json_output_dir = %args.json_output_dir,
        markdown_output_dir = ?args.markdown_output_dir,
        "Parsed CLI arguments"
    );

    // Reject bad input before touching the network.
    let urls = parse_url_list(&args.urls);
    if let Err(e) = validate_inputs(&urls, &args.api_key) {
        error!(error = %e, "Invalid input");
        return Err(e.into());
    }
    info!(count = urls.len(), "URLs to process");

    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let config = PipelineConfig::load(args.config.as_deref()).await?;
    let fetcher = PageFetcher::new(config.fetch_timeout_secs, &config.user_agent)?;
    let api = OpenAiAsk::new(&config.api_base_url, &config.model);
    // One batch per process: the cache is empty here and only stores the result.
    let pipeline = CachedPipeline::new(
        Pipeline::new(fetcher, api),
        BatchCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        ),
    );

    // ---- Run the pipeline ----
    let batch = match pipeline.aggregate(&urls, &args.api_key).await {
        Ok(batch) => batch,
        Err(e) => {
            error!(error = %e, "Extraction failed");
            return Err(e.into());
        }
    };
    info!(records = batch.len(), "Extraction finished");

    // ---- Outputs ----
    let now = Local::now();
    let stem = file_stem(now);
    let calendar_filter = CalendarFilter {
        categories: args.categories.clone(),
        companies: args.companies.clone(),
    };
    let report = Report::build(&batch, &urls, &calendar_filter, now);

    let json_path = json::write_report(&report, &args.json_output_dir, &stem).await?;
    info!(path = %json_path, "JSON report written");

    if let Some(dir) = &args.markdown_output_dir {
        let md = markdown::report_to_markdown(&report);
        let path = format!("{}/{}.md", dir.trim_end_matches('/'), stem);
        let written = async {
            ensure_writable_dir(dir).await?;
            tokio::fs::write(&path, md).await
        }
        .await;
        match written {
            Ok(()) => info!(%path, "Markdown report written"),
            Err(e) => error!(%path, error = %e, "Failed writing Markdown"),
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        records = batch.len(),
        "Execution complete"
    );

    Ok(())
}

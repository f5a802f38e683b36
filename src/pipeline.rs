//! Corpus aggregation: the full scrape → extract → normalize run.
//!
//! ```text
//! urls ─▶ PageSource ─▶ page text ─▶ extract_promotions ─▶ per-site records
//!                                                              │ (append, input order)
//!                                                              ▼
//!                       day canonicalization ◀─ category normalization ◀─ batch
//! ```
//!
//! Sites are processed strictly one after another. A site whose URL is not
//! an absolute http(s) URL, whose page could not be fetched, or whose reply
//! fails the eight-field gate, is skipped.
//! LLM failures and a category count mismatch abort the run.

use crate::api::AskAsync;
use crate::error::PipelineError;
use crate::extract::extract_promotions;
use crate::models::ExtractionBatch;
use crate::normalize::{canonicalize_record_days, normalize_categories};
use crate::page_text::PageSource;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Check a run's inputs before any network call.
///
/// Rejects an empty URL list and a blank credential. Individual URLs are
/// checked per site by [`fetchable_url`].
pub fn validate_inputs(urls: &[String], credential: &str) -> Result<(), PipelineError> {
    if urls.is_empty() {
        return Err(PipelineError::EmptyUrlList);
    }
    if credential.trim().is_empty() {
        return Err(PipelineError::MissingCredential);
    }
    Ok(())
}

/// Why `url` cannot be fetched, or `None` for an absolute http(s) URL.
pub fn fetchable_url(url: &str) -> Option<String> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => None,
        Ok(parsed) => Some(format!("unsupported scheme {}", parsed.scheme())),
        Err(e) => Some(e.to_string()),
    }
}

/// The extraction pipeline over a page source and an LLM.
///
/// Holds no mutable state between runs: the same inputs always trigger the
/// same sequence of calls, which is what lets [`crate::cache`] memoize it.
#[derive(Debug)]
pub struct Pipeline<S, A> {
    pub(crate) source: S,
    pub(crate) api: A,
}

impl<S, A> Pipeline<S, A>
where
    S: PageSource,
    A: AskAsync,
{
    pub fn new(source: S, api: A) -> Self {
        Self { source, api }
    }

    /// Run the whole pipeline over `urls`, in order.
    #[instrument(level = "info", skip_all, fields(urls = urls.len()))]
    pub async fn aggregate(
        &self,
        urls: &[String],
        credential: &str,
    ) -> Result<ExtractionBatch, PipelineError> {
        validate_inputs(urls, credential)?;
        let t0 = Instant::now();
        let mut batch = ExtractionBatch::default();

        for url in urls {
            if let Some(reason) = fetchable_url(url) {
                warn!(%url, %reason, "Invalid URL; skipping site");
                continue;
            }
            info!(%url, "Processing site");
            let text = self.source.page_text(url).await;
            if text.is_empty() {
                debug!(%url, "No page text; skipping");
                continue;
            }
            let records = extract_promotions(&self.api, credential, url, &text).await?;
            if records.is_empty() {
                debug!(%url, "No accepted promotions; skipping");
                continue;
            }
            batch.extend_site(records);
        }

        if batch.is_empty() {
            info!("No promotions extracted; skipping category normalization");
        } else {
            normalize_categories(&self.api, credential, &mut batch.records).await?;
        }
        canonicalize_record_days(&mut batch.records);

        info!(
            records = batch.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Batch complete"
        );
        Ok(batch)
    }
}

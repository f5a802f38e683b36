//! Memoization of finished batches, outside the pipeline core.
//!
//! A batch is keyed by the ordered URL list plus the credential. The key is
//! a SHA-256 digest, so the credential itself is never held by the cache.
//! Entries expire after a TTL, and the least recently used entry is evicted
//! once the cache is full.
//!
//! The cache lives in memory for one process. A single CLI run aggregates
//! one batch, so it never hits there; it pays off when the same
//! [`CachedPipeline`] serves repeated requests, as a dashboard back end would.

use crate::api::AskAsync;
use crate::error::PipelineError;
use crate::models::ExtractionBatch;
use crate::page_text::PageSource;
use crate::pipeline::Pipeline;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Cache key for one `(urls, credential)` input.
pub fn batch_key(urls: &[String], credential: &str) -> String {
    let mut hasher = Sha256::new();
    for url in urls {
        hasher.update(url.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update([0xffu8]);
    hasher.update(credential.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug)]
struct Entry {
    batch: Arc<ExtractionBatch>,
    inserted: Instant,
    last_used: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    tick: u64,
}

/// TTL + LRU cache of finished batches.
#[derive(Debug)]
pub struct BatchCache {
    ttl: Duration,
    capacity: usize,
    state: Mutex<State>,
}

impl BatchCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            state: Mutex::new(State::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh cached batch for `key`, if any. Expired entries are dropped.
    pub fn get(&self, key: &str) -> Option<Arc<ExtractionBatch>> {
        let mut state = self.lock();
        state.tick += 1;
        let tick = state.tick;
        let entry = state.entries.get_mut(key)?;
        if entry.inserted.elapsed() < self.ttl {
            entry.last_used = tick;
            return Some(Arc::clone(&entry.batch));
        }
        state.entries.remove(key);
        debug!("Cached batch expired");
        None
    }

    /// Store `batch` under `key`, evicting the least recently used entry if full.
    pub fn insert(&self, key: String, batch: Arc<ExtractionBatch>) {
        let mut state = self.lock();
        state.tick += 1;
        let tick = state.tick;
        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
                debug!("Evicted least recently used batch");
            }
        }
        state.entries.insert(
            key,
            Entry {
                batch,
                inserted: Instant::now(),
                last_used: tick,
            },
        );
    }
}

/// A [`Pipeline`] fronted by a [`BatchCache`].
#[derive(Debug)]
pub struct CachedPipeline<S, A> {
    pipeline: Pipeline<S, A>,
    cache: BatchCache,
}

impl<S, A> CachedPipeline<S, A>
where
    S: PageSource,
    A: AskAsync,
{
    pub fn new(pipeline: Pipeline<S, A>, cache: BatchCache) -> Self {
        Self { pipeline, cache }
    }

    /// Cached batch for these inputs, or a fresh pipeline run.
    ///
    /// Failed runs are not cached.
    pub async fn aggregate(
        &self,
        urls: &[String],
        credential: &str,
    ) -> Result<Arc<ExtractionBatch>, PipelineError> {
        let key = batch_key(urls, credential);
        if let Some(batch) = self.cache.get(&key) {
            info!(records = batch.len(), "Using cached batch");
            return Ok(batch);
        }
        let batch = Arc::new(self.pipeline.aggregate(urls, credential).await?);
        self.cache.insert(key, Arc::clone(&batch));
        debug!(cached = self.cache.len(), "Stored batch in cache");
        Ok(batch)
    }
}

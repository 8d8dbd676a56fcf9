//! Cache-fronted, retrying access to a translation backend.
//!
//! ## Retry Strategy
//!
//! Remote translation endpoints answer bursts of parallel requests with 429s
//! and the occasional 5xx. Transient failures are retried with exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`): with 500 ms base and 3
//! retries the waits are 500 ms, 1 s, 2 s. Permanent failures stop at once.
//! When every attempt fails the caller gets the original text back, so a
//! flaky backend degrades the output instead of failing the page.

use super::cache::{CacheKey, TranslationCache};
use super::TranslationBackend;
use crate::config::TranslationConfig;
use crate::error::TranslationError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Run-wide counters, updated lock-free from every worker.
#[derive(Debug, Default)]
pub struct DispatchStats {
    backend_calls: AtomicU64,
    cache_hits: AtomicU64,
    fallbacks: AtomicU64,
}

impl DispatchStats {
    /// Attempts sent to the backend, retries included.
    pub fn backend_calls(&self) -> u64 {
        self.backend_calls.load(Ordering::Relaxed)
    }

    /// Lookups answered without calling the backend, including callers that
    /// awaited an in-flight call for the same key.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Lookups that gave up and returned the original text.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

/// Result of [`Dispatcher::translate_or_fallback`].
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// Translated text, or the original when `error` is set.
    pub text: String,
    pub error: Option<TranslationError>,
}

impl Translation {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Shared entry point for every translation in a run.
pub struct Dispatcher {
    backend: Arc<dyn TranslationBackend>,
    cache: Arc<TranslationCache>,
    max_retries: u32,
    retry_backoff_ms: u64,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        cache: Arc<TranslationCache>,
        max_retries: u32,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            backend,
            cache,
            max_retries,
            retry_backoff_ms,
            stats: DispatchStats::default(),
        }
    }

    /// Dispatcher with a fresh cache and the config's retry policy.
    pub fn from_config(backend: Arc<dyn TranslationBackend>, config: &TranslationConfig) -> Self {
        Self::new(
            backend,
            Arc::new(TranslationCache::new()),
            config.max_retries,
            config.retry_backoff_ms,
        )
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Translate `text`, returning the original text if the backend keeps
    /// failing. Never fails.
    pub async fn get_or_translate(&self, text: &str, source_lang: &str, target_lang: &str) -> String {
        self.translate_or_fallback(text, source_lang, target_lang)
            .await
            .text
    }

    /// Like [`Self::get_or_translate`] but reports whether it fell back.
    pub async fn translate_or_fallback(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Translation {
        match self.try_get_or_translate(text, source_lang, target_lang).await {
            Ok(text) => Translation { text, error: None },
            Err(e) => {
                self.stats.fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!("Keeping original text ({} chars): {}", text.len(), e);
                Translation {
                    text: text.to_string(),
                    error: Some(e),
                }
            }
        }
    }

    /// Cache lookup, then a single-flight backend call on a miss.
    ///
    /// Whitespace-only input is returned as-is without touching the cache.
    /// Errors are not cached.
    pub async fn try_get_or_translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let key = CacheKey::new(text, source_lang, target_lang);
        let slot = self.cache.slot(&key);
        if let Some(hit) = slot.get() {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }

        let mut called = false;
        let value = slot
            .get_or_try_init(|| {
                called = true;
                self.call_with_retry(text, source_lang, target_lang)
            })
            .await?
            .clone();

        if !called {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value)
    }

    async fn call_with_retry(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let mut last_err: Option<TranslationError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    self.backend.name(),
                    attempt,
                    self.max_retries,
                    backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            self.stats.backend_calls.fetch_add(1, Ordering::Relaxed);
            match self.backend.translate(text, source_lang, target_lang).await {
                Ok(out) if out.trim().is_empty() => {
                    return Err(TranslationError::Permanent(
                        "backend returned an empty translation".into(),
                    ));
                }
                Ok(out) => {
                    debug!(
                        "{}: {} → {} chars",
                        self.backend.name(),
                        text.len(),
                        out.len()
                    );
                    return Ok(out);
                }
                Err(e) if e.is_transient() => {
                    warn!("{}: attempt {} failed: {}", self.backend.name(), attempt + 1, e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| TranslationError::Transient("no attempt made".into())))
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(1u64 << attempt.saturating_sub(1).min(20))
}

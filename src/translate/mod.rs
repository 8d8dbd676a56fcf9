//! Translation backends, the shared cache, and the dispatcher that ties them
//! together.
//!
//! ```text
//! render ──▶ Dispatcher ──▶ TranslationCache (hit) ──▶ text
//!                  │
//!                  └─ miss ──▶ TranslationBackend (retry/backoff) ──▶ cache ──▶ text
//! ```
//!
//! Backends only know how to translate one string. Deduplication, retries
//! and the keep-the-original fallback all live in [`dispatch`], so a new
//! backend is a single `translate` method.

pub mod cache;
pub mod dispatch;
pub mod google;
pub mod local;

use crate::config::{BackendKind, TranslationConfig};
use crate::error::{TranslatePdfError, TranslationError};
use async_trait::async_trait;
use std::sync::Arc;

pub use cache::{CacheKey, TranslationCache};
pub use dispatch::{DispatchStats, Dispatcher};
pub use google::GoogleBackend;
pub use local::LocalBackend;

/// A service that translates one string between two language codes.
///
/// Implementations are shared across all page workers, so they must be
/// `Send + Sync` and must not hold per-call state.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Translate `text` from `source_lang` to `target_lang`.
    ///
    /// Return [`TranslationError::Transient`] for failures worth retrying.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;
}

/// Returns its input unchanged. Useful for dry runs that exercise
/// extraction and layout without a network or model.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityBackend;

#[async_trait]
impl TranslationBackend for IdentityBackend {
    fn name(&self) -> &str {
        "identity"
    }

    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String, TranslationError> {
        Ok(text.to_string())
    }
}

/// Build the backend selected by the config.
///
/// A pre-constructed `config.translator` wins; otherwise `config.backend`
/// picks between the remote and the local service. Construction failures are
/// fatal because no page could be translated without a backend.
pub fn resolve_backend(
    config: &TranslationConfig,
) -> Result<Arc<dyn TranslationBackend>, TranslatePdfError> {
    if let Some(ref translator) = config.translator {
        return Ok(Arc::clone(translator));
    }

    match config.backend {
        BackendKind::Google => Ok(Arc::new(GoogleBackend::new(config.api_timeout_secs)?)),
        BackendKind::Local => Ok(Arc::new(LocalBackend::from_config(config)?)),
    }
}

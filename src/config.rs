//! Configuration types for PDF translation.
//!
//! Every knob lives in [`TranslationConfig`], built via its
//! [`TranslationConfigBuilder`]. Setters clamp out-of-range values and
//! [`TranslationConfigBuilder::build`] rejects combinations that cannot work,
//! so a config that built successfully is safe to hand to every worker.

use crate::error::TranslatePdfError;
use crate::progress::ProgressCallback;
use crate::translate::TranslationBackend;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Upper bound for the worker pool: the number of logical CPUs, or 1 when the
/// platform cannot tell.
pub fn max_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Configuration for a PDF-to-HTML translation run.
///
/// # Example
/// ```rust
/// use pdf_translate_html::{BackendKind, TranslationConfig};
///
/// let config = TranslationConfig::builder()
///     .source_lang("en")
///     .target_lang("de")
///     .backend(BackendKind::Local)
///     .local_model("llama3.2")
///     .build()
///     .unwrap();
/// assert_eq!(config.target_lang, "de");
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// Source language code forwarded to the backend. Default: `"en"`.
    ///
    /// Not validated; backends decide what they accept.
    pub source_lang: String,

    /// Target language code. Default: `"it"`. Also used as `<html lang>`.
    pub target_lang: String,

    /// Which backend to construct when `translator` is not supplied.
    pub backend: BackendKind,

    /// Pre-constructed backend. Takes precedence over `backend`.
    pub translator: Option<Arc<dyn TranslationBackend>>,

    /// edgequake-llm provider name for the local backend. Default: `"ollama"`.
    pub local_provider: String,

    /// Model for the local backend. `None` uses the provider's default.
    pub local_model: Option<String>,

    /// Pre-constructed LLM provider for the local backend.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the local model. Default: 0.0.
    pub temperature: f32,

    /// Output token cap per local-model call. Default: 1024.
    pub max_tokens: usize,

    /// Size of the page worker pool. Default: number of logical CPUs.
    ///
    /// Clamped to `1..=max_concurrency()`.
    pub concurrency: usize,

    /// Retries for a transient backend failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-request timeout for the remote backend in seconds. Default: 30.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Embed images as data URIs. Default: true.
    pub include_images: bool,

    /// Emit the `--- Page N ---` footer under every page. Default: true.
    pub page_footer: bool,

    /// Font-size ratio over the page median above which a block is a heading.
    /// Default: 1.35.
    pub heading_ratio: f32,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: "en".to_string(),
            target_lang: "it".to_string(),
            backend: BackendKind::default(),
            translator: None,
            local_provider: "ollama".to_string(),
            local_model: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 1024,
            concurrency: max_concurrency(),
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 30,
            password: None,
            pages: PageSelection::default(),
            include_images: true,
            page_footer: true,
            heading_ratio: 1.35,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("backend", &self.backend)
            .field("translator", &self.translator.as_ref().map(|t| t.name().to_string()))
            .field("local_provider", &self.local_provider)
            .field("local_model", &self.local_model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("include_images", &self.include_images)
            .field("page_footer", &self.page_footer)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TranslationConfig`].
#[derive(Debug)]
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl TranslationConfigBuilder {
    pub fn source_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.source_lang = lang.into();
        self
    }

    pub fn target_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.target_lang = lang.into();
        self
    }

    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.config.backend = kind;
        self
    }

    pub fn translator(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.config.translator = Some(backend);
        self
    }

    pub fn local_provider(mut self, name: impl Into<String>) -> Self {
        self.config.local_provider = name.into();
        self
    }

    pub fn local_model(mut self, model: impl Into<String>) -> Self {
        self.config.local_model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(16);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.clamp(1, max_concurrency());
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn include_images(mut self, v: bool) -> Self {
        self.config.include_images = v;
        self
    }

    pub fn page_footer(mut self, v: bool) -> Self {
        self.config.page_footer = v;
        self
    }

    pub fn heading_ratio(mut self, ratio: f32) -> Self {
        self.config.heading_ratio = ratio;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslatePdfError> {
        let c = &self.config;
        if c.source_lang.trim().is_empty() || c.target_lang.trim().is_empty() {
            return Err(TranslatePdfError::InvalidConfig(
                "source and target language must not be empty".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(TranslatePdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if !(c.heading_ratio.is_finite() && c.heading_ratio > 1.0) {
            return Err(TranslatePdfError::InvalidConfig(format!(
                "heading ratio must be > 1.0, got {}",
                c.heading_ratio
            )));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || start > end {
                return Err(TranslatePdfError::InvalidConfig(format!(
                    "invalid page range {start}-{end}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The two translation services the CLI can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Public Google Translate endpoint over HTTPS (default).
    #[default]
    Google,
    /// Offline model served on this machine.
    Local,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Google => "google",
            BackendKind::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = TranslatePdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(BackendKind::Google),
            "local" => Ok(BackendKind::Local),
            other => Err(TranslatePdfError::InvalidConfig(format!(
                "unknown translator '{other}' (expected google or local)"
            ))),
        }
    }
}

/// Specifies which pages of the PDF to translate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// One page (1-indexed).
    Single(usize),
    /// Contiguous range (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    ///
    /// Pages beyond `total_pages` are silently dropped.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) if (1..=total_pages).contains(p) => vec![p - 1],
            PageSelection::Single(_) => vec![],
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl FromStr for PageSelection {
    type Err = TranslatePdfError;

    /// Parse `all`, `5`, `3-15`, or `1,3,5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || TranslatePdfError::InvalidConfig(format!("invalid page selection '{s}'"));
        let num = |t: &str| t.trim().parse::<usize>().ok().filter(|&n| n >= 1);

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        if s.contains(',') {
            let pages = s.split(',').map(num).collect::<Option<Vec<_>>>().ok_or_else(bad)?;
            return Ok(PageSelection::Set(pages));
        }
        if let Some((a, b)) = s.split_once('-') {
            let (a, b) = (num(a).ok_or_else(bad)?, num(b).ok_or_else(bad)?);
            if a > b {
                return Err(bad());
            }
            return Ok(PageSelection::Range(a, b));
        }
        num(s).map(PageSelection::Single).ok_or_else(bad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_contract() {
        let c = TranslationConfig::default();
        assert_eq!(c.source_lang, "en");
        assert_eq!(c.target_lang, "it");
        assert_eq!(c.backend, BackendKind::Google);
        assert_eq!(c.concurrency, max_concurrency());
        assert!(c.page_footer);
        assert!(c.include_images);
    }

    #[test]
    fn concurrency_is_clamped() {
        let c = TranslationConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
        let c = TranslationConfig::builder().concurrency(100_000).build().unwrap();
        assert_eq!(c.concurrency, max_concurrency());
    }

    #[test]
    fn empty_language_is_rejected() {
        let err = TranslationConfig::builder().target_lang("  ").build().unwrap_err();
        assert!(err.to_string().contains("language"));
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("google".parse::<BackendKind>().unwrap(), BackendKind::Google);
        assert_eq!("LOCAL".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert!("deepl".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Local.to_string(), "local");
    }

    #[test]
    fn page_selection_parses() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("5".parse::<PageSelection>().unwrap(), PageSelection::Single(5));
        assert_eq!("3-15".parse::<PageSelection>().unwrap(), PageSelection::Range(3, 15));
        assert_eq!(
            "1, 3,5".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
        assert!("0".parse::<PageSelection>().is_err());
        assert!("9-2".parse::<PageSelection>().is_err());
        assert!("x".parse::<PageSelection>().is_err());
    }

    #[test]
    fn page_selection_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(4).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 10).to_indices(4), vec![1, 2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3, 9]).to_indices(5), vec![0, 2]);
    }

    #[test]
    fn debug_redacts_password() {
        let c = TranslationConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("redacted"));
    }
}

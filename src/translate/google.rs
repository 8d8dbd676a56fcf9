//! Remote backend: the public Google Translate web endpoint.
//!
//! Uses the same keyless `translate_a/single` endpoint browser extensions use.
//! The answer is a positional JSON array:
//!
//! ```text
//! [[["Ciao ","Hello ",null,null,10],["mondo","world",null,null,10]],null,"en",...]
//!   └── one entry per sentence: [translated, original, ...]
//! ```
//!
//! Requests are GETs, so long blocks are split on whitespace into chunks that
//! keep the URL under the endpoint's limit.

use super::TranslationBackend;
use crate::error::{TranslatePdfError, TranslationError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Characters of source text per request.
const MAX_CHUNK_CHARS: usize = 1800;

pub struct GoogleBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleBackend {
    pub fn new(timeout_secs: u64) -> Result<Self, TranslatePdfError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, timeout_secs)
    }

    /// Point the backend at a compatible endpoint (proxies, mirrors).
    pub fn with_endpoint(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, TranslatePdfError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("pdf-translate-html/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslatePdfError::BackendNotConfigured {
                backend: "google".into(),
                hint: format!("could not build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn translate_chunk(
        &self,
        chunk: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", chunk),
            ])
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(TranslationError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(TranslationError::Permanent(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslationError::Permanent(format!("unreadable response: {e}")))?;
        parse_response(&body)
    }
}

#[async_trait]
impl TranslationBackend for GoogleBackend {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        debug!("google: {} chars in {} request(s)", text.len(), chunks.len());

        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            parts.push(self.translate_chunk(chunk, source_lang, target_lang).await?);
        }
        Ok(parts.join(" "))
    }
}

fn classify_transport_error(e: reqwest::Error) -> TranslationError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        TranslationError::Transient(e.to_string())
    } else {
        TranslationError::Permanent(e.to_string())
    }
}

/// Concatenate the translated sentences of a `translate_a/single` answer.
fn parse_response(body: &Value) -> Result<String, TranslationError> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::Permanent("unexpected response shape".into()))?;

    let translated: String = sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(TranslationError::Permanent("response contained no translation".into()));
    }
    Ok(translated)
}

/// Split on whitespace into chunks of at most `max_chars` characters,
/// rejoining words with single spaces. A word longer than `max_chars` is cut.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len > max_chars {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                if piece.len() == max_chars {
                    chunks.push(piece.iter().collect());
                } else {
                    current = piece.iter().collect();
                    current_len = piece.len();
                }
            }
            continue;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

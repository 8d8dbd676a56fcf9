//! Offline backend: a model served on this machine (Ollama, LM Studio).
//!
//! The provider is built once at startup and shared read-only by every
//! worker. Small local models have short context windows, so a block is cut
//! at sentence ends into segments of at most [`MAX_SEGMENT_CHARS`]. Each
//! segment is one request and the answers are joined with a space. A
//! sentence longer than the limit is cut between words.

use super::TranslationBackend;
use crate::config::TranslationConfig;
use crate::error::{TranslatePdfError, TranslationError};
use crate::pipeline::normalize::clean_backend_output;
use crate::prompts::translation_system_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Model used when none is configured.
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2";

/// Segment size, in characters, sent per request.
pub const MAX_SEGMENT_CHARS: usize = 1000;

pub struct LocalBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    max_segment_chars: usize,
}

impl LocalBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
            max_segment_chars: MAX_SEGMENT_CHARS,
        }
    }

    pub fn with_max_segment_chars(mut self, max_chars: usize) -> Self {
        self.max_segment_chars = max_chars.max(1);
        self
    }

    /// Use `config.provider` when set, otherwise ask the provider factory
    /// for `config.local_provider` / `config.local_model`.
    pub fn from_config(config: &TranslationConfig) -> Result<Self, TranslatePdfError> {
        let provider = match config.provider {
            Some(ref provider) => Arc::clone(provider),
            None => {
                let model = config.local_model.as_deref().unwrap_or(DEFAULT_LOCAL_MODEL);
                ProviderFactory::create_llm_provider(&config.local_provider, model).map_err(|e| {
                    TranslatePdfError::BackendNotConfigured {
                        backend: format!("local ({})", config.local_provider),
                        hint: format!(
                            "Could not set up model '{model}': {e}\n\
                             Is the local model server running?"
                        ),
                    }
                })?
            }
        };
        Ok(Self::new(provider, config.temperature, config.max_tokens))
    }

    async fn translate_segment(
        &self,
        segment: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let messages = vec![
            ChatMessage::system(translation_system_prompt(source_lang, target_lang)),
            ChatMessage::user(segment),
        ];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| TranslationError::Transient(e.to_string()))?;
        Ok(clean_backend_output(&response.content))
    }
}

#[async_trait]
impl TranslationBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let segments = segments(text, self.max_segment_chars);
        let mut out = Vec::with_capacity(segments.len());
        for segment in &segments {
            out.push(self.translate_segment(segment, source_lang, target_lang).await?);
        }
        debug!("local: {} chars in {} segment(s)", text.len(), segments.len());
        Ok(out.join(" "))
    }
}

/// Sentences of `text`, cut after `.`, `!` or `?` followed by whitespace.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut after_terminal = false;
    for (i, c) in text.char_indices() {
        if after_terminal && c.is_whitespace() {
            let sentence = text[start..i].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = i;
        }
        after_terminal = matches!(c, '.' | '!' | '?');
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Pack whole sentences into segments of at most `max_chars` characters.
/// A single word longer than the limit becomes its own segment.
fn segments(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences(text) {
        let units: Vec<&str> = if sentence.chars().count() > max_chars {
            sentence.split_whitespace().collect()
        } else {
            vec![sentence]
        };
        for unit in units {
            let len = unit.chars().count();
            if current_len > 0 && current_len + 1 + len > max_chars {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(unit);
            current_len += len;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

//! Prompts for the local-model translation backend.
//!
//! Local instruction-tuned models drift into chat mode easily: they greet,
//! explain, or wrap the answer in quotes. The system prompt pins the output
//! contract and [`crate::pipeline::normalize::clean_backend_output`] removes
//! whatever slips through.

/// System prompt template. `{source}` and `{target}` are replaced by
/// [`translation_system_prompt`].
pub const TRANSLATION_SYSTEM_PROMPT: &str = r#"You are a professional translator. Translate the user's text from {source} to {target}.

Rules:
1. Output ONLY the translation, nothing else
2. Do NOT add explanations, notes, greetings, or quotes
3. Preserve numbers, URLs, e-mail addresses, and code exactly as written
4. Keep proper nouns untranslated unless they have a well-known {target} form
5. If the text is already in {target}, output it unchanged"#;

/// Render the system prompt for a language pair.
pub fn translation_system_prompt(source_lang: &str, target_lang: &str) -> String {
    TRANSLATION_SYSTEM_PROMPT
        .replace("{source}", &language_label(source_lang))
        .replace("{target}", &language_label(target_lang))
}

/// Human-readable name for common ISO 639-1 codes. Models follow
/// "Italian" more reliably than "it". Unknown codes pass through.
pub fn language_label(code: &str) -> String {
    let name = match code.to_ascii_lowercase().as_str() {
        "en" => "English",
        "it" => "Italian",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "ru" => "Russian",
        "uk" => "Ukrainian",
        "zh" | "zh-cn" => "Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "tr" => "Turkish",
        "sv" => "Swedish",
        "el" => "Greek",
        _ => return code.to_string(),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_both_languages() {
        let p = translation_system_prompt("en", "it");
        assert!(p.contains("from English to Italian"));
        assert!(!p.contains("{source}"));
        assert!(!p.contains("{target}"));
    }

    #[test]
    fn unknown_codes_pass_through() {
        assert_eq!(language_label("tlh"), "tlh");
        assert_eq!(language_label("DE"), "German");
    }
}

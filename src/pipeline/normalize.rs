//! Text normalisation: deterministic cleanup of extracted and translated text.
//!
//! PDF text runs carry typesetting artefacts that hurt translation quality:
//! words split across lines with a hyphen, runs of spaces used for
//! justification, zero-width characters and soft hyphens. Backends add their
//! own quirks on the way back (code fences and quotes around the answer from
//! local models, CRLF line endings).
//!
//! Two entry points, each a fixed sequence of small pure passes:
//!
//! * [`normalize_block`] — applied by the extractor to every text block
//!   before it reaches the translation cache, so identical paragraphs on
//!   different pages produce identical cache keys.
//! * [`clean_backend_output`] — applied to every backend answer.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise the joined text of one block.
///
/// Passes (in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Join words hyphenated across a line break
/// 4. Collapse every whitespace run (including newlines) to one space
/// 5. Trim
pub fn normalize_block(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = dehyphenate(&s);
    collapse_whitespace(&s).trim().to_string()
}

/// Clean a backend answer.
///
/// Passes (in order):
/// 1. Normalise line endings
/// 2. Strip an outer code fence
/// 3. Strip a leading `Translation:` label
/// 4. Strip one pair of matching outer quotes
/// 5. Trim
pub fn clean_backend_output(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_code_fences(&s);
    let s = strip_translation_label(&s);
    strip_outer_quotes(s.trim()).trim().to_string()
}

// ── Line endings ─────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Invisible characters ─────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Dehyphenation ────────────────────────────────────────────────────────

// Lowercase on both sides: "exam-\nple" joins, "Jean-\nPaul" and "2019-\n2020" do not.
static RE_LINE_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})-[ \t]*\n[ \t]*(\p{Ll})").unwrap());

fn dehyphenate(input: &str) -> String {
    RE_LINE_HYPHEN.replace_all(input, "$1$2").to_string()
}

// ── Whitespace ───────────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input, " ").to_string()
}

// ── Backend answer cleanup ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

static RE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:translation|translated text)\s*:\s*").unwrap());

fn strip_translation_label(input: &str) -> String {
    RE_LABEL.replace(input, "").to_string()
}

fn strip_outer_quotes(input: &str) -> &str {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('“', '”'), ('«', '»')];
    for (open, close) in PAIRS {
        if let Some(inner) = input
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            // Only a single wrapping pair; "a" and "b" is not wrapped.
            if !inner.contains(close) {
                return inner;
            }
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dehyphenate_lowercase_only() {
        assert_eq!(dehyphenate("trans-\nlation"), "translation");
        assert_eq!(dehyphenate("Jean-\nPaul"), "Jean-\nPaul");
        assert_eq!(dehyphenate("2019-\n2020"), "2019-\n2020");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a  \t b\n\nc"), "a b c");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("in\u{00AD}vis\u{200B}ible"), "invisible");
    }

    #[test]
    fn test_normalize_block_full() {
        let input = "  The quick brown fox jum-\r\nped over\u{FEFF}   the\n lazy dog. ";
        assert_eq!(normalize_block(input), "The quick brown fox jumped over the lazy dog.");
    }

    #[test]
    fn test_normalize_block_whitespace_only() {
        assert_eq!(normalize_block(" \n\t\u{200B} "), "");
    }

    #[test]
    fn test_clean_backend_output_fences() {
        assert_eq!(clean_backend_output("```text\nCiao mondo\n```"), "Ciao mondo");
    }

    #[test]
    fn test_clean_backend_output_label_and_quotes() {
        assert_eq!(clean_backend_output("Translation: \"Ciao mondo\""), "Ciao mondo");
        assert_eq!(clean_backend_output("«Bonjour»"), "Bonjour");
    }

    #[test]
    fn test_clean_backend_output_keeps_inner_quotes() {
        let s = "\"a\" e \"b\"";
        assert_eq!(clean_backend_output(s), s);
    }

    #[test]
    fn test_clean_backend_output_passthrough() {
        assert_eq!(clean_backend_output("Buongiorno\r\n"), "Buongiorno");
    }
}

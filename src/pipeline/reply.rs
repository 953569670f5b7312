//! Reply handling: deterministic cleanup of model replies and strict
//! extraction of the JSON object or HTML document they carry.
//!
//! ## Why a cleanup pass first?
//!
//! Chat models wrap answers in habits that are not part of the answer:
//! Markdown fences around JSON, reasoning transcripts (`<think>…</think>`
//! from R1-style models) that may themselves contain braces or stray
//! `<html>` mentions, zero-width characters, CRLF line endings. Removing
//! them up front keeps the extractors simple and strict.
//!
//! ## Rule Order
//!
//! 1. Normalise line endings (CRLF → LF)
//! 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 3. Drop reasoning blocks
//! 4. Strip one outer code fence (```` ```json ````, ```` ```html ````, bare)
//! 5. Trim surrounding whitespace
//!
//! ## Fail closed
//!
//! [`extract_json_object`] parses the JSON value that starts at the first
//! `{` and rejects the reply if that value is malformed. It never scans
//! forward for a later candidate, so a truncated or half-valid object
//! cannot slip through as a smaller, accidental match.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

/// Apply every cleanup rule to a raw model reply.
pub fn clean_reply(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_reasoning(&s);
    let s = strip_outer_fence(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Drop reasoning blocks ────────────────────────────────────────────
//
// A closed `<think>…</think>` block is removed wherever it appears. A bare
// `</think>` without an opener means the provider stripped the opening tag;
// everything before it is reasoning.

static RE_THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think(?:ing)?>.*?</think(?:ing)?>").unwrap());

static RE_THINK_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</think(?:ing)?>").unwrap());

fn strip_reasoning(input: &str) -> String {
    let s = RE_THINK_BLOCK.replace_all(input, "");
    match RE_THINK_CLOSE.find_iter(&s).last() {
        Some(m) => s[m.end()..].to_string(),
        None => s.into_owned(),
    }
}

// ── Rule 4: Strip one outer code fence ───────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCE.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── JSON extraction ──────────────────────────────────────────────────────────

/// Why a reply did not yield a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonExtractError {
    /// The reply contains no `{` at all.
    NoObject,
    /// The value starting at the first `{` is not valid JSON.
    Malformed(String),
}

impl fmt::Display for JsonExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonExtractError::NoObject => write!(f, "no JSON object in reply"),
            JsonExtractError::Malformed(e) => write!(f, "malformed JSON object: {e}"),
        }
    }
}

/// Extract the JSON object that starts at the first `{` of the cleaned reply.
///
/// Prose before the brace and after the object's closing brace is ignored.
pub fn extract_json_object(reply: &str) -> Result<Map<String, Value>, JsonExtractError> {
    let cleaned = clean_reply(reply);
    let start = cleaned.find('{').ok_or(JsonExtractError::NoObject)?;
    let mut stream = serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<Value>();

    match stream.next() {
        Some(Ok(Value::Object(map))) => Ok(map),
        Some(Ok(other)) => Err(JsonExtractError::Malformed(format!(
            "expected an object, found {other}"
        ))),
        Some(Err(e)) => Err(JsonExtractError::Malformed(e.to_string())),
        None => Err(JsonExtractError::NoObject),
    }
}

// ── HTML extraction ──────────────────────────────────────────────────────────

static RE_HTML_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html[\s>]").unwrap());
static RE_HTML_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</html\s*>").unwrap());
static RE_DOCTYPE_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!doctype\s+html\s*>\s*$").unwrap());

/// Extract the document from the first `<html` start tag to the last
/// `</html>` end tag, keeping a `<!DOCTYPE html>` that directly precedes it.
///
/// Returns `None` when either tag is missing.
pub fn extract_html_document(reply: &str) -> Option<String> {
    let cleaned = clean_reply(reply);
    let open = RE_HTML_OPEN.find(&cleaned)?;
    let close = RE_HTML_CLOSE
        .find_iter(&cleaned[open.start()..])
        .last()
        .map(|m| open.start() + m.end())?;

    let start = RE_DOCTYPE_TAIL
        .find(&cleaned[..open.start()])
        .map(|m| m.start())
        .unwrap_or(open.start());

    Some(cleaned[start..close].to_string())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let map = extract_json_object("Sure! {\"name\": \"Ann\"} thanks").unwrap();
        assert_eq!(Value::Object(map), json!({"name": "Ann"}));
    }

    #[test]
    fn extracts_nested_object_unchanged() {
        let obj = json!({
            "name": "Ann",
            "skills": ["Rust", "SQL"],
            "experience": [{"company": "Acme {Labs}", "years": 3}]
        });
        let reply = format!("Here you go:\n{}\nLet me know!", serde_json::to_string_pretty(&obj).unwrap());
        assert_eq!(Value::Object(extract_json_object(&reply).unwrap()), obj);
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let reply = "```json\n{\"name\": \"Ann\"}\n```";
        assert_eq!(Value::Object(extract_json_object(reply).unwrap()), json!({"name": "Ann"}));
    }

    #[test]
    fn reasoning_braces_are_ignored() {
        let reply = "<think>maybe {\"name\": \"Bob\"}?</think>{\"name\": \"Ann\"}";
        assert_eq!(Value::Object(extract_json_object(reply).unwrap()), json!({"name": "Ann"}));
    }

    #[test]
    fn dangling_think_close_drops_prefix() {
        assert_eq!(clean_reply("ponder {x}\n</think>\n\ntech"), "tech");
    }

    #[test]
    fn no_brace_is_no_object() {
        assert_eq!(extract_json_object("I cannot help"), Err(JsonExtractError::NoObject));
    }

    #[test]
    fn malformed_object_fails_closed() {
        // A later well-formed object must not be picked up.
        let reply = "{\"name\": \"Ann\", } and also {\"name\": \"Bob\"}";
        assert!(matches!(extract_json_object(reply), Err(JsonExtractError::Malformed(_))));
    }

    #[test]
    fn truncated_object_fails_closed() {
        let reply = "{\"name\": \"Ann\", \"skills\": [\"Rust\"";
        assert!(matches!(extract_json_object(reply), Err(JsonExtractError::Malformed(_))));
    }

    #[test]
    fn html_document_is_extracted_with_doctype() {
        let reply = "Here is your page:\n```html\n<!DOCTYPE html>\n<html lang=\"en\"><body>{{ name }}</body></html>\n```\nEnjoy!";
        let doc = extract_html_document(reply).unwrap();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.ends_with("</html>"));
        assert!(doc.contains("{{ name }}"));
    }

    #[test]
    fn html_extraction_spans_to_last_close_tag() {
        let reply = "<html><body><pre>&lt;/html&gt;</pre></html> trailing </html>";
        let doc = extract_html_document(reply).unwrap();
        assert!(doc.ends_with("trailing </html>"));
    }

    #[test]
    fn html_missing_is_none() {
        assert_eq!(extract_html_document("<div>just a fragment</div>"), None);
        assert_eq!(extract_html_document("<html><body>unterminated"), None);
        assert_eq!(extract_html_document("<htmlx></htmlx>"), None);
    }

    #[test]
    fn invisible_chars_and_crlf_removed() {
        assert_eq!(clean_reply("\u{FEFF}a\r\nb\u{200B}c"), "a\nbc");
    }
}

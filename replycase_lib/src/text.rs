//! HTML fragment to plain text, keeping paragraph and line-break structure.
//!
//! `<p>` and `<br>` become newlines; every other tag is dropped but its text
//! kept; comments, CDATA and `<style>`/`<script>` blocks disappear entirely.

use std::sync::OnceLock;

use regex::Regex;

/// Returned when neither the full nor the blunt conversion is available.
pub const CONVERSION_FAILED: &str = "[HTML 변환 오류]";

static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
static BLUNT_TAG: OnceLock<Option<Regex>> = OnceLock::new();

struct Patterns {
    has_tag: Regex,
    p_open: Regex,
    p_close: Regex,
    br: Regex,
    comment: Regex,
    cdata: Regex,
    style: Regex,
    script: Regex,
    any_tag: Regex,
    nbsp: Regex,
    blank_lines: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            has_tag: Regex::new(r"<[A-Za-z/!][^>]*>")?,
            p_open: Regex::new(r"(?i)<p\b[^>]*>")?,
            p_close: Regex::new(r"(?i)</p\s*>")?,
            br: Regex::new(r"(?i)<br\b[^>]*>")?,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            cdata: Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>")?,
            style: Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>")?,
            script: Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>")?,
            any_tag: Regex::new(r"</?[^>]+>")?,
            nbsp: Regex::new(r"(?i)&nbsp;?|\x{A0}")?,
            blank_lines: Regex::new(r"\n([ \t]*\n)+")?,
        })
    }
}

fn patterns() -> Option<&'static Patterns> {
    PATTERNS
        .get_or_init(|| match Patterns::compile() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::error!("HTML normalizer patterns failed to compile: {}", e);
                None
            }
        })
        .as_ref()
}

/// Converts an HTML fragment to plain text. Never fails: falls back to a
/// blunt tag strip and finally to [`CONVERSION_FAILED`].
pub fn normalize(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    match patterns() {
        Some(p) => normalize_with(p, html),
        None => blunt_strip(html),
    }
}

/// Like [`normalize`] but maps `None` to an empty string.
pub fn normalize_opt(html: Option<&str>) -> String {
    html.map(normalize).unwrap_or_default()
}

/// Decodes the entities the HTML serializer re-escapes in text content.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn normalize_with(p: &Patterns, html: &str) -> String {
    let mut text = if p.has_tag.is_match(html) {
        // markup: source newlines are layout, only <p>/<br> produce breaks
        html.replace(['\r', '\n'], "")
    } else {
        html.replace('\r', "")
    };

    text = p.comment.replace_all(&text, "").into_owned();
    text = p.cdata.replace_all(&text, "").into_owned();
    text = p.style.replace_all(&text, "").into_owned();
    text = p.script.replace_all(&text, "").into_owned();
    text = p.p_open.replace_all(&text, "\n").into_owned();
    text = p.p_close.replace_all(&text, "").into_owned();
    text = p.br.replace_all(&text, "\n").into_owned();

    // stripping can splice a new tag out of nested brackets (`<<b>i>`)
    for _ in 0..4 {
        if !p.any_tag.is_match(&text) {
            break;
        }
        text = p.any_tag.replace_all(&text, "").into_owned();
    }

    text = p.nbsp.replace_all(&text, " ").into_owned();
    text = p.blank_lines.replace_all(&text, "\n").into_owned();
    text.trim().to_string()
}

fn blunt_strip(html: &str) -> String {
    let tag = BLUNT_TAG.get_or_init(|| Regex::new(r"<[^>]*>").ok());
    match tag {
        Some(re) => re.replace_all(html, "").trim().to_string(),
        None => CONVERSION_FAILED.to_string(),
    }
}

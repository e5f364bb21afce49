use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]+>").expect("valid regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Reduce Confluence storage-format HTML to plain text.
///
/// Drops script and style blocks, replaces tags with spaces, decodes the common
/// entities and collapses whitespace runs.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);
    SPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" decodes to "&lt;", not "<".
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

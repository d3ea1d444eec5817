use unicode_width::UnicodeWidthChar;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};
use url::Url;

static BOT_TOKEN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"/bot\d+:[^/?#]+").ok());

/// Safely truncate a string, ensuring it is not truncated in the middle of multi-byte characters
///
/// The output's display width never exceeds `max_width`, ellipsis included.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str("...");
    result
}

/// Trims whitespace and strips every leading `/` from raw input.
pub fn clean_input(raw: &str) -> String {
    raw.trim().trim_start_matches('/').trim().to_string()
}

/// Parses `input` as a URL, adding an `https://` scheme when none is present.
pub fn parse_lenient(input: &str) -> Option<Url> {
    let cleaned = clean_input(input);
    if cleaned.is_empty() {
        return None;
    }
    let candidate = if cleaned.contains("://") {
        cleaned
    } else {
        format!("https://{cleaned}")
    };
    Url::parse(&candidate).ok()
}

/// Lower-cased host of `input`, without a leading `www.`.
pub fn host_of(input: &str) -> Option<String> {
    let url = parse_lenient(input)?;
    let host = url.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Non-empty path segments of `input`.
pub fn path_segments(input: &str) -> Vec<String> {
    parse_lenient(input)
        .map(|url| {
            url.path()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parses human-formatted counters: `1,234`, `12 345`, `1.2K`, `3M`.
pub fn parse_count(text: &str) -> Option<u64> {
    let cleaned: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '\u{a0}')
        .collect();

    let (number, multiplier) = if let Some(n) = cleaned.strip_suffix('k') {
        (n, 1_000.0)
    } else if let Some(n) = cleaned.strip_suffix('m') {
        (n, 1_000_000.0)
    } else if let Some(n) = cleaned.strip_suffix('b') {
        (n, 1_000_000_000.0)
    } else {
        let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
        return digits.parse().ok();
    };

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// Decodes the handful of entities public preview pages actually emit.
pub fn decode_entities(html: &str) -> String {
    html.replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Turns an HTML fragment into plain text, keeping `<br>` as newlines.
/// Entities are decoded by the parser.
pub fn strip_tags(fragment: &str) -> String {
    let document = Html::parse_fragment(fragment);
    let mut out = String::with_capacity(fragment.len());
    for node in document.root_element().descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out.replace('\u{a0}', " ").trim().to_string()
}

/// Copy of `url` that is safe to log or embed in error text: query and
/// fragment are dropped (API keys travel there) and Bot API tokens in
/// `/bot<id>:<secret>/` path segments are masked.
pub fn redact_url(url: &str) -> String {
    let base = url.split(|c| c == '?' || c == '#').next().unwrap_or_default();
    match BOT_TOKEN.as_ref() {
        Some(re) => re.replace_all(base, "/bot<redacted>").into_owned(),
        None => base.to_string(),
    }
}

/// Reads a counter that upstream APIs send either as a number or a string.
pub fn json_count(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        serde_json::Value::String(s) => parse_count(s),
        _ => None,
    }
}

/// Upper-cases the first character, used for placeholder display names.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("Hello, world!", 10), "Hello, ...");
        assert_eq!(truncate_str("你好，世界！", 8), "你好...");
        assert_eq!(truncate_str("Hi!", 10), "Hi!");
    }

    #[test]
    fn test_clean_input() {
        assert_eq!(clean_input("  //https://t.me/x  "), "https://t.me/x");
        assert_eq!(clean_input("///"), "");
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://WWW.YouTube.com/watch?v=x").as_deref(), Some("youtube.com"));
        assert_eq!(host_of("t.me/channel").as_deref(), Some("t.me"));
        assert_eq!(host_of("/").as_deref(), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1.2K"), Some(1200));
        assert_eq!(parse_count("3M"), Some(3_000_000));
        assert_eq!(parse_count("12 345"), Some(12345));
        assert_eq!(parse_count("1,024"), Some(1024));
        assert_eq!(parse_count("987"), Some(987));
        assert_eq!(parse_count("k"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_json_count() {
        use serde_json::json;
        assert_eq!(json_count(&json!(12)), Some(12));
        assert_eq!(json_count(&json!("4.5K")), Some(4500));
        assert_eq!(json_count(&json!(3.0)), Some(3));
        assert_eq!(json_count(&json!(-1)), None);
        assert_eq!(json_count(&json!(null)), None);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities("&lt;b&gt; &quot;a&quot; &amp;amp; it&#039;s"),
            "<b> \"a\" &amp; it's"
        );
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("https://api.telegram.org/bot123456:SECRET-token_x/getChat?chat_id=%40a"),
            "https://api.telegram.org/bot<redacted>/getChat"
        );
        assert_eq!(
            redact_url("https://api.telegram.org/file/bot123456:SECRET/photos/p.jpg"),
            "https://api.telegram.org/file/bot<redacted>/photos/p.jpg"
        );
        assert_eq!(
            redact_url("https://iframe.ly/api/iframely?url=x&api_key=KEY"),
            "https://iframe.ly/api/iframely"
        );
        assert_eq!(redact_url("https://t.me/botfather"), "https://t.me/botfather");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("Hello<br/>there <b>world</b>"), "Hello\nthere world");
        assert_eq!(strip_tags("a&nbsp;&lt;b&gt; &amp; c"), "a <b> & c");
        assert_eq!(strip_tags("<a href=\"x>y\">link</a>"), "link");
    }
}

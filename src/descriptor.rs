//! URL-shape identification.
//!
//! Each platform declares an ordered table of [`IdentifyRule`]s. Rules are
//! matched against `host + path [+ ?query]` (host lower-cased, `www.`
//! stripped, path case preserved) and the first match wins, so tables list
//! the most specific shapes first.

use regex::{Captures, Regex};
use serde::Serialize;

use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Profile,
    Channel,
    Media,
    Unknown,
}

/// What a URL points to, plus the identifiers pulled out of it.
///
/// `kind == Unknown` exactly when both ids are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub kind: ContentKind,
    /// Name of the rule that matched (`"reel"`, `"tweet"`, `"invite"`, ...).
    pub shape: &'static str,
    /// Handle / username / channel name.
    pub primary_id: Option<String>,
    /// Post, message, video or invite id.
    pub secondary_id: Option<String>,
    pub canonical_url: String,
}

impl ContentDescriptor {
    pub fn unknown(url: &str) -> Self {
        Self {
            kind: ContentKind::Unknown,
            shape: "unknown",
            primary_id: None,
            secondary_id: None,
            canonical_url: url.to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.kind != ContentKind::Unknown
    }

    pub fn handle(&self) -> Option<&str> {
        self.primary_id.as_deref()
    }

    pub fn content_id(&self) -> Option<&str> {
        self.secondary_id.as_deref()
    }
}

/// One URL shape. `canonical` may reference captures as `{1}`, `{2}`.
#[derive(Debug, Clone, Copy)]
pub struct IdentifyRule {
    pub shape: &'static str,
    pub kind: ContentKind,
    pub pattern: &'static str,
    pub primary: Option<usize>,
    pub secondary: Option<usize>,
    pub canonical: &'static str,
}

/// Compiled, ordered rule table for one platform.
pub struct Identifier {
    rules: Vec<(IdentifyRule, Regex)>,
    reserved: &'static [&'static str],
}

impl Identifier {
    /// Compiles `rules`. Patterns are static, so a bad one is a programming error.
    pub fn new(rules: &[IdentifyRule], reserved: &'static [&'static str]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let regex = Regex::new(rule.pattern)
                    .unwrap_or_else(|e| panic!("invalid identify rule {}: {e}", rule.shape));
                (*rule, regex)
            })
            .collect();
        Self { rules, reserved }
    }

    pub fn identify(&self, url: &str) -> ContentDescriptor {
        let Some(subject) = match_subject(url) else {
            return ContentDescriptor::unknown(url);
        };

        for (rule, regex) in &self.rules {
            let Some(caps) = regex.captures(&subject) else {
                continue;
            };

            let primary = rule.primary.and_then(|i| capture(&caps, i));
            if let Some(handle) = &primary {
                if self.is_reserved(handle) {
                    continue;
                }
            }
            let secondary = rule.secondary.and_then(|i| capture(&caps, i));
            if primary.is_none() && secondary.is_none() {
                continue;
            }

            return ContentDescriptor {
                kind: rule.kind,
                shape: rule.shape,
                primary_id: primary,
                secondary_id: secondary,
                canonical_url: expand(rule.canonical, &caps),
            };
        }

        ContentDescriptor::unknown(url)
    }

    fn is_reserved(&self, handle: &str) -> bool {
        self.reserved
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(handle))
    }
}

/// `host/path?query` with the host lower-cased and `www.` removed.
fn match_subject(url: &str) -> Option<String> {
    let parsed = utils::parse_lenient(url)?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let mut subject = format!("{host}{}", parsed.path());
    if let Some(query) = parsed.query() {
        subject.push('?');
        subject.push_str(query);
    }
    Some(subject)
}

fn capture(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index)
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

fn expand(template: &str, caps: &Captures<'_>) -> String {
    let mut out = template.to_string();
    for i in 1..caps.len() {
        let value = caps.get(i).map(|m| m.as_str()).unwrap_or_default();
        out = out.replace(&format!("{{{i}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &[IdentifyRule] = &[
        IdentifyRule {
            shape: "post",
            kind: ContentKind::Post,
            pattern: r"^example\.com/([A-Za-z0-9_]+)/(\d+)",
            primary: Some(1),
            secondary: Some(2),
            canonical: "https://example.com/{1}/{2}",
        },
        IdentifyRule {
            shape: "profile",
            kind: ContentKind::Profile,
            pattern: r"^example\.com/([A-Za-z0-9_]+)/?$",
            primary: Some(1),
            secondary: None,
            canonical: "https://example.com/{1}",
        },
    ];

    #[test]
    fn most_specific_rule_wins() {
        let id = Identifier::new(RULES, &["about"]);
        let d = id.identify("https://www.example.com/Alice/42?ref=x");
        assert_eq!(d.kind, ContentKind::Post);
        assert_eq!(d.handle(), Some("Alice"));
        assert_eq!(d.content_id(), Some("42"));
        assert_eq!(d.canonical_url, "https://example.com/Alice/42");
    }

    #[test]
    fn reserved_segments_are_not_handles() {
        let id = Identifier::new(RULES, &["about"]);
        assert_eq!(id.identify("example.com/About").kind, ContentKind::Unknown);
        assert_eq!(id.identify("example.com/bob").kind, ContentKind::Profile);
    }

    #[test]
    fn unknown_has_no_ids() {
        let id = Identifier::new(RULES, &[]);
        let d = id.identify("https://other.org/x");
        assert!(!d.is_known());
        assert!(d.primary_id.is_none() && d.secondary_id.is_none());
    }
}

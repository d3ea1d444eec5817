use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// Field a rule fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    Title,
    Description,
    Image,
    SiteName,
    Video,
}

/// `selector` picks elements; `attr` names the attribute to read, or `None`
/// for the element's text.
#[derive(Debug, Clone, Copy)]
pub struct MetaRule {
    pub field: MetaField,
    pub selector: &'static str,
    pub attr: Option<&'static str>,
}

pub(crate) const fn meta(field: MetaField, selector: &'static str) -> MetaRule {
    MetaRule {
        field,
        selector,
        attr: Some("content"),
    }
}

/// Social-preview tags in preference order per field.
pub const SOCIAL_PREVIEW_RULES: &[MetaRule] = &[
    meta(MetaField::Title, "meta[property='og:title'], meta[name='og:title']"),
    meta(MetaField::Title, "meta[name='twitter:title'], meta[property='twitter:title']"),
    MetaRule {
        field: MetaField::Title,
        selector: "title",
        attr: None,
    },
    meta(
        MetaField::Description,
        "meta[property='og:description'], meta[name='og:description']",
    ),
    meta(
        MetaField::Description,
        "meta[name='twitter:description'], meta[property='twitter:description']",
    ),
    meta(MetaField::Description, "meta[name='description']"),
    meta(MetaField::Image, "meta[property='og:image'], meta[name='og:image']"),
    meta(MetaField::Image, "meta[name='twitter:image'], meta[property='twitter:image']"),
    meta(MetaField::Image, "meta[itemprop='image']"),
    meta(MetaField::SiteName, "meta[property='og:site_name']"),
    meta(
        MetaField::Video,
        "meta[property='og:video'], meta[property='og:video:url']",
    ),
];

/// Preview metadata pulled from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    pub video: Option<String>,
}

impl PageMeta {
    fn slot(&mut self, field: MetaField) -> &mut Option<String> {
        match field {
            MetaField::Title => &mut self.title,
            MetaField::Description => &mut self.description,
            MetaField::Image => &mut self.image,
            MetaField::SiteName => &mut self.site_name,
            MetaField::Video => &mut self.video,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}

/// Metadata extractor, responsible for extracting preview information from webpage content
#[derive(Clone, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str) -> PageMeta {
        self.extract_with(html, SOCIAL_PREVIEW_RULES)
    }

    /// Applies `rules` in order; the first non-empty value per field sticks.
    pub fn extract_with(&self, html: &str, rules: &[MetaRule]) -> PageMeta {
        let document = Html::parse_document(html);
        let mut page = PageMeta::default();

        for rule in rules {
            if page.slot(rule.field).is_some() {
                continue;
            }
            let Ok(selector) = Selector::parse(rule.selector) else {
                debug!(selector = rule.selector, "Skipping unparsable selector");
                continue;
            };
            let value = document.select(&selector).find_map(|el| {
                let raw = match rule.attr {
                    Some(attr) => el.value().attr(attr).map(str::to_string),
                    None => Some(el.text().collect::<String>()),
                };
                raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
            });
            if let Some(value) = value {
                *page.slot(rule.field) = Some(value);
            }
        }

        debug!(
            title = ?page.title,
            image = ?page.image,
            "Meta extraction finished"
        );
        page
    }
}

/// First capture group of the first pattern that matches `haystack`.
pub fn first_capture(haystack: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(haystack)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Fallback Title</title>
    <meta name="twitter:title" content="Twitter Title">
    <meta property="og:description" content="A &amp; B">
    <meta name="twitter:image" content="https://cdn.test/tw.jpg">
    <meta property="og:image" content="https://cdn.test/og.jpg?a=1&amp;b=2">
</head>
<body></body>
</html>"#;

    #[test]
    fn prefers_rules_in_order() {
        let page = MetadataExtractor::new().extract(PAGE);
        assert_eq!(page.title.as_deref(), Some("Twitter Title"));
        assert_eq!(page.description.as_deref(), Some("A & B"));
        assert_eq!(page.image.as_deref(), Some("https://cdn.test/og.jpg?a=1&b=2"));
        assert_eq!(page.site_name, None);
    }

    #[test]
    fn empty_page_yields_empty_meta() {
        let page = MetadataExtractor::new().extract("<html><head></head></html>");
        assert!(page.is_empty());
    }

    #[test]
    fn first_capture_walks_patterns() {
        let patterns = vec![
            Regex::new(r#""missing":"([^"]+)""#).unwrap(),
            Regex::new(r#""display_url":"([^"]+)""#).unwrap(),
        ];
        assert_eq!(
            first_capture(r#"{"display_url":"https://x/y.jpg"}"#, &patterns).as_deref(),
            Some("https://x/y.jpg")
        );
        assert_eq!(first_capture("nothing", &patterns), None);
    }
}

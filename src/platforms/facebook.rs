//! Social-network analysis through the iframely unfurling service.
//!
//! The network serves nothing useful to anonymous scrapers, so there is no
//! page tier. Any failure yields an error-flagged record with a generic icon.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::chain::{last_failure, Adapter, AdapterChain, ChainOutcome};
use crate::classifier::Platform;
use crate::config::ENV_IFRAMELY_API_KEY;
use crate::descriptor::{ContentDescriptor, ContentKind, Identifier, IdentifyRule};
use crate::fallback::FACEBOOK_ICON;
use crate::http::HttpSource;
use crate::result::{AnalysisRequest, AnalysisResult};
use crate::utils::json_count;
use crate::{AnalyzeError, PlatformAnalyzer};

const RULES: &[IdentifyRule] = &[
    IdentifyRule {
        shape: "video",
        kind: ContentKind::Media,
        pattern: r"^fb\.watch/([A-Za-z0-9_-]+)",
        primary: None,
        secondary: Some(1),
        canonical: "https://fb.watch/{1}/",
    },
    IdentifyRule {
        shape: "video",
        kind: ContentKind::Media,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/watch/?\?(?:.*&)?v=(\d+)",
        primary: None,
        secondary: Some(1),
        canonical: "https://www.facebook.com/watch/?v={1}",
    },
    IdentifyRule {
        shape: "video",
        kind: ContentKind::Media,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/([A-Za-z0-9.-]+)/videos/(?:[^/?]+/)?(\d+)",
        primary: Some(1),
        secondary: Some(2),
        canonical: "https://www.facebook.com/{1}/videos/{2}/",
    },
    IdentifyRule {
        shape: "reel",
        kind: ContentKind::Media,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/reel/(\d+)",
        primary: None,
        secondary: Some(1),
        canonical: "https://www.facebook.com/reel/{1}/",
    },
    IdentifyRule {
        shape: "post",
        kind: ContentKind::Post,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/([A-Za-z0-9.-]+)/posts/([A-Za-z0-9]+)",
        primary: Some(1),
        secondary: Some(2),
        canonical: "https://www.facebook.com/{1}/posts/{2}",
    },
    IdentifyRule {
        shape: "post",
        kind: ContentKind::Post,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/((?:permalink|story)\.php\?(?:.*&)?story_fbid=([A-Za-z0-9]+).*)",
        primary: None,
        secondary: Some(2),
        canonical: "https://www.facebook.com/{1}",
    },
    IdentifyRule {
        shape: "share",
        kind: ContentKind::Post,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/(share/(?:[a-z]/)?([A-Za-z0-9]+))",
        primary: None,
        secondary: Some(2),
        canonical: "https://www.facebook.com/{1}/",
    },
    IdentifyRule {
        shape: "group",
        kind: ContentKind::Channel,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/groups/([A-Za-z0-9.-]+)",
        primary: Some(1),
        secondary: None,
        canonical: "https://www.facebook.com/groups/{1}/",
    },
    IdentifyRule {
        shape: "profile",
        kind: ContentKind::Profile,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/profile\.php\?(?:.*&)?id=(\d+)",
        primary: Some(1),
        secondary: None,
        canonical: "https://www.facebook.com/profile.php?id={1}",
    },
    IdentifyRule {
        shape: "page",
        kind: ContentKind::Profile,
        pattern: r"^(?:[a-z0-9-]+\.)*(?:facebook|fb)\.com/([A-Za-z0-9.-]+)/?(?:\?.*)?$",
        primary: Some(1),
        secondary: None,
        canonical: "https://www.facebook.com/{1}",
    },
];

const RESERVED: &[&str] = &[
    "watch",
    "groups",
    "events",
    "marketplace",
    "gaming",
    "login",
    "share",
    "sharer",
    "photo.php",
    "help",
];

static IDENTIFIER: Lazy<Identifier> = Lazy::new(|| Identifier::new(RULES, RESERVED));

/// What iframely tells us about a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPreview {
    pub title: Option<String>,
    pub description: Option<String>,
    pub site: Option<String>,
    pub thumbnail: String,
    pub views: u64,
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads an iframely answer. A payload without any image is a failure.
pub fn parse_iframely(body: &Value) -> Result<LinkPreview, AnalyzeError> {
    let links = &body["links"];
    let thumbnail = text(&links["thumbnail"][0]["href"])
        .or_else(|| text(&links["icon"][0]["href"]))
        .ok_or_else(|| AnalyzeError::external("iframely", "no preview image in response"))?;

    let meta = &body["meta"];
    Ok(LinkPreview {
        title: text(&meta["title"]),
        description: text(&meta["description"]),
        site: text(&meta["site"]),
        thumbnail,
        views: json_count(&meta["views"]).unwrap_or(0),
    })
}

/// `error.message`, `error` as a string, or `None`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    text(&value["error"]["message"]).or_else(|| text(&value["error"]))
}

struct IframelyAdapter {
    http: Arc<dyn HttpSource>,
    api_key: Option<String>,
}

#[async_trait]
impl Adapter<LinkPreview> for IframelyAdapter {
    fn name(&self) -> &'static str {
        "iframely"
    }

    async fn fetch(&self, descriptor: &ContentDescriptor) -> Result<LinkPreview, AnalyzeError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AnalyzeError::MissingCredential(ENV_IFRAMELY_API_KEY))?;
        let url = format!(
            "https://iframe.ly/api/iframely?url={}&api_key={}",
            urlencoding::encode(&descriptor.canonical_url),
            urlencoding::encode(api_key)
        );

        let response = self.http.get(&url).await?;
        if !response.is_success() {
            return Err(match error_message(&response.body) {
                Some(message) => AnalyzeError::external("iframely", message),
                None => AnalyzeError::from_status(response.status, "iframely"),
            });
        }

        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| AnalyzeError::ExtractError(format!("malformed iframely JSON: {e}")))?;
        parse_iframely(&body)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FacebookRecord {
    platform: &'static str,
    #[serde(rename = "type")]
    content_type: &'static str,
    site_name: Option<String>,
    title: String,
    description: Option<String>,
    thumbnail: String,
    views: u64,
    likes: u64,
    comments: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<bool>,
    message: String,
}

pub struct FacebookAnalyzer {
    chain: AdapterChain<LinkPreview>,
}

impl FacebookAnalyzer {
    pub fn new(http: Arc<dyn HttpSource>, api_key: Option<String>) -> Self {
        let chain = AdapterChain::new("Facebook", |p: &LinkPreview| !p.thumbnail.is_empty())
            .with(IframelyAdapter { http, api_key });
        Self { chain }
    }
}

#[async_trait]
impl PlatformAnalyzer for FacebookAnalyzer {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    fn identify(&self, url: &str) -> ContentDescriptor {
        IDENTIFIER.identify(url)
    }

    #[instrument(level = "debug", skip(self), fields(url = %request.url()))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzeError> {
        let descriptor = self.identify(request.url());

        let record = match self.chain.run(&descriptor).await {
            ChainOutcome::Found { value, .. } => {
                info!(site = ?value.site, "Facebook preview resolved");
                FacebookRecord {
                    platform: "Facebook",
                    content_type: descriptor.shape,
                    site_name: value.site,
                    title: value.title.unwrap_or_else(|| "Facebook link".into()),
                    description: value.description,
                    thumbnail: value.thumbnail,
                    views: value.views,
                    likes: 0,
                    comments: 0,
                    error: None,
                    message: "Facebook preview fetched successfully".into(),
                }
            }
            ChainOutcome::Exhausted { failures } => {
                let reason = last_failure(&failures)
                    .unwrap_or_else(|| "the link does not point to a Facebook page, post or video".into());
                FacebookRecord {
                    platform: "Facebook",
                    content_type: descriptor.shape,
                    site_name: None,
                    title: "Facebook link".into(),
                    description: None,
                    thumbnail: FACEBOOK_ICON.into(),
                    views: 0,
                    likes: 0,
                    comments: 0,
                    error: Some(true),
                    message: format!("Facebook preview failed: {reason}"),
                }
            }
        };

        AnalysisResult::normalize(&record)
    }
}

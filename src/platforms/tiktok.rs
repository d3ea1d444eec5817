//! Short-video analysis through the tikwm mirror API.
//!
//! Never errors: when the mirror is down or the link is unrecognised, a
//! placeholder record echoing the cleaned link is returned.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::chain::{Adapter, AdapterChain, ChainOutcome};
use crate::classifier::Platform;
use crate::descriptor::{ContentDescriptor, ContentKind, Identifier, IdentifyRule};
use crate::http::{fetch_json, HttpSource};
use crate::result::{AnalysisRequest, AnalysisResult};
use crate::utils::json_count;
use crate::{AnalyzeError, PlatformAnalyzer};

const RULES: &[IdentifyRule] = &[
    IdentifyRule {
        shape: "video",
        kind: ContentKind::Media,
        pattern: r"^(?:[a-z0-9-]+\.)*tiktok\.com/@([A-Za-z0-9._-]+)/video/(\d+)",
        primary: Some(1),
        secondary: Some(2),
        canonical: "https://www.tiktok.com/@{1}/video/{2}",
    },
    IdentifyRule {
        shape: "photo",
        kind: ContentKind::Post,
        pattern: r"^(?:[a-z0-9-]+\.)*tiktok\.com/@([A-Za-z0-9._-]+)/photo/(\d+)",
        primary: Some(1),
        secondary: Some(2),
        canonical: "https://www.tiktok.com/@{1}/photo/{2}",
    },
    IdentifyRule {
        shape: "short-link",
        kind: ContentKind::Media,
        pattern: r"^((?:vm|vt)\.tiktok\.com)/([A-Za-z0-9]+)",
        primary: None,
        secondary: Some(2),
        canonical: "https://{1}/{2}/",
    },
    IdentifyRule {
        shape: "short-link",
        kind: ContentKind::Media,
        pattern: r"^(?:[a-z0-9-]+\.)*tiktok\.com/t/([A-Za-z0-9]+)",
        primary: None,
        secondary: Some(1),
        canonical: "https://www.tiktok.com/t/{1}/",
    },
    IdentifyRule {
        shape: "profile",
        kind: ContentKind::Profile,
        pattern: r"^(?:[a-z0-9-]+\.)*tiktok\.com/@([A-Za-z0-9._-]+)/?(?:\?.*)?$",
        primary: Some(1),
        secondary: None,
        canonical: "https://www.tiktok.com/@{1}",
    },
];

static IDENTIFIER: Lazy<Identifier> = Lazy::new(|| Identifier::new(RULES, &[]));

#[derive(Debug, Deserialize)]
struct TikwmEnvelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<Value>,
}

/// Video metadata as reported by the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TikTokVideo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub author_username: Option<String>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub cover: Option<String>,
    pub play: Option<String>,
    pub duration: u64,
    pub created: Option<u64>,
}

impl TikTokVideo {
    fn is_usable(&self) -> bool {
        self.cover.is_some() || self.play.is_some() || self.title.is_some()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TikTokRecord {
    platform: &'static str,
    title: String,
    author: String,
    author_username: String,
    views: u64,
    likes: u64,
    comments: u64,
    shares: u64,
    thumbnail: Option<String>,
    video_preview: String,
    duration: u64,
    created: Option<u64>,
    message: String,
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parses a tikwm answer. `code != 0` or a missing `data` is a failure.
pub fn parse_tikwm(body: &Value) -> Result<TikTokVideo, AnalyzeError> {
    let envelope: TikwmEnvelope = serde_json::from_value(body.clone())
        .map_err(|e| AnalyzeError::ExtractError(format!("unexpected tikwm payload: {e}")))?;

    let data = match (envelope.code, envelope.data) {
        (0, Some(data)) if data.is_object() => data,
        (code, _) => {
            return Err(AnalyzeError::external(
                "tikwm",
                envelope
                    .msg
                    .unwrap_or_else(|| format!("no video data (code {code})")),
            ))
        }
    };

    Ok(TikTokVideo {
        title: text(&data["title"]),
        author: text(&data["author"]["nickname"]),
        author_username: text(&data["author"]["unique_id"]),
        views: json_count(&data["play_count"]).unwrap_or(0),
        likes: json_count(&data["digg_count"]).unwrap_or(0),
        comments: json_count(&data["comment_count"]).unwrap_or(0),
        shares: json_count(&data["share_count"]).unwrap_or(0),
        cover: text(&data["cover"]),
        play: text(&data["play"]).or_else(|| text(&data["wmplay"])),
        duration: json_count(&data["duration"]).unwrap_or(0),
        created: json_count(&data["create_time"]),
    })
}

struct TikwmAdapter {
    http: Arc<dyn HttpSource>,
}

#[async_trait]
impl Adapter<TikTokVideo> for TikwmAdapter {
    fn name(&self) -> &'static str {
        "tikwm"
    }

    async fn fetch(&self, descriptor: &ContentDescriptor) -> Result<TikTokVideo, AnalyzeError> {
        let url = format!(
            "https://www.tikwm.com/api/?url={}",
            urlencoding::encode(&descriptor.canonical_url)
        );
        let body: Value = fetch_json(self.http.as_ref(), &url).await?;
        parse_tikwm(&body)
    }
}

pub struct TikTokAnalyzer {
    chain: AdapterChain<TikTokVideo>,
}

impl TikTokAnalyzer {
    pub fn new(http: Arc<dyn HttpSource>) -> Self {
        let chain = AdapterChain::new("TikTok", TikTokVideo::is_usable).with(TikwmAdapter { http });
        Self { chain }
    }

    fn placeholder(url: &str) -> TikTokRecord {
        TikTokRecord {
            platform: "TikTok",
            title: "TikTok video".into(),
            author: "TikTok user".into(),
            author_username: "user".into(),
            views: 0,
            likes: 0,
            comments: 0,
            shares: 0,
            thumbnail: None,
            video_preview: url.to_string(),
            duration: 0,
            created: None,
            message: "TikTok link recognized; video details are unavailable right now".into(),
        }
    }
}

#[async_trait]
impl PlatformAnalyzer for TikTokAnalyzer {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn identify(&self, url: &str) -> ContentDescriptor {
        IDENTIFIER.identify(url)
    }

    #[instrument(level = "debug", skip(self), fields(url = %request.url()))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzeError> {
        let descriptor = self.identify(request.url());

        let record = match self.chain.run(&descriptor).await {
            ChainOutcome::Found { value, .. } => {
                info!(views = value.views, likes = value.likes, "TikTok video resolved");
                TikTokRecord {
                    platform: "TikTok",
                    title: value.title.unwrap_or_else(|| "TikTok video".into()),
                    author: value.author.unwrap_or_else(|| "TikTok user".into()),
                    author_username: value.author_username.unwrap_or_else(|| "user".into()),
                    views: value.views,
                    likes: value.likes,
                    comments: value.comments,
                    shares: value.shares,
                    thumbnail: value.cover,
                    video_preview: value.play.unwrap_or_else(|| request.url().to_string()),
                    duration: value.duration,
                    created: value.created,
                    message: "TikTok video analyzed successfully".into(),
                }
            }
            ChainOutcome::Exhausted { .. } => Self::placeholder(request.url()),
        };

        AnalysisResult::normalize(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifies_tiktok_shapes() {
        let d = IDENTIFIER.identify("https://www.tiktok.com/@scout2015/video/6718335390845095173?lang=en");
        assert_eq!(d.kind, ContentKind::Media);
        assert_eq!(d.handle(), Some("scout2015"));
        assert_eq!(d.content_id(), Some("6718335390845095173"));

        let d = IDENTIFIER.identify("https://vt.tiktok.com/ZSjQbXyZ/");
        assert_eq!(d.kind, ContentKind::Media);
        assert_eq!(d.canonical_url, "https://vt.tiktok.com/ZSjQbXyZ/");

        let d = IDENTIFIER.identify("tiktok.com/@scout2015");
        assert_eq!(d.kind, ContentKind::Profile);

        assert!(!IDENTIFIER.identify("https://www.tiktok.com/explore").is_known());
    }

    #[test]
    fn parses_successful_payload() {
        let body = json!({
            "code": 0,
            "msg": "success",
            "data": {
                "title": "dance",
                "cover": "https://p16.test/cover.jpg",
                "play": "https://v16.test/play.mp4",
                "duration": 15,
                "play_count": 1200,
                "digg_count": "300",
                "comment_count": 12,
                "share_count": 4,
                "create_time": 1690000000,
                "author": { "unique_id": "scout2015", "nickname": "Scout" }
            }
        });
        let video = parse_tikwm(&body).unwrap();
        assert_eq!(video.author.as_deref(), Some("Scout"));
        assert_eq!(video.likes, 300);
        assert_eq!(video.created, Some(1_690_000_000));
        assert!(video.is_usable());
    }

    #[test]
    fn nonzero_code_is_a_failure() {
        let body = json!({ "code": -1, "msg": "Url parsing is failed!" });
        assert!(matches!(
            parse_tikwm(&body),
            Err(AnalyzeError::ExternalServiceError { .. })
        ));
    }
}

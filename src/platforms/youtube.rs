//! Video-host analysis.
//!
//! A single adapter reads the player response embedded in the public watch
//! page. There is no secondary source: when it fails, the error is
//! surfaced in an error-flagged record.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::chain::{last_failure, Adapter, AdapterChain, ChainOutcome};
use crate::classifier::Platform;
use crate::descriptor::{ContentDescriptor, ContentKind, Identifier, IdentifyRule};
use crate::http::{fetch_text, HttpSource};
use crate::result::{AnalysisRequest, AnalysisResult};
use crate::{AnalyzeError, PlatformAnalyzer};

const RULES: &[IdentifyRule] = &[
    IdentifyRule {
        shape: "video",
        kind: ContentKind::Media,
        pattern: r"^(?:[a-z0-9-]+\.)*youtube\.com/watch\?(?:.*&)?v=([A-Za-z0-9_-]{11})",
        primary: None,
        secondary: Some(1),
        canonical: "https://www.youtube.com/watch?v={1}",
    },
    IdentifyRule {
        shape: "video",
        kind: ContentKind::Media,
        pattern: r"^youtu\.be/([A-Za-z0-9_-]{11})",
        primary: None,
        secondary: Some(1),
        canonical: "https://www.youtube.com/watch?v={1}",
    },
    IdentifyRule {
        shape: "short",
        kind: ContentKind::Media,
        pattern: r"^(?:[a-z0-9-]+\.)*youtube(?:-nocookie)?\.com/(?:shorts|embed|live|v)/([A-Za-z0-9_-]{11})",
        primary: None,
        secondary: Some(1),
        canonical: "https://www.youtube.com/watch?v={1}",
    },
    IdentifyRule {
        shape: "channel",
        kind: ContentKind::Channel,
        pattern: r"^(?:[a-z0-9-]+\.)*youtube\.com/@([A-Za-z0-9._-]+)",
        primary: Some(1),
        secondary: None,
        canonical: "https://www.youtube.com/@{1}",
    },
    IdentifyRule {
        shape: "channel",
        kind: ContentKind::Channel,
        pattern: r"^(?:[a-z0-9-]+\.)*youtube\.com/(?:channel|c|user)/([A-Za-z0-9_-]+)",
        primary: Some(1),
        secondary: None,
        canonical: "https://www.youtube.com/channel/{1}",
    },
];

static IDENTIFIER: Lazy<Identifier> = Lazy::new(|| Identifier::new(RULES, &[]));

static LIKE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""likeCount":"?(\d+)"#,
        r#""label":"([\d,.]+) likes""#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

const PLAYER_MARKER: &str = "ytInitialPlayerResponse";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    video_details: Option<VideoDetails>,
    #[serde(default)]
    microformat: Value,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    video_id: String,
    title: Option<String>,
    author: Option<String>,
    view_count: Option<String>,
    length_seconds: Option<String>,
    thumbnail: Option<ThumbnailList>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailList {
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// What the watch page yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub views: u64,
    pub likes: u64,
    pub duration: u64,
    pub thumbnail: Option<String>,
    pub published: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoRecord {
    platform: &'static str,
    title: String,
    channel: String,
    views: u64,
    likes: u64,
    comments: u64,
    duration: u64,
    thumbnail: Option<String>,
    created: Option<String>,
    video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<bool>,
    message: String,
}

/// Deserializes the first JSON object after `marker`, ignoring whatever
/// script text trails it.
pub(crate) fn embedded_json<T: DeserializeOwned>(html: &str, marker: &str) -> Result<T, AnalyzeError> {
    let missing = || AnalyzeError::ExtractError(format!("{marker} not found"));
    let start = html.find(marker).ok_or_else(missing)?;
    let open = start + html[start..].find('{').ok_or_else(missing)?;

    serde_json::Deserializer::from_str(&html[open..])
        .into_iter::<T>()
        .next()
        .ok_or_else(missing)?
        .map_err(|e| AnalyzeError::ExtractError(format!("malformed {marker}: {e}")))
}

/// Parses the watch page of `video_id`.
pub fn parse_watch_page(html: &str) -> Result<VideoInfo, AnalyzeError> {
    let player: PlayerResponse = embedded_json(html, PLAYER_MARKER)?;

    if let Some(status) = &player.playability_status {
        if status.status != "OK" {
            return Err(AnalyzeError::external(
                "YouTube",
                status
                    .reason
                    .clone()
                    .unwrap_or_else(|| format!("video unavailable ({})", status.status)),
            ));
        }
    }

    let details = player
        .video_details
        .ok_or_else(|| AnalyzeError::ExtractError("videoDetails missing".into()))?;

    let likes = LIKE_PATTERNS
        .iter()
        .find_map(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .and_then(|m| crate::utils::parse_count(m.as_str()))
        .unwrap_or(0);

    let published = player.microformat["playerMicroformatRenderer"]["publishDate"]
        .as_str()
        .map(str::to_string);

    Ok(VideoInfo {
        video_id: details.video_id,
        title: details.title,
        channel: details.author,
        views: details
            .view_count
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        likes,
        duration: details
            .length_seconds
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        thumbnail: details
            .thumbnail
            .and_then(|t| t.thumbnails.into_iter().last())
            .map(|t| t.url),
        published,
    })
}

struct WatchPageAdapter {
    http: Arc<dyn HttpSource>,
}

#[async_trait]
impl Adapter<VideoInfo> for WatchPageAdapter {
    fn name(&self) -> &'static str {
        "watch-page"
    }

    async fn fetch(&self, descriptor: &ContentDescriptor) -> Result<VideoInfo, AnalyzeError> {
        let id = descriptor
            .content_id()
            .ok_or_else(|| AnalyzeError::Unsupported("no video id".into()))?;
        let url = format!("https://www.youtube.com/watch?v={id}&hl=en");
        let html = fetch_text(self.http.as_ref(), &url).await?;
        parse_watch_page(&html)
    }
}

pub struct YouTubeAnalyzer {
    chain: AdapterChain<VideoInfo>,
}

impl YouTubeAnalyzer {
    pub fn new(http: Arc<dyn HttpSource>) -> Self {
        let chain = AdapterChain::new("YouTube", |info: &VideoInfo| info.title.is_some())
            .with(WatchPageAdapter { http });
        Self { chain }
    }
}

#[async_trait]
impl PlatformAnalyzer for YouTubeAnalyzer {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn identify(&self, url: &str) -> ContentDescriptor {
        IDENTIFIER.identify(url)
    }

    #[instrument(level = "debug", skip(self), fields(url = %request.url()))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzeError> {
        let descriptor = self.identify(request.url());
        if descriptor.kind != ContentKind::Media {
            debug!(shape = descriptor.shape, "Not a YouTube video link");
            return Ok(AnalysisResult::unknown(
                "The link is valid but is not a YouTube video, or the platform was not recognized.",
            ));
        }

        let record = match self.chain.run(&descriptor).await {
            ChainOutcome::Found { value, .. } => VideoRecord {
                platform: "YouTube",
                title: value.title.unwrap_or_else(|| "Untitled".into()),
                channel: value.channel.unwrap_or_else(|| "Unknown channel".into()),
                views: value.views,
                likes: value.likes,
                comments: 0,
                duration: value.duration,
                thumbnail: value.thumbnail,
                created: value.published,
                video_id: Some(value.video_id),
                error: None,
                message: "YouTube video analyzed successfully".into(),
            },
            ChainOutcome::Exhausted { failures } => {
                let reason = last_failure(&failures)
                    .unwrap_or_else(|| "no data source answered".to_string());
                VideoRecord {
                    platform: "YouTube",
                    title: "Untitled".into(),
                    channel: "Unknown channel".into(),
                    views: 0,
                    likes: 0,
                    comments: 0,
                    duration: 0,
                    thumbnail: None,
                    created: None,
                    video_id: descriptor.secondary_id.clone(),
                    error: Some(true),
                    message: format!("YouTube analysis failed: {reason}"),
                }
            }
        };

        AnalysisResult::normalize(&record)
    }
}

//! Microblog analysis.
//!
//! Three community mirrors are tried in order for tweets. When none of them
//! returns real counters, the configured [`EngagementPolicy`] decides what
//! to report; estimated records are flagged with `estimated: true`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::chain::{Adapter, AdapterChain, ChainOutcome};
use crate::classifier::Platform;
use crate::descriptor::{ContentDescriptor, ContentKind, Identifier, IdentifyRule};
use crate::fallback::{Engagement, EngagementPolicy, TWITTER_ICON};
use crate::http::{fetch_json, HttpSource};
use crate::result::{AnalysisRequest, AnalysisResult};
use crate::utils::{self, capitalize, json_count};
use crate::{AnalyzeError, PlatformAnalyzer};

const RULES: &[IdentifyRule] = &[
    IdentifyRule {
        shape: "media",
        kind: ContentKind::Media,
        pattern: r"^(?:mobile\.)?twitter\.com/([A-Za-z0-9_]+)/status(?:es)?/(\d+)/(?:photo|video)/\d+",
        primary: Some(1),
        secondary: Some(2),
        canonical: "https://twitter.com/{1}/status/{2}",
    },
    IdentifyRule {
        shape: "tweet",
        kind: ContentKind::Post,
        pattern: r"^(?:mobile\.)?twitter\.com/([A-Za-z0-9_]+)/status(?:es)?/(\d+)",
        primary: Some(1),
        secondary: Some(2),
        canonical: "https://twitter.com/{1}/status/{2}",
    },
    IdentifyRule {
        shape: "tweet",
        kind: ContentKind::Post,
        pattern: r"^(?:mobile\.)?twitter\.com/i/(?:web/)?status/(\d+)",
        primary: None,
        secondary: Some(1),
        canonical: "https://twitter.com/i/web/status/{1}",
    },
    IdentifyRule {
        shape: "profile",
        kind: ContentKind::Profile,
        pattern: r"^(?:mobile\.)?twitter\.com/([A-Za-z0-9_]+)/?(?:\?.*)?$",
        primary: Some(1),
        secondary: None,
        canonical: "https://twitter.com/{1}",
    },
];

const RESERVED: &[&str] = &[
    "home",
    "explore",
    "search",
    "i",
    "settings",
    "notifications",
    "messages",
    "hashtag",
    "intent",
    "share",
    "login",
    "compose",
];

static IDENTIFIER: Lazy<Identifier> = Lazy::new(|| Identifier::new(RULES, RESERVED));

static RAW_HANDLE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)(?:twitter\.com|x\.com)/([^/?#]+)").ok());

/// Rewrites `x.com` links to `twitter.com`; other input is returned unchanged.
pub fn normalize_url(url: &str) -> String {
    let Some(mut parsed) = utils::parse_lenient(url) else {
        return url.to_string();
    };
    let is_x = matches!(utils::host_of(url).as_deref(), Some("x.com") | Some("mobile.x.com"));
    if is_x && parsed.set_host(Some("twitter.com")).is_ok() {
        return parsed.to_string();
    }
    url.to_string()
}

/// Tweet data as normalised from any mirror shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TweetData {
    pub text: Option<String>,
    pub author: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub created_at: Option<String>,
    pub thumbnail: Option<String>,
    pub video_url: Option<String>,
    pub engagement: Engagement,
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_count(tweet: &Value, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|key| json_count(&tweet[*key]))
        .unwrap_or(0)
}

fn first_text(tweet: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .find_map(|p| tweet.pointer(p).and_then(text))
}

/// Picks the first photo or video preview out of the known media layouts.
fn media_of(tweet: &Value) -> (Option<String>, Option<String>) {
    if let Some(photo) = first_text(tweet, &["/media/photos/0/url", "/photos/0/url"]) {
        return (Some(photo), None);
    }
    if let Some(video) = tweet.pointer("/media/videos/0") {
        return (text(&video["thumbnail_url"]), text(&video["url"]));
    }

    let first = tweet
        .pointer("/media/all/0")
        .or_else(|| tweet.pointer("/media_extended/0"))
        .or_else(|| tweet.pointer("/mediaDetails/0"));
    let Some(media) = first else {
        return (None, None);
    };
    let url = text(&media["url"]).or_else(|| text(&media["media_url_https"]));
    match media["type"].as_str() {
        Some("video") | Some("animated_gif") | Some("gif") => (
            text(&media["thumbnail_url"])
                .or_else(|| text(&media["media_url_https"]))
                .or_else(|| url.clone()),
            url,
        ),
        _ => (url, None),
    }
}

/// Reads a mirror payload. The tweet object may sit under `tweet`, under
/// `data`, or be the root itself.
pub fn parse_tweet(body: &Value) -> Result<TweetData, AnalyzeError> {
    let tweet = [&body["tweet"], &body["data"]]
        .into_iter()
        .find(|v| v.is_object())
        .unwrap_or(body);
    if !tweet.is_object() {
        return Err(AnalyzeError::ExtractError("mirror payload is not an object".into()));
    }

    let engagement = Engagement {
        likes: first_count(tweet, &["likes", "favorite_count", "like_count"]),
        retweets: first_count(tweet, &["retweets", "retweet_count"]),
        replies: first_count(tweet, &["replies", "reply_count", "conversation_count"]),
        views: first_count(tweet, &["views", "view_count"]),
    };
    let (thumbnail, video_url) = media_of(tweet);

    Ok(TweetData {
        text: first_text(tweet, &["/text", "/raw_text/text", "/full_text"]),
        author: first_text(tweet, &["/author/name", "/user/name", "/user_name"]),
        username: first_text(tweet, &["/author/screen_name", "/user/screen_name", "/user_screen_name"]),
        avatar: first_text(tweet, &["/author/avatar_url", "/user/profile_image_url_https"]),
        created_at: first_text(tweet, &["/created_at", "/date"]),
        thumbnail,
        video_url,
        engagement,
    })
}

/// One community mirror; `endpoint` builds its URL from the descriptor.
struct MirrorAdapter {
    name: &'static str,
    http: Arc<dyn HttpSource>,
    endpoint: fn(&str, &str) -> String,
}

#[async_trait]
impl Adapter<TweetData> for MirrorAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, descriptor: &ContentDescriptor) -> Result<TweetData, AnalyzeError> {
        let id = descriptor
            .content_id()
            .ok_or_else(|| AnalyzeError::Unsupported("mirrors only serve single tweets".into()))?;
        let handle = descriptor.handle().unwrap_or("i");
        let url = (self.endpoint)(handle, id);
        let body: Value = fetch_json(self.http.as_ref(), &url).await?;
        parse_tweet(&body)
    }
}

fn fxtwitter(handle: &str, id: &str) -> String {
    format!("https://api.fxtwitter.com/{handle}/status/{id}")
}

fn vxtwitter(handle: &str, id: &str) -> String {
    format!("https://api.vxtwitter.com/{handle}/status/{id}")
}

fn syndication(_handle: &str, id: &str) -> String {
    format!("https://cdn.syndication.twimg.com/tweet-result?id={id}")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TwitterRecord {
    platform: &'static str,
    #[serde(rename = "type")]
    content_type: &'static str,
    title: String,
    description: String,
    thumbnail: String,
    video_url: Option<String>,
    author: String,
    author_username: String,
    author_avatar: Option<String>,
    likes: u64,
    retweets: u64,
    replies: u64,
    views: u64,
    created_at: Option<String>,
    is_supported: bool,
    is_public: bool,
    estimated: bool,
    message: String,
    recommendation: String,
    content_id: Option<String>,
    tweet_url: String,
}

fn label(shape: &str) -> &'static str {
    match shape {
        "profile" => "account",
        "media" => "media",
        _ => "post",
    }
}

/// Advisory text keyed by content type and interactions per view.
pub fn recommendation(shape: &str, engagement: &Engagement, estimated: bool) -> String {
    let mut text = String::new();
    if estimated {
        text.push_str("These figures are estimated. ");
    }
    text.push_str(match shape {
        "profile" => "The account is ready for promotion; real followers add credibility.",
        "media" => "The media is ready for promotion and well suited to growing views.",
        _ => "The post is public and ready for promotion through likes and reposts.",
    });

    let rate = engagement.rate();
    text.push_str(if engagement.is_empty() {
        " Engagement data is unavailable."
    } else if rate > 5.0 {
        " Engagement rate is excellent and can be pushed further."
    } else if rate > 2.0 {
        " Engagement is good; more likes would improve it."
    } else {
        " Engagement is low; focus on likes and replies."
    });
    text
}

pub struct TwitterAnalyzer {
    chain: AdapterChain<TweetData>,
    policy: Arc<dyn EngagementPolicy>,
}

impl TwitterAnalyzer {
    pub fn new(http: Arc<dyn HttpSource>, policy: Arc<dyn EngagementPolicy>) -> Self {
        let chain = AdapterChain::new("Twitter", |t: &TweetData| !t.engagement.is_empty())
            .with(MirrorAdapter {
                name: "fxtwitter",
                http: http.clone(),
                endpoint: fxtwitter,
            })
            .with(MirrorAdapter {
                name: "vxtwitter",
                http: http.clone(),
                endpoint: vxtwitter,
            })
            .with(MirrorAdapter {
                name: "syndication",
                http,
                endpoint: syndication,
            });
        Self { chain, policy }
    }

    fn from_mirror(descriptor: &ContentDescriptor, tweet_url: String, data: TweetData) -> TwitterRecord {
        let handle = descriptor.handle().unwrap_or("user");
        let username = data.username.unwrap_or_else(|| handle.to_string());
        TwitterRecord {
            platform: "Twitter",
            content_type: descriptor.shape,
            title: data
                .text
                .map(|t| t.chars().take(140).collect())
                .unwrap_or_default(),
            description: format!("Post on Twitter (X) by @{username}"),
            thumbnail: data.thumbnail.unwrap_or_else(|| TWITTER_ICON.into()),
            video_url: data.video_url,
            author: data.author.unwrap_or_else(|| capitalize(&username)),
            author_username: username,
            author_avatar: data.avatar,
            likes: data.engagement.likes,
            retweets: data.engagement.retweets,
            replies: data.engagement.replies,
            views: data.engagement.views,
            created_at: data.created_at,
            is_supported: true,
            is_public: true,
            estimated: false,
            message: format!("Twitter {} analyzed successfully", label(descriptor.shape)),
            recommendation: recommendation(descriptor.shape, &data.engagement, false),
            content_id: descriptor.secondary_id.clone(),
            tweet_url,
        }
    }

    /// Policy-driven record for when no mirror produced counters.
    fn from_policy(
        &self,
        shape: &'static str,
        handle: &str,
        content_id: Option<String>,
        tweet_url: String,
    ) -> TwitterRecord {
        let estimate = self.policy.estimate(handle);
        let estimated = estimate.is_some();
        let engagement = estimate.unwrap_or_default();
        debug!(policy = self.policy.name(), handle, "Using engagement policy");

        let title = match shape {
            "profile" => format!("Profile - @{handle}"),
            "media" => format!("Media post from @{handle}"),
            _ => format!("New post from @{handle}"),
        };
        let message = if estimated {
            format!("Twitter {} analyzed with estimated engagement data", label(shape))
        } else {
            format!("Twitter {} recognized; engagement data is unavailable", label(shape))
        };

        TwitterRecord {
            platform: "Twitter",
            content_type: shape,
            title,
            description: format!("Content on Twitter (X) from @{handle}"),
            thumbnail: TWITTER_ICON.into(),
            video_url: None,
            author: capitalize(handle),
            author_username: handle.to_string(),
            author_avatar: None,
            likes: engagement.likes,
            retweets: engagement.retweets,
            replies: engagement.replies,
            views: engagement.views,
            created_at: None,
            is_supported: true,
            is_public: true,
            estimated,
            message,
            recommendation: recommendation(shape, &engagement, estimated),
            content_id,
            tweet_url,
        }
    }
}

/// Best-effort handle from an unrecognised link, or `"user"`. Reserved
/// path words such as `search` or `i` are never handles.
fn handle_from_raw(url: &str) -> String {
    RAW_HANDLE
        .as_ref()
        .and_then(|re| re.captures(url))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|h| !h.is_empty())
        .filter(|h| !RESERVED.iter().any(|r| r.eq_ignore_ascii_case(h)))
        .unwrap_or_else(|| "user".to_string())
}

#[async_trait]
impl PlatformAnalyzer for TwitterAnalyzer {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn identify(&self, url: &str) -> ContentDescriptor {
        IDENTIFIER.identify(&normalize_url(url))
    }

    #[instrument(level = "debug", skip(self), fields(url = %request.url()))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzeError> {
        let tweet_url = normalize_url(request.url());
        let descriptor = self.identify(request.url());

        if !descriptor.is_known() {
            debug!("Unrecognized Twitter link, deriving handle from the raw URL");
            let handle = handle_from_raw(request.url());
            let record = self.from_policy("tweet", &handle, None, tweet_url);
            return AnalysisResult::normalize(&record);
        }

        let outcome = if descriptor.kind == ContentKind::Profile {
            debug!("Profiles are not served by tweet mirrors");
            None
        } else {
            match self.chain.run(&descriptor).await {
                ChainOutcome::Found { value, source } => Some((value, source)),
                ChainOutcome::Exhausted { .. } => None,
            }
        };

        let record = match outcome {
            Some((data, source)) => {
                info!(source, likes = data.engagement.likes, "Tweet resolved from mirror");
                Self::from_mirror(&descriptor, tweet_url, data)
            }
            None => {
                let handle = descriptor.handle().unwrap_or("user").to_string();
                self.from_policy(
                    descriptor.shape,
                    &handle,
                    descriptor.secondary_id.clone(),
                    tweet_url,
                )
            }
        };

        AnalysisResult::normalize(&record)
    }
}

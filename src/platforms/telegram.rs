//! Messaging-platform analysis.
//!
//! Channels are first looked up through the Bot API when a token is
//! configured. Everything else comes from the public `t.me` preview pages,
//! tried from the most to the least specific candidate.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::chain::{Adapter, AdapterChain, ChainOutcome};
use crate::classifier::Platform;
use crate::config::ENV_TELEGRAM_BOT_TOKEN;
use crate::descriptor::{ContentDescriptor, ContentKind, Identifier, IdentifyRule};
use crate::extractor::{meta, MetaField, MetaRule, MetadataExtractor};
use crate::fallback::TELEGRAM_LOGO;
use crate::http::{fetch_text, HttpSource};
use crate::result::{AnalysisRequest, AnalysisResult};
use crate::utils::{self, decode_entities, json_count, parse_count, strip_tags};
use crate::{AnalyzeError, PlatformAnalyzer};

const RULES: &[IdentifyRule] = &[
    IdentifyRule {
        shape: "post",
        kind: ContentKind::Post,
        pattern: r"^(?:t\.me|telegram\.me|telegram\.dog)/s/([A-Za-z0-9_]+)/(\d+)",
        primary: Some(1),
        secondary: Some(2),
        canonical: "https://t.me/{1}/{2}",
    },
    IdentifyRule {
        shape: "channel",
        kind: ContentKind::Channel,
        pattern: r"^(?:t\.me|telegram\.me|telegram\.dog)/s/([A-Za-z0-9_]+)/?(?:\?.*)?$",
        primary: Some(1),
        secondary: None,
        canonical: "https://t.me/s/{1}",
    },
    IdentifyRule {
        shape: "invite",
        kind: ContentKind::Channel,
        pattern: r"^(?:t\.me|telegram\.me|telegram\.dog)/\+([A-Za-z0-9_-]+)",
        primary: None,
        secondary: Some(1),
        canonical: "https://t.me/+{1}",
    },
    IdentifyRule {
        shape: "invite",
        kind: ContentKind::Channel,
        pattern: r"^(?:t\.me|telegram\.me|telegram\.dog)/joinchat/([A-Za-z0-9_-]+)",
        primary: None,
        secondary: Some(1),
        canonical: "https://t.me/joinchat/{1}",
    },
    IdentifyRule {
        shape: "post",
        kind: ContentKind::Post,
        pattern: r"^(?:t\.me|telegram\.me|telegram\.dog)/([A-Za-z0-9_]+)/(\d+)",
        primary: Some(1),
        secondary: Some(2),
        canonical: "https://t.me/{1}/{2}",
    },
    IdentifyRule {
        shape: "channel",
        kind: ContentKind::Channel,
        pattern: r"^(?:t\.me|telegram\.me|telegram\.dog)/([A-Za-z0-9_]+)/?(?:\?.*)?$",
        primary: Some(1),
        secondary: None,
        canonical: "https://t.me/{1}",
    },
];

const RESERVED: &[&str] = &[
    "s",
    "joinchat",
    "addstickers",
    "addemoji",
    "share",
    "proxy",
    "socks",
    "iv",
    "setlanguage",
];

static IDENTIFIER: Lazy<Identifier> = Lazy::new(|| Identifier::new(RULES, RESERVED));

/// Preview tags only. The `<title>` element is ignored: every t.me page has
/// one, including the generic landing page served for unknown chats.
const PAGE_META_RULES: &[MetaRule] = &[
    meta(MetaField::Title, "meta[property='og:title'], meta[name='og:title']"),
    meta(MetaField::Title, "meta[name='twitter:title'], meta[property='twitter:title']"),
    meta(MetaField::Title, "meta[name='title'], meta[property='title']"),
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
];

static MEMBERS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,.\s]*[kmb]?)\s*(?:subscribers|members|مشترك)").ok()
});

static VIEWS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"(?i)class="[^"]*tgme_widget_message_views[^"]*"[^>]*>([^<]*)</(?:span|div)>"#).ok()
});

static POST_TEXT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*tgme_widget_message_text[^"]*"[^>]*>(.*?)</div>"#).ok()
});

static PRIVATE_MARKER: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)This (?:channel|group) is private|هذه القناة خاصة|المجموعة خاصة").ok()
});

fn capture(re: &Lazy<Option<Regex>>, haystack: &str) -> Option<String> {
    re.as_ref()?
        .captures(haystack)?
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// What a page or the Bot API told us about a chat or message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatInfo {
    pub content_type: &'static str,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub members: Option<u64>,
    pub views: Option<u64>,
    pub post_text: Option<String>,
    pub is_private: bool,
    pub url: String,
}

impl ChatInfo {
    fn is_usable(&self) -> bool {
        self.title.is_some() || self.members.is_some() || self.views.is_some() || self.is_private
    }
}

/// Post, group or channel, judged by the shape of the page URL.
pub fn content_type_of(url: &str) -> &'static str {
    let segments = utils::path_segments(url);
    let is_post = segments
        .last()
        .is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()));
    if is_post {
        "post"
    } else if segments
        .iter()
        .any(|s| s.starts_with('+') || s == "joinchat" || s.contains("invite"))
    {
        "group"
    } else {
        "channel"
    }
}

/// Parses a public preview page fetched from `source_url`.
///
/// A post never reports a member count and a channel never reports a view
/// count, whatever the page happened to contain.
pub fn parse_page(html: &str, source_url: &str) -> ChatInfo {
    let decoded = decode_entities(html);
    let page_meta = MetadataExtractor::new().extract_with(html, PAGE_META_RULES);

    let mut members = capture(&MEMBERS, &decoded).and_then(|raw| parse_count(&raw));
    let mut views = capture(&VIEWS, &decoded).and_then(|raw| parse_count(&raw));
    let post_text = capture(&POST_TEXT, html)
        .map(|fragment| strip_tags(&fragment))
        .filter(|text| !text.is_empty());
    let is_private = PRIVATE_MARKER
        .as_ref()
        .is_some_and(|re| re.is_match(&decoded));

    let content_type = content_type_of(source_url);
    match content_type {
        "post" => members = None,
        "channel" => views = None,
        _ => {}
    }

    ChatInfo {
        content_type,
        title: page_meta.title,
        description: page_meta.description,
        thumbnail: page_meta.image,
        members,
        views,
        post_text,
        is_private,
        url: source_url.to_string(),
    }
}

/// Candidate page for a descriptor, or `None` when it does not apply.
type Candidate = fn(&ContentDescriptor) -> Option<String>;

fn message_page(d: &ContentDescriptor) -> Option<String> {
    Some(format!("https://t.me/{}/{}", d.handle()?, d.content_id()?))
}

fn message_preview(d: &ContentDescriptor) -> Option<String> {
    Some(format!("https://t.me/s/{}/{}", d.handle()?, d.content_id()?))
}

fn channel_preview(d: &ContentDescriptor) -> Option<String> {
    Some(format!("https://t.me/s/{}", d.handle()?))
}

fn channel_page(d: &ContentDescriptor) -> Option<String> {
    Some(format!("https://t.me/{}", d.handle()?))
}

fn invite_page(d: &ContentDescriptor) -> Option<String> {
    (d.shape == "invite").then(|| d.canonical_url.clone())
}

struct PageAdapter {
    name: &'static str,
    http: Arc<dyn HttpSource>,
    candidate: Candidate,
}

#[async_trait]
impl Adapter<ChatInfo> for PageAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, descriptor: &ContentDescriptor) -> Result<ChatInfo, AnalyzeError> {
        let url = (self.candidate)(descriptor)
            .ok_or_else(|| AnalyzeError::Unsupported(format!("{} does not apply", self.name)))?;
        let html = fetch_text(self.http.as_ref(), &url).await?;
        if html.len() < 50 {
            return Err(AnalyzeError::ExtractError(format!("page {url} is too short")));
        }
        Ok(parse_page(&html, &url))
    }
}

/// Authenticated directory lookup: `getChat`, `getChatMemberCount`, `getFile`.
struct BotApiAdapter {
    http: Arc<dyn HttpSource>,
    token: String,
}

impl BotApiAdapter {
    async fn call(&self, method: &str, query: &str) -> Result<Value, AnalyzeError> {
        let url = format!("https://api.telegram.org/bot{}/{method}?{query}", self.token);
        let response = self.http.get(&url).await?;
        let body: Value = serde_json::from_str(&response.body).map_err(|_| {
            AnalyzeError::from_status(response.status, &format!("Bot API {method}"))
        })?;

        if body["ok"].as_bool() != Some(true) {
            let reason = body["description"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{method} failed"));
            return Err(AnalyzeError::external("Telegram Bot API", reason));
        }
        Ok(body["result"].clone())
    }

    async fn photo_url(&self, chat: &Value) -> Option<String> {
        let file_id = chat.pointer("/photo/big_file_id")?.as_str()?;
        let query = format!("file_id={}", urlencoding::encode(file_id));
        let file = self.call("getFile", &query).await.ok()?;
        let path = file["file_path"].as_str()?;
        Some(format!("https://api.telegram.org/file/bot{}/{path}", self.token))
    }
}

#[async_trait]
impl Adapter<ChatInfo> for BotApiAdapter {
    fn name(&self) -> &'static str {
        "bot-api"
    }

    async fn fetch(&self, descriptor: &ContentDescriptor) -> Result<ChatInfo, AnalyzeError> {
        let handle = descriptor
            .handle()
            .filter(|_| descriptor.kind == ContentKind::Channel)
            .ok_or_else(|| AnalyzeError::Unsupported("Bot API lookups need a public channel".into()))?;
        let query = format!("chat_id={}", urlencoding::encode(&format!("@{handle}")));

        let chat = self.call("getChat", &query).await?;
        let members = match self.call("getChatMemberCount", &query).await {
            Ok(count) => json_count(&count),
            Err(e) => {
                debug!(error = %e, "Member count unavailable");
                None
            }
        };
        let thumbnail = self.photo_url(&chat).await;

        let content_type = match chat["type"].as_str() {
            Some("group") | Some("supergroup") => "group",
            _ => "channel",
        };

        Ok(ChatInfo {
            content_type,
            title: chat["title"].as_str().map(str::to_string),
            description: chat["description"].as_str().map(str::to_string),
            thumbnail,
            members,
            views: None,
            post_text: None,
            is_private: false,
            url: format!("https://t.me/{handle}"),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TelegramRecord {
    platform: &'static str,
    #[serde(rename = "type")]
    content_type: &'static str,
    username: Option<String>,
    title: String,
    description: String,
    thumbnail: String,
    members: Option<u64>,
    views: Option<u64>,
    post_text: Option<String>,
    is_private: bool,
    is_public: bool,
    recommendation: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<bool>,
    message: String,
}

fn recommendation(content_type: &str, is_private: bool) -> String {
    if is_private {
        return "The chat is private; promotion needs a public link.".into();
    }
    match content_type {
        "post" => "The post is ready for promotion; views and engagement can be increased.",
        "group" => "The group is ready for promotion; membership can be increased.",
        _ => "The channel is ready for promotion; subscribers can be increased.",
    }
    .into()
}

pub struct TelegramAnalyzer {
    post_chain: AdapterChain<ChatInfo>,
    channel_chain: AdapterChain<ChatInfo>,
    invite_chain: AdapterChain<ChatInfo>,
}

impl TelegramAnalyzer {
    /// Without a `bot_token` only the public pages are used.
    pub fn new(http: Arc<dyn HttpSource>, bot_token: Option<String>) -> Self {
        let page = |name: &'static str, candidate: Candidate| PageAdapter {
            name,
            http: http.clone(),
            candidate,
        };

        let post_chain = AdapterChain::new("Telegram", ChatInfo::is_usable)
            .with(page("message-page", message_page))
            .with(page("message-preview", message_preview))
            .with(page("channel-preview", channel_preview))
            .with(page("channel-page", channel_page));

        let mut channel_chain = AdapterChain::new("Telegram", ChatInfo::is_usable);
        match bot_token {
            Some(token) => {
                channel_chain = channel_chain.with(BotApiAdapter {
                    http: http.clone(),
                    token,
                });
            }
            None => debug!("{} not set, Bot API tier disabled", ENV_TELEGRAM_BOT_TOKEN),
        }
        let channel_chain = channel_chain
            .with(page("channel-preview", channel_preview))
            .with(page("channel-page", channel_page));

        let invite_chain =
            AdapterChain::new("Telegram", ChatInfo::is_usable).with(page("invite-page", invite_page));

        Self {
            post_chain,
            channel_chain,
            invite_chain,
        }
    }

    fn chain_for(&self, descriptor: &ContentDescriptor) -> &AdapterChain<ChatInfo> {
        match (descriptor.kind, descriptor.shape) {
            (ContentKind::Post, _) => &self.post_chain,
            (_, "invite") => &self.invite_chain,
            _ => &self.channel_chain,
        }
    }

    fn unavailable(descriptor: &ContentDescriptor) -> TelegramRecord {
        let content_type = match (descriptor.kind, descriptor.shape) {
            (ContentKind::Post, _) => "post",
            (_, "invite") => "group",
            _ => "channel",
        };
        TelegramRecord {
            platform: "Telegram",
            content_type,
            username: descriptor.primary_id.clone(),
            title: format!("Telegram {content_type}"),
            description: "Details are unavailable; the chat may be private or restricted.".into(),
            thumbnail: TELEGRAM_LOGO.into(),
            members: None,
            views: None,
            post_text: None,
            is_private: false,
            is_public: true,
            recommendation: recommendation(content_type, false),
            url: descriptor.canonical_url.clone(),
            error: None,
            message: "Telegram link recognized, but its details could not be fetched".into(),
        }
    }
}

#[async_trait]
impl PlatformAnalyzer for TelegramAnalyzer {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    fn identify(&self, url: &str) -> ContentDescriptor {
        IDENTIFIER.identify(url)
    }

    #[instrument(level = "debug", skip(self), fields(url = %request.url()))]
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzeError> {
        let descriptor = self.identify(request.url());
        if !descriptor.is_known() {
            let mut record = Self::unavailable(&descriptor);
            record.content_type = "unknown";
            record.title = "Telegram link".into();
            record.error = Some(true);
            record.message = "Invalid Telegram link".into();
            return AnalysisResult::normalize(&record);
        }

        let record = match self.chain_for(&descriptor).run(&descriptor).await {
            ChainOutcome::Found { value, source } => {
                info!(source, kind = value.content_type, "Telegram content resolved");
                let message = if source == "bot-api" {
                    "Telegram chat details fetched from the Bot API"
                } else {
                    "Telegram details fetched from t.me pages"
                };
                TelegramRecord {
                    platform: "Telegram",
                    content_type: value.content_type,
                    username: descriptor.primary_id.clone(),
                    title: value.title.unwrap_or_else(|| "Telegram post".into()),
                    description: value
                        .description
                        .unwrap_or_else(|| "Telegram content".into()),
                    thumbnail: value.thumbnail.unwrap_or_else(|| TELEGRAM_LOGO.into()),
                    members: value.members,
                    views: value.views,
                    post_text: value.post_text,
                    is_private: value.is_private,
                    is_public: !value.is_private,
                    recommendation: recommendation(value.content_type, value.is_private),
                    url: value.url,
                    error: None,
                    message: message.into(),
                }
            }
            ChainOutcome::Exhausted { .. } => Self::unavailable(&descriptor),
        };

        AnalysisResult::normalize(&record)
    }
}

//! Per-platform analyzers.
//!
//! Each module owns its URL identification table, its ordered adapter
//! chain and its terminal fallback record:
//!
//! - [`youtube`]: watch-page player response, error record on failure
//! - [`tiktok`]: tikwm mirror, placeholder on failure
//! - [`instagram`]: public page preview image, generated placeholders
//! - [`facebook`]: iframely unfurling, error record on failure
//! - [`twitter`]: fxtwitter / vxtwitter / syndication, then the engagement policy
//! - [`telegram`]: Bot API for channels, then `t.me` preview pages

pub mod facebook;
pub mod instagram;
pub mod telegram;
pub mod tiktok;
pub mod twitter;
pub mod youtube;

pub use facebook::FacebookAnalyzer;
pub use instagram::InstagramAnalyzer;
pub use telegram::TelegramAnalyzer;
pub use tiktok::TikTokAnalyzer;
pub use twitter::TwitterAnalyzer;
pub use youtube::YouTubeAnalyzer;

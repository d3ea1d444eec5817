use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils;

/// Platform a link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Long-form video host.
    YouTube,
    /// Short-video platform.
    TikTok,
    /// Photo-sharing platform.
    Instagram,
    /// General social network.
    Facebook,
    /// Microblog.
    Twitter,
    /// Messaging platform with public channels.
    Telegram,
    Unknown,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::TikTok => "TikTok",
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
            Platform::Twitter => "Twitter",
            Platform::Telegram => "Telegram",
            Platform::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host fragments, checked in order. First match wins.
const HOST_TABLE: &[(&str, Platform)] = &[
    ("youtube.com", Platform::YouTube),
    ("youtu.be", Platform::YouTube),
    ("youtube-nocookie.com", Platform::YouTube),
    ("tiktok.com", Platform::TikTok),
    ("instagram.com", Platform::Instagram),
    ("instagr.am", Platform::Instagram),
    ("facebook.com", Platform::Facebook),
    ("fb.watch", Platform::Facebook),
    ("fb.com", Platform::Facebook),
    ("twitter.com", Platform::Twitter),
    ("x.com", Platform::Twitter),
    ("t.me", Platform::Telegram),
    ("telegram.me", Platform::Telegram),
    ("telegram.dog", Platform::Telegram),
];

/// Classifies a raw link. Never fails; unrecognised input yields [`Platform::Unknown`].
pub fn classify(url: &str) -> Platform {
    let Some(host) = utils::host_of(url) else {
        return Platform::Unknown;
    };

    HOST_TABLE
        .iter()
        .find(|(fragment, _)| {
            host == *fragment
                || host
                    .strip_suffix(fragment)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, platform)| *platform)
        .unwrap_or(Platform::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_hosts() {
        assert_eq!(classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), Platform::YouTube);
        assert_eq!(classify("https://youtu.be/dQw4w9WgXcQ"), Platform::YouTube);
        assert_eq!(classify("https://m.youtube.com/shorts/abc"), Platform::YouTube);
        assert_eq!(classify("https://vt.tiktok.com/ZSabc/"), Platform::TikTok);
        assert_eq!(classify("https://www.instagram.com/reel/ABC123/"), Platform::Instagram);
        assert_eq!(classify("https://fb.watch/abc/"), Platform::Facebook);
        assert_eq!(classify("https://x.com/jack/status/20"), Platform::Twitter);
        assert_eq!(classify("https://mobile.twitter.com/jack"), Platform::Twitter);
        assert_eq!(classify("https://t.me/durov"), Platform::Telegram);
    }

    #[test]
    fn tolerates_slashes_case_and_missing_scheme() {
        assert_eq!(classify("//HTTPS://T.ME/Durov/5"), Platform::Telegram);
        assert_eq!(classify("  instagram.com/nasa "), Platform::Instagram);
        assert_eq!(classify("/x.com/jack"), Platform::Twitter);
    }

    #[test]
    fn does_not_match_lookalike_hosts() {
        assert_eq!(classify("https://dropbox.com/s/file"), Platform::Unknown);
        assert_eq!(classify("https://notyoutube.com/watch"), Platform::Unknown);
        assert_eq!(classify("https://example.com/foo"), Platform::Unknown);
    }

    #[test]
    fn garbage_is_unknown_and_stable() {
        for input in ["", "///", "not a url at all", "http://"] {
            assert_eq!(classify(input), Platform::Unknown);
            assert_eq!(classify(input), classify(input));
        }
    }
}

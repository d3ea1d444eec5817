use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::fallback::{EngagementPolicy, FabricatedEngagement, StrictEngagement};
use crate::fetcher::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_IFRAMELY_API_KEY: &str = "IFRAMELY_API_KEY";
pub const ENV_STATS_POLICY: &str = "LINK_ANALYZER_STATS";
pub const ENV_STATS_SEED: &str = "LINK_ANALYZER_SEED";
pub const ENV_TIMEOUT_SECS: &str = "LINK_ANALYZER_TIMEOUT_SECS";

/// What to report when real engagement counters are unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPolicy {
    /// Plausible estimates, always labelled as estimated.
    Fabricated { seed: Option<u64> },
    /// Zeros.
    Strict,
}

impl Default for StatsPolicy {
    fn default() -> Self {
        StatsPolicy::Fabricated { seed: None }
    }
}

impl StatsPolicy {
    pub fn build(self) -> Arc<dyn EngagementPolicy> {
        match self {
            StatsPolicy::Fabricated { seed } => Arc::new(FabricatedEngagement::new(seed)),
            StatsPolicy::Strict => Arc::new(StrictEngagement),
        }
    }
}

/// Startup configuration, read once and passed down explicitly.
#[derive(Clone)]
pub struct AnalyzerConfig {
    pub telegram_bot_token: Option<String>,
    pub iframely_api_key: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub stats_policy: StatsPolicy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            iframely_api_key: None,
            request_timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            stats_policy: StatsPolicy::default(),
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("telegram_bot_token", &self.telegram_bot_token.as_ref().map(|_| "<redacted>"))
            .field("iframely_api_key", &self.iframely_api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .field("stats_policy", &self.stats_policy)
            .finish()
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let seed = get(ENV_STATS_SEED).and_then(|raw| match raw.parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_) => {
                warn!(value = %raw, "Ignoring non-numeric {}", ENV_STATS_SEED);
                None
            }
        });

        let stats_policy = match get(ENV_STATS_POLICY).as_deref() {
            Some("strict") => StatsPolicy::Strict,
            Some("fabricated") | None => StatsPolicy::Fabricated { seed },
            Some(other) => {
                warn!(value = %other, "Unknown stats policy, using fabricated");
                StatsPolicy::Fabricated { seed }
            }
        };

        let request_timeout = get(ENV_TIMEOUT_SECS)
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.clamp(1, 60)))
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            telegram_bot_token: get(ENV_TELEGRAM_BOT_TOKEN),
            iframely_api_key: get(ENV_IFRAMELY_API_KEY),
            request_timeout,
            stats_policy,
            ..Self::default()
        }
    }

    pub fn with_telegram_bot_token(mut self, token: impl Into<String>) -> Self {
        self.telegram_bot_token = Some(token.into());
        self
    }

    pub fn with_iframely_api_key(mut self, key: impl Into<String>) -> Self {
        self.iframely_api_key = Some(key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_stats_policy(mut self, policy: StatsPolicy) -> Self {
        self.stats_policy = policy;
        self
    }
}

use async_trait::async_trait;

mod analyzer;
mod artifacts;
pub mod chain;
mod classifier;
mod config;
pub mod descriptor;
mod error;
mod extractor;
pub mod fallback;
mod fetcher;
mod http;
mod logging;
pub mod platforms;
mod result;
mod utils;

pub use analyzer::LinkAnalyzer;
pub use artifacts::ArtifactSweeper;
pub use classifier::{classify, Platform};
pub use config::{
    AnalyzerConfig, StatsPolicy, ENV_IFRAMELY_API_KEY, ENV_STATS_POLICY, ENV_STATS_SEED,
    ENV_TELEGRAM_BOT_TOKEN, ENV_TIMEOUT_SECS,
};
pub use descriptor::{ContentDescriptor, ContentKind};
pub use error::AnalyzeError;
pub use extractor::{MetadataExtractor, PageMeta};
pub use fallback::{Engagement, EngagementPolicy, FabricatedEngagement, StrictEngagement};
pub use fetcher::{Fetcher, FetcherConfig};
pub use http::{CannedSource, FetchResponse, HttpSource};
pub use logging::{log_error_card, log_result_card, setup_logging, LogConfig};
pub use result::{AnalysisRequest, AnalysisResult};

/// One platform's analysis pipeline: identify, walk the adapter chain,
/// fall back, normalise.
#[async_trait]
pub trait PlatformAnalyzer: Send + Sync {
    fn platform(&self) -> Platform;

    /// Pure URL-shape identification, no I/O.
    fn identify(&self, url: &str) -> ContentDescriptor;

    /// `Err` only for unexpected internal failures; upstream problems are
    /// reported inside the returned record.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzeError>;
}

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::platforms::{
    FacebookAnalyzer, InstagramAnalyzer, TelegramAnalyzer, TikTokAnalyzer, TwitterAnalyzer,
    YouTubeAnalyzer,
};
use crate::{
    classify, log_error_card, log_result_card, AnalysisRequest, AnalysisResult, AnalyzeError,
    AnalyzerConfig, Fetcher, FetcherConfig, HttpSource, Platform, PlatformAnalyzer,
};

pub const UNKNOWN_PLATFORM_MESSAGE: &str = "The platform of this link was not recognized.";

/// Top-level dispatcher: classify, route to the platform analyzer, and turn
/// every escaping failure into a well-formed record.
pub struct LinkAnalyzer {
    analyzers: Vec<Arc<dyn PlatformAnalyzer>>,
}

impl LinkAnalyzer {
    /// Builds a dispatcher backed by a real HTTP client.
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzeError> {
        let fetcher = Fetcher::new_with_config(FetcherConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout,
            ..FetcherConfig::default()
        })?;
        Ok(Self::with_source(config, Arc::new(fetcher)))
    }

    /// Builds a dispatcher over any [`HttpSource`], e.g. a [`crate::CannedSource`].
    pub fn with_source(config: AnalyzerConfig, http: Arc<dyn HttpSource>) -> Self {
        debug!(?config, "Initializing LinkAnalyzer");
        let policy = config.stats_policy.build();

        let analyzers: Vec<Arc<dyn PlatformAnalyzer>> = vec![
            Arc::new(YouTubeAnalyzer::new(http.clone())),
            Arc::new(TikTokAnalyzer::new(http.clone())),
            Arc::new(InstagramAnalyzer::new(http.clone())),
            Arc::new(FacebookAnalyzer::new(
                http.clone(),
                config.iframely_api_key.clone(),
            )),
            Arc::new(TwitterAnalyzer::new(http.clone(), policy)),
            Arc::new(TelegramAnalyzer::new(http, config.telegram_bot_token.clone())),
        ];

        Self { analyzers }
    }

    pub fn analyzer_for(&self, platform: Platform) -> Option<&dyn PlatformAnalyzer> {
        self.analyzers
            .iter()
            .find(|a| a.platform() == platform)
            .map(|a| a.as_ref())
    }

    /// Analyzes one link. Never fails: unknown links, upstream outages,
    /// internal errors and panics all come back as records.
    #[instrument(level = "debug", skip(self))]
    pub async fn analyze(&self, url: &str) -> AnalysisResult {
        let request = AnalysisRequest::new(url);
        let platform = classify(request.url());
        info!(url = %request.url(), platform = %platform, "Starting analysis");

        let Some(analyzer) = self.analyzer_for(platform) else {
            let result = AnalysisResult::unknown(UNKNOWN_PLATFORM_MESSAGE);
            log_result_card(&result, request.url());
            return result;
        };

        let outcome = AssertUnwindSafe(analyzer.analyze(&request))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                e.log();
                log_error_card(request.url(), &e);
                AnalysisResult::failure(platform.name(), format!("Technical error: {e}"))
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(platform = %platform, reason = %reason, "Analyzer panicked");
                AnalysisResult::failure(platform.name(), format!("Technical error: {reason}"))
            }
        };

        log_result_card(&result, request.url());
        result
    }
}

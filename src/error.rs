use thiserror::Error;
use tracing::{error, warn};

use crate::utils::redact_url;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Request timeout: {0}")]
    TimeoutError(String),

    #[error("DNS resolution failed: {0}")]
    DnsError(String),

    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Client error ({status}): {message}")]
    ClientError { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("External service error: {service} - {message}")]
    ExternalServiceError { service: String, message: String },

    #[error("Unsupported content: {0}")]
    Unsupported(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalyzeError {
    /// Maps a non-success HTTP status to the matching variant. `url` is
    /// redacted before it is embedded in the message.
    pub fn from_status(status: u16, url: &str) -> Self {
        let url = redact_url(url);
        match status {
            404 => AnalyzeError::NotFound(format!("{url} not found")),
            429 => AnalyzeError::RateLimitError(format!("{url} answered 429")),
            400..=499 => AnalyzeError::ClientError {
                status,
                message: format!("request to {url} rejected"),
            },
            500..=599 => AnalyzeError::ServerError {
                status,
                message: format!("{url} failed upstream"),
            },
            _ => AnalyzeError::FetchError(format!("unexpected status {status} from {url}")),
        }
    }

    pub fn external(service: &str, message: impl Into<String>) -> Self {
        AnalyzeError::ExternalServiceError {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn log(&self) {
        match self {
            AnalyzeError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            AnalyzeError::InvalidUrl(e) => {
                warn!(error = %e, "Invalid URL");
            }
            AnalyzeError::FetchError(e) => {
                warn!(error = %e, "Content fetch failed");
            }
            AnalyzeError::TimeoutError(e) => {
                warn!(error = %e, "Request timed out");
            }
            AnalyzeError::DnsError(e) => {
                warn!(error = %e, "DNS lookup failed");
            }
            AnalyzeError::ConnectionError(e) => {
                warn!(error = %e, "Connection failed");
            }
            AnalyzeError::NotFound(e) => {
                warn!(error = %e, "Resource not found");
            }
            AnalyzeError::ClientError { status, message } => {
                warn!(status = *status, error = %message, "Upstream rejected request");
            }
            AnalyzeError::ServerError { status, message } => {
                warn!(status = *status, error = %message, "Upstream server error");
            }
            AnalyzeError::RateLimitError(e) => {
                warn!(error = %e, "Rate limit exceeded");
            }
            AnalyzeError::ExtractError(e) => {
                warn!(error = %e, "Metadata extraction failed");
            }
            AnalyzeError::ExternalServiceError { service, message } => {
                warn!(
                    service = %service,
                    error = %message,
                    "External service error occurred"
                );
            }
            AnalyzeError::Unsupported(e) => {
                warn!(error = %e, "Adapter does not support this content");
            }
            AnalyzeError::MissingCredential(name) => {
                warn!(credential = %name, "Credential not configured");
            }
            AnalyzeError::SerializationError(e) => {
                error!(error = %e, "Result serialization failed");
            }
            AnalyzeError::Config(e) => {
                error!(error = %e, "Invalid configuration");
            }
        }
    }
}

impl From<reqwest::Error> for AnalyzeError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| redact_url(u.as_str()));
        let e = e.without_url();
        if e.is_timeout() {
            return AnalyzeError::TimeoutError(e.to_string());
        }
        if e.is_connect() {
            let text = e.to_string().to_lowercase();
            if text.contains("dns") || text.contains("resolve") {
                return AnalyzeError::DnsError(e.to_string());
            }
            return AnalyzeError::ConnectionError(e.to_string());
        }
        if let Some(status) = e.status() {
            return AnalyzeError::from_status(status.as_u16(), url.as_deref().unwrap_or("upstream"));
        }
        AnalyzeError::FetchError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            AnalyzeError::from_status(404, "https://t.me/x"),
            AnalyzeError::NotFound(_)
        ));
        assert!(matches!(
            AnalyzeError::from_status(429, "u"),
            AnalyzeError::RateLimitError(_)
        ));
        assert!(matches!(
            AnalyzeError::from_status(403, "u"),
            AnalyzeError::ClientError { status: 403, .. }
        ));
        assert!(matches!(
            AnalyzeError::from_status(502, "u"),
            AnalyzeError::ServerError { status: 502, .. }
        ));
    }

    #[test]
    fn status_errors_never_carry_credentials() {
        let err = AnalyzeError::from_status(
            401,
            "https://api.telegram.org/bot123456:SECRETTOKEN/getChat?chat_id=%40x",
        );
        let text = err.to_string();
        assert!(!text.contains("SECRETTOKEN"), "{text}");
        assert!(text.contains("api.telegram.org/bot<redacted>/getChat"));

        let err = AnalyzeError::from_status(403, "https://iframe.ly/api/iframely?url=x&api_key=KEY");
        assert!(!err.to_string().contains("KEY"));
    }
}

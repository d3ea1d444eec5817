use crate::utils::{redact_url, truncate_str};
use crate::{AnalysisResult, AnalyzeError};
use std::fmt::Display;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub const LOG_FILE_NAME: &str = "link-analyzer.log";

#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: false,
        }
    }
}

fn create_separator(width: usize, ch: char) -> String {
    std::iter::repeat(ch).take(width).collect()
}

fn field_or_na(result: &AnalysisResult, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match result.get(key)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| "N/A".to_string())
}

/// Boxed summary of a finished analysis, written to the diagnostic channel.
pub fn log_result_card(result: &AnalysisResult, url: &str) {
    const CARD_WIDTH: usize = 80;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 12;

    let horizontal_line = create_separator(CARD_WIDTH - 2, '═');
    let rows = [
        ("URL", truncate_str(&redact_url(url), CONTENT_WIDTH)),
        ("Platform", result.platform().to_string()),
        (
            "Title",
            truncate_str(&field_or_na(result, &["title", "fullName"]), CONTENT_WIDTH),
        ),
        (
            "Author",
            truncate_str(
                &field_or_na(result, &["author", "channel", "username"]),
                CONTENT_WIDTH,
            ),
        ),
        (
            "Image",
            truncate_str(
                &redact_url(&field_or_na(result, &["thumbnail", "profilePic"])),
                CONTENT_WIDTH,
            ),
        ),
        ("Message", truncate_str(result.message(), CONTENT_WIDTH)),
    ];

    let body: String = rows
        .iter()
        .map(|(label, value)| format!("\n {label:<9} {value}"))
        .collect();

    if result.is_error() {
        error!("\n╔{horizontal_line}╗{body}\n╚{horizontal_line}╝");
    } else {
        info!("\n╔{horizontal_line}╗{body}\n╚{horizontal_line}╝");
    }
}

pub fn log_error_card<E: Display + std::error::Error>(url: &str, error: &E) {
    const CARD_WIDTH: usize = 70;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 10;

    let top_bottom = create_separator(CARD_WIDTH - 2, '═');
    let middle = create_separator(CARD_WIDTH - 2, '─');

    let mut error_details = error.to_string();
    if let Some(source) = error.source() {
        error_details = format!("{error_details} (cause: {source})");
    }

    error!(
        "\n╔═{}═╗\n\
         ║ URL:   {:<width$} ║\n\
         ║{}║\n\
         ║ Error: {:<width$} ║\n\
         ╚═{}═╝",
        top_bottom,
        truncate_str(&redact_url(url), CONTENT_WIDTH),
        middle,
        truncate_str(&error_details, CONTENT_WIDTH),
        top_bottom,
        width = CONTENT_WIDTH
    );
}

/// Installs the global subscriber. The console layer writes to stderr so
/// stdout stays reserved for the JSON result.
pub fn setup_logging(config: LogConfig) -> Result<(), AnalyzeError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .compact();
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        #[cfg(feature = "file-log")]
        {
            use tracing_appender::rolling::{RollingFileAppender, Rotation};

            std::fs::create_dir_all(&config.log_dir).map_err(|e| {
                AnalyzeError::Config(format!(
                    "cannot create log directory {}: {e}",
                    config.log_dir.display()
                ))
            })?;

            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, &config.log_dir, LOG_FILE_NAME);

            let file_layer = subscriber_fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_writer(file_appender);

            layers.push(file_layer.boxed());
        }

        #[cfg(not(feature = "file-log"))]
        return Err(AnalyzeError::Config(
            "file logging requires the `file-log` feature".into(),
        ));
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| AnalyzeError::Config(format!("failed to install subscriber: {e}")))?;

    debug!("Logging system initialized with config: {:?}", config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_fields_skip_nulls_and_blanks() {
        let result = AnalysisResult::normalize(&serde_json::json!({
            "platform": "Instagram",
            "message": "ok",
            "title": "",
            "fullName": "@nasa",
            "thumbnail": null,
            "views": 12
        }))
        .unwrap();
        assert_eq!(field_or_na(&result, &["title", "fullName"]), "@nasa");
        assert_eq!(field_or_na(&result, &["thumbnail"]), "N/A");
        assert_eq!(field_or_na(&result, &["views"]), "12");
    }

    #[test]
    fn cards_do_not_panic_on_long_input() {
        let long = "x".repeat(500);
        log_result_card(&AnalysisResult::failure("YouTube", long.clone()), &long);
        log_error_card(&long, &AnalyzeError::InvalidUrl(long.clone()));
    }

    #[test]
    fn separator_width() {
        assert_eq!(create_separator(3, '─'), "───");
    }
}

use clap::error::ErrorKind;
use clap::Parser;
use link_analyzer::{
    setup_logging, AnalysisResult, AnalyzerConfig, ArtifactSweeper, LinkAnalyzer, LogConfig,
    StatsPolicy,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "link-analyzer")]
#[command(about = "Identify a social-media link and print its metadata as one JSON line")]
#[command(version)]
struct Cli {
    /// Link to analyze
    url: Option<String>,

    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, env = "LINK_ANALYZER_LOG", default_value = "info")]
    log_level: String,

    /// Also write diagnostics to a daily-rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Report zeros instead of estimated engagement
    #[arg(long)]
    strict_stats: bool,
}

fn print_error_record(message: &str) {
    println!("{}", serde_json::json!({ "error": true, "message": message }));
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            let rendered = e.to_string();
            let message = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ");
            print_error_record(message);
            return ExitCode::from(1);
        }
    };
    let _sweeper = ArtifactSweeper::in_current_dir();

    let log_config = LogConfig {
        log_level: cli.log_level.clone(),
        file_output: cli.log_dir.is_some(),
        log_dir: cli.log_dir.clone().unwrap_or_else(|| "logs".into()),
        ..LogConfig::default()
    };
    if let Err(e) = setup_logging(log_config) {
        eprintln!("logging disabled: {e}");
    }

    let Some(url) = cli.url.filter(|u| !u.trim().is_empty()) else {
        print_error_record("No URL provided");
        return ExitCode::from(1);
    };

    let mut config = AnalyzerConfig::from_env();
    if cli.strict_stats {
        config = config.with_stats_policy(StatsPolicy::Strict);
    }

    let result = match LinkAnalyzer::new(config) {
        Ok(analyzer) => analyzer.analyze(&url).await,
        Err(e) => {
            e.log();
            AnalysisResult::failure("Unknown", format!("Technical error: {e}"))
        }
    };

    println!("{}", result.to_json());
    ExitCode::SUCCESS
}

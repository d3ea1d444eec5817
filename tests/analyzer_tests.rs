use link_analyzer::{AnalyzerConfig, CannedSource, LinkAnalyzer, StatsPolicy};
use serde_json::json;
use std::sync::Arc;

const FX: &str = "https://api.fxtwitter.com/jack/status/20";
const VX: &str = "https://api.vxtwitter.com/jack/status/20";
const SYNDICATION: &str = "https://cdn.syndication.twimg.com/tweet-result?id=20";

fn seeded() -> AnalyzerConfig {
    AnalyzerConfig::new().with_stats_policy(StatsPolicy::Fabricated { seed: Some(2024) })
}

fn analyzer(source: Arc<CannedSource>, config: AnalyzerConfig) -> LinkAnalyzer {
    LinkAnalyzer::with_source(config, source)
}

fn failing_mirrors() -> CannedSource {
    CannedSource::new()
        .with_response(FX, 500, "")
        .with_response(VX, 404, "")
        .with_response(SYNDICATION, 200, "not json")
}

#[tokio::test]
async fn test_instagram_reel_uses_page_image() {
    let source = Arc::new(CannedSource::new().with_body(
        "https://www.instagram.com/reel/ABC123/",
        r#"<html><head><meta property="og:image" content="https://cdn.test/reel.jpg"></head></html>"#,
    ));
    let result = analyzer(source, seeded())
        .analyze("https://www.instagram.com/reel/ABC123/")
        .await;

    assert_eq!(result.platform(), "Instagram");
    assert_eq!(result.get("isVideo"), Some(&json!(true)));
    assert_eq!(result.get_str("thumbnail"), Some("https://cdn.test/reel.jpg"));
    assert_eq!(result.get_u64("likes"), Some(0));
}

#[tokio::test]
async fn test_telegram_post_reports_views_only() {
    let page = r#"<html><head><meta property="og:title" content="Some Channel"></head>
<body><div class="tgme_page_extra">5 000 subscribers</div>
<span class="tgme_widget_message_views">1.2K</span></body></html>"#;
    let source = Arc::new(CannedSource::new().with_body("https://t.me/somechannel/42", page));
    let result = analyzer(source, AnalyzerConfig::new())
        .analyze("https://t.me/somechannel/42")
        .await;

    assert_eq!(result.platform(), "Telegram");
    assert_eq!(result.get_str("type"), Some("post"));
    assert_eq!(result.get_u64("views"), Some(1200));
    assert!(result.is_null("members"));
}

#[tokio::test]
async fn test_unrecognized_host_is_unknown() {
    let source = Arc::new(CannedSource::new());
    let result = analyzer(source.clone(), AnalyzerConfig::new())
        .analyze("https://example.com/foo")
        .await;

    assert_eq!(result.platform(), "Unknown");
    assert!(!result.message().is_empty());
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn test_tweet_with_failing_mirrors_is_estimated() {
    let source = Arc::new(failing_mirrors());
    let result = analyzer(source.clone(), seeded())
        .analyze("https://x.com/jack/status/20")
        .await;

    assert_eq!(result.platform(), "Twitter");
    assert!(result.get_u64("likes").unwrap() > 0);
    assert!(result.get_u64("views").unwrap() > 0);
    assert_eq!(result.get("estimated"), Some(&json!(true)));
    assert!(result.message().contains("estimated"));
    assert_eq!(source.requests(), vec![FX, VX, SYNDICATION]);
}

#[tokio::test]
async fn test_first_usable_mirror_wins() {
    let source = Arc::new(CannedSource::new().with_body(
        FX,
        r#"{"tweet":{"text":"just setting up my twttr","likes":190000,"retweets":120000,"replies":13000,"views":0}}"#,
    ));
    let result = analyzer(source.clone(), seeded())
        .analyze("https://twitter.com/jack/status/20")
        .await;

    assert_eq!(result.get_u64("likes"), Some(190_000));
    assert_eq!(result.get("estimated"), Some(&json!(false)));
    assert_eq!(source.request_count(VX), 0);
    assert_eq!(source.request_count(SYNDICATION), 0);
}

#[tokio::test]
async fn test_zero_engagement_is_not_usable() {
    let zero = r#"{"tweet":{"likes":0,"retweets":0,"replies":0,"views":0}}"#;
    let source = Arc::new(
        CannedSource::new()
            .with_body(FX, zero)
            .with_body(VX, zero)
            .with_body(SYNDICATION, r#"{"favorite_count":0}"#),
    );
    let result = analyzer(source.clone(), seeded())
        .analyze("https://twitter.com/jack/status/20")
        .await;

    assert_eq!(source.requests().len(), 3);
    assert_eq!(result.get("estimated"), Some(&json!(true)));
}

#[tokio::test]
async fn test_strict_policy_never_fabricates() {
    let source = Arc::new(failing_mirrors());
    let config = AnalyzerConfig::new().with_stats_policy(StatsPolicy::Strict);
    let result = analyzer(source, config)
        .analyze("https://x.com/jack/status/20")
        .await;

    assert_eq!(result.get_u64("likes"), Some(0));
    assert_eq!(result.get_u64("views"), Some(0));
    assert_eq!(result.get("estimated"), Some(&json!(false)));
    assert!(!result.message().contains("estimated"));
}

#[tokio::test]
async fn test_seeded_analysis_is_idempotent() {
    let source = Arc::new(failing_mirrors());
    let analyzer = analyzer(source, seeded());

    let first = analyzer.analyze("https://x.com/jack/status/20").await;
    let second = analyzer.analyze("https://x.com/jack/status/20").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_youtube_failure_is_error_flagged() {
    let source = Arc::new(CannedSource::new().with_response(
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ&hl=en",
        404,
        "",
    ));
    let result = analyzer(source, AnalyzerConfig::new())
        .analyze("https://youtu.be/dQw4w9WgXcQ")
        .await;

    assert_eq!(result.platform(), "YouTube");
    assert!(result.is_error());
    assert!(result.message().starts_with("YouTube analysis failed"));
    assert_eq!(result.get_u64("views"), Some(0));
}

#[tokio::test]
async fn test_youtube_channel_link_is_unknown() {
    let source = Arc::new(CannedSource::new());
    let result = analyzer(source.clone(), AnalyzerConfig::new())
        .analyze("https://www.youtube.com/@RickAstleyYT")
        .await;

    assert_eq!(result.platform(), "Unknown");
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn test_tiktok_placeholder_echoes_cleaned_url() {
    let source = Arc::new(CannedSource::new());
    let result = analyzer(source, AnalyzerConfig::new())
        .analyze("  //https://www.tiktok.com/@scout2015/video/6718335390845095173 ")
        .await;

    assert_eq!(result.platform(), "TikTok");
    assert!(!result.is_error());
    assert_eq!(
        result.get_str("videoPreview"),
        Some("https://www.tiktok.com/@scout2015/video/6718335390845095173")
    );
    assert_eq!(result.get_u64("views"), Some(0));
}

#[tokio::test]
async fn test_every_result_honours_the_contract() {
    let source = Arc::new(CannedSource::new());
    let analyzer = analyzer(source, seeded());

    for url in [
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://vm.tiktok.com/ZMabc123/",
        "https://www.instagram.com/nasa/",
        "https://www.facebook.com/nasa",
        "https://twitter.com/nasa",
        "https://t.me/+AbCdEf",
        "https://t.me/",
        "not a url at all",
        "",
    ] {
        let result = analyzer.analyze(url).await;
        assert!(result.get_str("platform").is_some(), "{url}");
        assert!(result.get_str("message").is_some(), "{url}");
        let line = result.to_json();
        assert!(!line.contains('\n'), "{url}");
        let reparsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert!(reparsed.is_object());
    }
}

#[tokio::test]
async fn test_failure_messages_omit_api_keys() {
    let source = Arc::new(CannedSource::new());
    let config = AnalyzerConfig::new().with_iframely_api_key("SECRET-IFRAMELY-KEY");
    let result = analyzer(source.clone(), config)
        .analyze("https://www.facebook.com/nasa/videos/1234567890")
        .await;

    assert!(result.is_error());
    assert_eq!(source.requests().len(), 1);
    assert!(source.requests()[0].contains("SECRET-IFRAMELY-KEY"));
    assert!(!result.to_json().contains("SECRET-IFRAMELY-KEY"));
    assert!(result.message().contains("https://iframe.ly/api/iframely"));
}

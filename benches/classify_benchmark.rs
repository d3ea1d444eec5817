use criterion::{black_box, criterion_group, criterion_main, Criterion};
use link_analyzer::platforms::telegram::parse_page;
use link_analyzer::{
    classify, AnalyzerConfig, CannedSource, LinkAnalyzer, MetadataExtractor, PlatformAnalyzer,
    StatsPolicy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const URLS: &[&str] = &[
    "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    "https://youtu.be/dQw4w9WgXcQ",
    "https://www.tiktok.com/@scout2015/video/6718335390845095173",
    "https://www.instagram.com/reel/ABC123/",
    "https://www.facebook.com/nasa/videos/1234567890",
    "https://x.com/jack/status/20",
    "https://t.me/s/rustnews/42",
    "https://example.com/not-social",
];

const CHANNEL_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta property="og:title" content="Rust News">
    <meta property="og:description" content="Daily links about Rust">
    <meta property="og:image" content="https://cdn.test/rust.jpg">
</head>
<body>
    <div class="tgme_page_extra">12 345 subscribers</div>
    <div class="tgme_widget_message_text">Rust 1.80 is out &amp; it is great</div>
    <span class="tgme_widget_message_views">4.5K</span>
</body>
</html>"#;

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");

    group.bench_function("classify", |b| {
        b.iter(|| {
            for url in URLS {
                black_box(classify(black_box(url)));
            }
        })
    });

    let analyzer = LinkAnalyzer::with_source(AnalyzerConfig::new(), Arc::new(CannedSource::new()));
    group.bench_function("identify", |b| {
        b.iter(|| {
            for url in URLS {
                if let Some(a) = analyzer.analyzer_for(classify(url)) {
                    black_box(a.identify(black_box(url)));
                }
            }
        })
    });

    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    let extractor = MetadataExtractor::new();

    group.bench_function("social_preview_meta", |b| {
        b.iter(|| black_box(extractor.extract(black_box(CHANNEL_HTML))))
    });

    group.bench_function("telegram_page", |b| {
        b.iter(|| black_box(parse_page(black_box(CHANNEL_HTML), "https://t.me/s/rustnews/42")))
    });

    group.finish();
}

fn bench_offline_analysis(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(CannedSource::new().with_body("https://t.me/s/rustnews/42", CHANNEL_HTML));
    let config = AnalyzerConfig::new().with_stats_policy(StatsPolicy::Fabricated { seed: Some(7) });
    let analyzer = LinkAnalyzer::with_source(config, source);

    let mut group = c.benchmark_group("analysis");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    group.bench_function("telegram_post", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(analyzer.analyze("https://t.me/s/rustnews/42").await) });
    });

    group.bench_function("tweet_estimated", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(analyzer.analyze("https://x.com/jack/status/20").await) });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_classification,
    bench_extraction,
    bench_offline_analysis
);
criterion_main!(benches);

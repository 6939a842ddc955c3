use serde_json::json;
use std::sync::Arc;

use super::support::{oembed_url, resolver, resolver_with, FakeHttp};
use crate::config::Config;
use crate::metadata::FetcherStatus;
use crate::resolver::{EmbedKind, Provider, ResolveOptions};

const RICK_EMBED: &str = "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&enablejsapi=1";

#[tokio::test]
async fn test_direct_file_without_network() {
    let fake = Arc::new(FakeHttp::new());
    let resolver = resolver(&fake);

    let input = "https://cdn.example/media/Clip.MP4?token=abc";
    let result = resolver.resolve(input).await;

    assert!(result.ok);
    assert_eq!(result.provider(), Some(&Provider::Direct));
    assert_eq!(result.embed_url(), Some(input));

    let resolution = result.resolution.unwrap();
    assert_eq!(resolution.media, vec![input.to_string()]);
    assert_eq!(resolution.embed.kind, EmbedKind::Media);
    assert_eq!(resolution.embed.allow, None);
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_bare_filename() {
    let fake = Arc::new(FakeHttp::new());
    let result = resolver(&fake).resolve("video.mp4").await;

    assert!(result.ok);
    assert_eq!(result.provider(), Some(&Provider::Direct));
    assert_eq!(result.embed_url(), Some("https://video.mp4"));
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_invalid_url_envelope() {
    let fake = Arc::new(FakeHttp::new());
    let result = resolver(&fake).resolve("not a url").await;

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"ok": false, "error": "invalid-url"})
    );
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_youtube_forms_share_embed() {
    let fake = Arc::new(FakeHttp::new());
    let resolver = resolver(&fake);

    let forms = [
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
        "https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=42",
        "https://youtu.be/dQw4w9WgXcQ?si=xyz",
        "https://www.youtube.com/shorts/dQw4w9WgXcQ",
        "https://www.youtube.com/embed/dQw4w9WgXcQ",
        "youtube.com/watch?v=dQw4w9WgXcQ",
    ];

    for form in forms {
        let result = resolver.resolve(form).await;
        assert!(result.ok, "{form} failed: {:?}", result.error);
        assert_eq!(result.provider(), Some(&Provider::Youtube), "{form}");
        assert_eq!(result.embed_url(), Some(RICK_EMBED), "{form}");
    }
}

#[tokio::test]
async fn test_youtube_example() {
    let fake = Arc::new(FakeHttp::new());
    let input = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
    fake.respond(
        &oembed_url("https://www.youtube.com/oembed", input),
        r#"{"title":"Rick Astley - Never Gonna Give You Up","provider_name":"YouTube",
            "thumbnail_url":"https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
            "html":"<iframe src=\"https://www.youtube.com/embed/dQw4w9WgXcQ?feature=oembed\"></iframe>"}"#,
    );

    let (result, report) = resolver(&fake)
        .resolve_with_report(input, ResolveOptions::default())
        .await;

    let resolution = result.resolution.unwrap();
    assert_eq!(resolution.provider, Provider::Youtube);
    assert_eq!(resolution.embed.url.as_deref(), Some(RICK_EMBED));
    assert_eq!(resolution.embed.kind, EmbedKind::Frame);
    assert!(resolution.embed.allow.is_some());
    assert_eq!(
        resolution.thumbnail.as_deref(),
        Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
    );
    assert_eq!(
        resolution.title.as_deref(),
        Some("Rick Astley - Never Gonna Give You Up")
    );

    // oEmbed completed the metadata, the page is never fetched
    let report = report.unwrap();
    assert_eq!(report.status_of("oEmbed"), Some(&FetcherStatus::Success));
    assert!(matches!(report.status_of("Page"), Some(FetcherStatus::Skip(_))));
    assert_eq!(fake.calls_to(input), 0);
}

#[tokio::test]
async fn test_metadata_disabled_skips_network() {
    let fake = Arc::new(FakeHttp::new());
    let resolver = resolver(&fake);

    let result = resolver
        .resolve_with(
            "https://vimeo.com/76979871",
            ResolveOptions {
                fetch_metadata: false,
            },
        )
        .await;

    assert!(result.ok);
    assert_eq!(result.provider(), Some(&Provider::Vimeo));
    assert_eq!(result.embed_url(), Some("https://player.vimeo.com/video/76979871?autoplay=1"));
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_metadata_disabled_from_config() {
    let fake = Arc::new(FakeHttp::new());
    let config = Config {
        fetch_metadata: false,
        ..Default::default()
    };
    let result = resolver_with(&config, &fake)
        .resolve("https://www.dailymotion.com/video/x8abc12")
        .await;

    assert_eq!(
        result.resolution.unwrap().thumbnail.as_deref(),
        Some("https://www.dailymotion.com/thumbnail/video/x8abc12")
    );
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_enrichment_failures_degrade_to_template() {
    let fake = Arc::new(FakeHttp::new());
    let result = resolver(&fake).resolve("https://vimeo.com/76979871").await;

    assert!(result.ok);
    assert_eq!(result.embed_url(), Some("https://player.vimeo.com/video/76979871?autoplay=1"));
    assert_eq!(result.resolution.unwrap().title, None);
    assert!(fake.total_calls() > 0);
}

#[tokio::test]
async fn test_site_rewrite_wins_over_provider() {
    let fake = Arc::new(FakeHttp::new());
    let result = resolver(&fake)
        .resolve_with(
            "https://www.youtube.com/videos/never-gonna-give-12345/",
            ResolveOptions {
                fetch_metadata: false,
            },
        )
        .await;

    assert_eq!(result.provider(), Some(&Provider::Parsed));
    assert_eq!(result.embed_url(), Some("https://www.youtube.com/embed/12345"));
}

#[tokio::test]
async fn test_scraped_page_is_idempotent() {
    let fake = Arc::new(FakeHttp::new());
    let page = "https://blog.example/posts/launch";
    fake.respond(
        page,
        r#"<html><head>
            <meta property="og:title" content="Launch day">
            <meta property="og:image" content="/img/launch.jpg">
        </head><body><iframe src="https://player.example/launch"></iframe></body></html>"#,
    );
    let resolver = resolver(&fake);

    let first = resolver.resolve(page).await;
    let second = resolver.resolve(page).await;

    assert_eq!(first, second);
    assert_eq!(first.provider(), Some(&Provider::Unknown));
    assert_eq!(first.embed_url(), Some("https://player.example/launch"));
    assert_eq!(
        first.resolution.unwrap().thumbnail.as_deref(),
        Some("https://blog.example/img/launch.jpg")
    );
    assert_eq!(fake.calls_to(page), 1);
    assert_eq!(resolver.cache().len(), 1);
}

#[tokio::test]
async fn test_media_only_page() {
    let fake = Arc::new(FakeHttp::new());
    let page = "https://files.example/gallery";
    fake.respond(
        page,
        r#"<html><body><video><source src="/v/one.webm"></video></body></html>"#,
    );

    let result = resolver(&fake).resolve(page).await;
    let resolution = result.resolution.unwrap();
    assert_eq!(resolution.embed.kind, EmbedKind::Media);
    assert_eq!(resolution.embed.url.as_deref(), Some("https://files.example/v/one.webm"));
    assert_eq!(resolution.media, vec!["https://files.example/v/one.webm".to_string()]);
}

#[tokio::test]
async fn test_page_without_video() {
    let fake = Arc::new(FakeHttp::new());
    let page = "https://blog.example/about";
    fake.respond(page, "<html><head><title>About us</title></head><body>hi</body></html>");

    let result = resolver(&fake).resolve(page).await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"ok": false, "error": "no-embeddable-media"})
    );
}

#[tokio::test]
async fn test_unreachable_unknown_page() {
    let fake = Arc::new(FakeHttp::new());
    let result = resolver(&fake).resolve("https://down.example/video/1").await;
    assert_eq!(result.error.as_deref(), Some("no-embeddable-media"));
}

#[tokio::test]
async fn test_unknown_host_resolved_by_oembed() {
    let fake = Arc::new(FakeHttp::new());
    let input = "https://soundcloud.com/artist/track";
    fake.respond(
        &oembed_url("https://soundcloud.com/oembed", input),
        r#"{"title":"Track","provider_name":"SoundCloud",
            "thumbnail_url":"https://i1.sndcdn.com/artworks.jpg",
            "html":"<iframe width=\"100%\" src=\"https://w.soundcloud.com/player/?url=track\"></iframe>"}"#,
    );

    let result = resolver(&fake).resolve(input).await;

    assert_eq!(result.provider(), Some(&Provider::Oembed("soundcloud".into())));
    assert_eq!(result.embed_url(), Some("https://w.soundcloud.com/player/?url=track"));
    assert_eq!(fake.calls_to(input), 0);
}

#[tokio::test]
async fn test_inline_oembed_html() {
    let fake = Arc::new(FakeHttp::new());
    let input = "https://x.com/someone/status/1700000000000000000";
    fake.respond(
        &oembed_url("https://publish.twitter.com/oembed", input),
        r#"{"author_name":"someone","provider_name":"Twitter",
            "html":"<blockquote class=\"twitter-tweet\">video</blockquote>"}"#,
    );

    let result = resolver(&fake).resolve(input).await;
    let resolution = result.resolution.unwrap();

    assert_eq!(resolution.provider, Provider::Oembed("twitter".into()));
    assert_eq!(resolution.embed.kind, EmbedKind::Html);
    assert_eq!(resolution.embed.url, None);
    assert!(resolution.embed.html.unwrap().contains("twitter-tweet"));
}

#[tokio::test]
async fn test_resolve_many_keeps_order() {
    let fake = Arc::new(FakeHttp::new());
    let resolver = resolver(&fake);

    let urls: Vec<String> = vec![
        "https://cdn.example/a.mp4".into(),
        "not a url".into(),
        "https://cdn.example/b.webm".into(),
        "https://cdn.example/c.mkv".into(),
        "https://cdn.example/d.m4v".into(),
        "https://cdn.example/e.ogg".into(),
    ];

    let results = resolver.resolve_many(&urls).await;

    assert_eq!(results.len(), urls.len());
    assert_eq!(results[0].embed_url(), Some("https://cdn.example/a.mp4"));
    assert_eq!(results[1].error.as_deref(), Some("invalid-url"));
    assert_eq!(results[5].embed_url(), Some("https://cdn.example/e.ogg"));
}

#[tokio::test]
async fn test_expired_entries_refetched() {
    let fake = Arc::new(FakeHttp::new());
    let page = "https://blog.example/clip";
    fake.respond(page, r#"<html><body><iframe src="https://player.example/c"></iframe></body></html>"#);

    let mut config = Config::default();
    config.cache.ttl_secs = 0;
    let resolver = resolver_with(&config, &fake);

    resolver.resolve(page).await;
    resolver.resolve(page).await;

    assert_eq!(fake.calls_to(page), 2);
}

#[tokio::test]
async fn test_og_video_file_plays_ahead_of_iframe() {
    let fake = Arc::new(FakeHttp::new());
    let page = "https://clips.example/watch/7";
    fake.respond(
        page,
        r#"<html><head>
            <meta property="og:video" content="https://cdn.example/clip7.mp4">
        </head><body><iframe src="https://ads.example/banner"></iframe></body></html>"#,
    );

    let resolution = resolver(&fake).resolve(page).await.resolution.unwrap();
    assert_eq!(resolution.embed.kind, EmbedKind::Media);
    assert_eq!(resolution.embed.url.as_deref(), Some("https://cdn.example/clip7.mp4"));
}

#[tokio::test]
async fn test_article_under_videos_path_is_not_rewritten() {
    let fake = Arc::new(FakeHttp::new());
    let page = "https://news.example/videos/election-night-recap";
    fake.respond(page, "<html><head><title>Recap</title></head><body><p>text</p></body></html>");

    let result = resolver(&fake).resolve(page).await;
    assert_eq!(result.provider(), None);
    assert_eq!(result.error.as_deref(), Some("no-embeddable-media"));
    assert_eq!(fake.calls_to(page), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolves_share_cache() {
    let fake = Arc::new(FakeHttp::new());
    let page = "https://blog.example/live";
    fake.respond(
        page,
        r#"<html><head><meta property="og:title" content="Live"></head>
            <body><iframe src="https://player.example/live"></iframe></body></html>"#,
    );
    let resolver = Arc::new(resolver(&fake));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(page).await })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    assert!(results.iter().all(|r| r == &results[0]));
    assert_eq!(results[0].embed_url(), Some("https://player.example/live"));
    assert_eq!(resolver.cache().len(), 1);
    assert_eq!(resolver.resolve(page).await, results[0]);
}

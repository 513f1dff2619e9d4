use axum::{Router, body::Bytes, http::StatusCode, routing::get};
use chrono::{DateTime, TimeZone, Utc};
use flate2::{Compression, write::GzEncoder};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use epg_unifier::{
    config::{Config, Credentials},
    errors::{AppError, FetchError},
    services::{GapFinder, GuideMerger},
    utils::{StandardHttpClient, xmltv_parser::parse_guide},
};

const FRAGMENT_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv generator-info-name="upstream">
  <channel id="CNN.us"><display-name>CNN</display-name></channel>
  <programme channel="CNN.us" start="20240101120000 +0000" stop="20240101130000 +0000">
    <title lang="en">News &amp; Weather</title>
  </programme>
</tv>"#;

const FRAGMENT_B: &str = r#"<tv>
  <channel id="FOX.us"><display-name>FOX</display-name></channel>
  <programme channel="FOX.us" start="20240201000000 +0000"><title>Later</title></programme>
</tv>"#;

const PLAYLIST: &str = r#"#EXTM3U
#EXTINF:-1 tvg-id="CNN.us" tvg-name="CNN",CNN
http://stream.test/1
#EXTINF:-1 tvg-id="FOX.us" tvg-name="FOX",FOX
http://stream.test/2
#EXTINF:-1 tvg-id="XYZ.us" tvg-name="My Channel",My Channel
http://stream.test/3
"#;

fn gzip(data: &[u8]) -> Bytes {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

async fn spawn_provider() -> SocketAddr {
    let fragment_a = gzip(FRAGMENT_A.as_bytes());
    let fragment_b = gzip(FRAGMENT_B.as_bytes());

    let app = Router::new()
        .route(
            "/epg/a.xml.gz",
            get(move || std::future::ready(fragment_a.clone())),
        )
        .route(
            "/epg/b.xml.gz",
            get(move || std::future::ready(fragment_b.clone())),
        )
        .route("/epg/broken.xml.gz", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/epg/slow.xml.gz",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        )
        .route("/get.php", get(|| async { PLAYLIST }))
        .route("/xmltv.php", get(|| async { PLAYLIST }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn provider_config(addr: SocketAddr, dir: &Path, fragments: &[&str]) -> Config {
    let mut config = Config::default();
    config.output_path = dir.join("unified_epg.xml");
    config.merge.work_dir = dir.join("work");
    config.merge.sources = fragments
        .iter()
        .map(|name| format!("http://{addr}/epg/{name}"))
        .collect();
    config.playlist.base_url = format!("http://{addr}");
    config.with_credentials(Some(Credentials {
        username: "user".to_string(),
        password: "secret".to_string(),
    }))
}

#[tokio::test]
async fn test_merge_then_find_missing() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let config = provider_config(addr, dir.path(), &["a.xml.gz", "b.xml.gz"]);
    let client = StandardHttpClient::new().unwrap();

    let summary = GuideMerger::new(&client, &config).run().await.unwrap();
    assert_eq!(summary.fragments, 2);
    assert_eq!(summary.channels_injected, 1);
    assert_eq!(summary.channels, 3);
    assert_eq!(summary.programmes, 2);

    let written = std::fs::read_to_string(&config.output_path).unwrap();
    assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE tv"));
    assert!(written.contains("generator-info-name=\"Unified EPG\""));
    assert!(written.contains("News &amp; Weather"));

    let guide = parse_guide(&written, "unified guide").unwrap();
    let channel_ids: Vec<_> = guide
        .channels()
        .filter_map(|c| c.attribute("id"))
        .collect();
    assert_eq!(channel_ids, vec!["CNN.us", "FOX.us", "XYZ.us"]);
    let injected = guide.channels().last().unwrap();
    assert_eq!(injected.child_elements().next().unwrap().text(), "My Channel");

    let leftovers = std::fs::read_dir(&config.merge.work_dir).unwrap().count();
    assert_eq!(leftovers, 0);

    let report = GapFinder::new(&client, &config)
        .run(&config.output_path, now())
        .await
        .unwrap();
    assert_eq!(report.playlist_channels, 3);
    assert_eq!(report.missing, vec!["FOX.us", "XYZ.us"]);
    assert!(report.to_string().contains("⚠️ 2 channel(s) missing EPG:"));

    let mut wide = config.clone();
    wide.gaps.horizon_days = 60;
    let report = GapFinder::new(&client, &wide)
        .run(&config.output_path, now())
        .await
        .unwrap();
    assert_eq!(report.missing, vec!["XYZ.us"]);
}

#[tokio::test]
async fn test_upstream_error_status_aborts_merge() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let config = provider_config(addr, dir.path(), &["a.xml.gz", "broken.xml.gz"]);
    let client = StandardHttpClient::new().unwrap();

    let err = GuideMerger::new(&client, &config).run().await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Fetch(FetchError::Status { status: 500, .. })
    ));
    assert_eq!(err.exit_code(), 3);
    assert!(!config.output_path.exists());
}

#[tokio::test]
async fn test_slow_fragment_times_out() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = provider_config(addr, dir.path(), &["slow.xml.gz"]);
    config.merge.fragment_timeout = Duration::from_millis(200);
    let client = StandardHttpClient::new().unwrap();

    let err = GuideMerger::new(&client, &config).run().await.unwrap_err();

    assert!(matches!(err, AppError::Fetch(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_find_missing_without_guide() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let client = StandardHttpClient::new().unwrap();

    let err = GapFinder::new(&client, &config)
        .run(&dir.path().join("unified_epg.xml"), now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::GuideNotFound { .. }));
    assert_eq!(err.exit_code(), 5);
}

//! Integration tests for gateway failover in MediaLoader

mod common;

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use ::common::gateway::MediaKind;
use ::common::loader::{FailoverPolicy, FetchError, LoadError, LoadStatus, MediaLoader};
use crate::common::{network_error, png, registry, Reply, ScriptedFetcher, GLTF};

#[tokio::test]
async fn test_fails_over_to_second_gateway() {
    crate::common::init_tracing();
    let fetcher = ScriptedFetcher::new();
    fetcher.reply("https://gw1/ipfs/QmTest123", Reply::Fail(network_error()));
    fetcher.reply("https://gw2/ipfs/QmTest123", Reply::Body(png()));

    let mut loader = MediaLoader::new(registry(2), fetcher.clone(), MediaKind::Image);
    loader.load("ipfs://QmTest123");
    let snapshot = loader.finished().await;

    assert_eq!(snapshot.status, LoadStatus::Success);
    assert_eq!(snapshot.current_gateway_index, 1);
    assert_eq!(snapshot.retry_count, 1);
    assert_eq!(snapshot.url.as_deref(), Some("https://gw2/ipfs/QmTest123"));
    assert!(snapshot.last_error.is_none());
    assert_eq!(snapshot.asset.unwrap().url, "https://gw2/ipfs/QmTest123");
    assert_eq!(
        fetcher.calls(),
        vec!["https://gw1/ipfs/QmTest123", "https://gw2/ipfs/QmTest123"]
    );
}

#[tokio::test]
async fn test_exhausts_after_one_retry_per_remaining_gateway() {
    let fetcher = ScriptedFetcher::new();
    for i in 1..=4 {
        fetcher.reply(
            &format!("https://gw{}/ipfs/QmGone", i),
            Reply::Fail(network_error()),
        );
    }

    let mut loader = MediaLoader::new(registry(4), fetcher.clone(), MediaKind::Image);
    loader.load("ipfs://QmGone");
    let snapshot = loader.finished().await;

    assert_eq!(snapshot.status, LoadStatus::Error);
    assert_eq!(snapshot.retry_count, 3);
    assert_eq!(snapshot.current_gateway_index, 3);
    assert_eq!(snapshot.last_error, Some(LoadError::Fetch(network_error())));
    assert_eq!(fetcher.calls().len(), 4);

    // no further automatic attempts once exhausted
    tokio::task::yield_now().await;
    assert_eq!(fetcher.calls().len(), 4);
}

#[tokio::test]
async fn test_explicit_retry_budget_is_respected() {
    let fetcher = ScriptedFetcher::new();
    let policy = FailoverPolicy::default().with_max_retries(Some(1));

    let mut loader =
        MediaLoader::new(registry(3), fetcher.clone(), MediaKind::Image).with_policy(policy);
    loader.load("ipfs://QmGone");
    let snapshot = loader.finished().await;

    assert_eq!(snapshot.status, LoadStatus::Error);
    assert_eq!(snapshot.retry_count, 1);
    assert_eq!(
        fetcher.calls(),
        vec!["https://gw1/ipfs/QmGone", "https://gw2/ipfs/QmGone"]
    );
}

#[tokio::test]
async fn test_plain_http_never_rotates() {
    let fetcher = ScriptedFetcher::new();
    fetcher.reply(
        "https://example.com/model.glb",
        Reply::Fail(network_error()),
    );

    let mut loader = MediaLoader::new(registry(3), fetcher.clone(), MediaKind::Model);
    loader.load("https://example.com/model.glb");
    let snapshot = loader.finished().await;

    assert_eq!(snapshot.status, LoadStatus::Error);
    assert_eq!(snapshot.retry_count, 0);
    assert_eq!(snapshot.current_gateway_index, 0);
    assert_eq!(fetcher.calls(), vec!["https://example.com/model.glb"]);
}

#[tokio::test]
async fn test_manual_retry_starts_from_first_gateway() {
    let fetcher = ScriptedFetcher::new();
    let mut loader = MediaLoader::new(registry(2), fetcher.clone(), MediaKind::Model);

    loader.load("ipfs://QmLate");
    let failed = loader.finished().await;
    assert_eq!(failed.status, LoadStatus::Error);

    fetcher.reply("https://gw1/ipfs/QmLate.glb", Reply::Body(Bytes::from_static(GLTF)));
    let session = loader.retry().unwrap();
    assert!(session > failed.session);

    let snapshot = loader.finished().await;
    assert_eq!(snapshot.status, LoadStatus::Success);
    assert_eq!(snapshot.current_gateway_index, 0);
    assert_eq!(snapshot.retry_count, 0);
    assert_eq!(snapshot.asset.unwrap().scene().unwrap().scenes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_gateway_failures_skip_retry_delay() {
    let delay = Duration::from_secs(2);
    let fetcher = ScriptedFetcher::new();
    fetcher.reply(
        "https://gw1/ipfs/QmFast",
        Reply::Fail(FetchError::Timeout(Duration::from_secs(5))),
    );
    fetcher.reply("https://gw2/ipfs/QmFast", Reply::Body(png()));

    let policy = FailoverPolicy::default().with_retry_delay(delay);
    let mut loader =
        MediaLoader::new(registry(2), fetcher.clone(), MediaKind::Image).with_policy(policy);

    let start = Instant::now();
    loader.load("ipfs://QmFast");
    assert_eq!(loader.finished().await.status, LoadStatus::Success);
    assert!(start.elapsed() < delay);
}

#[tokio::test(start_paused = true)]
async fn test_content_failures_wait_for_retry_delay() {
    let delay = Duration::from_secs(2);
    let fetcher = ScriptedFetcher::new();
    fetcher.reply("https://gw2/ipfs/QmSlow", Reply::Body(png()));

    let policy = FailoverPolicy::default().with_retry_delay(delay);
    let mut loader =
        MediaLoader::new(registry(2), fetcher.clone(), MediaKind::Image).with_policy(policy);

    let start = Instant::now();
    loader.load("ipfs://QmSlow");
    let snapshot = loader.finished().await;

    assert_eq!(snapshot.status, LoadStatus::Success);
    assert_eq!(snapshot.current_gateway_index, 1);
    assert!(start.elapsed() >= delay);
}

#[tokio::test]
async fn test_error_page_from_gateway_fails_over() {
    let fetcher = ScriptedFetcher::new();
    fetcher.reply(
        "https://gw1/ipfs/QmModel.glb",
        Reply::Body(Bytes::from_static(b"<html>rate limited</html>")),
    );
    fetcher.reply("https://gw2/ipfs/QmModel.glb", Reply::Body(Bytes::from_static(GLTF)));

    let mut loader = MediaLoader::new(registry(2), fetcher.clone(), MediaKind::Model);
    loader.load("ipfs://QmModel.glb.glb");
    let snapshot = loader.finished().await;

    assert_eq!(snapshot.status, LoadStatus::Success);
    assert_eq!(snapshot.url.as_deref(), Some("https://gw2/ipfs/QmModel.glb"));
}

#[tokio::test]
async fn test_precheck_failure_skips_body_fetch() {
    let fetcher = ScriptedFetcher::new();
    fetcher.fail_probe(
        "https://gw1/ipfs/QmProbe",
        FetchError::Timeout(Duration::from_secs(5)),
    );
    fetcher.reply("https://gw1/ipfs/QmProbe", Reply::Body(png()));
    fetcher.reply("https://gw2/ipfs/QmProbe", Reply::Body(png()));

    let policy = FailoverPolicy::default().with_precheck(true);
    let mut loader =
        MediaLoader::new(registry(2), fetcher.clone(), MediaKind::Image).with_policy(policy);
    loader.load("ipfs://QmProbe");
    let snapshot = loader.finished().await;

    assert_eq!(snapshot.status, LoadStatus::Success);
    assert_eq!(snapshot.current_gateway_index, 1);
    assert_eq!(
        fetcher.probe_calls(),
        vec!["https://gw1/ipfs/QmProbe", "https://gw2/ipfs/QmProbe"]
    );
    assert_eq!(fetcher.calls(), vec!["https://gw2/ipfs/QmProbe"]);
}

#[tokio::test]
async fn test_subscribers_observe_transitions() {
    let fetcher = ScriptedFetcher::new();
    fetcher.reply("https://gw1/ipfs/QmSeen", Reply::Fail(network_error()));
    fetcher.reply("https://gw2/ipfs/QmSeen", Reply::Body(png()));

    let mut loader = MediaLoader::new(registry(2), fetcher.clone(), MediaKind::Image);
    let mut updates = loader.subscribe();
    assert_eq!(updates.borrow_and_update().status, LoadStatus::Idle);

    loader.load("ipfs://QmSeen");
    let done = updates
        .wait_for(|snapshot| snapshot.status == LoadStatus::Success)
        .await
        .unwrap()
        .clone();
    assert_eq!(done.current_gateway_index, 1);
}

//! Connection concurrency of the bridge listener.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

mod common;

use common::MockResponse;

/// Backend that holds each request for a while and records peak in-flight count.
async fn start_slow_backend(hold: Duration) -> (std::net::SocketAddr, Arc<AtomicUsize>) {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let peak_out = Arc::clone(&peak);

    let (addr, _captured) = common::start_backend(move |_| {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(hold).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            MockResponse::ok("done")
        }
    })
    .await;

    (addr, peak_out)
}

async fn fire(proxy: std::net::SocketAddr, count: usize) {
    let mut handles = Vec::new();
    for i in 0..count {
        let client = common::device_client();
        handles.push(tokio::spawn(async move {
            client
                .post(format!("http://{}/device/{}", proxy, i))
                .body("{}")
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_connections_served_one_at_a_time_by_default() {
    let (backend, peak) = start_slow_backend(Duration::from_millis(300)).await;
    let config = common::bridge_config(backend);
    assert_eq!(config.listener.max_concurrent_connections, 1);
    let (proxy, shutdown) = common::start_bridge(config).await;

    fire(proxy, 3).await;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    shutdown.trigger();
}

#[tokio::test]
async fn test_bounded_concurrency_when_raised() {
    let (backend, peak) = start_slow_backend(Duration::from_millis(500)).await;
    let mut config = common::bridge_config(backend);
    config.listener.max_concurrent_connections = 3;
    let (proxy, shutdown) = common::start_bridge(config).await;

    fire(proxy, 3).await;

    let peak = peak.load(Ordering::SeqCst);
    assert!((2..=3).contains(&peak), "peak in-flight: {}", peak);
    shutdown.trigger();
}

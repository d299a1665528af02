//! Per-URL probe loop.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::probe::{run_probe, ProbeConfig, Sample};

/// Probe `config.url` once per polling interval until `stop_rx` fires.
///
/// Every tick first reserves a slot in the queue, then spawns its request, so
/// a slow response does not delay the next tick and requests may overlap.
/// Queued samples plus requests in flight never exceed the queue capacity:
/// while the queue is full the loop waits and no request is sent.
pub async fn run_probe_loop(
    config: ProbeConfig,
    tx: mpsc::Sender<Sample>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(config.polling_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                break;
            }
            _ = interval.tick() => {
                // Reap finished requests
                while in_flight.try_join_next().is_some() {}

                let permit = tokio::select! {
                    _ = stop_rx.recv() => break,
                    permit = tx.clone().reserve_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::debug!("Prober: Queue closed for {}", config.url);
                            break;
                        }
                    },
                };

                let config = config.clone();
                in_flight.spawn(async move {
                    let sample = run_probe(&config).await;
                    permit.send(sample);
                });
            }
        }
    }

    tracing::info!(
        "Prober: Stopping {} with {} requests in flight",
        config.url,
        in_flight.len()
    );
    in_flight.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonitorConfig, Target};
    use crate::probe::TRANSPORT_ERROR;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn probe_config(url: String, polling_interval: Duration) -> ProbeConfig {
        let target = Target { url, polling_interval };
        ProbeConfig::new(&target, &MonitorConfig::default()).unwrap()
    }

    async fn serve_counting(hits: Arc<AtomicUsize>) -> SocketAddr {
        let app = Router::new().route(
            "/",
            get(move || async move {
                hits.fetch_add(1, Ordering::SeqCst);
                "ok"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_probe_loop_emits_samples_until_stopped() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = probe_config(format!("http://{}/", addr), Duration::from_millis(50));

        let (tx, mut rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let prober = tokio::spawn(run_probe_loop(config, tx, stop_rx));

        for _ in 0..3 {
            let sample = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(sample.status_code, TRANSPORT_ERROR);
            assert_eq!(sample.polling_interval, Duration::from_millis(50));
        }

        stop_tx.send(()).unwrap();
        prober.await.unwrap();

        // Every sender is gone once the loop has stopped
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_full_queue_blocks_new_requests() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve_counting(hits.clone()).await;
        let config = probe_config(format!("http://{}/", addr), Duration::from_millis(20));

        let (tx, mut rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let prober = tokio::spawn(run_probe_loop(config, tx, stop_rx));

        // Many ticks pass while the single slot stays taken
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(rx.len(), 1);

        // Draining the slot lets exactly one more request through
        assert_eq!(rx.recv().await.unwrap().status_code, 200);
        let next = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.status_code, 200);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        // Stop still works while the loop waits for room
        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), prober)
            .await
            .unwrap()
            .unwrap();
    }
}

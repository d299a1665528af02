//! HTTP probe implementation.
//!
//! Phases are timed on the connection that carries the GET: a resolver
//! wrapper marks the name lookup and a connector layer marks the moment the
//! connection (TLS included for https) is ready.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tower::{Layer, Service};

use super::{ProbeConfig, ProbeError, UNMEASURED, USER_AGENT};

/// Phase timings of one HTTP GET, in milliseconds from the start of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimings {
    pub status_code: u16,
    /// Name lookup duration, 0 when the host is an IP address
    pub dns_ms: i64,
    pub connect_ms: i64,
    pub first_byte_ms: i64,
    pub total_ms: i64,
}

/// Instants reached by one request. Each is set at most once.
#[derive(Debug, Default)]
struct PhaseClock {
    dns_start: OnceLock<Instant>,
    dns_done: OnceLock<Instant>,
    connected: OnceLock<Instant>,
}

impl PhaseClock {
    fn mark(slot: &OnceLock<Instant>) {
        let _ = slot.set(Instant::now());
    }

    fn dns_ms(&self) -> i64 {
        match (self.dns_start.get(), self.dns_done.get()) {
            (Some(start), Some(done)) => millis(done.duration_since(*start)),
            (None, _) => 0,
            (Some(_), None) => UNMEASURED,
        }
    }

    fn connect_ms(&self, start: Instant) -> i64 {
        self.connected
            .get()
            .map(|t| millis(t.saturating_duration_since(start)))
            .unwrap_or(UNMEASURED)
    }
}

/// Resolves with the system resolver and marks the lookup on the clock.
struct TimedResolver {
    clock: Arc<PhaseClock>,
}

impl Resolve for TimedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let clock = self.clock.clone();
        Box::pin(async move {
            PhaseClock::mark(&clock.dns_start);
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((name.as_str(), 0)).await?.collect();
            PhaseClock::mark(&clock.dns_done);
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

#[derive(Clone)]
struct ConnectClockLayer {
    clock: Arc<PhaseClock>,
}

impl<S> Layer<S> for ConnectClockLayer {
    type Service = ConnectClock<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ConnectClock {
            inner,
            clock: self.clock.clone(),
        }
    }
}

/// Connector wrapper marking when a connection has been established.
#[derive(Clone)]
struct ConnectClock<S> {
    inner: S,
    clock: Arc<PhaseClock>,
}

impl<S, R> Service<R> for ConnectClock<S>
where
    S: Service<R> + 'static,
    S::Future: Send + 'static,
    R: 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let clock = self.clock.clone();
        let connecting = self.inner.call(req);
        Box::pin(async move {
            let result = connecting.await;
            if result.is_ok() {
                PhaseClock::mark(&clock.connected);
            }
            result
        })
    }
}

/// A client that carries the phase clock of the single request it sends.
pub struct ProbeClient {
    client: reqwest::Client,
    clock: Arc<PhaseClock>,
}

impl ProbeClient {
    /// Build a client for one probe of `config.url`.
    ///
    /// Idle connections are never kept, so the GET always opens (and times)
    /// its own connection.
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let clock = Arc::new(PhaseClock::default());

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .dns_resolver(Arc::new(TimedResolver { clock: clock.clone() }))
            .connector_layer(ConnectClockLayer { clock: clock.clone() })
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self { client, clock })
    }
}

/// Run an HTTP probe against the configured URL.
///
/// All timings are relative to the moment the GET is sent: connect when the
/// connection is ready, first byte when the response headers arrive, total
/// once the body has been read. Non-2xx responses are returned as timings,
/// not errors.
pub async fn run_http_probe(config: &ProbeConfig) -> Result<HttpTimings, ProbeError> {
    let ProbeClient { client, clock } = ProbeClient::new(config)?;
    let url = &config.url;

    let start = Instant::now();

    let response = client.get(url.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(config.timeout)
        } else {
            ProbeError::Network(e.to_string())
        }
    })?;

    let first_byte_ms = millis(start.elapsed());
    let status_code = response.status().as_u16();

    // Read the full body to measure complete transfer time
    let total_ms = match response.bytes().await {
        Ok(_) => millis(start.elapsed()),
        Err(e) => {
            tracing::debug!("Body read failed for {}: {}", url, e);
            UNMEASURED
        }
    };

    Ok(HttpTimings {
        status_code,
        dns_ms: clock.dns_ms(),
        connect_ms: clock.connect_ms(start),
        first_byte_ms,
        total_ms,
    })
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

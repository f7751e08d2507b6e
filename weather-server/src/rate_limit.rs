//! Rate limiting middleware
//!
//! Sliding-window limiter: each client may make at most `max_requests` requests in any
//! `window`-long period.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request},
    response::{IntoResponse, Response},
};
use tokio::{sync::RwLock, task::JoinHandle};
use tower::{Layer, Service};
use tracing::{debug, info};
use weather_core::RateLimitConfig;

use crate::error::ApiError;

/// Per-client request timestamps within the current window.
#[derive(Debug)]
pub struct RateLimiterState {
    requests: RwLock<HashMap<IpAddr, VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiterState {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            max_requests: max_requests as usize,
            window,
        }
    }

    /// Record a request from `ip`, returning whether it is allowed.
    pub async fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut requests = self.requests.write().await;
        let seen = requests.entry(ip).or_default();

        while seen
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            seen.pop_front();
        }

        if seen.len() < self.max_requests {
            seen.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drop clients with no requests inside the window, returning how many were removed.
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let window = self.window;
        let mut requests = self.requests.write().await;
        let before = requests.len();
        requests.retain(|_, seen| {
            seen.back()
                .is_some_and(|last| now.duration_since(*last) < window)
        });
        before - requests.len()
    }

    /// Number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Periodically evict idle clients from `state`.
///
/// `every` is clamped to at least one millisecond.
pub fn spawn_cleanup_task(state: Arc<RateLimiterState>, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_millis(1));
    info!(interval_ms = every.as_millis(), "Starting rate limiter cleanup task");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = state.cleanup().await;
            if removed > 0 {
                debug!(removed, "evicted idle rate limit clients");
            }
        }
    })
}

/// Layer that applies rate limiting
#[derive(Clone, Debug)]
pub struct RateLimiterLayer {
    state: Arc<RateLimiterState>,
    enabled: bool,
}

impl RateLimiterLayer {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            state: Arc::new(RateLimiterState::new(
                config.max_requests,
                Duration::from_secs(config.window_secs),
            )),
            enabled: config.enabled,
        }
    }

    /// Shared state, handed to [`spawn_cleanup_task`].
    #[must_use]
    pub fn state(&self) -> Arc<RateLimiterState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            state: Arc::clone(&self.state),
            enabled: self.enabled,
        }
    }
}

/// Middleware service for rate limiting
#[derive(Clone, Debug)]
pub struct RateLimiter<S> {
    inner: S,
    state: Arc<RateLimiterState>,
    enabled: bool,
}

impl<S> Service<Request> for RateLimiter<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let enabled = self.enabled;
        let state = Arc::clone(&self.state);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !enabled {
                return inner.call(req).await;
            }

            let client_ip = extract_client_ip(&req);
            if state.check(client_ip).await {
                inner.call(req).await
            } else {
                debug!(%client_ip, "rate limit exceeded");
                Ok(ApiError::RateLimited.into_response())
            }
        })
    }
}

fn extract_client_ip(req: &Request) -> IpAddr {
    // First hop of X-Forwarded-For when running behind a proxy
    if let Some(ip) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |ConnectInfo(addr)| {
            addr.ip()
        })
}

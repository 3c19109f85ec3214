use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::pipeline::{Handler, Middleware};

/// Buckets are swept after this many requests.
const SWEEP_EVERY: u64 = 1024;

type KeyFn = dyn Fn(&RequestContext) -> String + Send + Sync;

/// Sliding-window rate limiter keyed per client.
///
/// Every request inside the window counts; once `max` is reached the client
/// gets 429 with `Retry-After` until the oldest request leaves the window.
/// Accepted responses carry `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
/// `X-RateLimit-Reset` (seconds until the window frees a slot).
///
/// Clients are identified by the request's peer address. The bundled
/// `may_minihttp` transport does not report one, so behind it every client
/// shares a single `"anonymous"` bucket and the limit is effectively global.
/// Deployments that need a per-client limit either run behind a proxy they
/// control and call [`RateLimitMiddleware::trust_forwarded_for`], or supply
/// their own key with [`RateLimitMiddleware::key_by`] (an API key, the
/// authenticated user).
///
/// `X-Forwarded-For` is ignored unless trusted: any caller can set it, so
/// honouring it from untrusted clients lets them rotate past the limit.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    state: Arc<LimiterState>,
}

struct LimiterState {
    max: usize,
    window: Duration,
    trust_forwarded_for: bool,
    key_fn: Option<Arc<KeyFn>>,
    buckets: DashMap<String, VecDeque<Instant>>,
    seen: AtomicU64,
}

const ANONYMOUS: &str = "anonymous";

fn client_key(ctx: &RequestContext, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(first) = ctx
            .header("x-forwarded-for")
            .and_then(|forwarded| forwarded.split(',').map(str::trim).find(|s| !s.is_empty()))
        {
            return first.to_string();
        }
    }
    ctx.request()
        .remote_addr
        .clone()
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl RateLimitMiddleware {
    /// `max` requests per `window`. A zero `max` falls back to 100, a zero
    /// window to one minute.
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            state: Arc::new(LimiterState {
                max: if max == 0 { 100 } else { max },
                window: if window.is_zero() { Duration::from_secs(60) } else { window },
                trust_forwarded_for: false,
                key_fn: None,
                buckets: DashMap::new(),
                seen: AtomicU64::new(0),
            }),
        }
    }

    /// Key clients by the first `X-Forwarded-For` address. Only for servers
    /// whose every request passes through a proxy that overwrites the header.
    pub fn trust_forwarded_for(self, trust: bool) -> Self {
        let state = &self.state;
        Self::with_state(LimiterState {
            max: state.max,
            window: state.window,
            trust_forwarded_for: trust,
            key_fn: state.key_fn.as_ref().map(Arc::clone),
            buckets: DashMap::new(),
            seen: AtomicU64::new(0),
        })
    }

    /// Replace the client key, e.g. an API key header or the authenticated user.
    pub fn key_by<F>(self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> String + Send + Sync + 'static,
    {
        let state = &self.state;
        Self::with_state(LimiterState {
            max: state.max,
            window: state.window,
            trust_forwarded_for: state.trust_forwarded_for,
            key_fn: Some(Arc::new(f)),
            buckets: DashMap::new(),
            seen: AtomicU64::new(0),
        })
    }

    fn with_state(state: LimiterState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.state.buckets.len()
    }
}

impl LimiterState {
    fn sweep(&self, now: Instant) {
        let window = self.window;
        let before = self.buckets.len();
        self.buckets.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.saturating_duration_since(*last) < window)
        });
        debug!(before, after = self.buckets.len(), "Swept rate limit buckets");
    }

    /// Record a hit for `key`; `Err(wait)` when the client must back off.
    fn admit(&self, key: String, now: Instant) -> Result<(usize, Duration), Duration> {
        if self.seen.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }
        let mut hits = self.buckets.entry(key).or_default();
        while hits
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= self.window)
        {
            hits.pop_front();
        }
        if hits.len() >= self.max {
            let wait = hits
                .front()
                .map(|first| self.window.saturating_sub(now.saturating_duration_since(*first)))
                .unwrap_or(self.window);
            return Err(wait);
        }
        hits.push_back(now);
        let reset = hits
            .front()
            .map(|first| self.window.saturating_sub(now.saturating_duration_since(*first)))
            .unwrap_or(self.window);
        Ok((self.max - hits.len(), reset))
    }
}

impl Middleware for RateLimitMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let state = Arc::clone(&self.state);
        Arc::new(move |ctx: &mut RequestContext| {
            let key = match &state.key_fn {
                Some(f) => f(ctx),
                None => client_key(ctx, state.trust_forwarded_for),
            };
            let limit = state.max.to_string();
            match state.admit(key.clone(), Instant::now()) {
                Ok((remaining, reset)) => {
                    ctx.set_header("x-ratelimit-limit", limit);
                    ctx.set_header("x-ratelimit-remaining", remaining.to_string());
                    ctx.set_header("x-ratelimit-reset", ceil_secs(reset).to_string());
                    next(ctx)
                }
                Err(wait) => {
                    let wait = ceil_secs(wait).max(1).to_string();
                    debug!(client = %key, path = %ctx.path(), "Rate limit exceeded");
                    Err(ApiError::too_many_requests("Rate limit exceeded")
                        .with_header("Retry-After", wait.clone())
                        .with_header("X-RateLimit-Limit", limit)
                        .with_header("X-RateLimit-Remaining", "0")
                        .with_header("X-RateLimit-Reset", wait))
                }
            }
        })
    }

    fn name(&self) -> &str {
        "rate_limit"
    }
}

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::RequestContext;
use crate::pipeline::{Handler, Middleware};

/// Middleware for collecting Prometheus-compatible metrics
///
/// Counts requests, error responses (status >= 400) and accumulated latency,
/// and records the coroutine stack size the handlers run with. All counters
/// are relaxed atomics; readings are eventually consistent.
///
/// Cloning is cheap and clones share counters, so the same instance can be
/// installed in the pipeline and handed to the `/metrics` endpoint.
#[derive(Debug, Clone, Default)]
pub struct MetricsMiddleware {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    request_count: AtomicUsize,
    error_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    stack_size: AtomicUsize,
    top_level_requests: AtomicUsize,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.counters.request_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> usize {
        self.counters.error_count.load(Ordering::Relaxed)
    }

    /// Mean processing time; zero before the first request.
    pub fn average_latency(&self) -> Duration {
        let count = self.counters.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.counters.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    pub fn stack_size(&self) -> usize {
        self.counters.stack_size.load(Ordering::Relaxed)
    }

    /// Count a request served outside the dispatcher (`/health`, `/metrics`, docs).
    pub fn inc_top_level_request(&self) {
        self.counters.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn top_level_request_count(&self) -> usize {
        self.counters.top_level_requests.load(Ordering::Relaxed)
    }

    fn record(&self, status: u16, latency: Duration) {
        let c = &self.counters;
        c.request_count.fetch_add(1, Ordering::Relaxed);
        if status >= 400 {
            c.error_count.fetch_add(1, Ordering::Relaxed);
        }
        c.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        let stack = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        c.stack_size.store(stack, Ordering::Relaxed);
    }

    /// Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::with_capacity(768);
        let mut gauge = |name: &str, kind: &str, help: &str, value: String| {
            out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"));
        };
        gauge(
            "convroute_requests_total",
            "counter",
            "Requests dispatched to handlers",
            self.request_count().to_string(),
        );
        gauge(
            "convroute_request_errors_total",
            "counter",
            "Dispatched requests answered with status >= 400",
            self.error_count().to_string(),
        );
        gauge(
            "convroute_request_latency_seconds",
            "gauge",
            "Average handler latency",
            format!("{:.6}", self.average_latency().as_secs_f64()),
        );
        gauge(
            "convroute_top_level_requests_total",
            "counter",
            "Requests served by built-in endpoints",
            self.top_level_request_count().to_string(),
        );
        gauge(
            "convroute_coroutine_stack_bytes",
            "gauge",
            "Coroutine stack size",
            self.stack_size().to_string(),
        );
        out
    }
}

impl Middleware for MetricsMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let metrics = self.clone();
        Arc::new(move |ctx: &mut RequestContext| {
            let start = Instant::now();
            let result = next(ctx);
            let status = match &result {
                Err(err) if !ctx.is_written() => err.status(),
                _ => ctx.response().status,
            };
            metrics.record(status, start.elapsed());
            result
        })
    }

    fn name(&self) -> &str {
        "metrics"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IncomingRequest;
    use crate::error::ApiError;
    use crate::pipeline::{compose, handler_fn, MiddlewareRef};
    use http::Method;

    #[test]
    fn test_counts_requests_and_errors() {
        let metrics = MetricsMiddleware::new();
        let handler = compose(
            &[Arc::new(metrics.clone()) as MiddlewareRef],
            handler_fn(|ctx: &mut RequestContext| {
                if ctx.path() == "/bad" {
                    Err(ApiError::bad_request("bad"))
                } else {
                    ctx.ok(&"fine")
                }
            }),
        );
        for path in ["/a", "/b", "/bad"] {
            let mut ctx = RequestContext::detached(IncomingRequest::new(Method::GET, path));
            let _ = handler(&mut ctx);
        }
        assert_eq!(metrics.request_count(), 3);
        assert_eq!(metrics.error_count(), 1);
        assert!(metrics.stack_size() > 0);
    }

    #[test]
    fn test_prometheus_rendering() {
        let metrics = MetricsMiddleware::new();
        metrics.inc_top_level_request();
        let text = metrics.render_prometheus();
        assert!(text.contains("# TYPE convroute_requests_total counter"));
        assert!(text.contains("convroute_requests_total 0"));
        assert!(text.contains("convroute_top_level_requests_total 1"));
        assert_eq!(metrics.average_latency(), Duration::ZERO);
    }
}

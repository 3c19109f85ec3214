use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::recover::panic_message;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::pipeline::{Handler, HandlerResult, Middleware};

/// Races the inner chain against a deadline.
///
/// The inner chain runs on a fresh coroutine against a copy of the context.
/// When the deadline passes first the request is answered with 408 and the
/// copy is flagged cancelled ([`RequestContext::is_cancelled`]); whatever the
/// abandoned coroutine writes afterwards is dropped.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    budget: Duration,
}

impl TimeoutMiddleware {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl Middleware for TimeoutMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let budget = self.budget;
        Arc::new(move |ctx: &mut RequestContext| {
            let (tx, rx) = may::sync::mpsc::channel::<(HandlerResult, RequestContext)>();
            let mut copy = ctx.clone();
            let cancelled = copy.cancel_flag();
            let next = Arc::clone(&next);

            // SAFETY: the coroutine owns everything it touches (a cloned
            // context, handler and sender) and never blocks the OS thread.
            #[allow(unsafe_code)]
            let spawned = unsafe {
                may::coroutine::Builder::new()
                    .stack_size(may::config().get_stack_size())
                    .spawn(move || {
                        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            next(&mut copy)
                        }));
                        let result = outcome.unwrap_or_else(|payload| {
                            Err(ApiError::internal("Internal Server Error")
                                .with_detail("panic", panic_message(payload.as_ref())))
                        });
                        if tx.send((result, copy)).is_err() {
                            debug!("Timed-out handler finished; result discarded");
                        }
                    })
            };
            if let Err(err) = spawned {
                error!(error = %err, "Failed to spawn handler coroutine");
                return Err(ApiError::internal("Internal Server Error"));
            }

            match rx.recv_timeout(budget) {
                Ok((result, finished)) => {
                    ctx.absorb(finished);
                    result
                }
                Err(RecvTimeoutError::Timeout) => {
                    cancelled.store(true, Ordering::Release);
                    warn!(
                        request_id = %ctx.request_id(),
                        method = %ctx.method(),
                        path = %ctx.path(),
                        budget_ms = budget.as_millis() as u64,
                        "Request timed out"
                    );
                    Err(ApiError::timeout("Request timeout"))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    error!(request_id = %ctx.request_id(), "Handler coroutine exited without a result");
                    Err(ApiError::internal("Internal Server Error"))
                }
            }
        })
    }

    fn name(&self) -> &str {
        "timeout"
    }
}

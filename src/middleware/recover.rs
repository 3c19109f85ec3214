use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::pipeline::{Handler, Middleware};

/// Converts a panic in any inner layer into a 500 response.
///
/// The process keeps serving; the panicking request gets
/// `{"message": "Internal Server Error", "status": 500, "details": {"panic": ..}}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoverMiddleware;

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Middleware for RecoverMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        Arc::new(move |ctx: &mut RequestContext| {
            match catch_unwind(AssertUnwindSafe(|| next(ctx))) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(
                        request_id = %ctx.request_id(),
                        method = %ctx.method(),
                        path = %ctx.path(),
                        panic = %message,
                        "Recovered from panic"
                    );
                    ctx.error(ApiError::internal("Internal Server Error").with_detail("panic", message))
                }
            }
        })
    }

    fn name(&self) -> &str {
        "recover"
    }
}

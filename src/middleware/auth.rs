use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::auth::{bearer_token, Authenticator};
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::pipeline::{Handler, Middleware};

/// Requires a valid bearer token.
///
/// The token is checked by the authenticator registered in
/// [`AppServices`](crate::context::AppServices), or by the one passed to
/// [`AuthMiddleware::with_authenticator`]. On success the claims are stored
/// in the context (`claims`) and the `sub` claim becomes `user_id`.
///
/// | Situation | Response |
/// |---|---|
/// | no `Authorization` header | 401 |
/// | token rejected | 401 |
/// | no authenticator configured | 500 |
#[derive(Clone, Default)]
pub struct AuthMiddleware {
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl AuthMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authenticator(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator: Some(authenticator),
        }
    }
}

impl Middleware for AuthMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let fixed = self.authenticator.clone();
        Arc::new(move |ctx: &mut RequestContext| {
            let token = ctx
                .header("authorization")
                .and_then(bearer_token)
                .map(str::to_string);
            let Some(token) = token else {
                debug!(path = %ctx.path(), "Missing bearer token");
                return Err(ApiError::unauthorized("Unauthorized"));
            };

            let authenticator = fixed
                .clone()
                .or_else(|| ctx.services().authenticator().cloned());
            let Some(authenticator) = authenticator else {
                error!("Authentication is not initialized");
                return Err(ApiError::internal("Internal Server Error")
                    .with_detail("message", "Authentication system not initialized"));
            };

            let claims = authenticator.validate_token(&token)?;
            if let Some(sub) = claims.get("sub") {
                let user_id = match sub {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                ctx.set_user_id(user_id);
            }
            ctx.set_claims(claims);
            next(ctx)
        })
    }

    fn name(&self) -> &str {
        "require_auth"
    }
}

/// Requires the caller's `role` claim to be one of the allowed roles.
///
/// Place it after [`AuthMiddleware`]; without claims the request is 401.
#[derive(Debug, Clone)]
pub struct RoleMiddleware {
    roles: Arc<HashSet<String>>,
}

impl RoleMiddleware {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: Arc::new(roles.into_iter().map(Into::into).collect()),
        }
    }
}

impl Middleware for RoleMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let roles = Arc::clone(&self.roles);
        Arc::new(move |ctx: &mut RequestContext| {
            let Some(claims) = ctx.claims() else {
                return Err(ApiError::unauthorized("Unauthorized"));
            };
            let allowed = match claims.get("role") {
                Some(Value::String(role)) => roles.contains(role),
                Some(Value::Array(list)) => list
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|role| roles.contains(role)),
                _ => false,
            };
            if !allowed {
                return Err(ApiError::forbidden("Forbidden"));
            }
            next(ctx)
        })
    }

    fn name(&self) -> &str {
        "role_guard"
    }
}

use std::net::ToSocketAddrs;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use http::Method;
use tracing::{debug, info};

use super::routing::{RouteRef, RoutingContext};
use crate::auth::{Authenticator, JwtAuthenticator};
use crate::config::AppConfig;
use crate::context::{AppServices, HandlerResponse, IncomingRequest};
use crate::controller::{Controller, ControllerDescriptor, ControllerGroup};
use crate::middleware::{
    MetricsMiddleware, RecoverMiddleware, RequestIdMiddleware, SecurityHeadersMiddleware,
    TimeoutMiddleware, TracingMiddleware,
};
use crate::openapi::{build_document, ApiDocument};
use crate::pipeline::{Handler, MiddlewareRef};
use crate::server::{AppService, HttpServer, ServerHandle};

/// An application: configuration, shared services, routing and the server.
///
/// `new` installs the default global middleware, outermost first:
///
/// 1. recover (panics become 500)
/// 2. request logger
/// 3. request id
/// 4. security headers
/// 5. timeout, when `request_timeout_ms` is set
///
/// Middleware added later with [`Application::use_middleware`] runs inside
/// these.
pub struct Application {
    config: AppConfig,
    services: AppServices,
    routing: Arc<RoutingContext>,
    metrics: Option<MetricsMiddleware>,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        may::config().set_stack_size(config.stack_size);

        let mut services = AppServices::new(config.clone());
        if let Some(jwt) = JwtAuthenticator::from_config(&config.auth) {
            debug!("JWT authenticator configured from settings");
            services.set_authenticator(Arc::new(jwt));
        }

        let routing = Arc::new(RoutingContext::new(services.clone()));
        routing.use_middleware(Arc::new(RecoverMiddleware));
        routing.use_middleware(Arc::new(TracingMiddleware));
        routing.use_middleware(Arc::new(RequestIdMiddleware));
        routing.use_middleware(Arc::new(SecurityHeadersMiddleware::new()));
        if let Some(budget) = config.request_timeout() {
            routing.use_middleware(Arc::new(TimeoutMiddleware::new(budget)));
        }

        info!(
            name = %config.name,
            version = %config.version,
            stack_size = config.stack_size,
            "Application created"
        );
        Self {
            config,
            services,
            routing,
            metrics: None,
        }
    }

    /// Load configuration from a file, apply environment overrides, and build.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?
            .with_env_overrides();
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn routing(&self) -> &Arc<RoutingContext> {
        &self.routing
    }

    /// Mutable access to the shared services. Changes are published to
    /// request handling when the guard drops.
    pub fn services_mut(&mut self) -> ServicesMut<'_> {
        ServicesMut { app: self }
    }

    pub fn set_authenticator(&mut self, authenticator: Arc<dyn Authenticator>) {
        self.services_mut().set_authenticator(authenticator);
    }

    pub fn register_controller(&self, controller: Arc<dyn Controller>) -> ControllerDescriptor {
        self.routing.register_controller(controller)
    }

    /// Start a group; finish with `.register(app.routing())`.
    pub fn group(&self, prefix: impl Into<String>) -> ControllerGroup {
        self.routing.group(prefix)
    }

    pub fn register_route(
        &self,
        method: Method,
        path: &str,
        description: &str,
        handler: Handler,
    ) -> RouteRef<'_> {
        self.routing.register_route(method, path, description, handler)
    }

    pub fn use_middleware(&self, middleware: MiddlewareRef) {
        self.routing.use_middleware(middleware);
    }

    /// Install request metrics and expose them at `/metrics`. Idempotent.
    pub fn enable_metrics(&mut self) -> MetricsMiddleware {
        if let Some(metrics) = &self.metrics {
            return metrics.clone();
        }
        let metrics = MetricsMiddleware::new();
        self.routing.use_middleware(Arc::new(metrics.clone()));
        self.metrics = Some(metrics.clone());
        metrics
    }

    pub fn openapi(&self) -> ApiDocument {
        build_document(&self.config, &self.routing.routes())
    }

    /// The transport service, for embedding or in-process testing.
    pub fn service(&self) -> AppService {
        let service = AppService::new(Arc::clone(&self.routing));
        match &self.metrics {
            Some(metrics) => service.with_metrics(metrics.clone()),
            None => service,
        }
    }

    /// Answer one request without a socket, built-in endpoints included.
    pub fn handle(&self, request: IncomingRequest) -> HandlerResponse {
        self.service().handle(request)
    }

    /// Serve on the configured `server.host:server.port`.
    pub fn start(&self) -> Result<ServerHandle> {
        self.start_on(self.config.server.address())
    }

    pub fn start_on<A: ToSocketAddrs + std::fmt::Display>(&self, addr: A) -> Result<ServerHandle> {
        let routes = self.routing.routes().len();
        let handle = HttpServer(self.service())
            .start(&addr)
            .with_context(|| format!("starting server on {addr}"))?;
        info!(addr = %handle.addr(), routes, "Application started");
        Ok(handle)
    }
}

/// Guard returned by [`Application::services_mut`].
pub struct ServicesMut<'a> {
    app: &'a mut Application,
}

impl Deref for ServicesMut<'_> {
    type Target = AppServices;

    fn deref(&self) -> &AppServices {
        &self.app.services
    }
}

impl DerefMut for ServicesMut<'_> {
    fn deref_mut(&mut self) -> &mut AppServices {
        &mut self.app.services
    }
}

impl Drop for ServicesMut<'_> {
    fn drop(&mut self) {
        self.app.routing.set_services(self.app.services.clone());
    }
}

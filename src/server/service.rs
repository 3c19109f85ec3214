use std::io;
use std::sync::Arc;

use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use tracing::{error, warn};

use super::request::{parse_request, strip_base_path};
use super::response::write_response;
use crate::app::RoutingContext;
use crate::config::AppConfig;
use crate::context::{HandlerResponse, IncomingRequest};
use crate::error::ApiError;
use crate::middleware::MetricsMiddleware;
use crate::openapi::{build_document, swagger_ui_html};

pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

/// `may_minihttp` service backed by a [`RoutingContext`].
///
/// Built-in endpoints (`/health`, `/metrics`, the API document and the docs
/// page) are answered before routing; everything else goes through the
/// dispatcher.
#[derive(Clone)]
pub struct AppService {
    routing: Arc<RoutingContext>,
    metrics: Option<MetricsMiddleware>,
}

impl AppService {
    pub fn new(routing: Arc<RoutingContext>) -> Self {
        Self {
            routing,
            metrics: None,
        }
    }

    /// Serve `/metrics` from these counters.
    pub fn with_metrics(mut self, metrics: MetricsMiddleware) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn routing(&self) -> &Arc<RoutingContext> {
        &self.routing
    }

    /// Answer one request in-process.
    pub fn handle(&self, mut request: IncomingRequest) -> HandlerResponse {
        let services = self.routing.services();
        if request.method == Method::GET {
            if let Some(response) = self.builtin(&request.path, services.config()) {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_top_level_request();
                }
                return response;
            }
        }
        match strip_base_path(&request.path, &services.config().server.base_path) {
            Some(path) => request.path = path.to_string(),
            None => return ApiError::not_found("Not Found").into_response(),
        }
        self.routing.dispatcher().dispatch(request, services)
    }

    fn builtin(&self, path: &str, config: &AppConfig) -> Option<HandlerResponse> {
        if path == HEALTH_PATH {
            return Some(health_endpoint());
        }
        if path == METRICS_PATH {
            return self.metrics.as_ref().map(metrics_endpoint);
        }
        if !config.docs.enabled {
            return None;
        }
        if path == config.docs.openapi_path {
            return Some(self.openapi_json(config));
        }
        if path == config.docs.openapi_yaml_path() {
            return Some(self.openapi_yaml(config));
        }
        if path == config.docs.ui_path {
            return Some(self.docs_page(config));
        }
        None
    }

    fn openapi_json(&self, config: &AppConfig) -> HandlerResponse {
        let document = build_document(config, &self.routing.routes());
        HandlerResponse::json(200, document.to_json())
    }

    fn openapi_yaml(&self, config: &AppConfig) -> HandlerResponse {
        let document = build_document(config, &self.routing.routes());
        match document.to_yaml() {
            Ok(yaml) => {
                let mut response = HandlerResponse::text(200, yaml);
                response.set_header("Content-Type", "application/yaml");
                response
            }
            Err(err) => {
                error!(error = %err, "Failed to render API document as YAML");
                ApiError::internal("Internal Server Error").into_response()
            }
        }
    }

    fn docs_page(&self, config: &AppConfig) -> HandlerResponse {
        let document = build_document(config, &self.routing.routes());
        match swagger_ui_html(&document) {
            Ok(html) => HandlerResponse::html(200, html),
            Err(err) => {
                error!(error = %err, "Failed to render docs page");
                ApiError::internal("Internal Server Error").into_response()
            }
        }
    }
}

/// `{"status": "ok"}`.
pub fn health_endpoint() -> HandlerResponse {
    HandlerResponse::json(200, json!({ "status": "ok" }))
}

/// Prometheus text exposition of the request counters.
pub fn metrics_endpoint(metrics: &MetricsMiddleware) -> HandlerResponse {
    let mut response = HandlerResponse::text(200, metrics.render_prometheus());
    response.set_header("Content-Type", "text/plain; version=0.0.4");
    response
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let response = match parse_request(req) {
            Ok(request) => self.handle(request),
            Err(err) => {
                warn!(error = %err, "Rejected unparseable request");
                err.into_response()
            }
        };
        write_response(res, response);
        Ok(())
    }
}

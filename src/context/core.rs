use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use validator::Validate;

use super::services::AppServices;
use super::validation::validation_error;
use crate::error::ApiError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::pipeline::HandlerResult;
use crate::router::{ParamVec, RouteKey};

/// Most requests carry fewer than sixteen headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header and cookie storage. Names are lower-cased for headers.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

const LOCAL_USER_ID: &str = "user_id";
const LOCAL_CLAIMS: &str = "claims";

/// Transport-independent view of an HTTP request.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    pub body: Vec<u8>,
    pub remote_addr: Option<String>,
}

impl IncomingRequest {
    /// Build from a method and a target that may carry a query string.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let query_params = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (Arc::<str>::from(&*k), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            path_params: ParamVec::new(),
            query_params,
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            body: Vec::new(),
            remote_addr: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == "cookie" {
            self.cookies.extend(parse_cookie_header(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body plus a matching `content-type` header.
    pub fn with_json(self, body: &Value) -> Self {
        let bytes = body.to_string().into_bytes();
        self.with_header("content-type", "application/json").with_body(bytes)
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Last occurrence wins when a name repeats.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Last occurrence wins when a name repeats.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Split a `Cookie` header into `(name, value)` pairs.
pub(crate) fn parse_cookie_header(header: &str) -> impl Iterator<Item = (Arc<str>, String)> + '_ {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        let name = name.trim();
        (!name.is_empty()).then(|| (Arc::from(name), value.trim().to_string()))
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Html(String),
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
}

/// Response produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: ResponseBody,
}

impl HandlerResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: ResponseBody::Empty,
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            body: ResponseBody::Json(body),
            ..Self::new(status)
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            body: ResponseBody::Text(body.into()),
            ..Self::new(status)
        }
    }

    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self {
            body: ResponseBody::Html(body.into()),
            ..Self::new(status)
        }
    }

    /// Replace any header with the same (case-insensitive) name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
            return;
        }
        self.headers.push((Arc::from(name), value));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Empty => None,
            ResponseBody::Json(_) => Some("application/json"),
            ResponseBody::Text(_) => Some("text/plain; charset=utf-8"),
            ResponseBody::Html(_) => Some("text/html; charset=utf-8"),
            ResponseBody::Bytes { content_type, .. } => Some(content_type.as_str()),
        }
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            ResponseBody::Empty => Vec::new(),
            ResponseBody::Json(v) => serde_json::to_vec(v).unwrap_or_default(),
            ResponseBody::Text(s) | ResponseBody::Html(s) => s.as_bytes().to_vec(),
            ResponseBody::Bytes { data, .. } => data.clone(),
        }
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// The route a request was dispatched to.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    pub key: RouteKey,
    pub owner: String,
}

/// Per-request state shared by the middleware chain and the handler.
#[derive(Clone)]
pub struct RequestContext {
    request: IncomingRequest,
    response: HandlerResponse,
    written: bool,
    locals: HashMap<String, Value>,
    services: Arc<AppServices>,
    request_id: RequestId,
    route: Option<Arc<RouteBinding>>,
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    pub fn new(
        request: IncomingRequest,
        services: Arc<AppServices>,
        route: Option<Arc<RouteBinding>>,
    ) -> Self {
        let request_id = RequestId::from_header_or_new(request.header(REQUEST_ID_HEADER));
        Self {
            request,
            response: HandlerResponse::new(200),
            written: false,
            locals: HashMap::new(),
            services,
            request_id,
            route,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Context with default services and no route; useful outside the dispatcher.
    pub fn detached(request: IncomingRequest) -> Self {
        Self::new(request, Arc::new(AppServices::default()), None)
    }

    // --- request ---------------------------------------------------------

    pub fn request(&self) -> &IncomingRequest {
        &self.request
    }

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.path_param(name)
    }

    /// Path parameter, or `""` when the route has no such segment.
    pub fn param_or_empty(&self, name: &str) -> &str {
        self.param(name).unwrap_or("")
    }

    /// Path parameter parsed into `T`; 400 when missing or malformed.
    pub fn param_as<T: std::str::FromStr>(&self, name: &str) -> Result<T, ApiError> {
        let raw = self
            .param(name)
            .ok_or_else(|| ApiError::bad_request(format!("missing path parameter `{name}`")))?;
        raw.parse::<T>().map_err(|_| {
            ApiError::bad_request(format!("invalid path parameter `{name}`"))
                .with_detail(name, format!("cannot parse `{raw}`"))
        })
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.request.query_param(name)
    }

    pub fn query_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.query(name).unwrap_or(default)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.request.cookie(name)
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.request.body
    }

    /// Deserialize the JSON body.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if self.request.body.is_empty() {
            return Err(ApiError::bad_request("Invalid request body").with_detail("body", "empty"));
        }
        serde_json::from_slice(&self.request.body).map_err(ApiError::from)
    }

    /// Deserialize then run `validator` rules, aggregating every failing field.
    pub fn bind_and_validate<T: DeserializeOwned + Validate>(&self) -> Result<T, ApiError> {
        let value: T = self.bind()?;
        self.validate(&value)?;
        Ok(value)
    }

    /// Run `validator` rules on an already-built value.
    pub fn validate<T: Validate>(&self, value: &T) -> Result<(), ApiError> {
        value.validate().map_err(|errors| validation_error(&errors))
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn route(&self) -> Option<&RouteBinding> {
        self.route.as_deref()
    }

    // --- locals ----------------------------------------------------------

    pub fn set_local(&mut self, key: impl Into<String>, value: Value) {
        self.locals.insert(key.into(), value);
    }

    pub fn local(&self, key: &str) -> Option<&Value> {
        self.locals.get(key)
    }

    pub fn remove_local(&mut self, key: &str) -> Option<Value> {
        self.locals.remove(key)
    }

    /// Subject of the authenticated caller, set by the auth middleware.
    pub fn user_id(&self) -> Option<&str> {
        self.local(LOCAL_USER_ID).and_then(Value::as_str)
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.set_local(LOCAL_USER_ID, Value::String(user_id.into()));
    }

    pub fn claims(&self) -> Option<&serde_json::Map<String, Value>> {
        self.local(LOCAL_CLAIMS).and_then(Value::as_object)
    }

    pub fn set_claims(&mut self, claims: serde_json::Map<String, Value>) {
        self.set_local(LOCAL_CLAIMS, Value::Object(claims));
    }

    // --- services --------------------------------------------------------

    pub fn services(&self) -> &AppServices {
        &self.services
    }

    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    // --- cancellation ----------------------------------------------------

    /// True once an enclosing timeout has given up on this request.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    // --- response --------------------------------------------------------

    pub fn status(&mut self, status: u16) -> &mut Self {
        self.response.status = status;
        self.written = true;
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.response.set_header(name, value);
        self
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, status: u16, body: &T) -> HandlerResult {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::internal(format!("failed to serialize response: {e}")))?;
        self.response.status = status;
        self.response.body = ResponseBody::Json(value);
        self.written = true;
        Ok(())
    }

    pub fn ok<T: Serialize + ?Sized>(&mut self, body: &T) -> HandlerResult {
        self.json(200, body)
    }

    pub fn created<T: Serialize + ?Sized>(&mut self, body: &T) -> HandlerResult {
        self.json(201, body)
    }

    pub fn no_content(&mut self) -> HandlerResult {
        self.response.status = 204;
        self.response.body = ResponseBody::Empty;
        self.written = true;
        Ok(())
    }

    pub fn text(&mut self, status: u16, body: impl Into<String>) -> HandlerResult {
        self.response.status = status;
        self.response.body = ResponseBody::Text(body.into());
        self.written = true;
        Ok(())
    }

    pub fn html(&mut self, status: u16, body: impl Into<String>) -> HandlerResult {
        self.response.status = status;
        self.response.body = ResponseBody::Html(body.into());
        self.written = true;
        Ok(())
    }

    /// `{"success": true, "data": ..}` with status 200.
    pub fn success<T: Serialize + ?Sized>(&mut self, data: &T) -> HandlerResult {
        let data = serde_json::to_value(data)
            .map_err(|e| ApiError::internal(format!("failed to serialize response: {e}")))?;
        self.json(200, &serde_json::json!({ "success": true, "data": data }))
    }

    /// Write `err` as the response body now, instead of returning it.
    pub fn error(&mut self, err: ApiError) -> HandlerResult {
        self.respond(err.into_response())
    }

    pub fn redirect(&mut self, location: &str, status: u16) -> HandlerResult {
        let status = if (300..=399).contains(&status) { status } else { 302 };
        self.set_header("location", location);
        self.response.status = status;
        self.response.body = ResponseBody::Empty;
        self.written = true;
        Ok(())
    }

    /// JSON unless the client's `Accept` header prefers plain text or HTML.
    pub fn negotiate<T: Serialize + ?Sized>(&mut self, status: u16, body: &T) -> HandlerResult {
        let accept = self.header("accept").unwrap_or("").to_ascii_lowercase();
        let wants_json = accept.is_empty()
            || accept.contains("application/json")
            || accept.contains("*/*")
            || accept.contains("+json");
        if wants_json {
            return self.json(status, body);
        }
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::internal(format!("failed to serialize response: {e}")))?;
        let rendered = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        if accept.contains("text/html") {
            self.html(status, rendered)
        } else {
            self.text(status, rendered)
        }
    }

    /// Replace the whole response, keeping headers already set on the context.
    pub fn respond(&mut self, response: HandlerResponse) -> HandlerResult {
        let mut response = response;
        for (name, value) in &self.response.headers {
            if response.header(name).is_none() {
                response.headers.push((Arc::clone(name), value.clone()));
            }
        }
        self.response = response;
        self.written = true;
        Ok(())
    }

    pub fn response(&self) -> &HandlerResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut HandlerResponse {
        &mut self.response
    }

    /// Whether a status or body has been written.
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Take the response state of another context (used when a handler ran on a copy).
    pub(crate) fn absorb(&mut self, other: RequestContext) {
        self.response = other.response;
        self.written = other.written;
        self.locals = other.locals;
    }

    /// Turn the handler outcome into the final response.
    ///
    /// An error replaces the response unless one was already written, in which
    /// case the written response stands and the error is only logged.
    pub fn finish(self, result: HandlerResult) -> HandlerResponse {
        let RequestContext {
            response,
            written,
            request,
            request_id,
            ..
        } = self;
        match result {
            Ok(()) => response,
            Err(err) if written => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %request.method,
                    path = %request.path,
                    status = err.status(),
                    error = %err.message(),
                    "Handler returned an error after writing a response; keeping the response"
                );
                response
            }
            Err(err) => {
                let mut rendered = err.into_response();
                for (name, value) in &response.headers {
                    if rendered.header(name).is_none() {
                        rendered.headers.push((Arc::clone(name), value.clone()));
                    }
                }
                rendered
            }
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("written", &self.written)
            .finish()
    }
}

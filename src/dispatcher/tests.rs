use std::sync::Arc;

use http::Method;
use parking_lot::Mutex;
use serde_json::json;

use super::Dispatcher;
use crate::context::{AppServices, IncomingRequest, RequestContext};
use crate::error::ApiError;
use crate::pipeline::{handler_fn, middleware_fn, Handler, MiddlewareRef};
use crate::router::RouteKey;

fn services() -> Arc<AppServices> {
    Arc::new(AppServices::default())
}

fn tagging(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> MiddlewareRef {
    middleware_fn(tag, move |next: Handler| {
        let log = Arc::clone(&log);
        handler_fn(move |ctx: &mut RequestContext| {
            log.lock().push(tag);
            next(ctx)
        })
    })
}

#[test]
fn test_dispatch_hits_bound_route_with_params() {
    let dispatcher = Dispatcher::new();
    dispatcher.bind(
        RouteKey::new(Method::GET, "/user/:id"),
        "UserController.HandleGetUserById",
        &[],
        handler_fn(|ctx: &mut RequestContext| {
            let id = ctx.param("id").unwrap_or_default().to_string();
            let owner = ctx.route().map(|r| r.owner.clone()).unwrap_or_default();
            ctx.ok(&json!({ "id": id, "owner": owner }))
        }),
    );

    let response = dispatcher.dispatch(IncomingRequest::new(Method::GET, "/user/42"), services());
    assert_eq!(response.status, 200);
    assert_eq!(
        response.json_body().unwrap(),
        &json!({ "id": "42", "owner": "UserController.HandleGetUserById" })
    );
}

#[test]
fn test_not_found_and_method_not_allowed() {
    let dispatcher = Dispatcher::new();
    let ok = handler_fn(|ctx: &mut RequestContext| ctx.no_content());
    dispatcher.bind(RouteKey::new(Method::GET, "/user"), "a", &[], Arc::clone(&ok));
    dispatcher.bind(RouteKey::new(Method::POST, "/user"), "b", &[], ok);

    let response = dispatcher.dispatch(IncomingRequest::new(Method::GET, "/missing"), services());
    assert_eq!(response.status, 404);

    let response = dispatcher.dispatch(IncomingRequest::new(Method::DELETE, "/user"), services());
    assert_eq!(response.status, 405);
    assert_eq!(response.header("allow"), Some("GET, POST"));

    let response = dispatcher.dispatch(IncomingRequest::new(Method::OPTIONS, "/user"), services());
    assert_eq!(response.status, 204);
    assert_eq!(response.header("Allow"), Some("GET, POST"));
}

#[test]
fn test_global_wraps_route_middleware_and_applies_retroactively() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new();
    let terminal_log = Arc::clone(&log);
    dispatcher.bind(
        RouteKey::new(Method::GET, "/x"),
        "x",
        &[tagging("route", Arc::clone(&log))],
        handler_fn(move |ctx: &mut RequestContext| {
            terminal_log.lock().push("terminal");
            ctx.no_content()
        }),
    );
    dispatcher.use_middleware(tagging("global", Arc::clone(&log)));

    dispatcher.dispatch(IncomingRequest::new(Method::GET, "/x"), services());
    assert_eq!(*log.lock(), vec!["global", "route", "terminal"]);

    log.lock().clear();
    dispatcher.dispatch(IncomingRequest::new(Method::GET, "/nope"), services());
    assert_eq!(*log.lock(), vec!["global"]);
}

#[test]
fn test_rebind_replaces_and_unbind_removes() {
    let dispatcher = Dispatcher::new();
    let key = RouteKey::new(Method::GET, "/v");
    dispatcher.bind(key.clone(), "first", &[], handler_fn(|ctx: &mut RequestContext| ctx.text(200, "1")));
    dispatcher.bind(key.clone(), "second", &[], handler_fn(|ctx: &mut RequestContext| ctx.text(200, "2")));
    assert_eq!(dispatcher.endpoint_count(), 1);

    let response = dispatcher.dispatch(IncomingRequest::new(Method::GET, "/v"), services());
    assert_eq!(response.body_bytes(), b"2");

    assert!(dispatcher.unbind(&key));
    assert!(!dispatcher.unbind(&key));
    let response = dispatcher.dispatch(IncomingRequest::new(Method::GET, "/v"), services());
    assert_eq!(response.status, 404);
}

#[test]
fn test_handler_error_becomes_structured_response() {
    let dispatcher = Dispatcher::new();
    dispatcher.bind(
        RouteKey::new(Method::POST, "/orders"),
        "orders",
        &[],
        handler_fn(|_ctx: &mut RequestContext| {
            Err(ApiError::validation("Validation failed").with_detail("qty", "must be positive"))
        }),
    );
    let response = dispatcher.dispatch(IncomingRequest::new(Method::POST, "/orders"), services());
    assert_eq!(response.status, 422);
    let body = response.json_body().unwrap();
    assert_eq!(body["status"], 422);
    assert_eq!(body["details"]["qty"], "must be positive");
}

#[test]
fn test_missing_param_reads_as_empty() {
    let dispatcher = Dispatcher::new();
    dispatcher.bind(
        RouteKey::new(Method::GET, "/p"),
        "p",
        &[],
        handler_fn(|ctx: &mut RequestContext| {
            let id = ctx.param_or_empty("id").to_string();
            ctx.text(200, id)
        }),
    );
    let response = dispatcher.dispatch(IncomingRequest::new(Method::GET, "/p"), services());
    assert_eq!(response.status, 200);
    assert!(response.body_bytes().is_empty());
}

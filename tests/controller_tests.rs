//! Registration through the public API: controllers, groups, manual routes,
//! the route listing file and the API document.
//!
//! Requests are answered in-process with [`Application::handle`], so no
//! socket is involved.

use std::sync::Arc;

use convroute::config::AppConfig;
use convroute::generator::ROUTES_FILE_NAME;
use convroute::middleware::no_cache;
use convroute::prelude::*;
use convroute::router::RouteKey;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize, Describe)]
struct User {
    id: u64,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Debug, Deserialize, Describe)]
struct NewUser {
    name: String,
}

struct UserController;

#[controller(middleware = user_middleware)]
impl UserController {
    fn user_middleware(&self) -> Vec<MiddlewareRef> {
        vec![no_cache()]
    }

    #[route(response = Vec<User>)]
    fn handle_get(&self, ctx: &mut RequestContext) -> HandlerResult {
        ctx.ok(&[User {
            id: 1,
            name: "ada".into(),
            email: None,
        }])
    }

    #[route(response = User)]
    fn handle_get_by_id(&self, ctx: &mut RequestContext) -> HandlerResult {
        let id: u64 = ctx.param_as("id")?;
        ctx.ok(&User {
            id,
            name: "ada".into(),
            email: Some("ada@example.com".into()),
        })
    }

    #[route(request = NewUser, response = User, description = "Create a user")]
    fn handle_post(&self, ctx: &mut RequestContext) -> HandlerResult {
        let new_user: NewUser = ctx.bind()?;
        ctx.created(&User {
            id: 2,
            name: new_user.name,
            email: None,
        })
    }
}

struct StatusController;

#[controller(name = "StatusController")]
impl StatusController {
    fn handle_get_version(&self, ctx: &mut RequestContext) -> HandlerResult {
        let version = ctx.services().config().version.clone();
        ctx.ok(&json!({ "version": version }))
    }
}

fn get(app: &Application, target: &str) -> convroute::HandlerResponse {
    app.handle(IncomingRequest::new(Method::GET, target))
}

#[test]
fn test_controller_routes_follow_the_naming_convention() {
    let app = Application::new(AppConfig::default());
    let descriptor = app.register_controller(Arc::new(UserController));

    assert_eq!(descriptor.base_path, "/user");
    let keys: Vec<String> = descriptor.routes.iter().map(ToString::to_string).collect();
    assert_eq!(keys, vec!["GET /user", "GET /user/:id", "POST /user"]);
    assert_eq!(descriptor.middleware_names(), vec!["no_cache"]);

    let routes = app.routing().routes();
    let create = routes.get(&RouteKey::new(Method::POST, "/user")).unwrap();
    assert_eq!(create.description, "Create a user");
    assert_eq!(create.owner, "UserController.HandlePost");
    let by_id = routes.get(&RouteKey::new(Method::GET, "/user/:id")).unwrap();
    assert_eq!(by_id.description, "Get a specific user by ID");
}

#[test]
fn test_controller_handlers_and_middleware_run() {
    let app = Application::new(AppConfig::default());
    app.register_controller(Arc::new(UserController));

    let response = get(&app, "/user/9");
    assert_eq!(response.status, 200);
    assert_eq!(response.json_body().unwrap()["id"], 9);
    assert_eq!(response.header("cache-control"), Some("no-store, no-cache, must-revalidate, proxy-revalidate"));

    let request = IncomingRequest::new(Method::POST, "/user").with_json(&json!({ "name": "grace" }));
    let response = app.handle(request);
    assert_eq!(response.status, 201);
    assert_eq!(response.json_body().unwrap()["name"], "grace");

    let request = IncomingRequest::new(Method::POST, "/user").with_body("not json");
    assert_eq!(app.handle(request).status, 400);
}

#[test]
fn test_services_reach_handlers() {
    let mut config = AppConfig::default();
    config.version = "9.9.9".to_string();
    let app = Application::new(config);
    app.register_controller(Arc::new(StatusController));

    let response = get(&app, "/status/version");
    assert_eq!(response.json_body().unwrap(), &json!({ "version": "9.9.9" }));
}

#[test]
fn test_group_registration_prefixes_every_member() {
    let app = Application::new(AppConfig::default());
    let descriptors = app
        .group("/api/v2")
        .add(Arc::new(UserController))
        .add(Arc::new(StatusController))
        .register(app.routing());

    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[1].base_path, "/api/v2/status");
    assert_eq!(get(&app, "/api/v2/user/1").status, 200);
    assert_eq!(get(&app, "/api/v2/status/version").status, 200);
    assert_eq!(get(&app, "/user/1").status, 404);
}

#[test]
fn test_manual_route_registration() {
    let app = Application::new(AppConfig::default());
    app.register_route(
        Method::GET,
        "/ping",
        "Liveness probe",
        handler_fn(|ctx: &mut RequestContext| ctx.text(200, "pong")),
    )
    .set_name("ping")
    .response::<User>();

    let response = get(&app, "/ping");
    assert_eq!(response.body_bytes(), b"pong");

    let routes = app.routing().routes();
    let ping = routes.find_by_name("ping").unwrap();
    assert_eq!(ping.owner, "manual.GET");
    assert!(ping.response_type.is_some());
}

#[test]
fn test_route_file_is_written_on_registration() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.routes_file.enabled = true;
    config.routes_file.output_dir = dir.path().join("generated");
    let app = Application::new(config);

    app.register_controller(Arc::new(UserController));
    let listing = std::fs::read_to_string(dir.path().join("generated").join(ROUTES_FILE_NAME)).unwrap();
    assert!(listing.starts_with("// @generated"));
    assert!(listing.contains(r#"path: "/user/:id","#));
    assert!(listing.contains(r#"owner: "UserController.HandlePost","#));

    app.register_route(
        Method::DELETE,
        "/cache",
        "Flush caches",
        handler_fn(|ctx: &mut RequestContext| ctx.no_content()),
    )
    .set_name("cache.flush");
    let listing = std::fs::read_to_string(dir.path().join("generated").join(ROUTES_FILE_NAME)).unwrap();
    assert!(listing.contains(r#"name: Some("cache.flush"),"#));
}

#[test]
fn test_route_file_disabled_by_default() {
    let config = AppConfig::default();
    assert!(!config.routes_file.enabled);
    let app = Application::new(config);
    app.register_controller(Arc::new(UserController));
    assert!(!std::path::Path::new("generated").join(ROUTES_FILE_NAME).exists());
}

#[test]
fn test_api_document_describes_controllers() {
    let mut config = AppConfig::default();
    config.name = "users-api".to_string();
    let app = Application::new(config);
    app.register_controller(Arc::new(UserController));

    let doc = app.openapi();
    assert_eq!(doc.info.title, "users-api");

    let list = doc.operation("/user", "get").unwrap();
    assert_eq!(list.tags, vec!["UserController".to_string()]);

    let by_id = doc.operation("/user/{id}", "get").unwrap();
    assert_eq!(by_id.parameters.len(), 1);
    assert_eq!(by_id.parameters[0].name, "id");
    assert!(by_id.parameters[0].required);

    let create = doc.operation("/user", "post").unwrap();
    assert!(create.request_body.is_some());
    assert!(doc.components.schemas.contains_key("ApiError"));
    assert!(doc.components.security_schemes.contains_key("bearerAuth"));

    let json = doc.to_json();
    let body = &json["paths"]["/user"]["post"]["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(body["required"], json!(["name"]));
    let user = &json["paths"]["/user/{id}"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    assert!(user["properties"]["email"].is_object());
    let required = user["required"].as_array().unwrap();
    assert!(required.contains(&json!("id")));
    assert!(!required.contains(&json!("email")));
    let list = &json["paths"]["/user"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    assert_eq!(list["type"], "array");
}

//! # API Document
//!
//! Builds an OpenAPI 3.1 document from the route table. Every route becomes an
//! operation under its path (with `:id` segments rewritten to `{id}`), carrying
//! the route description as summary, its name as `operationId`, one string
//! path parameter per `:param` segment, and request/response schemas derived
//! through [`SchemaGenerator`] when the route declares types.
//!
//! Types reached through a cycle are published under `components/schemas`
//! and referenced with `$ref`.
//!
//! The server exposes the document at `docs.openapi_path` (JSON), its `.yaml`
//! sibling, and a Swagger UI page at `docs.ui_path`.

use std::collections::BTreeMap;

use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::RouteError;
use crate::router::{Route, RouteTable};
use crate::schema::SchemaGenerator;

pub const OPENAPI_VERSION: &str = "3.1.0";

const ERROR_SCHEMA: &str = "ApiError";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    pub paths: BTreeMap<String, BTreeMap<String, OperationObject>>,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationObject {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, ResponseObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseObject {
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    pub schemas: BTreeMap<String, Value>,
    pub security_schemes: BTreeMap<String, Value>,
}

impl ApiDocument {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn operation(&self, path: &str, method: &str) -> Option<&OperationObject> {
        self.paths.get(path)?.get(&method.to_ascii_lowercase())
    }
}

/// `/user/:id` -> `/user/{id}`.
pub fn openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn json_content(schema: Value) -> BTreeMap<String, MediaType> {
    BTreeMap::from([("application/json".to_string(), MediaType { schema })])
}

fn error_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "message": { "type": "string" },
            "status": { "type": "integer" },
            "code": { "type": "string" },
            "details": { "type": "object", "additionalProperties": { "type": "string" } }
        },
        "required": ["message", "status"]
    })
}

fn build_operation(route: &Route, schemas: &mut SchemaGenerator) -> OperationObject {
    let parameters = route
        .key()
        .param_names()
        .map(|name| Parameter {
            name: name.to_string(),
            location: "path".to_string(),
            required: true,
            schema: json!({ "type": "string" }),
        })
        .collect();

    let request_body = route.request_type.as_ref().map(|descriptor| RequestBody {
        required: true,
        content: json_content(schemas.generate(descriptor).to_json_schema()),
    });

    let success = ResponseObject {
        description: "Successful response".to_string(),
        content: route
            .response_type
            .as_ref()
            .map(|descriptor| json_content(schemas.generate(descriptor).to_json_schema()))
            .unwrap_or_default(),
    };
    let failure = ResponseObject {
        description: "Error response".to_string(),
        content: json_content(json!({ "$ref": format!("#/components/schemas/{ERROR_SCHEMA}") })),
    };

    let tag = route
        .owner
        .split_once('.')
        .map(|(owner, _)| owner.to_string())
        .filter(|owner| owner != "manual");

    OperationObject {
        summary: route.description.clone(),
        operation_id: route.name.clone(),
        tags: tag.into_iter().collect(),
        parameters,
        request_body,
        responses: BTreeMap::from([
            ("200".to_string(), success),
            ("default".to_string(), failure),
        ]),
    }
}

/// Build the document for every route in `table`.
pub fn build_document(config: &AppConfig, table: &RouteTable) -> ApiDocument {
    let mut schemas = SchemaGenerator::new();
    let mut paths: BTreeMap<String, BTreeMap<String, OperationObject>> = BTreeMap::new();
    for route in table.all() {
        let operation = build_operation(route, &mut schemas);
        paths
            .entry(openapi_path(&route.path))
            .or_default()
            .insert(route.method.as_str().to_ascii_lowercase(), operation);
    }

    let mut components = Components::default();
    for (name, node) in schemas.into_definitions() {
        components.schemas.insert(name, node.to_json_schema());
    }
    components
        .schemas
        .insert(ERROR_SCHEMA.to_string(), error_schema());
    components.security_schemes.insert(
        "bearerAuth".to_string(),
        json!({
            "type": "http",
            "scheme": "bearer",
            "bearerFormat": "JWT",
            "description": "JWT token for authentication"
        }),
    );

    let servers = match config.server.base_path.as_str() {
        "" | "/" => Vec::new(),
        base => vec![Server {
            url: base.to_string(),
        }],
    };

    ApiDocument {
        openapi: OPENAPI_VERSION.to_string(),
        info: Info {
            title: config.name.clone(),
            description: config.description.clone(),
            version: config.version.clone(),
        },
        servers,
        paths,
        components,
    }
}

const SWAGGER_UI_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>{{ title }} API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
</head>
<body>
    <div id="swagger-ui"></div>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                spec: {{ spec|safe }},
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [SwaggerUIBundle.presets.apis]
            });
        }
    </script>
</body>
</html>
"#;

/// Swagger UI page with the document embedded inline.
pub fn swagger_ui_html(document: &ApiDocument) -> Result<String, RouteError> {
    // `</` would end the script element early.
    let spec = document.to_json().to_string().replace("</", "<\\/");
    let mut env = Environment::new();
    env.add_template("docs.html", SWAGGER_UI_TEMPLATE)?;
    let template = env.get_template("docs.html")?;
    Ok(template.render(minijinja::context! {
        title => document.info.title.as_str(),
        spec => spec,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Describe;
    use http::Method;

    #[derive(crate::Describe)]
    #[allow(dead_code)]
    struct User {
        name: String,
        age: u32,
    }

    #[derive(crate::Describe)]
    #[allow(dead_code)]
    struct Category {
        label: String,
        children: Vec<Category>,
    }

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        table
            .add(Method::GET, "/user/:id", "UserController.HandleGetUserById", "Get a specific user by ID")
            .set_name("HandleGetUserById")
            .set_response_type(User::describe());
        table
            .add(Method::POST, "/user", "UserController.HandlePostIndex", "Create a new user")
            .set_request_type(User::describe());
        table
            .add(Method::GET, "/category", "manual.GET", "Category tree")
            .set_response_type(Category::describe());
        table
    }

    #[test]
    fn test_paths_and_parameters() {
        let doc = build_document(&AppConfig::default(), &table());
        assert_eq!(doc.openapi, "3.1.0");
        let op = doc.operation("/user/{id}", "GET").unwrap();
        assert_eq!(op.summary, "Get a specific user by ID");
        assert_eq!(op.operation_id.as_deref(), Some("HandleGetUserById"));
        assert_eq!(op.tags, vec!["UserController".to_string()]);
        assert_eq!(op.parameters.len(), 1);
        assert_eq!(op.parameters[0].name, "id");
        assert_eq!(op.parameters[0].location, "path");
        let schema = &op.responses["200"].content["application/json"].schema;
        assert_eq!(schema["properties"]["age"]["type"], "integer");
        assert_eq!(schema["required"], json!(["name", "age"]));
    }

    #[test]
    fn test_request_body_schema() {
        let doc = build_document(&AppConfig::default(), &table());
        let op = doc.operation("/user", "post").unwrap();
        let body = op.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.content["application/json"].schema["type"], "object");
        assert!(op.parameters.is_empty());
    }

    #[test]
    fn test_recursive_type_is_published_as_component() {
        let doc = build_document(&AppConfig::default(), &table());
        let op = doc.operation("/category", "get").unwrap();
        assert!(op.tags.is_empty());
        let schema = &op.responses["200"].content["application/json"].schema;
        assert_eq!(
            schema["properties"]["children"]["items"]["$ref"],
            "#/components/schemas/Category"
        );
        assert!(doc.components.schemas.contains_key("Category"));
        assert!(doc.components.schemas.contains_key("ApiError"));
    }

    #[test]
    fn test_yaml_and_json_agree() {
        let doc = build_document(&AppConfig::default(), &table());
        let yaml = doc.to_yaml().unwrap();
        let parsed: ApiDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(doc.to_json()["info"]["title"], "convroute");
    }

    #[test]
    fn test_swagger_page_embeds_document() {
        let mut config = AppConfig::default();
        config.name = "users".to_string();
        config.description = "</script><b>".to_string();
        let doc = build_document(&config, &table());
        let html = swagger_ui_html(&doc).unwrap();
        assert!(html.contains("SwaggerUIBundle"));
        assert!(html.contains("users API Documentation"));
        assert!(html.contains("\"/user/{id}\""));
        assert!(!html.contains("</script><b>"));
    }

    #[test]
    fn test_openapi_path() {
        assert_eq!(openapi_path("/user/:id/posts/:post"), "/user/{id}/posts/{post}");
        assert_eq!(openapi_path("/"), "/");
    }
}

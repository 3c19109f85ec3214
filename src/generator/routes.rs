use std::fs;
use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde::Serialize;

use crate::error::RouteError;
use crate::router::RouteTable;

pub const ROUTES_FILE_NAME: &str = "routes.rs";

const ROUTES_TEMPLATE: &str = r#"// @generated by convroute. Changes are overwritten on the next registration.

#[derive(Debug, Clone, Copy)]
pub struct RouteEntry {
    pub method: &'static str,
    pub path: &'static str,
    pub owner: &'static str,
    pub description: &'static str,
    pub name: Option<&'static str>,
}

pub static ROUTES: &[RouteEntry] = &[
{%- for route in routes %}
    RouteEntry {
        method: {{ route.method }},
        path: {{ route.path }},
        owner: {{ route.owner }},
        description: {{ route.description }},
        name: {{ route.name }},
    },
{%- endfor %}
];
"#;

/// One route with every field pre-rendered as a Rust expression.
#[derive(Serialize)]
struct RouteLiteral {
    method: String,
    path: String,
    owner: String,
    description: String,
    name: String,
}

/// Rust string literal for `s`, escapes included.
fn literal(s: &str) -> String {
    format!("{s:?}")
}

/// Render the route table as Rust source, in registration order.
pub fn render_route_listing(table: &RouteTable) -> Result<String, RouteError> {
    let routes: Vec<RouteLiteral> = table
        .all()
        .iter()
        .map(|route| RouteLiteral {
            method: literal(route.method.as_str()),
            path: literal(&route.path),
            owner: literal(&route.owner),
            description: literal(&route.description),
            name: match &route.name {
                Some(name) => format!("Some({})", literal(name)),
                None => "None".to_string(),
            },
        })
        .collect();

    let mut env = Environment::new();
    env.add_template(ROUTES_FILE_NAME, ROUTES_TEMPLATE)?;
    let template = env.get_template(ROUTES_FILE_NAME)?;
    let mut rendered = template.render(minijinja::context! { routes => routes })?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Write `<dir>/routes.rs`, creating `dir` when needed. Returns the file path.
pub fn write_route_file(table: &RouteTable, dir: &Path) -> Result<PathBuf, RouteError> {
    let source = render_route_listing(table)?;
    fs::create_dir_all(dir)?;
    let target = dir.join(ROUTES_FILE_NAME);
    let staging = dir.join(format!(".{ROUTES_FILE_NAME}.tmp"));
    fs::write(&staging, source)?;
    fs::rename(&staging, &target)?;
    Ok(target)
}

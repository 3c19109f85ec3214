use http::Method;

use crate::error::RouteError;

/// Prefix every handler identifier carries.
pub const HANDLER_PREFIX: &str = "Handle";

/// Verb prefixes in the order they are tried.
pub const HTTP_VERBS: [(&str, Method); 7] = [
    ("Get", Method::GET),
    ("Post", Method::POST),
    ("Put", Method::PUT),
    ("Delete", Method::DELETE),
    ("Patch", Method::PATCH),
    ("Options", Method::OPTIONS),
    ("Head", Method::HEAD),
];

const CONTROLLER_SUFFIX: &str = "Controller";

/// Result of parsing a handler identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    /// Hyphenated action fragment, e.g. `user-by-id`. Empty for the base route.
    pub action: String,
}

/// Derive `(method, path)` from a handler identifier relative to `base_path`.
///
/// # Errors
///
/// [`RouteError::NotAHandler`] when `identifier` does not start with `Handle`.
pub fn parse_handler_name(identifier: &str, base_path: &str) -> Result<RouteInfo, RouteError> {
    let rest = identifier
        .strip_prefix(HANDLER_PREFIX)
        .ok_or_else(|| RouteError::NotAHandler {
            identifier: identifier.to_string(),
        })?;

    let (method, action) = HTTP_VERBS
        .iter()
        .find_map(|(verb, method)| rest.strip_prefix(verb).map(|a| (method.clone(), a)))
        .unwrap_or((Method::GET, rest));

    let fragment = split_camel_case(action);
    let base = normalize_path(base_path);
    let path = if fragment.is_empty() || fragment == "index" {
        base
    } else if fragment.contains("by-id") {
        join_paths(&base, ":id")
    } else {
        join_paths(&base, &fragment)
    };

    Ok(RouteInfo {
        method,
        path,
        action: fragment,
    })
}

/// `UserPosts` -> `user-posts`. Every ASCII upper-case letter after the first
/// character starts a new segment.
pub fn split_camel_case(action: &str) -> String {
    let mut out = String::with_capacity(action.len() + 4);
    for (i, c) in action.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// `UserController` -> `/user`.
pub fn controller_base_path(type_name: &str) -> String {
    let stem = type_name.strip_suffix(CONTROLLER_SUFFIX).unwrap_or(type_name);
    format!("/{}", stem.to_lowercase())
}

/// Human-readable summary for a handler, used when the operation supplies none.
///
/// `base` is the controller base segment without the slash (`user`).
pub fn describe_handler(base: &str, identifier: &str) -> String {
    let rest = identifier.strip_prefix(HANDLER_PREFIX).unwrap_or(identifier);
    let action = HTTP_VERBS
        .iter()
        .find_map(|(verb, _)| rest.strip_prefix(verb))
        .unwrap_or(rest);

    if action.is_empty() {
        return base.to_string();
    }
    if action == "Index" {
        return format!("List all {base}s");
    }
    if action.contains("ById") {
        return format!("Get a specific {base} by ID");
    }

    let lowered = action.to_lowercase();
    if lowered.contains("create") {
        return format!("Create a new {base}");
    }
    if lowered.contains("update") {
        return format!("Update a {base}");
    }
    if lowered.contains("delete") {
        return format!("Delete a {base}");
    }

    split_camel_case(action).replace('-', " ")
}

/// Leading slash, no trailing slash (except for the root), no empty segments.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(path.len() + 1);
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Join two path pieces with exactly one `/` between them.
pub fn join_paths(prefix: &str, suffix: &str) -> String {
    let prefix = normalize_path(prefix);
    let suffix = normalize_path(suffix);
    match (prefix.as_str(), suffix.as_str()) {
        ("/", s) => s.to_string(),
        (p, "/") => p.to_string(),
        (p, s) => format!("{p}{s}"),
    }
}

use std::io::Read;

use http::Method;
use may_minihttp::Request;
use tracing::debug;

use crate::context::IncomingRequest;
use crate::error::ApiError;

/// Convert a `may_minihttp` request into the transport-independent form.
///
/// Header names are lower-cased and cookies are split out of the `Cookie`
/// header. The body is read fully; an unreadable body is a 400.
pub fn parse_request(req: Request) -> Result<IncomingRequest, ApiError> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|_| ApiError::bad_request("Unsupported HTTP method").with_detail("method", req.method()))?;
    let mut incoming = IncomingRequest::new(method, req.path());
    for header in req.headers() {
        incoming = incoming.with_header(header.name, String::from_utf8_lossy(header.value));
    }

    let mut body = Vec::new();
    req.body()
        .read_to_end(&mut body)
        .map_err(|err| ApiError::bad_request("Invalid request body").with_source(err))?;
    debug!(
        method = %incoming.method,
        path = %incoming.path,
        headers = incoming.headers.len(),
        body_bytes = body.len(),
        "Parsed request"
    );
    Ok(incoming.with_body(body))
}

/// Strip the configured base path. `None` when the path lies outside it.
pub fn strip_base_path<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(base) {
        Some("") => Some("/"),
        Some(rest) if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_base_path() {
        assert_eq!(strip_base_path("/user/1", "/"), Some("/user/1"));
        assert_eq!(strip_base_path("/user/1", ""), Some("/user/1"));
        assert_eq!(strip_base_path("/api/user/1", "/api"), Some("/user/1"));
        assert_eq!(strip_base_path("/api", "/api/"), Some("/"));
        assert_eq!(strip_base_path("/apix/user", "/api"), None);
        assert_eq!(strip_base_path("/user", "/api"), None);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use http::StatusCode;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::context::HandlerResponse;

/// Upper bound on distinct header lines kept for reuse.
pub const MAX_INTERNED_HEADERS: usize = 16_384;

/// Header slots in a `may_minihttp` response. Writing past this panics inside
/// the transport.
pub const MAX_RESPONSE_HEADERS: usize = 16;

/// `may_minihttp` only accepts `&'static str` header lines. Lines for headers
/// with stable values are leaked once and reused afterwards.
static HEADER_LINES: Lazy<DashMap<String, &'static str>> = Lazy::new(DashMap::new);
static INTERN_FULL_REPORTED: AtomicBool = AtomicBool::new(false);

/// Headers whose value changes on every response. Interning them would only
/// fill the table.
const PER_RESPONSE_HEADERS: &[&str] = &[
    "x-request-id",
    "x-ratelimit-remaining",
    "x-ratelimit-reset",
    "retry-after",
    "location",
    "set-cookie",
    "etag",
    "last-modified",
];

/// Kept first when a response has more headers than the transport holds.
const PROTOCOL_HEADERS: &[&str] = &[
    "content-type",
    "content-encoding",
    "content-disposition",
    "x-request-id",
    "location",
    "allow",
    "www-authenticate",
    "retry-after",
    "set-cookie",
    "vary",
];

const SECURITY_HEADERS: &[&str] = &[
    "strict-transport-security",
    "content-security-policy",
    "x-content-type-options",
    "x-frame-options",
    "referrer-policy",
    "permissions-policy",
    "x-xss-protection",
    "cache-control",
    "pragma",
    "expires",
];

pub(crate) fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

fn listed(list: &[&str], name: &str) -> bool {
    list.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Protocol headers (CORS included) rank 0, hardening headers 1, the rest 2.
fn header_priority(name: &str) -> u8 {
    if listed(PROTOCOL_HEADERS, name)
        || name
            .get(..15)
            .is_some_and(|p| p.eq_ignore_ascii_case("access-control-"))
    {
        0
    } else if listed(SECURITY_HEADERS, name) {
        1
    } else {
        2
    }
}

/// `"Name: value"` as a static line. Stable lines are shared; per-response
/// values and anything past [`MAX_INTERNED_HEADERS`] get a fresh line.
pub(crate) fn header_line(name: &str, value: &str) -> &'static str {
    let line = format!("{name}: {value}");
    if listed(PER_RESPONSE_HEADERS, name) {
        return Box::leak(line.into_boxed_str());
    }
    if let Some(existing) = HEADER_LINES.get(&line) {
        return *existing;
    }
    if HEADER_LINES.len() >= MAX_INTERNED_HEADERS {
        if !INTERN_FULL_REPORTED.swap(true, Ordering::Relaxed) {
            warn!(
                limit = MAX_INTERNED_HEADERS,
                header = %name,
                "Header intern table full; new header lines are no longer shared"
            );
        }
        return Box::leak(line.into_boxed_str());
    }
    let entry = HEADER_LINES.entry(line.clone()).or_insert_with(|| {
        let leaked: &'static str = Box::leak(line.into_boxed_str());
        leaked
    });
    *entry
}

fn is_header_safe(value: &str) -> bool {
    !value.bytes().any(|b| b == b'\r' || b == b'\n')
}

/// Header pairs that fit the transport, highest priority first and in
/// insertion order within a priority. Unsafe or transport-owned headers are
/// skipped; the overflow is logged and dropped.
pub(crate) fn select_headers(response: &HandlerResponse) -> Vec<(&str, &str)> {
    let mut candidates: Vec<(&str, &str)> = Vec::with_capacity(response.headers.len() + 1);
    if response.header("content-type").is_none() {
        if let Some(content_type) = response.content_type() {
            candidates.push(("Content-Type", content_type));
        }
    }
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if !is_header_safe(name) || !is_header_safe(value) {
            warn!(header = %name, "Dropping header with line breaks");
            continue;
        }
        candidates.push((&**name, value.as_str()));
    }
    if candidates.len() <= MAX_RESPONSE_HEADERS {
        return candidates;
    }

    candidates.sort_by_key(|(name, _)| header_priority(name));
    for (name, _) in candidates.drain(MAX_RESPONSE_HEADERS..) {
        warn!(
            header = %name,
            status = response.status,
            limit = MAX_RESPONSE_HEADERS,
            "Response header limit reached; dropping header"
        );
    }
    candidates
}

/// Write a dispatcher response onto the transport response.
pub fn write_response(res: &mut Response, response: HandlerResponse) {
    res.status_code(response.status as usize, status_reason(response.status));

    let headers = select_headers(&response);
    debug!(status = response.status, headers = headers.len(), "Writing response");
    for (name, value) in headers {
        res.header(header_line(name, value));
    }
    let body = response.body_bytes();
    if !body.is_empty() {
        res.body_vec(body);
    }
}

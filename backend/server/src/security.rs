use std::sync::Arc;

use axum::{
    extract::{Request, State as AxumState},
    http::{
        header::{
            LOCATION, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use settings::Settings;
use tracing::warn;

use crate::{
    state::State,
    utils::{host_name, is_secure, request_host},
};

const DEBUG_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Whether `host` (already port-stripped) matches the allow list.
/// `*` matches anything, `.example.com` matches the domain and its subdomains.
pub fn host_allowed(host: &str, allowed: &[String], debug: bool) -> bool {
    if allowed.is_empty() && debug {
        return DEBUG_HOSTS.contains(&host);
    }

    allowed.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();

        if pattern == "*" {
            true
        } else if let Some(domain) = pattern.strip_prefix('.') {
            host == domain || host.ends_with(&pattern)
        } else {
            host == pattern
        }
    })
}

fn hsts_value(settings: &Settings) -> Option<String> {
    let security = &settings.security;
    if security.hsts_seconds == 0 {
        return None;
    }

    let mut value = format!("max-age={}", security.hsts_seconds);
    if security.hsts_include_subdomains {
        value.push_str("; includeSubDomains");
    }
    if security.hsts_preload {
        value.push_str("; preload");
    }

    Some(value)
}

/// Host validation, HTTPS redirect and the standard security headers.
pub async fn enforce(AxumState(state): AxumState<Arc<State>>, request: Request, next: Next) -> Response {
    let settings = &state.settings;
    let headers = request.headers();

    let Some(host) = request_host(headers).map(str::to_string) else {
        return (StatusCode::BAD_REQUEST, "Bad Request (400)").into_response();
    };

    if !host_allowed(&host_name(&host), &settings.allowed_hosts, settings.debug) {
        warn!("Rejected request for disallowed host {host}");
        return (StatusCode::BAD_REQUEST, "Bad Request (400)").into_response();
    }

    let secure = is_secure(headers);

    if settings.security.ssl_redirect && !secure {
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        return match HeaderValue::try_from(format!("https://{host}{path}")) {
            Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response(),
            Err(_) => (StatusCode::BAD_REQUEST, "Bad Request (400)").into_response(),
        };
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    let security = &settings.security;

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static(security.frame_options.as_str()));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));
    if security.content_type_nosniff {
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    }
    if security.xss_filter {
        headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    }
    if secure {
        if let Some(value) = hsts_value(settings).and_then(|v| HeaderValue::try_from(v).ok()) {
            headers.insert(STRICT_TRANSPORT_SECURITY, value);
        }
    }

    response
}

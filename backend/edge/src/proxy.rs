use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{
        header::{CONNECTION, CONTENT_LENGTH},
        HeaderMap, HeaderName, HeaderValue,
    },
    response::Response,
};
use tokio::time::timeout;
use tracing::debug;

use crate::{error::ProxyError, Edge};

pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Removes hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }

    for name in HOP_BY_HOP {
        headers.remove(name);
    }

    let proxy_headers: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with("proxy-"))
        .cloned()
        .collect();

    for name in proxy_headers {
        headers.remove(name);
    }
}

/// Client address as far as the edge can tell. Only the local tunnel client
/// (a loopback peer) is trusted to report it through `CF-Connecting-IP`.
pub fn client_ip(headers: &HeaderMap, peer: IpAddr) -> IpAddr {
    if !peer.is_loopback() {
        return peer;
    }

    headers
        .get(CF_CONNECTING_IP)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(peer)
}

/// Sets `X-Real-IP`, `X-Forwarded-For` and `X-Forwarded-Proto` for the upstream.
pub fn forwarding_headers(headers: &mut HeaderMap, peer: IpAddr) {
    let trusted = peer.is_loopback();
    let client = client_ip(headers, peer);

    let forwarded_for = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{}, {peer}", existing.trim()),
        _ => peer.to_string(),
    };

    let proto = headers
        .get(X_FORWARDED_PROTO)
        .filter(|_| trusted)
        .cloned()
        .unwrap_or(HeaderValue::from_static("http"));

    if let Ok(value) = HeaderValue::try_from(client.to_string()) {
        headers.insert(X_REAL_IP, value);
    }
    if let Ok(value) = HeaderValue::try_from(forwarded_for) {
        headers.insert(X_FORWARDED_FOR, value);
    }
    headers.insert(X_FORWARDED_PROTO, proto);
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

pub async fn proxy_handler(
    State(edge): State<Arc<Edge>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let limit = edge.max_body;

    if declared_length(&parts.headers).is_some_and(|length| length > limit) {
        return Err(ProxyError::PayloadTooLarge { limit });
    }

    let body = to_bytes(body, limit)
        .await
        .map_err(|_| ProxyError::PayloadTooLarge { limit })?;

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{path}", edge.upstream);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(CONTENT_LENGTH);
    forwarding_headers(&mut headers, peer.ip());

    debug!("{} {path} -> {}", parts.method, edge.upstream);

    let pending = edge
        .client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send();

    let upstream = timeout(edge.timeout, pending)
        .await
        .map_err(|_| ProxyError::Timeout)??;

    let mut response = Response::builder().status(upstream.status());
    if let Some(headers) = response.headers_mut() {
        *headers = upstream.headers().clone();
        strip_hop_by_hop(headers);
    }

    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ProxyError::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
            .collect()
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut map = headers(&[
            ("connection", "keep-alive, x-internal"),
            ("keep-alive", "timeout=5"),
            ("x-internal", "1"),
            ("proxy-connection", "keep-alive"),
            ("transfer-encoding", "chunked"),
            ("accept", "text/html"),
        ]);

        strip_hop_by_hop(&mut map);

        assert_eq!(map.len(), 1);
        assert_eq!(map["accept"], "text/html");
    }

    #[test]
    fn test_forwarding_from_tunnel() {
        let mut map = headers(&[
            ("cf-connecting-ip", "203.0.113.7"),
            ("x-forwarded-proto", "https"),
            ("x-forwarded-for", "203.0.113.7"),
        ]);

        forwarding_headers(&mut map, "127.0.0.1".parse().unwrap());

        assert_eq!(map[X_REAL_IP], "203.0.113.7");
        assert_eq!(map[X_FORWARDED_FOR], "203.0.113.7, 127.0.0.1");
        assert_eq!(map[X_FORWARDED_PROTO], "https");
    }

    #[test]
    fn test_forwarding_from_untrusted_peer() {
        let mut map = headers(&[("cf-connecting-ip", "10.0.0.1"), ("x-forwarded-proto", "https")]);

        forwarding_headers(&mut map, "198.51.100.4".parse().unwrap());

        assert_eq!(map[X_REAL_IP], "198.51.100.4");
        assert_eq!(map[X_FORWARDED_FOR], "198.51.100.4");
        assert_eq!(map[X_FORWARDED_PROTO], "http");
    }
}

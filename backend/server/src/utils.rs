use axum::http::{header::HOST, HeaderMap};

pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }

    out
}

/// Host header as sent, port included.
pub fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty())
}

/// Host without the port, lowercased. Bracketed IPv6 literals keep their brackets.
pub fn host_name(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();

    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => host[..=end].to_string(),
            None => host,
        };
    }

    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
        _ => host,
    }
}

/// Scheme the client used, as reported by the edge. The app only listens on
/// loopback so the header can be trusted.
pub fn forwarded_proto(headers: &HeaderMap) -> &str {
    headers
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|proto| !proto.is_empty())
        .unwrap_or("http")
}

pub fn is_secure(headers: &HeaderMap) -> bool {
    forwarded_proto(headers).eq_ignore_ascii_case("https")
}

/// `scheme://host` for building absolute links, without a trailing slash.
pub fn absolute_base(headers: &HeaderMap) -> String {
    let host = request_host(headers).unwrap_or("localhost");

    format!("{}://{host}", forwarded_proto(headers).to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&'</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_host_name() {
        assert_eq!(host_name("Example.com:8000"), "example.com");
        assert_eq!(host_name("example.com"), "example.com");
        assert_eq!(host_name("[::1]:8000"), "[::1]");
        assert_eq!(host_name("[::1]"), "[::1]");
    }

    #[test]
    fn test_absolute_base() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("blog.example.com"));
        assert_eq!(absolute_base(&headers), "http://blog.example.com");

        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("https"));
        assert_eq!(absolute_base(&headers), "https://blog.example.com");
        assert!(is_secure(&headers));
    }
}

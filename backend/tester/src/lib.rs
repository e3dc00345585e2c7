//! Smoke checks against a live deployment, run from outside the host.
//!
//! - Static files come from the edge with a one year immutable cache
//! - Pages are proxied through to a working app server
//! - The app server port is not reachable from the outside
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, CACHE_CONTROL, EXPIRES},
    Client, StatusCode,
};
use tokio::{net::TcpStream, time::timeout};
use tracing::debug;

pub const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct Outcome {
    pub name: String,
    pub result: Result<String, String>,
}

fn header<'a>(headers: &'a HeaderMap, name: &reqwest::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn check_static(status: StatusCode, headers: &HeaderMap) -> Result<String, String> {
    if status != StatusCode::OK {
        return Err(format!("expected 200, got {status}"));
    }

    let cache = header(headers, &CACHE_CONTROL).ok_or("missing Cache-Control")?;
    if !cache.contains("immutable") || !cache.contains("max-age=31536000") {
        return Err(format!("unexpected Cache-Control: {cache}"));
    }

    let expires = header(headers, &EXPIRES).ok_or("missing Expires")?;

    Ok(format!("cached until {expires}"))
}

pub fn check_page(status: StatusCode, headers: &HeaderMap) -> Result<String, String> {
    if matches!(status, StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT) {
        return Err(format!("edge could not reach the app ({status})"));
    }
    if status.is_server_error() {
        return Err(format!("app answered {status}"));
    }

    if header(headers, &CACHE_CONTROL).is_some_and(|cache| cache.contains("immutable")) {
        return Err("page carries the static cache headers".to_string());
    }

    Ok(format!("proxied, {status}"))
}

pub async fn fetch(client: &Client, url: &str) -> Result<(StatusCode, HeaderMap), String> {
    debug!("GET {url}");

    let response = client.get(url).send().await.map_err(|e| e.to_string())?;

    Ok((response.status(), response.headers().clone()))
}

/// Passes when nothing accepts a connection on `address`.
pub async fn check_unreachable(address: &str) -> Result<String, String> {
    match timeout(Duration::from_secs(3), TcpStream::connect(address)).await {
        Ok(Ok(_)) => Err(format!("{address} accepted a connection")),
        Ok(Err(e)) => Ok(format!("refused ({e})")),
        Err(_) => Ok("timed out".to_string()),
    }
}

pub fn client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(pairs: &[(reqwest::header::HeaderName, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(name, value)| (name.clone(), HeaderValue::from_static(value)))
            .collect()
    }

    #[test]
    fn test_check_static() {
        let good = headers(&[
            (CACHE_CONTROL, "public, immutable, max-age=31536000"),
            (EXPIRES, "Mon, 05 Jan 2026 08:03:09 GMT"),
        ]);
        assert!(check_static(StatusCode::OK, &good).is_ok());
        assert!(check_static(StatusCode::NOT_FOUND, &good).is_err());

        let short = headers(&[(CACHE_CONTROL, "max-age=60"), (EXPIRES, "x")]);
        assert!(check_static(StatusCode::OK, &short).is_err());

        let no_expires = headers(&[(CACHE_CONTROL, "public, immutable, max-age=31536000")]);
        assert_eq!(check_static(StatusCode::OK, &no_expires), Err("missing Expires".to_string()));
    }

    #[test]
    fn test_check_page() {
        assert!(check_page(StatusCode::OK, &HeaderMap::new()).is_ok());
        assert!(check_page(StatusCode::NOT_FOUND, &HeaderMap::new()).is_ok());
        assert!(check_page(StatusCode::BAD_GATEWAY, &HeaderMap::new()).is_err());

        let cached = headers(&[(CACHE_CONTROL, "public, immutable, max-age=31536000")]);
        assert!(check_page(StatusCode::OK, &cached).is_err());
    }

    #[tokio::test]
    async fn test_check_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().to_string();
        assert!(check_unreachable(&open).await.is_err());

        drop(listener);
        assert!(check_unreachable(&open).await.is_ok());
    }
}

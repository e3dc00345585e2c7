use std::path::Path;

use axum::{
    http::{
        header::{CACHE_CONTROL, EXPIRES},
        HeaderValue, StatusCode,
    },
    middleware,
    response::Response,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use tower_http::services::ServeDir;

pub const CACHE_CONTROL_VALUE: &str = "public, immutable, max-age=31536000";
pub const CACHE_DAYS: i64 = 365;

/// HTTP date, as used by `Expires`.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

async fn cache_headers(mut response: Response) -> Response {
    let status = response.status();
    if !status.is_success() && status != StatusCode::NOT_MODIFIED {
        return response;
    }

    let expires = http_date(Utc::now() + Duration::days(CACHE_DAYS));
    let headers = response.headers_mut();

    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    if let Ok(value) = HeaderValue::try_from(expires) {
        headers.insert(EXPIRES, value);
    }

    response
}

/// Files under `root`, never listing directories. Traversal outside the root
/// is refused by `ServeDir`.
pub fn router(root: &Path) -> Router {
    let files = ServeDir::new(root).append_index_html_on_directories(false);

    Router::new()
        .fallback_service(files)
        .layer(middleware::map_response(cache_headers))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_http_date() {
        let time = Utc.with_ymd_and_hms(2026, 1, 5, 8, 3, 9).unwrap();
        assert_eq!(http_date(time), "Mon, 05 Jan 2026 08:03:09 GMT");
    }
}

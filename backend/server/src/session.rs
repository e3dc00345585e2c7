//! Admin sessions live entirely in a signed cookie:
//! `base64(username|expiry).hex(hmac_sha256(secret, payload))`.
//!
//! Nothing is stored server side, so logging out only clears the cookie.
use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{
        header::{COOKIE, LOCATION},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::state::State;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "sessionid";
pub const LOGIN_PATH: &str = "/admin/login/";
pub const TTL_DAYS: i64 = 14;

fn mac(secret: &str, payload: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    mac
}

/// Signed cookie value for `username`, valid until `expires`.
pub fn sign(secret: &str, username: &str, expires: DateTime<Utc>) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!("{username}|{}", expires.timestamp()));
    let signature = hex::encode(mac(secret, &payload).finalize().into_bytes());

    format!("{payload}.{signature}")
}

/// Username carried by a cookie value, if the signature holds and it has not expired.
pub fn verify(secret: &str, value: &str, now: DateTime<Utc>) -> Option<String> {
    let (payload, signature) = value.split_once('.')?;
    let signature = hex::decode(signature).ok()?;

    mac(secret, payload).verify_slice(&signature).ok()?;

    let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
    let (username, expiry) = decoded.rsplit_once('|')?;
    let expiry: i64 = expiry.parse().ok()?;

    if now.timestamp() >= expiry || username.is_empty() {
        return None;
    }

    Some(username.to_string())
}

/// Value of a cookie by name across every `Cookie` header.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub fn set_cookie(secret: &str, username: &str, secure: bool) -> String {
    let value = sign(secret, username, Utc::now() + Duration::days(TTL_DAYS));
    let max_age = TTL_DAYS * 24 * 60 * 60;
    let secure = if secure { "; Secure" } else { "" };

    format!("{COOKIE_NAME}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Strict{secure}")
}

pub fn clear_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict")
}

/// Logged in admin. Handlers taking this are only reached with a valid session.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub username: String,
}

pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(LOCATION, HeaderValue::from_static(LOGIN_PATH))]).into_response()
    }
}

impl FromRequestParts<Arc<State>> for AdminSession {
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<State>) -> Result<Self, Self::Rejection> {
        let value = cookie(&parts.headers, COOKIE_NAME).ok_or(LoginRedirect)?;
        let username = verify(&state.settings.secret_key, value, Utc::now()).ok_or(LoginRedirect)?;

        Ok(AdminSession { username })
    }
}

impl OptionalFromRequestParts<Arc<State>> for AdminSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<State>) -> Result<Option<Self>, Self::Rejection> {
        Ok(<AdminSession as FromRequestParts<Arc<State>>>::from_request_parts(parts, state)
            .await
            .ok())
    }
}

//! # Settings
//!
//! Environment driven configuration shared by the app server, the edge proxy
//! and the deploy tool.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. `SECRET_KEY` may also be mounted as a secret file under
//! `/run/secrets/SECRET_KEY`.
//!
//! ## Topology
//!
//! - Tunnel client terminates public TLS and talks to the edge on `EDGE_BIND`
//! - Edge serves `STATIC_URL` out of `STATIC_ROOT`, forwards the rest to `APP_BIND`
//! - App server only ever binds loopback, enforced here
use std::{
    collections::HashMap,
    env,
    fmt::Display,
    fs::read_to_string,
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
};

use tracing::{info, warn};

pub mod error;
mod shutdown;

pub use error::SettingsError;
pub use shutdown::shutdown_signal;

const DEV_SECRET_KEY: &str = "insecure-development-key-change-me";

/// Lookup of raw configuration values by key.
pub trait Source {
    fn get(&self, key: &str) -> Option<String>;

    fn secret(&self, key: &str) -> Option<String> {
        self.get(key)
    }
}

/// The process environment, with `/run/secrets` as a fallback for secrets.
pub struct Env;

impl Source for Env {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn secret(&self, key: &str) -> Option<String> {
        self.get(key).or_else(|| read_secret(key))
    }
}

impl Source for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|value| value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOptions {
    Deny,
    SameOrigin,
}

impl FrameOptions {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameOptions::Deny => "DENY",
            FrameOptions::SameOrigin => "SAMEORIGIN",
        }
    }
}

impl FromStr for FrameOptions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DENY" => Ok(FrameOptions::Deny),
            "SAMEORIGIN" => Ok(FrameOptions::SameOrigin),
            other => Err(format!("expected DENY or SAMEORIGIN, got {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Security {
    pub session_cookie_secure: bool,
    pub ssl_redirect: bool,
    pub hsts_seconds: u64,
    pub hsts_include_subdomains: bool,
    pub hsts_preload: bool,
    pub xss_filter: bool,
    pub content_type_nosniff: bool,
    pub frame_options: FrameOptions,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub secret_key: String,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub security: Security,

    pub app_bind: SocketAddr,
    pub workers: usize,

    pub edge_bind: SocketAddr,
    pub edge_max_body_bytes: usize,
    pub edge_upstream_timeout_secs: u64,

    /// Always starts and ends with `/`.
    pub static_url: String,
    pub static_root: PathBuf,
    pub static_dirs: Vec<PathBuf>,

    pub database_url: String,
    pub log_dir: PathBuf,
    pub site_title: String,
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        if dotenv::dotenv().is_ok() {
            info!("Loaded .env file");
        }

        Self::from_source(&Env)
    }

    pub fn from_source<S: Source>(source: &S) -> Result<Self, SettingsError> {
        let debug = try_flag(source, "DEBUG", false)?;

        let secret_key = match source.secret("SECRET_KEY") {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ if debug => {
                warn!("SECRET_KEY not set, using the development key");
                DEV_SECRET_KEY.to_string()
            }
            _ => return Err(SettingsError::Missing { key: "SECRET_KEY" }),
        };

        if !debug && secret_key.to_lowercase().contains("insecure") {
            return Err(SettingsError::InsecureSecret);
        }

        let allowed_hosts = list(source, "ALLOWED_HOSTS", "localhost,127.0.0.1");
        if !debug && allowed_hosts.iter().any(|host| host == "*") {
            warn!("ALLOWED_HOSTS accepts any host while DEBUG is off");
        }

        let security = Security {
            session_cookie_secure: try_flag(source, "SESSION_COOKIE_SECURE", !debug)?,
            ssl_redirect: try_flag(source, "SECURE_SSL_REDIRECT", false)?,
            hsts_seconds: try_load(source, "SECURE_HSTS_SECONDS", "0")?,
            hsts_include_subdomains: try_flag(source, "SECURE_HSTS_INCLUDE_SUBDOMAINS", false)?,
            hsts_preload: try_flag(source, "SECURE_HSTS_PRELOAD", false)?,
            xss_filter: try_flag(source, "SECURE_BROWSER_XSS_FILTER", true)?,
            content_type_nosniff: try_flag(source, "SECURE_CONTENT_TYPE_NOSNIFF", true)?,
            frame_options: try_load(source, "X_FRAME_OPTIONS", "DENY")?,
        };

        let app_bind: SocketAddr = try_load(source, "APP_BIND", "127.0.0.1:8000")?;
        if !app_bind.ip().is_loopback() {
            return Err(SettingsError::PublicBind(app_bind));
        }

        let workers: usize = try_load(source, "WORKERS", "3")?;
        if workers == 0 {
            return Err(SettingsError::Invalid {
                key: "WORKERS",
                value: "0".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }

        let static_dirs = list(source, "STATIC_DIRS", "static")
            .into_iter()
            .map(PathBuf::from)
            .collect();

        Ok(Self {
            secret_key,
            debug,
            allowed_hosts,
            security,
            app_bind,
            workers,
            edge_bind: try_load(source, "EDGE_BIND", "0.0.0.0:80")?,
            edge_max_body_bytes: try_load(source, "EDGE_MAX_BODY_BYTES", "10485760")?,
            edge_upstream_timeout_secs: try_load(source, "EDGE_UPSTREAM_TIMEOUT_SECS", "60")?,
            static_url: normalize_prefix(&try_load::<String, _>(source, "STATIC_URL", "/static/")?),
            static_root: try_load(source, "STATIC_ROOT", "staticfiles")?,
            static_dirs,
            database_url: try_load(source, "DATABASE_URL", "sqlite://db.sqlite3")?,
            log_dir: try_load(source, "LOG_DIR", "/var/log/vibehub")?,
            site_title: try_load(source, "SITE_TITLE", "Vibe Hub Devlogs")?,
        })
    }

    /// Edge port as seen by the tunnel.
    pub fn edge_port(&self) -> u16 {
        self.edge_bind.port()
    }
}

pub fn try_load<T: FromStr, S: Source>(
    source: &S,
    key: &'static str,
    default: &str,
) -> Result<T, SettingsError>
where
    T::Err: Display,
{
    let raw = source.get(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        SettingsError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }
    })
}

pub fn try_flag<S: Source>(source: &S, key: &'static str, default: bool) -> Result<bool, SettingsError> {
    let Some(raw) = source.get(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SettingsError::Invalid {
            key,
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Comma separated list with blanks dropped.
pub fn list<S: Source>(source: &S, key: &'static str, default: &str) -> Vec<String> {
    source
        .get(key)
        .unwrap_or_else(|| default.to_string())
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');

    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path).map(|s| s.trim().to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production() -> HashMap<&'static str, &'static str> {
        HashMap::from([("SECRET_KEY", "a-real-production-secret")])
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_source(&production()).unwrap();

        assert!(!settings.debug);
        assert_eq!(settings.allowed_hosts, vec!["localhost", "127.0.0.1"]);
        assert_eq!(settings.app_bind, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(settings.edge_port(), 80);
        assert_eq!(settings.static_url, "/static/");
        assert_eq!(settings.workers, 3);
        assert!(settings.security.session_cookie_secure);
        assert_eq!(settings.security.frame_options, FrameOptions::Deny);
    }

    #[test]
    fn test_secret_required_without_debug() {
        let source: HashMap<&str, &str> = HashMap::new();

        assert!(matches!(
            Settings::from_source(&source),
            Err(SettingsError::Missing { key: "SECRET_KEY" })
        ));
    }

    #[test]
    fn test_debug_falls_back_to_dev_secret() {
        let source = HashMap::from([("DEBUG", "True")]);
        let settings = Settings::from_source(&source).unwrap();

        assert!(settings.debug);
        assert_eq!(settings.secret_key, DEV_SECRET_KEY);
        assert!(!settings.security.session_cookie_secure);
    }

    #[test]
    fn test_insecure_secret_rejected_in_production() {
        let source = HashMap::from([("SECRET_KEY", "django-insecure-abc")]);

        assert!(matches!(
            Settings::from_source(&source),
            Err(SettingsError::InsecureSecret)
        ));
    }

    #[test]
    fn test_app_bind_must_be_loopback() {
        let mut source = production();
        source.insert("APP_BIND", "0.0.0.0:8000");

        assert!(matches!(
            Settings::from_source(&source),
            Err(SettingsError::PublicBind(_))
        ));

        source.insert("APP_BIND", "[::1]:8000");
        assert!(Settings::from_source(&source).is_ok());
    }

    #[test]
    fn test_lists_and_prefix() {
        let mut source = production();
        source.insert("ALLOWED_HOSTS", " example.com, ,.example.org ");
        source.insert("STATIC_URL", "assets");
        source.insert("STATIC_DIRS", "static,theme/static");

        let settings = Settings::from_source(&source).unwrap();

        assert_eq!(settings.allowed_hosts, vec!["example.com", ".example.org"]);
        assert_eq!(settings.static_url, "/assets/");
        assert_eq!(
            settings.static_dirs,
            vec![PathBuf::from("static"), PathBuf::from("theme/static")]
        );
    }

    #[test]
    fn test_invalid_values() {
        let mut source = production();
        source.insert("DEBUG", "maybe");
        assert!(matches!(
            Settings::from_source(&source),
            Err(SettingsError::Invalid { key: "DEBUG", .. })
        ));

        let mut source = production();
        source.insert("X_FRAME_OPTIONS", "ALLOW");
        assert!(matches!(
            Settings::from_source(&source),
            Err(SettingsError::Invalid { key: "X_FRAME_OPTIONS", .. })
        ));

        let mut source = production();
        source.insert("WORKERS", "0");
        assert!(Settings::from_source(&source).is_err());
    }
}

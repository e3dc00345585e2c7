use std::path::PathBuf;

use settings::{list, try_load, Settings, SettingsError, Source};

/// Deployment only values, on top of the shared [`Settings`].
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub service_user: String,
    pub app_service: String,
    pub edge_service: String,
    pub install_dir: PathBuf,
    pub env_file: PathBuf,
    pub tunnel_id: Option<String>,
    pub tunnel_credentials: Option<PathBuf>,
    pub public_hostnames: Vec<String>,
    pub render_dir: PathBuf,
    pub state_file: PathBuf,
}

impl DeployConfig {
    pub fn from_source<S: Source>(source: &S) -> Result<Self, SettingsError> {
        let tunnel_id = source.get("TUNNEL_ID").map(|id| id.trim().to_string()).filter(|id| !id.is_empty());

        let tunnel_credentials = source
            .get("TUNNEL_CREDENTIALS")
            .map(|path| PathBuf::from(path.trim()))
            .or_else(|| {
                tunnel_id
                    .as_ref()
                    .map(|id| PathBuf::from(format!("/etc/cloudflared/{id}.json")))
            });

        Ok(Self {
            service_user: try_load(source, "SERVICE_USER", "vibehub")?,
            app_service: try_load(source, "APP_SERVICE", "vibehub-app")?,
            edge_service: try_load(source, "EDGE_SERVICE", "vibehub-edge")?,
            install_dir: try_load(source, "INSTALL_DIR", "/opt/vibehub")?,
            env_file: try_load(source, "ENV_FILE", "/etc/vibehub/vibehub.env")?,
            tunnel_id,
            tunnel_credentials,
            public_hostnames: list(source, "PUBLIC_HOSTNAMES", ""),
            render_dir: try_load(source, "RENDER_DIR", "deploy/generated")?,
            state_file: try_load(source, "DEPLOY_STATE_FILE", ".deploy-state.json")?,
        })
    }
}

/// Everything a pipeline needs to know about the target host.
#[derive(Debug, Clone)]
pub struct Target {
    pub settings: Settings,
    pub deploy: DeployConfig,
}

impl Target {
    pub fn load() -> Result<Self, SettingsError> {
        let settings = Settings::load()?;
        let deploy = DeployConfig::from_source(&settings::Env)?;

        Ok(Self { settings, deploy })
    }

    pub fn from_source<S: Source>(source: &S) -> Result<Self, SettingsError> {
        Ok(Self {
            settings: Settings::from_source(source)?,
            deploy: DeployConfig::from_source(source)?,
        })
    }
}

/// Filesystem path of a SQLite `DATABASE_URL`, `None` for in-memory databases.
pub fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{info, warn};

use crate::{config::Target, error::StepError};

pub fn app_unit(target: &Target) -> String {
    let Target { settings, deploy } = target;
    let install = deploy.install_dir.display();
    let logs = settings.log_dir.display();

    format!(
        "[Unit]
Description={title} application server
After=network.target

[Service]
Type=simple
User={user}
Group={user}
WorkingDirectory={install}
EnvironmentFile={env_file}
Environment=APP_BIND={bind}
Environment=WORKERS={workers}
ExecStart={install}/target/release/server
Restart=on-failure
RestartSec=5
StandardOutput=append:{logs}/app.log
StandardError=append:{logs}/app-error.log

[Install]
WantedBy=multi-user.target
",
        title = settings.site_title,
        user = deploy.service_user,
        env_file = deploy.env_file.display(),
        bind = settings.app_bind,
        workers = settings.workers,
    )
}

pub fn edge_unit(target: &Target) -> String {
    let Target { settings, deploy } = target;
    let install = deploy.install_dir.display();
    let logs = settings.log_dir.display();

    format!(
        "[Unit]
Description={title} edge proxy
After=network.target {app_service}.service
Wants={app_service}.service

[Service]
Type=simple
User={user}
Group={user}
WorkingDirectory={install}
EnvironmentFile={env_file}
Environment=EDGE_BIND={bind}
AmbientCapabilities=CAP_NET_BIND_SERVICE
CapabilityBoundingSet=CAP_NET_BIND_SERVICE
ExecStart={install}/target/release/edge
Restart=on-failure
RestartSec=5
StandardOutput=append:{logs}/edge.log
StandardError=append:{logs}/edge-error.log

[Install]
WantedBy=multi-user.target
",
        title = settings.site_title,
        app_service = deploy.app_service,
        user = deploy.service_user,
        env_file = deploy.env_file.display(),
        bind = settings.edge_bind,
    )
}

#[derive(Debug, Serialize)]
pub struct TunnelConfig {
    pub tunnel: String,
    #[serde(rename = "credentials-file")]
    pub credentials_file: PathBuf,
    pub ingress: Vec<Ingress>,
}

#[derive(Debug, Serialize)]
pub struct Ingress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub service: String,
}

/// cloudflared config, `None` without a `TUNNEL_ID`. The last rule catches
/// every hostname not listed.
pub fn tunnel_config(target: &Target) -> Option<TunnelConfig> {
    let Target { settings, deploy } = target;
    let id = deploy.tunnel_id.as_ref()?;
    let credentials = deploy.tunnel_credentials.as_ref()?;
    let service = format!("http://localhost:{}", settings.edge_port());

    let mut ingress: Vec<Ingress> = deploy
        .public_hostnames
        .iter()
        .map(|hostname| Ingress {
            hostname: Some(hostname.clone()),
            service: service.clone(),
        })
        .collect();
    ingress.push(Ingress {
        hostname: None,
        service: "http_status:404".to_string(),
    });

    Some(TunnelConfig {
        tunnel: id.clone(),
        credentials_file: credentials.clone(),
        ingress,
    })
}

/// Writes the units and tunnel config into `dir`, returning the files written.
pub fn render_all(target: &Target, dir: &Path) -> Result<Vec<PathBuf>, StepError> {
    fs::create_dir_all(dir).map_err(StepError::io(dir))?;

    let mut files = vec![
        (dir.join(format!("{}.service", target.deploy.app_service)), app_unit(target)),
        (dir.join(format!("{}.service", target.deploy.edge_service)), edge_unit(target)),
    ];

    match tunnel_config(target) {
        Some(config) => files.push((dir.join("cloudflared.yml"), serde_yaml::to_string(&config)?)),
        None => warn!("TUNNEL_ID not set, skipping the tunnel config"),
    }

    if target.deploy.public_hostnames.is_empty() && target.deploy.tunnel_id.is_some() {
        warn!("PUBLIC_HOSTNAMES is empty, the tunnel will answer 404 to everything");
    }

    let mut written = Vec::with_capacity(files.len());
    for (path, contents) in files {
        fs::write(&path, contents).map_err(StepError::io(&path))?;
        info!("Rendered {}", path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn target(extra: &[(&'static str, &'static str)]) -> Target {
        let mut source: HashMap<&str, &str> = HashMap::from([
            ("SECRET_KEY", "render-secret"),
            ("EDGE_BIND", "0.0.0.0:8080"),
            ("WORKERS", "4"),
        ]);
        source.extend(extra.iter().copied());

        Target::from_source(&source).unwrap()
    }

    #[test]
    fn test_app_unit() {
        let unit = app_unit(&target(&[]));

        assert!(unit.contains("User=vibehub\n"));
        assert!(unit.contains("Environment=APP_BIND=127.0.0.1:8000\n"));
        assert!(unit.contains("Environment=WORKERS=4\n"));
        assert!(unit.contains("ExecStart=/opt/vibehub/target/release/server\n"));
        assert!(unit.contains("Restart=on-failure\n"));
        assert!(unit.contains("StandardOutput=append:/var/log/vibehub/app.log\n"));
    }

    #[test]
    fn test_edge_unit() {
        let unit = edge_unit(&target(&[]));

        assert!(unit.contains("AmbientCapabilities=CAP_NET_BIND_SERVICE\n"));
        assert!(unit.contains("Wants=vibehub-app.service\n"));
        assert!(unit.contains("Environment=EDGE_BIND=0.0.0.0:8080\n"));
    }

    #[test]
    fn test_tunnel_config() {
        assert!(tunnel_config(&target(&[])).is_none());

        let config = tunnel_config(&target(&[
            ("TUNNEL_ID", "abc-123"),
            ("PUBLIC_HOSTNAMES", "hub.example,www.hub.example"),
        ]))
        .unwrap();

        assert_eq!(config.tunnel, "abc-123");
        assert_eq!(config.credentials_file, PathBuf::from("/etc/cloudflared/abc-123.json"));
        assert_eq!(config.ingress.len(), 3);
        assert_eq!(config.ingress[1].hostname.as_deref(), Some("www.hub.example"));
        assert_eq!(config.ingress[1].service, "http://localhost:8080");
        assert_eq!(config.ingress[2].hostname, None);
        assert_eq!(config.ingress[2].service, "http_status:404");
    }

    #[test]
    fn test_tunnel_yaml_keeps_awkward_values() {
        let dir = TempDir::new().unwrap();
        let target = target(&[
            ("TUNNEL_ID", "abc-123"),
            ("TUNNEL_CREDENTIALS", "/etc/cloudflared/creds: main.json"),
            ("PUBLIC_HOSTNAMES", "hub.example #edge"),
        ]);

        render_all(&target, dir.path()).unwrap();

        let yaml = std::fs::read_to_string(dir.path().join("cloudflared.yml")).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed["tunnel"].as_str(), Some("abc-123"));
        assert_eq!(parsed["credentials-file"].as_str(), Some("/etc/cloudflared/creds: main.json"));
        assert_eq!(parsed["ingress"][0]["hostname"].as_str(), Some("hub.example #edge"));
        assert_eq!(parsed["ingress"][0]["service"].as_str(), Some("http://localhost:8080"));
        assert!(parsed["ingress"][1].get("hostname").is_none());
        assert_eq!(parsed["ingress"][1]["service"].as_str(), Some("http_status:404"));
    }

    #[test]
    fn test_render_all() {
        let dir = TempDir::new().unwrap();
        let target = target(&[("TUNNEL_ID", "abc-123")]);

        let files = render_all(&target, &dir.path().join("generated")).unwrap();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|path| path.exists()));
    }
}

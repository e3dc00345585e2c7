use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use content::Store;
use tracing::info;

use crate::{
    collect::collect_static,
    config::{sqlite_path, Target},
    error::StepError,
    prompt::Prompter,
    render::render_all,
    runner::CommandRunner,
};

/// Host side dependencies of every step.
pub struct Context {
    pub target: Target,
    pub runner: Arc<dyn CommandRunner>,
    pub prompter: Box<dyn Prompter>,
    /// Checkout the commands run in. Relative configured paths resolve against it.
    pub workdir: PathBuf,
}

impl Context {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    pub async fn store(&self) -> Result<Store, StepError> {
        Ok(Store::connect(&self.target.settings.database_url).await?)
    }

    pub async fn revision(&self) -> Option<String> {
        self.runner.output("git", &["rev-parse", "HEAD"], &self.workdir).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    PrepareDirectories,
    Install,
    Migrate,
    CollectStatic,
    Test,
    CreateAdmin,
    Restart,
    RenderUnits,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::PrepareDirectories => "prepare-directories",
            Step::Install => "install",
            Step::Migrate => "migrate",
            Step::CollectStatic => "collect-static",
            Step::Test => "test",
            Step::CreateAdmin => "create-admin",
            Step::Restart => "restart",
            Step::RenderUnits => "render-units",
        }
    }

    /// Runs the step, returning a one line summary. Every step can be rerun safely.
    pub async fn run(&self, ctx: &Context) -> Result<String, StepError> {
        let settings = &ctx.target.settings;
        let deploy = &ctx.target.deploy;

        match self {
            Step::PrepareDirectories => {
                let mut dirs = vec![
                    ctx.resolve(&settings.static_root),
                    ctx.resolve(&settings.log_dir),
                    ctx.resolve(&deploy.render_dir),
                ];

                let database_dir = sqlite_path(&settings.database_url)
                    .and_then(|path| path.parent().map(Path::to_path_buf))
                    .filter(|parent| !parent.as_os_str().is_empty());
                dirs.extend(database_dir.map(|dir| ctx.resolve(&dir)));

                for dir in &dirs {
                    fs::create_dir_all(dir).map_err(StepError::io(dir))?;
                }

                Ok(format!("{} directories ready", dirs.len()))
            }
            Step::Install => {
                ctx.runner
                    .run("cargo", &["build", "--release", "--locked"], &ctx.workdir)
                    .await?;

                Ok("release binaries built".to_string())
            }
            Step::Migrate => {
                let applied = ctx.store().await?.migrate().await?;

                Ok(format!("{applied} migration(s) applied"))
            }
            Step::CollectStatic => {
                let sources: Vec<PathBuf> = settings.static_dirs.iter().map(|dir| ctx.resolve(dir)).collect();
                let report = collect_static(&sources, &ctx.resolve(&settings.static_root))?;

                Ok(format!("{} copied, {} unmodified", report.copied, report.unmodified))
            }
            Step::Test => {
                ctx.runner.run("cargo", &["test", "--workspace"], &ctx.workdir).await?;

                Ok("tests passed".to_string())
            }
            Step::CreateAdmin => {
                let store = ctx.store().await?;
                let username = ctx.prompter.ask("Username")?;

                if store.admin(username.trim()).await?.is_some() {
                    info!("Admin user {} already exists", username.trim());
                    return Ok(format!("admin {} already exists", username.trim()));
                }

                let password = ctx.prompter.secret("Password")?;
                let confirm = ctx.prompter.secret("Password (again)")?;

                if password != confirm {
                    return Err(StepError::Input("passwords do not match".to_string()));
                }

                let admin = store.create_admin(&username, &password).await?;
                info!("Admin user {} created", admin.username);

                Ok(format!("admin {} created", admin.username))
            }
            Step::Restart => {
                ctx.runner
                    .run(
                        "systemctl",
                        &["restart", &deploy.app_service, &deploy.edge_service],
                        &ctx.workdir,
                    )
                    .await?;

                Ok(format!("{} and {} restarted", deploy.app_service, deploy.edge_service))
            }
            Step::RenderUnits => {
                let files = render_all(&ctx.target, &ctx.resolve(&deploy.render_dir))?;

                Ok(format!("{} file(s) rendered", files.len()))
            }
        }
    }
}

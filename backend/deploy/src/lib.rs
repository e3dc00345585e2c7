//! # Deployment
//!
//! Everything needed to put a new revision live on the host.
//!
//! ## Pipelines
//!
//! - **deploy**: install -> migrate -> collect-static -> restart
//! - **setup**: prepare-directories -> install -> migrate -> collect-static -> create-admin -> render-units
//! - Single step pipelines for migrate, collect-static, test, create-admin and render
//!
//! Steps run strictly in order and the first failure stops the pipeline. Every step is safe to
//! run again: migrations skip what is applied, static collection skips unchanged files, directory
//! creation and unit rendering overwrite in place, and create-admin leaves an existing username
//! untouched without asking for a password.
//!
//! ## Resuming
//!
//! After each successful step the state file (`DEPLOY_STATE_FILE`) is rewritten with the pipeline,
//! the step, the git revision and a timestamp. `--resume` continues after the recorded step when
//! - the state belongs to the same pipeline
//! - the checkout is at the same revision
//! - the recorded run did not finish
//!
//! Anything else starts from the first step.
//!
//! ## Rendered files
//!
//! - `<APP_SERVICE>.service`: app server on the loopback `APP_BIND`, restarted on failure
//! - `<EDGE_SERVICE>.service`: edge proxy, allowed to bind low ports
//! - `cloudflared.yml`: one ingress rule per public hostname pointing at the edge port
//!
//! Copy them into `/etc/systemd/system` and `/etc/cloudflared` and reload systemd.
use rand::{rngs::StdRng, SeedableRng};

pub mod collect;
pub mod config;
pub mod error;
pub mod marker;
pub mod menu;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod runner;
pub mod steps;

use content::sample::{generate, Generated};
use error::StepError;
use steps::Context;
use tracing::info;

/// Fills the database with demo content, optionally wiping existing content first.
pub async fn sample_data(
    ctx: &Context,
    projects: usize,
    devlogs: usize,
    clear: bool,
) -> Result<Generated, StepError> {
    let store = ctx.store().await?;
    store.migrate().await?;

    if clear {
        store.clear_content().await?;
        info!("Cleared existing projects and devlogs");
    }

    let mut rng = StdRng::from_entropy();
    Ok(generate(&store, &mut rng, projects, devlogs).await?)
}

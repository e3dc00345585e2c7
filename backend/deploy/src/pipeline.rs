use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::{
    error::PipelineError,
    marker::Marker,
    steps::{Context, Step},
};

/// Named, ordered list of steps. The first failing step stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    pub name: &'static str,
    pub steps: &'static [Step],
}

pub const DEPLOY: Pipeline = Pipeline {
    name: "deploy",
    steps: &[Step::Install, Step::Migrate, Step::CollectStatic, Step::Restart],
};

pub const SETUP: Pipeline = Pipeline {
    name: "setup",
    steps: &[
        Step::PrepareDirectories,
        Step::Install,
        Step::Migrate,
        Step::CollectStatic,
        Step::CreateAdmin,
        Step::RenderUnits,
    ],
};

pub const MIGRATE: Pipeline = Pipeline {
    name: "migrate",
    steps: &[Step::Migrate],
};

pub const COLLECT_STATIC: Pipeline = Pipeline {
    name: "collect-static",
    steps: &[Step::CollectStatic],
};

pub const TEST: Pipeline = Pipeline {
    name: "test",
    steps: &[Step::Test],
};

pub const CREATE_ADMIN: Pipeline = Pipeline {
    name: "create-admin",
    steps: &[Step::CreateAdmin],
};

pub const RENDER: Pipeline = Pipeline {
    name: "render",
    steps: &[Step::RenderUnits],
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Steps skipped because an earlier run already completed them.
    pub skipped: Vec<&'static str>,
    pub completed: Vec<(&'static str, String)>,
}

fn progress(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);

    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }

    pb
}

impl Pipeline {
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::name).collect()
    }

    pub async fn run(&self, ctx: &Context, resume: bool) -> Result<Report, PipelineError> {
        let marker_path = ctx.resolve(&ctx.target.deploy.state_file);
        let revision = ctx.revision().await;
        let names = self.step_names();

        let start = if resume {
            match Marker::load(&marker_path)? {
                Some(marker) => marker.resume_from(self.name, revision.as_deref(), &names),
                None => 0,
            }
        } else {
            0
        };

        if start > 0 {
            info!("Resuming {} after {}", self.name, names[start - 1]);
        } else if resume {
            warn!("Nothing to resume for {}, starting from the first step", self.name);
        }

        let mut report = Report {
            skipped: names[..start].to_vec(),
            completed: Vec::new(),
        };

        let pb = progress(self.steps.len());
        pb.set_position(start as u64);

        for step in &self.steps[start..] {
            pb.set_message(format!("Running {}", step.name()));
            info!("Running step {}", step.name());

            let summary = step.run(ctx).await.map_err(|source| {
                error!("Step {} failed: {source}", step.name());
                pb.abandon_with_message(format!("{} failed", step.name()));

                PipelineError::Step {
                    step: step.name(),
                    source,
                }
            })?;

            info!("Step {}: {summary}", step.name());
            report.completed.push((step.name(), summary));

            Marker {
                pipeline: self.name.to_string(),
                last_step: step.name().to_string(),
                revision: revision.clone(),
                updated_at: Utc::now(),
                finished: false,
            }
            .save(&marker_path)?;

            pb.inc(1);
        }

        Marker {
            pipeline: self.name.to_string(),
            last_step: names.last().copied().unwrap_or_default().to_string(),
            revision,
            updated_at: Utc::now(),
            finished: true,
        }
        .save(&marker_path)?;

        pb.finish_with_message("Done");
        Ok(report)
    }
}

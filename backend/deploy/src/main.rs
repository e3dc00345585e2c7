use std::{env, process::ExitCode, sync::Arc};

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use deploy::{
    config::Target,
    menu::{parse_choice, Choice, MENU},
    pipeline::{Pipeline, COLLECT_STATIC, CREATE_ADMIN, DEPLOY, MIGRATE, RENDER, SETUP, TEST},
    prompt::{Prompter, Stdin},
    runner::SystemRunner,
    sample_data,
    steps::Context,
};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Copy static files into STATIC_ROOT
    CollectStatic,
    /// Run the workspace tests
    Test,
    /// Create an admin user interactively
    CreateAdmin,
    /// Full deploy: install, migrate, collect static, restart
    Deploy {
        #[arg(long)]
        resume: bool,
    },
    /// Initial setup of a fresh host
    Setup {
        #[arg(long)]
        resume: bool,
    },
    /// Render the systemd units and tunnel config
    Render,
    /// Generate demo projects and devlogs
    SampleData {
        #[arg(long, default_value_t = 4)]
        projects: usize,

        #[arg(long, default_value_t = 8)]
        devlogs: usize,

        /// Delete existing projects and devlogs first
        #[arg(long)]
        clear: bool,
    },
    /// Interactive numbered menu
    Menu,
}

async fn run_pipeline(ctx: &Context, pipeline: Pipeline, resume: bool) -> anyhow::Result<()> {
    let report = pipeline.run(ctx, resume).await?;

    for step in &report.skipped {
        println!("{step}: skipped (already completed)");
    }
    for (step, summary) in &report.completed {
        println!("{step}: {summary}");
    }
    println!("{} finished", pipeline.name);

    Ok(())
}

async fn menu(ctx: &Context) -> anyhow::Result<()> {
    println!("{MENU}\n");

    let answer = ctx.prompter.ask("Select an option")?;

    match parse_choice(&answer) {
        Ok(Choice::Run(pipeline)) => run_pipeline(ctx, pipeline, false).await,
        Ok(Choice::Exit) => Ok(()),
        Err(reason) => bail!(reason),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let target = Target::load().context("Loading configuration")?;

    let ctx = Context {
        target,
        runner: Arc::new(SystemRunner),
        prompter: Box::new(Stdin),
        workdir: env::current_dir().context("Reading the working directory")?,
    };

    match args.command.unwrap_or(Command::Menu) {
        Command::Migrate => run_pipeline(&ctx, MIGRATE, false).await,
        Command::CollectStatic => run_pipeline(&ctx, COLLECT_STATIC, false).await,
        Command::Test => run_pipeline(&ctx, TEST, false).await,
        Command::CreateAdmin => run_pipeline(&ctx, CREATE_ADMIN, false).await,
        Command::Deploy { resume } => run_pipeline(&ctx, DEPLOY, resume).await,
        Command::Setup { resume } => run_pipeline(&ctx, SETUP, resume).await,
        Command::Render => run_pipeline(&ctx, RENDER, false).await,
        Command::SampleData {
            projects,
            devlogs,
            clear,
        } => {
            let generated = sample_data(&ctx, projects, devlogs, clear).await?;
            println!("Created {} project(s) and {} devlog(s)", generated.projects, generated.devlogs);

            Ok(())
        }
        Command::Menu => menu(&ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

use std::process::ExitCode;

use clap::Parser;
use tester::{check_page, check_static, check_unreachable, client, fetch, Outcome};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Public base URL, e.g. https://hub.example
    #[arg(long)]
    edge: String,

    #[arg(long, default_value = "/static/css/styles.css")]
    static_path: String,

    #[arg(long, default_value = "/")]
    page: String,

    /// host:port the app server must NOT answer on
    #[arg(long)]
    app_addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let base = args.edge.trim_end_matches('/');
    let client = client()?;

    let mut outcomes = Vec::new();

    let url = format!("{base}{}", args.static_path);
    outcomes.push(Outcome {
        name: format!("static {}", args.static_path),
        result: match fetch(&client, &url).await {
            Ok((status, headers)) => check_static(status, &headers),
            Err(e) => Err(e),
        },
    });

    let url = format!("{base}{}", args.page);
    outcomes.push(Outcome {
        name: format!("page {}", args.page),
        result: match fetch(&client, &url).await {
            Ok((status, headers)) => check_page(status, &headers),
            Err(e) => Err(e),
        },
    });

    if let Some(address) = &args.app_addr {
        outcomes.push(Outcome {
            name: format!("app port {address} closed"),
            result: check_unreachable(address).await,
        });
    }

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(detail) => println!("PASS {}: {detail}", outcome.name),
            Err(reason) => {
                failed += 1;
                println!("FAIL {}: {reason}", outcome.name);
            }
        }
    }

    println!("\n{} passed, {failed} failed", outcomes.len() - failed);

    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

//! `leftwatch-dashboard` -- console monitoring client.
//!
//! Connects to the left-object detection backend, follows the live HLS
//! stream through the software engine, and keeps the event list fresh.
//! Commands are read line by line from stdin; `help` lists them.
//!
//! # Environment variables
//!
//! | Variable       | Required | Default                 | Description      |
//! |----------------|----------|-------------------------|------------------|
//! | `API_BASE_URL` | no       | `http://127.0.0.1:8000` | Backend base URL |

use std::sync::Arc;

use anyhow::Context;
use leftwatch_client::EventsApi;
use leftwatch_dashboard::command::{Command, HELP};
use leftwatch_dashboard::config::DashboardConfig;
use leftwatch_dashboard::shell::{Flow, Shell};
use leftwatch_stream::HlsEngineFactory;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "leftwatch_dashboard=info,leftwatch_feed=info,leftwatch_stream=info";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = DashboardConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        api_base_url = %config.api_base_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting leftwatch-dashboard",
    );

    if let Err(e) = run(config).await {
        tracing::error!(error = ?e, "Dashboard stopped");
        std::process::exit(1);
    }
}

async fn run(config: DashboardConfig) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let api = EventsApi::with_client(client.clone(), config.api_base_url.clone());
    let engines = HlsEngineFactory::new(client);
    let mut shell = Shell::new(&config, Arc::new(api), Arc::new(engines));

    shell.start().await;
    println!("{}", shell.render());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            line = lines.next_line() => line.context("Failed to read command")?,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}\n{HELP}");
                continue;
            }
        };

        match shell.execute(command).await {
            Ok(Flow::Continue(text)) => println!("{text}"),
            Ok(Flow::Quit) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Command failed");
                println!("{e}");
            }
        }
    }

    shell.shutdown();
    tracing::info!("leftwatch-dashboard stopped");
    Ok(())
}

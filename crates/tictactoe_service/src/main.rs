//! Tic-tac-toe game service
//!
//! Reads JSON requests from stdin, writes replies to stdout, logs to stderr
//! and publishes game events to the configured target.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tictactoe_engine::{EventPublisher, SessionRegistry, TracingPublisher, outbox};
use tictactoe_service::{EventTarget, JsonLinesSink, ServiceConfig, serve};
use tokio::io::BufReader;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    info!(topic = %config.topic(), events = ?config.events(), "Starting tic-tac-toe service");

    let topic = config.topic().clone();
    match config.events().clone() {
        EventTarget::Log => run(TracingPublisher::new(topic), &config).await,
        EventTarget::Stderr => run(JsonLinesSink::stderr(topic), &config).await,
        EventTarget::File { path } => {
            let sink = JsonLinesSink::append_to(topic, &path)
                .with_context(|| format!("Failed to open event file {}", path.display()))?;
            run(sink, &config).await
        }
    }
}

/// Merges the config file, if any, with command-line overrides.
fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(topic) = &cli.topic {
        config = config.with_topic(topic.clone());
    }
    if let Some(filter) = &cli.log_filter {
        config = config.with_log_filter(filter.clone());
    }
    if let Some(path) = &cli.events_file {
        config = config.with_events(EventTarget::File { path: path.clone() });
    }
    Ok(config)
}

/// Serves stdio until end of input, then drains the outbox.
#[instrument(skip_all)]
async fn run<P: EventPublisher + 'static>(downstream: P, config: &ServiceConfig) -> Result<()> {
    let (publisher, dispatcher) = outbox(
        downstream,
        *config.outbox().capacity(),
        config.outbox().retry_policy(),
    );
    let dispatcher = tokio::spawn(dispatcher.run());

    let registry = SessionRegistry::new(publisher);
    let handled = serve(
        &registry,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
    .context("Request loop failed")?;

    info!(sessions = registry.len(), "Draining event outbox");
    drop(registry);
    let delivered = dispatcher.await.context("Outbox dispatcher panicked")?;

    info!(handled, delivered, "Service stopped");
    Ok(())
}

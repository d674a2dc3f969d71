#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use streamwatch::channel::WsConnector;
use streamwatch::config::Cli;
use streamwatch::controller::{Controller, RunOutcome};
use streamwatch::launcher::HttpSubmitter;
use streamwatch::view::ConsoleRenderer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr; stdout belongs to the session view
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Cli::parse().into_settings()?;
    info!("Runner channel {}, submissions to {}", settings.ws_url, settings.submit_url);

    let renderer = ConsoleRenderer::new(std::io::stdout(), settings.width, settings.viewport_rows);
    let mut controller = Controller::new(
        WsConnector::new(settings.ws_url.clone()),
        HttpSubmitter::new(settings.submit_url.clone()),
        renderer,
    );

    controller
        .submit(settings.input.clone())
        .context("Test configuration rejected")?;

    let outcome = tokio::select! {
        outcome = controller.run_until_complete(settings.timeout) => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning run");
            None
        }
    };

    if let Some(report) = controller.report() {
        report.print_summary();
        if let Some(path) = &settings.output {
            report
                .write_json(path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
    }

    if let Some(path) = &settings.metrics_output {
        std::fs::write(path, controller.metrics().render_prometheus())
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    Ok(exit_code(outcome.as_ref()))
}

fn exit_code(outcome: Option<&RunOutcome>) -> ExitCode {
    match outcome {
        Some(RunOutcome::Completed) => ExitCode::SUCCESS,
        Some(RunOutcome::SubmissionFailed(_)) => ExitCode::from(2),
        Some(RunOutcome::ChannelLost) => ExitCode::from(3),
        Some(RunOutcome::TimedOut) => ExitCode::from(4),
        None => ExitCode::from(130),
    }
}

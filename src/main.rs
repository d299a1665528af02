//! webwatch - website availability monitor.

use clap::Parser;
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webwatch::cli::{Args, OutputFormat};
use webwatch::config::MonitorConfig;
use webwatch::scheduler::Monitor;
use webwatch::ui::{run_presenter, JsonPresenter, TextPresenter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging; stdout belongs to the presenter
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("webwatch=info".parse()?))
        .init();

    // Load configuration
    let args = Args::parse();
    let cfg = args.apply(MonitorConfig::load())?;
    tracing::info!(
        "Starting webwatch: short={:?} long={:?} alert={:?} critical={}",
        cfg.short_history,
        cfg.long_history,
        cfg.alert_interval,
        cfg.critical_availability
    );

    // Start probing
    let monitor = Monitor::start(&cfg)?;

    // Start presenter
    let metrics = monitor.metrics().to_vec();
    let stop = monitor.stop_signal();
    let mut presenter = match args.format {
        OutputFormat::Text => tokio::spawn(run_presenter(
            metrics,
            TextPresenter::new(io::stdout()),
            cfg.short_refresh,
            cfg.long_refresh,
            stop,
        )),
        OutputFormat::Json => tokio::spawn(run_presenter(
            metrics,
            JsonPresenter::new(io::stdout()),
            cfg.short_refresh,
            cfg.long_refresh,
            stop,
        )),
    };

    let presenter_done = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Received interrupt, shutting down");
            false
        }
        result = &mut presenter => {
            // The presenter only stops on its own when stdout fails
            log_presenter_exit(result);
            true
        }
    };

    monitor.shutdown().await;
    if !presenter_done {
        log_presenter_exit(presenter.await);
    }

    Ok(())
}

fn log_presenter_exit(result: Result<io::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Presenter failed: {}", e),
        Err(e) => tracing::error!("Presenter task failed: {}", e),
    }
}

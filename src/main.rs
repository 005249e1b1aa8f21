pub mod cli;
pub mod config;
pub mod pubsub;
pub mod sensor;
pub mod simulator;

use crate::cli::Cli;
use crate::pubsub::MqttPublisher;
use clap::Parser;
use color_eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let cli = Cli::parse();
    let (mut config, source) = config::load(cli.config.as_deref()).await?;
    cli.apply(&mut config);

    setup_logging_env(config.log_level()?);
    match source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let token = CancellationToken::new();
    spawn_interrupt_handler(token.clone());

    let summary = simulator::launch(config, token, MqttPublisher::connect).await?;
    info!(
        "Simulator finished after {} readings ({})",
        summary.iterations, summary.stats
    );

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping simulator");
                token.cancel();
            }
            Err(e) => error!("Unable to listen for interrupt signal: {}", e),
        }
    });
}

//! Counselbook - counselling appointment scheduling service
//!
//! Serves the booking service over TCP and offers a few operator commands.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod error;

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Counselbook");

    if let Err(e) = cli::run() {
        tracing::error!("Counselbook failed: {}", e);
        std::process::exit(1);
    }
}

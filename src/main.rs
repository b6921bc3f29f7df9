//! upcase-echo: A line-oriented TCP echo server
//!
//! Every line a client sends is echoed back in uppercase. Sending `BYE`
//! (in any case) closes the connection.
//!
//! Features:
//! - One task per connection, no connection cap
//! - Line buffering across partial reads
//! - Configuration via CLI arguments or TOML file

mod config;
mod protocols;
mod server;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        workers = ?config.workers,
        backlog = config.backlog,
        "Starting upcase-echo server"
    );

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = config.workers.filter(|&n| n > 0) {
        builder.worker_threads(workers);
    }
    let runtime = builder.build()?;

    runtime.block_on(async {
        let server = Server::bind(&config)?;
        server.run().await
    })?;

    Ok(())
}

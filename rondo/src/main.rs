//! Rondo round-robin load balancer - main entry point

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;

use rondo_config::validator::validate as validate_config;
use rondo_pool::BackendPool;
use rondo_proxy::Dispatcher;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    // Sets a custom config file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(|| "./config/config.yaml".to_string());

    // Read configuration file
    let config = match rondo_config::loader::read_config(&config_path) {
        Ok(cfg) => cfg,
        Err(err_msg) => {
            eprintln!("Error loading config: {}", err_msg);
            std::process::exit(1);
        }
    };

    // Initialize the Logger
    rondo_utils::logger::init_logger(
        &config.log.level,
        config.log.file.enabled,
        &config.log.file.path,
    );

    // Validate Configurations
    if !validate_config(&config) {
        error!("Configuration validation failed. Exiting...");
        std::process::exit(1);
    }

    info!("Rondo is starting");

    // Pool construction is all-or-nothing: one bad URL aborts startup.
    let pool = match BackendPool::new(&config.backends) {
        Ok(pool) => Arc::new(pool),
        Err(err) => {
            error!("Invalid backend configuration: {}", err);
            std::process::exit(1);
        }
    };

    info!("Configured backends ({}):", pool.len());
    for (index, backend) in pool.snapshot().iter().enumerate() {
        info!("  [{}] {}", index + 1, backend.url());
    }

    let dispatcher = Arc::new(Dispatcher::new(
        pool,
        Duration::from_millis(config.upstream.connect_timeout_ms),
    ));

    let addr = format!("{}:{}", config.listen.address, config.listen.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {}: {}", addr, err);
            std::process::exit(1);
        }
    };

    info!("Load balancer listening on http://{}", addr);

    if let Err(err) = rondo_proxy::server::serve(listener, dispatcher).await {
        error!("Server loop failed: {}", err);
        std::process::exit(1);
    }
}

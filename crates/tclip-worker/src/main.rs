//! Clip selection worker binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tclip_worker::{SelectionRunner, WorkerConfig, WorkerError};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("tclip=info".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting tclip-worker");

    let config = match WorkerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Worker config: {:?}", config);

    let runner = match SelectionRunner::new(config) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to create selection runner: {}", e);
            std::process::exit(1);
        }
    };

    match runner.run_once().await {
        Ok(report) => {
            info!(
                clip_id = %report.result.id,
                url = %report.result.url,
                "Selection complete"
            );
        }
        Err(e) => {
            log_failure(&e);
            std::process::exit(1);
        }
    }
}

fn log_failure(e: &WorkerError) {
    match e {
        WorkerError::Engine(engine) => error!(
            stage = %engine.stage(),
            transport = engine.is_transport(),
            "Selection failed: {}",
            engine
        ),
        other => error!("Selection failed: {}", other),
    }
}

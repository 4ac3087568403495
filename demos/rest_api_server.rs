//! REST API server example
//!
//! Runs media-dl with the REST API enabled, allowing control via HTTP.
//!
//! ```bash
//! RUST_LOG=media_dl=debug,tower_http=info cargo run --example rest_api_server [config.json]
//! ```
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:6790/swagger-ui
//! - Submit jobs via POST http://localhost:6790/jobs
//! - Poll a job via GET http://localhost:6790/jobs/{id}
//! - Stream events via GET http://localhost:6790/events

use media_dl::{Config, MediaDownloader, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("media_dl=info,tower_http=info")),
        )
        .init();

    // Optional JSON config file; every field has a default
    let config = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str::<Config>(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    let address = config.server.api.bind_address;

    let downloader = Arc::new(MediaDownloader::new(config).await?);
    let capabilities = downloader.capabilities();
    if !capabilities.can_fetch {
        tracing::warn!("yt-dlp was not found; install it or set engine.ytdlp_path");
    }

    println!("Starting media-dl REST API server (engine: {})", capabilities.engine);
    println!("Swagger UI: http://{address}/swagger-ui");
    println!("Events stream: http://{address}/events");
    println!();
    println!("Example commands:");
    println!("  # Submit a job");
    println!("  curl -X POST http://{address}/jobs \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"url\": \"https://www.youtube.com/watch?v=jNQXAC9IVRw\", \"quality\": \"720p\"}}'");
    println!();
    println!("  # Poll it");
    println!("  curl http://{address}/jobs/<job_id>");
    println!();
    println!("  # Fetch the file once completed");
    println!("  curl -OJ http://{address}/files/<filename>");

    let server = downloader.spawn_api_server();

    // Runs until SIGINT/SIGTERM, then cancels in-flight jobs
    run_with_shutdown((*downloader).clone()).await?;
    server.abort();

    Ok(())
}

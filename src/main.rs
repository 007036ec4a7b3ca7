use std::path::PathBuf;

use clap::Parser;
use futures::future::join_all;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docgate::config::DocgateConfig;
use docgate::document::Document;
use docgate::DocumentClient;

/// Submit documents to the registration endpoint under a rate limit.
#[derive(Debug, Parser)]
#[command(name = "docgate", version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Value sent in the `Signature` header
    #[arg(short, long, default_value = "your_signature")]
    signature: String,

    /// JSON document to submit (defaults to a built-in sample)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Number of concurrent submissions of the document
    #[arg(long, default_value_t = 1)]
    copies: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    info!("Starting docgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = DocgateConfig::load(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        config.client.endpoint = endpoint;
        config.validate()?;
    }
    info!(endpoint = %config.client.endpoint, "Configuration loaded");

    let document = match &args.document {
        Some(path) => Document::from_json(&std::fs::read(path)?)?,
        None => Document::sample(),
    };

    let client = DocumentClient::new(&config)?;

    let submissions = join_all((0..args.copies).map(|copy| {
        let client = &client;
        let document = &document;
        let signature = args.signature.as_str();
        async move { (copy, client.submit(document, signature).await) }
    }));

    tokio::select! {
        results = submissions => {
            for (copy, result) in results {
                match result {
                    Ok(body) => println!("{}", body),
                    Err(e) => warn!(copy, error = %e, "Submission failed"),
                }
            }
        }
        _ = shutdown_signal() => {}
    }

    client.shutdown();
    info!(submitted = client.submitted_count(), "docgate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling pending submissions");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling pending submissions");
        }
    }
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! oralscan Web UI
//!
//! Serves the upload page and forwards each selected image to the classifier.

use clap::Parser;
use std::path::PathBuf;
use std::process::Command;
use tracing::{info, warn};

use oralscan::classifier;
use oralscan::config::{AppConfig, ProviderKind, WebConfig};
use oralscan::Result;

#[derive(Parser, Debug)]
#[command(name = "oralscan-web")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "oralscan upload and result page")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Inference endpoint (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Use the randomized stand-in instead of the inference server
    #[arg(long)]
    random: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Open browser automatically
    #[arg(long)]
    open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("oralscan web v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let mut config = AppConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.web.host = host;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }
    if let Some(endpoint) = args.endpoint {
        config.classifier.endpoint = endpoint;
    }
    if args.random {
        config.classifier.provider = ProviderKind::Random;
    }
    config.validate()?;

    let classifier = classifier::from_config(&config.classifier)?;
    info!("Classifier: {}", classifier.name());
    if config.classifier.provider == ProviderKind::Remote {
        match classifier.health_check().await {
            Ok(()) => info!("Inference server at {} is up", config.classifier.endpoint),
            Err(e) => warn!("Inference server not reachable yet: {}", e),
        }
    }

    if args.open {
        let url = page_url(&config.web);
        match browser_command(&url).spawn() {
            Ok(_) => info!("Opening {} in the browser", url),
            Err(e) => warn!("Failed to open browser: {}", e),
        }
    }

    oralscan::web::start_server(config, classifier).await
}

/// Address a local browser should use; wildcard binds are reached via loopback
fn page_url(web: &WebConfig) -> String {
    let host = match web.host.as_str() {
        "0.0.0.0" | "" => "127.0.0.1",
        "::" | "[::]" => "[::1]",
        host => host,
    };
    format!("http://{}:{}/", host, web.port)
}

/// The platform's "open this URL" launcher
fn browser_command(url: &str) -> Command {
    let (program, leading): (&str, &[&str]) = if cfg!(target_os = "windows") {
        // `start` treats a first quoted argument as the window title
        ("cmd", &["/c", "start", ""])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    };

    let mut command = Command::new(program);
    command.args(leading).arg(url);
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_uses_loopback_for_wildcard_binds() {
        let mut web = WebConfig::default();
        assert_eq!(page_url(&web), "http://127.0.0.1:8080/");

        web.host = "0.0.0.0".to_string();
        web.port = 9000;
        assert_eq!(page_url(&web), "http://127.0.0.1:9000/");

        web.host = "::".to_string();
        assert_eq!(page_url(&web), "http://[::1]:9000/");

        web.host = "scanner.local".to_string();
        assert_eq!(page_url(&web), "http://scanner.local:9000/");
    }

    #[test]
    fn test_browser_command_ends_with_url() {
        let command = browser_command("http://127.0.0.1:8080/");
        let last = command.get_args().last().and_then(|a| a.to_str());
        assert_eq!(last, Some("http://127.0.0.1:8080/"));
    }

    #[test]
    fn test_args_override_flags() {
        let args = Args::try_parse_from([
            "oralscan-web", "--port", "9000", "--random", "--open"
        ]).unwrap();
        assert_eq!(args.port, Some(9000));
        assert!(args.random && args.open);
        assert!(args.host.is_none());
    }
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! oralscan: upload an image, preview it, classify it remotely
//!
//! Headless front end: runs the same flow as the web page on files from disk.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use oralscan::classifier::{self, Classification};
use oralscan::config::{AppConfig, ProviderKind};
use oralscan::ui::ViewState;
use oralscan::upload::ImageUpload;
use oralscan::{Controller, Outcome, Result, ScanError};

/// oralscan CLI - classify lesion images against a local inference server
#[derive(Parser, Debug)]
#[command(name = "oralscan")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Classify images as positive or negative via a local inference server", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one or more image files
    Classify {
        /// Image files, analyzed in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Inference endpoint (overrides config)
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Use the randomized stand-in instead of the inference server
        #[arg(long)]
        random: bool,
    },

    /// Check that the inference server answers
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Classify { paths, endpoint, random } => {
            run_classify(config, paths, endpoint, random, &cli.format).await
        }
        Commands::Status => run_status(config).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config),
    }
}

/// Run the upload → result flow once per file, reusing one controller
async fn run_classify(
    mut config: AppConfig,
    paths: Vec<PathBuf>,
    endpoint: Option<String>,
    random: bool,
    format: &str,
) -> Result<()> {
    if let Some(endpoint) = endpoint {
        config.classifier.endpoint = endpoint;
    }
    if random {
        config.classifier.provider = ProviderKind::Random;
    }
    config.validate()?;

    let classifier = classifier::from_config(&config.classifier)?;
    let controller = Controller::new(ViewState::new(), classifier)
        .with_policy(config.upload.clone());

    let mut reports = Vec::new();
    let mut failures = 0usize;

    for path in &paths {
        let outcome = match ImageUpload::from_path(path) {
            Ok(upload) => controller.select_file(upload).await,
            Err(e) => Outcome::Rejected(e.to_string()),
        };

        for message in controller.with_surface(|view| view.take_alerts()).await {
            eprintln!("{}", message);
        }

        if !matches!(outcome, Outcome::Displayed(_)) {
            failures += 1;
        }

        if format == "text" {
            print_text(path, &outcome, &controller).await;
        }
        reports.push(report(path, &outcome));
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    debug!("Classified {} of {} files", paths.len() - failures, paths.len());

    if failures > 0 {
        return Err(ScanError::Analysis(format!(
            "{} of {} files could not be classified",
            failures,
            paths.len()
        )));
    }
    Ok(())
}

async fn print_text(path: &Path, outcome: &Outcome, controller: &Controller<ViewState>) {
    match outcome {
        Outcome::Displayed(_) => {
            let screen = controller.snapshot().await.screen;
            println!("{}: {} ({})", path.display(), screen.result_title, screen.confidence_value);
            println!("  {}", screen.result_desc);
        }
        Outcome::Failed(reason) | Outcome::Rejected(reason) => {
            eprintln!("{}: {}", path.display(), reason);
        }
        Outcome::Superseded => {}
    }
}

fn report(path: &Path, outcome: &Outcome) -> serde_json::Value {
    match outcome {
        Outcome::Displayed(c) => classification_json(path, c),
        Outcome::Failed(reason) | Outcome::Rejected(reason) => serde_json::json!({
            "path": path.to_string_lossy(),
            "error": reason,
        }),
        Outcome::Superseded => serde_json::json!({
            "path": path.to_string_lossy(),
            "error": "superseded",
        }),
    }
}

fn classification_json(path: &Path, c: &Classification) -> serde_json::Value {
    serde_json::json!({
        "path": path.to_string_lossy(),
        "verdict": c.verdict(),
        "result": c.result,
        "confidence": c.confidence,
        "confidence_text": c.confidence_text(),
        "raw_label": c.raw_label,
    })
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    let classifier = classifier::from_config(&config.classifier)?;

    println!("oralscan v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");
    println!("Provider: {}", classifier.name());

    if config.classifier.provider == ProviderKind::Remote {
        println!("Endpoint: {}", config.classifier.endpoint);
        match classifier.health_check().await {
            Ok(()) => println!("Inference server: Running"),
            Err(e) => println!("Inference server: Error - {}", e),
        }
    }

    println!("\nUpload policy:");
    println!("  Max bytes: {}", config.upload.max_bytes);
    println!("  Require image: {}", config.upload.require_image);

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output, force } => {
            if output.exists() && !force {
                return Err(ScanError::Config(format!(
                    "{:?} already exists. Use --force to overwrite",
                    output
                )));
            }
            AppConfig::default().save(&output)?;
            info!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Provider: {:?}", config.classifier.provider);
            println!("  Endpoint: {}", config.classifier.endpoint);
            println!("  Field name: {}", config.classifier.field_name);
        }
    }

    Ok(())
}

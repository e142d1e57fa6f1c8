//! Try-On CLI
//!
//! Submits a portrait and a clothing photo to the try-on service and reports
//! the composited result.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tryon_client::{
    Config, HttpSubmissionClient, ImageInput, Orchestrator, SubmitOutcome, TryOnResult,
    TryOnSnapshot,
};

/// Try-On - Virtual fitting room client
///
/// Uploads a portrait and a clothing image to the synthesis service and prints
/// the URL of the composited picture, optionally downloading it.
#[derive(Parser, Debug)]
#[command(name = "tryon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the portrait photo
    #[arg(value_name = "PORTRAIT")]
    portrait: PathBuf,

    /// Path to the clothing photo
    #[arg(value_name = "CLOTHING")]
    clothing: PathBuf,

    /// Path to configuration file (default: tryon.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Base URL of the synthesis service
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Total request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Download the result image to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the final state as JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    match run_try_on(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs one try-on submission end to end.
async fn run_try_on(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    apply_overrides(&mut config, args.base_url.as_deref(), args.timeout);

    // Re-validate after overrides
    config.validate()?;
    tracing::info!(base_url = %config.base_url, "Configuration loaded");

    let portrait = ImageInput::load(&args.portrait).await?;
    let clothing = ImageInput::load(&args.clothing).await?;

    let client = HttpSubmissionClient::new(config.clone())?;
    let orchestrator = Orchestrator::new(client);
    orchestrator.set_portrait(Some(portrait)).await;
    orchestrator.set_clothing(Some(clothing)).await;

    let outcome = orchestrator.submit().await;
    let snapshot = orchestrator.snapshot().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }

    match outcome {
        SubmitOutcome::Succeeded(result) => {
            if let Some(ref output) = args.output {
                let destination = resolve_output(&config, output);
                download(orchestrator.client(), &result, &destination).await?;
            }
            Ok(())
        }
        SubmitOutcome::Failed(err) => Err(err.into()),
        SubmitOutcome::Ignored | SubmitOutcome::Superseded => {
            anyhow::bail!("Submission did not complete")
        }
    }
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Applies command-line overrides on top of the loaded configuration.
///
/// A total timeout shorter than the connect timeout pulls the connect
/// timeout down with it.
fn apply_overrides(config: &mut Config, base_url: Option<&str>, timeout: Option<u64>) {
    if let Some(base_url) = base_url {
        config.base_url = base_url.to_string();
    }
    if let Some(timeout) = timeout {
        config.request_timeout_secs = timeout;
        config.connect_timeout_secs = config.connect_timeout_secs.min(timeout);
    }
}

/// Places relative output paths under the configured output directory.
fn resolve_output(config: &Config, output: &Path) -> PathBuf {
    if output.is_absolute() {
        output.to_path_buf()
    } else {
        Path::new(&config.output_dir).join(output)
    }
}

/// Downloads the result image and reports where it went.
async fn download(
    client: &HttpSubmissionClient,
    result: &TryOnResult,
    destination: &Path,
) -> anyhow::Result<()> {
    let bytes = client
        .download_result(result, destination)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to download result: {e}"))?;
    println!("Saved {} bytes to {}", bytes, destination.display());
    Ok(())
}

/// Prints the final state in plain text.
fn print_snapshot(snapshot: &TryOnSnapshot) {
    println!("=== Try-On ===");
    if let Some(ref portrait) = snapshot.portrait {
        println!(
            "Portrait: {} ({}, {} bytes)",
            portrait.file_name, portrait.media_type, portrait.size_bytes
        );
    }
    if let Some(ref clothing) = snapshot.clothing {
        println!(
            "Clothing: {} ({}, {} bytes)",
            clothing.file_name, clothing.media_type, clothing.size_bytes
        );
    }
    println!("Status: {}", snapshot.status);

    if let Some(ref result) = snapshot.result {
        println!("Result: {}", result.image_url);
    }
    if let Some(ref error) = snapshot.error {
        match error.status_code {
            Some(code) => println!("Failure ({}, HTTP {code}): {}", error.kind, error.message),
            None => println!("Failure ({}): {}", error.kind, error.message),
        }
    }
}

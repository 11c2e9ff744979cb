use anyhow::Result;
use clap::Parser;
use scribed::audio::AudioBuffer;
use scribed::cli::{Cli, Commands};
use scribed::config::Config;
use scribed::gateway::{GatewayState, run_gateway};
use scribed::recognition::{RemoteRecognitionBackend, TranscriptionSession};
use scribed::store::{Persister, SqliteTranscriptStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        None => serve(config, None).await?,
        Some(Commands::Serve { port }) => serve(config, port).await?,
        Some(Commands::Transcribe { file }) => {
            transcribe_file(config, &file, cli.quiet, cli.verbose).await?;
        }
        Some(Commands::CheckConfig) => check_config(&config)?,
    }

    Ok(())
}

/// Initialize tracing output.
///
/// `RUST_LOG` wins when set; otherwise verbosity flags pick the filter.
fn init_logging(quiet: bool, verbose: u8) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/scribed/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        // Load from custom path
        Config::load(path)?
    } else {
        // Try default path, fall back to defaults
        let default_path = Config::default_path();
        Config::load_or_default(&default_path)
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

/// Run the gateway until it is shut down.
async fn serve(mut config: Config, port_override: Option<u16>) -> Result<()> {
    if let Some(port) = port_override {
        config.gateway.listen_port = port;
    }
    config.validate()?;

    info!(
        version = %scribed::version_string(),
        backend = %config.recognition.endpoint,
        table = %config.storage.table,
        "starting scribed gateway"
    );

    let backend = Arc::new(RemoteRecognitionBackend::with_max_streams(
        &config.recognition.endpoint,
        config.recognition.max_streams,
    ));
    let store = Arc::new(SqliteTranscriptStore::connect(&config.storage.database_url).await?);
    let persister = Persister::with_table(store, &config.storage.table);

    let state = Arc::new(
        GatewayState::new(backend, persister)
            .with_recognition(config.recognition.recognition_config())
            .with_frame_bytes(config.recognition.frame_bytes)
            .with_idle_timeout(Duration::from_millis(config.recognition.idle_timeout_ms)),
    );

    run_gateway(state, &config.gateway.listen_addr()).await?;
    Ok(())
}

/// Transcribe one file of raw PCM audio, persist it, print the transcript.
async fn transcribe_file(config: Config, path: &Path, quiet: bool, verbose: u8) -> Result<()> {
    config.validate()?;

    let bytes = tokio::fs::read(path).await?;
    let audio = AudioBuffer::new(bytes);

    if !quiet {
        eprintln!(
            "Transcribing {} ({} ms of audio)...",
            path.display(),
            audio.duration_ms(config.recognition.sample_rate_hz)
        );
    }

    let backend = RemoteRecognitionBackend::with_max_streams(
        &config.recognition.endpoint,
        config.recognition.max_streams,
    );
    let session =
        TranscriptionSession::with_config(backend, config.recognition.recognition_config())
            .with_frame_bytes(config.recognition.frame_bytes)
            .with_idle_timeout(Duration::from_millis(config.recognition.idle_timeout_ms));

    let transcript = session
        .run_with_progress(&audio, |partial| {
            if verbose >= 1 {
                eprintln!("  ... {partial}");
            }
        })
        .await?;

    let store = Arc::new(SqliteTranscriptStore::connect(&config.storage.database_url).await?);
    let persister = Persister::with_table(store, &config.storage.table);
    let record = persister.persist_transcript(&transcript).await?;

    if !quiet {
        eprintln!("Stored as {}", record.id);
    }
    println!("{}", transcript);

    Ok(())
}

/// Print the effective configuration, then validate it.
fn check_config(config: &Config) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    config.validate()?;
    eprintln!("Configuration OK");
    Ok(())
}

//! Fingerprint reader over JSON lines.
//!
//! Reads method calls from stdin, one JSON object per line, and writes
//! responses and status events to stdout. Logs go to stderr. The scanner is
//! the in-process mock, preloaded with synthetic frames.

mod session;
mod synthetic;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fingerprint_hardware::AnyScanner;
use fingerprint_hardware::mock::MockScanner;
use fingerprint_reader::{FingerprintReader, ReaderConfig};

use crate::session::Output;

/// Scanner backend.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ScannerKind {
    /// Scriptable in-process scanner.
    #[default]
    Mock,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "fingerprint-cli")]
#[command(version, about = "Fingerprint capture session over JSON lines", long_about = None)]
struct CliArgs {
    /// Reader configuration (JSON)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scanner backend
    #[arg(long, value_enum, default_value_t = ScannerKind::Mock)]
    scanner: ScannerKind,

    /// Synthetic frames to preload
    #[arg(long, default_value_t = 8)]
    frames: u32,

    /// NFIQ score reported for each frame (negative: unavailable)
    #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
    quality: i32,

    /// Simulated time to place a finger
    #[arg(long, value_name = "MS", default_value_t = 200)]
    delay_ms: u64,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    info!("Starting fingerprint-cli v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref()).await?;
    let reader = Arc::new(build_reader(&args, config)?);

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_lines(out_rx));

    let mut status = reader.subscribe();
    let status_tx = out_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = status.next().await {
            if status_tx.send(Output::status(event)).is_err() {
                break;
            }
        }
    });

    let mut calls = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                reader.close().await;
                None
            }
        };
        let Some(line) = line else { break };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match session::parse_line(line) {
            Ok((id, call)) => {
                let reader = Arc::clone(&reader);
                let out_tx = out_tx.clone();
                calls.spawn(async move {
                    let response = reader.dispatch_value(call).await;
                    let _ = out_tx.send(Output::response(id, response));
                });
            }
            Err(response) => {
                warn!(line, "Malformed input line");
                let _ = out_tx.send(Output::response(None, response));
            }
        }
    }

    debug!(pending = calls.len(), "Input closed, draining calls");
    while calls.join_next().await.is_some() {}

    reader.close().await;
    reader.unsubscribe();
    drop(out_tx);
    printer.await??;

    info!("Shutdown complete");
    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "fingerprint_reader=info,fingerprint_cli=info",
        1 => "fingerprint_reader=debug,fingerprint_cli=debug",
        _ => "fingerprint_reader=trace,fingerprint_cli=trace",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<ReaderConfig> {
    let Some(path) = path else {
        return Ok(ReaderConfig::default());
    };

    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = ReaderConfig::from_json(&text)
        .with_context(|| format!("Invalid reader configuration in {}", path.display()))?;

    info!(path = %path.display(), devices = config.devices.len(), "Loaded configuration");
    Ok(config)
}

fn build_reader(
    args: &CliArgs,
    config: ReaderConfig,
) -> anyhow::Result<FingerprintReader<AnyScanner>> {
    match args.scanner {
        ScannerKind::Mock => {
            let (_scanner, mock) = MockScanner::new();
            mock.set_capture_delay(Duration::from_millis(args.delay_ms));
            synthetic::queue_frames(&mock, args.frames, args.quality)
                .context("Failed to queue synthetic frames")?;
            info!(frames = args.frames, "Mock scanner ready");

            let factory = move |_device_id: Option<&str>| -> fingerprint_hardware::Result<AnyScanner> {
                Ok(AnyScanner::Mock(mock.scanner()))
            };
            Ok(FingerprintReader::builder(factory).config(config).build()?)
        }
    }
}

async fn print_lines(mut rx: mpsc::UnboundedReceiver<Output>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(output) = rx.recv().await {
        stdout.write_all(output.to_line()?.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

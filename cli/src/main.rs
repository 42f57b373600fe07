//! sortcam CLI - replays a landmark stream through the capture engine.
//!
//! # Usage
//!
//! ```text
//! sortcam <frame-image> [landmarks.jsonl | -] [--local <url>]
//! ```
//!
//! The still image stands in for the camera. Landmark ticks are read as JSON
//! lines (stdin by default) and fed to the engine at their recorded spacing.
//! Phase changes and results go to stdout; logs go to `~/.sortcam/logs`.
//!
//! ```text
//! main() -> load config -> engine::start() -> replay() ----> EngineHandle::observe
//!                                 |
//!                                 v
//!                       print_status() <- watch<SessionSnapshot>
//! ```

mod replay;
mod status;

use anyhow::{Context, Result, bail};
use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sortcam_engine::{
    BackendTarget, EngineHandle, EngineSettings, Observation, PhaseTag, SortcamConfig,
    StillImageSource,
};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Stdout carries status lines, so logs fall back to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let candidates = log_file_candidates();
    let mut warnings = Vec::new();

    for candidate in candidates {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.sortcam/logs/sortcam.log
    if let Some(config_path) = SortcamConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("sortcam.log"));
    }

    // Fallback: ./.sortcam/logs/sortcam.log
    candidates.push(PathBuf::from(".sortcam").join("logs").join("sortcam.log"));

    candidates
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    frame: PathBuf,
    landmarks: Option<PathBuf>,
    local_api_url: Option<String>,
}

const USAGE: &str = "usage: sortcam <frame-image> [landmarks.jsonl | -] [--local <url>]";

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut positional = Vec::new();
    let mut local_api_url = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--local" => {
                let url = args.next().context("--local requires a URL")?;
                local_api_url = Some(url);
            }
            "-h" | "--help" => bail!("{USAGE}"),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(frame) = positional.next() else {
        bail!("{USAGE}");
    };
    let landmarks = positional
        .next()
        .filter(|p| p != "-")
        .map(PathBuf::from);
    if let Some(extra) = positional.next() {
        bail!("unexpected argument '{extra}'\n{USAGE}");
    }

    Ok(Args {
        frame: PathBuf::from(frame),
        landmarks,
        local_api_url,
    })
}

fn load_settings() -> Result<EngineSettings> {
    let config = match SortcamConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Warning: {e}; using defaults");
            SortcamConfig::default()
        }
    };
    match config.resolve() {
        Ok(settings) => Ok(settings),
        Err(e) => {
            eprintln!("Warning: {e}; using defaults");
            EngineSettings::defaults().context("built-in defaults are invalid")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = parse_args(std::env::args().skip(1))?;
    let settings = load_settings()?;

    let source = StillImageSource::open(&args.frame)
        .with_context(|| format!("failed to open frame image {}", args.frame.display()))?;
    let (engine, join) = sortcam_engine::start(&settings, Arc::new(source))
        .context("failed to build HTTP client")?;

    let target = match &args.local_api_url {
        Some(url) => {
            let target = BackendTarget::local(url)
                .with_context(|| format!("invalid local API URL '{url}'"))?;
            engine.select_backend(target.clone()).await?;
            target
        }
        None => settings.target.clone(),
    };
    println!("Backend: {target}");

    let printer = tokio::spawn(print_status(engine.clone()));

    let replayed = match &args.landmarks {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            replay(&engine, BufReader::new(file)).await
        }
        None => replay(&engine, BufReader::new(tokio::io::stdin())).await,
    };

    // Input ended: the hand is gone. Let any capture already under way finish.
    engine
        .observe(Observation::no_hand(std::time::Instant::now()))
        .await?;
    let mut snapshots = engine.subscribe();
    snapshots
        .wait_for(|s| matches!(s.phase, PhaseTag::Idle))
        .await
        .context("engine stopped unexpectedly")?;

    engine.shutdown().await?;
    drop(engine);
    join.await.context("engine task panicked")?;
    printer.await.context("status printer panicked")?;

    let lines = replayed?;
    tracing::info!(lines, "Replay finished");
    Ok(())
}

/// Feed JSON-lines observations at their recorded spacing.
async fn replay<R>(engine: &EngineHandle, reader: R) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let start = tokio::time::Instant::now();
    let mut lines = reader.lines();
    let mut fed = 0u64;
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await.context("failed to read landmarks")? {
        line_no += 1;
        let parsed = match replay::parse_line(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = line_no, %e, "Skipping malformed landmark line");
                continue;
            }
        };
        if let Some(e) = &parsed.malformed_hands {
            tracing::warn!(line = line_no, %e, "Malformed landmarks; treating tick as no hand");
        }

        tokio::time::sleep_until(start + parsed.offset()).await;
        engine
            .observe(parsed.into_observation(std::time::Instant::now()))
            .await?;
        fed += 1;
    }

    Ok(fed)
}

/// Print status changes; acknowledge each result or failure so the next
/// cycle can start.
async fn print_status(engine: EngineHandle) {
    let mut rx = engine.subscribe();
    let mut prev = rx.borrow_and_update().clone();

    while rx.changed().await.is_ok() {
        let next = rx.borrow_and_update().clone();
        for line in status::describe(&prev, &next) {
            println!("{line}");
        }
        if matches!(next.phase, PhaseTag::ResultReady | PhaseTag::Failed)
            && engine.reset().await.is_err()
        {
            break;
        }
        prev = next;
    }
}

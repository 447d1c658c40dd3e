use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facemood::{bootstrap, config, sink::ConsoleSink, source::ImageFileSource};
use facemood_vision::{Camera, RunSummary, StopHandle};
use log::info;

#[derive(Parser)]
#[command(name = "facemood")]
#[command(
    version,
    about = "Real-time facial expression recognition from a camera feed"
)]
struct Cli {
    /// Config file (defaults to the system config path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the expression of the primary face in the live camera feed
    Run {
        /// Stop after this many frames
        #[arg(short, long)]
        frames: Option<u64>,
        /// Write annotated frames into this directory
        #[arg(short, long)]
        save_dir: Option<PathBuf>,
    },
    /// Classify still images
    Classify {
        /// Image files, processed in order
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Write annotated copies into this directory
        #[arg(short, long)]
        save_dir: Option<PathBuf>,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { frames, save_dir } => run(&cfg, frames, save_dir),
        Commands::Classify { images, save_dir } => classify(&cfg, images, save_dir),
        Commands::Config => open_config(cli.config),
    }
}

fn run(cfg: &config::Config, frames: Option<u64>, save_dir: Option<PathBuf>) -> Result<()> {
    let mut pipeline = bootstrap::build_pipeline(cfg)?;

    info!("Opening camera: {}", cfg.camera);
    let mut camera = Camera::open(&cfg.camera).context("Failed to open camera")?;
    if let Some(limit) = frames {
        camera = camera.with_limit(limit);
    }

    stop_on_interrupt(camera.stop_handle())?;
    info!("Camera opened. Capturing frames...");
    info!("Press Ctrl+C to stop.");

    let mut sink = ConsoleSink::new(save_dir);
    let summary = pipeline.run(&mut camera, &mut sink)?;
    report(&summary);
    Ok(())
}

/// Ctrl+C stops the camera; the frame being processed still gets emitted
/// and the run summary is printed.
fn stop_on_interrupt(handle: StopHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        if handle.is_stopped() {
            std::process::exit(130);
        }
        info!("Stopping after the current frame (Ctrl+C again to quit now)");
        handle.stop();
    })
    .context("Failed to install Ctrl+C handler")
}

fn classify(cfg: &config::Config, images: Vec<PathBuf>, save_dir: Option<PathBuf>) -> Result<()> {
    let mut pipeline = bootstrap::build_pipeline(cfg)?;
    let mut source = ImageFileSource::new(images);
    let mut sink = ConsoleSink::new(save_dir);
    let summary = pipeline.run(&mut source, &mut sink)?;
    report(&summary);
    if summary.classified == 0 {
        anyhow::bail!("No face could be classified in the given images");
    }
    Ok(())
}

fn report(summary: &RunSummary) {
    info!(
        "{} frame(s): {} classified, {} without face, {} failed, {} unreadable",
        summary.ticks, summary.classified, summary.no_face, summary.failed, summary.source_failures
    );
}

fn open_config(path: Option<PathBuf>) -> Result<()> {
    let config_path = path.unwrap_or_else(|| config::CONFIG_PATH.to_path_buf());
    if !config_path.exists() {
        config::save_config(&config::Config::default(), Some(&config_path))
            .context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}

//! `daq-camera`: drive the simulated camera from the command line.
//!
//! ```bash
//! daq-camera info
//! daq-camera snap --exposure 0.02 --gain 2
//! daq-camera live --frames 10
//! daq-camera check --json
//! RUST_LOG=daq_camera=debug daq-camera --config config/camera.toml snap
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use daq_camera::config::{camera_config::DEFAULT_CONFIG_PATH, DaqCameraConfig};
use daq_camera::poll::{collect_live, snap, PollOptions};
use daq_camera::testing::check_conformance;
use daq_camera::{Camera, SimulatedCamera};

#[derive(Parser)]
#[command(name = "daq-camera")]
#[command(version)]
#[command(about = "Camera capability contract tools", long_about = None)]
struct Cli {
    /// Configuration file (missing file falls back to defaults)
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Polling timeout in seconds
    #[arg(long, global = true, default_value_t = 10.0)]
    timeout: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show camera identity and current settings
    Info,

    /// Acquire a single frame and print its statistics
    Snap {
        /// Exposure time in seconds
        #[arg(short, long)]
        exposure: Option<f64>,

        /// Gain
        #[arg(short, long)]
        gain: Option<f64>,
    },

    /// Stream frames in live mode and print per-frame statistics
    Live {
        /// Number of frames to collect
        #[arg(short, long, default_value_t = 5)]
        frames: usize,
    },

    /// Run the conformance checks against the configured camera
    Check,

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = DaqCameraConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("daq_camera={}", config.application.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(application = %config.application.name, "configuration loaded");

    let camera = SimulatedCamera::from_config(&config.camera).context("building simulated camera")?;
    let options = PollOptions::default().with_timeout(
        Duration::try_from_secs_f64(cli.timeout).context("--timeout must be a non-negative number")?,
    );

    match cli.command {
        Commands::Info => {
            let (width, height) = camera.size().as_tuple();
            if cli.json {
                let value = json!({
                    "name": camera.name(),
                    "width": width,
                    "height": height,
                    "exposure_s": camera.exposure(),
                    "gain": camera.gain(),
                    "supports_live_acquisition": camera.supports_live_acquisition(),
                    "ready": camera.is_ready(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Name:     {}", camera.name());
                println!("Size:     {}x{}", width, height);
                println!("Exposure: {} s", camera.exposure());
                println!("Gain:     {}", camera.gain());
                println!("Live:     {}", camera.supports_live_acquisition());
                println!("Ready:    {}", camera.is_ready());
            }
        }

        Commands::Snap { exposure, gain } => {
            if let Some(seconds) = exposure {
                let applied = camera.set_exposure(seconds)?;
                info!(requested = seconds, applied, "exposure set");
            }
            if let Some(gain) = gain {
                let applied = camera.set_gain(gain)?;
                info!(requested = gain, applied, "gain set");
            }

            let frame = snap(&camera, &options).await?;
            let stats = frame.stats();
            if cli.json {
                let value = json!({ "metadata": frame.metadata, "stats": stats });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "Frame #{} ({}) exposure {} s gain {}",
                    frame.metadata.frame_number,
                    frame.size(),
                    frame.metadata.exposure_s,
                    frame.metadata.gain
                );
                println!("min {:.0}  max {:.0}  mean {:.1}", stats.min, stats.max, stats.mean);
            }
        }

        Commands::Live { frames } => {
            let collected = collect_live(&camera, frames, &options).await?;
            if cli.json {
                let rows: Vec<_> = collected
                    .iter()
                    .map(|f| json!({ "frame_number": f.metadata.frame_number, "stats": f.stats() }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for frame in &collected {
                    let stats = frame.stats();
                    println!(
                        "Frame #{:<6} min {:.0}  max {:.0}  mean {:.1}",
                        frame.metadata.frame_number, stats.min, stats.max, stats.mean
                    );
                }
            }
        }

        Commands::Check => {
            let report = check_conformance(&camera);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.to_markdown());
            }
            if !report.passed() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

use anyhow::{bail, Context, Result};
use clap::Parser;
use opencv::{
    core::Size,
    highgui,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::{fs, path::PathBuf};
use tracing::{info, warn};

use autoflow::{config::Config, counting::SessionState, gis, processor::FrameProcessor};

/// Gate-line vehicle counting over video footage.
#[derive(Parser)]
#[command(name = "autoflow", about = "Count vehicles crossing a gate line in video footage")]
struct Args {
    /// Input video file
    #[arg(short, long, required = true)]
    input: PathBuf,

    /// Path to configuration file (JSON); defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Annotated video output path (mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the simulated heatmap as GeoJSON to this path when done
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Override the detector weights from the config
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Override the detection confidence threshold
    #[arg(long)]
    confidence: Option<f32>,

    /// Override the gate line position (fraction of frame height)
    #[arg(long)]
    line: Option<f32>,

    /// Run without a preview window
    #[arg(long)]
    headless: bool,

    /// Log a count summary every N frames
    #[arg(long, default_value_t = 30)]
    summary_interval: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => Config::from_file(&path.to_string_lossy())
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(weights) = &args.weights {
        cfg.model_path = weights.to_string_lossy().to_string();
    }
    if let Some(confidence) = args.confidence {
        cfg.conf_threshold = confidence;
    }
    if let Some(line) = args.line {
        cfg.line_fraction = line;
    }
    if !(0.0..=1.0).contains(&cfg.line_fraction) {
        bail!(
            "gate line fraction {} is outside [0, 1]",
            cfg.line_fraction
        );
    }

    let source = args.input.to_string_lossy().to_string();
    let mut cap = VideoCapture::from_file(&source, videoio::CAP_ANY)
        .with_context(|| format!("failed to open {}", source))?;
    if !cap.is_opened()? {
        bail!("failed to open video file: {}", source);
    }

    let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
    let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
    let total_frames = cap.get(videoio::CAP_PROP_FRAME_COUNT)? as i64;
    let fps = cap.get(videoio::CAP_PROP_FPS)?;
    info!(width, height, total_frames, fps, "opened {}", source);

    let mut writer = match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let fourcc = VideoWriter::fourcc('a', 'v', 'c', '1')?;
            let writer = VideoWriter::new(
                &path.to_string_lossy(),
                fourcc,
                fps,
                Size::new(width, height),
                true,
            )?;
            if !writer.is_opened()? {
                bail!("failed to open video writer at {}", path.display());
            }
            Some(writer)
        }
        None => None,
    };

    let window_name = "autoflow";
    let mut display_enabled = !args.headless;
    if display_enabled {
        if let Err(err) = highgui::named_window(window_name, highgui::WINDOW_AUTOSIZE) {
            warn!("failed to open display window: {}. Running headless.", err);
            display_enabled = false;
        }
    }

    let mut processor = FrameProcessor::from_config(&cfg)?;
    // Fresh aggregates for this video; nothing leaks in from earlier runs.
    let mut session = SessionState::new();

    let mut frame = Mat::default();
    let mut frame_index: u64 = 0;

    loop {
        if !cap.read(&mut frame)? {
            break;
        }
        if frame.empty() {
            break;
        }
        frame_index += 1;

        let report = processor.process(&frame, &mut session)?;

        if let Some(writer) = writer.as_mut() {
            writer.write(&report.annotated)?;
        }

        if display_enabled {
            highgui::imshow(window_name, &report.annotated)?;
            let key = highgui::wait_key(1)?;
            if key == 27 || key == 113 {
                info!("stopped by user at frame {}", frame_index);
                break;
            }
        }

        if frame_index % args.summary_interval == 0 {
            info!(
                frame = frame_index,
                total = session.counts.total(),
                counted_ids = session.counted_ids.len(),
                "progress"
            );
        }
    }

    info!("processed {} frames", frame_index);
    for (key, value) in session.counts.iter() {
        info!("{}: {}", key, value);
    }
    info!("total: {}", session.counts.total());

    if let Some(path) = &args.geojson {
        let mut rng = rand::thread_rng();
        let points = gis::simulate_heatmap(
            &session.counts,
            (cfg.sensor_lat, cfg.sensor_lon),
            cfg.sensor_spread,
            cfg.ghost_points,
            &mut rng,
        )?;
        let doc = gis::to_geojson(&session.counts, &points, (cfg.sensor_lat, cfg.sensor_lon))?;
        fs::write(path, doc)
            .with_context(|| format!("failed to write GeoJSON to {}", path.display()))?;
        info!(points = points.len(), "wrote heatmap GeoJSON to {}", path.display());
    }

    Ok(())
}

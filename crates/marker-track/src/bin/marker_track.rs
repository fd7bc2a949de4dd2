//! marker-track CLI: run the tracker over still images, or render a synthetic
//! marker scene to try it on.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use marker_track::camera::synthetic::{demo_cells, render_marker, MarkerScene};
use marker_track::camera::{CameraModel, CameraParams, DEFAULT_LUT_OFFSET};
use marker_track::core::{FrameView, PixelFormat, Timestamp};
use marker_track::pattern::{Pattern, PatternId};
use marker_track::{TrackerConfig, TrackingSession};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "marker-track")]
#[command(about = "Track a square fiducial marker and print its pose")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines (requires the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process image files as consecutive frames; one JSON report per line.
    Track(TrackArgs),

    /// Write a frontal synthetic marker scene and the matching pattern file.
    Render(RenderArgs),
}

#[derive(Debug, Clone, Args)]
struct TrackArgs {
    /// Tracker configuration (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Report translations in metres instead of calibration units.
    #[arg(long)]
    meters: bool,

    /// Input images, processed in order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct RenderArgs {
    /// Camera calibration (JSON or binary .dat).
    #[arg(long)]
    calibration: PathBuf,

    /// Where to write the pattern file.
    #[arg(long)]
    pattern: PathBuf,

    /// Where to write the rendered image.
    #[arg(long)]
    output: PathBuf,

    /// Marker distance from the camera, calibration units.
    #[arg(long, default_value_t = 400.0)]
    distance: f64,

    /// Marker side length, calibration units.
    #[arg(long, default_value_t = 80.0)]
    width: f64,

    /// Pattern cells per side.
    #[arg(long, default_value_t = 16)]
    cells: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let result = match cli.command {
        Commands::Track(args) => run_track(&args),
        Commands::Render(args) => run_render(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(_verbose: u8, json: bool) {
    let _ = tracing_log::LogTracer::init();
    marker_track::core::init_tracing(json);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let _ = marker_track::core::init_with_level(level);
    if json {
        log::warn!("--log-json needs the `tracing` feature; using plain logs");
    }
}

// ── track ─────────────────────────────────────────────────────────────

fn run_track(args: &TrackArgs) -> CliResult<()> {
    let config = TrackerConfig::load_json(&args.config)?;
    let mut session = TrackingSession::from_config(&config)?;
    let format = config.pixel_format;

    for path in &args.images {
        let (pixels, width, height) = load_frame(path, format)?;
        let frame = FrameView::new(&pixels, width, height, format)?;
        let report = session.process(&frame, now())?;
        let report = if args.meters {
            report.in_meters()
        } else {
            report
        };
        log::debug!("{}: found = {}", path.display(), report.found);
        println!("{}", serde_json::to_string(&report)?);
    }

    session.shutdown();
    Ok(())
}

fn load_frame(path: &Path, format: PixelFormat) -> CliResult<(Vec<u8>, usize, usize)> {
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let pixels = match format {
        PixelFormat::Gray => img.to_luma8().into_raw(),
        PixelFormat::Rgb => img.to_rgb8().into_raw(),
        PixelFormat::Rgba => img.to_rgba8().into_raw(),
        PixelFormat::Bgr => {
            let mut raw = img.to_rgb8().into_raw();
            raw.chunks_exact_mut(3).for_each(|px| px.swap(0, 2));
            raw
        }
        PixelFormat::Bgra => {
            let mut raw = img.to_rgba8().into_raw();
            raw.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
            raw
        }
    };
    Ok((pixels, w, h))
}

fn now() -> Timestamp {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Timestamp::new(elapsed.as_secs() as i64, elapsed.subsec_micros() as i32)
}

// ── render ────────────────────────────────────────────────────────────

fn run_render(args: &RenderArgs) -> CliResult<()> {
    let params = CameraParams::load(&args.calibration)?;
    let camera = CameraModel::new(params, DEFAULT_LUT_OFFSET)?;

    let cells = demo_cells(args.cells);
    let pattern = Pattern::from_gray(PatternId(0), args.cells, &cells, args.width)?;
    fs::write(&args.pattern, pattern.to_pattern_string())?;

    let scene = MarkerScene::frontal(&cells, args.cells, args.width, args.distance);
    let gray = render_marker(&camera, &scene);
    let img = image::GrayImage::from_raw(gray.width as u32, gray.height as u32, gray.data)
        .ok_or("rendered buffer does not match its dimensions")?;
    img.save(&args.output)?;

    log::info!(
        "rendered {}x{} scene to {}, pattern to {}",
        camera.width(),
        camera.height(),
        args.output.display(),
        args.pattern.display()
    );
    Ok(())
}

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use framelab::adjust::{self, StillImagePipeline};
use framelab::config::Config;
use framelab::live::capture;
use framelab::live::display::{Display, HeadlessDisplay, KeyScript};
use framelab::live::modes::FilterOptions;
use framelab::live::LiveSession;
use framelab::text::TextRenderer;

#[derive(Parser)]
#[command(name = "framelab")]
#[command(about = "Still-image adjustments and live video filters")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the adjustment sequence on one image and write every stage
    Still(StillArgs),
    /// Filter frames from a stream or frame directory
    Live(LiveArgs),
}

#[derive(Args)]
struct StillArgs {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: Option<PathBuf>,

    /// Directory for the output images
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Fixed brightness coefficient instead of a random one
    #[arg(long)]
    coefficient: Option<f32>,

    /// Seed for watermark placement, coefficient and noise
    #[arg(long)]
    seed: Option<u64>,

    /// Do not write histogram charts
    #[arg(long)]
    no_histograms: bool,

    /// Also write normalized, equalized and auto-gamma images
    #[arg(long)]
    extras: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

#[derive(Args)]
struct LiveArgs {
    /// MJPEG stream URL or directory of frames
    #[arg(long, value_name = "URL|DIR")]
    source: Option<String>,

    /// Scripted keys for headless runs, e.g. "0:1,30:5,60:q"
    #[arg(long, value_name = "SCRIPT")]
    keys: Option<String>,

    /// Write displayed frames to this directory
    #[arg(long, value_name = "DIR")]
    dump_dir: Option<PathBuf>,

    /// Show frames in a window
    #[arg(long)]
    window: bool,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let level = if args.verbose { "debug" } else { config.logging.level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.parse().unwrap_or_default()),
        )
        .init();

    match args.command {
        Command::Still(still) => run_still(config, still, args.verbose),
        Command::Live(live) => run_live(config, live),
    }
}

fn run_still(mut config: Config, args: StillArgs, verbose: bool) -> anyhow::Result<()> {
    if let Some(c) = args.coefficient {
        config.brightness.coefficient = Some(c);
    }
    let input = args.image_path.unwrap_or_else(|| config.still.input.clone());
    let out_dir = args.out_dir.unwrap_or_else(|| config.still.output_dir.clone());
    let histograms = config.still.histograms && !args.no_histograms;
    let seed = args.seed.or(config.still.seed).unwrap_or_else(rand::random);
    info!(input = %input.display(), seed, "starting still pipeline");

    if verbose {
        println!("Loading image: {:?}", input);
    }
    let img = adjust::load_image(&input)?;
    if verbose {
        println!("Image loaded: {}x{}\n", img.width(), img.height());
    }

    let renderer = TextRenderer::discover(config.watermark.font.as_deref())?;
    let mut still = StillImagePipeline::from_config(&config, seed, Some(renderer))?
        .with_verbose(verbose)
        .with_extras(config.still.extra_outputs || args.extras);
    if let Some(debug_dir) = args.debug_out {
        still = still.with_debug(debug_dir)?;
    }

    let run = still.run(img)?;

    println!("\n=== Grayscale Image ===");
    println!("{}", run.stats);
    println!("Brightness coefficient (c): {:.2}", run.coefficient);
    println!("Correction applied: {}", run.correction.as_str());
    if let Some(origin) = run.watermark {
        println!("Watermark position: ({}, {})", origin.x, origin.y);
    }

    let written = adjust::save_outputs(&run, &out_dir, histograms)?;
    println!("\nWrote {} files to {}:", written.len(), out_dir.display());
    for path in &written {
        println!("  {}", path.display());
    }

    Ok(())
}

fn run_live(config: Config, args: LiveArgs) -> anyhow::Result<()> {
    let source_arg = args.source.unwrap_or_else(|| config.live.source.clone());
    let source = capture::open_source(&source_arg)?;

    let display: Box<dyn Display> = if args.window {
        open_window()?
    } else {
        let keys: KeyScript = args.keys.as_deref().unwrap_or("").parse()?;
        let mut headless = HeadlessDisplay::new(keys);
        if let Some(dir) = args.dump_dir {
            headless = headless.with_dump_dir(dir, config.live.dump_every)?;
        }
        Box::new(headless)
    };

    let renderer = TextRenderer::discover(config.live.font.as_deref())?;
    let mut session = LiveSession::new(source, display, FilterOptions::from(&config.live))
        .with_renderer(Some(renderer))
        .with_max_frames(args.max_frames);

    let summary = session.run()?;
    info!(frames = summary.frames, mode = summary.final_mode.name(), "live session ended");
    Ok(())
}

#[cfg(feature = "window")]
fn open_window() -> anyhow::Result<Box<dyn Display>> {
    Ok(Box::new(framelab::live::display::WindowDisplay::new()))
}

#[cfg(not(feature = "window"))]
fn open_window() -> anyhow::Result<Box<dyn Display>> {
    anyhow::bail!("window display not available; rebuild with --features window")
}

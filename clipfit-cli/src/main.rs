use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use clipfit_core::{FfmpegCli, NormalizeOptions, check_ffmpeg, convert_gifs, normalize};

#[derive(Parser, Debug)]
#[command(name = "clipfit")]
#[command(about = "Prepare comparison-gallery videos: convert GIFs to MP4 and match clip durations")]
#[command(version)]
struct Args {
    /// Pipeline to run (defaults to `normalize` with default settings)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show a progress bar for each encode
    #[arg(long, global = true)]
    progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-time every category video to the reference video's duration
    Normalize(NormalizeOptions),

    /// Convert every GIF under ROOT (recursively) to an MP4 next to it
    GifToMp4 {
        /// Folder to search for GIF files
        root: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    // Check FFmpeg availability
    match check_ffmpeg() {
        Ok(version) => {
            log::info!("FFmpeg version {} detected", version);
        }
        Err(e) => {
            eprintln!("Error: FFmpeg not found!");
            eprintln!("Please install FFmpeg (which provides ffprobe) to use this tool.");
            eprintln!();
            eprintln!("Installation instructions:");
            eprintln!("  Ubuntu/Debian: sudo apt install ffmpeg");
            eprintln!("  macOS:         brew install ffmpeg");
            eprintln!("  Windows:       Download from https://ffmpeg.org/download.html");
            eprintln!();
            eprintln!("Details: {}", e);
            std::process::exit(1);
        }
    }

    let backend = FfmpegCli::new().show_progress(args.progress);

    match args.command {
        Some(Commands::GifToMp4 { root }) => {
            if !root.is_dir() {
                anyhow::bail!("Input folder does not exist: {:?}", root);
            }

            let summary = convert_gifs(&backend, &root)
                .with_context(|| format!("Failed to convert GIFs under {:?}", root))?;

            if summary.total == 0 {
                println!("\n❌ No GIF files found under {:?}", root);
            } else {
                println!(
                    "\n📊 Conversion result: {} succeeded / {} failed",
                    summary.succeeded, summary.failed
                );
            }
        }
        Some(Commands::Normalize(options)) => run_normalize(&backend, &options)?,
        None => run_normalize(&backend, &NormalizeOptions::default())?,
    }

    Ok(())
}

fn run_normalize(backend: &FfmpegCli, options: &NormalizeOptions) -> Result<()> {
    log::info!("Base directory: {:?}", options.base_dir);

    let Some(report) = normalize(backend, options).context("Normalization failed")? else {
        println!("\n❌ No reference video ({}) found", options.reference);
        return Ok(());
    };

    println!(
        "\n📏 Reference duration: {:.2}s ({})",
        report.reference_duration,
        report.reference.display()
    );
    println!(
        "✅ {} adjusted ({} re-timed), ❌ {} failed",
        report.succeeded, report.retimed, report.failed
    );
    if !report.skipped_folders.is_empty() {
        log::info!("Skipped folders: {}", report.skipped_folders.join(", "));
    }

    Ok(())
}

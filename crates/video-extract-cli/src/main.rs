//! Slide Extract CLI - turns a lecture-style recording into a slide deck.
//!
//! Command-line front end for the four-stage slide-extraction pipeline:
//! locate the slide region, produce a lightweight analysis video, funnel it
//! down to the unique slide timestamps, then capture high-resolution
//! stills and assemble them into a PPTX — with an optional, isolated
//! external-transcription pass alongside it.

use anyhow::{Context as _, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use slide_extract_common::{Job, PipelineConfig};
use slide_extract_pipeline::process;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "slide-extract",
    version,
    about = "Extract a slide deck (and optionally a transcript) from a lecture recording",
    after_help = "EXAMPLES:\n  \
                  slide-extract lecture.mp4 --output-root ./out\n  \
                  slide-extract lecture.mp4 --output-root ./out --transcribe\n  \
                  slide-extract lecture.mp4 --output-root ./out --no-slides --transcribe"
)]
struct Cli {
    /// Source video to process
    source_video_path: PathBuf,

    /// Directory under which `<job_id>/` output is written
    #[arg(long, default_value = "./output")]
    output_root: PathBuf,

    /// Directory under which `<job_id>/` scratch files are written and
    /// removed on completion
    #[arg(long, default_value = "./scratch")]
    scratch_root: PathBuf,

    /// Opaque job id; a `job-<uuid>` id is generated when omitted
    #[arg(long)]
    job_id: Option<String>,

    /// Skip slide extraction (ROI → transcode → funnel → capture → PPTX)
    #[arg(long)]
    no_slides: bool,

    /// Also run the external transcription module
    #[arg(long)]
    transcribe: bool,

    /// L1 scene-change MAD threshold
    #[arg(long)]
    diff_threshold: Option<f64>,

    /// L2 minimum scene duration to keep, in seconds
    #[arg(long)]
    min_scene_duration: Option<f64>,

    /// L1/L2 sampling interval, in seconds
    #[arg(long)]
    sample_interval: Option<f64>,

    /// L3 Gestalt similarity threshold above which a candidate is a duplicate
    #[arg(long)]
    similarity_threshold: Option<f64>,

    /// Lightweight transcode target width, in pixels
    #[arg(long)]
    lightweight_width: Option<u32>,

    /// Lightweight transcode target frame rate
    #[arg(long)]
    lightweight_fps: Option<f64>,

    /// OCR language code(s), e.g. "eng" or "eng+fra"
    #[arg(long)]
    ocr_language: Option<String>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            diff_threshold: self.diff_threshold.unwrap_or(defaults.diff_threshold),
            min_scene_duration: self.min_scene_duration.unwrap_or(defaults.min_scene_duration),
            sample_interval: self.sample_interval.unwrap_or(defaults.sample_interval),
            similarity_threshold: self
                .similarity_threshold
                .unwrap_or(defaults.similarity_threshold),
            lightweight_width: self.lightweight_width.unwrap_or(defaults.lightweight_width),
            lightweight_fps: self.lightweight_fps.unwrap_or(defaults.lightweight_fps),
            ocr_language: self.ocr_language.clone().unwrap_or(defaults.ocr_language),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure Rayon's global thread pool from an environment variable,
    // so tests (and constrained deployments) can cap parallelism without
    // a CLI flag round-trip.
    if let Ok(threads_str) = std::env::var("SLIDE_EXTRACT_THREADS") {
        if let Ok(num_threads) = threads_str.parse::<usize>() {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .ok(); // Ignore error if already initialized.
        }
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let job_id = cli.job_id.clone().unwrap_or_else(|| format!("job-{}", uuid::Uuid::new_v4()));
    let job = Job {
        id: job_id,
        source_video_path: cli.source_video_path.clone(),
        output_root: cli.output_root.clone(),
        scratch_root: cli.scratch_root.clone(),
        enable_slide_extraction: !cli.no_slides,
        enable_transcription: cli.transcribe,
    };
    let config = cli.pipeline_config();

    let outcome = tokio::task::spawn_blocking(move || {
        let mut progress = |percent: i32, message: &str| {
            tracing::info!(percent, message, "progress");
        };
        process(&job, &config, &mut progress)
    })
    .await
    .context("pipeline task panicked")?;

    match outcome {
        Ok(outcome) => {
            if let Some(path) = &outcome.slide_pptx_path {
                println!("slides: {} ({} slides)", path.display(), outcome.slide_count);
            }
            if let Some(path) = &outcome.transcript_path {
                println!("transcript: {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("slide-extract: {e}");
            std::process::exit(1);
        }
    }
}

//! Top-level pipeline entry point (§5, §6): ROI Locator → Lightweight
//! Transcoder → Funnel Analyzer (L1+L2 → L3) → High-Resolution Capture +
//! PPTX Assembly, plus the optional, isolated External Transcription
//! Module. A single job runs its stages strictly in sequence on the
//! calling thread; concurrency, where it exists, lives inside individual
//! stage kernels (§5 "Parallelism inside stages").

use slide_extract_common::{
    progress_ranges, scale_progress, BestShot, ErrorKind, Job, PipelineConfig, ProcessingError,
    ProgressReporter, SlideTimestamp,
};
use slide_extract_ocr::dedup::SemanticDedup;
use slide_extract_ocr::{OCRConfig, OCRDetector};
use slide_extract_scene::SceneFunnelConfig;
use slide_extract_transcode::TranscodeRequest;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Path to the locally installed Whisper model, used by the External
/// Transcription Module (§4.5). Overridable for deployments that keep
/// models outside the default `models/` directory — mirrors the teacher's
/// own `orchestrator` crate, which hardcodes this same relative path.
const DEFAULT_WHISPER_MODEL_PATH: &str = "models/ggml-base.bin";
const WHISPER_MODEL_PATH_ENV: &str = "SLIDE_EXTRACT_WHISPER_MODEL";

/// Errors the top-level entry point can return — every stage error is
/// collapsed into one of these short, user-visible variants (§7).
#[derive(Debug, Error)]
pub enum JobError {
    #[error("unable to locate slide region")]
    RoiNotFound,

    #[error("video encoding unavailable: {0}")]
    EncodingUnavailable(String),

    #[error("no recognizable slide content")]
    NoSlideContent,

    #[error("stage failed: {0}")]
    Stage(#[from] ProcessingError),

    #[error("no deliverable was produced")]
    NoOutputProduced,
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        JobError::Stage(ProcessingError::from(e))
    }
}

impl JobError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::RoiNotFound | JobError::NoSlideContent | JobError::NoOutputProduced => {
                ErrorKind::Input
            }
            JobError::EncodingUnavailable(_) => ErrorKind::Environment,
            JobError::Stage(inner) => inner.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;

/// What `process` produced — whichever of the two deliverables were
/// requested and actually materialized.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub slide_pptx_path: Option<PathBuf>,
    pub slide_count: usize,
    pub transcript_path: Option<PathBuf>,
}

/// Runs the whole pipeline for `job` under `config`, reporting progress
/// through `progress` (§6). Blocks for the entire run.
///
/// # Errors
/// Returns [`JobError`] if neither requested deliverable could be produced,
/// or if a terminal stage failure (ROI not found, encoding unavailable)
/// occurs within slide extraction.
pub fn process(
    job: &Job,
    config: &PipelineConfig,
    progress: &mut dyn ProgressReporter,
) -> Result<ProcessOutcome> {
    std::fs::create_dir_all(job.scratch_dir())?;
    let _scratch_guard = ScratchGuard { dir: job.scratch_dir() };
    std::fs::create_dir_all(job.job_dir())?;

    let plan = progress_ranges(job.enable_slide_extraction, job.enable_transcription);
    let mut outcome = ProcessOutcome::default();

    if let Some(range) = plan.slide_extraction {
        info!(job_id = %job.id, "starting slide extraction");
        match run_slide_extraction(job, config, range, progress) {
            Ok((pptx_path, count)) => {
                outcome.slide_pptx_path = pptx_path;
                outcome.slide_count = count;
            }
            Err(e) => {
                // A complete ROI/encoding failure is terminal only when
                // transcription was not also requested; otherwise fall
                // through and let transcription's own result decide.
                if plan.transcription.is_none() {
                    return Err(e);
                }
                warn!(error = %e, "slide extraction failed, falling back to transcription-only result");
            }
        }
    }

    if let Some(range) = plan.transcription {
        info!(job_id = %job.id, "starting external transcription");
        match run_transcription(job, range, progress) {
            Ok(path) => outcome.transcript_path = Some(path),
            Err(e) => warn!(error = %e, "transcription failed, isolated from slide extraction result"),
        }
    }

    if outcome.slide_count == 0 {
        outcome.slide_pptx_path = None;
    }
    if outcome.slide_pptx_path.is_none() && outcome.transcript_path.is_none() {
        return Err(JobError::NoOutputProduced);
    }

    progress.report(100, "job complete");
    Ok(outcome)
}

fn sub_range(outer: (i32, i32), lo_frac: f64, hi_frac: f64) -> (i32, i32) {
    (scale_progress(lo_frac, outer), scale_progress(hi_frac, outer))
}

fn run_slide_extraction(
    job: &Job,
    config: &PipelineConfig,
    range: (i32, i32),
    progress: &mut dyn ProgressReporter,
) -> Result<(Option<PathBuf>, usize)> {
    let debug_dir = job.debug_images_dir();
    std::fs::create_dir_all(&debug_dir)?;

    progress.report(scale_progress(0.0, range), "locating slide region");
    let roi = slide_extract_roi::locate_roi(&job.source_video_path, Some(&debug_dir))
        .map_err(|_| JobError::RoiNotFound)?;

    let duration = slide_extract_decoder::probe_duration(&job.source_video_path)?;

    let transcode_range = sub_range(range, 0.05, 0.55);
    let lightweight_path = job.lightweight_video_path();
    let request = TranscodeRequest {
        source_video_path: &job.source_video_path,
        output_path: &lightweight_path,
        roi,
        target_width: config.lightweight_width,
        target_fps: config.lightweight_fps,
        source_duration: duration,
    };
    let mut transcode_progress = ScopedProgress { inner: &mut *progress, range: transcode_range };
    slide_extract_transcode::transcode_lightweight(&request, &mut transcode_progress)
        .map_err(|e| JobError::EncodingUnavailable(e.to_string()))?;

    progress.report(scale_progress(0.6, range), "analyzing slide candidates");
    let slide_timestamps = run_funnel_analyzer(&lightweight_path, config)?;

    progress.report(scale_progress(0.85, range), "capturing high-resolution stills");
    let targets: Vec<slide_extract_capture::CaptureTarget> = slide_timestamps
        .iter()
        .enumerate()
        .map(|(index, s)| slide_extract_capture::CaptureTarget { index, timestamp: s.timestamp })
        .collect();

    // A video shorter than `min_scene_duration`, or one where every scene
    // is rejected, legitimately produces zero candidate timestamps (§8
    // boundary behavior) — that is not itself a stage failure; whether the
    // overall job fails is decided once transcription's result is known.
    if targets.is_empty() {
        return Ok((None, 0));
    }

    let stills = slide_extract_capture::capture_stills(
        &job.source_video_path,
        &targets,
        Some(roi),
        &job.ppt_images_dir(),
    )
    .map_err(|_| JobError::NoSlideContent)?;

    let pptx_path = job.pptx_path();
    slide_extract_capture::pptx::build_pptx(&stills, &pptx_path)?;

    progress.report(scale_progress(1.0, range), "slide extraction complete");
    Ok((Some(pptx_path), stills.len()))
}

/// Streams the lightweight video through L1+L2 (scene boundary + sharpest
/// frame per scene) and L3 (semantic dedup against OCR text), yielding the
/// ordered list of retained slide timestamps.
fn run_funnel_analyzer(
    lightweight_path: &Path,
    config: &PipelineConfig,
) -> Result<Vec<SlideTimestamp>> {
    let rx = slide_extract_decoder::stream_luminance(lightweight_path.to_path_buf());
    let funnel = slide_extract_scene::best_shot_funnel(
        rx,
        SceneFunnelConfig {
            diff_threshold: config.diff_threshold,
            min_scene_duration: config.min_scene_duration,
            sample_interval: config.sample_interval,
        },
    )?;

    let ocr_config = OCRConfig { language: config.ocr_language.clone(), ..OCRConfig::default() };
    let ocr = OCRDetector::new(ocr_config).map_err(|e| {
        JobError::Stage(ProcessingError::Other(format!("OCR engine init failed: {e}")))
    })?;
    let mut dedup = SemanticDedup::new(config.similarity_threshold);

    let mut slide_timestamps = Vec::new();
    for shot in funnel {
        let shot: BestShot = shot?;
        let frame = match slide_extract_keyframe::materialize_best_shot(lightweight_path, &shot) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(timestamp = shot.timestamp, error = %e, "skipping best shot, could not materialize frame");
                continue;
            }
        };

        let text = match ocr.extract_page_text(&frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(timestamp = shot.timestamp, error = %e, "skipping best shot, OCR failed");
                continue;
            }
        };

        if dedup.should_retain(&text) {
            slide_timestamps.push(SlideTimestamp { timestamp: shot.timestamp, ocr_text: text });
        }
    }

    Ok(slide_timestamps)
}

fn run_transcription(job: &Job, range: (i32, i32), progress: &mut dyn ProgressReporter) -> Result<PathBuf> {
    progress.report(scale_progress(0.0, range), "extracting audio");
    let audio_path = job.scratch_dir().join(format!("{}_audio", job.id));
    let audio_config = slide_extract_audio::AudioConfig::for_ml();
    let audio_path = slide_extract_audio::extract_audio(&job.source_video_path, &audio_path, &audio_config)?;

    progress.report(scale_progress(0.3, range), "transcribing audio");
    let model_path = std::env::var(WHISPER_MODEL_PATH_ENV)
        .unwrap_or_else(|_| DEFAULT_WHISPER_MODEL_PATH.to_string());
    let transcriber = slide_extract_transcription::Transcriber::new(
        &model_path,
        slide_extract_transcription::TranscriptionConfig::fast(),
    )
    .map_err(|e| JobError::Stage(ProcessingError::Other(e.to_string())))?;

    let transcript = transcriber
        .transcribe(&audio_path)
        .map_err(|e| JobError::Stage(ProcessingError::Other(e.to_string())))?;

    progress.report(scale_progress(0.8, range), "correcting proper nouns");
    let corrected = correct_transcript(&transcript.text);

    std::fs::create_dir_all(job.transcripts_dir())?;
    let transcript_path = job.transcript_path();
    std::fs::write(&transcript_path, corrected)?;

    progress.report(scale_progress(1.0, range), "transcription complete");
    Ok(transcript_path)
}

/// Best-effort proper-noun correction pass (§4.5). Never fails the job:
/// any panic-free error path here just means the raw ASR text is kept.
fn correct_transcript(raw: &str) -> String {
    let dictionary = slide_extract_transcription::spellcheck::ProperNounDictionary::new();
    dictionary.correct_text(raw, 0.85)
}

/// Removes the per-job scratch directory on every exit path (§5 "Resource
/// policy"), including panics that unwind through `process`.
struct ScratchGuard {
    dir: PathBuf,
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), error = %e, "failed to clean up job scratch directory");
            }
        }
    }
}

/// Adapts the job-wide progress reporter into one that reports within a
/// sub-range, for stages (like the transcoder) that report their own
/// internal `[0, 100]` progress.
struct ScopedProgress<'a> {
    inner: &'a mut dyn ProgressReporter,
    range: (i32, i32),
}

impl ProgressReporter for ScopedProgress<'_> {
    fn report(&mut self, percent: i32, message: &str) {
        let fraction = f64::from(percent.clamp(0, 100)) / 100.0;
        self.inner.report(scale_progress(fraction, self.range), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_range_splits_outer_range() {
        assert_eq!(sub_range((0, 85), 0.05, 0.55), (4, 47));
    }

    #[test]
    fn test_scoped_progress_maps_into_outer_range() {
        let mut messages = Vec::new();
        {
            let mut outer = |percent: i32, message: &str| messages.push((percent, message.to_string()));
            let mut scoped = ScopedProgress { inner: &mut outer, range: (50, 100) };
            scoped.report(0, "start");
            scoped.report(100, "end");
        }
        assert_eq!(messages[0].0, 50);
        assert_eq!(messages[1].0, 100);
    }

    #[test]
    fn test_job_error_kinds() {
        assert_eq!(JobError::RoiNotFound.kind(), ErrorKind::Input);
        assert_eq!(JobError::NoSlideContent.kind(), ErrorKind::Input);
        assert_eq!(JobError::NoOutputProduced.kind(), ErrorKind::Input);
        assert_eq!(
            JobError::EncodingUnavailable("x".to_string()).kind(),
            ErrorKind::Environment
        );
    }

    #[test]
    fn test_scratch_guard_removes_directory_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let scratch_dir = base.path().join("job-123");
        std::fs::create_dir_all(&scratch_dir).unwrap();
        assert!(scratch_dir.exists());
        {
            let _guard = ScratchGuard { dir: scratch_dir.clone() };
        }
        assert!(!scratch_dir.exists());
    }
}

//! Shared types and utilities for the slide-extraction pipeline.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The five error kinds the pipeline distinguishes, independent of which
/// stage raised them. The pipeline-level `JobError` (see `pipeline` crate)
/// maps every stage error down to one of these before producing its
/// single user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// External tool missing, no GPU when one was required.
    Environment,
    /// Cannot open video, no audio track, no slide region locatable.
    Input,
    /// Hardware-encode failure, single-frame extraction failure — retryable or skippable.
    Transient,
    /// A stage produced no data where data was expected.
    Logic,
    /// Out-of-disk during write, panic in a kernel.
    Fatal,
}

/// Processing errors shared across every stage crate.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("no audio stream found")]
    NoAudioStream,

    #[error("no video stream found")]
    NoVideoStream,

    #[error("corrupted file: {0}")]
    CorruptedFile(String),

    #[error("gpu out of memory")]
    GpuOutOfMemory,

    #[error("processing timeout after {0}s")]
    Timeout(u64),

    #[error("ffmpeg error: {0}")]
    FFmpegError(String),

    #[error("external tool not found: {0}")]
    ToolMissing(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("image processing error: {0}")]
    ImageError(String),

    #[error("other error: {0}")]
    Other(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageError(err.to_string())
    }
}

impl ProcessingError {
    /// Classify this error into one of the five kinds from §7 of the design.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::ToolMissing(_) | ProcessingError::GpuOutOfMemory => {
                ErrorKind::Environment
            }
            ProcessingError::UnsupportedFormat(_)
            | ProcessingError::NoAudioStream
            | ProcessingError::NoVideoStream
            | ProcessingError::CorruptedFile(_) => ErrorKind::Input,
            ProcessingError::Timeout(_) | ProcessingError::FFmpegError(_) => ErrorKind::Transient,
            ProcessingError::ImageError(_) | ProcessingError::Other(_) => ErrorKind::Logic,
            ProcessingError::IoError(_) => ErrorKind::Fatal,
        }
    }
}

/// Result type for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Stream type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
}

/// Information about a single media stream, as reported by a metadata probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub stream_type: StreamType,
    pub codec: String,

    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,

    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

/// Complete media file information, as reported by a metadata probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub format: String,
    pub duration: f64,
    pub streams: Vec<StreamInfo>,
    pub metadata: HashMap<String, String>,
}

impl MediaInfo {
    #[must_use]
    pub fn video_stream(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.stream_type == StreamType::Video)
    }

    #[must_use]
    pub fn audio_stream(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.stream_type == StreamType::Audio)
    }

    #[must_use]
    pub fn has_video(&self) -> bool {
        self.video_stream().is_some()
    }

    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio_stream().is_some()
    }
}

/// Axis-aligned rectangle locating the slide region within a source frame
/// (§3 Data Model — ROI). Immutable once produced by the ROI locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Roi {
    /// Round `x, y, w, h` down to the nearest even number, per the
    /// transcoder's alignment invariant (§4.2), clamping `w, h` to at least 2.
    #[must_use]
    pub fn aligned_even(self) -> Self {
        let even_floor = |v: u32| v - (v % 2);
        Roi {
            x: even_floor(self.x),
            y: even_floor(self.y),
            w: even_floor(self.w).max(2),
            h: even_floor(self.h).max(2),
        }
    }

    /// True if this rectangle fits within a frame of the given dimensions.
    #[must_use]
    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.x + self.w <= frame_w && self.y + self.h <= frame_h
    }
}

/// The sharpest sampled frame within a physically stable scene (§3, §4.3 L1+L2).
#[derive(Debug, Clone, PartialEq)]
pub struct BestShot {
    pub timestamp: f64,
    pub sharpness: f64,
    pub scene_start_ts: f64,
    pub scene_end_ts: f64,
}

/// A retained, de-duplicated slide occurrence (§3, §4.3 L3).
#[derive(Debug, Clone, PartialEq)]
pub struct SlideTimestamp {
    pub timestamp: f64,
    pub ocr_text: String,
}

/// One rendered slide still, written to disk by High-Resolution Capture (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideImage {
    pub index: usize,
    pub path: PathBuf,
    pub timestamp: f64,
}

/// Tunable parameters for the pipeline, with the defaults from §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// L1 scene-change MAD threshold.
    pub diff_threshold: f64,
    /// L2 minimum scene duration to keep, in seconds.
    pub min_scene_duration: f64,
    /// L1/L2 analysis sampling interval, in seconds.
    pub sample_interval: f64,
    /// L3 Gestalt similarity threshold above which a candidate is a duplicate.
    pub similarity_threshold: f64,
    /// Lightweight transcode target width in pixels.
    pub lightweight_width: u32,
    /// Lightweight transcode target frame rate.
    pub lightweight_fps: f64,
    /// OCR language, passed through to the external OCR engine.
    pub ocr_language: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            diff_threshold: 0.08,
            min_scene_duration: 1.25,
            sample_interval: 0.2,
            similarity_threshold: 0.90,
            lightweight_width: 640,
            lightweight_fps: 5.0,
            ocr_language: "eng".to_string(),
        }
    }
}

/// A single pipeline run (§3 Data Model — Job).
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source_video_path: PathBuf,
    pub output_root: PathBuf,
    pub scratch_root: PathBuf,
    pub enable_slide_extraction: bool,
    pub enable_transcription: bool,
}

impl Job {
    #[must_use]
    pub fn job_dir(&self) -> PathBuf {
        self.output_root.join(&self.id)
    }

    #[must_use]
    pub fn debug_images_dir(&self) -> PathBuf {
        self.job_dir().join("debug_images")
    }

    #[must_use]
    pub fn ppt_images_dir(&self) -> PathBuf {
        self.job_dir().join("ppt_images")
    }

    #[must_use]
    pub fn ppt_output_dir(&self) -> PathBuf {
        self.job_dir().join("ppt_output")
    }

    #[must_use]
    pub fn transcripts_dir(&self) -> PathBuf {
        self.job_dir().join("transcripts")
    }

    #[must_use]
    pub fn pptx_path(&self) -> PathBuf {
        self.ppt_output_dir().join(format!("{}.pptx", self.id))
    }

    #[must_use]
    pub fn transcript_path(&self) -> PathBuf {
        self.transcripts_dir().join(format!("{}.txt", self.id))
    }

    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_root.join(&self.id)
    }

    #[must_use]
    pub fn lightweight_video_path(&self) -> PathBuf {
        self.scratch_dir().join(format!("{}_lightweight.mp4", self.id))
    }
}

/// A first-class progress callback, threaded through every stage
/// (§9 "Polymorphic progress callback"). Percent is in `[0, 100]`.
pub trait ProgressReporter: Send {
    fn report(&mut self, percent: i32, message: &str);
}

impl<F: FnMut(i32, &str) + Send> ProgressReporter for F {
    fn report(&mut self, percent: i32, message: &str) {
        self(percent, message)
    }
}

/// Splits the overall `[0, 100]` progress range into the sub-ranges each
/// enabled top-level stage gets, per §6: slide extraction gets `[0, 85]` and
/// transcription `[85, 100]` when both are enabled, else whichever is
/// enabled gets the full `[0, 100]`.
#[must_use]
pub fn progress_ranges(enable_slide_extraction: bool, enable_transcription: bool) -> ProgressPlan {
    match (enable_slide_extraction, enable_transcription) {
        (true, true) => ProgressPlan {
            slide_extraction: Some((0, 85)),
            transcription: Some((85, 100)),
        },
        (true, false) => ProgressPlan {
            slide_extraction: Some((0, 100)),
            transcription: None,
        },
        (false, true) => ProgressPlan {
            slide_extraction: None,
            transcription: Some((0, 100)),
        },
        (false, false) => ProgressPlan {
            slide_extraction: None,
            transcription: None,
        },
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressPlan {
    pub slide_extraction: Option<(i32, i32)>,
    pub transcription: Option<(i32, i32)>,
}

/// Maps a local fraction in `[0, 1]` to a percent within `(lo, hi)`, clamped.
#[must_use]
pub fn scale_progress(fraction: f64, range: (i32, i32)) -> i32 {
    let (lo, hi) = range;
    let span = f64::from(hi - lo);
    let pct = f64::from(lo) + fraction.clamp(0.0, 1.0) * span;
    pct.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_info_accessors() {
        let info = MediaInfo {
            format: "mp4".to_string(),
            duration: 10.0,
            streams: vec![
                StreamInfo {
                    stream_type: StreamType::Video,
                    codec: "h264".to_string(),
                    width: Some(1920),
                    height: Some(1080),
                    fps: Some(30.0),
                    sample_rate: None,
                    channels: None,
                },
                StreamInfo {
                    stream_type: StreamType::Audio,
                    codec: "aac".to_string(),
                    width: None,
                    height: None,
                    fps: None,
                    sample_rate: Some(48000),
                    channels: Some(2),
                },
            ],
            metadata: HashMap::new(),
        };

        assert!(info.has_video());
        assert!(info.has_audio());
        assert_eq!(info.video_stream().unwrap().codec, "h264");
        assert_eq!(info.audio_stream().unwrap().codec, "aac");
    }

    #[test]
    fn test_roi_alignment_rounds_down_and_clamps() {
        let roi = Roi { x: 5, y: 7, w: 3, h: 2 }.aligned_even();
        assert_eq!(roi, Roi { x: 4, y: 6, w: 2, h: 2 });
    }

    #[test]
    fn test_roi_fits_within() {
        let roi = Roi { x: 10, y: 10, w: 100, h: 50 };
        assert!(roi.fits_within(200, 200));
        assert!(!roi.fits_within(100, 200));
    }

    #[test]
    fn test_progress_ranges_both_enabled() {
        let plan = progress_ranges(true, true);
        assert_eq!(plan.slide_extraction, Some((0, 85)));
        assert_eq!(plan.transcription, Some((85, 100)));
    }

    #[test]
    fn test_progress_ranges_slide_only() {
        let plan = progress_ranges(true, false);
        assert_eq!(plan.slide_extraction, Some((0, 100)));
        assert_eq!(plan.transcription, None);
    }

    #[test]
    fn test_scale_progress_clamped() {
        assert_eq!(scale_progress(0.0, (0, 85)), 0);
        assert_eq!(scale_progress(1.0, (0, 85)), 85);
        assert_eq!(scale_progress(1.5, (85, 100)), 100);
        assert_eq!(scale_progress(0.5, (85, 100)), 93);
    }

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(ProcessingError::NoVideoStream.kind(), ErrorKind::Input);
        assert_eq!(ProcessingError::Timeout(5).kind(), ErrorKind::Transient);
        assert_eq!(
            ProcessingError::ToolMissing("ffmpeg".into()).kind(),
            ErrorKind::Environment
        );
    }
}

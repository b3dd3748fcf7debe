//! High-Resolution Capture (§4.4): for each retained slide timestamp,
//! extracts one full-resolution still from the **original** source video
//! (never the lightweight one) and assembles the resulting stills into a
//! PPTX container.
//!
//! The seek-and-extract step follows the same spawn/parse-stderr `ffmpeg`
//! subprocess idiom used by the transcoder and scene detector elsewhere in
//! this workspace; the PPTX assembler is a hand-written OOXML writer
//! grounded on the `zip`/`quick-xml` pairing this workspace's sibling
//! document-conversion project uses for other Office container formats.

pub mod pptx;

use slide_extract_common::{ProcessingError, Result, Roi};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// One timestamp retained by the Funnel Analyzer, ready for high-resolution
/// capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTarget {
    pub index: usize,
    pub timestamp: f64,
}

/// Extracts one full-resolution JPEG still per `target`, from `source_video_path`,
/// optionally cropped to `roi`, into `output_dir`. Targets are processed in
/// increasing timestamp order; a failure on one timestamp is logged and
/// skipped rather than aborting the remaining captures (§4.4 failure
/// semantics). Returns the stills that were actually written, in order.
///
/// # Errors
/// Returns [`ProcessingError::ToolMissing`] if `ffmpeg` cannot be found at
/// all, or [`ProcessingError::Other`] if every single capture failed.
pub fn capture_stills(
    source_video_path: &Path,
    targets: &[CaptureTarget],
    roi: Option<Roi>,
    output_dir: &Path,
) -> Result<Vec<CapturedStill>> {
    ensure_ffmpeg_available()?;
    std::fs::create_dir_all(output_dir)?;

    let mut ordered = targets.to_vec();
    ordered.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let mut stills = Vec::with_capacity(ordered.len());
    for target in &ordered {
        let file_name = format!("slide_{:04}_{:.3}s.jpg", target.index, target.timestamp);
        let output_path = output_dir.join(&file_name);

        match capture_one_still(source_video_path, target.timestamp, roi, &output_path) {
            Ok(()) => stills.push(CapturedStill {
                index: target.index,
                timestamp: target.timestamp,
                path: output_path,
            }),
            Err(e) => warn!(
                timestamp = target.timestamp,
                error = %e,
                "skipping high-resolution capture for this timestamp"
            ),
        }
    }

    if stills.is_empty() && !ordered.is_empty() {
        return Err(ProcessingError::Other(
            "high-resolution capture failed for every retained timestamp".to_string(),
        ));
    }

    Ok(stills)
}

/// A still written to disk by [`capture_stills`].
#[derive(Debug, Clone)]
pub struct CapturedStill {
    pub index: usize,
    pub timestamp: f64,
    pub path: PathBuf,
}

fn ensure_ffmpeg_available() -> Result<()> {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| ProcessingError::ToolMissing(format!("ffmpeg: {e}")))?;
    Ok(())
}

/// Seeks `source_video_path` to `timestamp` (input-side, so the demuxer
/// skips rather than decoding every preceding frame), extracts exactly one
/// frame, optionally crops to `roi`, and encodes a high-quality JPEG.
fn capture_one_still(
    source_video_path: &Path,
    timestamp: f64,
    roi: Option<Roi>,
    output_path: &Path,
) -> Result<()> {
    info!(timestamp, ?output_path, "capturing high-resolution still");

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-ss")
        .arg(format!("{timestamp:.3}"))
        .arg("-i")
        .arg(source_video_path);

    if let Some(roi) = roi {
        let roi = roi.aligned_even();
        cmd.arg("-vf")
            .arg(format!("crop={}:{}:{}:{}", roi.w, roi.h, roi.x, roi.y));
    }

    cmd.arg("-vframes")
        .arg("1")
        .arg("-q:v")
        .arg("2")
        .arg("-y")
        .arg(output_path);

    let output = cmd
        .output()
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to execute ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProcessingError::FFmpegError(format!(
            "ffmpeg capture at {timestamp:.3}s failed: {stderr}"
        )));
    }

    if !output_path.exists() {
        return Err(ProcessingError::FFmpegError(
            "ffmpeg reported success but wrote no output file".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_stills_empty_input_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let result = capture_stills(Path::new("/nonexistent.mp4"), &[], None, dir.path());
        // With no targets there is nothing to fail on, regardless of
        // whether ffmpeg itself is installed in this environment.
        if let Ok(stills) = result {
            assert!(stills.is_empty());
        }
    }

    #[test]
    fn test_capture_targets_sorted_before_capture() {
        let targets = vec![
            CaptureTarget { index: 1, timestamp: 20.0 },
            CaptureTarget { index: 0, timestamp: 5.0 },
        ];
        let mut sorted = targets.clone();
        sorted.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        assert_eq!(sorted[0].timestamp, 5.0);
        assert_eq!(sorted[1].timestamp, 20.0);
    }
}

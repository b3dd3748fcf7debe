//! Materializes the single decoded frame a [`BestShot`] points to.
//!
//! The funnel analyzer (`slide-extract-scene`) only ever carries a
//! timestamp and a sharpness score forward — the actual pixel data for a
//! `BestShot` is fetched lazily, one at a time, right before it is needed by
//! OCR (§4.3 L3) or high-resolution capture (§4.4). This keeps at most one
//! decoded frame resident at once, matching the funnel's streaming contract.
use image::RgbImage;
use slide_extract_common::{BestShot, ProcessingError, Result};
use slide_extract_decoder::{decode_video, DecoderConfig, FrameFilter, PixelFormat};
use std::path::Path;
use tracing::debug;

/// Decodes the single frame at `shot.timestamp` from `video_path` and
/// returns it as an RGB image.
///
/// # Errors
/// Returns [`ProcessingError::CorruptedFile`] if the decoder produces no
/// frame at the requested timestamp, or a decode error otherwise.
pub fn materialize_best_shot(video_path: &Path, shot: &BestShot) -> Result<RgbImage> {
    debug!(timestamp = shot.timestamp, "materializing best shot frame");

    let config = DecoderConfig {
        output_format: PixelFormat::RGB24,
        frame_filter: Some(FrameFilter::Timestamps(vec![shot.timestamp])),
    };
    let frames = decode_video(video_path, &config)?;
    let frame = frames.into_iter().next().ok_or_else(|| {
        ProcessingError::CorruptedFile(format!(
            "no frame decoded at timestamp {:.3}",
            shot.timestamp
        ))
    })?;

    RgbImage::from_raw(frame.width, frame.height, frame.data).ok_or_else(|| {
        ProcessingError::Other(format!(
            "frame at {:.3} has inconsistent RGB24 buffer size",
            shot.timestamp
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_best_shot_reports_missing_frame() {
        // A video path that cannot be opened surfaces as a decode error,
        // not a panic, regardless of which stage called us.
        let shot = BestShot { timestamp: 1.0, sharpness: 10.0, scene_start_ts: 0.0, scene_end_ts: 2.0 };
        let result = materialize_best_shot(Path::new("/nonexistent/video.mp4"), &shot);
        assert!(result.is_err());
    }
}

//! Video decoder module.
//!
//! Wraps `ffmpeg-next` for frame extraction with configurable filtering and
//! pixel format conversion, plus a streaming luminance decoder used by the
//! funnel analyzer so it never has to hold a whole video's frames in memory
//! at once.
use ffmpeg_next as ffmpeg;
use slide_extract_common::{ProcessingError, Result};
use std::path::Path;
use std::thread;

/// Pixel format for decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUV 4:2:0 planar format (most common).
    YUV420P,
    /// RGB 24-bit format (for image processing).
    RGB24,
    /// Single-channel 8-bit luminance.
    Gray8,
}

impl PixelFormat {
    fn to_ffmpeg_format(self) -> ffmpeg::format::Pixel {
        match self {
            PixelFormat::YUV420P => ffmpeg::format::Pixel::YUV420P,
            PixelFormat::RGB24 => ffmpeg::format::Pixel::RGB24,
            PixelFormat::Gray8 => ffmpeg::format::Pixel::GRAY8,
        }
    }
}

/// Frame filtering options.
#[derive(Debug, Clone)]
pub enum FrameFilter {
    /// Extract only I-frames (keyframes).
    IFramesOnly,
    /// Extract frames at specific timestamps (seconds).
    Timestamps(Vec<f64>),
}

/// Decoded video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame timestamp in seconds, from the decoder's reported presentation
    /// time — never derived from `frame_number / fps` (see §4.3 L1).
    pub timestamp: f64,
    pub frame_number: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub is_keyframe: bool,
}

/// Video decoder configuration.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub output_format: PixelFormat,
    pub frame_filter: Option<FrameFilter>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            output_format: PixelFormat::YUV420P,
            frame_filter: None,
        }
    }
}

fn init_ffmpeg() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        ffmpeg::init().expect("failed to initialize ffmpeg");
    });
}

/// Probe a video file's duration in seconds, via the container's format context.
///
/// # Errors
/// Returns an error if the file cannot be opened.
pub fn probe_duration(input_path: &Path) -> Result<f64> {
    init_ffmpeg();
    let ictx = ffmpeg::format::input(&input_path)
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to open input file: {e}")))?;
    let duration = ictx.duration();
    if duration <= 0 {
        return Err(ProcessingError::CorruptedFile(
            "container reports non-positive duration".to_string(),
        ));
    }
    Ok(duration as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE))
}

/// Decode video frames with filtering and format conversion, collecting them
/// all into memory. Suitable for sparse extraction (a handful of ROI
/// samples, a single seeked frame) — not for streaming analysis of an
/// entire video, which should use [`stream_luminance`] instead.
///
/// # Errors
/// Returns an error if the input cannot be opened, has no video stream, or
/// the decoder/scaler cannot be constructed.
pub fn decode_video(input_path: &Path, config: &DecoderConfig) -> Result<Vec<Frame>> {
    init_ffmpeg();

    let mut ictx = ffmpeg::format::input(&input_path)
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to open input file: {e}")))?;

    let video_stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or(ProcessingError::NoVideoStream)?;

    let stream_index = video_stream.index();
    let time_base = video_stream.time_base();

    let codec_params = video_stream.parameters();
    let mut decoder = ffmpeg::codec::context::Context::from_parameters(codec_params)
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to create context: {e}")))?
        .decoder()
        .video()
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to create decoder: {e}")))?;

    let width = decoder.width();
    let height = decoder.height();
    let src_format = decoder.format();

    let mut scaler = ffmpeg::software::scaling::Context::get(
        src_format,
        width,
        height,
        config.output_format.to_ffmpeg_format(),
        width,
        height,
        ffmpeg::software::scaling::Flags::BILINEAR,
    )
    .map_err(|e| ProcessingError::FFmpegError(format!("failed to create scaler: {e}")))?;

    let mut frames = Vec::new();
    let mut frame_number = 0u64;
    let mut decoded_frame = ffmpeg::util::frame::video::Video::empty();
    let mut converted_frame = ffmpeg::util::frame::video::Video::empty();

    let to_timestamp = |pts: i64| -> f64 { pts as f64 * f64::from(time_base.0) / f64::from(time_base.1) };

    let mut drain = |decoder: &mut ffmpeg::decoder::Video,
                      frames: &mut Vec<Frame>,
                      frame_number: &mut u64|
     -> Result<()> {
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let timestamp = to_timestamp(decoded_frame.timestamp().unwrap_or(0));
            let is_keyframe = decoded_frame.is_key();

            let should_include = match &config.frame_filter {
                None => true,
                Some(FrameFilter::IFramesOnly) => is_keyframe,
                Some(FrameFilter::Timestamps(timestamps)) => {
                    timestamps.iter().any(|&ts| (ts - timestamp).abs() < 0.04)
                }
            };

            if should_include {
                scaler
                    .run(&decoded_frame, &mut converted_frame)
                    .map_err(|e| ProcessingError::FFmpegError(format!("failed to convert frame: {e}")))?;
                let data = copy_frame_data(&converted_frame, config.output_format);
                frames.push(Frame {
                    timestamp,
                    frame_number: *frame_number,
                    width,
                    height,
                    format: config.output_format,
                    data,
                    is_keyframe,
                });
            }
            *frame_number += 1;
        }
        Ok(())
    };

    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if decoder.send_packet(&packet).is_ok() {
            drain(&mut decoder, &mut frames, &mut frame_number)?;
        }
    }

    decoder.send_eof().ok();
    drain(&mut decoder, &mut frames, &mut frame_number)?;

    Ok(frames)
}

/// One luminance-only sample emitted by [`stream_luminance`]: normalized to
/// `[0, 1]` grayscale, with its decoder-reported presentation timestamp.
#[derive(Debug, Clone)]
pub struct LuminanceFrame {
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    /// Row-major, `[0, 1]`-normalized luminance values.
    pub luma: Vec<f32>,
}

/// Decode `input_path` and stream normalized luminance frames over a bounded
/// channel as they become available, rather than collecting a `Vec` of every
/// frame up front. This is the producer half of the funnel analyzer's
/// generator/lazy-sequence design (see §9): L1 pulls from the returned
/// receiver one frame at a time.
///
/// The decode runs on a dedicated thread; dropping the receiver before EOF
/// stops the thread on its next send.
#[must_use]
pub fn stream_luminance(
    input_path: std::path::PathBuf,
) -> crossbeam_channel::Receiver<Result<LuminanceFrame>> {
    let (tx, rx) = crossbeam_channel::bounded(8);
    thread::spawn(move || {
        let result = decode_and_send_luminance(&input_path, &tx);
        if let Err(e) = result {
            let _ = tx.send(Err(e));
        }
    });
    rx
}

fn decode_and_send_luminance(
    input_path: &Path,
    tx: &crossbeam_channel::Sender<Result<LuminanceFrame>>,
) -> Result<()> {
    init_ffmpeg();

    let mut ictx = ffmpeg::format::input(&input_path)
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to open input file: {e}")))?;

    let video_stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or(ProcessingError::NoVideoStream)?;

    let stream_index = video_stream.index();
    let time_base = video_stream.time_base();
    let codec_params = video_stream.parameters();

    let mut decoder = ffmpeg::codec::context::Context::from_parameters(codec_params)
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to create context: {e}")))?
        .decoder()
        .video()
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to create decoder: {e}")))?;

    let width = decoder.width();
    let height = decoder.height();
    let src_format = decoder.format();

    let mut scaler = ffmpeg::software::scaling::Context::get(
        src_format,
        width,
        height,
        ffmpeg::format::Pixel::GRAY8,
        width,
        height,
        ffmpeg::software::scaling::Flags::BILINEAR,
    )
    .map_err(|e| ProcessingError::FFmpegError(format!("failed to create scaler: {e}")))?;

    let to_timestamp = |pts: i64| -> f64 { pts as f64 * f64::from(time_base.0) / f64::from(time_base.1) };

    let mut decoded_frame = ffmpeg::util::frame::video::Video::empty();
    let mut converted_frame = ffmpeg::util::frame::video::Video::empty();

    let mut send_ready = |decoder: &mut ffmpeg::decoder::Video| -> Result<bool> {
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let timestamp = to_timestamp(decoded_frame.timestamp().unwrap_or(0));
            scaler
                .run(&decoded_frame, &mut converted_frame)
                .map_err(|e| ProcessingError::FFmpegError(format!("failed to convert frame: {e}")))?;

            let stride = converted_frame.stride(0);
            let plane = converted_frame.data(0);
            let mut luma = Vec::with_capacity((width * height) as usize);
            for y in 0..height as usize {
                let row_start = y * stride;
                for x in 0..width as usize {
                    luma.push(f32::from(plane[row_start + x]) / 255.0);
                }
            }

            let frame = LuminanceFrame {
                timestamp,
                width,
                height,
                luma,
            };
            if tx.send(Ok(frame)).is_err() {
                return Ok(false); // receiver dropped, stop decoding
            }
        }
        Ok(true)
    };

    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if decoder.send_packet(&packet).is_ok() && !send_ready(&mut decoder)? {
            return Ok(());
        }
    }

    decoder.send_eof().ok();
    send_ready(&mut decoder)?;
    Ok(())
}

fn copy_frame_data(frame: &ffmpeg::util::frame::video::Video, format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::RGB24 => {
            let width = frame.width() as usize;
            let height = frame.height() as usize;
            let stride = frame.stride(0);
            let plane_data = frame.data(0);

            let mut data = Vec::with_capacity(width * height * 3);
            for y in 0..height {
                let row_start = y * stride;
                let row_end = row_start + (width * 3);
                data.extend_from_slice(&plane_data[row_start..row_end]);
            }
            data
        }
        PixelFormat::Gray8 => {
            let width = frame.width() as usize;
            let height = frame.height() as usize;
            let stride = frame.stride(0);
            let plane_data = frame.data(0);

            let mut data = Vec::with_capacity(width * height);
            for y in 0..height {
                let row_start = y * stride;
                data.extend_from_slice(&plane_data[row_start..row_start + width]);
            }
            data
        }
        PixelFormat::YUV420P => {
            let width = frame.width() as usize;
            let height = frame.height() as usize;

            let y_stride = frame.stride(0);
            let y_data = frame.data(0);
            let y_size = width * height;

            let uv_width = width / 2;
            let uv_height = height / 2;
            let u_stride = frame.stride(1);
            let v_stride = frame.stride(2);
            let u_data = frame.data(1);
            let v_data = frame.data(2);
            let uv_size = uv_width * uv_height;

            let mut data = Vec::with_capacity(y_size + uv_size * 2);

            for y in 0..height {
                let row_start = y * y_stride;
                let row_end = row_start + width;
                data.extend_from_slice(&y_data[row_start..row_end]);
            }
            for y in 0..uv_height {
                let row_start = y * u_stride;
                let row_end = row_start + uv_width;
                data.extend_from_slice(&u_data[row_start..row_end]);
            }
            for y in 0..uv_height {
                let row_start = y * v_stride;
                let row_end = row_start + uv_width;
                data.extend_from_slice(&v_data[row_start..row_end]);
            }

            data
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_conversion() {
        assert_eq!(PixelFormat::YUV420P.to_ffmpeg_format(), ffmpeg::format::Pixel::YUV420P);
        assert_eq!(PixelFormat::RGB24.to_ffmpeg_format(), ffmpeg::format::Pixel::RGB24);
        assert_eq!(PixelFormat::Gray8.to_ffmpeg_format(), ffmpeg::format::Pixel::GRAY8);
    }

    #[test]
    fn test_decoder_config_default() {
        let config = DecoderConfig::default();
        assert_eq!(config.output_format, PixelFormat::YUV420P);
        assert!(config.frame_filter.is_none());
    }
}

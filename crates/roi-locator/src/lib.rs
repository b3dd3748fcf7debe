//! ROI Locator: finds the rectangular slide region in a source video.
//!
//! Samples three frames at fixed relative positions, runs edge detection and
//! contour analysis on each, and returns the first 4-vertex contour that
//! covers at least 10% of the frame area, as its axis-aligned bounding
//! rectangle (§4.1). Grounded on the Canny/contour/`approxPolyDP` recipe in
//! the original Python `VideoService._locate_ppt_region`.
use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::{find_contours, Contour};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::point::Point;
use imageproc::rect::Rect as DrawRect;
use slide_extract_common::{ProcessingError, Result, Roi};
use slide_extract_decoder::{decode_video, probe_duration, DecoderConfig, FrameFilter, PixelFormat};
use std::path::Path;
use tracing::{debug, info, warn};

/// Relative positions (fraction of total duration) sampled for ROI detection.
const SAMPLE_POSITIONS: [f64; 3] = [0.2, 0.4, 0.6];

const GAUSSIAN_SIGMA: f32 = 1.1; // ~5x5 kernel at this sigma
const CANNY_LOW: f32 = 30.0;
const CANNY_HIGH: f32 = 120.0;
const DOUGLAS_PEUCKER_EPSILON_FRACTION: f64 = 0.03;
const MIN_AREA_FRACTION: f64 = 0.10;
const MAX_CANDIDATE_CONTOURS: usize = 5;

/// Locates the slide ROI in `video_path`. If `debug_dir` is provided, writes
/// one diagnostic PNG per sampled frame with the accepted (or best rejected)
/// contour overlaid, regardless of outcome.
///
/// # Errors
/// Returns [`ProcessingError::NoVideoStream`]-style input errors if the video
/// cannot be probed/decoded, or [`ProcessingError::Other`] if none of the
/// three samples yields an accepted rectangle.
pub fn locate_roi(video_path: &Path, debug_dir: Option<&Path>) -> Result<Roi> {
    let duration = probe_duration(video_path)?;
    if duration <= 0.0 {
        return Err(ProcessingError::CorruptedFile("zero-duration video".to_string()));
    }

    let timestamps: Vec<f64> = SAMPLE_POSITIONS.iter().map(|p| p * duration).collect();
    let config = DecoderConfig {
        output_format: PixelFormat::RGB24,
        frame_filter: Some(FrameFilter::Timestamps(timestamps.clone())),
    };
    let frames = decode_video(video_path, &config)?;

    if frames.is_empty() {
        return Err(ProcessingError::Other(
            "no frames decoded for ROI sampling".to_string(),
        ));
    }

    for (sample_idx, frame) in frames.iter().enumerate() {
        let rgb = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| ProcessingError::ImageError("malformed RGB24 sample frame".to_string()))?;

        let candidate = find_slide_rectangle(&rgb);

        if let Some(dir) = debug_dir {
            write_debug_image(dir, sample_idx, &rgb, candidate.as_ref());
        }

        if let Some(roi) = candidate {
            info!(sample_idx, ?roi, "slide region located");
            return Ok(roi);
        }
        debug!(sample_idx, "no qualifying rectangle in this sample");
    }

    warn!("no sample yielded a qualifying slide rectangle");
    Err(ProcessingError::Other("unable to locate slide region".to_string()))
}

/// Runs the detection recipe on a single RGB frame, returning the first
/// accepted rectangle, if any.
fn find_slide_rectangle(rgb: &RgbImage) -> Option<Roi> {
    let frame_area = f64::from(rgb.width()) * f64::from(rgb.height());
    let gray = image::imageops::grayscale(rgb);
    let blurred = gaussian_blur(&gray);
    let edges = imageproc::edges::canny(&blurred, CANNY_LOW, CANNY_HIGH);

    let mut contours = find_contours::<i32>(&edges);
    contours.sort_by(|a, b| polygon_area(&a.points).partial_cmp(&polygon_area(&b.points)).unwrap().reverse());
    contours.truncate(MAX_CANDIDATE_CONTOURS);

    for contour in &contours {
        if let Some(roi) = accept_contour(contour, frame_area, rgb.width(), rgb.height()) {
            return Some(roi);
        }
    }
    None
}

fn accept_contour(contour: &Contour<i32>, frame_area: f64, frame_w: u32, frame_h: u32) -> Option<Roi> {
    if contour.points.len() < 3 {
        return None;
    }
    let perimeter = polygon_perimeter(&contour.points);
    let epsilon = DOUGLAS_PEUCKER_EPSILON_FRACTION * perimeter;
    let approx = douglas_peucker(&contour.points, epsilon);

    if approx.len() != 4 {
        return None;
    }

    let area = polygon_area(&approx);
    if area < MIN_AREA_FRACTION * frame_area {
        return None;
    }

    let roi = bounding_rect(&approx);
    if !roi.fits_within(frame_w, frame_h) {
        return None;
    }
    Some(roi.aligned_even())
}

fn gaussian_blur(image: &GrayImage) -> GrayImage {
    imageproc::filter::gaussian_blur_f32(image, GAUSSIAN_SIGMA)
}

/// Shoelace-formula polygon area (absolute value), for closed point loops.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut sum = 0.0_f64;
    for i in 0..n {
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        sum += f64::from(p1.x) * f64::from(p2.y) - f64::from(p2.x) * f64::from(p1.y);
    }
    (sum / 2.0).abs()
}

fn polygon_perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len();
    let mut perimeter = 0.0_f64;
    for i in 0..n {
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        let dx = f64::from(p2.x - p1.x);
        let dy = f64::from(p2.y - p1.y);
        perimeter += (dx * dx + dy * dy).sqrt();
    }
    perimeter
}

/// Ramer–Douglas–Peucker polygon simplification (the Rust analogue of
/// OpenCV's `approxPolyDP`), operating on a closed point loop.
fn douglas_peucker(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    // Treat as an open polyline anchored at the two points of maximum
    // separation, then simplify each half and stitch the loop back together.
    let (start_idx, end_idx) = farthest_pair(points);
    let mut loop_pts = Vec::with_capacity(points.len());
    let mut i = start_idx;
    loop {
        loop_pts.push(points[i]);
        if i == end_idx {
            break;
        }
        i = (i + 1) % points.len();
    }
    let mut simplified = simplify_polyline(&loop_pts, epsilon);
    if simplified.len() > 1 && simplified.first() == simplified.last() {
        simplified.pop();
    }
    simplified
}

fn farthest_pair(points: &[Point<i32>]) -> (usize, usize) {
    let mut best = (0usize, 0usize);
    let mut best_dist = -1.0_f64;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let dx = f64::from(points[i].x - points[j].x);
            let dy = f64::from(points[i].y - points[j].y);
            let dist = dx * dx + dy * dy;
            if dist > best_dist {
                best_dist = dist;
                best = (i, j);
            }
        }
    }
    best
}

fn simplify_polyline(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = *points.last().unwrap();
    let mut max_dist = -1.0_f64;
    let mut split_idx = 0usize;
    for (idx, &p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let dist = point_to_segment_distance(p, first, last);
        if dist > max_dist {
            max_dist = dist;
            split_idx = idx;
        }
    }
    if max_dist > epsilon {
        let mut left = simplify_polyline(&points[..=split_idx], epsilon);
        let right = simplify_polyline(&points[split_idx..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn point_to_segment_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (px, py) = (f64::from(p.x), f64::from(p.y));
    let (ax, ay) = (f64::from(a.x), f64::from(a.y));
    let (bx, by) = (f64::from(b.x), f64::from(b.y));
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let proj_x = ax + t * dx;
    let proj_y = ay + t * dy;
    ((px - proj_x).powi(2) + (py - proj_y).powi(2)).sqrt()
}

fn bounding_rect(points: &[Point<i32>]) -> Roi {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0).max(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0).max(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);
    Roi {
        x: min_x as u32,
        y: min_y as u32,
        w: (max_x - min_x).max(0) as u32,
        h: (max_y - min_y).max(0) as u32,
    }
}

fn write_debug_image(dir: &Path, sample_idx: usize, rgb: &RgbImage, roi: Option<&Roi>) {
    if std::fs::create_dir_all(dir).is_err() {
        warn!(?dir, "failed to create debug_images directory");
        return;
    }
    let mut canvas = rgb.clone();
    if let Some(roi) = roi {
        let rect = DrawRect::at(roi.x as i32, roi.y as i32).of_size(roi.w, roi.h);
        draw_hollow_rect_mut(&mut canvas, rect, Rgb([0, 255, 0]));
    }
    let path = dir.join(format!("roi_sample_{sample_idx}.png"));
    if let Err(e) = canvas.save(&path) {
        warn!(?path, error = %e, "failed to write ROI debug image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: i32, y: i32) -> Point<i32> {
        Point::new(x, y)
    }

    #[test]
    fn test_polygon_area_unit_square() {
        let square = [pt(0, 0), pt(10, 0), pt(10, 10), pt(0, 10)];
        assert_eq!(polygon_area(&square), 100.0);
    }

    #[test]
    fn test_polygon_perimeter_unit_square() {
        let square = [pt(0, 0), pt(10, 0), pt(10, 10), pt(0, 10)];
        assert_eq!(polygon_perimeter(&square), 40.0);
    }

    #[test]
    fn test_douglas_peucker_simplifies_near_rectangle_to_four_points() {
        // A rectangle with extra near-collinear points along each edge,
        // mimicking a noisy contour trace.
        let noisy = vec![
            pt(0, 0),
            pt(50, 1),
            pt(100, 0),
            pt(100, 50),
            pt(100, 100),
            pt(50, 99),
            pt(0, 100),
            pt(0, 50),
        ];
        let perimeter = polygon_perimeter(&noisy);
        let simplified = douglas_peucker(&noisy, 0.03 * perimeter);
        assert_eq!(simplified.len(), 4);
    }

    #[test]
    fn test_bounding_rect() {
        let pts = [pt(5, 5), pt(15, 5), pt(15, 25), pt(5, 25)];
        let roi = bounding_rect(&pts);
        assert_eq!(roi, Roi { x: 5, y: 5, w: 10, h: 20 });
    }

    #[test]
    fn test_accept_contour_rejects_small_area() {
        let tiny_square = Contour {
            points: vec![pt(0, 0), pt(5, 0), pt(5, 5), pt(0, 5)],
            parent: None,
            border_type: imageproc::contours::BorderType::Outer,
        };
        assert!(accept_contour(&tiny_square, 1_000_000.0, 1000, 1000).is_none());
    }
}

//! OCR module using Tesseract 5.x
//!
//! This module provides optical character recognition (OCR) capabilities using
//! Tesseract 5.x, an open-source OCR engine developed by Google.
//!
//! # Features
//! - Single-stage OCR (combined detection and recognition)
//! - 100+ language support via Tesseract
//! - Word and character-level bounding boxes
//! - Confidence scores for each text region
//! - Multiple page segmentation modes
//!
//! The [`dedup`] submodule implements the funnel's L3 semantic deduplication
//! pass (§4.3): a Gestalt pattern-matching ratio over each `BestShot`'s OCR
//! text decides whether it is a genuinely new slide or a near-duplicate of
//! the last retained one.

pub mod dedup;

use image::RgbImage;
use leptess::{LepTess, Variable};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Configuration for OCR processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OCRConfig {
    /// Tesseract language codes (e.g., "eng", "eng+fra")
    pub language: String,
    /// Minimum confidence threshold (0-100)
    pub min_confidence: i32,
    /// Page segmentation mode (see Tesseract PSM)
    pub page_segmentation_mode: u32,
}

impl Default for OCRConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            min_confidence: 50,
            page_segmentation_mode: 3, // PSM_AUTO (fully automatic)
        }
    }
}

/// Bounding box with normalized coordinates (0.0-1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Detected text region with content and location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    /// Recognized text content
    pub text: String,
    /// Recognition confidence score (0.0-1.0)
    pub confidence: f32,
    /// Bounding box with normalized coordinates (0.0-1.0)
    pub bbox: BBox,
}

/// Errors that can occur during OCR processing
#[derive(Error, Debug)]
pub enum OCRError {
    #[error("Failed to initialize Tesseract: {0}")]
    InitError(String),

    #[error("Failed to run OCR: {0}")]
    RecognitionError(String),

    #[error("Invalid image dimensions: {0}")]
    InvalidImageDimensions(String),
}

impl From<OCRError> for slide_extract_common::ProcessingError {
    fn from(err: OCRError) -> Self {
        slide_extract_common::ProcessingError::Other(err.to_string())
    }
}

/// OCR detector using Tesseract
pub struct OCRDetector {
    config: OCRConfig,
}

impl OCRDetector {
    /// Create a new OCR detector
    pub fn new(config: OCRConfig) -> Result<Self, OCRError> {
        // Verify Tesseract can initialize with the specified language
        let _test_init = LepTess::new(None, &config.language).map_err(|e| {
            OCRError::InitError(format!(
                "Failed to initialize Tesseract with language '{}': {}. \
                 Make sure language data is installed (e.g., 'brew install tesseract-lang')",
                config.language, e
            ))
        })?;

        Ok(Self { config })
    }

    /// Extracts the whole-page recognized text, with no rectangle
    /// restriction — the input used by L3 semantic deduplication, where the
    /// exact word boxes do not matter, only the overall text content.
    pub fn extract_page_text(&self, image: &RgbImage) -> Result<String, OCRError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OCRError::InvalidImageDimensions(format!(
                "Image dimensions must be non-zero (got {}x{})",
                width, height
            )));
        }

        let mut lt = self.new_tesseract_instance()?;
        self.load_image(&mut lt, image)?;

        Ok(lt.get_utf8_text().unwrap_or_default().trim().to_string())
    }

    /// Detect and recognize text in an RGB image, with per-word bounding
    /// boxes and confidence scores.
    pub fn detect_text(&self, image: &RgbImage) -> Result<Vec<TextRegion>, OCRError> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(OCRError::InvalidImageDimensions(format!(
                "Image dimensions must be non-zero (got {}x{})",
                width, height
            )));
        }

        let mut lt = self.new_tesseract_instance()?;
        self.load_image(&mut lt, image)?;

        // Note: get_component_boxes() returns None if no text is detected
        // (e.g., blank image). This is not an error, just means the image
        // has no text.
        let boxes = match lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_WORD, true) {
            Some(boxes) => boxes,
            None => return Ok(Vec::new()),
        };

        let mut text_regions = Vec::new();

        for bbox in &boxes {
            let geom = bbox.get_geometry();
            lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);

            let text = lt.get_utf8_text().unwrap_or_default().trim().to_string();
            if text.is_empty() {
                continue;
            }

            let confidence = lt.mean_text_conf() as f32 / 100.0;

            if (confidence * 100.0) as i32 >= self.config.min_confidence {
                let x = geom.x as f32 / width as f32;
                let y = geom.y as f32 / height as f32;
                let w = geom.w as f32 / width as f32;
                let h = geom.h as f32 / height as f32;

                debug!(text = %text, confidence = confidence * 100.0, x, y, w, h, "OCR text region");

                text_regions.push(TextRegion {
                    text,
                    confidence,
                    bbox: BBox { x, y, width: w, height: h },
                });
            }
        }

        Ok(text_regions)
    }

    fn new_tesseract_instance(&self) -> Result<LepTess, OCRError> {
        let mut lt = LepTess::new(None, &self.config.language)
            .map_err(|e| OCRError::InitError(format!("Failed to initialize Tesseract: {}", e)))?;
        lt.set_variable(
            Variable::TesseditPagesegMode,
            &self.config.page_segmentation_mode.to_string(),
        )
        .map_err(|e| OCRError::InitError(format!("Failed to set PSM: {}", e)))?;
        Ok(lt)
    }

    fn load_image(&self, lt: &mut LepTess, image: &RgbImage) -> Result<(), OCRError> {
        let mut png_buf = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut png_buf, image::ImageFormat::Png)
            .map_err(|e| OCRError::RecognitionError(format!("Failed to encode image to PNG: {}", e)))?;

        lt.set_image_from_mem(png_buf.get_ref())
            .map_err(|e| OCRError::RecognitionError(format!("Failed to set image from memory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_ocr_config_default() {
        let config = OCRConfig::default();
        assert_eq!(config.language, "eng");
        assert_eq!(config.min_confidence, 50);
        assert_eq!(config.page_segmentation_mode, 3);
    }

    #[test]
    fn test_detector_invalid_language() {
        let config = OCRConfig {
            language: "invalid_lang_xyz".to_string(),
            ..Default::default()
        };
        let result = OCRDetector::new(config);
        assert!(result.is_err(), "Should fail with invalid language");
    }

    #[test]
    fn test_detect_text_empty_image() {
        let config = OCRConfig::default();
        let Ok(detector) = OCRDetector::new(config) else {
            // Environment has no tesseract language data installed; the
            // init-failure path is covered by test_detector_invalid_language.
            return;
        };

        let img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let result = detector.detect_text(&img);
        assert!(result.is_ok());
        let regions = result.unwrap();
        assert!(regions.len() < 5, "White image should have few or no text regions");
    }

    #[test]
    fn test_text_region_serialization() {
        let region = TextRegion {
            text: "HELLO".to_string(),
            confidence: 0.95,
            bbox: BBox { x: 0.1, y: 0.2, width: 0.3, height: 0.4 },
        };

        let json = serde_json::to_string(&region).expect("Failed to serialize");
        let deserialized: TextRegion = serde_json::from_str(&json).expect("Failed to deserialize");

        assert_eq!(region, deserialized);
    }
}

use crate::OcrResult;
use crate::engine::OcrEngine;
use crate::result::{BoundingBox, TextMatch};
use anyhow::Context;
use image::DynamicImage;
use imageproc::rect::Rect;
use rust_paddle_ocr::efficient_cropping::{EfficientCropper, ImageRef};
use rust_paddle_ocr::{Det, Rec};
use std::path::{Path, PathBuf};

/// Required model paths for the PP-OCR backend.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    detection_model: PathBuf,
    recognition_model: PathBuf,
    keys_path: PathBuf,
}

impl ModelConfig {
    pub fn new(
        detection_model: impl AsRef<Path>,
        recognition_model: impl AsRef<Path>,
        keys_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            detection_model: detection_model.as_ref().to_path_buf(),
            recognition_model: recognition_model.as_ref().to_path_buf(),
            keys_path: keys_path.as_ref().to_path_buf(),
        }
    }

    /// Path to the detection model (`PP-OCRv5_mobile_det.mnn` or similar).
    pub fn detection_model(&self) -> &Path {
        &self.detection_model
    }

    /// Path to the recognition model (`PP-OCRv5_mobile_rec.mnn` or similar).
    pub fn recognition_model(&self) -> &Path {
        &self.recognition_model
    }

    /// Path to the keys/charset file (language specific).
    pub fn keys_path(&self) -> &Path {
        &self.keys_path
    }
}

/// Tunable parameters for the PP-OCR backend.
#[derive(Debug, Clone, Copy)]
pub struct OcrOptions {
    /// Whether to merge nearby detected boxes (recommended for PP-OCRv5).
    pub merge_boxes: bool,
    /// Merge threshold passed to the detector.
    pub merge_threshold: i32,
    /// Use the faster cropping path from `rust-paddle-ocr`.
    pub efficient_cropping: bool,
    /// Minimum per-character score during recognition decoding.
    pub min_score: f32,
    /// Minimum score for punctuation recognition.
    pub punct_min_score: f32,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            merge_boxes: true,
            merge_threshold: 1,
            efficient_cropping: true,
            min_score: 0.6,
            punct_min_score: 0.1,
        }
    }
}

/// PP-OCR detection + recognition backend.
///
/// Holds the models so repeated frames do not pay the load cost. The
/// recognizer applies its per-character score floor while decoding and
/// exposes no aggregate score for a region, so regions that survive
/// decoding are reported at confidence 1.0.
pub struct PaddleEngine {
    det: Det,
    rec: Rec,
    options: OcrOptions,
}

impl PaddleEngine {
    /// Build an engine with default options. Fails when a model file
    /// cannot be loaded.
    pub fn new(config: ModelConfig) -> OcrResult<Self> {
        Self::with_options(config, OcrOptions::default())
    }

    /// Build an engine with custom options.
    pub fn with_options(config: ModelConfig, options: OcrOptions) -> OcrResult<Self> {
        let det = Det::from_file(config.detection_model())
            .context("failed to load detection model")?
            .with_merge_boxes(options.merge_boxes)
            .with_merge_threshold(options.merge_threshold);

        let rec = Rec::from_file(config.recognition_model(), config.keys_path())
            .context("failed to load recognition model")?
            .with_min_score(options.min_score)
            .with_punct_min_score(options.punct_min_score);

        Ok(Self { det, rec, options })
    }

    fn crop_regions(&self, frame: &DynamicImage, rects: &[Rect]) -> Vec<DynamicImage> {
        if !self.options.efficient_cropping {
            return rects
                .iter()
                .map(|rect| {
                    frame.crop_imm(
                        rect.left() as u32,
                        rect.top() as u32,
                        rect.width(),
                        rect.height(),
                    )
                })
                .collect();
        }

        // Upstream optimized cropper reduces clones when there are many boxes.
        let image_ref = ImageRef::from(frame.clone());
        match rects.len() {
            1 => vec![EfficientCropper::smart_crop(&image_ref, &rects[0])],
            2..=8 => EfficientCropper::parallel_batch_crop(&image_ref, rects),
            _ => EfficientCropper::optimized_batch_crop(&image_ref, rects),
        }
    }
}

impl OcrEngine for PaddleEngine {
    fn extract_text(
        &mut self,
        frame: &DynamicImage,
        min_confidence: f32,
    ) -> OcrResult<Vec<TextMatch>> {
        let rects = self
            .det
            .find_text_rect(frame)
            .context("text detection failed")?;

        if rects.is_empty() {
            return Ok(Vec::new());
        }

        let crops = self.crop_regions(frame, &rects);

        let mut matches = Vec::with_capacity(rects.len());
        for (rect, crop) in rects.into_iter().zip(crops.into_iter()) {
            let text = self
                .rec
                .predict_str(&crop)
                .context("text recognition failed")?;
            if text.is_empty() {
                continue;
            }
            let hit = TextMatch::new(text, 1.0, bbox_from_rect(rect));
            if hit.confidence >= min_confidence {
                matches.push(hit);
            }
        }

        tracing::debug!(regions = matches.len(), "paddle extraction finished");
        Ok(matches)
    }
}

fn bbox_from_rect(rect: Rect) -> BoundingBox {
    BoundingBox::new(
        rect.left().max(0) as u32,
        rect.top().max(0) as u32,
        rect.width(),
        rect.height(),
    )
}

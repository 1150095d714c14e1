//! Pipeline orchestration: one image in, one item list out.
//!
//! The pipeline is synchronous and shares nothing between invocations, so
//! callers may run as many in parallel as they like. The OCR call blocks; any
//! latency bound is the caller's responsibility.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assemble::assemble_items;
use crate::loader::{self, LoadError};
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError, SegmentationMode};
use crate::segment::{self, TextRow};
use larder_core::ExtractedItem;

/// Full-region OCR output shorter than this triggers the second-tier retry.
pub const FULL_TEXT_RETRY_THRESHOLD: usize = 20;

/// Diagnostic artifact file names (fixed, for offline inspection).
const DEBUG_CROP_FILE: &str = "debug_crop.png";
const DEBUG_THRESH_FILE: &str = "debug_thresh.png";
const DEBUG_OCR_FILE: &str = "debug_ocr.txt";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Failed to write diagnostic artifact: {0}")]
    Diagnostics(#[from] std::io::Error),
}

/// Orchestrates: load → crop → segment rows → two-tier OCR → assemble →
/// per-row fallback.
pub struct ExtractionPipeline<R: OcrBackend> {
    recognizer: R,
    diagnostics_dir: Option<PathBuf>,
}

impl<R: OcrBackend> ExtractionPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer, diagnostics_dir: None }
    }

    /// Additionally persist the cropped band, row threshold mask and raw OCR
    /// text for offline inspection. Does not alter the returned items.
    pub fn with_diagnostics(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    /// Process an image file. A file that decodes to no image yields zero
    /// items, not an error.
    pub fn extract_from_path(&self, path: &Path) -> Result<Vec<ExtractedItem>, PipelineError> {
        tracing::info!("processing image: {}", path.display());
        match loader::load_image(path)? {
            Some(img) => self.extract_from_image(&img),
            None => {
                tracing::warn!("could not decode {}, returning no items", path.display());
                Ok(Vec::new())
            }
        }
    }

    /// Process raw image bytes (JPEG / PNG / WEBP / …).
    pub fn extract_from_bytes(&self, data: &[u8]) -> Result<Vec<ExtractedItem>, PipelineError> {
        match loader::load_image_from_bytes(data) {
            Some(img) => self.extract_from_image(&img),
            None => Ok(Vec::new()),
        }
    }

    /// Process an already-decoded image.
    pub fn extract_from_image(
        &self,
        img: &DynamicImage,
    ) -> Result<Vec<ExtractedItem>, PipelineError> {
        let band = segment::crop_item_band(img);
        let row_mask = segment::threshold_rows(&band);
        let rows = segment::merge_rows(&segment::detect_rows(&row_mask));
        tracing::debug!(rows = rows.len(), "segmented candidate text rows");

        if let Some(dir) = &self.diagnostics_dir {
            let band_png = preprocess::encode_as_png(&band)?;
            std::fs::write(dir.join(DEBUG_CROP_FILE), band_png)?;
            let mask_png =
                preprocess::encode_as_png(&DynamicImage::ImageLuma8(row_mask.clone()))?;
            std::fs::write(dir.join(DEBUG_THRESH_FILE), mask_png)?;
        }

        // Tier one: OCR the whole band in sparse-text mode. Tier two: retry
        // with fully automatic segmentation when the output is too short to
        // be a real item list.
        let mut text = self.ocr_region(&band, SegmentationMode::SparseText)?;
        if text.is_empty() || text.chars().count() < FULL_TEXT_RETRY_THRESHOLD {
            tracing::debug!("sparse-text OCR too short ({} chars), retrying", text.len());
            text = self.ocr_region(&band, SegmentationMode::Auto)?;
        }

        if let Some(dir) = &self.diagnostics_dir {
            std::fs::write(dir.join(DEBUG_OCR_FILE), &text)?;
        }

        let mut items = assemble_items(&text);

        // Per-row fallback: only when the full region parsed to nothing and
        // the segmenter actually found candidate rows. A failed row is
        // skipped, not fatal.
        if items.is_empty() && !rows.is_empty() {
            tracing::debug!("full-region parse found no items, trying {} rows", rows.len());
            for row in &rows {
                match self.ocr_row(&band, row) {
                    Ok(row_text) => items.extend(assemble_items(&row_text)),
                    Err(e) => tracing::warn!(row = ?row, "row OCR failed, skipping: {e}"),
                }
            }
        }

        tracing::info!(items = items.len(), "extraction finished");
        Ok(items)
    }

    fn ocr_row(&self, band: &DynamicImage, row: &TextRow) -> Result<String, PipelineError> {
        let row_img = band.crop_imm(0, row.top, band.width(), row.height());
        self.ocr_region(&row_img, SegmentationMode::Block)
    }

    /// Preprocess, upscale and OCR one region.
    fn ocr_region(
        &self,
        region: &DynamicImage,
        mode: SegmentationMode,
    ) -> Result<String, PipelineError> {
        let mask = preprocess::binarize_for_ocr(region);
        let upscaled = preprocess::upscale_for_ocr(&mask);
        let png = preprocess::encode_as_png(&DynamicImage::ImageLuma8(upscaled))?;
        let text = self.recognizer.recognize(&png, mode)?;
        Ok(text.trim().to_string())
    }
}

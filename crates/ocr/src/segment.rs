//! Text-row segmentation of the item-list band.
//!
//! The vertical band from 15% to 90% of image height excludes the header and
//! footer chrome common to receipt screenshots. Within that band, rows are
//! found on a locally thresholded mask — local contrast varies too much
//! inside a tight crop for the global Otsu pass to hold up.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, sum_image_pixels};

use crate::preprocess::component_bboxes;

/// Vertical band of the image likely to contain line items.
pub const CROP_TOP_FRAC: f32 = 0.15;
pub const CROP_BOTTOM_FRAC: f32 = 0.90;
/// Side length of the local-mean window for adaptive thresholding.
pub const ADAPTIVE_BLOCK_SIZE: u32 = 31;
/// Constant subtracted from the local mean before comparison.
pub const ADAPTIVE_OFFSET: f64 = 2.0;
/// Candidate rows must be taller than this to be printed text lines.
pub const ROW_MIN_HEIGHT_PX: u32 = 40;
/// ...and wider than this fraction of the crop width (filters icons).
pub const ROW_MIN_WIDTH_FRAC: f32 = 0.3;
/// Rows closer together than this merge into one (multi-line item names).
pub const ROW_MERGE_GAP_PX: u32 = 20;

/// A vertical pixel interval `[top, bottom)` within the cropped band,
/// believed to contain one printed line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRow {
    pub top: u32,
    pub bottom: u32,
}

impl TextRow {
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Crop the band likely to contain line items (15%–90% of image height).
pub fn crop_item_band(img: &DynamicImage) -> DynamicImage {
    let h = img.height();
    let top = ((h as f32) * CROP_TOP_FRAC) as u32;
    let bottom = ((h as f32) * CROP_BOTTOM_FRAC) as u32;
    if bottom <= top {
        // Degenerate tiny image; use it whole rather than produce an empty crop.
        return img.clone();
    }
    img.crop_imm(0, top, img.width(), bottom - top)
}

/// Inverse local-mean threshold (block 31, offset 2): foreground where the
/// pixel is darker than its neighbourhood mean minus the offset.
pub fn threshold_rows(band: &DynamicImage) -> GrayImage {
    let gray = band.to_luma8();
    adaptive_threshold_inv(&gray, ADAPTIVE_BLOCK_SIZE / 2, ADAPTIVE_OFFSET)
}

fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, offset: f64) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let integral: ImageBuffer<Luma<u64>, Vec<u64>> = integral_image(gray);
    let r = block_radius;

    ImageBuffer::from_fn(w, h, |x, y| {
        let left = x.saturating_sub(r);
        let top = y.saturating_sub(r);
        let right = (x + r).min(w - 1);
        let bottom = (y + r).min(h - 1);
        let sum = sum_image_pixels(&integral, left, top, right, bottom)[0];
        let area = u64::from(right - left + 1) * u64::from(bottom - top + 1);
        let mean = sum as f64 / area as f64;
        let fg = f64::from(gray.get_pixel(x, y)[0]) <= mean - offset;
        Luma([if fg { 255u8 } else { 0 }])
    })
}

/// Candidate text rows: external components of the row mask tall enough and
/// wide enough to be full-width text lines, sorted top to bottom.
pub fn detect_rows(row_mask: &GrayImage) -> Vec<TextRow> {
    let min_width = ((row_mask.width() as f32) * ROW_MIN_WIDTH_FRAC) as u32;
    let mut rows: Vec<TextRow> = component_bboxes(row_mask)
        .into_iter()
        .filter(|b| b.height() > ROW_MIN_HEIGHT_PX && b.width() > min_width)
        .map(|b| TextRow { top: b.top, bottom: b.bottom + 1 })
        .collect();
    rows.sort_by_key(|r| (r.top, r.bottom));
    rows
}

/// Merge adjacent rows whose vertical gap is under [`ROW_MERGE_GAP_PX`]
/// (multi-line item names split across detected boxes). Input must be sorted
/// by `top`.
pub fn merge_rows(rows: &[TextRow]) -> Vec<TextRow> {
    let mut merged: Vec<TextRow> = Vec::with_capacity(rows.len());
    for &row in rows {
        match merged.last_mut() {
            Some(last) if row.top < last.bottom + ROW_MERGE_GAP_PX => {
                last.bottom = last.bottom.max(row.bottom);
            }
            _ => merged.push(row),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(top: u32, bottom: u32) -> TextRow {
        TextRow { top, bottom }
    }

    // ── merging ───────────────────────────────────────────────────────────────

    #[test]
    fn rows_with_small_gap_merge() {
        // 15 px gap: one row.
        let merged = merge_rows(&[row(0, 100), row(115, 160)]);
        assert_eq!(merged, vec![row(0, 160)]);
    }

    #[test]
    fn rows_with_large_gap_stay_separate() {
        // 25 px gap: two rows.
        let merged = merge_rows(&[row(0, 100), row(125, 160)]);
        assert_eq!(merged, vec![row(0, 100), row(125, 160)]);
    }

    #[test]
    fn contained_row_is_absorbed() {
        let merged = merge_rows(&[row(0, 100), row(20, 60)]);
        assert_eq!(merged, vec![row(0, 100)]);
    }

    #[test]
    fn merge_of_empty_input_is_empty() {
        assert!(merge_rows(&[]).is_empty());
    }

    #[test]
    fn chain_of_close_rows_collapses() {
        let merged = merge_rows(&[row(0, 50), row(60, 110), row(120, 170)]);
        assert_eq!(merged, vec![row(0, 170)]);
    }

    // ── cropping ──────────────────────────────────────────────────────────────

    #[test]
    fn crop_takes_middle_band() {
        let img = DynamicImage::new_luma8(100, 400);
        let band = crop_item_band(&img);
        // 15%..90% of 400 = rows 60..360.
        assert_eq!(band.height(), 300);
        assert_eq!(band.width(), 100);
    }

    #[test]
    fn crop_of_tiny_image_keeps_it_whole() {
        let img = DynamicImage::new_luma8(10, 1);
        let band = crop_item_band(&img);
        assert_eq!(band.height(), 1);
    }

    // ── detection on a synthetic band ─────────────────────────────────────────

    /// A text-like stripe: dark pixels interleaved with background, the way
    /// glyphs leave local contrast everywhere (a solid block would be hollow
    /// under a local-mean threshold).
    fn band_with_text_stripe(w: u32, h: u32, y0: u32, y1: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(w, h, |x, y| {
            let ink = (y0..y1).contains(&y) && (x + y) % 3 != 0;
            Luma([if ink { 0u8 } else { 255 }])
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn full_width_text_stripe_is_detected_as_row() {
        let band = band_with_text_stripe(300, 200, 40, 100);
        let mask = threshold_rows(&band);
        let rows = detect_rows(&mask);
        assert_eq!(rows, vec![row(40, 100)], "rows: {rows:?}");
    }

    #[test]
    fn short_stripe_is_filtered_out() {
        // 20 px tall: under the 40 px row-height gate.
        let band = band_with_text_stripe(300, 200, 40, 60);
        let mask = threshold_rows(&band);
        assert!(detect_rows(&mask).is_empty());
    }

    #[test]
    fn uniform_band_has_no_rows() {
        let band = DynamicImage::new_luma8(300, 200);
        let mask = threshold_rows(&band);
        assert!(detect_rows(&mask).is_empty());
    }
}

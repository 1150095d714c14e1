//! Bitmap preprocessing: turn a noisy receipt screenshot into clean
//! black-on-white text for the OCR engine.
//!
//! Order matters here: separator lines must be removed before small-blob
//! removal, otherwise line fragments left by the opening would be counted as
//! valid small glyphs.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::io::Cursor;
use thiserror::Error;

/// Linear contrast gain separating faint print from background.
pub const CONTRAST_GAIN: f32 = 1.5;
/// Width of the horizontal opening kernel, as a fraction of image width.
pub const SEPARATOR_KERNEL_WIDTH_FRAC: f32 = 0.1;
/// Opening passes applied when isolating separator rules.
const SEPARATOR_OPEN_ITERATIONS: usize = 2;
/// Foreground components smaller than this area are icon fragments/noise.
pub const MIN_BLOB_AREA_PX: u32 = 15;
/// Foreground components shorter than this are too short to be glyphs.
pub const MIN_BLOB_HEIGHT_PX: u32 = 8;
/// Upscale factor applied before OCR; small print at 1x degrades accuracy.
pub const OCR_UPSCALE_FACTOR: f32 = 2.5;

const FG: u8 = 255;
const BG: u8 = 0;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Full cleanup pass: grayscale, contrast boost, inverse Otsu threshold,
/// separator-line removal, small-blob removal, and inversion back to black
/// text on a white background.
pub fn binarize_for_ocr(img: &DynamicImage) -> GrayImage {
    let gray = boost_contrast(&img.to_luma8(), CONTRAST_GAIN);

    // Inverse global threshold: text becomes foreground (255).
    let level = otsu_level(&gray);
    let mut mask = threshold(&gray, level, ThresholdType::BinaryInverted);

    remove_separator_lines(&mut mask);
    remove_small_blobs(&mut mask);

    // Back to black text on white for the OCR engine.
    for px in mask.pixels_mut() {
        px[0] = 255 - px[0];
    }
    mask
}

/// Saturating per-pixel linear gain (no offset).
fn boost_contrast(gray: &GrayImage, gain: f32) -> GrayImage {
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let v = (f32::from(gray.get_pixel(x, y)[0]) * gain).round().min(255.0);
        Luma([v as u8])
    })
}

/// Resize for better OCR accuracy (bicubic).
pub fn upscale_for_ocr(mask: &GrayImage) -> GrayImage {
    let w = ((mask.width() as f32) * OCR_UPSCALE_FACTOR).round().max(1.0) as u32;
    let h = ((mask.height() as f32) * OCR_UPSCALE_FACTOR).round().max(1.0) as u32;
    image::imageops::resize(mask, w, h, FilterType::CatmullRom)
}

/// Encode a processed buffer as PNG bytes for the OCR engine.
pub fn encode_as_png(img: &DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Isolate full-width separator rules with a horizontal opening and black out
/// the regions they cover in the main mask.
fn remove_separator_lines(mask: &mut GrayImage) {
    let kernel_w = (((mask.width() as f32) * SEPARATOR_KERNEL_WIDTH_FRAC) as u32).max(1);
    if mask.width() == 0 || mask.height() == 0 || kernel_w < 2 {
        return;
    }

    let mut opened = mask.clone();
    for _ in 0..SEPARATOR_OPEN_ITERATIONS {
        opened = horizontal_morph(&opened, kernel_w, true);
    }
    for _ in 0..SEPARATOR_OPEN_ITERATIONS {
        opened = horizontal_morph(&opened, kernel_w, false);
    }

    for bbox in component_bboxes(&opened) {
        for y in bbox.top..=bbox.bottom {
            for x in bbox.left..=bbox.right {
                mask.put_pixel(x, y, Luma([BG]));
            }
        }
    }
}

/// Black out every foreground component too small or too short to be a glyph.
fn remove_small_blobs(mask: &mut GrayImage) {
    if mask.width() == 0 || mask.height() == 0 {
        return;
    }
    let labels = connected_components(mask, Connectivity::Eight, Luma([BG]));

    let mut stats: Vec<ComponentStats> = Vec::new();
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0] as usize;
        if label == 0 {
            continue;
        }
        if stats.len() < label {
            stats.resize(label, ComponentStats::default());
        }
        stats[label - 1].add(x, y);
    }

    let drop: Vec<bool> = stats
        .iter()
        .map(|s| s.area < MIN_BLOB_AREA_PX || s.bbox.height() < MIN_BLOB_HEIGHT_PX)
        .collect();

    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0] as usize;
        if label > 0 && drop[label - 1] {
            mask.put_pixel(x, y, Luma([BG]));
        }
    }
}

/// One erosion (`erode = true`) or dilation pass with a `kernel_w` x 1
/// structuring element, anchored at the center.
fn horizontal_morph(mask: &GrayImage, kernel_w: u32, erode: bool) -> GrayImage {
    let (w, h) = mask.dimensions();
    let left = (kernel_w / 2) as i64;
    let right = (kernel_w - 1 - kernel_w / 2) as i64;

    ImageBuffer::from_fn(w, h, |x, y| {
        // Pixels beyond the border count as background, so an erosion near
        // the edge can never promote foreground.
        if erode && (i64::from(x) - left < 0 || i64::from(x) + right > i64::from(w) - 1) {
            return Luma([BG]);
        }
        let lo = (i64::from(x) - left).max(0) as u32;
        let hi = (i64::from(x) + right).min(i64::from(w) - 1) as u32;
        let mut acc = if erode { FG } else { BG };
        for xi in lo..=hi {
            let v = mask.get_pixel(xi, y)[0];
            acc = if erode { acc.min(v) } else { acc.max(v) };
        }
        Luma([acc])
    })
}

/// Inclusive bounding box of a labelled component.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bbox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Bbox {
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }
}

#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    area: u32,
    bbox: Bbox,
}

impl Default for ComponentStats {
    fn default() -> Self {
        Self {
            area: 0,
            bbox: Bbox { left: u32::MAX, top: u32::MAX, right: 0, bottom: 0 },
        }
    }
}

impl ComponentStats {
    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.bbox.left = self.bbox.left.min(x);
        self.bbox.top = self.bbox.top.min(y);
        self.bbox.right = self.bbox.right.max(x);
        self.bbox.bottom = self.bbox.bottom.max(y);
    }
}

/// Bounding boxes of all foreground components in a binary mask.
pub(crate) fn component_bboxes(mask: &GrayImage) -> Vec<Bbox> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([BG]));
    let mut stats: Vec<ComponentStats> = Vec::new();
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0] as usize;
        if label == 0 {
            continue;
        }
        if stats.len() < label {
            stats.resize(label, ComponentStats::default());
        }
        stats[label - 1].add(x, y);
    }
    stats.into_iter().map(|s| s.bbox).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_with_black_square(w: u32, h: u32, cx: u32, cy: u32, size: u32) -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(w, h, |x, y| {
            let inside = x >= cx && x < cx + size && y >= cy && y < cy + size;
            Luma([if inside { 0u8 } else { 255 }])
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn output_is_strictly_binary() {
        let img = white_with_black_square(200, 100, 20, 20, 12);
        let mask = binarize_for_ocr(&img);
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn glyph_sized_blob_survives_as_black_text() {
        // A 12x12 block is far narrower than the 10%-width opening kernel and
        // passes both blob gates: it must come out black on white.
        let img = white_with_black_square(200, 100, 20, 20, 12);
        let mask = binarize_for_ocr(&img);
        assert_eq!(mask.get_pixel(26, 26)[0], 0, "glyph interior should be black");
        assert_eq!(mask.get_pixel(2, 2)[0], 255, "background should be white");
    }

    #[test]
    fn tiny_blob_is_removed() {
        // 3x3 = 9 px^2 < 15 and height 3 < 8: scrubbed to background.
        let img = white_with_black_square(200, 100, 30, 30, 3);
        let mask = binarize_for_ocr(&img);
        assert!(mask.pixels().all(|p| p[0] == 255), "noise blob should be gone");
    }

    #[test]
    fn wide_flat_blob_is_removed_by_height_gate() {
        // 16x4: area 64 >= 15 but height 4 < 8.
        let img: GrayImage = ImageBuffer::from_fn(200, 100, |x, y| {
            let inside = (20..36).contains(&x) && (30..34).contains(&y);
            Luma([if inside { 0u8 } else { 255 }])
        });
        let mask = binarize_for_ocr(&DynamicImage::ImageLuma8(img));
        assert!(mask.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn full_width_separator_line_is_removed() {
        // A thin rule spanning the whole width, plus a glyph-sized blob that
        // must survive the line removal.
        let img: GrayImage = ImageBuffer::from_fn(200, 100, |x, y| {
            let on_line = (50..52).contains(&y);
            let on_glyph = (20..32).contains(&x) && (10..22).contains(&y);
            Luma([if on_line || on_glyph { 0u8 } else { 255 }])
        });
        let mask = binarize_for_ocr(&DynamicImage::ImageLuma8(img));
        assert_eq!(mask.get_pixel(100, 50)[0], 255, "separator should be gone");
        assert_eq!(mask.get_pixel(26, 16)[0], 0, "glyph should survive");
    }

    #[test]
    fn upscale_multiplies_dimensions() {
        let mask: GrayImage = ImageBuffer::from_fn(40, 20, |_, _| Luma([255u8]));
        let up = upscale_for_ocr(&mask);
        assert_eq!(up.dimensions(), (100, 50));
    }

    #[test]
    fn encode_as_png_produces_png_header() {
        let img = white_with_black_square(8, 8, 2, 2, 4);
        let bytes = encode_as_png(&img).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}

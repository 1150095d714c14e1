use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error(
        "Tesseract OCR engine not available: {0}. Install it (e.g. `apt install \
         tesseract-ocr` or `brew install tesseract`) and make sure the language \
         data is present."
    )]
    NotAvailable(String),
}

/// Page-segmentation strategy passed through to the OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationMode {
    /// Sparse text: find as much text as possible in no particular order.
    SparseText,
    /// Fully automatic page segmentation.
    Auto,
    /// Assume a single uniform block of text (per-row OCR).
    Block,
}

impl SegmentationMode {
    /// Tesseract `--psm` value.
    pub fn psm(self) -> &'static str {
        match self {
            SegmentationMode::SparseText => "11",
            SegmentationMode::Auto => "3",
            SegmentationMode::Block => "6",
        }
    }
}

/// Abstraction over an OCR backend.
/// Implementations accept raw PNG image bytes and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8], mode: SegmentationMode) -> Result<String, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string — useful for unit testing the extraction pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8], _mode: SegmentationMode) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, SegmentationMode};
    use leptess::{LepTess, Variable};

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(
            &self,
            image_bytes: &[u8],
            mode: SegmentationMode,
        ) -> Result<String, OcrError> {
            // Initialization fails when the engine or its language data is
            // missing — surfaced as NotAvailable so callers can print an
            // installation instruction.
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::NotAvailable(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, mode.psm())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::new("Amul Butter\n500g");
        assert_eq!(
            r.recognize(b"fake image data", SegmentationMode::SparseText).unwrap(),
            "Amul Butter\n500g"
        );
    }

    #[test]
    fn mock_ignores_image_content_and_mode() {
        let r = MockRecognizer::new("hello");
        assert_eq!(r.recognize(b"anything", SegmentationMode::Auto).unwrap(), "hello");
        assert_eq!(r.recognize(b"", SegmentationMode::Block).unwrap(), "hello");
    }

    #[test]
    fn segmentation_modes_map_to_tesseract_psm() {
        assert_eq!(SegmentationMode::SparseText.psm(), "11");
        assert_eq!(SegmentationMode::Auto.psm(), "3");
        assert_eq!(SegmentationMode::Block.psm(), "6");
    }
}

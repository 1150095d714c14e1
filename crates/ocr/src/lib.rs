//! Receipt OCR and line-item extraction.
//!
//! The pipeline turns a grocery-receipt screenshot into structured
//! [`larder_core::ExtractedItem`] records: load → crop to the item band →
//! segment text rows → preprocess → OCR → clean → assemble → filter. OCR
//! itself sits behind the [`OcrBackend`] trait; the real Tesseract engine is
//! optional (feature `tesseract`), and [`MockRecognizer`] covers tests.

/// Lazily compiled, process-wide regex. Patterns are static so a bad one is a
/// programming error, not a runtime condition.
macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static R: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            R.get_or_init(|| ::regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}
pub(crate) use re;

pub mod assemble;
pub mod clean;
pub mod loader;
pub mod pipeline;
pub mod preprocess;
pub mod quantity;
pub mod recognizer;
pub mod segment;

pub use assemble::assemble_items;
pub use loader::{load_image, load_image_from_bytes, LoadError};
pub use pipeline::{ExtractionPipeline, PipelineError};
pub use preprocess::PreprocessError;
pub use quantity::{parse_quantity, ParsedQuantity};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, SegmentationMode};
pub use segment::TextRow;

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;

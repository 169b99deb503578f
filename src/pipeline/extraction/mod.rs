pub mod types;
pub mod classify;
pub mod preprocess;
pub mod pdfium;
pub mod ocr;
pub mod orchestrator;

pub use types::*;
pub use classify::*;
pub use preprocess::*;
pub use ocr::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF is password-protected or encrypted")]
    PdfEncrypted,

    #[error("Failed to render page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Recognition profile '{profile}' failed: {reason}")]
    RecognitionConfig { profile: String, reason: String },

    #[error("Tesseract data not found at {0}")]
    TessdataNotFound(std::path::PathBuf),

    #[error("Recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("No usable text recovered from {page_count} page(s)")]
    NoUsableText { page_count: usize },
}

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::ocr::RecognitionProfile;
use super::ExtractionError;
use crate::models::{DocumentClass, ExtractionMethod};

/// Result of text extraction from a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub page_count: usize,
    /// What the first-page inspection concluded (advisory, see `classify_document`).
    pub classification: DocumentClass,
    pub pages: Vec<PageExtraction>,
}

/// Per-page text that made it into the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    /// 1-based page number.
    pub page_number: usize,
    pub text: String,
    /// Recognition profile that won for this page; `None` for direct text.
    pub profile: Option<String>,
}

/// What the classifier needs from the first page.
#[derive(Debug, Clone, Default)]
pub struct PageProbe {
    pub text: String,
    pub has_images: bool,
}

/// PDF page reader abstraction (text per page, image probing, rasterization).
pub trait PdfReader: Send + Sync {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Text of every page in order. The outer error means the document could
    /// not be opened; inner errors are individual page failures.
    fn page_texts(
        &self,
        pdf_bytes: &[u8],
    ) -> Result<Vec<Result<String, ExtractionError>>, ExtractionError>;

    fn probe_first_page(&self, pdf_bytes: &[u8]) -> Result<PageProbe, ExtractionError>;

    /// Rasterize a page (0-based index) at `scale` times its natural size.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, ExtractionError>;
}

/// Image recognizer abstraction (allows mocking for tests).
pub trait Recognizer: Send + Sync {
    fn recognize(
        &self,
        image_png: &[u8],
        profile: &RecognitionProfile,
    ) -> Result<String, ExtractionError>;
}

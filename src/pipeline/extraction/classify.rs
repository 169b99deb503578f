use super::types::{PageProbe, PdfReader};
use crate::models::DocumentClass;

/// Minimum trimmed character count for a page/document to count as machine-readable.
pub const TEXT_THRESHOLD_CHARS: usize = 100;

/// Decide whether a document carries a usable text layer.
///
/// Inspects the first page only. Any reader failure classifies as `Scanned`:
/// the recognition path copes with every document, the direct path does not.
pub fn classify_document(reader: &dyn PdfReader, pdf_bytes: &[u8]) -> DocumentClass {
    match reader.probe_first_page(pdf_bytes) {
        Ok(probe) => classify_probe(&probe),
        Err(e) => {
            tracing::warn!(error = %e, "First-page inspection failed, treating as scanned");
            DocumentClass::Scanned
        }
    }
}

/// Pure decision over an already-probed first page.
pub fn classify_probe(probe: &PageProbe) -> DocumentClass {
    let text_chars = trimmed_char_count(&probe.text);
    if text_chars < TEXT_THRESHOLD_CHARS || probe.has_images {
        tracing::debug!(text_chars, has_images = probe.has_images, "Classified as scanned");
        DocumentClass::Scanned
    } else {
        DocumentClass::TextBased
    }
}

pub(crate) fn trimmed_char_count(text: &str) -> usize {
    text.trim().chars().count()
}

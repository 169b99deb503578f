use rayon::prelude::*;
use tracing::{info, warn};

use super::classify::{classify_document, trimmed_char_count, TEXT_THRESHOLD_CHARS};
use super::ocr::RecognitionProfile;
use super::preprocess::prepare_png;
use super::types::{ExtractionResult, PageExtraction, PdfReader, Recognizer};
use super::ExtractionError;
use crate::models::ExtractionMethod;

/// Pages are rendered at least at twice their natural size.
pub const MIN_RENDER_SCALE: f32 = 2.0;

/// Produces the best available plain text for a PDF.
///
/// Direct text-layer extraction runs first. Only when it yields
/// `TEXT_THRESHOLD_CHARS` or fewer trimmed characters does the extractor
/// rasterize each page and run every recognition profile on it.
pub struct DocumentExtractor {
    reader: Box<dyn PdfReader>,
    recognizer: Box<dyn Recognizer>,
    profiles: Vec<RecognitionProfile>,
    render_scale: f32,
    max_page_workers: usize,
}

impl DocumentExtractor {
    pub fn new(
        reader: Box<dyn PdfReader>,
        recognizer: Box<dyn Recognizer>,
        profiles: Vec<RecognitionProfile>,
    ) -> Self {
        Self {
            reader,
            recognizer,
            profiles,
            render_scale: 4.0,
            max_page_workers: 4,
        }
    }

    pub fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale.max(MIN_RENDER_SCALE);
        self
    }

    pub fn with_max_page_workers(mut self, workers: usize) -> Self {
        self.max_page_workers = workers.max(1);
        self
    }

    pub fn reader(&self) -> &dyn PdfReader {
        self.reader.as_ref()
    }

    pub fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let classification = classify_document(self.reader.as_ref(), pdf_bytes);

        let direct_pages = match self.reader.page_texts(pdf_bytes) {
            Ok(pages) => pages,
            Err(e) => {
                warn!(error = %e, "Direct text extraction unavailable, falling back to recognition");
                Vec::new()
            }
        };

        let page_count = direct_pages.len();
        let pages: Vec<PageExtraction> = direct_pages
            .into_iter()
            .enumerate()
            .filter_map(|(index, page)| match page {
                Ok(text) => Some(PageExtraction {
                    page_number: index + 1,
                    text,
                    profile: None,
                }),
                Err(e) => {
                    warn!(page = index + 1, error = %e, "Page text extraction failed");
                    None
                }
            })
            .collect();
        let direct_text = join_pages(&pages);

        let direct_chars = trimmed_char_count(&direct_text);
        if direct_chars > TEXT_THRESHOLD_CHARS {
            info!(
                page_count,
                chars = direct_chars,
                classification = classification.as_str(),
                "Direct text extraction succeeded"
            );
            return Ok(ExtractionResult {
                text: direct_text,
                method: ExtractionMethod::TextBased,
                page_count,
                classification,
                pages,
            });
        }

        info!(
            direct_chars,
            "Direct text below threshold, running recognition"
        );
        self.extract_by_recognition(pdf_bytes, classification)
    }

    fn extract_by_recognition(
        &self,
        pdf_bytes: &[u8],
        classification: crate::models::DocumentClass,
    ) -> Result<ExtractionResult, ExtractionError> {
        let page_count = self.reader.page_count(pdf_bytes)?;
        if page_count == 0 {
            return Err(ExtractionError::NoUsableText { page_count });
        }

        let workers = page_count.min(self.max_page_workers).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ExtractionError::WorkerPool(e.to_string()))?;

        let recognized: Vec<Option<PageExtraction>> = pool.install(|| {
            (0..page_count)
                .into_par_iter()
                .map(|index| self.recognize_page(pdf_bytes, index))
                .collect()
        });

        let pages: Vec<PageExtraction> = recognized.into_iter().flatten().collect();
        let text = join_pages(&pages);
        if text.trim().is_empty() {
            warn!(page_count, "Recognition produced no text");
            return Err(ExtractionError::NoUsableText { page_count });
        }

        info!(
            page_count,
            pages_recognized = pages.len(),
            chars = trimmed_char_count(&text),
            workers,
            "Recognition extraction complete"
        );

        Ok(ExtractionResult {
            text,
            method: ExtractionMethod::ScannedOcr,
            page_count,
            classification,
            pages,
        })
    }

    /// Render, prepare and recognize one page under every profile.
    /// `None` when the page cannot be rendered or every profile fails.
    fn recognize_page(&self, pdf_bytes: &[u8], index: usize) -> Option<PageExtraction> {
        let page_number = index + 1;

        let image = match self.reader.render_page(pdf_bytes, index, self.render_scale) {
            Ok(image) => image,
            Err(e) => {
                warn!(page = page_number, error = %e, "Page render failed, skipping");
                return None;
            }
        };

        let png = match prepare_png(&image) {
            Ok(png) => png,
            Err(e) => {
                warn!(page = page_number, error = %e, "Page preparation failed, skipping");
                return None;
            }
        };

        let candidates: Vec<(&RecognitionProfile, String)> = self
            .profiles
            .iter()
            .filter_map(|profile| match self.recognizer.recognize(&png, profile) {
                Ok(text) => Some((profile, text)),
                Err(e) => {
                    warn!(page = page_number, profile = profile.name, error = %e, "Recognition profile failed");
                    None
                }
            })
            .collect();

        match select_longest(candidates) {
            Some((profile, text)) => Some(PageExtraction {
                page_number,
                text,
                profile: Some(profile.name.to_string()),
            }),
            None => {
                warn!(page = page_number, "Every recognition profile failed, skipping page");
                None
            }
        }
    }
}

/// Pick the output with the most trimmed characters. Ties keep the earliest profile.
pub fn select_longest<P>(candidates: Vec<(P, String)>) -> Option<(P, String)> {
    let mut best: Option<(P, String)> = None;
    for (profile, text) in candidates {
        let len = trimmed_char_count(&text);
        let better = match &best {
            Some((_, current)) => len > trimmed_char_count(current),
            None => true,
        };
        if better {
            best = Some((profile, text));
        }
    }
    best
}

fn join_pages(pages: &[PageExtraction]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

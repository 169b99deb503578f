//! Document ingestion: classify → extract → segment → generate → flatten.
//!
//! Uses trait-based DI for every collaborator (PDF reader, recognizer,
//! candidate generator) so the pipeline stays testable with mocks.
//! Records produced here are NOT stored; deploying them is a separate
//! merge step in the service layer.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{LedgerConfig, MAX_BATCH_DOCUMENTS};
use crate::models::{DocumentClass, ExtractionMethod, WellRecord};
use crate::pipeline::extraction::pdfium::PdfiumReader;
use crate::pipeline::extraction::{build_recognizer, default_profiles, DocumentExtractor, ExtractionError};
use crate::pipeline::segment::segment_wells;
use crate::pipeline::structuring::{
    build_extraction_prompt, AnthropicClient, CandidateGenerator, CandidateRecord,
    LlmCandidateGenerator, StructuringError,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Structuring failed: {0}")]
    Structuring(#[from] StructuringError),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Batch of {count} documents exceeds the limit of {max}")]
    TooManyDocuments { count: usize, max: usize },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl ProcessingError {
    /// Stable machine-readable tag for outcomes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Extraction(ExtractionError::NoUsableText { .. }) => "NO_USABLE_TEXT",
            Self::Extraction(ExtractionError::PdfEncrypted) => "PDF_ENCRYPTED",
            Self::Extraction(_) => "EXTRACTION_FAILED",
            Self::Structuring(StructuringError::InvalidCandidateFormat(_)) => {
                "INVALID_CANDIDATE_FORMAT"
            }
            Self::Structuring(_) => "GENERATION_FAILED",
            Self::Read { .. } => "READ_FAILED",
            Self::TooManyDocuments { .. } => "TOO_MANY_DOCUMENTS",
            Self::WorkerPool(_) => "INTERNAL",
        }
    }
}

// ---------------------------------------------------------------------------
// Input / result types
// ---------------------------------------------------------------------------

/// One uploaded document; lives only for the ingestion call.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ProcessingError> {
        let bytes = std::fs::read(path).map_err(|source| ProcessingError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// Extraction stage summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    pub method: ExtractionMethod,
    pub classification: DocumentClass,
    pub page_count: usize,
    pub pages_with_text: usize,
    pub text_length: usize,
}

/// Everything produced for one successfully processed document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutput {
    pub filename: String,
    pub extraction: ExtractionSummary,
    pub block_count: usize,
    pub candidate: CandidateRecord,
    pub records: Vec<WellRecord>,
    pub duration_ms: u64,
}

/// Per-document result inside a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DocumentOutcome {
    Success(DocumentOutput),
    #[serde(rename_all = "camelCase")]
    Failed {
        filename: String,
        code: &'static str,
        message: String,
    },
}

impl DocumentOutcome {
    pub fn filename(&self) -> &str {
        match self {
            Self::Success(output) => &output.filename,
            Self::Failed { filename, .. } => filename,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Aggregate result of one ingestion call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub processed_at: DateTime<Utc>,
    pub documents: Vec<DocumentOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl BatchOutcome {
    /// Records from every successful document, in document order.
    pub fn records(&self) -> Vec<WellRecord> {
        self.documents
            .iter()
            .filter_map(|d| match d {
                DocumentOutcome::Success(output) => Some(output.records.iter().cloned()),
                DocumentOutcome::Failed { .. } => None,
            })
            .flatten()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives a document through the full pipeline.
pub struct DocumentProcessor {
    extractor: DocumentExtractor,
    generator: Box<dyn CandidateGenerator>,
    max_document_workers: usize,
}

impl DocumentProcessor {
    pub fn new(extractor: DocumentExtractor, generator: Box<dyn CandidateGenerator>) -> Self {
        Self {
            extractor,
            generator,
            max_document_workers: crate::config::DEFAULT_DOCUMENT_WORKERS,
        }
    }

    pub fn with_max_document_workers(mut self, workers: usize) -> Self {
        self.max_document_workers = workers.max(1);
        self
    }

    /// Full pipeline for one document.
    pub fn process(&self, document: &Document) -> Result<DocumentOutput, ProcessingError> {
        let start = Instant::now();
        tracing::info!(filename = %document.filename, bytes = document.bytes.len(), "Processing document");

        let extraction = self.extractor.extract(&document.bytes)?;
        let blocks = segment_wells(&extraction.text);
        let prompt = build_extraction_prompt(&blocks);
        let candidate = self.generator.generate(&prompt)?;
        let records = candidate.clone().into_well_records();

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            filename = %document.filename,
            method = extraction.method.as_str(),
            blocks = blocks.len(),
            records = records.len(),
            duration_ms,
            "Document processed"
        );

        Ok(DocumentOutput {
            filename: document.filename.clone(),
            extraction: ExtractionSummary {
                method: extraction.method,
                classification: extraction.classification,
                page_count: extraction.page_count,
                pages_with_text: extraction.pages.len(),
                text_length: extraction.text.chars().count(),
            },
            block_count: blocks.len(),
            candidate,
            records,
            duration_ms,
        })
    }

    /// Process documents in parallel; one document's failure never affects another.
    ///
    /// Outcomes come back in input order.
    pub fn process_batch(&self, documents: &[Document]) -> Result<BatchOutcome, ProcessingError> {
        if documents.len() > MAX_BATCH_DOCUMENTS {
            return Err(ProcessingError::TooManyDocuments {
                count: documents.len(),
                max: MAX_BATCH_DOCUMENTS,
            });
        }

        let start = Instant::now();
        let batch_id = Uuid::new_v4();
        let workers = documents.len().min(self.max_document_workers).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ProcessingError::WorkerPool(e.to_string()))?;

        let outcomes: Vec<DocumentOutcome> = pool.install(|| {
            documents
                .par_iter()
                .map(|doc| match self.process(doc) {
                    Ok(output) => DocumentOutcome::Success(output),
                    Err(e) => {
                        tracing::warn!(filename = %doc.filename, error = %e, "Document failed");
                        DocumentOutcome::Failed {
                            filename: doc.filename.clone(),
                            code: e.code(),
                            message: e.to_string(),
                        }
                    }
                })
                .collect()
        });

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(%batch_id, succeeded, failed, workers, duration_ms, "Batch processed");

        Ok(BatchOutcome {
            batch_id,
            processed_at: Utc::now(),
            documents: outcomes,
            succeeded,
            failed,
            duration_ms,
        })
    }
}

/// Wire the production collaborators from configuration.
///
/// Fails when PDFium cannot be loaded or no API key is configured. A missing
/// recognizer only warns: text-layer documents still process.
pub fn build_processor(config: &LedgerConfig) -> Result<DocumentProcessor, ProcessingError> {
    let reader = PdfiumReader::new()?;

    let recognizer = build_recognizer(config.tessdata_dir.as_deref(), &config.ocr_language);

    let extractor = DocumentExtractor::new(Box::new(reader), recognizer, default_profiles())
        .with_render_scale(config.render_scale)
        .with_max_page_workers(config.max_ocr_workers);

    let client = AnthropicClient::new(
        config.anthropic_api_key.as_deref().unwrap_or_default(),
        &config.anthropic_model,
        config.llm_timeout_secs,
    )?;
    tracing::info!(model = %config.anthropic_model, "Document processor using LLM model");

    Ok(
        DocumentProcessor::new(extractor, Box::new(LlmCandidateGenerator::new(Box::new(client))))
            .with_max_document_workers(config.max_document_workers),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ocr::MockRecognizer;
    use crate::pipeline::extraction::pdfium::MockPdfReader;
    use crate::pipeline::structuring::MockLlmClient;

    const CANDIDATE_JSON: &str = r#"{
        "operator": "Acme Oil Company",
        "entity": "Smith Family Trust",
        "state": "Texas",
        "county": "Reeves",
        "effectiveDate": "2024-01-01",
        "wells": [
            {"propertyName": "Smith 1H", "decimalInterest": "0.00125"},
            {"propertyName": "Smith 2H", "decimalInterest": "12.5%"}
        ]
    }"#;

    fn text_page() -> String {
        "ACME OIL COMPANY DIVISION ORDER\n\
         Property: Smith 1H Section 12 Township 4N Range 9W\n\
         Owner: Smith Family Trust\n\
         Decimal Interest: 0.00125\n\
         Property: Smith 2H Section 13\n\
         Decimal Interest: 12.5%"
            .to_string()
    }

    fn processor(reader: MockPdfReader, recognizer: MockRecognizer, llm: MockLlmClient) -> DocumentProcessor {
        let extractor =
            DocumentExtractor::new(Box::new(reader), Box::new(recognizer), default_profiles());
        DocumentProcessor::new(extractor, Box::new(LlmCandidateGenerator::new(Box::new(llm))))
    }

    #[test]
    fn text_document_flows_to_records() {
        let p = processor(
            MockPdfReader::with_pages(vec![Ok(text_page())]),
            MockRecognizer::new("unused"),
            MockLlmClient::new(CANDIDATE_JSON),
        );
        let output = p.process(&Document::new("order.pdf", b"%PDF".to_vec())).unwrap();
        assert_eq!(output.extraction.method, ExtractionMethod::TextBased);
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[0].operator.as_deref(), Some("Acme Oil Company"));
        // Normalization happens at merge time, not here.
        assert_eq!(output.records[1].decimal_interest.as_deref(), Some("12.5%"));
        assert!(output.block_count >= 2);
    }

    #[test]
    fn scanned_document_uses_recognition() {
        let p = processor(
            MockPdfReader::scanned(2),
            MockRecognizer::new("Property: Smith 1H\nDecimal Interest: 0.00125"),
            MockLlmClient::new(CANDIDATE_JSON),
        );
        let output = p.process(&Document::new("scan.pdf", b"%PDF".to_vec())).unwrap();
        assert_eq!(output.extraction.method, ExtractionMethod::ScannedOcr);
        assert_eq!(output.extraction.page_count, 2);
        assert_eq!(output.extraction.pages_with_text, 2);
    }

    #[test]
    fn invalid_model_output_is_terminal_for_document() {
        let p = processor(
            MockPdfReader::with_pages(vec![Ok(text_page())]),
            MockRecognizer::new("unused"),
            MockLlmClient::new("Sorry, I cannot help with that."),
        );
        let err = p.process(&Document::new("order.pdf", vec![])).unwrap_err();
        assert_eq!(err.code(), "INVALID_CANDIDATE_FORMAT");
    }

    #[test]
    fn unreadable_scan_is_extraction_failure() {
        let p = processor(
            MockPdfReader::scanned(1),
            MockRecognizer::failing(),
            MockLlmClient::new(CANDIDATE_JSON),
        );
        let err = p.process(&Document::new("blank.pdf", vec![])).unwrap_err();
        assert_eq!(err.code(), "NO_USABLE_TEXT");
    }

    #[test]
    fn batch_isolates_failures_and_keeps_order() {
        let p = processor(
            MockPdfReader::with_pages(vec![Ok(text_page())]),
            MockRecognizer::new("unused"),
            MockLlmClient::new(CANDIDATE_JSON),
        )
        .with_max_document_workers(2);

        let docs = vec![
            Document::new("a.pdf", vec![]),
            Document::new("b.pdf", vec![]),
            Document::new("c.pdf", vec![]),
        ];
        let outcome = p.process_batch(&docs).unwrap();
        assert_eq!(outcome.succeeded, 3);
        assert_eq!(outcome.failed, 0);
        let names: Vec<_> = outcome.documents.iter().map(|d| d.filename()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(outcome.records().len(), 6);
    }

    #[test]
    fn batch_reports_failed_document_with_code() {
        let llm = MockLlmClient::new(CANDIDATE_JSON).fail_when_prompt_contains("Smith 2H", "model offline");
        let p = processor(
            MockPdfReader::with_pages(vec![Ok(text_page())]),
            MockRecognizer::new("unused"),
            llm,
        );
        let outcome = p
            .process_batch(&[Document::new("only.pdf", vec![])])
            .unwrap();
        assert_eq!(outcome.failed, 1);
        match &outcome.documents[0] {
            DocumentOutcome::Failed { filename, code, message } => {
                assert_eq!(filename, "only.pdf");
                assert_eq!(*code, "GENERATION_FAILED");
                assert!(message.contains("model offline"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    /// Treats the document bytes as a single-page text layer.
    struct BytesAsText;

    impl crate::pipeline::extraction::PdfReader for BytesAsText {
        fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
            Ok(1)
        }

        fn page_texts(
            &self,
            pdf_bytes: &[u8],
        ) -> Result<Vec<Result<String, ExtractionError>>, ExtractionError> {
            Ok(vec![Ok(String::from_utf8_lossy(pdf_bytes).into_owned())])
        }

        fn probe_first_page(
            &self,
            pdf_bytes: &[u8],
        ) -> Result<crate::pipeline::extraction::PageProbe, ExtractionError> {
            Ok(crate::pipeline::extraction::PageProbe {
                text: String::from_utf8_lossy(pdf_bytes).into_owned(),
                has_images: false,
            })
        }

        fn render_page(
            &self,
            _pdf_bytes: &[u8],
            page_index: usize,
            _scale: f32,
        ) -> Result<image::DynamicImage, ExtractionError> {
            Err(ExtractionError::PdfRendering {
                page: page_index + 1,
                reason: "text only".into(),
            })
        }
    }

    #[test]
    fn one_failing_document_does_not_affect_siblings() {
        let extractor = DocumentExtractor::new(
            Box::new(BytesAsText),
            Box::new(MockRecognizer::new("")),
            default_profiles(),
        );
        let llm = MockLlmClient::new(CANDIDATE_JSON).fail_when_prompt_contains("Jones 7H", "rate limited");
        let p = DocumentProcessor::new(extractor, Box::new(LlmCandidateGenerator::new(Box::new(llm))));

        let good = text_page().into_bytes();
        let bad = text_page().replace("Smith 2H", "Jones 7H").into_bytes();
        let docs = vec![
            Document::new("good-1.pdf", good.clone()),
            Document::new("bad.pdf", bad),
            Document::new("good-2.pdf", good),
        ];

        let outcome = p.process_batch(&docs).unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert!(outcome.documents[0].is_success());
        assert!(!outcome.documents[1].is_success());
        assert!(outcome.documents[2].is_success());
        assert_eq!(outcome.documents[1].filename(), "bad.pdf");
        assert_eq!(outcome.records().len(), 4);
    }

    #[test]
    fn batch_limit_is_enforced() {
        let p = processor(
            MockPdfReader::with_pages(vec![Ok(text_page())]),
            MockRecognizer::new("unused"),
            MockLlmClient::new(CANDIDATE_JSON),
        );
        let docs: Vec<_> = (0..MAX_BATCH_DOCUMENTS + 1)
            .map(|i| Document::new(format!("{i}.pdf"), vec![]))
            .collect();
        assert!(matches!(
            p.process_batch(&docs),
            Err(ProcessingError::TooManyDocuments { .. })
        ));
    }

    #[test]
    fn empty_batch_is_empty_outcome() {
        let p = processor(
            MockPdfReader::with_pages(vec![]),
            MockRecognizer::new(""),
            MockLlmClient::new("{}"),
        );
        let outcome = p.process_batch(&[]).unwrap();
        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.succeeded + outcome.failed, 0);
    }

    #[test]
    fn outcome_serializes_status_tag() {
        let failed = DocumentOutcome::Failed {
            filename: "x.pdf".into(),
            code: "NO_USABLE_TEXT",
            message: "nothing".into(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["code"], "NO_USABLE_TEXT");
    }

    #[test]
    fn document_from_missing_path_is_read_error() {
        let err = Document::from_path(Path::new("/nonexistent/order.pdf")).unwrap_err();
        assert_eq!(err.code(), "READ_FAILED");
    }
}

//! PDF access via Google PDFium: per-page text, first-page probing and
//! page rasterization for the recognition path.
//!
//! `PdfiumReader` is stateless (`Send + Sync`). Each operation creates
//! a fresh `Pdfium` instance because the upstream type is `!Send`.
//! The OS caches `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use image::{DynamicImage, GrayImage, Luma};
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::{PageProbe, PdfReader};
use super::ExtractionError;

/// Maximum dimension (width or height) for rendered page images.
pub const MAX_RENDER_DIMENSION_PX: u32 = 4096;

/// Reads and renders PDFs with PDFium.
pub struct PdfiumReader;

impl PdfiumReader {
    /// Create a new reader, verifying the PDFium library is loadable.
    pub fn new() -> Result<Self, ExtractionError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path)
/// 2. Alongside the running executable, or its `lib/` sibling
/// 3. System library search paths
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::PdfParsing(format!("Failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let candidates = [
                exe_dir.to_path_buf(),
                exe_dir.join("lib"),
                exe_dir.join("..").join("lib"),
            ];

            for dir in &candidates {
                let lib_path = Pdfium::pdfium_platform_library_name_at_path(
                    dir.to_string_lossy().as_ref(),
                );
                if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                    debug!(dir = %dir.display(), "Loaded PDFium from candidate directory");
                    return Ok(Pdfium::new(bindings));
                }
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionError::PdfParsing(format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors, detecting encrypted PDFs.
fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = format!("{e}");
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(format!("Failed to load PDF: {e}"))
    }
}

/// Pixel dimensions for rendering a page at `scale` times its point size.
///
/// Returns (width_px, height_px), both clamped to [1, MAX_RENDER_DIMENSION_PX].
/// Preserves aspect ratio when capping.
fn compute_render_dimensions(width_points: f32, height_points: f32, scale: f32) -> (u32, u32) {
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_RENDER_DIMENSION_PX as f32 {
        let ratio = MAX_RENDER_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_RENDER_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_RENDER_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl PdfReader for PdfiumReader {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;
        Ok(document.pages().len() as usize)
    }

    fn page_texts(
        &self,
        pdf_bytes: &[u8],
    ) -> Result<Vec<Result<String, ExtractionError>>, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let texts = document
            .pages()
            .iter()
            .enumerate()
            .map(|(index, page)| {
                page.text().map(|t| t.all()).map_err(|e| {
                    ExtractionError::PdfParsing(format!("Page {} text unavailable: {e}", index + 1))
                })
            })
            .collect();
        Ok(texts)
    }

    fn probe_first_page(&self, pdf_bytes: &[u8]) -> Result<PageProbe, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let page = document
            .pages()
            .get(0)
            .map_err(|e| ExtractionError::PdfParsing(format!("Document has no first page: {e}")))?;

        let text = page
            .text()
            .map(|t| t.all())
            .map_err(|e| ExtractionError::PdfParsing(format!("First page text unavailable: {e}")))?;

        let has_images = page
            .objects()
            .iter()
            .any(|object| object_shape(&object).contains_image());

        Ok(PageProbe { text, has_images })
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let pages = document.pages();

        let index = u16::try_from(page_index).map_err(|_| ExtractionError::PdfRendering {
            page: page_index + 1,
            reason: format!("Page index {page_index} exceeds u16 maximum"),
        })?;

        let page = pages.get(index).map_err(|_| ExtractionError::PdfRendering {
            page: page_index + 1,
            reason: format!(
                "Page {} out of range (document has {} pages)",
                page_index + 1,
                pages.len()
            ),
        })?;

        let width_points = page.width().value;
        let height_points = page.height().value;
        let (target_w, target_h) = compute_render_dimensions(width_points, height_points, scale);

        let uncapped_w = (width_points * scale) as u32;
        let uncapped_h = (height_points * scale) as u32;
        if target_w != uncapped_w || target_h != uncapped_h {
            warn!(
                page = page_index + 1,
                raw_width = uncapped_w,
                raw_height = uncapped_h,
                capped_width = target_w,
                capped_height = target_h,
                "Page dimensions capped to {MAX_RENDER_DIMENSION_PX}px",
            );
        }

        let config = PdfRenderConfig::new()
            .set_target_width(target_w as i32)
            .set_maximum_height(target_h as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ExtractionError::PdfRendering {
                page: page_index + 1,
                reason: format!("Rendering failed: {e}"),
            })?;

        debug!(
            page = page_index + 1,
            width = target_w,
            height = target_h,
            "Rendered PDF page"
        );

        Ok(bitmap.as_image())
    }
}

/// What first-page image detection needs from a page object. Form XObjects nest their
/// own object lists, so scanned pages wrapped in a form still count.
#[derive(Debug, PartialEq)]
enum ObjectShape {
    Image,
    Form(Vec<ObjectShape>),
    Other,
}

impl ObjectShape {
    fn contains_image(&self) -> bool {
        match self {
            Self::Image => true,
            Self::Form(children) => children.iter().any(Self::contains_image),
            Self::Other => false,
        }
    }
}

fn object_shape(object: &PdfPageObject) -> ObjectShape {
    match object {
        PdfPageObject::Image(_) => ObjectShape::Image,
        PdfPageObject::XObjectForm(form) => {
            ObjectShape::Form(form.iter().map(|child| object_shape(&child)).collect())
        }
        _ => ObjectShape::Other,
    }
}

// ── Mock for testing ──────────────────────────────────────

/// In-memory PDF reader with scripted page texts.
///
/// A page scripted as `Err(reason)` fails text extraction; pages listed in
/// `failing_renders` fail rasterization. Rendering otherwise yields a small
/// white page.
pub struct MockPdfReader {
    pages: Vec<Result<String, String>>,
    first_page_has_images: bool,
    failing_renders: Vec<usize>,
    unreadable: bool,
}

impl MockPdfReader {
    pub fn with_pages(pages: Vec<Result<String, String>>) -> Self {
        Self {
            pages,
            first_page_has_images: false,
            failing_renders: Vec::new(),
            unreadable: false,
        }
    }

    /// `count` pages with no text layer and an embedded image each.
    pub fn scanned(count: usize) -> Self {
        Self {
            pages: vec![Ok(String::new()); count],
            first_page_has_images: true,
            failing_renders: Vec::new(),
            unreadable: false,
        }
    }

    /// A document that cannot be opened at all.
    pub fn unreadable() -> Self {
        Self {
            pages: Vec::new(),
            first_page_has_images: false,
            failing_renders: Vec::new(),
            unreadable: true,
        }
    }

    pub fn with_images(mut self) -> Self {
        self.first_page_has_images = true;
        self
    }

    /// Make rendering fail for the given 0-based page indices.
    pub fn failing_renders(mut self, pages: Vec<usize>) -> Self {
        self.failing_renders = pages;
        self
    }

    fn check_readable(&self) -> Result<(), ExtractionError> {
        if self.unreadable {
            Err(ExtractionError::PdfParsing("mock document is unreadable".into()))
        } else {
            Ok(())
        }
    }
}

impl PdfReader for MockPdfReader {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        self.check_readable()?;
        Ok(self.pages.len())
    }

    fn page_texts(
        &self,
        _pdf_bytes: &[u8],
    ) -> Result<Vec<Result<String, ExtractionError>>, ExtractionError> {
        self.check_readable()?;
        Ok(self
            .pages
            .iter()
            .map(|p| p.clone().map_err(ExtractionError::PdfParsing))
            .collect())
    }

    fn probe_first_page(&self, _pdf_bytes: &[u8]) -> Result<PageProbe, ExtractionError> {
        self.check_readable()?;
        match self.pages.first() {
            Some(Ok(text)) => Ok(PageProbe {
                text: text.clone(),
                has_images: self.first_page_has_images,
            }),
            Some(Err(reason)) => Err(ExtractionError::PdfParsing(reason.clone())),
            None => Err(ExtractionError::PdfParsing("mock has no pages".into())),
        }
    }

    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page_index: usize,
        _scale: f32,
    ) -> Result<DynamicImage, ExtractionError> {
        self.check_readable()?;
        if page_index >= self.pages.len() || self.failing_renders.contains(&page_index) {
            return Err(ExtractionError::PdfRendering {
                page: page_index + 1,
                reason: format!("mock cannot render page index {page_index}"),
            });
        }
        Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            16,
            16,
            Luma([255u8]),
        )))
    }
}

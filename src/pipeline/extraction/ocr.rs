use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::Recognizer;
use super::ExtractionError;

/// Characters the recognizer may emit: letters, digits and the punctuation
/// found in decimal interests, legal descriptions and dates.
pub const CHAR_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789.,%()/- ";

pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// One recognizer configuration. Pages are read once per profile and the
/// longest output wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionProfile {
    pub name: &'static str,
    /// Tesseract page segmentation mode.
    pub page_seg_mode: u8,
    pub char_whitelist: Option<&'static str>,
    pub preserve_interword_spaces: bool,
}

/// Profiles tuned for division-order layouts: uniform body text, ownership
/// tables, owner lists and single-column letters.
pub fn default_profiles() -> Vec<RecognitionProfile> {
    vec![
        RecognitionProfile {
            name: "uniform_block",
            page_seg_mode: 6,
            char_whitelist: Some(CHAR_WHITELIST),
            preserve_interword_spaces: false,
        },
        RecognitionProfile {
            name: "table",
            page_seg_mode: 11,
            char_whitelist: Some(CHAR_WHITELIST),
            preserve_interword_spaces: true,
        },
        RecognitionProfile {
            name: "list",
            page_seg_mode: 3,
            char_whitelist: None,
            preserve_interword_spaces: false,
        },
        RecognitionProfile {
            name: "single_column",
            page_seg_mode: 4,
            char_whitelist: Some(CHAR_WHITELIST),
            preserve_interword_spaces: true,
        },
    ]
}

/// Engine variables a profile sets before each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineVariable {
    PageSegMode,
    CharWhitelist,
    PreserveInterwordSpaces,
}

impl EngineVariable {
    pub fn name(self) -> &'static str {
        match self {
            Self::PageSegMode => "tessedit_pageseg_mode",
            Self::CharWhitelist => "tessedit_char_whitelist",
            Self::PreserveInterwordSpaces => "preserve_interword_spaces",
        }
    }

    #[cfg(feature = "ocr")]
    fn as_leptess(self) -> leptess::Variable {
        match self {
            Self::PageSegMode => leptess::Variable::TesseditPagesegMode,
            Self::CharWhitelist => leptess::Variable::TesseditCharWhitelist,
            Self::PreserveInterwordSpaces => leptess::Variable::PreserveInterwordSpaces,
        }
    }
}

impl RecognitionProfile {
    /// Variable assignments applied to a fresh engine, in order.
    pub fn variables(&self) -> Vec<(EngineVariable, String)> {
        let mut vars = vec![(EngineVariable::PageSegMode, self.page_seg_mode.to_string())];
        if let Some(whitelist) = self.char_whitelist {
            vars.push((EngineVariable::CharWhitelist, whitelist.to_string()));
        }
        if self.preserve_interword_spaces {
            vars.push((EngineVariable::PreserveInterwordSpaces, "1".to_string()));
        }
        vars
    }
}

/// Check that trained data exists for every language in `language`
/// (`eng`, `eng+spa`).
pub fn check_tessdata(tessdata_dir: &Path, language: &str) -> Result<(), ExtractionError> {
    for lang in language.split('+').map(str::trim).filter(|l| !l.is_empty()) {
        if !tessdata_dir.join(format!("{lang}.traineddata")).exists() {
            return Err(ExtractionError::TessdataNotFound(tessdata_dir.to_path_buf()));
        }
    }
    Ok(())
}

/// Tesseract recognizer through the `leptess` binding.
/// Only available when compiled with the `ocr` feature flag.
///
/// Each call initializes an engine, applies the profile's variables and
/// reads the PNG from memory. Engines are not shared across page workers.
#[cfg(feature = "ocr")]
pub struct TesseractRecognizer {
    tessdata_dir: Option<std::path::PathBuf>,
    language: String,
}

#[cfg(feature = "ocr")]
impl TesseractRecognizer {
    /// `tessdata_dir` of `None` uses the library's default search path
    /// (`TESSDATA_PREFIX` or the install prefix).
    pub fn new(tessdata_dir: Option<&Path>, language: &str) -> Result<Self, ExtractionError> {
        if let Some(dir) = tessdata_dir {
            check_tessdata(dir, language)?;
        }
        let recognizer = Self {
            tessdata_dir: tessdata_dir.map(Path::to_path_buf),
            language: language.to_string(),
        };
        recognizer.engine()?;
        tracing::info!(language, "Tesseract recognizer initialized");
        Ok(recognizer)
    }

    fn engine(&self) -> Result<leptess::LepTess, ExtractionError> {
        let data_path = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ExtractionError::RecognizerUnavailable("Invalid tessdata path".into()))?,
            ),
            None => None,
        };
        leptess::LepTess::new(data_path, &self.language).map_err(|e| {
            ExtractionError::RecognizerUnavailable(format!(
                "Failed to initialize Tesseract with language '{}': {e}",
                self.language
            ))
        })
    }
}

#[cfg(feature = "ocr")]
impl Recognizer for TesseractRecognizer {
    fn recognize(
        &self,
        image_png: &[u8],
        profile: &RecognitionProfile,
    ) -> Result<String, ExtractionError> {
        let config_err = |reason: String| ExtractionError::RecognitionConfig {
            profile: profile.name.to_string(),
            reason,
        };

        let mut engine = self.engine()?;
        for (variable, value) in profile.variables() {
            engine
                .set_variable(variable.as_leptess(), &value)
                .map_err(|e| config_err(format!("Failed to set {}: {e}", variable.name())))?;
        }
        engine
            .set_image_from_mem(image_png)
            .map_err(|e| config_err(format!("Failed to read page image: {e}")))?;
        let text = engine
            .get_utf8_text()
            .map_err(|e| config_err(format!("Recognized text is not UTF-8: {e}")))?;

        tracing::debug!(
            profile = profile.name,
            chars = text.trim().len(),
            "Recognizer pass complete"
        );
        Ok(text)
    }
}

/// Stand-in when the crate is built without the `ocr` feature: every page
/// fails recognition, text-layer documents still process.
pub struct UnavailableRecognizer;

impl Recognizer for UnavailableRecognizer {
    fn recognize(
        &self,
        _image_png: &[u8],
        _profile: &RecognitionProfile,
    ) -> Result<String, ExtractionError> {
        Err(ExtractionError::RecognizerUnavailable(
            "built without the `ocr` feature".into(),
        ))
    }
}

/// Production recognizer for this build.
///
/// Falls back to [`UnavailableRecognizer`] when the engine cannot start so
/// that documents with a text layer are still processed.
pub fn build_recognizer(tessdata_dir: Option<&Path>, language: &str) -> Box<dyn Recognizer> {
    #[cfg(feature = "ocr")]
    {
        match TesseractRecognizer::new(tessdata_dir, language) {
            Ok(recognizer) => return Box::new(recognizer),
            Err(e) => tracing::warn!(error = %e, "Tesseract unavailable, scanned documents will fail"),
        }
    }
    #[cfg(not(feature = "ocr"))]
    {
        let _ = (tessdata_dir, language);
        tracing::warn!("Built without OCR support, scanned documents will fail");
    }
    Box::new(UnavailableRecognizer)
}

// ── Mock for testing ──────────────────────────────────────

/// Recognizer returning scripted text per profile name.
///
/// Profiles without a script return the default text. A script of
/// `Err(reason)` fails that profile.
pub struct MockRecognizer {
    default_text: String,
    by_profile: HashMap<&'static str, Result<String, String>>,
    calls: AtomicUsize,
}

impl MockRecognizer {
    pub fn new(default_text: &str) -> Self {
        Self {
            default_text: default_text.to_string(),
            by_profile: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_profile(mut self, name: &'static str, output: Result<&str, &str>) -> Self {
        self.by_profile.insert(
            name,
            output.map(str::to_string).map_err(str::to_string),
        );
        self
    }

    /// Every profile fails.
    pub fn failing() -> Self {
        let mut mock = Self::new("");
        for profile in default_profiles() {
            mock.by_profile
                .insert(profile.name, Err("mock recognizer failure".to_string()));
        }
        mock
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Recognizer for MockRecognizer {
    fn recognize(
        &self,
        _image_png: &[u8],
        profile: &RecognitionProfile,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.by_profile.get(profile.name) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(reason)) => Err(ExtractionError::RecognitionConfig {
                profile: profile.name.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(self.default_text.clone()),
        }
    }
}

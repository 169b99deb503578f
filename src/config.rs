use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "DivisionLedger";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Most documents accepted by one ingestion call.
pub const MAX_BATCH_DOCUMENTS: usize = 20;

pub const DEFAULT_RENDER_SCALE: f32 = 4.0;
pub const DEFAULT_OCR_WORKERS: usize = 4;
pub const DEFAULT_DOCUMENT_WORKERS: usize = 4;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Cannot determine home directory; set DIVISION_LEDGER_DATA_DIR")]
    NoHomeDir,

    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Default `EnvFilter` directives when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,division_ledger_lib=info,division_ledger=info,reqwest=warn,hyper=warn"
}

/// Default data directory: ~/DivisionLedger/
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown store backend '{other}' (json or sqlite)")),
        }
    }
}

/// Runtime configuration, resolved from environment variables over defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub render_scale: f32,
    pub max_ocr_workers: usize,
    pub max_document_workers: usize,
    /// Trained-data directory; `None` leaves the search to Tesseract.
    pub tessdata_dir: Option<PathBuf>,
    pub ocr_language: String,
    #[serde(skip_serializing)]
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub llm_timeout_secs: u64,
}

impl LedgerConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            store_backend: StoreBackend::Json,
            render_scale: DEFAULT_RENDER_SCALE,
            max_ocr_workers: DEFAULT_OCR_WORKERS,
            max_document_workers: DEFAULT_DOCUMENT_WORKERS,
            tessdata_dir: None,
            ocr_language: crate::pipeline::extraction::DEFAULT_OCR_LANGUAGE.to_string(),
            anthropic_api_key: None,
            anthropic_model: crate::pipeline::structuring::DEFAULT_MODEL.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let data_dir = match get("DIVISION_LEDGER_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        let mut config = Self::with_data_dir(data_dir);

        if let Some(v) = get("DIVISION_LEDGER_STORE") {
            config.store_backend = v.parse::<StoreBackend>().map_err(|reason| ConfigError::InvalidValue {
                var: "DIVISION_LEDGER_STORE",
                value: v.clone(),
                reason,
            })?;
        }
        if let Some(v) = get("DIVISION_LEDGER_RENDER_SCALE") {
            let scale: f32 = parse_var("DIVISION_LEDGER_RENDER_SCALE", &v)?;
            config.render_scale =
                scale.max(crate::pipeline::extraction::MIN_RENDER_SCALE);
        }
        if let Some(v) = get("DIVISION_LEDGER_OCR_WORKERS") {
            config.max_ocr_workers = parse_positive("DIVISION_LEDGER_OCR_WORKERS", &v)?;
        }
        if let Some(v) = get("DIVISION_LEDGER_DOC_WORKERS") {
            config.max_document_workers = parse_positive("DIVISION_LEDGER_DOC_WORKERS", &v)?;
        }
        config.tessdata_dir = get("TESSDATA_PREFIX").map(PathBuf::from);
        if let Some(v) = get("DIVISION_LEDGER_OCR_LANG") {
            config.ocr_language = v.trim().to_string();
        }
        config.anthropic_api_key = get("ANTHROPIC_API_KEY");
        if let Some(v) = get("DIVISION_LEDGER_MODEL") {
            config.anthropic_model = v;
        }
        if let Some(v) = get("DIVISION_LEDGER_LLM_TIMEOUT") {
            config.llm_timeout_secs = parse_var("DIVISION_LEDGER_LLM_TIMEOUT", &v)?;
        }

        Ok(config)
    }

    /// Snapshot location for the configured backend.
    pub fn store_path(&self) -> PathBuf {
        match self.store_backend {
            StoreBackend::Json => self.data_dir.join("records.json"),
            StoreBackend::Sqlite => self.data_dir.join("ledger.db"),
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_positive(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    let n: usize = parse_var(var, value)?;
    if n == 0 {
        return Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = LedgerConfig::from_lookup(lookup(&[("DIVISION_LEDGER_DATA_DIR", "/tmp/dl")]))
            .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(config.store_backend, StoreBackend::Json);
        assert_eq!(config.render_scale, 4.0);
        assert_eq!(config.max_ocr_workers, 4);
        assert_eq!(config.max_document_workers, 4);
        assert!(config.tessdata_dir.is_none());
        assert_eq!(config.ocr_language, "eng");
        assert!(config.anthropic_api_key.is_none());
        assert_eq!(config.anthropic_model, "claude-3-7-sonnet-20250219");
        assert_eq!(config.llm_timeout_secs, 300);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/dl/records.json"));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("DIVISION_LEDGER_DATA_DIR", "/srv/ledger"),
            ("DIVISION_LEDGER_STORE", "SQLite"),
            ("DIVISION_LEDGER_RENDER_SCALE", "3"),
            ("DIVISION_LEDGER_OCR_WORKERS", "2"),
            ("DIVISION_LEDGER_DOC_WORKERS", "8"),
            ("TESSDATA_PREFIX", "/opt/tessdata"),
            ("DIVISION_LEDGER_OCR_LANG", "eng+spa"),
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("DIVISION_LEDGER_MODEL", "claude-test"),
            ("DIVISION_LEDGER_LLM_TIMEOUT", "60"),
        ]))
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.render_scale, 3.0);
        assert_eq!(config.max_ocr_workers, 2);
        assert_eq!(config.max_document_workers, 8);
        assert_eq!(config.tessdata_dir, Some(PathBuf::from("/opt/tessdata")));
        assert_eq!(config.ocr_language, "eng+spa");
        assert_eq!(config.anthropic_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.anthropic_model, "claude-test");
        assert_eq!(config.llm_timeout_secs, 60);
        assert_eq!(config.store_path(), PathBuf::from("/srv/ledger/ledger.db"));
    }

    #[test]
    fn render_scale_is_clamped() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("DIVISION_LEDGER_DATA_DIR", "/tmp/dl"),
            ("DIVISION_LEDGER_RENDER_SCALE", "1.0"),
        ]))
        .unwrap();
        assert_eq!(config.render_scale, 2.0);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = LedgerConfig::from_lookup(lookup(&[
            ("DIVISION_LEDGER_DATA_DIR", "/tmp/dl"),
            ("DIVISION_LEDGER_OCR_WORKERS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: "DIVISION_LEDGER_OCR_WORKERS", .. }
        ));

        let err = LedgerConfig::from_lookup(lookup(&[
            ("DIVISION_LEDGER_DATA_DIR", "/tmp/dl"),
            ("DIVISION_LEDGER_DOC_WORKERS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = LedgerConfig::from_lookup(lookup(&[
            ("DIVISION_LEDGER_DATA_DIR", "/tmp/dl"),
            ("DIVISION_LEDGER_STORE", "postgres"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "DIVISION_LEDGER_STORE", .. }));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("DIVISION_LEDGER_DATA_DIR", "/tmp/dl"),
            ("ANTHROPIC_API_KEY", "   "),
        ]))
        .unwrap();
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn default_data_dir_under_home() {
        let dir = default_data_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("DivisionLedger"));
    }

    #[test]
    fn log_filter_names_crate() {
        assert!(default_log_filter().contains("division_ledger_lib"));
    }
}

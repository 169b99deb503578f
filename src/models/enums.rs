use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + case-insensitive std::str::FromStr
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ModelError::InvalidEnum {
                    field: stringify!($name).into(),
                    value: s.into(),
                })
            }
        }
    };
}

str_enum!(RecordStatus {
    Executed => "Executed",
    Curative => "Curative",
    TitleIssue => "Title issue",
    PendingReview => "Pending Review",
});

str_enum!(ExtractionMethod {
    TextBased => "TextBased",
    ScannedOcr => "ScannedOCR",
});

str_enum!(DocumentClass {
    TextBased => "TextBased",
    Scanned => "Scanned",
});

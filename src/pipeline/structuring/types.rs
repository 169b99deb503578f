use serde::{Deserialize, Serialize};

use super::StructuringError;
use crate::models::WellRecord;

/// Document-level extraction returned by the candidate generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub operator: Option<String>,
    pub entity: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub effective_date: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub wells: Vec<CandidateWell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateWell {
    pub property_name: Option<String>,
    pub property_description: Option<String>,
    pub decimal_interest: Option<String>,
}

impl CandidateRecord {
    fn has_document_fields(&self) -> bool {
        [
            &self.operator,
            &self.entity,
            &self.state,
            &self.county,
            &self.effective_date,
            &self.notes,
        ]
        .iter()
        .any(|f| f.is_some())
    }

    /// One record per well, each carrying the document-level fields.
    ///
    /// A candidate without wells still yields a single record when any
    /// document-level field was found; an entirely empty candidate yields none.
    pub fn into_well_records(self) -> Vec<WellRecord> {
        let base = WellRecord {
            operator: self.operator.clone(),
            entity: self.entity.clone(),
            state: self.state.clone(),
            county: self.county.clone(),
            effective_date: self.effective_date.clone(),
            notes: self.notes.clone(),
            ..Default::default()
        };

        if self.wells.is_empty() {
            return if self.has_document_fields() {
                vec![base]
            } else {
                Vec::new()
            };
        }

        self.wells
            .into_iter()
            .map(|well| WellRecord {
                property_name: well.property_name,
                property_description: well.property_description,
                decimal_interest: well.decimal_interest,
                ..base.clone()
            })
            .collect()
    }
}

/// Raw text completion (allows mocking for tests).
pub trait LlmClient: Send + Sync {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, StructuringError>;
}

/// Turns segmented document text into a candidate record.
pub trait CandidateGenerator: Send + Sync {
    fn generate(&self, prompt_text: &str) -> Result<CandidateRecord, StructuringError>;
}

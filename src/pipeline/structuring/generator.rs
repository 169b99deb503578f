use super::parser::parse_candidate_response;
use super::prompt::EXTRACTION_SYSTEM_PROMPT;
use super::types::{CandidateGenerator, CandidateRecord, LlmClient};
use super::StructuringError;

/// Candidate generator backed by a language model.
///
/// Sends the extraction system prompt with the segmented text and parses the
/// reply. Unparseable replies are terminal; nothing is retried.
pub struct LlmCandidateGenerator {
    client: Box<dyn LlmClient>,
}

impl LlmCandidateGenerator {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }
}

impl CandidateGenerator for LlmCandidateGenerator {
    fn generate(&self, prompt_text: &str) -> Result<CandidateRecord, StructuringError> {
        if prompt_text.trim().is_empty() {
            return Err(StructuringError::EmptyInput);
        }
        let response = self.client.complete(EXTRACTION_SYSTEM_PROMPT, prompt_text)?;
        let candidate = parse_candidate_response(&response)?;
        tracing::info!(wells = candidate.wells.len(), "Candidate record generated");
        Ok(candidate)
    }
}

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You extract ownership information from oil and gas division orders. Read the
provided text and return a single JSON object.

Where to look:
1. Operator: usually in the letterhead or first paragraph.
2. Entity/Owner: the interest owner named in the ownership section, often next to the operator.
3. State and County: in the property description or location section.
4. Effective Date: dates labelled "effective" or "commencement".
5. Wells: each listed well with
   - Property Name / Well Name
   - Property Description (legal description, section/township/range)
   - Decimal Interest (decimal or percentage, copied exactly as written)

Return this exact structure:
{
    "operator": "string",
    "entity": "string",
    "state": "string",
    "county": "string",
    "effectiveDate": "string",
    "wells": [
        {
            "propertyName": "string",
            "propertyDescription": "string",
            "decimalInterest": "string"
        }
    ]
}

Rules:
- Include only fields explicitly present in the document; omit anything not found.
- Never convert or round decimal interests.
- Return ONLY the JSON object. No markdown, no commentary.
"#;

/// Build the user prompt from segmented blocks.
///
/// Blocks are separated by a blank line so the model sees one well entry per paragraph.
pub fn build_extraction_prompt(blocks: &[String]) -> String {
    format!(
        "Please analyze this division order and extract the required information. \
         Lines that belong to the same well entry are grouped into paragraphs.\n\n{}",
        blocks.join("\n\n")
    )
}

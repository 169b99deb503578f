//! Splits extracted document text into candidate well blocks.
//!
//! Division orders list one well per paragraph or table row, each opened by
//! a line naming the well, property, interest or legal description. A block
//! starts at such a line and runs until the next one.

const WELL_KEYWORDS: &[&str] = &[
    "well", "property", "interest", "decimal", "section", "township", "range", "lease", "unit",
];

/// True when the line mentions any well keyword (case-insensitive substring).
pub fn is_well_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    WELL_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Group non-blank lines into blocks.
///
/// A keyword line closes the open block and starts a new one. Other lines
/// join the open block, or stand alone when no block is open. Lines are
/// emitted as given; whitespace-only lines are dropped and never break a block.
pub fn segment_wells(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        if is_well_line(line) {
            if let Some(block) = current.take() {
                blocks.push(block.join("\n"));
            }
            current = Some(vec![line]);
        } else if let Some(block) = current.as_mut() {
            block.push(line);
        } else {
            blocks.push(line.to_string());
        }
    }

    if let Some(block) = current {
        blocks.push(block.join("\n"));
    }

    tracing::debug!(blocks = blocks.len(), "Segmented document text");
    blocks
}

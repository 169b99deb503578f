use std::collections::HashSet;

use serde::Serialize;

use super::normalize::normalize_record;
use crate::models::{IdentityKey, WellRecord};

/// Result of merging a batch into an existing sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub merged: Vec<WellRecord>,
    pub counts: MergeCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeCounts {
    pub added: usize,
    pub duplicates_skipped: usize,
}

/// Append the incoming records that are new by identity key.
///
/// Every incoming record is normalized first. Existing records keep their
/// order and are never touched; accepted records follow in input order.
/// `added + duplicates_skipped == incoming.len()`.
pub fn merge_records(existing: &[WellRecord], incoming: Vec<WellRecord>) -> MergeResult {
    let mut seen: HashSet<IdentityKey> = existing.iter().map(WellRecord::identity_key).collect();
    let mut merged = existing.to_vec();
    let mut counts = MergeCounts::default();

    for mut record in incoming {
        normalize_record(&mut record);
        if seen.insert(record.identity_key()) {
            merged.push(record);
            counts.added += 1;
        } else {
            counts.duplicates_skipped += 1;
        }
    }

    tracing::debug!(
        existing = existing.len(),
        added = counts.added,
        duplicates_skipped = counts.duplicates_skipped,
        "Merged records"
    );

    MergeResult { merged, counts }
}

/// Drop later records whose identity key was already seen, keeping first occurrences.
///
/// Returns the deduplicated sequence and the number of records removed.
pub fn dedup_records(records: Vec<WellRecord>) -> (Vec<WellRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::new();
    let kept: Vec<WellRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.identity_key()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Store positions in dashboard order: effective date descending, ties keep store order.
pub fn dashboard_order(records: &[WellRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        records[b]
            .effective_date_sort_key()
            .cmp(records[a].effective_date_sort_key())
    });
    order
}

pub fn sorted_snapshot(records: &[WellRecord]) -> Vec<WellRecord> {
    dashboard_order(records)
        .into_iter()
        .map(|i| records[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(property: &str, operator: &str, entity: &str, date: &str) -> WellRecord {
        WellRecord {
            property_name: Some(property.into()),
            operator: Some(operator.into()),
            entity: Some(entity.into()),
            effective_date: Some(date.into()),
            ..Default::default()
        }
    }

    #[test]
    fn merge_skips_existing_identity() {
        let existing = vec![record("Well A", "Acme", "E1", "2024-01-01")];
        let incoming = vec![
            record("Well A", "Acme", "E1", "2024-01-01"),
            record("Well B", "Acme", "E1", "2024-01-01"),
        ];
        let result = merge_records(&existing, incoming);
        assert_eq!(result.counts.added, 1);
        assert_eq!(result.counts.duplicates_skipped, 1);
        assert_eq!(result.merged.len(), 2);
        assert_eq!(result.merged[1].property_name.as_deref(), Some("Well B"));
    }

    #[test]
    fn merge_keeps_first_of_duplicate_incoming() {
        let mut first = record("Well C", "Acme", "E1", "2024-03-01");
        first.county = Some("Reeves".into());
        let mut second = record("WELL C", "acme", "e1", "2024-03-01");
        second.county = Some("Loving".into());

        let result = merge_records(&[], vec![first, second]);
        assert_eq!(result.counts.added, 1);
        assert_eq!(result.counts.duplicates_skipped, 1);
        assert_eq!(result.merged[0].county.as_deref(), Some("Reeves"));
    }

    #[test]
    fn merge_counts_sum_to_incoming() {
        let existing = vec![record("A", "O", "E", "1")];
        let incoming = vec![
            record("A", "O", "E", "1"),
            record("B", "O", "E", "1"),
            record("B", "O", "E", "1"),
            record("C", "O", "E", "1"),
        ];
        let n = incoming.len();
        let result = merge_records(&existing, incoming);
        assert_eq!(result.counts.added + result.counts.duplicates_skipped, n);
    }

    #[test]
    fn merge_preserves_existing_order_and_content() {
        let mut existing = vec![
            record("Z", "O", "E", "2020-01-01"),
            record("A", "O", "E", "2025-01-01"),
        ];
        existing[0].state = Some("Texas".into());
        let result = merge_records(&existing, vec![record("M", "O", "E", "2022-01-01")]);
        assert_eq!(&result.merged[..2], &existing[..]);
        // Existing records are not renormalized on merge.
        assert_eq!(result.merged[0].state.as_deref(), Some("Texas"));
    }

    #[test]
    fn merge_normalizes_incoming() {
        let mut incoming = record("A", "O", "E", "1");
        incoming.state = Some("oklahoma".into());
        incoming.decimal_interest = Some("0.5 %".into());
        let result = merge_records(&[], vec![incoming]);
        assert_eq!(result.merged[0].state.as_deref(), Some("OK"));
        assert_eq!(result.merged[0].decimal_interest.as_deref(), Some("0.5"));
    }

    #[test]
    fn merge_is_idempotent_on_rerun() {
        let incoming = vec![record("A", "O", "E", "1"), record("B", "O", "E", "1")];
        let once = merge_records(&[], incoming.clone());
        let twice = merge_records(&once.merged, incoming);
        assert_eq!(twice.merged, once.merged);
        assert_eq!(twice.counts.added, 0);
        assert_eq!(twice.counts.duplicates_skipped, 2);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut a = record("A", "O", "E", "1");
        a.notes = Some("first".into());
        let mut dup = record("a", "o", "e", "1");
        dup.notes = Some("second".into());
        let b = record("B", "O", "E", "1");

        let (kept, removed) = dedup_records(vec![a, dup, b]);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].notes.as_deref(), Some("first"));
    }

    #[test]
    fn dedup_is_idempotent() {
        let records = vec![
            record("A", "O", "E", "1"),
            record("A", "O", "E", "1"),
            record("B", "O", "E", "2"),
            record("A", "O", "E", "2"),
            record("B", "O", "E", "2"),
        ];
        let (once, _) = dedup_records(records);
        let (twice, removed) = dedup_records(once.clone());
        assert_eq!(once, twice);
        assert_eq!(removed, 0);
    }

    #[test]
    fn snapshot_sorts_by_date_descending_and_is_stable() {
        let records = vec![
            record("first-2023", "O", "E", "2023-05-01"),
            record("2024", "O", "E", "2024-01-01"),
            record("second-2023", "O", "E", "2023-05-01"),
            WellRecord {
                property_name: Some("undated".into()),
                ..Default::default()
            },
        ];
        let names: Vec<_> = sorted_snapshot(&records)
            .into_iter()
            .map(|r| r.property_name.unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["2024", "first-2023", "second-2023", "undated"]);
    }

    #[test]
    fn dashboard_order_maps_to_store_positions() {
        let records = vec![
            record("a", "O", "E", "2021"),
            record("b", "O", "E", "2023"),
            record("c", "O", "E", "2022"),
        ];
        assert_eq!(dashboard_order(&records), vec![1, 2, 0]);
    }

    #[test]
    fn snapshot_compares_dates_as_text() {
        // Non-ISO dates order lexicographically.
        let records = vec![
            record("a", "O", "E", "9/1/2020"),
            record("b", "O", "E", "10/1/2024"),
        ];
        let sorted = sorted_snapshot(&records);
        assert_eq!(sorted[0].property_name.as_deref(), Some("a"));
    }
}

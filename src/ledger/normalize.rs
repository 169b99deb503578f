//! Canonical forms for state and decimal-interest fields.
//!
//! Both functions are total: unknown input comes back unchanged.

use crate::models::WellRecord;

/// (lowercase full name, canonical code). Codes also match themselves.
const STATES: &[(&str, &str)] = &[
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
    ("district of columbia", "DC"),
];

/// Map a state name or code to its two-letter code.
///
/// Matching ignores case and surrounding whitespace; inner whitespace runs
/// count as one space. Unrecognized input is returned as given.
pub fn normalize_state(input: &str) -> String {
    let key = input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    STATES
        .iter()
        .find(|(name, code)| *name == key || code.eq_ignore_ascii_case(&key))
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| input.to_string())
}

/// Full name for a canonical code, title-cased ("NM" -> "New Mexico").
pub fn state_name(code: &str) -> Option<String> {
    let code = code.trim();
    STATES
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(code))
        .map(|(name, _)| title_case(name))
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| match word {
            "of" => word.to_string(),
            _ => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip percent signs and surrounding whitespace. Values without `%` pass through.
pub fn normalize_decimal_interest(input: &str) -> String {
    if input.contains('%') {
        input.replace('%', "").trim().to_string()
    } else {
        input.to_string()
    }
}

/// Apply both normalizers to a record in place. Returns whether anything changed.
pub fn normalize_record(record: &mut WellRecord) -> bool {
    let mut changed = false;
    if let Some(state) = record.state.as_mut() {
        let normalized = normalize_state(state);
        if normalized != *state {
            *state = normalized;
            changed = true;
        }
    }
    if let Some(interest) = record.decimal_interest.as_mut() {
        let normalized = normalize_decimal_interest(interest);
        if normalized != *interest {
            *interest = normalized;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_names_map_to_codes() {
        assert_eq!(normalize_state("Texas"), "TX");
        assert_eq!(normalize_state("  new   MEXICO "), "NM");
        assert_eq!(normalize_state("District of Columbia"), "DC");
    }

    #[test]
    fn codes_are_fixed_points() {
        assert_eq!(normalize_state("TX"), "TX");
        assert_eq!(normalize_state("tx"), "TX");
        assert_eq!(normalize_state(" ok "), "OK");
        assert_eq!(normalize_state("dc"), "DC");
    }

    #[test]
    fn unknown_state_passes_through_unchanged() {
        assert_eq!(normalize_state("Atlantis"), "Atlantis");
        assert_eq!(normalize_state("  Atlantis "), "  Atlantis ");
        assert_eq!(normalize_state(""), "");
    }

    #[test]
    fn normalize_state_is_idempotent() {
        for input in ["Texas", "tx", "Atlantis", "  North  Dakota", "", "Puerto Rico"] {
            let once = normalize_state(input);
            assert_eq!(normalize_state(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn table_covers_fifty_states_and_dc() {
        assert_eq!(STATES.len(), 51);
        for (name, code) in STATES {
            assert_eq!(normalize_state(name), *code);
            assert_eq!(normalize_state(code), *code);
        }
    }

    #[test]
    fn state_names_for_codes() {
        assert_eq!(state_name("NM").as_deref(), Some("New Mexico"));
        assert_eq!(state_name("tx").as_deref(), Some("Texas"));
        assert_eq!(state_name("DC").as_deref(), Some("District of Columbia"));
        assert!(state_name("ZZ").is_none());
    }

    #[test]
    fn percent_is_stripped() {
        assert_eq!(normalize_decimal_interest("12.5%"), "12.5");
        assert_eq!(normalize_decimal_interest(" 12.5 % "), "12.5");
        assert_eq!(normalize_decimal_interest("%%0.5"), "0.5");
    }

    #[test]
    fn percent_free_values_are_untouched() {
        assert_eq!(normalize_decimal_interest("0.125"), "0.125");
        assert_eq!(normalize_decimal_interest(" 0.125 "), " 0.125 ");
        assert_eq!(normalize_decimal_interest("1/8"), "1/8");
    }

    #[test]
    fn decimal_normalization_is_idempotent_and_keeps_digits() {
        for input in ["12.5%", "0.00123456", " 3 % ", "%"] {
            let once = normalize_decimal_interest(input);
            assert_eq!(normalize_decimal_interest(&once), once);
            let digits = |s: &str| s.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
            assert_eq!(digits(&once), digits(input));
        }
    }

    #[test]
    fn record_normalization_reports_changes() {
        let mut record = WellRecord {
            state: Some("Oklahoma".into()),
            decimal_interest: Some("50%".into()),
            ..Default::default()
        };
        assert!(normalize_record(&mut record));
        assert_eq!(record.state.as_deref(), Some("OK"));
        assert_eq!(record.decimal_interest.as_deref(), Some("50"));
        assert!(!normalize_record(&mut record));
    }

    #[test]
    fn record_without_fields_is_unchanged() {
        let mut record = WellRecord::default();
        assert!(!normalize_record(&mut record));
    }
}

//! Field-update resolution: free-text field name + raw value → typed,
//! validated mutation.
//!
//! Field identification is by case-insensitive substring containment against
//! a fixed, priority-ordered probe list — the list itself is the single
//! source of truth, evaluated strictly in order with first match winning.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::datetime;
use super::tags::{self, TagMatch};
use super::ValidationError;
use crate::taxonomy::{Taxonomy, TaxonomyCategory};

/// Ordered (probe, field code) pairs. Order matters: ambiguous field text is
/// resolved by probing in exactly this order ("date of birth" hits "date"
/// before anything else could apply).
pub const FIELD_PROBES: &[(&str, u8)] = &[
    ("name", 1),
    ("desc", 2),
    ("date", 3),
    ("time", 3),
    ("to", 4),
    ("by", 5),
    ("type", 6),
    ("comp", 7),
];

/// Field code → display label, for the `listFields` command.
pub const FIELD_LABELS: &[(u8, &str)] = &[
    (1, "Task Name"),
    (2, "Description"),
    (3, "Date & Time"),
    (4, "Assigned To"),
    (5, "Assigned By"),
    (6, "Task Type"),
    (7, "Completion"),
];

/// Words accepted as "complete". The truthy/falsy vocabularies are
/// intentionally asymmetric; the lists are preserved verbatim.
pub const TRUTHY_WORDS: &[&str] = &["complete", "done", "true", "finish", "yes"];

/// Words accepted as "not complete".
pub const FALSY_WORDS: &[&str] = &[
    "not done",
    "not complete",
    "undone",
    "undue",
    "false",
    "incomplete",
    "no",
];

/// A typed, validated mutation of exactly one task field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Name(String),
    Description(String),
    DateTime(NaiveDateTime),
    AssignedTo(Vec<String>),
    AssignedBy(Vec<String>),
    TaskType(Vec<String>),
    Completion(bool),
}

impl FieldUpdate {
    /// The field code (1–7) this update targets in the external store.
    pub fn code(&self) -> u8 {
        match self {
            FieldUpdate::Name(_) => 1,
            FieldUpdate::Description(_) => 2,
            FieldUpdate::DateTime(_) => 3,
            FieldUpdate::AssignedTo(_) => 4,
            FieldUpdate::AssignedBy(_) => 5,
            FieldUpdate::TaskType(_) => 6,
            FieldUpdate::Completion(_) => 7,
        }
    }
}

/// Snapshot the resolver validates against: the current instant, taxonomy
/// lists, and task names. The resolver itself holds no state.
pub struct ResolveContext<'a> {
    pub now: DateTime<Utc>,
    pub taxonomy: &'a Taxonomy,
    pub existing_names: &'a [String],
}

/// Map free-text field name to a field code via the probe list. 0 = unknown.
pub fn field_code(field_text: &str) -> u8 {
    let lowered = field_text.to_lowercase();
    for (probe, code) in FIELD_PROBES {
        if lowered.contains(probe) {
            return *code;
        }
    }
    0
}

/// Resolve a field name plus raw value into a validated [`FieldUpdate`].
pub fn resolve(
    field_text: &str,
    raw_value: &str,
    cx: &ResolveContext<'_>,
) -> Result<FieldUpdate, ValidationError> {
    match field_code(field_text) {
        1 => {
            let lowered = raw_value.to_lowercase();
            let collision = cx
                .existing_names
                .iter()
                .any(|name| name.to_lowercase() == lowered);
            if collision {
                return Err(ValidationError::NameCollision(raw_value.to_string()));
            }
            Ok(FieldUpdate::Name(raw_value.to_string()))
        }
        2 => Ok(FieldUpdate::Description(raw_value.to_string())),
        3 => datetime::validate(raw_value, cx.now).map(FieldUpdate::DateTime),
        4 => resolve_tags(raw_value, TaxonomyCategory::AssignTo, cx).map(FieldUpdate::AssignedTo),
        5 => resolve_tags(raw_value, TaxonomyCategory::AssignBy, cx).map(FieldUpdate::AssignedBy),
        6 => resolve_tags(raw_value, TaxonomyCategory::TaskType, cx).map(FieldUpdate::TaskType),
        7 => {
            let word = raw_value.to_lowercase();
            if TRUTHY_WORDS.contains(&word.as_str()) {
                Ok(FieldUpdate::Completion(true))
            } else if FALSY_WORDS.contains(&word.as_str()) {
                Ok(FieldUpdate::Completion(false))
            } else {
                Err(ValidationError::UnrecognizedWord)
            }
        }
        _ => Err(ValidationError::UnknownField),
    }
}

fn resolve_tags(
    raw_value: &str,
    category: TaxonomyCategory,
    cx: &ResolveContext<'_>,
) -> Result<Vec<String>, ValidationError> {
    match tags::classify(raw_value, cx.taxonomy.category(category)) {
        TagMatch::Valid(tags) => Ok(tags),
        TagMatch::Invalid(tokens) => Err(ValidationError::TagMismatch { category, tokens }),
        TagMatch::Unusable => Err(ValidationError::TaxonomyUnusable(category)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn taxonomy() -> Taxonomy {
        Taxonomy {
            assign_to: vec!["Alice".to_string(), "Bob".to_string()],
            assign_by: vec!["Lead".to_string()],
            task_type: vec!["Chore".to_string(), "Report".to_string()],
        }
    }

    fn cx<'a>(taxonomy: &'a Taxonomy, names: &'a [String]) -> ResolveContext<'a> {
        ResolveContext {
            now: fixed_now(),
            taxonomy,
            existing_names: names,
        }
    }

    #[test]
    fn probes_resolve_by_substring_in_order() {
        assert_eq!(field_code("name"), 1);
        assert_eq!(field_code("Task Name"), 1);
        assert_eq!(field_code("description"), 2);
        assert_eq!(field_code("date of birth"), 3);
        assert_eq!(field_code("TIME"), 3);
        assert_eq!(field_code("assigned to"), 4);
        assert_eq!(field_code("assigned by"), 5);
        assert_eq!(field_code("type"), 6);
        assert_eq!(field_code("completion"), 7);
        assert_eq!(field_code("nonsense"), 0);
    }

    #[test]
    fn unknown_field_is_an_error() {
        let taxonomy = taxonomy();
        let result = resolve("priority", "high", &cx(&taxonomy, &[]));
        assert_eq!(result, Err(ValidationError::UnknownField));
    }

    #[test]
    fn rename_rejects_existing_names_case_insensitively() {
        let taxonomy = taxonomy();
        let names = vec!["Report".to_string()];
        assert_eq!(
            resolve("name", "report", &cx(&taxonomy, &names)),
            Err(ValidationError::NameCollision("report".to_string()))
        );
        assert_eq!(
            resolve("name", "Weekly Sync", &cx(&taxonomy, &names)),
            Ok(FieldUpdate::Name("Weekly Sync".to_string()))
        );
    }

    #[test]
    fn description_accepts_anything() {
        let taxonomy = taxonomy();
        assert_eq!(
            resolve("desc", "", &cx(&taxonomy, &[])),
            Ok(FieldUpdate::Description(String::new()))
        );
    }

    #[test]
    fn date_field_delegates_to_the_datetime_validator() {
        let taxonomy = taxonomy();
        assert!(matches!(
            resolve("date", "01 jan 30 0900", &cx(&taxonomy, &[])),
            Ok(FieldUpdate::DateTime(_))
        ));
        assert_eq!(
            resolve("time", "yesterday", &cx(&taxonomy, &[])),
            Err(ValidationError::Format)
        );
    }

    #[test]
    fn tag_fields_delegate_to_the_matcher() {
        let taxonomy = taxonomy();
        assert_eq!(
            resolve("assigned to", "alice, bob", &cx(&taxonomy, &[])),
            Ok(FieldUpdate::AssignedTo(vec![
                "Alice".to_string(),
                "Bob".to_string()
            ]))
        );
        assert_eq!(
            resolve("to", "alice, carol", &cx(&taxonomy, &[])),
            Err(ValidationError::TagMismatch {
                category: TaxonomyCategory::AssignTo,
                tokens: vec!["carol".to_string()],
            })
        );
    }

    #[test]
    fn empty_tag_category_propagates_as_unusable() {
        let mut taxonomy = taxonomy();
        taxonomy.assign_by.clear();
        assert_eq!(
            resolve("by", "Lead", &cx(&taxonomy, &[])),
            Err(ValidationError::TaxonomyUnusable(TaxonomyCategory::AssignBy))
        );
    }

    #[test]
    fn completion_words_match_case_insensitively() {
        let taxonomy = taxonomy();
        for word in ["YES", "Yes", "yes", "done", "Finish"] {
            assert_eq!(
                resolve("comp", word, &cx(&taxonomy, &[])),
                Ok(FieldUpdate::Completion(true)),
                "{word}"
            );
        }
        for word in ["undue", "not done", "Incomplete", "no"] {
            assert_eq!(
                resolve("comp", word, &cx(&taxonomy, &[])),
                Ok(FieldUpdate::Completion(false)),
                "{word}"
            );
        }
        assert_eq!(
            resolve("comp", "maybe", &cx(&taxonomy, &[])),
            Err(ValidationError::UnrecognizedWord)
        );
    }

    #[test]
    fn codes_round_trip_through_updates() {
        assert_eq!(FieldUpdate::Name("x".into()).code(), 1);
        assert_eq!(FieldUpdate::Completion(true).code(), 7);
    }
}

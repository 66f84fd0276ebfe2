//! Tag classification against an authoritative taxonomy category.
//!
//! A comma-separated user string is checked token by token against the
//! category's current tag list. Accepted tokens are replaced by the
//! taxonomy's canonical casing, never the user's.

/// Outcome of classifying a submitted tag list.
#[derive(Debug, Clone, PartialEq)]
pub enum TagMatch {
    /// Every token matched. Tags are canonicalized to taxonomy casing,
    /// order-preserving per input order; duplicates are kept.
    Valid(Vec<String>),
    /// At least one token matched nothing. Carries exactly the rejected
    /// tokens — once a call mixes valid and invalid tokens, which tokens
    /// were valid is no longer observable.
    Invalid(Vec<String>),
    /// The category currently has zero authoritative tags; no input can be
    /// valid. Takes precedence over everything else.
    Unusable,
}

/// Classify `raw_list` (comma-separated, whitespace-trimmed) against the
/// given category tag list.
///
/// Two-phase accumulator: tokens are optimistically collected as canonical
/// tags until the first miss; the first miss discards that accumulation and
/// flips the call into invalid-collecting mode, where only further misses
/// accumulate (later valid tokens are dropped, not reported).
///
/// An empty `raw_list` never reaches this function — the dispatcher treats
/// it as "no constraint" before classification.
pub fn classify(raw_list: &str, category_tags: &[String]) -> TagMatch {
    if category_tags.is_empty() {
        return TagMatch::Unusable;
    }

    let mut accepted: Vec<String> = Vec::new();
    let mut rejected: Vec<String> = Vec::new();

    for token in raw_list.split(',').map(str::trim) {
        let lowered = token.to_lowercase();
        let canonical = category_tags
            .iter()
            .find(|tag| tag.to_lowercase() == lowered);

        match canonical {
            Some(tag) if rejected.is_empty() => accepted.push(tag.clone()),
            // Invalid mode: a matching token is recognized but dropped.
            Some(_) => {}
            None => {
                accepted.clear();
                rejected.push(token.to_string());
            }
        }
    }

    if rejected.is_empty() {
        TagMatch::Valid(accepted)
    } else {
        TagMatch::Invalid(rejected)
    }
}

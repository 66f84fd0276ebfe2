//! Field-level validation engine.
//!
//! Everything here is pure: each validator is a function of its inputs and a
//! snapshot of the current taxonomy / task names. No validator touches the
//! store or mutates shared state — the dispatcher sequences refreshes before
//! calling in.

pub mod datetime;
pub mod fields;
pub mod tags;

use thiserror::Error;

use crate::taxonomy::TaxonomyCategory;

/// Recoverable-by-caller validation failures. Each variant is surfaced as a
/// user-facing reply; no mutation is attempted once one is raised.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Malformed date/time: wrong component count, a component that is not
    /// zero-padded digits of the expected width, or a day/time that does not
    /// form a real calendar instant.
    #[error("date and time must be four space-separated components, e.g. `01 Jan 26 0321`")]
    Format,

    #[error("unrecognized month `{0}` — use a three-letter abbreviation")]
    UnknownMonth(String),

    #[error("task date is not after the current date")]
    NotInFuture,

    /// The category currently has zero authoritative tags; nothing the user
    /// submits can be valid.
    #[error("no \"{0}\" tags available")]
    TaxonomyUnusable(TaxonomyCategory),

    /// One or more submitted tags matched nothing in the category. Carries
    /// exactly the rejected tokens, in input order.
    #[error("the following \"{category}\" tags are incorrect: {}", .tokens.join(", "))]
    TagMismatch {
        category: TaxonomyCategory,
        tokens: Vec<String>,
    },

    #[error("**{0}** is already used by another task")]
    NameCollision(String),

    #[error("field name does not exist — use `listFields` to see the available fields")]
    UnknownField,

    #[error("completion word is not recognized")]
    UnrecognizedWord,
}

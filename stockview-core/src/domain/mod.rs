//! Domain types for stockview

pub mod row;

pub use row::{EnrichedRow, Row};

/// Ticker symbol, canonical upper-case.
pub type Symbol = String;

/// Canonicalize a user-supplied ticker: trimmed, upper-cased.
pub fn canonical_symbol(raw: &str) -> Symbol {
    raw.trim().to_uppercase()
}

//! tfd-rules
//!
//! Determination engine: decides whether a transaction is reportable,
//! exempt, or undetermined against a versioned catalog of exemption rules.
//!
//! Goals:
//! - Closed, ordered, immutable rule catalog (new rules => new version)
//! - Stable rule ids recorded as the rationale for every outcome
//! - Exclusive families short-circuit; non-exclusive families record all hits
//! - Missing inputs surface as an undetermined result, never a guess
//!
//! Deterministic, pure logic. No IO, no time, no store calls.

mod catalog;
mod engine;
mod types;

pub use catalog::catalog_v2026_1;
pub use engine::evaluate;
pub use types::*;

//! tfd-reconcile
//!
//! Party data reconciliation: merges raw party submissions into the
//! canonical collection model the document builder consumes.
//!
//! Architectural decisions:
//! - Mappings are declared in an explicit table keyed by (role, entity kind);
//!   the merge applies the table, it does not hide field routing in code
//! - Field transforms are deterministic string functions, no floats
//! - Arrays (sellers, beneficial owners) order by party creation sequence
//! - Last write per party wins; property, price and closing date are staff
//!   fields and are never touched here
//! - One party's bad field is that party's warning, never another party's
//!   failure, and never an abort
//!
//! Deterministic, pure logic. No IO. No store calls.

mod engine;
mod mapping;
mod transforms;
mod types;

pub use engine::reconcile;
pub use mapping::{mapping_for, FieldMap, Transform};
pub use transforms::{
    canonical_date, country_code, money_canonical, ownership_percent, phone_digits, tax_id_digits,
    TransformError,
};
pub use types::*;

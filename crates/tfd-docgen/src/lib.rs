//! Filing document builder for the reporting authority's fixed XML schema.
//!
//! Goals:
//! - deterministic: equal canonical inputs produce byte-identical documents
//! - all-or-nothing: a document exists only if every fatal preflight check passed
//! - single source of derived facts: the transferee indicator attributes are
//!   computed here, from the canonical buyer branch, and nowhere else

pub mod builder;
pub mod preflight;
pub mod schema;
pub mod writer;

pub use builder::{build, BuiltDocument, PreflightFailed};
pub use preflight::{checks, run_preflight, PreflightFinding, PreflightReport, Severity};

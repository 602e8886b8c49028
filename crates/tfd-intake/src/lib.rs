//! tfd-intake
//!
//! Party submission intake: the door between the collection surface and the
//! party-record log.
//!
//! Goals:
//! - Parse the heterogeneous submission payload into the typed identity
//!   union, dispatched by the declared entity kind
//! - Normalize tax identifiers at the door with the same transform the
//!   reconciler applies (double normalization is deliberate and idempotent)
//! - Retain the raw payload verbatim on the record
//! - Enforce submission-status transitions: pending -> submitted on first
//!   write, verified is set by staff and never downgraded by a resubmission
//!
//! No IO. Storage is the caller's concern.

mod payload;
mod status;

pub use payload::{parse_submission, IntakeError, ParsedSubmission};
pub use status::{apply_submission, issue_party_link, verify_submission};

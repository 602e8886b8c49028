//! Filing lifecycle and submission gateway.
//!
//! Goals:
//! - one legal-transition map for the transaction lifecycle, replay-safe
//! - a single choke-point for authority dispatch: determination, reconcile
//!   freshness and document preflight are evaluated inside the gateway,
//!   never supplied as verdicts by callers
//! - exactly-once submission: the filing reference is derived
//!   deterministically from (transaction id, attempt number), and dispatch
//!   requires proof that an attempt slot was claimed first

pub mod authority;
pub mod gateway;
pub mod lifecycle;

pub use authority::{AuthorityClient, AuthorityError, AuthorityResponse, FilingSubmission};
pub use gateway::{
    attempt_id_for, filing_reference_for, next_attempt_no, FilingFreshnessGuard, FilingGateway,
    FilingRefusal, FilingSlotClaim,
};
pub use lifecycle::{LifecycleEvent, TransactionLifecycle, TransitionError};

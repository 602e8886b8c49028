//! Authority adapter seam.
//!
//! The gateway and orchestration code never see past [`AuthorityClient`].
//! `tfd-authority-paper` implements it as a deterministic in-memory double;
//! `tfd-authority-http` implements it over the real transport. A transient
//! error means the authority may or may not have seen the submission; the
//! deterministic filing reference makes the retry safe either way.

use uuid::Uuid;

/// One document dispatch, exactly as handed to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingSubmission {
    /// Client-derived idempotency reference, stable per (transaction, attempt).
    pub filing_reference: String,
    pub transaction_id: Uuid,
    pub attempt_no: u32,
    pub xml: String,
}

/// The authority's decision on a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityResponse {
    Accepted { receipt_id: String },
    Rejected { code: String, message: String },
}

/// Failure to obtain a decision. Never confused with a rejection: a
/// rejection is an authority decision, these are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    /// Timeout or transport failure. Retryable under the same reference.
    Transient { detail: String },
    /// The authority answered with something this client cannot interpret.
    Protocol { detail: String },
}

impl std::fmt::Display for AuthorityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorityError::Transient { detail } => {
                write!(f, "authority unreachable: {detail}")
            }
            AuthorityError::Protocol { detail } => {
                write!(f, "authority protocol error: {detail}")
            }
        }
    }
}

impl std::error::Error for AuthorityError {}

/// Transport-agnostic submission client.
pub trait AuthorityClient {
    fn submit(&self, submission: &FilingSubmission) -> Result<AuthorityResponse, AuthorityError>;
}

/// A shared adapter files through the same client. Lets a caller keep a
/// handle to the adapter it hands the gateway.
impl<T: AuthorityClient + ?Sized> AuthorityClient for std::sync::Arc<T> {
    fn submit(&self, submission: &FilingSubmission) -> Result<AuthorityResponse, AuthorityError> {
        (**self).submit(submission)
    }
}

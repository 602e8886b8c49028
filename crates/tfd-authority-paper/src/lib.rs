//! Deterministic in-memory "paper" filing authority adapter.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - Outcomes are scripted per filing reference before dispatch; an
//!   unscripted reference is accepted.
//! - The receipt id for a default accept is derived from the filing
//!   reference: "paper:receipt:{filing_reference}".
//! - A resubmission carrying an already-settled filing reference replays the
//!   recorded response verbatim and does not count as a second filing.
//! - Scripted transient faults fire exactly once; the retry then proceeds to
//!   the settled path.
//! - No randomness. No timestamps. No IO.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tfd_filing::{AuthorityClient, AuthorityError, AuthorityResponse, FilingSubmission};

#[derive(Debug, Default)]
pub struct PaperAuthority {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Response to serve when this reference first settles.
    scripted: BTreeMap<String, AuthorityResponse>,
    /// One-shot transport faults, consumed on first submission.
    transient_once: BTreeMap<String, String>,
    /// First response per reference, replayed on duplicates.
    settled: BTreeMap<String, AuthorityResponse>,
    calls: u32,
}

impl PaperAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response this reference settles with. Without a script the
    /// reference is accepted with a derived receipt id.
    pub fn script_response(&self, filing_reference: impl Into<String>, response: AuthorityResponse) {
        self.lock().scripted.insert(filing_reference.into(), response);
    }

    /// Script a one-shot transport fault for this reference. The first
    /// submission fails transient; a retry goes through.
    pub fn script_transient_once(
        &self,
        filing_reference: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.lock()
            .transient_once
            .insert(filing_reference.into(), detail.into());
    }

    /// Total submit calls, replays included.
    pub fn call_count(&self) -> u32 {
        self.lock().calls
    }

    /// Distinct filings the authority actually processed.
    pub fn processed_count(&self) -> usize {
        self.lock().settled.len()
    }

    /// The recorded response for a settled reference, if any.
    pub fn settled_response(&self, filing_reference: &str) -> Option<AuthorityResponse> {
        self.lock().settled.get(filing_reference).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl AuthorityClient for PaperAuthority {
    fn submit(&self, submission: &FilingSubmission) -> Result<AuthorityResponse, AuthorityError> {
        let mut inner = self.lock();
        inner.calls += 1;

        // Receipt replay: a settled reference never files twice.
        if let Some(prior) = inner.settled.get(&submission.filing_reference) {
            return Ok(prior.clone());
        }

        if let Some(detail) = inner.transient_once.remove(&submission.filing_reference) {
            return Err(AuthorityError::Transient { detail });
        }

        if submission.xml.is_empty() {
            return Err(AuthorityError::Protocol {
                detail: "empty document".to_string(),
            });
        }

        let response = match inner.scripted.remove(&submission.filing_reference) {
            Some(scripted) => scripted,
            None => AuthorityResponse::Accepted {
                receipt_id: format!("paper:receipt:{}", submission.filing_reference),
            },
        };

        inner
            .settled
            .insert(submission.filing_reference.clone(), response.clone());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn submission(reference: &str) -> FilingSubmission {
        FilingSubmission {
            filing_reference: reference.to_string(),
            transaction_id: Uuid::from_u128(0x51),
            attempt_no: 1,
            xml: "<TransferDisclosureReport/>".to_string(),
        }
    }

    #[test]
    fn unscripted_reference_accepts_with_derived_receipt() {
        let authority = PaperAuthority::new();
        let response = authority.submit(&submission("TFD-A-1")).unwrap();
        assert_eq!(
            response,
            AuthorityResponse::Accepted {
                receipt_id: "paper:receipt:TFD-A-1".to_string()
            }
        );
    }

    #[test]
    fn duplicate_reference_replays_without_double_counting() {
        let authority = PaperAuthority::new();
        let first = authority.submit(&submission("TFD-A-1")).unwrap();
        let second = authority.submit(&submission("TFD-A-1")).unwrap();

        assert_eq!(first, second, "replay must be verbatim");
        assert_eq!(authority.call_count(), 2);
        assert_eq!(
            authority.processed_count(),
            1,
            "one filing processed despite two submissions"
        );
    }

    #[test]
    fn scripted_rejection_settles_and_replays() {
        let authority = PaperAuthority::new();
        let rejection = AuthorityResponse::Rejected {
            code: "E-103".to_string(),
            message: "transferee mailing address missing".to_string(),
        };
        authority.script_response("TFD-B-1", rejection.clone());

        assert_eq!(authority.submit(&submission("TFD-B-1")).unwrap(), rejection);
        assert_eq!(
            authority.submit(&submission("TFD-B-1")).unwrap(),
            rejection,
            "a settled rejection replays like a settled accept"
        );
        assert_eq!(authority.settled_response("TFD-B-1"), Some(rejection));
    }

    #[test]
    fn transient_fault_fires_once_then_retry_goes_through() {
        let authority = PaperAuthority::new();
        authority.script_transient_once("TFD-C-1", "gateway timeout");

        let err = authority.submit(&submission("TFD-C-1")).unwrap_err();
        match err {
            AuthorityError::Transient { detail } => assert_eq!(detail, "gateway timeout"),
            other => panic!("expected transient, got {other:?}"),
        }

        let retry = authority.submit(&submission("TFD-C-1")).unwrap();
        assert!(matches!(retry, AuthorityResponse::Accepted { .. }));
        assert_eq!(authority.processed_count(), 1);
    }

    #[test]
    fn empty_document_is_a_protocol_error() {
        let authority = PaperAuthority::new();
        let mut empty = submission("TFD-D-1");
        empty.xml.clear();

        let err = authority.submit(&empty).unwrap_err();
        assert!(matches!(err, AuthorityError::Protocol { .. }));
        assert_eq!(
            authority.processed_count(),
            0,
            "a protocol error settles nothing"
        );
    }
}

//! Transaction lifecycle state machine.
//!
//! # Design
//!
//! Explicit state machine for one transaction's filing lifecycle. Every
//! event is applied via [`TransactionLifecycle::apply`], which enforces two
//! invariants:
//!
//! 1. **Legal transitions only.** Illegal events return [`TransitionError`];
//!    the stored phase is untouched.
//! 2. **Idempotent replay.** If an `event_id` is supplied and has already
//!    been applied, the call is a silent no-op, so replaying an event log
//!    (restart, at-least-once delivery) converges to the same phase.
//!
//! # Phase diagram
//!
//! ```text
//!          CollectionOpened          CollectionCompleted
//! new() ► Draft ────────► Collecting ────────────► ReadyToFile
//!           │                 │   ▲                     │
//!           │ Exemption-      │   │ PartyDataChanged    │ SubmissionDispatched
//!           │ Confirmed       │   │ (readiness lost)    ▼
//!           ▼                 ▼   │              FilingSubmitted
//!        Exempt (term.) ◄─────┘   │                 │         │
//!                                 │ FilingReopened  │         │ AuthorityRejected /
//!                                 │                 │         │ SubmissionFailedTransient
//!                                 └── FilingRejected ◄────────┘
//!                                                   │
//!                                  AuthorityAccepted ► FilingAccepted (term.)
//! ```
//!
//! `FilingRejected` is deliberately not terminal: staff reopen collection,
//! fix the inputs and file again. `Exempt` and `FilingAccepted` are terminal.
//! A transient dispatch failure lands in the same phase as an authority
//! rejection; the distinction lives on the attempt outcome, not the phase.

use std::collections::HashSet;

use tfd_schemas::TransactionPhase;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Events that drive phase transitions in a [`TransactionLifecycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Staff opened party collection (idempotent while already collecting).
    CollectionOpened,
    /// Every required party submitted and reconciliation came back clean.
    CollectionCompleted,
    /// A party resubmitted while the transaction was ready; readiness is lost.
    PartyDataChanged,
    /// A filing attempt was dispatched to the authority.
    SubmissionDispatched,
    /// The authority accepted the filing.
    AuthorityAccepted,
    /// The authority rejected the filing with a decision.
    AuthorityRejected,
    /// Dispatch failed without an authority decision (timeout, transport).
    SubmissionFailedTransient,
    /// Staff reopened a rejected filing for correction.
    FilingReopened,
    /// Determination is exempt and staff closed the transaction.
    ExemptionConfirmed,
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Returned when an event cannot legally be applied in the current phase.
///
/// Callers must treat this as a data-integrity alert, not a retry condition:
/// an illegal transition means some component acted on a stale view of the
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    /// The phase the transaction was in when the illegal event arrived.
    pub from: TransactionPhase,
    /// Debug string of the event that was refused.
    pub event: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal filing transition: {:?} + {}", self.from, self.event)
    }
}

impl std::error::Error for TransitionError {}

// ---------------------------------------------------------------------------
// TransactionLifecycle
// ---------------------------------------------------------------------------

/// One transaction's filing lifecycle, tracked through an explicit state
/// machine.
///
/// # Idempotency
///
/// Every call to [`apply`][`TransactionLifecycle::apply`] accepts an optional
/// `event_id`. When supplied, the id is stored; a later call with the same id
/// is silently ignored. The set is per-process: a lifecycle resumed from a
/// stored row starts with an empty replay set.
#[derive(Debug, Clone)]
pub struct TransactionLifecycle {
    pub transaction_id: Uuid,
    pub phase: TransactionPhase,
    applied: HashSet<String>,
}

impl TransactionLifecycle {
    /// Create a lifecycle for a new transaction in `Draft`.
    pub fn new(transaction_id: Uuid) -> Self {
        Self {
            transaction_id,
            phase: TransactionPhase::Draft,
            applied: HashSet::new(),
        }
    }

    /// Rebuild a lifecycle from a stored phase.
    pub fn resume(transaction_id: Uuid, phase: TransactionPhase) -> Self {
        Self {
            transaction_id,
            phase,
            applied: HashSet::new(),
        }
    }

    /// No further events are accepted once true.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Apply an event to this lifecycle.
    ///
    /// `event_id` — if `Some`, deduplicated against already-applied ids. A
    /// duplicate returns `Ok(())` immediately without touching the phase.
    ///
    /// # Errors
    /// Returns [`TransitionError`] for illegal transitions; the phase is
    /// unchanged on error.
    pub fn apply(
        &mut self,
        event: &LifecycleEvent,
        event_id: Option<&str>,
    ) -> Result<(), TransitionError> {
        if let Some(id) = event_id {
            if self.applied.contains(id) {
                return Ok(());
            }
        }

        self.do_transition(event)?;

        if let Some(id) = event_id {
            self.applied.insert(id.to_string());
        }

        Ok(())
    }

    fn do_transition(&mut self, event: &LifecycleEvent) -> Result<(), TransitionError> {
        use LifecycleEvent::*;
        use TransactionPhase::*;

        match (&self.phase, event) {
            // ------------------------------------------------------------------
            // Drafting and collection.
            // ------------------------------------------------------------------
            (Draft, CollectionOpened) => self.phase = Collecting,
            (Collecting, CollectionOpened) => {}

            (Collecting, CollectionCompleted) => self.phase = ReadyToFile,
            (ReadyToFile, CollectionCompleted) => {}

            // A resubmission while ready invalidates readiness; while still
            // collecting it changes nothing.
            (ReadyToFile, PartyDataChanged) => self.phase = Collecting,
            (Collecting, PartyDataChanged) => {}

            // ------------------------------------------------------------------
            // Submission and authority decision.
            // ------------------------------------------------------------------
            (ReadyToFile, SubmissionDispatched) => self.phase = FilingSubmitted,

            (FilingSubmitted, AuthorityAccepted) => self.phase = FilingAccepted,
            (FilingSubmitted, AuthorityRejected) => self.phase = FilingRejected,
            (FilingSubmitted, SubmissionFailedTransient) => self.phase = FilingRejected,

            // Rejected filings reopen for correction; nothing is lost.
            (FilingRejected, FilingReopened) => self.phase = Collecting,

            // ------------------------------------------------------------------
            // Exemption closes the transaction before any filing work.
            // ------------------------------------------------------------------
            (Draft | Collecting, ExemptionConfirmed) => self.phase = Exempt,

            // ------------------------------------------------------------------
            // Everything else is illegal, including any event on a terminal
            // phase.
            // ------------------------------------------------------------------
            (phase, ev) => {
                return Err(TransitionError {
                    from: *phase,
                    event: format!("{ev:?}"),
                });
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TransactionLifecycle {
        TransactionLifecycle::new(Uuid::new_v4())
    }

    #[test]
    fn new_transaction_starts_in_draft() {
        let lc = draft();
        assert_eq!(lc.phase, TransactionPhase::Draft);
        assert!(!lc.is_terminal());
    }

    #[test]
    fn happy_path_reaches_accepted() {
        let mut lc = draft();
        lc.apply(&LifecycleEvent::CollectionOpened, Some("e1")).unwrap();
        lc.apply(&LifecycleEvent::CollectionCompleted, Some("e2")).unwrap();
        lc.apply(&LifecycleEvent::SubmissionDispatched, Some("e3")).unwrap();
        lc.apply(&LifecycleEvent::AuthorityAccepted, Some("e4")).unwrap();
        assert_eq!(lc.phase, TransactionPhase::FilingAccepted);
        assert!(lc.is_terminal());
    }

    #[test]
    fn rejection_reopens_for_correction() {
        let mut lc = draft();
        lc.apply(&LifecycleEvent::CollectionOpened, None).unwrap();
        lc.apply(&LifecycleEvent::CollectionCompleted, None).unwrap();
        lc.apply(&LifecycleEvent::SubmissionDispatched, None).unwrap();
        lc.apply(&LifecycleEvent::AuthorityRejected, None).unwrap();
        assert_eq!(lc.phase, TransactionPhase::FilingRejected);
        assert!(!lc.is_terminal(), "rejection is recoverable");
        lc.apply(&LifecycleEvent::FilingReopened, None).unwrap();
        assert_eq!(lc.phase, TransactionPhase::Collecting);
    }

    #[test]
    fn transient_failure_lands_in_rejected_phase() {
        let mut lc = draft();
        lc.apply(&LifecycleEvent::CollectionOpened, None).unwrap();
        lc.apply(&LifecycleEvent::CollectionCompleted, None).unwrap();
        lc.apply(&LifecycleEvent::SubmissionDispatched, None).unwrap();
        lc.apply(&LifecycleEvent::SubmissionFailedTransient, None).unwrap();
        assert_eq!(lc.phase, TransactionPhase::FilingRejected);
        lc.apply(&LifecycleEvent::FilingReopened, None).unwrap();
        assert_eq!(lc.phase, TransactionPhase::Collecting);
    }

    #[test]
    fn exemption_is_terminal_from_draft_and_collecting() {
        let mut from_draft = draft();
        from_draft.apply(&LifecycleEvent::ExemptionConfirmed, None).unwrap();
        assert_eq!(from_draft.phase, TransactionPhase::Exempt);
        assert!(from_draft.is_terminal());

        let mut from_collecting = draft();
        from_collecting.apply(&LifecycleEvent::CollectionOpened, None).unwrap();
        from_collecting.apply(&LifecycleEvent::ExemptionConfirmed, None).unwrap();
        assert_eq!(from_collecting.phase, TransactionPhase::Exempt);

        let err = from_collecting
            .apply(&LifecycleEvent::CollectionOpened, None)
            .unwrap_err();
        assert_eq!(err.from, TransactionPhase::Exempt);
    }

    #[test]
    fn exemption_after_readiness_is_illegal() {
        let mut lc = draft();
        lc.apply(&LifecycleEvent::CollectionOpened, None).unwrap();
        lc.apply(&LifecycleEvent::CollectionCompleted, None).unwrap();
        let err = lc.apply(&LifecycleEvent::ExemptionConfirmed, None).unwrap_err();
        assert_eq!(err.from, TransactionPhase::ReadyToFile);
        assert_eq!(lc.phase, TransactionPhase::ReadyToFile, "phase unchanged on error");
    }

    #[test]
    fn party_change_invalidates_readiness() {
        let mut lc = draft();
        lc.apply(&LifecycleEvent::CollectionOpened, None).unwrap();
        lc.apply(&LifecycleEvent::CollectionCompleted, None).unwrap();
        assert_eq!(lc.phase, TransactionPhase::ReadyToFile);
        lc.apply(&LifecycleEvent::PartyDataChanged, None).unwrap();
        assert_eq!(lc.phase, TransactionPhase::Collecting);
    }

    #[test]
    fn dispatch_requires_readiness() {
        let mut lc = draft();
        lc.apply(&LifecycleEvent::CollectionOpened, None).unwrap();
        let err = lc.apply(&LifecycleEvent::SubmissionDispatched, None).unwrap_err();
        assert_eq!(err.from, TransactionPhase::Collecting);
        assert!(err.to_string().contains("illegal filing transition"));
    }

    #[test]
    fn replayed_event_id_is_a_noop() {
        let mut lc = draft();
        lc.apply(&LifecycleEvent::CollectionOpened, Some("e1")).unwrap();
        lc.apply(&LifecycleEvent::CollectionCompleted, Some("e2")).unwrap();
        // Replaying the open event must not drag the phase backwards.
        lc.apply(&LifecycleEvent::CollectionOpened, Some("e1")).unwrap();
        assert_eq!(lc.phase, TransactionPhase::ReadyToFile);
    }

    #[test]
    fn resume_picks_up_the_stored_phase() {
        let id = Uuid::new_v4();
        let mut lc = TransactionLifecycle::resume(id, TransactionPhase::FilingRejected);
        lc.apply(&LifecycleEvent::FilingReopened, None).unwrap();
        assert_eq!(lc.phase, TransactionPhase::Collecting);
    }

    #[test]
    fn repeated_open_while_collecting_is_idempotent() {
        let mut lc = draft();
        lc.apply(&LifecycleEvent::CollectionOpened, None).unwrap();
        lc.apply(&LifecycleEvent::CollectionOpened, None).unwrap();
        assert_eq!(lc.phase, TransactionPhase::Collecting);
    }
}

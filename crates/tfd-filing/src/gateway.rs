//! Filing gateway — the single choke-point for authority dispatch.
//!
//! # Invariants
//!
//! **Compile-time:** [`FilingGateway::dispatch`] requires a
//! [`FilingSlotClaim`]. The claim's `_priv` field is `pub(crate)`, so it
//! cannot be built by struct literal outside this crate; callers must go
//! through [`FilingSlotClaim::from_claimed_slot`], explicitly declaring that
//! an attempt slot was claimed before anything went over the wire.
//!
//! **Runtime:** [`FilingGateway::prepare_submission`] evaluates every gate
//! internally from stored state — callers cannot inject a verdict. Gates run
//! in order and the first failure refuses with [`FilingRefusal`]:
//!
//! 1. transaction phase is `ready_to_file`
//! 2. determination is `reportable`
//! 3. the last clean reconcile is within the freshness bound (fail-closed:
//!    a reconcile that never ran, or ran dirty, blocks dispatch)
//! 4. no attempt is already in flight for this transaction
//! 5. the attempt limit is not exhausted
//! 6. document preflight passes (the document is built here and only here)
//!
//! ```text
//! Orchestration code
//!     │
//!     ├─► prepare_submission(tx, model, prior)   gates 1-6, returns the document
//!     ├─► claim one attempt slot                 (store: at most one pending)
//!     └─► dispatch(&claim, &submission)          AuthorityClient, outcome mapping
//! ```

use std::sync::{Mutex, MutexGuard};

use tfd_docgen::{build, BuiltDocument, PreflightReport};
use tfd_schemas::{
    AttemptOutcome, CollectionModel, FilingAttempt, TransactionPhase, TransactionRecord,
};
use uuid::Uuid;

use crate::authority::{AuthorityClient, AuthorityError, AuthorityResponse, FilingSubmission};

// ---------------------------------------------------------------------------
// Freshness guard
// ---------------------------------------------------------------------------

/// Reconcile freshness tracker with an injectable clock.
///
/// The ready-to-file transition runs a safety-net reconcile; this guard
/// remembers when the last clean run happened and fails closed when:
///
/// - reconcile has never run,
/// - the last run was dirty (clears the timestamp), or
/// - the last clean run is older than `freshness_bound_ms`.
///
/// The clock is a `Fn() -> i64` returning epoch-milliseconds, so tests drive
/// time through a `Cell` instead of mocking the system clock.
pub struct FilingFreshnessGuard<C>
where
    C: Fn() -> i64,
{
    freshness_bound_ms: i64,
    last_clean_at_ms: Option<i64>,
    clock: C,
}

impl<C: Fn() -> i64> FilingFreshnessGuard<C> {
    /// Starts with no recorded clean reconcile, so `is_fresh()` is `false`
    /// until the first clean result is recorded.
    pub fn new(freshness_bound_ms: i64, clock: C) -> Self {
        Self { freshness_bound_ms, last_clean_at_ms: None, clock }
    }

    /// Record the result of a reconcile pass. A clean result stamps the
    /// current clock time; a dirty result clears the stamp.
    pub fn record_reconcile_result(&mut self, is_clean: bool) {
        if is_clean {
            self.last_clean_at_ms = Some((self.clock)());
        } else {
            self.last_clean_at_ms = None;
        }
    }

    pub fn last_clean_at_ms(&self) -> Option<i64> {
        self.last_clean_at_ms
    }

    pub fn is_fresh(&self) -> bool {
        match self.last_clean_at_ms {
            None => false,
            Some(t) => (self.clock)() - t <= self.freshness_bound_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// FilingRefusal
// ---------------------------------------------------------------------------

/// The reason a submission was refused at the gateway.
#[derive(Debug, Clone)]
pub enum FilingRefusal {
    NotReadyToFile { phase: TransactionPhase },
    NotReportable { status: String },
    ReconcileStale,
    PreflightFailed { report: PreflightReport },
    AlreadyInFlight { attempt_id: Uuid },
    AttemptLimitReached { max_attempts: u32 },
}

impl std::fmt::Display for FilingRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilingRefusal::NotReadyToFile { phase } => {
                write!(f, "FILING_REFUSED: transaction is {}, not ready_to_file", phase.as_str())
            }
            FilingRefusal::NotReportable { status } => {
                write!(f, "FILING_REFUSED: determination is {status}, not reportable")
            }
            FilingRefusal::ReconcileStale => {
                write!(f, "FILING_REFUSED: reconcile is stale or has never run")
            }
            FilingRefusal::PreflightFailed { report } => {
                write!(
                    f,
                    "FILING_REFUSED: {} fatal preflight finding(s)",
                    report.fatal_count()
                )
            }
            FilingRefusal::AlreadyInFlight { attempt_id } => {
                write!(f, "FILING_REFUSED: attempt {attempt_id} already in flight")
            }
            FilingRefusal::AttemptLimitReached { max_attempts } => {
                write!(f, "FILING_REFUSED: attempt limit {max_attempts} reached")
            }
        }
    }
}

impl std::error::Error for FilingRefusal {}

// ---------------------------------------------------------------------------
// FilingSlotClaim
// ---------------------------------------------------------------------------

/// Proof that an attempt slot was claimed before dispatch.
///
/// # Contract
/// Obtain the attempt id and filing reference from a successfully claimed
/// attempt slot (the store allows at most one pending attempt per
/// transaction), then construct the claim via
/// [`FilingSlotClaim::from_claimed_slot`]. The `_priv` field is `pub(crate)`,
/// so external code cannot fabricate a claim by struct literal; passing
/// made-up values to the constructor violates the attempt-first contract —
/// the store-level uniqueness guard is the authoritative check, the token
/// makes provenance an explicit API requirement.
#[allow(clippy::manual_non_exhaustive)]
#[derive(Debug, Clone)]
pub struct FilingSlotClaim {
    pub attempt_id: Uuid,
    pub filing_reference: String,
    pub attempt_no: u32,
    pub(crate) _priv: (),
}

impl FilingSlotClaim {
    /// Construct a claim from a successfully claimed attempt slot.
    pub fn from_claimed_slot(
        attempt_id: Uuid,
        filing_reference: impl Into<String>,
        attempt_no: u32,
    ) -> Self {
        Self {
            attempt_id,
            filing_reference: filing_reference.into(),
            attempt_no,
            _priv: (),
        }
    }
}

// ---------------------------------------------------------------------------
// Idempotency derivation
// ---------------------------------------------------------------------------

/// Derive the stable filing reference for an attempt.
///
/// This is the canonical derivation point: every call-site — first submit or
/// any retry — must use this function. The mapping is deterministic, so a
/// re-dispatch of the same attempt reuses the same reference and the
/// authority can deduplicate on its side.
pub fn filing_reference_for(transaction_id: Uuid, attempt_no: u32) -> String {
    format!("TFD-{}-{attempt_no}", transaction_id.simple())
}

/// Derive the stable attempt id for (transaction, attempt number). Replays
/// of the same claim converge on the same row.
pub fn attempt_id_for(transaction_id: Uuid, attempt_no: u32) -> Uuid {
    Uuid::new_v5(&transaction_id, format!("attempt:{attempt_no}").as_bytes())
}

/// Next dense attempt number given the attempts recorded so far.
pub fn next_attempt_no(prior: &[FilingAttempt]) -> u32 {
    prior.iter().map(|a| a.attempt_no).max().unwrap_or(0) + 1
}

// ---------------------------------------------------------------------------
// FilingGateway
// ---------------------------------------------------------------------------

/// The single choke-point through which every authority submission flows.
///
/// Owns the authority adapter and the freshness guard; gate state is
/// evaluated from these owned objects, never from caller-supplied verdicts.
pub struct FilingGateway<A, C>
where
    A: AuthorityClient,
    C: Fn() -> i64,
{
    authority: A,
    freshness: Mutex<FilingFreshnessGuard<C>>,
    max_attempts: u32,
}

impl<A, C> FilingGateway<A, C>
where
    A: AuthorityClient,
    C: Fn() -> i64,
{
    pub fn new(authority: A, freshness_bound_ms: i64, max_attempts: u32, clock: C) -> Self {
        Self {
            authority,
            freshness: Mutex::new(FilingFreshnessGuard::new(freshness_bound_ms, clock)),
            max_attempts,
        }
    }

    /// Record the result of a reconcile pass into the freshness guard.
    pub fn record_reconcile_result(&self, is_clean: bool) {
        self.freshness_guard().record_reconcile_result(is_clean);
    }

    pub fn last_clean_reconcile_at_ms(&self) -> Option<i64> {
        self.freshness_guard().last_clean_at_ms()
    }

    /// Evaluate every gate and build the filing document.
    ///
    /// Returns the built document on success; the caller then claims an
    /// attempt slot and calls [`dispatch`][`FilingGateway::dispatch`]. The
    /// first failing gate refuses; later gates are not evaluated.
    pub fn prepare_submission(
        &self,
        tx: &TransactionRecord,
        model: &CollectionModel,
        prior_attempts: &[FilingAttempt],
    ) -> Result<BuiltDocument, FilingRefusal> {
        if tx.phase != TransactionPhase::ReadyToFile {
            return Err(FilingRefusal::NotReadyToFile { phase: tx.phase });
        }
        if !tx.determination.is_reportable() {
            return Err(FilingRefusal::NotReportable {
                status: tx.determination.status.as_str().to_string(),
            });
        }
        if !self.freshness_guard().is_fresh() {
            return Err(FilingRefusal::ReconcileStale);
        }
        if let Some(pending) = prior_attempts.iter().find(|a| a.outcome.is_pending()) {
            return Err(FilingRefusal::AlreadyInFlight { attempt_id: pending.attempt_id });
        }
        if prior_attempts.len() as u32 >= self.max_attempts {
            return Err(FilingRefusal::AttemptLimitReached { max_attempts: self.max_attempts });
        }
        match build(tx, model) {
            Ok(doc) => Ok(doc),
            Err(failed) => Err(FilingRefusal::PreflightFailed { report: failed.report }),
        }
    }

    /// Hand a claimed submission to the authority and map the result to an
    /// attempt outcome. Never errors: every path, including transport
    /// failure, is a recordable outcome.
    ///
    /// A rejection is an authority decision; a transient failure is the
    /// absence of one. The two never mix.
    pub fn dispatch(&self, _claim: &FilingSlotClaim, submission: &FilingSubmission) -> AttemptOutcome {
        match self.authority.submit(submission) {
            Ok(AuthorityResponse::Accepted { receipt_id }) => {
                AttemptOutcome::Accepted { receipt_id }
            }
            Ok(AuthorityResponse::Rejected { code, message }) => {
                AttemptOutcome::Rejected { code, message }
            }
            Err(AuthorityError::Transient { detail }) => {
                AttemptOutcome::TransientFailure { detail }
            }
            Err(AuthorityError::Protocol { detail }) => AttemptOutcome::TransientFailure {
                detail: format!("protocol: {detail}"),
            },
        }
    }

    fn freshness_guard(&self) -> MutexGuard<'_, FilingFreshnessGuard<C>> {
        match self.freshness.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

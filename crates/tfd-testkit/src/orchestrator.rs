//! End-to-end filing desk: the real engine crates wired over the in-memory
//! store and an injected authority adapter.
//!
//! Scenario tests drive this instead of re-wiring intake, reconciliation,
//! determination and the gateway by hand. Every method takes `&self`; the
//! store, the audit writer and the gateway's freshness guard each sit behind
//! their own lock, so tests can race two calls on shared references.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::store::InMemoryStore;
use tfd_audit::{before_after, AuditWriter};
use tfd_filing::{
    attempt_id_for, filing_reference_for, next_attempt_no, AuthorityClient, FilingGateway,
    FilingRefusal, FilingSlotClaim, FilingSubmission, LifecycleEvent, TransactionLifecycle,
};
use tfd_intake::{apply_submission, issue_party_link, parse_submission, verify_submission};
use tfd_reconcile::{reconcile, SyncReport};
use tfd_rules::{catalog_v2026_1, evaluate, DeterminationFacts, RuleCatalog};
use tfd_schemas::{
    AttemptOutcome, Determination, DeterminationStatus, FilingAttempt, PartyRole,
    SubmissionStatus, TransactionPhase, TransactionRecord,
};

/// What one `file` call produced. A refusal is a gate answer, not an error;
/// errors are reserved for broken store or audit plumbing.
#[derive(Debug)]
pub enum FileOutcome {
    /// An attempt was dispatched and resolved; carries the resolved record.
    Filed(FilingAttempt),
    Refused(FilingRefusal),
}

pub struct Orchestrator<A, C>
where
    A: AuthorityClient,
    C: Fn() -> i64,
{
    store: InMemoryStore,
    gateway: FilingGateway<A, C>,
    catalog: RuleCatalog,
    audit: Mutex<AuditWriter>,
    audit_path: PathBuf,
    clock: C,
    _audit_dir: Option<tempfile::TempDir>,
}

impl<A, C> Orchestrator<A, C>
where
    A: AuthorityClient,
    C: Fn() -> i64 + Clone,
{
    pub fn new(
        authority: A,
        audit_path: impl AsRef<Path>,
        freshness_bound_ms: i64,
        max_attempts: u32,
        clock: C,
    ) -> Result<Self> {
        let audit_path = audit_path.as_ref().to_path_buf();
        let audit = AuditWriter::new(&audit_path, true)
            .with_context(|| format!("open audit log {audit_path:?}"))?;
        Ok(Self {
            store: InMemoryStore::new(),
            gateway: FilingGateway::new(authority, freshness_bound_ms, max_attempts, clock.clone()),
            catalog: catalog_v2026_1(),
            audit: Mutex::new(audit),
            audit_path,
            clock,
            _audit_dir: None,
        })
    }

    /// Desk with its audit log in a fresh temp directory; the guard keeps
    /// the directory alive for the desk's lifetime.
    pub fn with_temp_audit(
        authority: A,
        freshness_bound_ms: i64,
        max_attempts: u32,
        clock: C,
    ) -> Result<Self> {
        let dir = tempfile::tempdir().context("create audit temp dir")?;
        let mut desk = Self::new(
            authority,
            dir.path().join("audit.jsonl"),
            freshness_bound_ms,
            max_attempts,
            clock,
        )?;
        desk._audit_dir = Some(dir);
        Ok(desk)
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }

    pub fn open_transaction(&self, tx: &TransactionRecord, actor: &str) -> Result<()> {
        self.store.insert_transaction(tx)?;
        self.append_audit(
            "transaction",
            &tx.transaction_id.to_string(),
            "transaction_opened",
            actor,
            json!({ "file_number": tx.file_number, "phase": tx.phase.as_str() }),
        )?;
        Ok(())
    }

    /// Run the exemption catalog, stamp the evaluation time and persist the
    /// outcome.
    pub fn run_determination(&self, transaction_id: Uuid, actor: &str) -> Result<Determination> {
        let tx = self.store.fetch_transaction(transaction_id)?;
        let facts = DeterminationFacts::from_transaction(&tx);
        let mut determination = evaluate(&self.catalog, &facts);
        determination.evaluated_at_utc = Some(self.now_utc());
        self.store
            .update_determination(transaction_id, &determination)?;
        self.append_audit(
            "transaction",
            &transaction_id.to_string(),
            "determination_run",
            actor,
            json!({
                "status": determination.status.as_str(),
                "catalog_version": determination.catalog_version,
                "rationale": determination.rationale,
                "missing_inputs": determination.missing_inputs,
            }),
        )?;
        Ok(determination)
    }

    pub fn open_collection(&self, transaction_id: Uuid, actor: &str) -> Result<TransactionPhase> {
        self.advance_phase(transaction_id, &LifecycleEvent::CollectionOpened, actor)
    }

    pub fn confirm_exemption(&self, transaction_id: Uuid, actor: &str) -> Result<TransactionPhase> {
        let tx = self.store.fetch_transaction(transaction_id)?;
        if tx.determination.status != DeterminationStatus::Exempt {
            bail!(
                "transaction {transaction_id} is {}, not exempt",
                tx.determination.status.as_str()
            );
        }
        self.advance_phase(transaction_id, &LifecycleEvent::ExemptionConfirmed, actor)
    }

    pub fn reopen_filing(&self, transaction_id: Uuid, actor: &str) -> Result<TransactionPhase> {
        self.advance_phase(transaction_id, &LifecycleEvent::FilingReopened, actor)
    }

    /// Issue a collection link for one party slot. Re-issuing the same slot
    /// converges on the same record and does not disturb submitted data.
    pub fn issue_link(
        &self,
        transaction_id: Uuid,
        role: PartyRole,
        created_seq: u32,
        actor: &str,
    ) -> Result<Uuid> {
        self.store.fetch_transaction(transaction_id)?;
        let issued = issue_party_link(transaction_id, role, created_seq);
        let party_id = issued.party_id;
        let already_known = self
            .store
            .fetch_parties(transaction_id)?
            .iter()
            .any(|p| p.party_id == party_id);
        if !already_known {
            self.store.upsert_party(&issued)?;
            self.append_audit(
                "party",
                &party_id.to_string(),
                "party_link_issued",
                actor,
                json!({ "role": role.as_str(), "created_seq": created_seq }),
            )?;
        }
        Ok(party_id)
    }

    /// Accept one party submission and re-sync the model. A submission that
    /// lands while the transaction is ready to file drops it back to
    /// collecting before the model is rebuilt.
    pub fn submit_party(
        &self,
        transaction_id: Uuid,
        role: PartyRole,
        created_seq: u32,
        payload: &Value,
    ) -> Result<SyncReport> {
        let tx = self.store.fetch_transaction(transaction_id)?;
        let parsed =
            parse_submission(payload).map_err(|e| anyhow!("party submission rejected: {e}"))?;

        let issued = issue_party_link(transaction_id, role, created_seq);
        let mut record = self
            .store
            .fetch_parties(transaction_id)?
            .into_iter()
            .find(|p| p.party_id == issued.party_id)
            .unwrap_or(issued);
        apply_submission(&mut record, parsed, payload.clone(), self.now_utc());
        self.store.upsert_party(&record)?;
        self.append_audit(
            "party",
            &record.party_id.to_string(),
            "party_submitted",
            &format!("party:{}", record.party_id),
            json!({
                "role": record.role.as_str(),
                "created_seq": record.created_seq,
                "status": record.status.as_str(),
            }),
        )?;

        if tx.phase == TransactionPhase::ReadyToFile {
            self.advance_phase(
                transaction_id,
                &LifecycleEvent::PartyDataChanged,
                "system:intake",
            )?;
        }
        self.reconcile_now(transaction_id)
    }

    /// Staff verification of a submitted party slot.
    pub fn verify_party(&self, transaction_id: Uuid, created_seq: u32, actor: &str) -> Result<()> {
        let mut record = self
            .store
            .fetch_parties(transaction_id)?
            .into_iter()
            .find(|p| p.created_seq == created_seq)
            .ok_or_else(|| anyhow!("no party slot {created_seq} on {transaction_id}"))?;
        verify_submission(&mut record).map_err(|e| anyhow!("verification refused: {e}"))?;
        self.store.upsert_party(&record)?;
        self.append_audit(
            "party",
            &record.party_id.to_string(),
            "party_verified",
            actor,
            json!({ "created_seq": record.created_seq }),
        )?;
        Ok(())
    }

    /// Merge the party log into the canonical model, store it, and feed the
    /// result into the gateway's freshness guard.
    pub fn reconcile_now(&self, transaction_id: Uuid) -> Result<SyncReport> {
        let parties = self.store.fetch_parties(transaction_id)?;
        let prev = self.store.fetch_collection_model(transaction_id)?;
        let (model, report) = reconcile(&parties, prev.as_ref());
        self.store
            .set_collection_model(transaction_id, &model, self.now_utc())?;
        self.gateway.record_reconcile_result(report.is_clean());
        self.append_audit(
            "transaction",
            &transaction_id.to_string(),
            "model_reconciled",
            "system:reconcile",
            json!({
                "synced": report.synced,
                "parties_synced": report.parties_synced,
                "changed_fields": report.changed_fields,
                "warnings": report.warnings.len(),
                "errors": report.errors.len(),
            }),
        )?;
        Ok(report)
    }

    /// Close party collection. Runs the safety-net reconcile pass first and
    /// refuses while any link is unsubmitted, a side is missing, or the
    /// merge is not clean.
    pub fn complete_collection(&self, transaction_id: Uuid, actor: &str) -> Result<SyncReport> {
        let report = self.reconcile_now(transaction_id)?;
        let parties = self.store.fetch_parties(transaction_id)?;

        if let Some(pending) = parties
            .iter()
            .find(|p| p.status == SubmissionStatus::Pending)
        {
            bail!(
                "party slot {} (seq {}) has not submitted",
                pending.party_id,
                pending.created_seq
            );
        }
        if !parties.iter().any(|p| p.role == PartyRole::Transferee) {
            bail!("no transferee has submitted");
        }
        if !parties.iter().any(|p| p.role == PartyRole::Transferor) {
            bail!("no transferor has submitted");
        }
        if !report.is_clean() {
            bail!(
                "collection model is not clean: {} warning(s), {} error(s)",
                report.warnings.len(),
                report.errors.len()
            );
        }

        self.advance_phase(transaction_id, &LifecycleEvent::CollectionCompleted, actor)?;
        Ok(report)
    }

    /// Submit the filing: evaluate every gate, claim the attempt slot,
    /// dispatch to the authority and resolve.
    ///
    /// The Pending attempt row is written before the authority call, so
    /// `filing_submitted` can never exist without an attempt record, and a
    /// concurrent call loses the claim rather than filing twice.
    pub fn file(&self, transaction_id: Uuid, actor: &str) -> Result<FileOutcome> {
        let tx = self.store.fetch_transaction(transaction_id)?;
        let model = match self.store.fetch_collection_model(transaction_id)? {
            Some(model) => model,
            None => bail!("transaction {transaction_id} has no collection model"),
        };
        let prior = self.store.fetch_filing_attempts(transaction_id)?;

        let document = match self.gateway.prepare_submission(&tx, &model, &prior) {
            Ok(document) => document,
            Err(refusal) => return Ok(FileOutcome::Refused(refusal)),
        };

        let attempt_no = next_attempt_no(&prior);
        let attempt = FilingAttempt {
            attempt_id: attempt_id_for(transaction_id, attempt_no),
            transaction_id,
            attempt_no,
            filing_reference: filing_reference_for(transaction_id, attempt_no),
            submitted_at_utc: self.now_utc(),
            outcome: AttemptOutcome::Pending,
        };
        if !self.store.claim_filing_slot(&attempt)? {
            // The slot holder may already have resolved; name it while it is
            // still visible, otherwise fall back to the losing attempt id.
            let holder = self
                .store
                .fetch_pending_attempt(transaction_id)?
                .map(|p| p.attempt_id)
                .unwrap_or(attempt.attempt_id);
            return Ok(FileOutcome::Refused(FilingRefusal::AlreadyInFlight {
                attempt_id: holder,
            }));
        }

        self.append_audit(
            "transaction",
            &transaction_id.to_string(),
            "document_built",
            actor,
            json!({
                "bytes": document.xml.len(),
                "preflight_warnings": document.preflight.findings.len(),
            }),
        )?;
        self.append_audit(
            "filing_attempt",
            &attempt.attempt_id.to_string(),
            "attempt_dispatched",
            actor,
            json!({
                "attempt_no": attempt.attempt_no,
                "filing_reference": attempt.filing_reference,
            }),
        )?;
        self.advance_phase(transaction_id, &LifecycleEvent::SubmissionDispatched, actor)?;

        let claim = FilingSlotClaim::from_claimed_slot(
            attempt.attempt_id,
            attempt.filing_reference.clone(),
            attempt.attempt_no,
        );
        let submission = FilingSubmission {
            filing_reference: attempt.filing_reference.clone(),
            transaction_id,
            attempt_no: attempt.attempt_no,
            xml: document.xml,
        };
        let outcome = self.gateway.dispatch(&claim, &submission);

        self.store
            .resolve_filing_attempt(attempt.attempt_id, &outcome)?;
        self.append_audit(
            "filing_attempt",
            &attempt.attempt_id.to_string(),
            "attempt_resolved",
            "authority",
            json!({ "status": outcome.status_str() }),
        )?;
        let event = match &outcome {
            AttemptOutcome::Accepted { .. } => LifecycleEvent::AuthorityAccepted,
            AttemptOutcome::Rejected { .. } => LifecycleEvent::AuthorityRejected,
            AttemptOutcome::TransientFailure { .. } => LifecycleEvent::SubmissionFailedTransient,
            AttemptOutcome::Pending => bail!("dispatch returned a pending outcome"),
        };
        self.advance_phase(transaction_id, &event, actor)?;

        Ok(FileOutcome::Filed(FilingAttempt { outcome, ..attempt }))
    }

    /// Apply one lifecycle event against the stored phase and persist the
    /// move. Bails when the stored phase shifted between read and write.
    fn advance_phase(
        &self,
        transaction_id: Uuid,
        event: &LifecycleEvent,
        actor: &str,
    ) -> Result<TransactionPhase> {
        let tx = self.store.fetch_transaction(transaction_id)?;
        let mut lifecycle = TransactionLifecycle::resume(transaction_id, tx.phase);
        lifecycle.apply(event, None)?;
        let to = lifecycle.phase;

        if to != tx.phase {
            if !self.store.transition_phase(transaction_id, tx.phase, to)? {
                bail!("transaction {transaction_id} changed phase concurrently");
            }
            self.append_audit(
                "transaction",
                &transaction_id.to_string(),
                "phase_changed",
                actor,
                before_after(json!(tx.phase.as_str()), json!(to.as_str())),
            )?;
        }
        Ok(to)
    }

    fn append_audit(
        &self,
        entity_type: &str,
        entity_id: &str,
        event_type: &str,
        actor: &str,
        payload: Value,
    ) -> Result<()> {
        let mut audit = match self.audit.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        audit.append(entity_type, entity_id, event_type, actor, payload)?;
        Ok(())
    }

    fn now_utc(&self) -> DateTime<Utc> {
        // An out-of-range test clock clamps to the epoch.
        DateTime::from_timestamp_millis((self.clock)()).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

//! In-memory stand-in for the `tfd-db` persistence layer.
//!
//! Same method names, same contracts: phase transitions re-check the stored
//! phase under the lock, the attempt claim refuses a second pending row per
//! transaction, party slots update in place and are never deleted. Scenario
//! tests drive the whole pipeline against this store without a database.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use tfd_schemas::{
    AttemptOutcome, CollectionModel, Determination, FilingAttempt, PartyRecord, TransactionPhase,
    TransactionRecord,
};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    transactions: BTreeMap<Uuid, TransactionRecord>,
    parties: BTreeMap<Uuid, PartyRecord>,
    models: BTreeMap<Uuid, (CollectionModel, DateTime<Utc>)>,
    attempts: BTreeMap<Uuid, FilingAttempt>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_transaction(&self, tx: &TransactionRecord) -> Result<()> {
        let mut tables = self.lock();
        if tables.transactions.contains_key(&tx.transaction_id) {
            bail!("transaction {} already exists", tx.transaction_id);
        }
        tables.transactions.insert(tx.transaction_id, tx.clone());
        Ok(())
    }

    pub fn fetch_transaction(&self, transaction_id: Uuid) -> Result<TransactionRecord> {
        self.lock()
            .transactions
            .get(&transaction_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown transaction {transaction_id}"))
    }

    pub fn update_determination(
        &self,
        transaction_id: Uuid,
        determination: &Determination,
    ) -> Result<()> {
        let mut tables = self.lock();
        let tx = tables
            .transactions
            .get_mut(&transaction_id)
            .ok_or_else(|| anyhow!("update_determination: unknown transaction {transaction_id}"))?;
        tx.determination = determination.clone();
        Ok(())
    }

    /// Move a transaction between phases, re-checking the stored phase under
    /// the lock. Returns false when the row was not in `from` (lost race or
    /// stale caller); nothing is written in that case.
    pub fn transition_phase(
        &self,
        transaction_id: Uuid,
        from: TransactionPhase,
        to: TransactionPhase,
    ) -> Result<bool> {
        let mut tables = self.lock();
        let tx = tables
            .transactions
            .get_mut(&transaction_id)
            .ok_or_else(|| anyhow!("transition_phase: unknown transaction {transaction_id}"))?;
        if tx.phase != from {
            return Ok(false);
        }
        tx.phase = to;
        Ok(true)
    }

    /// Insert a party slot or update it in place on (re)submission. Only the
    /// collected data changes; the slot identity (transaction, role,
    /// created_seq) keeps its first-inserted values.
    pub fn upsert_party(&self, party: &PartyRecord) -> Result<()> {
        let mut tables = self.lock();
        match tables.parties.get_mut(&party.party_id) {
            Some(existing) => {
                existing.status = party.status;
                existing.identity = party.identity.clone();
                existing.address = party.address.clone();
                existing.contact = party.contact.clone();
                existing.ownership_percent = party.ownership_percent.clone();
                existing.payment_sources = party.payment_sources.clone();
                existing.raw_payload = party.raw_payload.clone();
                existing.submitted_at_utc = party.submitted_at_utc;
            }
            None => {
                tables.parties.insert(party.party_id, party.clone());
            }
        }
        Ok(())
    }

    /// Full party log for one transaction, in creation order.
    pub fn fetch_parties(&self, transaction_id: Uuid) -> Result<Vec<PartyRecord>> {
        let tables = self.lock();
        let mut parties: Vec<PartyRecord> = tables
            .parties
            .values()
            .filter(|p| p.transaction_id == transaction_id)
            .cloned()
            .collect();
        parties.sort_by_key(|p| p.created_seq);
        Ok(parties)
    }

    /// One canonical model per transaction, replaced wholesale on every
    /// reconciliation pass.
    pub fn set_collection_model(
        &self,
        transaction_id: Uuid,
        model: &CollectionModel,
        updated_at_utc: DateTime<Utc>,
    ) -> Result<()> {
        self.lock()
            .models
            .insert(transaction_id, (model.clone(), updated_at_utc));
        Ok(())
    }

    pub fn fetch_collection_model(&self, transaction_id: Uuid) -> Result<Option<CollectionModel>> {
        Ok(self
            .lock()
            .models
            .get(&transaction_id)
            .map(|(model, _)| model.clone()))
    }

    /// Insert the Pending attempt row for one dispatch. Returns true when
    /// this caller won the slot; false when another pending attempt already
    /// holds the per-transaction slot or the attempt number is taken.
    pub fn claim_filing_slot(&self, attempt: &FilingAttempt) -> Result<bool> {
        if !attempt.outcome.is_pending() {
            bail!("claim_filing_slot requires a pending outcome");
        }
        let mut tables = self.lock();
        if !tables.transactions.contains_key(&attempt.transaction_id) {
            bail!(
                "claim_filing_slot: unknown transaction {}",
                attempt.transaction_id
            );
        }
        let conflict = tables.attempts.values().any(|a| {
            a.transaction_id == attempt.transaction_id
                && (a.outcome.is_pending() || a.attempt_no == attempt.attempt_no)
        });
        if conflict {
            return Ok(false);
        }
        tables.attempts.insert(attempt.attempt_id, attempt.clone());
        Ok(true)
    }

    /// Record the authority's answer on a pending attempt. Refuses to touch
    /// a row that has already resolved.
    pub fn resolve_filing_attempt(&self, attempt_id: Uuid, outcome: &AttemptOutcome) -> Result<()> {
        if outcome.is_pending() {
            bail!("resolve_filing_attempt cannot resolve to pending");
        }
        let mut tables = self.lock();
        let attempt = tables
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| anyhow!("resolve_filing_attempt: unknown attempt {attempt_id}"))?;
        if !attempt.outcome.is_pending() {
            bail!("resolve_filing_attempt: attempt {attempt_id} is not pending");
        }
        attempt.outcome = outcome.clone();
        Ok(())
    }

    /// Full attempt history for one transaction, in attempt order.
    pub fn fetch_filing_attempts(&self, transaction_id: Uuid) -> Result<Vec<FilingAttempt>> {
        let tables = self.lock();
        let mut attempts: Vec<FilingAttempt> = tables
            .attempts
            .values()
            .filter(|a| a.transaction_id == transaction_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.attempt_no);
        Ok(attempts)
    }

    /// Recovery query: the attempt a crashed dispatcher may have left
    /// pending.
    pub fn fetch_pending_attempt(&self, transaction_id: Uuid) -> Result<Option<FilingAttempt>> {
        Ok(self
            .lock()
            .attempts
            .values()
            .find(|a| a.transaction_id == transaction_id && a.outcome.is_pending())
            .cloned())
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

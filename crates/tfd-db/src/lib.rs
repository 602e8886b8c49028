use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use tfd_schemas::{
    AttemptOutcome, CollectionModel, Determination, FilingAttempt, PartyRecord, PartyRole,
    SubmissionStatus, TransactionPhase, TransactionRecord,
};

pub const ENV_DB_URL: &str = "TFD_DATABASE_URL";

/// Connect to Postgres using TFD_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='transactions'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_transactions_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_transactions_table: bool,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

pub async fn insert_transaction(pool: &PgPool, tx: &TransactionRecord) -> Result<()> {
    sqlx::query(
        r#"
        insert into transactions (
          transaction_id, file_number, property, closing_date,
          consideration_cents, financing, transfer_context, buyer_profile,
          determination, phase, created_at_utc
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
        )
        "#,
    )
    .bind(tx.transaction_id)
    .bind(&tx.file_number)
    .bind(to_json(&tx.property, "property")?)
    .bind(tx.closing_date)
    .bind(tx.consideration_cents)
    .bind(opt_to_json(&tx.financing, "financing")?)
    .bind(to_json(&tx.transfer_context, "transfer_context")?)
    .bind(opt_to_json(&tx.buyer_profile, "buyer_profile")?)
    .bind(to_json(&tx.determination, "determination")?)
    .bind(tx.phase.as_str())
    .bind(tx.created_at_utc)
    .execute(pool)
    .await
    .context("insert_transaction failed")?;

    Ok(())
}

pub async fn fetch_transaction(pool: &PgPool, transaction_id: Uuid) -> Result<TransactionRecord> {
    let row = sqlx::query(
        r#"
        select
          transaction_id, file_number, property, closing_date,
          consideration_cents, financing, transfer_context, buyer_profile,
          determination, phase, created_at_utc
        from transactions
        where transaction_id = $1
        "#,
    )
    .bind(transaction_id)
    .fetch_one(pool)
    .await
    .context("fetch_transaction failed")?;

    row_to_transaction(&row)
}

/// Replace the stored determination after a catalog run.
pub async fn update_determination(
    pool: &PgPool,
    transaction_id: Uuid,
    determination: &Determination,
) -> Result<()> {
    let res = sqlx::query("update transactions set determination = $2 where transaction_id = $1")
        .bind(transaction_id)
        .bind(to_json(determination, "determination")?)
        .execute(pool)
        .await
        .context("update_determination failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!(
            "update_determination: unknown transaction {transaction_id}"
        ));
    }
    Ok(())
}

/// Move a transaction between phases, re-checking the current phase inside
/// the update itself. Returns false when the row was not in `from` (lost
/// race or stale caller); nothing is written in that case.
pub async fn transition_phase(
    pool: &PgPool,
    transaction_id: Uuid,
    from: TransactionPhase,
    to: TransactionPhase,
) -> Result<bool> {
    let res = sqlx::query(
        r#"
        update transactions
        set phase = $3
        where transaction_id = $1
          and phase = $2
        "#,
    )
    .bind(transaction_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .execute(pool)
    .await
    .context("transition_phase update failed")?;

    Ok(res.rows_affected() == 1)
}

fn row_to_transaction(row: &PgRow) -> Result<TransactionRecord> {
    let phase_str: String = row.try_get("phase")?;
    let phase = TransactionPhase::parse(&phase_str)
        .ok_or_else(|| anyhow!("invalid phase in transactions row: {phase_str}"))?;

    Ok(TransactionRecord {
        transaction_id: row.try_get("transaction_id")?,
        file_number: row.try_get("file_number")?,
        property: from_json(row.try_get("property")?, "property")?,
        closing_date: row.try_get("closing_date")?,
        consideration_cents: row.try_get("consideration_cents")?,
        financing: opt_from_json(row.try_get("financing")?, "financing")?,
        transfer_context: from_json(row.try_get("transfer_context")?, "transfer_context")?,
        buyer_profile: opt_from_json(row.try_get("buyer_profile")?, "buyer_profile")?,
        determination: from_json(row.try_get("determination")?, "determination")?,
        phase,
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

// ---------------------------------------------------------------------------
// Parties
// ---------------------------------------------------------------------------

/// Insert a party slot or update it in place on (re)submission. The slot
/// identity (transaction, role, created_seq) never changes; rows are never
/// deleted.
pub async fn upsert_party(pool: &PgPool, party: &PartyRecord) -> Result<()> {
    sqlx::query(
        r#"
        insert into parties (
          party_id, transaction_id, role, created_seq, status, identity,
          address, contact, ownership_percent, payment_sources, raw_payload,
          submitted_at_utc
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
        )
        on conflict (party_id) do update set
          status = excluded.status,
          identity = excluded.identity,
          address = excluded.address,
          contact = excluded.contact,
          ownership_percent = excluded.ownership_percent,
          payment_sources = excluded.payment_sources,
          raw_payload = excluded.raw_payload,
          submitted_at_utc = excluded.submitted_at_utc
        "#,
    )
    .bind(party.party_id)
    .bind(party.transaction_id)
    .bind(party.role.as_str())
    .bind(party.created_seq as i32)
    .bind(party.status.as_str())
    .bind(opt_to_json(&party.identity, "identity")?)
    .bind(opt_to_json(&party.address, "address")?)
    .bind(opt_to_json(&party.contact, "contact")?)
    .bind(&party.ownership_percent)
    .bind(to_json(&party.payment_sources, "payment_sources")?)
    .bind(&party.raw_payload)
    .bind(party.submitted_at_utc)
    .execute(pool)
    .await
    .context("upsert_party failed")?;

    Ok(())
}

/// Full party log for one transaction, in creation order.
pub async fn fetch_parties(pool: &PgPool, transaction_id: Uuid) -> Result<Vec<PartyRecord>> {
    let rows = sqlx::query(
        r#"
        select
          party_id, transaction_id, role, created_seq, status, identity,
          address, contact, ownership_percent, payment_sources, raw_payload,
          submitted_at_utc
        from parties
        where transaction_id = $1
        order by created_seq
        "#,
    )
    .bind(transaction_id)
    .fetch_all(pool)
    .await
    .context("fetch_parties failed")?;

    let mut parties = Vec::with_capacity(rows.len());
    for row in &rows {
        parties.push(row_to_party(row)?);
    }
    Ok(parties)
}

fn row_to_party(row: &PgRow) -> Result<PartyRecord> {
    let role_str: String = row.try_get("role")?;
    let role = PartyRole::parse(&role_str)
        .ok_or_else(|| anyhow!("invalid role in parties row: {role_str}"))?;
    let status_str: String = row.try_get("status")?;
    let status = SubmissionStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("invalid status in parties row: {status_str}"))?;

    Ok(PartyRecord {
        party_id: row.try_get("party_id")?,
        transaction_id: row.try_get("transaction_id")?,
        role,
        created_seq: row.try_get::<i32, _>("created_seq")? as u32,
        status,
        identity: opt_from_json(row.try_get("identity")?, "identity")?,
        address: opt_from_json(row.try_get("address")?, "address")?,
        contact: opt_from_json(row.try_get("contact")?, "contact")?,
        ownership_percent: row.try_get("ownership_percent")?,
        payment_sources: from_json(row.try_get("payment_sources")?, "payment_sources")?,
        raw_payload: row.try_get("raw_payload")?,
        submitted_at_utc: row.try_get("submitted_at_utc")?,
    })
}

// ---------------------------------------------------------------------------
// Collection models
// ---------------------------------------------------------------------------

/// One canonical model per transaction, replaced wholesale on every
/// reconciliation pass.
pub async fn set_collection_model(
    pool: &PgPool,
    transaction_id: Uuid,
    model: &CollectionModel,
    updated_at_utc: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into collection_models (transaction_id, model, updated_at_utc)
        values ($1, $2, $3)
        on conflict (transaction_id) do update set
          model = excluded.model,
          updated_at_utc = excluded.updated_at_utc
        "#,
    )
    .bind(transaction_id)
    .bind(to_json(model, "collection model")?)
    .bind(updated_at_utc)
    .execute(pool)
    .await
    .context("set_collection_model failed")?;

    Ok(())
}

pub async fn fetch_collection_model(
    pool: &PgPool,
    transaction_id: Uuid,
) -> Result<Option<CollectionModel>> {
    let row = sqlx::query("select model from collection_models where transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(pool)
        .await
        .context("fetch_collection_model failed")?;

    match row {
        Some(r) => Ok(Some(from_json(r.try_get("model")?, "collection model")?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Filing attempts
// ---------------------------------------------------------------------------

/// Insert the Pending attempt row for one dispatch. Returns true when this
/// caller won the slot. Two conflicts collapse to false: another pending
/// attempt already holds the per-transaction slot
/// (uq_filing_attempts_single_pending), or another caller claimed the same
/// attempt number first (uq_filing_attempts_tx_no).
pub async fn claim_filing_slot(pool: &PgPool, attempt: &FilingAttempt) -> Result<bool> {
    if !attempt.outcome.is_pending() {
        bail!("claim_filing_slot requires a pending outcome");
    }

    let outcome = to_json(&attempt.outcome, "attempt outcome")?;
    let res = sqlx::query(
        r#"
        insert into filing_attempts (
          attempt_id, transaction_id, attempt_no, filing_reference,
          submitted_at_utc, status, outcome
        ) values (
          $1, $2, $3, $4, $5, 'pending', $6
        )
        "#,
    )
    .bind(attempt.attempt_id)
    .bind(attempt.transaction_id)
    .bind(attempt.attempt_no as i32)
    .bind(&attempt.filing_reference)
    .bind(attempt.submitted_at_utc)
    .bind(&outcome)
    .execute(pool)
    .await;

    match res {
        Ok(_) => Ok(true),
        Err(e) => {
            if is_unique_constraint_violation(&e, "uq_filing_attempts_single_pending")
                || is_unique_constraint_violation(&e, "uq_filing_attempts_tx_no")
            {
                return Ok(false);
            }
            Err(anyhow::Error::new(e).context("claim_filing_slot insert failed"))
        }
    }
}

/// Record the authority's answer on a pending attempt. Refuses to touch a
/// row that has already resolved.
pub async fn resolve_filing_attempt(
    pool: &PgPool,
    attempt_id: Uuid,
    outcome: &AttemptOutcome,
) -> Result<()> {
    if outcome.is_pending() {
        bail!("resolve_filing_attempt cannot resolve to pending");
    }

    let res = sqlx::query(
        r#"
        update filing_attempts
        set status = $2,
            outcome = $3
        where attempt_id = $1
          and status = 'pending'
        "#,
    )
    .bind(attempt_id)
    .bind(outcome.status_str())
    .bind(to_json(outcome, "attempt outcome")?)
    .execute(pool)
    .await
    .context("resolve_filing_attempt update failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!(
            "resolve_filing_attempt: attempt {attempt_id} is not pending"
        ));
    }
    Ok(())
}

/// Full attempt history for one transaction, in attempt order.
pub async fn fetch_filing_attempts(
    pool: &PgPool,
    transaction_id: Uuid,
) -> Result<Vec<FilingAttempt>> {
    let rows = sqlx::query(
        r#"
        select
          attempt_id, transaction_id, attempt_no, filing_reference,
          submitted_at_utc, outcome
        from filing_attempts
        where transaction_id = $1
        order by attempt_no
        "#,
    )
    .bind(transaction_id)
    .fetch_all(pool)
    .await
    .context("fetch_filing_attempts failed")?;

    let mut attempts = Vec::with_capacity(rows.len());
    for row in &rows {
        attempts.push(row_to_attempt(row)?);
    }
    Ok(attempts)
}

/// Recovery query: the attempt a crashed dispatcher may have left pending.
pub async fn fetch_pending_attempt(
    pool: &PgPool,
    transaction_id: Uuid,
) -> Result<Option<FilingAttempt>> {
    let row = sqlx::query(
        r#"
        select
          attempt_id, transaction_id, attempt_no, filing_reference,
          submitted_at_utc, outcome
        from filing_attempts
        where transaction_id = $1
          and status = 'pending'
        "#,
    )
    .bind(transaction_id)
    .fetch_optional(pool)
    .await
    .context("fetch_pending_attempt failed")?;

    match row {
        Some(r) => Ok(Some(row_to_attempt(&r)?)),
        None => Ok(None),
    }
}

fn row_to_attempt(row: &PgRow) -> Result<FilingAttempt> {
    Ok(FilingAttempt {
        attempt_id: row.try_get("attempt_id")?,
        transaction_id: row.try_get("transaction_id")?,
        attempt_no: row.try_get::<i32, _>("attempt_no")? as u32,
        filing_reference: row.try_get("filing_reference")?,
        submitted_at_utc: row.try_get("submitted_at_utc")?,
        outcome: from_json(row.try_get("outcome")?, "attempt outcome")?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Detect a Postgres unique constraint violation by name.
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<Value> {
    serde_json::to_value(value).with_context(|| format!("encode {what} failed"))
}

fn from_json<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value).with_context(|| format!("decode {what} failed"))
}

fn opt_to_json<T: serde::Serialize>(value: &Option<T>, what: &str) -> Result<Option<Value>> {
    match value {
        Some(v) => Ok(Some(to_json(v, what)?)),
        None => Ok(None),
    }
}

fn opt_from_json<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    what: &str,
) -> Result<Option<T>> {
    match value {
        Some(v) => Ok(Some(from_json(v, what)?)),
        None => Ok(None),
    }
}

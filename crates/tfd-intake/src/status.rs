//! Party link issuance and submission-status transitions.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::payload::{IntakeError, ParsedSubmission};
use tfd_schemas::{PartyRecord, PartyRole, SubmissionStatus};

/// Create the record for a newly issued collection link. The party id is
/// derived from (transaction, sequence), so re-issuing the same link cannot
/// mint a second identity for the same slot.
pub fn issue_party_link(transaction_id: Uuid, role: PartyRole, created_seq: u32) -> PartyRecord {
    let party_id = Uuid::new_v5(
        &transaction_id,
        format!("party:{created_seq}").as_bytes(),
    );
    PartyRecord {
        party_id,
        transaction_id,
        role,
        created_seq,
        status: SubmissionStatus::Pending,
        identity: None,
        address: None,
        contact: None,
        ownership_percent: None,
        payment_sources: Vec::new(),
        raw_payload: Value::Null,
        submitted_at_utc: None,
    }
}

/// Apply a parsed submission to its record. First write moves the record to
/// submitted; a resubmission replaces the collected data wholesale (last
/// write wins) but keeps the party id, the creation sequence, and a
/// verified status. Records are superseded in place, never deleted.
pub fn apply_submission(
    record: &mut PartyRecord,
    parsed: ParsedSubmission,
    raw_payload: Value,
    submitted_at: DateTime<Utc>,
) {
    record.identity = Some(parsed.identity);
    record.address = parsed.address;
    record.contact = parsed.contact;
    record.ownership_percent = parsed.ownership_percent;
    record.payment_sources = parsed.payment_sources;
    record.raw_payload = raw_payload;
    record.submitted_at_utc = Some(submitted_at);
    if record.status == SubmissionStatus::Pending {
        record.status = SubmissionStatus::Submitted;
    }
}

/// Staff verification. Only a submitted record can be verified; a verified
/// record stays verified.
pub fn verify_submission(record: &mut PartyRecord) -> Result<(), IntakeError> {
    match record.status {
        SubmissionStatus::Pending => Err(IntakeError::NotSubmitted),
        SubmissionStatus::Submitted | SubmissionStatus::Verified => {
            record.status = SubmissionStatus::Verified;
            Ok(())
        }
    }
}

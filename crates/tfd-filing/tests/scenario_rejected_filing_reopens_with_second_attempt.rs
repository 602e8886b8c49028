//! Scenario: the authority rejects a filing (E-103 missing address), staff
//! reopen, fix the data and file again.
//!
//! # Invariants under test
//! 1. A rejection never erases anything: attempt 1 keeps its code, message
//!    and filing reference forever.
//! 2. The second submission creates a second attempt with a distinct
//!    deterministic reference; it never reuses attempt 1's slot.
//! 3. Attempt numbers stay dense (1, 2) and the lifecycle walks
//!    rejected → collecting → ready_to_file → submitted → accepted.
//! 4. The authority is called exactly once per attempt.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{NaiveDate, Utc};
use tfd_filing::{
    attempt_id_for, filing_reference_for, next_attempt_no, AuthorityClient, AuthorityError,
    AuthorityResponse, FilingGateway, FilingSlotClaim, FilingSubmission, LifecycleEvent,
    TransactionLifecycle,
};
use tfd_schemas::{
    AttemptOutcome, BuyerIndividual, CollectionModel, Determination, DeterminationStatus,
    FilingAttempt, Financing, ModelAddress, PropertyInfo, PropertyUse, SellerEntry,
    TransactionPhase, TransactionRecord, TransferContext,
};
use uuid::Uuid;

/// Rejects the first submission with E-103, accepts the second.
struct ScriptedAuthority {
    calls: Rc<Cell<u32>>,
}

impl AuthorityClient for ScriptedAuthority {
    fn submit(&self, _s: &FilingSubmission) -> Result<AuthorityResponse, AuthorityError> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n == 1 {
            Ok(AuthorityResponse::Rejected {
                code: "E-103".to_string(),
                message: "missing address".to_string(),
            })
        } else {
            Ok(AuthorityResponse::Accepted { receipt_id: "R-2026-117".to_string() })
        }
    }
}

fn transaction(tx_id: Uuid) -> TransactionRecord {
    TransactionRecord {
        transaction_id: tx_id,
        file_number: "RE-2026-0147".to_string(),
        property: PropertyInfo {
            street: "12 Harbor Rd".to_string(),
            city: "Mystic".to_string(),
            state: "CT".to_string(),
            postal_code: "06355".to_string(),
            county: "New London".to_string(),
            legal_description: None,
            parcel_id: None,
            property_use: PropertyUse::SingleFamily,
        },
        closing_date: NaiveDate::from_ymd_opt(2026, 3, 2),
        consideration_cents: Some(42_500_000),
        financing: Some(Financing::Cash),
        transfer_context: TransferContext::default(),
        buyer_profile: None,
        determination: Determination {
            status: DeterminationStatus::Reportable,
            catalog_version: "2026.1".to_string(),
            rationale: Vec::new(),
            missing_inputs: Vec::new(),
            evaluated_at_utc: None,
        },
        phase: TransactionPhase::Draft,
        created_at_utc: Utc::now(),
    }
}

fn model_without_buyer_address() -> CollectionModel {
    CollectionModel {
        buyer_individual: Some(BuyerIndividual {
            last_name: "Reyes".to_string(),
            first_name: "Ana".to_string(),
            tax_id: Some("123456789".to_string()),
            ..Default::default()
        }),
        sellers: vec![SellerEntry {
            kind: "individual".to_string(),
            name: "Vance, Miriam".to_string(),
            tax_id: Some("456789123".to_string()),
            address: None,
        }],
        payment_sources: vec![tfd_schemas::PaymentSourceEntry {
            amount: "425000.00".to_string(),
            account_type: "wire".to_string(),
            institution_name: None,
            payer_name: None,
        }],
        ..Default::default()
    }
}

#[test]
fn rejection_reopen_refile_keeps_both_attempts() {
    let tx_id = Uuid::new_v4();
    let mut tx = transaction(tx_id);
    let mut model = model_without_buyer_address();
    let mut attempts: Vec<FilingAttempt> = Vec::new();

    let now = Rc::new(Cell::new(10_000i64));
    let clock = Rc::clone(&now);
    let authority_calls = Rc::new(Cell::new(0u32));
    let authority = ScriptedAuthority { calls: Rc::clone(&authority_calls) };
    let gw = FilingGateway::new(authority, 60_000, 5, move || clock.get());

    let mut lc = TransactionLifecycle::new(tx_id);
    lc.apply(&LifecycleEvent::CollectionOpened, Some("open-1")).unwrap();
    lc.apply(&LifecycleEvent::CollectionCompleted, Some("ready-1")).unwrap();
    tx.phase = lc.phase;
    gw.record_reconcile_result(true);

    // ---- attempt 1: prepared, dispatched, rejected -------------------------
    let doc1 = gw.prepare_submission(&tx, &model, &attempts).expect("gates clear");
    let no1 = next_attempt_no(&attempts);
    assert_eq!(no1, 1);
    let claim1 = FilingSlotClaim::from_claimed_slot(
        attempt_id_for(tx_id, no1),
        filing_reference_for(tx_id, no1),
        no1,
    );
    attempts.push(FilingAttempt {
        attempt_id: claim1.attempt_id,
        transaction_id: tx_id,
        attempt_no: no1,
        filing_reference: claim1.filing_reference.clone(),
        submitted_at_utc: Utc::now(),
        outcome: AttemptOutcome::Pending,
    });
    lc.apply(&LifecycleEvent::SubmissionDispatched, Some("dispatch-1")).unwrap();
    tx.phase = lc.phase;

    let outcome1 = gw.dispatch(
        &claim1,
        &FilingSubmission {
            filing_reference: claim1.filing_reference.clone(),
            transaction_id: tx_id,
            attempt_no: no1,
            xml: doc1.xml,
        },
    );
    attempts[0].outcome = outcome1.clone();
    match outcome1 {
        AttemptOutcome::Rejected { ref code, ref message } => {
            assert_eq!(code, "E-103");
            assert_eq!(message, "missing address");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    lc.apply(&LifecycleEvent::AuthorityRejected, Some("reject-1")).unwrap();
    assert_eq!(lc.phase, TransactionPhase::FilingRejected);

    // ---- staff fix the address and refile ----------------------------------
    lc.apply(&LifecycleEvent::FilingReopened, Some("reopen-1")).unwrap();
    assert_eq!(lc.phase, TransactionPhase::Collecting);
    if let Some(buyer) = model.buyer_individual.as_mut() {
        buyer.address = Some(ModelAddress {
            street: "400 Pier Ave".to_string(),
            city: "Norfolk".to_string(),
            state_or_province: Some("VA".to_string()),
            postal_code: Some("23510".to_string()),
            country: Some("US".to_string()),
        });
    }
    lc.apply(&LifecycleEvent::CollectionCompleted, Some("ready-2")).unwrap();
    tx.phase = lc.phase;
    gw.record_reconcile_result(true);

    // ---- attempt 2: distinct slot, accepted --------------------------------
    let doc2 = gw.prepare_submission(&tx, &model, &attempts).expect("refile gates clear");
    let no2 = next_attempt_no(&attempts);
    assert_eq!(no2, 2, "attempt numbers stay dense");
    let claim2 = FilingSlotClaim::from_claimed_slot(
        attempt_id_for(tx_id, no2),
        filing_reference_for(tx_id, no2),
        no2,
    );
    assert_ne!(claim2.filing_reference, claim1.filing_reference);
    assert_ne!(claim2.attempt_id, claim1.attempt_id);
    attempts.push(FilingAttempt {
        attempt_id: claim2.attempt_id,
        transaction_id: tx_id,
        attempt_no: no2,
        filing_reference: claim2.filing_reference.clone(),
        submitted_at_utc: Utc::now(),
        outcome: AttemptOutcome::Pending,
    });
    lc.apply(&LifecycleEvent::SubmissionDispatched, Some("dispatch-2")).unwrap();

    let outcome2 = gw.dispatch(
        &claim2,
        &FilingSubmission {
            filing_reference: claim2.filing_reference.clone(),
            transaction_id: tx_id,
            attempt_no: no2,
            xml: doc2.xml,
        },
    );
    attempts[1].outcome = outcome2;
    lc.apply(&LifecycleEvent::AuthorityAccepted, Some("accept-2")).unwrap();

    // ---- nothing was erased -------------------------------------------------
    assert_eq!(lc.phase, TransactionPhase::FilingAccepted);
    assert!(lc.is_terminal());
    assert_eq!(attempts.len(), 2, "both attempts retained");
    assert_eq!(attempts[0].attempt_no, 1);
    assert_eq!(attempts[1].attempt_no, 2);
    match &attempts[0].outcome {
        AttemptOutcome::Rejected { code, message } => {
            assert_eq!(code, "E-103");
            assert_eq!(message, "missing address");
        }
        other => panic!("attempt 1 must keep its rejection, got {other:?}"),
    }
    match &attempts[1].outcome {
        AttemptOutcome::Accepted { receipt_id } => assert_eq!(receipt_id, "R-2026-117"),
        other => panic!("attempt 2 must be accepted, got {other:?}"),
    }
    assert_eq!(authority_calls.get(), 2, "exactly one authority call per attempt");
}

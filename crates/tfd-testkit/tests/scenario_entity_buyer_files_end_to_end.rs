//! Full desk pass for an entity transferee: determination, collection with
//! beneficial owners, reconcile, preflight, dispatch, acceptance. The paper
//! authority answers; every hop lands in the audit chain.

use std::sync::Arc;

use tfd_authority_paper::PaperAuthority;
use tfd_schemas::{AttemptOutcome, DeterminationStatus, PartyRole, TransactionPhase};
use tfd_testkit::fixtures::{self, TestClock, OPENED_AT_MS};
use tfd_testkit::{FileOutcome, Orchestrator};

#[test]
fn entity_buyer_files_end_to_end() -> anyhow::Result<()> {
    let clock = TestClock::at(OPENED_AT_MS);
    let authority = Arc::new(PaperAuthority::new());
    let desk =
        Orchestrator::with_temp_audit(Arc::clone(&authority), 3_600_000, 5, clock.reader())?;

    let tx = fixtures::reportable_transaction();
    let tx_id = tx.transaction_id;
    desk.open_transaction(&tx, "staff:mreyes")?;

    let determination = desk.run_determination(tx_id, "staff:mreyes")?;
    assert_eq!(determination.status, DeterminationStatus::Reportable);

    desk.open_collection(tx_id, "staff:mreyes")?;
    desk.issue_link(tx_id, PartyRole::Transferee, 1, "staff:mreyes")?;
    desk.issue_link(tx_id, PartyRole::BeneficialOwner, 2, "staff:mreyes")?;
    desk.issue_link(tx_id, PartyRole::BeneficialOwner, 3, "staff:mreyes")?;
    desk.issue_link(tx_id, PartyRole::Transferor, 4, "staff:mreyes")?;

    desk.submit_party(
        tx_id,
        PartyRole::Transferee,
        1,
        &fixtures::entity_buyer_payload("Harbor Point Holdings LLC"),
    )?;
    desk.submit_party(
        tx_id,
        PartyRole::BeneficialOwner,
        2,
        &fixtures::beneficial_owner_payload("Okafor", "Chidi", "60"),
    )?;
    desk.submit_party(
        tx_id,
        PartyRole::BeneficialOwner,
        3,
        &fixtures::beneficial_owner_payload("Lindqvist", "Sofia", "40.0"),
    )?;
    let report = desk.submit_party(
        tx_id,
        PartyRole::Transferor,
        4,
        &fixtures::seller_individual_payload("Vance", "Miriam"),
    )?;
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);

    desk.verify_party(tx_id, 1, "staff:mreyes")?;
    desk.verify_party(tx_id, 4, "staff:mreyes")?;

    desk.complete_collection(tx_id, "staff:mreyes")?;
    assert_eq!(
        desk.store().fetch_transaction(tx_id)?.phase,
        TransactionPhase::ReadyToFile
    );

    // Two minutes of staff review; the reconcile stamp stays fresh.
    clock.advance(120_000);

    let attempt = match desk.file(tx_id, "staff:mreyes")? {
        FileOutcome::Filed(attempt) => attempt,
        FileOutcome::Refused(refusal) => panic!("expected a filed attempt, got: {refusal}"),
    };
    let reference = format!("TFD-{}-1", tx_id.simple());
    assert_eq!(attempt.attempt_no, 1);
    assert_eq!(attempt.filing_reference, reference);
    match &attempt.outcome {
        AttemptOutcome::Accepted { receipt_id } => {
            assert_eq!(receipt_id, &format!("paper:receipt:{reference}"));
        }
        other => panic!("expected acceptance, got {other:?}"),
    }

    // The stored model keeps the owners in creation order, canonicalized.
    let model = desk
        .store()
        .fetch_collection_model(tx_id)?
        .expect("model stored");
    let entity = model.buyer_entity.as_ref().expect("entity section");
    assert_eq!(entity.legal_name, "Harbor Point Holdings LLC");
    assert_eq!(entity.tax_id.as_deref(), Some("123456789"));
    let percents: Vec<_> = entity
        .beneficial_owners
        .iter()
        .map(|bo| bo.ownership_percent.as_deref())
        .collect();
    assert_eq!(percents, vec![Some("60.0"), Some("40.0")]);

    // Rebuilding from the stored state reproduces the dispatched document.
    let stored_tx = desk.store().fetch_transaction(tx_id)?;
    let document = tfd_docgen::build(&stored_tx, &model).expect("document rebuild");
    assert!(document.xml.contains("entityIndicator=\"true\""));
    let first_owner = document.xml.find("Okafor").expect("first owner in document");
    let second_owner = document.xml.find("Lindqvist").expect("second owner in document");
    assert!(first_owner < second_owner, "owners keep creation order");

    assert_eq!(
        desk.store().fetch_transaction(tx_id)?.phase,
        TransactionPhase::FilingAccepted
    );
    assert_eq!(desk.store().fetch_filing_attempts(tx_id)?.len(), 1);
    assert_eq!(authority.call_count(), 1);
    assert_eq!(authority.processed_count(), 1);

    match tfd_audit::verify_hash_chain(desk.audit_path())? {
        tfd_audit::VerifyResult::Valid { lines } => {
            assert!(lines >= 12, "expected a full trail, got {lines} lines");
        }
        tfd_audit::VerifyResult::Broken { line, reason } => {
            panic!("audit chain broken at line {line}: {reason}");
        }
    }
    Ok(())
}

//! `tfd determine` runs the compiled exemption catalog against a transaction
//! fixture and prints the determination as JSON on stdout.

use assert_cmd::prelude::*;
use chrono::{TimeZone, Utc};
use predicates::prelude::*;
use uuid::Uuid;

use tfd_schemas::{
    BuyerProfile, Determination, EntityKind, Financing, PropertyInfo, PropertyUse,
    TransactionPhase, TransactionRecord, TransferContext,
};

fn transaction() -> TransactionRecord {
    TransactionRecord {
        transaction_id: Uuid::new_v4(),
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
        closing_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 16),
        consideration_cents: Some(48_500_000),
        financing: Some(Financing::Cash),
        transfer_context: TransferContext::default(),
        buyer_profile: Some(BuyerProfile {
            kind: EntityKind::Entity,
            publicly_traded: false,
            regulated_financial_institution: false,
            government_unit: false,
            trust_kind: None,
        }),
        determination: Determination::not_yet_run(),
        phase: TransactionPhase::Draft,
        created_at_utc: Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
    }
}

#[test]
fn determine_reports_a_gift_exemption_with_its_rule_id() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut tx = transaction();
    tx.transfer_context.no_consideration_gift = true;
    tx.consideration_cents = None;
    let tx_path = dir.path().join("transaction.json");
    std::fs::write(&tx_path, serde_json::to_string_pretty(&tx)?)?;

    let mut cmd = assert_cmd::Command::cargo_bin("tfd-cli")?;
    cmd.arg("determine").arg("--transaction").arg(&tx_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"exempt\""))
        .stdout(predicate::str::contains("EX-XFER-GIFT"))
        .stdout(predicate::str::contains("2026.1"));
    Ok(())
}

#[test]
fn determine_lists_missing_inputs_when_facts_are_incomplete() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut tx = transaction();
    tx.financing = None;
    let tx_path = dir.path().join("transaction.json");
    std::fs::write(&tx_path, serde_json::to_string_pretty(&tx)?)?;

    let mut cmd = assert_cmd::Command::cargo_bin("tfd-cli")?;
    cmd.arg("determine").arg("--transaction").arg(&tx_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"undetermined\""))
        .stdout(predicate::str::contains("\"financing\""));
    Ok(())
}

#[test]
fn determine_fails_cleanly_on_a_missing_fixture() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::Command::cargo_bin("tfd-cli")?;
    cmd.arg("determine")
        .arg("--transaction")
        .arg("/nonexistent/transaction.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("read transaction file"));
    Ok(())
}

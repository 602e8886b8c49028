//! `tfd reconcile` folds a party submission log into the collection model and
//! prints both the model and the sync report, so operators can inspect exactly
//! what the document builder would consume.

use assert_cmd::prelude::*;
use chrono::{TimeZone, Utc};
use predicates::prelude::*;
use serde_json::json;
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

fn entity_buyer_payload() -> serde_json::Value {
    json!({
        "kind": "entity",
        "entity": {
            "legalName": "Harbor Point Holdings LLC",
            "taxIdKind": "ein",
            "taxId": "12-3456789",
            "formationJurisdiction": "DE",
            "entityType": "LLC"
        },
        "address": {
            "street": "12 Harbor Rd",
            "city": "Mystic",
            "stateOrProvince": "CT",
            "postalCode": "06355",
            "country": "United States"
        },
        "contact": { "phone": "+1 (860) 555-0144" },
        "paymentSources": [
            { "amount": "$300,000", "accountType": "wire", "institutionName": "First Harbor Bank" },
            { "amount": "185000", "accountType": "check", "payerName": "Harbor Point Holdings LLC" }
        ]
    })
}

fn seller_payload() -> serde_json::Value {
    json!({
        "kind": "individual",
        "individual": {
            "lastName": "Vance",
            "firstName": "Miriam",
            "taxIdKind": "ssn",
            "taxId": "555-12-8899"
        },
        "address": {
            "street": "400 Pier Ave",
            "city": "Norfolk",
            "stateOrProvince": "VA",
            "postalCode": "23510",
            "country": "US"
        }
    })
}

#[test]
fn reconcile_prints_the_model_and_a_clean_report() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let tx = transaction();
    let tx_path = dir.path().join("transaction.json");
    std::fs::write(&tx_path, serde_json::to_string_pretty(&tx)?)?;

    let parties = json!([
        { "role": "transferee", "createdSeq": 1, "payload": entity_buyer_payload() },
        { "role": "transferor", "createdSeq": 2, "payload": seller_payload() },
    ]);
    let parties_path = dir.path().join("parties.json");
    std::fs::write(&parties_path, serde_json::to_string_pretty(&parties)?)?;

    let mut cmd = assert_cmd::Command::cargo_bin("tfd-cli")?;
    cmd.arg("reconcile")
        .arg("--transaction")
        .arg(&tx_path)
        .arg("--parties")
        .arg(&parties_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Harbor Point Holdings LLC"))
        .stdout(predicate::str::contains("\"buyerEntity\""))
        .stdout(predicate::str::contains("\"parties_synced\": 2"))
        .stdout(predicate::str::contains("\"warnings\": []"));
    Ok(())
}

#[test]
fn reconcile_rejects_a_payload_the_intake_rules_refuse() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let tx = transaction();
    let tx_path = dir.path().join("transaction.json");
    std::fs::write(&tx_path, serde_json::to_string_pretty(&tx)?)?;

    let mut bad = entity_buyer_payload();
    bad["entity"]["taxId"] = json!("##-#######");
    let parties = json!([
        { "role": "transferee", "createdSeq": 1, "payload": bad },
    ]);
    let parties_path = dir.path().join("parties.json");
    std::fs::write(&parties_path, serde_json::to_string_pretty(&parties)?)?;

    let mut cmd = assert_cmd::Command::cargo_bin("tfd-cli")?;
    cmd.arg("reconcile")
        .arg("--transaction")
        .arg(&tx_path)
        .arg("--parties")
        .arg(&parties_path);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("rejected at intake"));
    Ok(())
}

//! Canned transactions, submission payloads and a settable clock.
//!
//! The transaction fixtures are tuned against the 2026.1 exemption catalog:
//! `reportable_transaction` evaluates Reportable (entity transferee, cash,
//! single-family), `gift_exempt_transaction` trips the gift rule, and
//! `undetermined_transaction` omits the financing fact. Payload builders
//! emit the camelCase wire shape the collection surface posts.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use tfd_schemas::{
    BuyerProfile, Determination, EntityKind, Financing, PropertyInfo, PropertyUse,
    TransactionPhase, TransactionRecord, TransferContext,
};

/// Shared test clock, milliseconds since the epoch. `reader()` hands the
/// gateway an owned closure; the test keeps this handle and moves time
/// explicitly.
#[derive(Clone)]
pub struct TestClock {
    now_ms: Arc<AtomicI64>,
}

impl TestClock {
    pub fn at(start_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::Relaxed)
    }

    pub fn reader(&self) -> impl Fn() -> i64 + Clone + Send + Sync + 'static {
        let now_ms = Arc::clone(&self.now_ms);
        move || now_ms.load(Ordering::Relaxed)
    }
}

/// 2026-02-01T09:00:00Z, the fixtures' common opening instant.
pub const OPENED_AT_MS: i64 = 1_769_936_400_000;

fn base_transaction(file_number: &str) -> TransactionRecord {
    TransactionRecord {
        transaction_id: Uuid::new_v4(),
        file_number: file_number.to_string(),
        property: PropertyInfo {
            street: "12 Harbor Rd".to_string(),
            city: "Mystic".to_string(),
            state: "CT".to_string(),
            postal_code: "06355".to_string(),
            county: "New London".to_string(),
            legal_description: None,
            parcel_id: Some("NL-114-220".to_string()),
            property_use: PropertyUse::SingleFamily,
        },
        closing_date: NaiveDate::from_ymd_opt(2026, 3, 16),
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

/// Single-family cash purchase by a closely held entity. Every fact present,
/// no exemption applies.
pub fn reportable_transaction() -> TransactionRecord {
    base_transaction("RE-2026-0147")
}

/// No-consideration gift transfer; the gift rule exempts it outright.
pub fn gift_exempt_transaction() -> TransactionRecord {
    let mut tx = base_transaction("RE-2026-0212");
    tx.transfer_context.no_consideration_gift = true;
    tx.consideration_cents = None;
    tx
}

/// Financing not yet known; the catalog cannot finish and the outcome is
/// undetermined with `financing` listed as the missing input.
pub fn undetermined_transaction() -> TransactionRecord {
    let mut tx = base_transaction("RE-2026-0033");
    tx.financing = None;
    tx
}

fn mystic_address() -> Value {
    json!({
        "street": "12 Harbor Rd",
        "city": "Mystic",
        "stateOrProvince": "CT",
        "postalCode": "06355",
        "country": "United States"
    })
}

/// Entity transferee payload. Payment sources total the fixture
/// consideration ($485,000) so preflight coverage stays quiet.
pub fn entity_buyer_payload(legal_name: &str) -> Value {
    json!({
        "kind": "entity",
        "entity": {
            "legalName": legal_name,
            "taxIdKind": "ein",
            "taxId": "12-3456789",
            "formationJurisdiction": "DE",
            "entityType": "LLC"
        },
        "address": mystic_address(),
        "contact": { "phone": "+1 (860) 555-0144" },
        "paymentSources": [
            { "amount": "$300,000", "accountType": "wire", "institutionName": "First Harbor Bank" },
            { "amount": "185000", "accountType": "check", "payerName": legal_name }
        ]
    })
}

pub fn individual_buyer_payload(last: &str, first: &str) -> Value {
    json!({
        "kind": "individual",
        "individual": {
            "lastName": last,
            "firstName": first,
            "dateOfBirth": "03/09/1985",
            "taxIdKind": "ssn",
            "taxId": "123-45-6789"
        },
        "address": mystic_address(),
        "contact": { "phone": "+1 (860) 555-0144" },
        "paymentSources": [
            { "amount": "485000.00", "accountType": "wire", "institutionName": "First Harbor Bank" }
        ]
    })
}

pub fn beneficial_owner_payload(last: &str, first: &str, percent: &str) -> Value {
    json!({
        "kind": "individual",
        "individual": {
            "lastName": last,
            "firstName": first,
            "dateOfBirth": "07/22/1979",
            "taxIdKind": "ssn",
            "taxId": "987-65-4321"
        },
        "address": mystic_address(),
        "ownershipPercent": percent
    })
}

pub fn seller_individual_payload(last: &str, first: &str) -> Value {
    json!({
        "kind": "individual",
        "individual": {
            "lastName": last,
            "firstName": first,
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

//! Submission payload parsing.
//!
//! The collection surface posts one JSON document per party. The document
//! declares its entity kind and carries the kind-specific section plus the
//! shared address/contact blocks. Parsing is strict about structure and
//! lenient about content: structural problems are errors here, field-level
//! content problems surface later as reconciliation warnings.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use tfd_reconcile::{tax_id_digits, TransformError};
use tfd_schemas::{
    ContactInfo, EntityIdentity, IndividualIdentity, PartyIdentity, PaymentSourceInput,
    PostalAddress, TaxId, TaxIdKind, TrustIdentity, TrustKind,
};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
pub enum IntakeError {
    /// The payload is not structurally a submission document.
    Malformed(String),
    /// The declared kind is not individual, entity or trust.
    UnknownKind(String),
    /// The declared kind's section is absent.
    MissingSection { kind: &'static str },
    /// A tax id value was present without its kind tag.
    MissingTaxIdKind,
    /// The tax id kind tag is not a known value.
    UnknownTaxIdKind(String),
    /// The tax id value failed canonicalization.
    BadTaxId(TransformError),
    /// Verification requested before any submission arrived.
    NotSubmitted,
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeError::Malformed(detail) => write!(f, "malformed submission: {detail}"),
            IntakeError::UnknownKind(kind) => write!(f, "unknown entity kind '{kind}'"),
            IntakeError::MissingSection { kind } => {
                write!(f, "submission declares kind '{kind}' but carries no '{kind}' section")
            }
            IntakeError::MissingTaxIdKind => {
                write!(f, "tax id value present without a tax id kind")
            }
            IntakeError::UnknownTaxIdKind(kind) => write!(f, "unknown tax id kind '{kind}'"),
            IntakeError::BadTaxId(e) => write!(f, "tax id rejected: {e}"),
            IntakeError::NotSubmitted => write!(f, "record has no submission to verify"),
        }
    }
}

impl std::error::Error for IntakeError {}

// ---------------------------------------------------------------------------
// Wire shapes (camelCase, matching the collection surface)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubmission {
    kind: String,
    individual: Option<RawIndividual>,
    entity: Option<RawEntity>,
    trust: Option<RawTrust>,
    address: Option<RawAddress>,
    contact: Option<RawContact>,
    ownership_percent: Option<Value>,
    #[serde(default)]
    payment_sources: Vec<RawPaymentSource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIndividual {
    last_name: String,
    first_name: String,
    middle_name: Option<String>,
    date_of_birth: Option<String>,
    tax_id_kind: Option<String>,
    tax_id: Option<String>,
    citizenship_country: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntity {
    legal_name: String,
    dba_name: Option<String>,
    tax_id_kind: Option<String>,
    tax_id: Option<String>,
    formation_jurisdiction: Option<String>,
    entity_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrust {
    trust_name: String,
    trust_kind: Option<String>,
    formation_date: Option<String>,
    tax_id_kind: Option<String>,
    tax_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAddress {
    street: String,
    city: String,
    state_or_province: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContact {
    phone: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPaymentSource {
    amount: String,
    account_type: String,
    institution_name: Option<String>,
    payer_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsed output
// ---------------------------------------------------------------------------

/// A submission parsed and door-normalized, ready to apply to a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSubmission {
    pub identity: PartyIdentity,
    pub address: Option<PostalAddress>,
    pub contact: Option<ContactInfo>,
    /// Kept raw; reconciliation canonicalizes.
    pub ownership_percent: Option<String>,
    pub payment_sources: Vec<PaymentSourceInput>,
}

/// Parse one submission document.
pub fn parse_submission(payload: &Value) -> Result<ParsedSubmission, IntakeError> {
    let raw: RawSubmission = serde_json::from_value(payload.clone())
        .map_err(|e| IntakeError::Malformed(e.to_string()))?;

    let identity = match raw.kind.as_str() {
        "individual" => {
            let sec = raw
                .individual
                .ok_or(IntakeError::MissingSection { kind: "individual" })?;
            PartyIdentity::Individual(IndividualIdentity {
                last_name: sec.last_name.trim().to_string(),
                first_name: sec.first_name.trim().to_string(),
                middle_name: clean(sec.middle_name),
                date_of_birth: clean(sec.date_of_birth),
                tax_id: parse_tax_id(sec.tax_id_kind, sec.tax_id)?,
                citizenship_country: clean(sec.citizenship_country),
            })
        }
        "entity" => {
            let sec = raw
                .entity
                .ok_or(IntakeError::MissingSection { kind: "entity" })?;
            PartyIdentity::Entity(EntityIdentity {
                legal_name: sec.legal_name.trim().to_string(),
                dba_name: clean(sec.dba_name),
                tax_id: parse_tax_id(sec.tax_id_kind, sec.tax_id)?,
                formation_jurisdiction: clean(sec.formation_jurisdiction),
                entity_type: clean(sec.entity_type),
            })
        }
        "trust" => {
            let sec = raw
                .trust
                .ok_or(IntakeError::MissingSection { kind: "trust" })?;
            PartyIdentity::Trust(TrustIdentity {
                trust_name: sec.trust_name.trim().to_string(),
                trust_kind: parse_trust_kind(sec.trust_kind),
                formation_date: clean(sec.formation_date),
                tax_id: parse_tax_id(sec.tax_id_kind, sec.tax_id)?,
            })
        }
        other => return Err(IntakeError::UnknownKind(other.to_string())),
    };

    let address = raw.address.map(|a| PostalAddress {
        street: a.street.trim().to_string(),
        city: a.city.trim().to_string(),
        state_or_province: clean(a.state_or_province),
        postal_code: clean(a.postal_code),
        country: clean(a.country),
    });

    let contact = raw.contact.map(|c| ContactInfo {
        phone: clean(c.phone),
        email: clean(c.email),
    });

    let ownership_percent = raw.ownership_percent.and_then(|v| match v {
        Value::String(s) => {
            let t = s.trim().to_string();
            if t.is_empty() {
                None
            } else {
                Some(t)
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    let payment_sources = raw
        .payment_sources
        .into_iter()
        .map(|s| PaymentSourceInput {
            amount: s.amount.trim().to_string(),
            account_type: s.account_type.trim().to_string(),
            institution_name: clean(s.institution_name),
            payer_name: clean(s.payer_name),
        })
        .collect();

    Ok(ParsedSubmission {
        identity,
        address,
        contact,
        ownership_percent,
        payment_sources,
    })
}

fn clean(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Door normalization: the stored tax id value is always canonical.
fn parse_tax_id(
    kind: Option<String>,
    value: Option<String>,
) -> Result<Option<TaxId>, IntakeError> {
    let value = match clean(value) {
        Some(v) => v,
        None => return Ok(None),
    };
    let kind = match clean(kind) {
        Some(k) => k,
        None => return Err(IntakeError::MissingTaxIdKind),
    };
    let kind = match kind.as_str() {
        "ssn" => TaxIdKind::Ssn,
        "itin" => TaxIdKind::Itin,
        "ein" => TaxIdKind::Ein,
        "foreign_tin" => TaxIdKind::ForeignTin,
        other => return Err(IntakeError::UnknownTaxIdKind(other.to_string())),
    };
    let canonical = tax_id_digits(&value, "tax_id").map_err(IntakeError::BadTaxId)?;
    Ok(Some(TaxId {
        kind,
        value: canonical,
    }))
}

fn parse_trust_kind(v: Option<String>) -> Option<TrustKind> {
    match clean(v)?.as_str() {
        "revocable" => Some(TrustKind::Revocable),
        "irrevocable" => Some(TrustKind::Irrevocable),
        "testamentary" => Some(TrustKind::Testamentary),
        "statutory" => Some(TrustKind::Statutory),
        _ => None,
    }
}

//! Shared data model for the transfer-disclosure filing core.
//!
//! Plain serde types only. No IO, no engine logic; every other crate in the
//! workspace speaks these shapes. The `CollectionModel` family serializes
//! with fixed camelCase keys and is a compatibility contract: downstream
//! consumers and stored rows depend on those exact names.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Event envelope (audit / notification hooks)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub entity_type: String,
    pub entity_id: String,
    pub event_type: String,
    pub actor: String,
    pub payload: T,
}

// ---------------------------------------------------------------------------
// Transaction record
// ---------------------------------------------------------------------------

/// Lifecycle phase of a transaction. The legal transitions live in
/// `tfd-filing`; this enum is the shared vocabulary (DB rows, reports, CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPhase {
    Draft,
    Collecting,
    ReadyToFile,
    FilingSubmitted,
    FilingAccepted,
    FilingRejected,
    Exempt,
}

impl TransactionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionPhase::Draft => "draft",
            TransactionPhase::Collecting => "collecting",
            TransactionPhase::ReadyToFile => "ready_to_file",
            TransactionPhase::FilingSubmitted => "filing_submitted",
            TransactionPhase::FilingAccepted => "filing_accepted",
            TransactionPhase::FilingRejected => "filing_rejected",
            TransactionPhase::Exempt => "exempt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TransactionPhase::Draft),
            "collecting" => Some(TransactionPhase::Collecting),
            "ready_to_file" => Some(TransactionPhase::ReadyToFile),
            "filing_submitted" => Some(TransactionPhase::FilingSubmitted),
            "filing_accepted" => Some(TransactionPhase::FilingAccepted),
            "filing_rejected" => Some(TransactionPhase::FilingRejected),
            "exempt" => Some(TransactionPhase::Exempt),
            _ => None,
        }
    }

    /// Terminal phases accept no further lifecycle events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionPhase::FilingAccepted | TransactionPhase::Exempt
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyUse {
    SingleFamily,
    Condominium,
    Cooperative,
    /// 2-4 dwelling units.
    SmallMultiFamily,
    /// Vacant land where the transferee intends residential construction.
    VacantLandResidentialIntent,
    LargeMultiFamily,
    Commercial,
    Industrial,
    VacantLandOther,
}

impl PropertyUse {
    /// Property kinds the reporting regime covers. Everything else is a
    /// per-property exemption regardless of the parties involved.
    pub fn qualifies_as_residential(&self) -> bool {
        matches!(
            self,
            PropertyUse::SingleFamily
                | PropertyUse::Condominium
                | PropertyUse::Cooperative
                | PropertyUse::SmallMultiFamily
                | PropertyUse::VacantLandResidentialIntent
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub county: String,
    pub legal_description: Option<String>,
    pub parcel_id: Option<String>,
    pub property_use: PropertyUse,
}

/// How the purchase is funded. Institutional-lender financing is the fact
/// the financing exemption rules key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Financing {
    Cash,
    Financed { institutional_lender: bool },
    Partial { institutional_lender: bool },
}

/// Transfer-circumstance flags consumed by the transaction-type rules.
/// All default false; staff set them during drafting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferContext {
    pub no_consideration_gift: bool,
    pub death_or_estate: bool,
    pub divorce_decree: bool,
    pub court_supervised: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Individual,
    Entity,
    Trust,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Individual => "individual",
            EntityKind::Entity => "entity",
            EntityKind::Trust => "trust",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "individual" => Some(EntityKind::Individual),
            "entity" => Some(EntityKind::Entity),
            "trust" => Some(EntityKind::Trust),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustKind {
    Revocable,
    Irrevocable,
    Testamentary,
    Statutory,
}

/// What is known about the prospective transferee before party collection.
/// Determination runs on this; the full party record arrives later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerProfile {
    pub kind: EntityKind,
    pub publicly_traded: bool,
    pub regulated_financial_institution: bool,
    pub government_unit: bool,
    pub trust_kind: Option<TrustKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminationStatus {
    Undetermined,
    Exempt,
    Reportable,
}

impl DeterminationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeterminationStatus::Undetermined => "undetermined",
            DeterminationStatus::Exempt => "exempt",
            DeterminationStatus::Reportable => "reportable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "undetermined" => Some(DeterminationStatus::Undetermined),
            "exempt" => Some(DeterminationStatus::Exempt),
            "reportable" => Some(DeterminationStatus::Reportable),
            _ => None,
        }
    }
}

/// Outcome of the exemption catalog run. `rationale` holds the stable ids of
/// every rule that fired, in catalog order; `missing_inputs` is populated
/// only when the status is `Undetermined`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Determination {
    pub status: DeterminationStatus,
    pub catalog_version: String,
    pub rationale: Vec<String>,
    pub missing_inputs: Vec<String>,
    pub evaluated_at_utc: Option<DateTime<Utc>>,
}

impl Determination {
    /// Initial state before any catalog run.
    pub fn not_yet_run() -> Self {
        Determination {
            status: DeterminationStatus::Undetermined,
            catalog_version: String::new(),
            rationale: Vec::new(),
            missing_inputs: Vec::new(),
            evaluated_at_utc: None,
        }
    }

    pub fn is_reportable(&self) -> bool {
        self.status == DeterminationStatus::Reportable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    /// Staff-facing file reference, e.g. "RE-2026-0147".
    pub file_number: String,
    pub property: PropertyInfo,
    pub closing_date: Option<NaiveDate>,
    /// Total consideration in integer cents. Never a float.
    pub consideration_cents: Option<i64>,
    pub financing: Option<Financing>,
    pub transfer_context: TransferContext,
    pub buyer_profile: Option<BuyerProfile>,
    pub determination: Determination,
    pub phase: TransactionPhase,
    pub created_at_utc: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Party records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Transferee,
    Transferor,
    BeneficialOwner,
    Trustee,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Transferee => "transferee",
            PartyRole::Transferor => "transferor",
            PartyRole::BeneficialOwner => "beneficial_owner",
            PartyRole::Trustee => "trustee",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transferee" => Some(PartyRole::Transferee),
            "transferor" => Some(PartyRole::Transferor),
            "beneficial_owner" => Some(PartyRole::BeneficialOwner),
            "trustee" => Some(PartyRole::Trustee),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Submitted,
    Verified,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Verified => "verified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "submitted" => Some(SubmissionStatus::Submitted),
            "verified" => Some(SubmissionStatus::Verified),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxIdKind {
    Ssn,
    Itin,
    Ein,
    ForeignTin,
}

impl TaxIdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxIdKind::Ssn => "ssn",
            TaxIdKind::Itin => "itin",
            TaxIdKind::Ein => "ein",
            TaxIdKind::ForeignTin => "foreign_tin",
        }
    }
}

/// Tax identifier as collected. `value` is digits-only; intake normalizes at
/// the door and reconciliation applies the same transform again (idempotent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxId {
    pub kind: TaxIdKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub state_or_province: Option<String>,
    pub postal_code: Option<String>,
    /// Country as submitted (free text). Reconciliation maps it to a code.
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualIdentity {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    /// As submitted; reconciliation reformats to YYYY-MM-DD.
    pub date_of_birth: Option<String>,
    pub tax_id: Option<TaxId>,
    pub citizenship_country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIdentity {
    pub legal_name: String,
    pub dba_name: Option<String>,
    pub tax_id: Option<TaxId>,
    pub formation_jurisdiction: Option<String>,
    pub entity_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustIdentity {
    pub trust_name: String,
    pub trust_kind: Option<TrustKind>,
    pub formation_date: Option<String>,
    pub tax_id: Option<TaxId>,
}

/// Kind-specific identity data. The tag is the single source of the
/// entity-kind fact; the document builder derives its indicator flags from
/// this tag and from nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartyIdentity {
    Individual(IndividualIdentity),
    Entity(EntityIdentity),
    Trust(TrustIdentity),
}

impl PartyIdentity {
    pub fn kind(&self) -> EntityKind {
        match self {
            PartyIdentity::Individual(_) => EntityKind::Individual,
            PartyIdentity::Entity(_) => EntityKind::Entity,
            PartyIdentity::Trust(_) => EntityKind::Trust,
        }
    }
}

/// One payment source reported by the transferee, pre-transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSourceInput {
    /// Raw amount string as submitted ("425,000.00", "425000").
    pub amount: String,
    pub account_type: String,
    pub institution_name: Option<String>,
    pub payer_name: Option<String>,
}

/// One party's collected data. Records are superseded in place on
/// resubmission, never deleted; `created_seq` is issued when the collection
/// link is created and survives resubmission, giving reconciliation a stable
/// creation order. A freshly issued link has status `Pending` and no
/// identity yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyRecord {
    pub party_id: Uuid,
    pub transaction_id: Uuid,
    pub role: PartyRole,
    pub created_seq: u32,
    pub status: SubmissionStatus,
    pub identity: Option<PartyIdentity>,
    pub address: Option<PostalAddress>,
    pub contact: Option<ContactInfo>,
    /// Percentage stake, beneficial-owner parties only. Raw until transformed.
    pub ownership_percent: Option<String>,
    /// Transferee parties only.
    pub payment_sources: Vec<PaymentSourceInput>,
    /// Submission payload exactly as received.
    pub raw_payload: serde_json::Value,
    pub submitted_at_utc: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Canonical collection model (fixed camelCase wire keys)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAddress {
    pub street: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_or_province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2 where the mapping succeeded, else the raw string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerIndividual {
    pub last_name: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ModelAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeneficialOwnerEntry {
    pub last_name: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership_percent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ModelAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerEntity {
    pub legal_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dba_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formation_jurisdiction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ModelAddress>,
    #[serde(default)]
    pub beneficial_owners: Vec<BeneficialOwnerEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrusteeEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerTrust {
    pub trust_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trustee: Option<TrusteeEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ModelAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerEntry {
    /// "individual" | "entity" | "trust".
    pub kind: String,
    /// Display name: "Last, First" for individuals, legal/trust name otherwise.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ModelAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSourceEntry {
    /// Canonical money string, two decimals, no separators ("425000.00").
    pub amount: String,
    pub account_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_name: Option<String>,
}

/// Canonical merged view of all party submissions for one transaction.
/// Exactly one buyer section is populated; sellers and beneficial owners are
/// ordered by party creation sequence. Reconciliation owns every field here
/// and touches nothing outside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_individual: Option<BuyerIndividual>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_entity: Option<BuyerEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_trust: Option<BuyerTrust>,
    #[serde(default)]
    pub sellers: Vec<SellerEntry>,
    #[serde(default)]
    pub payment_sources: Vec<PaymentSourceEntry>,
}

impl CollectionModel {
    /// Entity kind of the populated buyer section, if any.
    pub fn buyer_kind(&self) -> Option<EntityKind> {
        if self.buyer_individual.is_some() {
            Some(EntityKind::Individual)
        } else if self.buyer_entity.is_some() {
            Some(EntityKind::Entity)
        } else if self.buyer_trust.is_some() {
            Some(EntityKind::Trust)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Filing attempts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Dispatched, authority response not yet recorded.
    Pending,
    Accepted { receipt_id: String },
    Rejected { code: String, message: String },
    /// Timeout or transport failure. Retryable; not an authority decision.
    TransientFailure { detail: String },
}

impl AttemptOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, AttemptOutcome::Pending)
    }

    pub fn status_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Pending => "pending",
            AttemptOutcome::Accepted { .. } => "accepted",
            AttemptOutcome::Rejected { .. } => "rejected",
            AttemptOutcome::TransientFailure { .. } => "transient_failure",
        }
    }
}

/// One dispatch of the filing document to the authority. Append-only; kept
/// for the life of the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingAttempt {
    pub attempt_id: Uuid,
    pub transaction_id: Uuid,
    /// 1-based, dense per transaction.
    pub attempt_no: u32,
    /// Deterministic client reference derived from (transaction_id, attempt_no).
    pub filing_reference: String,
    pub submitted_at_utc: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

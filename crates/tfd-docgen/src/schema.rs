//! Names and code domains of the authority's transfer-report schema.
//!
//! The schema is fixed by the receiving side and versioned independently of
//! this codebase. Every element and attribute name the builder emits lives
//! here so a schema revision is a change to one module, not a hunt through
//! the emitter.

use tfd_schemas::{Financing, PropertyUse};

/// Schema revision the builder targets. Stamped on the document root.
pub const SCHEMA_VERSION: &str = "1.2";

pub const ELEM_ROOT: &str = "TransferDisclosureReport";
pub const ATTR_SCHEMA_VERSION: &str = "schemaVersion";

pub const ELEM_FILING_REFERENCE: &str = "FilingReference";

pub const ELEM_PROPERTY: &str = "Property";
pub const ELEM_STREET_ADDRESS: &str = "StreetAddress";
pub const ELEM_CITY: &str = "City";
pub const ELEM_STATE: &str = "State";
pub const ELEM_POSTAL_CODE: &str = "PostalCode";
pub const ELEM_COUNTY: &str = "County";
pub const ELEM_PARCEL_ID: &str = "ParcelId";
pub const ELEM_LEGAL_DESCRIPTION: &str = "LegalDescription";
pub const ELEM_PROPERTY_USE: &str = "PropertyUse";

pub const ELEM_CLOSING: &str = "Closing";
pub const ELEM_CLOSING_DATE: &str = "ClosingDate";
pub const ELEM_TOTAL_CONSIDERATION: &str = "TotalConsideration";
pub const ELEM_FINANCING_METHOD: &str = "FinancingMethod";

pub const ELEM_TRANSFEREE: &str = "Transferee";
pub const ATTR_ENTITY_INDICATOR: &str = "entityIndicator";
pub const ATTR_TRUST_INDICATOR: &str = "trustIndicator";
pub const ELEM_INDIVIDUAL: &str = "Individual";
pub const ELEM_ENTITY: &str = "Entity";
pub const ELEM_TRUST: &str = "Trust";

pub const ELEM_LAST_NAME: &str = "LastName";
pub const ELEM_FIRST_NAME: &str = "FirstName";
pub const ELEM_MIDDLE_NAME: &str = "MiddleName";
pub const ELEM_DATE_OF_BIRTH: &str = "DateOfBirth";
pub const ELEM_TAX_ID: &str = "TaxId";
pub const ATTR_TAX_ID_KIND: &str = "kind";
pub const ELEM_PHONE: &str = "Phone";

pub const ELEM_LEGAL_NAME: &str = "LegalName";
pub const ELEM_DBA_NAME: &str = "DbaName";
pub const ELEM_FORMATION_JURISDICTION: &str = "FormationJurisdiction";

pub const ELEM_TRUST_NAME: &str = "TrustName";
pub const ELEM_TRUST_KIND: &str = "TrustKind";
pub const ELEM_FORMATION_DATE: &str = "FormationDate";
pub const ELEM_TRUSTEE: &str = "Trustee";
pub const ELEM_NAME: &str = "Name";

pub const ELEM_BENEFICIAL_OWNERS: &str = "BeneficialOwners";
pub const ELEM_BENEFICIAL_OWNER: &str = "BeneficialOwner";
pub const ATTR_OWNERSHIP_PERCENT: &str = "ownershipPercent";

pub const ELEM_ADDRESS: &str = "Address";
pub const ELEM_STREET: &str = "Street";
pub const ELEM_STATE_OR_PROVINCE: &str = "StateOrProvince";
pub const ELEM_COUNTRY: &str = "Country";

pub const ELEM_TRANSFERORS: &str = "Transferors";
pub const ELEM_TRANSFEROR: &str = "Transferor";
pub const ATTR_TRANSFEROR_KIND: &str = "kind";

pub const ELEM_PAYMENT_SOURCES: &str = "PaymentSources";
pub const ELEM_PAYMENT_SOURCE: &str = "PaymentSource";
pub const ELEM_AMOUNT: &str = "Amount";
pub const ELEM_ACCOUNT_TYPE: &str = "AccountType";
pub const ELEM_INSTITUTION_NAME: &str = "InstitutionName";
pub const ELEM_PAYER_NAME: &str = "PayerName";

/// Code for the `PropertyUse` element. Uppercase literals fixed by the schema.
pub fn property_use_code(u: PropertyUse) -> &'static str {
    match u {
        PropertyUse::SingleFamily => "SINGLE_FAMILY",
        PropertyUse::Condominium => "CONDOMINIUM",
        PropertyUse::Cooperative => "COOPERATIVE",
        PropertyUse::SmallMultiFamily => "SMALL_MULTI_FAMILY",
        PropertyUse::VacantLandResidentialIntent => "VACANT_LAND_RESIDENTIAL_INTENT",
        PropertyUse::LargeMultiFamily => "LARGE_MULTI_FAMILY",
        PropertyUse::Commercial => "COMMERCIAL",
        PropertyUse::Industrial => "INDUSTRIAL",
        PropertyUse::VacantLandOther => "VACANT_LAND_OTHER",
    }
}

/// Code for the `FinancingMethod` element.
pub fn financing_code(f: &Financing) -> &'static str {
    match f {
        Financing::Cash => "CASH",
        Financing::Financed { .. } => "FINANCED",
        Financing::Partial { .. } => "PARTIAL",
    }
}

/// Code for the `kind` attribute on `TaxId`. Known kinds get the schema
/// literal; anything else is passed through uppercased so an unrecognized
/// collection value still round-trips visibly instead of vanishing.
pub fn tax_id_kind_code(kind: &str) -> String {
    match kind.to_ascii_lowercase().as_str() {
        "ssn" => "SSN".to_string(),
        "itin" => "ITIN".to_string(),
        "ein" => "EIN".to_string(),
        "foreign_tin" | "foreign-tin" | "foreigntin" => "FOREIGN_TIN".to_string(),
        _ => kind.to_ascii_uppercase(),
    }
}

/// Code for the `kind` attribute on `Transferor`.
pub fn transferor_kind_code(kind: &str) -> &'static str {
    match kind {
        "individual" => "INDIVIDUAL",
        "entity" => "ENTITY",
        "trust" => "TRUST",
        _ => "UNKNOWN",
    }
}

/// Code for the `AccountType` element: uppercase, punctuation and spaces
/// collapsed to single underscores.
pub fn account_type_code(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_uppercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

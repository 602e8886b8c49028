//! The mapping table: which party-record fields feed which model fields,
//! under which transform, keyed by (role, entity kind).
//!
//! This table is the authority on field routing. Auditing what
//! reconciliation does to a field means reading this file, not the merge.

use tfd_schemas::{EntityKind, PartyRole};

/// Transform applied to a source value before it lands in the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    /// Copy the string as-is.
    None,
    TaxIdDigits,
    PhoneDigits,
    /// Free-text country to ISO alpha-2; unknown spellings pass through with
    /// a warning.
    CountryCode,
    /// Any accepted date input to YYYY-MM-DD.
    CanonicalDate,
    /// Money to a fixed two-decimal string.
    Money,
    /// Percentage to a one-decimal string.
    OwnershipPercent,
    /// Compose a display name from the identity: "Last, First" for
    /// individuals, the legal or trust name otherwise.
    DisplayName,
}

/// One row of the mapping table.
pub struct FieldMap {
    /// JSON pointer into the serialized party record.
    pub source: &'static str,
    /// JSON pointer into the model section this party feeds.
    pub target: &'static str,
    pub transform: Transform,
    /// Required fields warn when absent; optional fields are skipped silently.
    pub required: bool,
}

const fn field(
    source: &'static str,
    target: &'static str,
    transform: Transform,
    required: bool,
) -> FieldMap {
    FieldMap {
        source,
        target,
        transform,
        required,
    }
}

const TRANSFEREE_INDIVIDUAL: &[FieldMap] = &[
    field("/identity/last_name", "/lastName", Transform::None, true),
    field("/identity/first_name", "/firstName", Transform::None, true),
    field("/identity/middle_name", "/middleName", Transform::None, false),
    field(
        "/identity/date_of_birth",
        "/dateOfBirth",
        Transform::CanonicalDate,
        false,
    ),
    field(
        "/identity/tax_id/value",
        "/taxId",
        Transform::TaxIdDigits,
        false,
    ),
    field("/identity/tax_id/kind", "/taxIdKind", Transform::None, false),
    field("/contact/phone", "/phone", Transform::PhoneDigits, false),
    field("/address/street", "/address/street", Transform::None, false),
    field("/address/city", "/address/city", Transform::None, false),
    field(
        "/address/state_or_province",
        "/address/stateOrProvince",
        Transform::None,
        false,
    ),
    field(
        "/address/postal_code",
        "/address/postalCode",
        Transform::None,
        false,
    ),
    field(
        "/address/country",
        "/address/country",
        Transform::CountryCode,
        false,
    ),
];

const TRANSFEREE_ENTITY: &[FieldMap] = &[
    field("/identity/legal_name", "/legalName", Transform::None, true),
    field("/identity/dba_name", "/dbaName", Transform::None, false),
    field(
        "/identity/tax_id/value",
        "/taxId",
        Transform::TaxIdDigits,
        false,
    ),
    field(
        "/identity/formation_jurisdiction",
        "/formationJurisdiction",
        Transform::None,
        false,
    ),
    field("/contact/phone", "/phone", Transform::PhoneDigits, false),
    field("/address/street", "/address/street", Transform::None, false),
    field("/address/city", "/address/city", Transform::None, false),
    field(
        "/address/state_or_province",
        "/address/stateOrProvince",
        Transform::None,
        false,
    ),
    field(
        "/address/postal_code",
        "/address/postalCode",
        Transform::None,
        false,
    ),
    field(
        "/address/country",
        "/address/country",
        Transform::CountryCode,
        false,
    ),
];

const TRANSFEREE_TRUST: &[FieldMap] = &[
    field("/identity/trust_name", "/trustName", Transform::None, true),
    field("/identity/trust_kind", "/trustKind", Transform::None, false),
    field(
        "/identity/formation_date",
        "/formationDate",
        Transform::CanonicalDate,
        false,
    ),
    field(
        "/identity/tax_id/value",
        "/taxId",
        Transform::TaxIdDigits,
        false,
    ),
    field("/address/street", "/address/street", Transform::None, false),
    field("/address/city", "/address/city", Transform::None, false),
    field(
        "/address/state_or_province",
        "/address/stateOrProvince",
        Transform::None,
        false,
    ),
    field(
        "/address/postal_code",
        "/address/postalCode",
        Transform::None,
        false,
    ),
    field(
        "/address/country",
        "/address/country",
        Transform::CountryCode,
        false,
    ),
];

const BENEFICIAL_OWNER_INDIVIDUAL: &[FieldMap] = &[
    field("/identity/last_name", "/lastName", Transform::None, true),
    field("/identity/first_name", "/firstName", Transform::None, true),
    field(
        "/identity/date_of_birth",
        "/dateOfBirth",
        Transform::CanonicalDate,
        false,
    ),
    field(
        "/identity/tax_id/value",
        "/taxId",
        Transform::TaxIdDigits,
        false,
    ),
    field(
        "/ownership_percent",
        "/ownershipPercent",
        Transform::OwnershipPercent,
        false,
    ),
    field("/address/street", "/address/street", Transform::None, false),
    field("/address/city", "/address/city", Transform::None, false),
    field(
        "/address/state_or_province",
        "/address/stateOrProvince",
        Transform::None,
        false,
    ),
    field(
        "/address/postal_code",
        "/address/postalCode",
        Transform::None,
        false,
    ),
    field(
        "/address/country",
        "/address/country",
        Transform::CountryCode,
        false,
    ),
];

const TRUSTEE_INDIVIDUAL: &[FieldMap] = &[
    field("/identity", "/name", Transform::DisplayName, true),
    field(
        "/identity/tax_id/value",
        "/taxId",
        Transform::TaxIdDigits,
        false,
    ),
];

const TRUSTEE_ENTITY: &[FieldMap] = &[
    field("/identity", "/name", Transform::DisplayName, true),
    field(
        "/identity/tax_id/value",
        "/taxId",
        Transform::TaxIdDigits,
        false,
    ),
];

const TRANSFEROR_ANY: &[FieldMap] = &[
    field("/identity/kind", "/kind", Transform::None, true),
    field("/identity", "/name", Transform::DisplayName, true),
    field(
        "/identity/tax_id/value",
        "/taxId",
        Transform::TaxIdDigits,
        false,
    ),
    field("/address/street", "/address/street", Transform::None, false),
    field("/address/city", "/address/city", Transform::None, false),
    field(
        "/address/state_or_province",
        "/address/stateOrProvince",
        Transform::None,
        false,
    ),
    field(
        "/address/postal_code",
        "/address/postalCode",
        Transform::None,
        false,
    ),
    field(
        "/address/country",
        "/address/country",
        Transform::CountryCode,
        false,
    ),
];

/// Look up the mapping rows for a (role, entity kind) pair. `None` means the
/// combination has no representation in the model (for example an entity
/// posing as a beneficial owner) and the merge records a warning.
pub fn mapping_for(role: PartyRole, kind: EntityKind) -> Option<&'static [FieldMap]> {
    match (role, kind) {
        (PartyRole::Transferee, EntityKind::Individual) => Some(TRANSFEREE_INDIVIDUAL),
        (PartyRole::Transferee, EntityKind::Entity) => Some(TRANSFEREE_ENTITY),
        (PartyRole::Transferee, EntityKind::Trust) => Some(TRANSFEREE_TRUST),
        (PartyRole::BeneficialOwner, EntityKind::Individual) => Some(BENEFICIAL_OWNER_INDIVIDUAL),
        (PartyRole::BeneficialOwner, _) => None,
        (PartyRole::Trustee, EntityKind::Individual) => Some(TRUSTEE_INDIVIDUAL),
        (PartyRole::Trustee, EntityKind::Entity) => Some(TRUSTEE_ENTITY),
        (PartyRole::Trustee, EntityKind::Trust) => None,
        (PartyRole::Transferor, _) => Some(TRANSFEROR_ANY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_combination_has_required_name_fields() {
        let combos = [
            (PartyRole::Transferee, EntityKind::Individual),
            (PartyRole::Transferee, EntityKind::Entity),
            (PartyRole::Transferee, EntityKind::Trust),
            (PartyRole::BeneficialOwner, EntityKind::Individual),
            (PartyRole::Trustee, EntityKind::Individual),
            (PartyRole::Trustee, EntityKind::Entity),
            (PartyRole::Transferor, EntityKind::Individual),
        ];
        for (role, kind) in combos {
            let table = mapping_for(role, kind).unwrap();
            assert!(
                table.iter().any(|m| m.required),
                "{role:?}/{kind:?} table has no required field"
            );
        }
    }

    #[test]
    fn unsupported_combinations_are_none() {
        assert!(mapping_for(PartyRole::BeneficialOwner, EntityKind::Entity).is_none());
        assert!(mapping_for(PartyRole::BeneficialOwner, EntityKind::Trust).is_none());
        assert!(mapping_for(PartyRole::Trustee, EntityKind::Trust).is_none());
    }

    #[test]
    fn targets_are_camel_case_pointers() {
        for table in [
            TRANSFEREE_INDIVIDUAL,
            TRANSFEREE_ENTITY,
            TRANSFEREE_TRUST,
            BENEFICIAL_OWNER_INDIVIDUAL,
            TRANSFEROR_ANY,
        ] {
            for m in table {
                assert!(m.target.starts_with('/'), "bad pointer {}", m.target);
                assert!(!m.target.contains('_'), "snake_case target {}", m.target);
            }
        }
    }
}

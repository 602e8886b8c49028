use tfd_rules::*;
use tfd_schemas::{BuyerProfile, DeterminationStatus, EntityKind, Financing, PropertyUse, TransferContext};

fn base_facts() -> DeterminationFacts {
    DeterminationFacts {
        property_use: Some(PropertyUse::Condominium),
        financing: Some(Financing::Cash),
        buyer: Some(BuyerProfile {
            kind: EntityKind::Entity,
            publicly_traded: false,
            regulated_financial_institution: false,
            government_unit: false,
            trust_kind: None,
        }),
        transfer: TransferContext::default(),
        consideration_cents: Some(89_900_000),
    }
}

#[test]
fn scenario_versioned_catalog_stamps_every_determination() {
    let cat = catalog_v2026_1();

    // Reportable.
    let d = evaluate(&cat, &base_facts());
    assert_eq!(d.status, DeterminationStatus::Reportable);
    assert_eq!(d.catalog_version, "2026.1");

    // Exempt.
    let mut facts = base_facts();
    facts.buyer.as_mut().unwrap().government_unit = true;
    let d = evaluate(&cat, &facts);
    assert_eq!(d.status, DeterminationStatus::Exempt);
    assert_eq!(d.catalog_version, "2026.1");

    // Undetermined.
    let mut facts = base_facts();
    facts.property_use = None;
    let d = evaluate(&cat, &facts);
    assert_eq!(d.status, DeterminationStatus::Undetermined);
    assert_eq!(d.catalog_version, "2026.1");
    assert_eq!(d.missing_inputs, vec!["property_use"]);
}

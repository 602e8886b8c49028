//! Assembles the transfer-report document from a transaction and its
//! canonical collection model.
//!
//! All-or-nothing: preflight runs first and any fatal finding refuses the
//! build before a single byte of XML exists. The transferee indicator
//! attributes are derived here from the populated buyer branch; no input
//! field can set them directly.

use std::fmt;

use tfd_schemas::{
    BeneficialOwnerEntry, BuyerEntity, BuyerIndividual, BuyerTrust, CollectionModel, EntityKind,
    ModelAddress, PaymentSourceEntry, SellerEntry, TransactionRecord,
};

use crate::preflight::{self, PreflightReport};
use crate::schema;
use crate::writer::XmlWriter;

/// A successfully built document plus the report that cleared it.
/// Warnings survive in the report; fatal findings never reach this type.
#[derive(Debug, Clone)]
pub struct BuiltDocument {
    pub xml: String,
    pub preflight: PreflightReport,
}

/// Build refusal. Carries the full report so callers can enumerate every
/// failed check, not just the first.
#[derive(Debug, Clone)]
pub struct PreflightFailed {
    pub report: PreflightReport,
}

impl fmt::Display for PreflightFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "document build refused: {} fatal preflight finding(s)",
            self.report.fatal_count()
        )
    }
}

impl std::error::Error for PreflightFailed {}

/// Build the filing document. Pure and deterministic: equal inputs produce
/// byte-identical XML.
pub fn build(
    tx: &TransactionRecord,
    model: &CollectionModel,
) -> Result<BuiltDocument, PreflightFailed> {
    let report = preflight::run_preflight(tx, model);
    if !report.passed() {
        return Err(PreflightFailed { report });
    }
    Ok(BuiltDocument { xml: emit_document(tx, model), preflight: report })
}

fn emit_document(tx: &TransactionRecord, model: &CollectionModel) -> String {
    let mut w = XmlWriter::new();
    w.open_with(
        schema::ELEM_ROOT,
        &[(schema::ATTR_SCHEMA_VERSION, schema::SCHEMA_VERSION)],
    );
    w.leaf(schema::ELEM_FILING_REFERENCE, &tx.file_number);

    emit_property(&mut w, tx);
    emit_closing(&mut w, tx);
    emit_transferee(&mut w, model);
    emit_transferors(&mut w, &model.sellers);
    emit_payment_sources(&mut w, &model.payment_sources);

    w.close(schema::ELEM_ROOT);
    w.finish()
}

fn emit_property(w: &mut XmlWriter, tx: &TransactionRecord) {
    let p = &tx.property;
    w.open(schema::ELEM_PROPERTY);
    w.leaf(schema::ELEM_STREET_ADDRESS, &p.street);
    w.leaf(schema::ELEM_CITY, &p.city);
    w.leaf(schema::ELEM_STATE, &p.state);
    w.leaf(schema::ELEM_POSTAL_CODE, &p.postal_code);
    w.leaf(schema::ELEM_COUNTY, &p.county);
    if let Some(parcel) = &p.parcel_id {
        w.leaf(schema::ELEM_PARCEL_ID, parcel);
    }
    if let Some(desc) = &p.legal_description {
        w.leaf(schema::ELEM_LEGAL_DESCRIPTION, desc);
    }
    w.leaf(schema::ELEM_PROPERTY_USE, schema::property_use_code(p.property_use));
    w.close(schema::ELEM_PROPERTY);
}

fn emit_closing(w: &mut XmlWriter, tx: &TransactionRecord) {
    w.open(schema::ELEM_CLOSING);
    if let Some(date) = tx.closing_date {
        w.leaf(schema::ELEM_CLOSING_DATE, &date.format("%Y-%m-%d").to_string());
    }
    if let Some(cents) = tx.consideration_cents {
        w.leaf(schema::ELEM_TOTAL_CONSIDERATION, &preflight::fmt_cents(cents));
    }
    if let Some(financing) = &tx.financing {
        w.leaf(schema::ELEM_FINANCING_METHOD, schema::financing_code(financing));
    }
    w.close(schema::ELEM_CLOSING);
}

fn emit_transferee(w: &mut XmlWriter, model: &CollectionModel) {
    // The indicator attributes come from the populated branch and from
    // nowhere else. Collection inputs cannot set them.
    let kind = model.buyer_kind();
    let entity_indicator = bool_attr(kind == Some(EntityKind::Entity));
    let trust_indicator = bool_attr(kind == Some(EntityKind::Trust));
    w.open_with(
        schema::ELEM_TRANSFEREE,
        &[
            (schema::ATTR_ENTITY_INDICATOR, entity_indicator),
            (schema::ATTR_TRUST_INDICATOR, trust_indicator),
        ],
    );
    if let Some(b) = &model.buyer_individual {
        emit_individual(w, b);
    } else if let Some(b) = &model.buyer_entity {
        emit_entity(w, b);
    } else if let Some(b) = &model.buyer_trust {
        emit_trust(w, b);
    }
    w.close(schema::ELEM_TRANSFEREE);
}

fn emit_individual(w: &mut XmlWriter, b: &BuyerIndividual) {
    w.open(schema::ELEM_INDIVIDUAL);
    w.leaf(schema::ELEM_LAST_NAME, &b.last_name);
    w.leaf(schema::ELEM_FIRST_NAME, &b.first_name);
    if let Some(middle) = &b.middle_name {
        w.leaf(schema::ELEM_MIDDLE_NAME, middle);
    }
    if let Some(dob) = &b.date_of_birth {
        w.leaf(schema::ELEM_DATE_OF_BIRTH, dob);
    }
    if let Some(tax_id) = &b.tax_id {
        match b.tax_id_kind.as_deref() {
            Some(kind) => w.leaf_with(
                schema::ELEM_TAX_ID,
                &[(schema::ATTR_TAX_ID_KIND, &schema::tax_id_kind_code(kind))],
                tax_id,
            ),
            None => w.leaf(schema::ELEM_TAX_ID, tax_id),
        }
    }
    if let Some(phone) = &b.phone {
        w.leaf(schema::ELEM_PHONE, phone);
    }
    if let Some(addr) = &b.address {
        emit_address(w, addr);
    }
    w.close(schema::ELEM_INDIVIDUAL);
}

fn emit_entity(w: &mut XmlWriter, b: &BuyerEntity) {
    w.open(schema::ELEM_ENTITY);
    w.leaf(schema::ELEM_LEGAL_NAME, &b.legal_name);
    if let Some(dba) = &b.dba_name {
        w.leaf(schema::ELEM_DBA_NAME, dba);
    }
    if let Some(tax_id) = &b.tax_id {
        // Entity tax ids are employer identification numbers in this schema.
        w.leaf_with(schema::ELEM_TAX_ID, &[(schema::ATTR_TAX_ID_KIND, "EIN")], tax_id);
    }
    if let Some(jurisdiction) = &b.formation_jurisdiction {
        w.leaf(schema::ELEM_FORMATION_JURISDICTION, jurisdiction);
    }
    if let Some(phone) = &b.phone {
        w.leaf(schema::ELEM_PHONE, phone);
    }
    if let Some(addr) = &b.address {
        emit_address(w, addr);
    }
    w.open(schema::ELEM_BENEFICIAL_OWNERS);
    for owner in &b.beneficial_owners {
        emit_beneficial_owner(w, owner);
    }
    w.close(schema::ELEM_BENEFICIAL_OWNERS);
    w.close(schema::ELEM_ENTITY);
}

fn emit_beneficial_owner(w: &mut XmlWriter, owner: &BeneficialOwnerEntry) {
    match owner.ownership_percent.as_deref() {
        Some(percent) => w.open_with(
            schema::ELEM_BENEFICIAL_OWNER,
            &[(schema::ATTR_OWNERSHIP_PERCENT, percent)],
        ),
        None => w.open(schema::ELEM_BENEFICIAL_OWNER),
    }
    w.leaf(schema::ELEM_LAST_NAME, &owner.last_name);
    w.leaf(schema::ELEM_FIRST_NAME, &owner.first_name);
    if let Some(dob) = &owner.date_of_birth {
        w.leaf(schema::ELEM_DATE_OF_BIRTH, dob);
    }
    if let Some(tax_id) = &owner.tax_id {
        w.leaf(schema::ELEM_TAX_ID, tax_id);
    }
    if let Some(addr) = &owner.address {
        emit_address(w, addr);
    }
    w.close(schema::ELEM_BENEFICIAL_OWNER);
}

fn emit_trust(w: &mut XmlWriter, b: &BuyerTrust) {
    w.open(schema::ELEM_TRUST);
    w.leaf(schema::ELEM_TRUST_NAME, &b.trust_name);
    if let Some(kind) = &b.trust_kind {
        w.leaf(schema::ELEM_TRUST_KIND, &kind.to_ascii_uppercase());
    }
    if let Some(date) = &b.formation_date {
        w.leaf(schema::ELEM_FORMATION_DATE, date);
    }
    if let Some(tax_id) = &b.tax_id {
        w.leaf(schema::ELEM_TAX_ID, tax_id);
    }
    if let Some(trustee) = &b.trustee {
        w.open(schema::ELEM_TRUSTEE);
        w.leaf(schema::ELEM_NAME, &trustee.name);
        if let Some(tax_id) = &trustee.tax_id {
            w.leaf(schema::ELEM_TAX_ID, tax_id);
        }
        w.close(schema::ELEM_TRUSTEE);
    }
    if let Some(addr) = &b.address {
        emit_address(w, addr);
    }
    w.close(schema::ELEM_TRUST);
}

fn emit_transferors(w: &mut XmlWriter, sellers: &[SellerEntry]) {
    w.open(schema::ELEM_TRANSFERORS);
    for seller in sellers {
        w.open_with(
            schema::ELEM_TRANSFEROR,
            &[(schema::ATTR_TRANSFEROR_KIND, schema::transferor_kind_code(&seller.kind))],
        );
        w.leaf(schema::ELEM_NAME, &seller.name);
        if let Some(tax_id) = &seller.tax_id {
            w.leaf(schema::ELEM_TAX_ID, tax_id);
        }
        if let Some(addr) = &seller.address {
            emit_address(w, addr);
        }
        w.close(schema::ELEM_TRANSFEROR);
    }
    w.close(schema::ELEM_TRANSFERORS);
}

fn emit_payment_sources(w: &mut XmlWriter, sources: &[PaymentSourceEntry]) {
    if sources.is_empty() {
        w.empty(schema::ELEM_PAYMENT_SOURCES);
        return;
    }
    w.open(schema::ELEM_PAYMENT_SOURCES);
    for src in sources {
        w.open(schema::ELEM_PAYMENT_SOURCE);
        w.leaf(schema::ELEM_AMOUNT, &src.amount);
        w.leaf(schema::ELEM_ACCOUNT_TYPE, &schema::account_type_code(&src.account_type));
        if let Some(institution) = &src.institution_name {
            w.leaf(schema::ELEM_INSTITUTION_NAME, institution);
        }
        if let Some(payer) = &src.payer_name {
            w.leaf(schema::ELEM_PAYER_NAME, payer);
        }
        w.close(schema::ELEM_PAYMENT_SOURCE);
    }
    w.close(schema::ELEM_PAYMENT_SOURCES);
}

fn emit_address(w: &mut XmlWriter, addr: &ModelAddress) {
    w.open(schema::ELEM_ADDRESS);
    w.leaf(schema::ELEM_STREET, &addr.street);
    w.leaf(schema::ELEM_CITY, &addr.city);
    if let Some(state) = &addr.state_or_province {
        w.leaf(schema::ELEM_STATE_OR_PROVINCE, state);
    }
    if let Some(postal) = &addr.postal_code {
        w.leaf(schema::ELEM_POSTAL_CODE, postal);
    }
    if let Some(country) = &addr.country {
        w.leaf(schema::ELEM_COUNTRY, country);
    }
    w.close(schema::ELEM_ADDRESS);
}

fn bool_attr(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::mapping::{mapping_for, FieldMap, Transform};
use crate::transforms;
use crate::types::{MappedField, SyncReport, SyncWarning};
use tfd_schemas::{
    BeneficialOwnerEntry, BuyerEntity, BuyerIndividual, BuyerTrust, CollectionModel, EntityKind,
    PartyIdentity, PartyRecord, PartyRole, PaymentSourceEntry, SellerEntry, SubmissionStatus,
    TrusteeEntry,
};

struct Merge {
    fields_mapped: Vec<MappedField>,
    warnings: Vec<SyncWarning>,
    errors: Vec<String>,
    contributors: BTreeSet<Uuid>,
}

impl Merge {
    fn warn(&mut self, party_id: Uuid, field: &str, message: impl Into<String>) {
        self.warnings.push(SyncWarning {
            party_id,
            field: field.to_string(),
            message: message.into(),
        });
    }
}

/// Merge the party-record log into the canonical collection model.
///
/// Pure and idempotent: the same records produce a bit-identical model, and
/// `changed_fields` counts leaf differences against `prev` (zero on a re-run
/// with unchanged inputs). Only submitted or verified records participate;
/// pending links are not part of the model.
pub fn reconcile(parties: &[PartyRecord], prev: Option<&CollectionModel>) -> (CollectionModel, SyncReport) {
    let mut merge = Merge {
        fields_mapped: Vec::new(),
        warnings: Vec::new(),
        errors: Vec::new(),
        contributors: BTreeSet::new(),
    };
    let mut model = CollectionModel::default();

    // 1) Only submitted records participate, in creation order. The order is
    //    load-bearing: it fixes seller and beneficial-owner array positions.
    let mut submitted: Vec<&PartyRecord> = parties
        .iter()
        .filter(|p| p.status != SubmissionStatus::Pending && p.identity.is_some())
        .collect();
    submitted.sort_by_key(|p| p.created_seq);

    // 2) Buyer branch: last transferee write wins; earlier transferee
    //    submissions are superseded, not merged.
    let mut transferees: Vec<&PartyRecord> = submitted
        .iter()
        .copied()
        .filter(|p| p.role == PartyRole::Transferee)
        .collect();
    transferees.sort_by_key(|p| (p.submitted_at_utc, p.created_seq));
    let buyer = transferees.last().copied();
    for superseded in transferees.iter().rev().skip(1) {
        merge.warn(
            superseded.party_id,
            "identity",
            "superseded by a later transferee submission",
        );
    }

    if let Some(buyer) = buyer {
        build_buyer(buyer, &mut model, &mut merge);
        build_payment_sources(buyer, &mut model, &mut merge);
    }

    // 3) Beneficial owners attach to the entity buyer, in creation order.
    for party in submitted
        .iter()
        .filter(|p| p.role == PartyRole::BeneficialOwner)
    {
        build_beneficial_owner(party, &mut model, &mut merge);
    }

    // 4) Trustee attaches to the trust buyer. The model carries one trustee;
    //    additional trustee links are recorded as warnings.
    let trustees: Vec<&PartyRecord> = submitted
        .iter()
        .copied()
        .filter(|p| p.role == PartyRole::Trustee)
        .collect();
    for (idx, party) in trustees.iter().enumerate() {
        if idx == 0 {
            build_trustee(party, &mut model, &mut merge);
        } else {
            merge.warn(
                party.party_id,
                "identity",
                "additional trustee not represented in the filing model",
            );
        }
    }

    // 5) Sellers, in creation order. Same-role parties always occupy their
    //    own array entry; nothing is keyed by name.
    for party in submitted.iter().filter(|p| p.role == PartyRole::Transferor) {
        build_seller(party, &mut model, &mut merge);
    }

    // 6) Report. Warnings sort for stable output; mapped fields keep merge
    //    order, which is already deterministic.
    let prev_default = CollectionModel::default();
    let changed_fields = count_leaf_changes(
        &to_value_or(&mut merge, prev.unwrap_or(&prev_default)),
        &to_value_or(&mut merge, &model),
    );
    merge.warnings.sort();
    let report = SyncReport {
        synced: merge.errors.is_empty(),
        parties_synced: merge.contributors.len(),
        fields_mapped: merge.fields_mapped,
        changed_fields,
        warnings: merge.warnings,
        errors: merge.errors,
    };
    (model, report)
}

// ---------------------------------------------------------------------------
// Section builders
// ---------------------------------------------------------------------------

fn build_buyer(party: &PartyRecord, model: &mut CollectionModel, merge: &mut Merge) {
    let kind = match &party.identity {
        Some(identity) => identity.kind(),
        None => return,
    };
    let table = match mapping_for(party.role, kind) {
        Some(t) => t,
        None => {
            merge.warn(
                party.party_id,
                "identity",
                format!("no mapping for transferee of kind '{}'", kind.as_str()),
            );
            return;
        }
    };
    let section = match apply_table(party, table, merge) {
        Some(s) => s,
        None => return,
    };

    match kind {
        EntityKind::Individual => match serde_json::from_value::<BuyerIndividual>(section) {
            Ok(v) => model.buyer_individual = Some(v),
            Err(e) => merge.warn(party.party_id, "identity", skip_message(&e)),
        },
        EntityKind::Entity => match serde_json::from_value::<BuyerEntity>(section) {
            Ok(v) => model.buyer_entity = Some(v),
            Err(e) => merge.warn(party.party_id, "identity", skip_message(&e)),
        },
        EntityKind::Trust => match serde_json::from_value::<BuyerTrust>(section) {
            Ok(v) => model.buyer_trust = Some(v),
            Err(e) => merge.warn(party.party_id, "identity", skip_message(&e)),
        },
    }
}

fn build_beneficial_owner(party: &PartyRecord, model: &mut CollectionModel, merge: &mut Merge) {
    let kind = match &party.identity {
        Some(identity) => identity.kind(),
        None => return,
    };
    let table = match mapping_for(party.role, kind) {
        Some(t) => t,
        None => {
            merge.warn(
                party.party_id,
                "identity",
                "beneficial owner must be an individual; record skipped",
            );
            return;
        }
    };
    let entity = match model.buyer_entity.as_mut() {
        Some(e) => e,
        None => {
            merge.warn(
                party.party_id,
                "identity",
                "beneficial owner submitted without an entity transferee",
            );
            return;
        }
    };
    if let Some(section) = apply_table(party, table, merge) {
        match serde_json::from_value::<BeneficialOwnerEntry>(section) {
            Ok(v) => entity.beneficial_owners.push(v),
            Err(e) => merge.warn(party.party_id, "identity", skip_message(&e)),
        }
    }
}

fn build_trustee(party: &PartyRecord, model: &mut CollectionModel, merge: &mut Merge) {
    let kind = match &party.identity {
        Some(identity) => identity.kind(),
        None => return,
    };
    let table = match mapping_for(party.role, kind) {
        Some(t) => t,
        None => {
            merge.warn(
                party.party_id,
                "identity",
                format!("no mapping for trustee of kind '{}'", kind.as_str()),
            );
            return;
        }
    };
    let trust = match model.buyer_trust.as_mut() {
        Some(t) => t,
        None => {
            merge.warn(
                party.party_id,
                "identity",
                "trustee submitted without a trust transferee",
            );
            return;
        }
    };
    if let Some(section) = apply_table(party, table, merge) {
        match serde_json::from_value::<TrusteeEntry>(section) {
            Ok(v) => trust.trustee = Some(v),
            Err(e) => merge.warn(party.party_id, "identity", skip_message(&e)),
        }
    }
}

fn build_seller(party: &PartyRecord, model: &mut CollectionModel, merge: &mut Merge) {
    let kind = match &party.identity {
        Some(identity) => identity.kind(),
        None => return,
    };
    let table = match mapping_for(party.role, kind) {
        Some(t) => t,
        None => return,
    };
    if let Some(section) = apply_table(party, table, merge) {
        match serde_json::from_value::<SellerEntry>(section) {
            Ok(v) => model.sellers.push(v),
            Err(e) => merge.warn(party.party_id, "identity", skip_message(&e)),
        }
    }
}

fn build_payment_sources(buyer: &PartyRecord, model: &mut CollectionModel, merge: &mut Merge) {
    for (idx, src) in buyer.payment_sources.iter().enumerate() {
        let amount = match transforms::money_canonical(&src.amount, "amount") {
            Ok(a) => a,
            Err(e) => {
                merge.warn(
                    buyer.party_id,
                    &format!("/payment_sources/{idx}/amount"),
                    e.to_string(),
                );
                continue;
            }
        };
        let account_type = src.account_type.trim();
        if account_type.is_empty() {
            merge.warn(
                buyer.party_id,
                &format!("/payment_sources/{idx}/account_type"),
                "account type is empty; source skipped",
            );
            continue;
        }
        let target_idx = model.payment_sources.len();
        model.payment_sources.push(PaymentSourceEntry {
            amount,
            account_type: account_type.to_string(),
            institution_name: src
                .institution_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            payer_name: src
                .payer_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        });
        merge.fields_mapped.push(MappedField {
            party_id: buyer.party_id,
            source: format!("/payment_sources/{idx}/amount"),
            target: format!("/paymentSources/{target_idx}/amount"),
        });
        merge.contributors.insert(buyer.party_id);
    }
}

// ---------------------------------------------------------------------------
// Table application
// ---------------------------------------------------------------------------

/// Run one party through one mapping table, producing the raw JSON of its
/// model section. Field failures warn and continue; `None` means the party
/// record itself could not be serialized.
fn apply_table(party: &PartyRecord, table: &[FieldMap], merge: &mut Merge) -> Option<Value> {
    let party_json = match serde_json::to_value(party) {
        Ok(v) => v,
        Err(e) => {
            merge
                .errors
                .push(format!("party {} not serializable: {e}", party.party_id));
            return None;
        }
    };
    let mut out = Value::Object(Map::new());

    for row in table {
        let produced = match row.transform {
            Transform::DisplayName => display_name_value(party, row, merge),
            _ => source_value(party, &party_json, row, merge),
        };
        if let Some(v) = produced {
            set_pointer(&mut out, row.target, Value::String(v));
            merge.fields_mapped.push(MappedField {
                party_id: party.party_id,
                source: row.source.to_string(),
                target: row.target.to_string(),
            });
            merge.contributors.insert(party.party_id);
        }
    }
    Some(out)
}

fn source_value(
    party: &PartyRecord,
    party_json: &Value,
    row: &FieldMap,
    merge: &mut Merge,
) -> Option<String> {
    let raw = match party_json.pointer(row.source) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    if raw.is_empty() {
        if row.required {
            merge.warn(party.party_id, row.source, "required field missing");
        }
        return None;
    }

    match row.transform {
        Transform::None => Some(raw),
        Transform::TaxIdDigits => report_result(
            transforms::tax_id_digits(&raw, "tax_id"),
            party,
            row,
            merge,
        ),
        Transform::PhoneDigits => {
            report_result(transforms::phone_digits(&raw, "phone"), party, row, merge)
        }
        Transform::CanonicalDate => {
            report_result(transforms::canonical_date(&raw, "date"), party, row, merge)
        }
        Transform::Money => {
            report_result(transforms::money_canonical(&raw, "amount"), party, row, merge)
        }
        Transform::OwnershipPercent => report_result(
            transforms::ownership_percent(&raw, "ownership_percent"),
            party,
            row,
            merge,
        ),
        Transform::CountryCode => match transforms::country_code(&raw) {
            Some(code) => Some(code),
            None => {
                merge.warn(
                    party.party_id,
                    row.source,
                    format!("unrecognized country '{raw}'; kept as submitted"),
                );
                Some(raw)
            }
        },
        Transform::DisplayName => None,
    }
}

fn display_name_value(party: &PartyRecord, row: &FieldMap, merge: &mut Merge) -> Option<String> {
    let name = match &party.identity {
        Some(PartyIdentity::Individual(i)) => {
            let last = i.last_name.trim();
            let first = i.first_name.trim();
            if last.is_empty() || first.is_empty() {
                String::new()
            } else {
                format!("{last}, {first}")
            }
        }
        Some(PartyIdentity::Entity(e)) => e.legal_name.trim().to_string(),
        Some(PartyIdentity::Trust(t)) => t.trust_name.trim().to_string(),
        None => String::new(),
    };
    if name.is_empty() {
        if row.required {
            merge.warn(party.party_id, row.source, "required field missing");
        }
        return None;
    }
    Some(name)
}

fn report_result(
    res: Result<String, transforms::TransformError>,
    party: &PartyRecord,
    row: &FieldMap,
    merge: &mut Merge,
) -> Option<String> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            merge.warn(party.party_id, row.source, e.to_string());
            None
        }
    }
}

fn skip_message(e: &serde_json::Error) -> String {
    format!("section could not be assembled; record skipped: {e}")
}

/// Insert a value at a JSON pointer, creating intermediate objects.
fn set_pointer(root: &mut Value, pointer: &str, value: Value) {
    let mut cur = root;
    let mut parts = pointer.trim_start_matches('/').split('/').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            if let Value::Object(map) = cur {
                map.insert(part.to_string(), value);
            }
            return;
        }
        let next = match cur {
            Value::Object(map) => map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
        if !next.is_object() {
            *next = Value::Object(Map::new());
        }
        cur = next;
    }
}

fn to_value_or(merge: &mut Merge, model: &CollectionModel) -> Value {
    match serde_json::to_value(model) {
        Ok(v) => v,
        Err(e) => {
            merge.errors.push(format!("model not serializable: {e}"));
            Value::Null
        }
    }
}

fn count_leaves(v: &Value) -> usize {
    match v {
        Value::Object(m) => m.values().map(count_leaves).sum(),
        Value::Array(a) => a.iter().map(count_leaves).sum(),
        Value::Null => 0,
        _ => 1,
    }
}

/// Count leaf positions whose value differs between two JSON trees.
fn count_leaf_changes(old: &Value, new: &Value) -> usize {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            keys.into_iter()
                .map(|k| {
                    count_leaf_changes(
                        a.get(k).unwrap_or(&Value::Null),
                        b.get(k).unwrap_or(&Value::Null),
                    )
                })
                .sum()
        }
        (Value::Array(a), Value::Array(b)) => (0..a.len().max(b.len()))
            .map(|i| {
                count_leaf_changes(
                    a.get(i).unwrap_or(&Value::Null),
                    b.get(i).unwrap_or(&Value::Null),
                )
            })
            .sum(),
        _ if old == new => 0,
        (Value::Null, v) => count_leaves(v),
        (v, Value::Null) => count_leaves(v),
        _ => count_leaves(old).max(count_leaves(new)).max(1),
    }
}

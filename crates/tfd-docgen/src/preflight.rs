//! Pre-submission validation of a transaction and its collection model.
//!
//! Checks form a closed list with stable names; staff tooling and tests key
//! on them. Fatal findings block document generation outright. Warnings ride
//! along in the report and never block.

use serde::Serialize;
use tfd_schemas::{CollectionModel, ModelAddress, TransactionRecord};

/// Stable check names. One name per condition; a report may carry several
/// findings under the same name (one per offending party, for instance).
pub mod checks {
    pub const DETERMINATION_REPORTABLE: &str = "determination-reportable";
    pub const TRANSFEREE_PRESENT: &str = "transferee-present";
    pub const TRANSFEREE_IDENTIFICATION: &str = "transferee-identification";
    pub const TRANSFEROR_PRESENT: &str = "transferor-present";
    pub const BENEFICIAL_OWNER_COVERAGE: &str = "beneficial-owner-coverage";
    pub const TRUSTEE_PRESENT: &str = "trustee-present";
    pub const CLOSING_DATE_PRESENT: &str = "closing-date-present";
    pub const CONSIDERATION_PRESENT: &str = "consideration-present";
    pub const OWNERSHIP_PERCENT_TOTAL: &str = "ownership-percent-total";
    pub const PAYMENT_COVERAGE: &str = "payment-coverage";
    pub const ADDRESS_COUNTRY_CODE: &str = "address-country-code";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Fatal,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreflightFinding {
    pub check: &'static str,
    pub severity: Severity,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PreflightReport {
    pub findings: Vec<PreflightFinding>,
}

impl PreflightReport {
    /// A report passes when it has no fatal findings. Warnings do not count.
    pub fn passed(&self) -> bool {
        self.findings.iter().all(|f| f.severity != Severity::Fatal)
    }

    pub fn fatal_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Fatal)
            .count()
    }

    pub fn has_finding(&self, check: &str) -> bool {
        self.findings.iter().any(|f| f.check == check)
    }

    fn fatal(&mut self, check: &'static str, detail: String) {
        self.findings.push(PreflightFinding { check, severity: Severity::Fatal, detail });
    }

    fn warn(&mut self, check: &'static str, detail: String) {
        self.findings.push(PreflightFinding { check, severity: Severity::Warning, detail });
    }
}

/// Run every check against the transaction and its canonical model.
/// Pure; the caller decides what a failed report means for the lifecycle.
pub fn run_preflight(tx: &TransactionRecord, model: &CollectionModel) -> PreflightReport {
    let mut report = PreflightReport::default();

    // 1) Only reportable transactions produce documents.
    if !tx.determination.is_reportable() {
        report.fatal(
            checks::DETERMINATION_REPORTABLE,
            format!(
                "determination is {}, document generation requires reportable",
                tx.determination.status.as_str()
            ),
        );
    }

    // 2) Exactly one transferee section.
    let buyer_sections = [
        model.buyer_individual.is_some(),
        model.buyer_entity.is_some(),
        model.buyer_trust.is_some(),
    ]
    .iter()
    .filter(|&&b| b)
    .count();
    match buyer_sections {
        0 => report.fatal(
            checks::TRANSFEREE_PRESENT,
            "collection model has no transferee section".to_string(),
        ),
        1 => {}
        n => report.fatal(
            checks::TRANSFEREE_PRESENT,
            format!("collection model has {n} transferee sections, expected one"),
        ),
    }

    // 3) The transferee must carry a tax identification number.
    let buyer_tax_id = if let Some(b) = &model.buyer_individual {
        Some(&b.tax_id)
    } else if let Some(b) = &model.buyer_entity {
        Some(&b.tax_id)
    } else if let Some(b) = &model.buyer_trust {
        Some(&b.tax_id)
    } else {
        None
    };
    if let Some(tax_id) = buyer_tax_id {
        if tax_id.as_deref().map_or(true, |t| t.is_empty()) {
            report.fatal(
                checks::TRANSFEREE_IDENTIFICATION,
                "transferee has no tax identification number".to_string(),
            );
        }
    }

    // 4) At least one transferor.
    if model.sellers.is_empty() {
        report.fatal(
            checks::TRANSFEROR_PRESENT,
            "collection model has no transferors".to_string(),
        );
    }

    // 5) Entity transferees must list beneficial owners.
    if let Some(entity) = &model.buyer_entity {
        if entity.beneficial_owners.is_empty() {
            report.fatal(
                checks::BENEFICIAL_OWNER_COVERAGE,
                "entity transferee reports no beneficial owners".to_string(),
            );
        }
    }

    // 6) Trust transferees must name a trustee.
    if let Some(trust) = &model.buyer_trust {
        if trust.trustee.is_none() {
            report.fatal(
                checks::TRUSTEE_PRESENT,
                "trust transferee names no trustee".to_string(),
            );
        }
    }

    // 7) Closing facts.
    if tx.closing_date.is_none() {
        report.fatal(
            checks::CLOSING_DATE_PRESENT,
            "transaction has no closing date".to_string(),
        );
    }
    if tx.consideration_cents.is_none() {
        report.fatal(
            checks::CONSIDERATION_PRESENT,
            "transaction has no total consideration".to_string(),
        );
    }

    // 8) Ownership percentages may not exceed 100 in total. Under 100 is
    //    legitimate (owners below the reporting threshold are not listed).
    if let Some(entity) = &model.buyer_entity {
        let mut total_tenths: i64 = 0;
        for owner in &entity.beneficial_owners {
            if let Some(p) = owner.ownership_percent.as_deref().and_then(percent_tenths) {
                total_tenths += p;
            }
        }
        if total_tenths > 1000 {
            report.warn(
                checks::OWNERSHIP_PERCENT_TOTAL,
                format!(
                    "beneficial ownership totals {}, exceeds 100.0",
                    fmt_tenths(total_tenths)
                ),
            );
        }
    }

    // 9) Payment sources should cover the consideration.
    if let Some(consideration) = tx.consideration_cents {
        if model.payment_sources.is_empty() {
            report.warn(
                checks::PAYMENT_COVERAGE,
                "transferee reported no payment sources".to_string(),
            );
        } else {
            let mut covered: i64 = 0;
            let mut all_parsed = true;
            for src in &model.payment_sources {
                match money_cents(&src.amount) {
                    Some(cents) => covered += cents,
                    None => all_parsed = false,
                }
            }
            if all_parsed && covered != consideration {
                report.warn(
                    checks::PAYMENT_COVERAGE,
                    format!(
                        "payment sources total {}, consideration is {}",
                        fmt_cents(covered),
                        fmt_cents(consideration)
                    ),
                );
            }
        }
    }

    // 10) Countries should have mapped to two-letter codes by now.
    let buyer_address = if let Some(b) = &model.buyer_individual {
        b.address.as_ref()
    } else if let Some(b) = &model.buyer_entity {
        b.address.as_ref()
    } else if let Some(b) = &model.buyer_trust {
        b.address.as_ref()
    } else {
        None
    };
    if let Some(addr) = buyer_address {
        check_country(&mut report, "transferee", addr);
    }
    for (i, seller) in model.sellers.iter().enumerate() {
        if let Some(addr) = &seller.address {
            check_country(&mut report, &format!("transferor {}", i + 1), addr);
        }
    }
    if let Some(entity) = &model.buyer_entity {
        for (i, owner) in entity.beneficial_owners.iter().enumerate() {
            if let Some(addr) = &owner.address {
                check_country(&mut report, &format!("beneficial owner {}", i + 1), addr);
            }
        }
    }

    report
}

fn check_country(report: &mut PreflightReport, who: &str, addr: &ModelAddress) {
    if let Some(country) = addr.country.as_deref() {
        let is_code = country.len() == 2 && country.bytes().all(|b| b.is_ascii_uppercase());
        if !is_code {
            report.warn(
                checks::ADDRESS_COUNTRY_CODE,
                format!("{who} address country {country:?} is not a two-letter code"),
            );
        }
    }
}

/// Parse a canonical one-decimal percentage ("60.0", "25") into tenths.
fn percent_tenths(s: &str) -> Option<i64> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let w: i64 = whole.parse().ok()?;
    let tenth = match frac.as_bytes() {
        [] => 0,
        [d] if d.is_ascii_digit() => i64::from(d - b'0'),
        _ => return None,
    };
    Some(w * 10 + tenth)
}

fn fmt_tenths(t: i64) -> String {
    format!("{}.{}", t / 10, t % 10)
}

/// Parse a canonical two-decimal money string ("425000.00") into cents.
fn money_cents(s: &str) -> Option<i64> {
    let (whole, frac) = s.split_once('.')?;
    if whole.is_empty()
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || frac.len() != 2
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let w: i64 = whole.parse().ok()?;
    let f: i64 = frac.parse().ok()?;
    w.checked_mul(100)?.checked_add(f)
}

pub(crate) fn fmt_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tfd_schemas::{
        BeneficialOwnerEntry, BuyerEntity, BuyerIndividual, BuyerTrust, Determination,
        DeterminationStatus, Financing, PaymentSourceEntry, PropertyInfo, PropertyUse,
        SellerEntry, TransactionPhase, TransferContext, TrusteeEntry,
    };
    use uuid::Uuid;

    fn reportable_tx() -> TransactionRecord {
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
            closing_date: NaiveDate::from_ymd_opt(2026, 3, 2),
            consideration_cents: Some(42_500_000),
            financing: Some(Financing::Cash),
            transfer_context: TransferContext::default(),
            buyer_profile: None,
            determination: Determination {
                status: DeterminationStatus::Reportable,
                catalog_version: "2026.1".to_string(),
                rationale: Vec::new(),
                missing_inputs: Vec::new(),
                evaluated_at_utc: None,
            },
            phase: TransactionPhase::ReadyToFile,
            created_at_utc: chrono::Utc::now(),
        }
    }

    fn individual_model() -> CollectionModel {
        CollectionModel {
            buyer_individual: Some(BuyerIndividual {
                last_name: "Reyes".to_string(),
                first_name: "Ana".to_string(),
                tax_id: Some("123456789".to_string()),
                ..Default::default()
            }),
            sellers: vec![SellerEntry {
                kind: "individual".to_string(),
                name: "Okafor, Chidi".to_string(),
                tax_id: Some("987654321".to_string()),
                address: None,
            }],
            payment_sources: vec![PaymentSourceEntry {
                amount: "425000.00".to_string(),
                account_type: "wire".to_string(),
                institution_name: None,
                payer_name: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn clean_individual_filing_passes() {
        let report = run_preflight(&reportable_tx(), &individual_model());
        assert!(report.passed(), "unexpected findings: {:?}", report.findings);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn non_reportable_determination_is_fatal() {
        let mut tx = reportable_tx();
        tx.determination.status = DeterminationStatus::Undetermined;
        let report = run_preflight(&tx, &individual_model());
        assert!(!report.passed());
        assert!(report.has_finding(checks::DETERMINATION_REPORTABLE));
    }

    #[test]
    fn missing_transferee_is_fatal() {
        let mut model = individual_model();
        model.buyer_individual = None;
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.has_finding(checks::TRANSFEREE_PRESENT));
        assert!(!report.passed());
    }

    #[test]
    fn two_transferee_sections_are_fatal() {
        let mut model = individual_model();
        model.buyer_trust = Some(BuyerTrust {
            trust_name: "Meridian Family Trust".to_string(),
            tax_id: Some("123456789".to_string()),
            trustee: Some(TrusteeEntry { name: "Ana Reyes".to_string(), tax_id: None }),
            ..Default::default()
        });
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.has_finding(checks::TRANSFEREE_PRESENT));
    }

    #[test]
    fn missing_transferors_are_fatal() {
        let mut model = individual_model();
        model.sellers.clear();
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.has_finding(checks::TRANSFEROR_PRESENT));
        assert!(!report.passed());
    }

    #[test]
    fn transferee_without_tax_id_is_fatal() {
        let mut model = individual_model();
        if let Some(buyer) = model.buyer_individual.as_mut() {
            buyer.tax_id = None;
        }
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.has_finding(checks::TRANSFEREE_IDENTIFICATION));
    }

    #[test]
    fn entity_buyer_without_owners_is_fatal() {
        let mut model = individual_model();
        model.buyer_individual = None;
        model.buyer_entity = Some(BuyerEntity {
            legal_name: "Coastal Holdings LLC".to_string(),
            tax_id: Some("123456789".to_string()),
            beneficial_owners: Vec::new(),
            ..Default::default()
        });
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.has_finding(checks::BENEFICIAL_OWNER_COVERAGE));
        assert!(!report.passed());
    }

    #[test]
    fn trust_buyer_without_trustee_is_fatal() {
        let mut model = individual_model();
        model.buyer_individual = None;
        model.buyer_trust = Some(BuyerTrust {
            trust_name: "Meridian Family Trust".to_string(),
            tax_id: Some("123456789".to_string()),
            trustee: None,
            ..Default::default()
        });
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.has_finding(checks::TRUSTEE_PRESENT));
    }

    #[test]
    fn missing_closing_facts_are_fatal() {
        let mut tx = reportable_tx();
        tx.closing_date = None;
        tx.consideration_cents = None;
        let report = run_preflight(&tx, &individual_model());
        assert!(report.has_finding(checks::CLOSING_DATE_PRESENT));
        assert!(report.has_finding(checks::CONSIDERATION_PRESENT));
        assert_eq!(report.fatal_count(), 2);
    }

    #[test]
    fn ownership_over_one_hundred_warns_but_passes() {
        let mut model = individual_model();
        model.buyer_individual = None;
        model.buyer_entity = Some(BuyerEntity {
            legal_name: "Coastal Holdings LLC".to_string(),
            tax_id: Some("123456789".to_string()),
            beneficial_owners: vec![
                BeneficialOwnerEntry {
                    last_name: "Reyes".to_string(),
                    first_name: "Ana".to_string(),
                    ownership_percent: Some("60.0".to_string()),
                    ..Default::default()
                },
                BeneficialOwnerEntry {
                    last_name: "Okafor".to_string(),
                    first_name: "Chidi".to_string(),
                    ownership_percent: Some("55.0".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.passed(), "warning must not block");
        assert!(report.has_finding(checks::OWNERSHIP_PERCENT_TOTAL));
    }

    #[test]
    fn sixty_forty_split_raises_no_ownership_warning() {
        let mut model = individual_model();
        model.buyer_individual = None;
        model.buyer_entity = Some(BuyerEntity {
            legal_name: "Coastal Holdings LLC".to_string(),
            tax_id: Some("123456789".to_string()),
            beneficial_owners: vec![
                BeneficialOwnerEntry {
                    last_name: "Reyes".to_string(),
                    first_name: "Ana".to_string(),
                    ownership_percent: Some("60.0".to_string()),
                    ..Default::default()
                },
                BeneficialOwnerEntry {
                    last_name: "Okafor".to_string(),
                    first_name: "Chidi".to_string(),
                    ownership_percent: Some("40.0".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });
        let report = run_preflight(&reportable_tx(), &model);
        assert!(!report.has_finding(checks::OWNERSHIP_PERCENT_TOTAL));
    }

    #[test]
    fn payment_shortfall_warns_but_passes() {
        let mut model = individual_model();
        model.payment_sources = vec![PaymentSourceEntry {
            amount: "300000.00".to_string(),
            account_type: "wire".to_string(),
            institution_name: None,
            payer_name: None,
        }];
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.passed());
        assert!(report.has_finding(checks::PAYMENT_COVERAGE));
    }

    #[test]
    fn unmapped_country_warns_per_address() {
        let mut model = individual_model();
        if let Some(buyer) = model.buyer_individual.as_mut() {
            buyer.address = Some(tfd_schemas::ModelAddress {
                street: "400 Pier Ave".to_string(),
                city: "Norfolk".to_string(),
                state_or_province: Some("VA".to_string()),
                postal_code: Some("23510".to_string()),
                country: Some("Narnia".to_string()),
            });
        }
        model.sellers[0].address = Some(tfd_schemas::ModelAddress {
            street: "9 Quay St".to_string(),
            city: "Dover".to_string(),
            state_or_province: None,
            postal_code: None,
            country: Some("Atlantis".to_string()),
        });
        let report = run_preflight(&reportable_tx(), &model);
        assert!(report.passed());
        let country_findings = report
            .findings
            .iter()
            .filter(|f| f.check == checks::ADDRESS_COUNTRY_CODE)
            .count();
        assert_eq!(country_findings, 2);
    }

    #[test]
    fn percent_tenths_parses_canonical_forms() {
        assert_eq!(percent_tenths("60.0"), Some(600));
        assert_eq!(percent_tenths("25"), Some(250));
        assert_eq!(percent_tenths("0.5"), Some(5));
        assert_eq!(percent_tenths("60.00"), None);
        assert_eq!(percent_tenths("abc"), None);
    }

    #[test]
    fn money_cents_parses_canonical_forms() {
        assert_eq!(money_cents("425000.00"), Some(42_500_000));
        assert_eq!(money_cents("0.05"), Some(5));
        assert_eq!(money_cents("425000"), None);
        assert_eq!(money_cents("425,000.00"), None);
    }
}

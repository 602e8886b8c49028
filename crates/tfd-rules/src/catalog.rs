use crate::types::{DeterminationFacts, RuleCatalog, RuleDef, RuleFamily, RuleOutcome};
use tfd_schemas::{EntityKind, Financing, TrustKind};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------
// Each predicate reads facts and nothing else. A predicate that cannot run
// names the missing fact instead of guessing.

fn prop_non_residential(f: &DeterminationFacts) -> RuleOutcome {
    match f.property_use {
        None => RuleOutcome::MissingInput("property_use"),
        Some(u) => {
            if u.qualifies_as_residential() {
                RuleOutcome::NotMatched
            } else {
                RuleOutcome::Matched
            }
        }
    }
}

fn xfer_gift(f: &DeterminationFacts) -> RuleOutcome {
    if f.transfer.no_consideration_gift {
        RuleOutcome::Matched
    } else {
        RuleOutcome::NotMatched
    }
}

fn xfer_estate(f: &DeterminationFacts) -> RuleOutcome {
    if f.transfer.death_or_estate {
        RuleOutcome::Matched
    } else {
        RuleOutcome::NotMatched
    }
}

fn xfer_divorce(f: &DeterminationFacts) -> RuleOutcome {
    if f.transfer.divorce_decree {
        RuleOutcome::Matched
    } else {
        RuleOutcome::NotMatched
    }
}

fn xfer_court_supervised(f: &DeterminationFacts) -> RuleOutcome {
    if f.transfer.court_supervised {
        RuleOutcome::Matched
    } else {
        RuleOutcome::NotMatched
    }
}

fn fin_institutional_lender(f: &DeterminationFacts) -> RuleOutcome {
    match f.financing {
        None => RuleOutcome::MissingInput("financing"),
        Some(Financing::Cash) => RuleOutcome::NotMatched,
        Some(Financing::Financed {
            institutional_lender,
        })
        | Some(Financing::Partial {
            institutional_lender,
        }) => {
            if institutional_lender {
                RuleOutcome::Matched
            } else {
                RuleOutcome::NotMatched
            }
        }
    }
}

fn buyer_natural_person(f: &DeterminationFacts) -> RuleOutcome {
    match &f.buyer {
        None => RuleOutcome::MissingInput("buyer_profile"),
        Some(b) => {
            if b.kind == EntityKind::Individual {
                RuleOutcome::Matched
            } else {
                RuleOutcome::NotMatched
            }
        }
    }
}

fn buyer_listed_company(f: &DeterminationFacts) -> RuleOutcome {
    match &f.buyer {
        None => RuleOutcome::MissingInput("buyer_profile"),
        Some(b) => {
            if b.kind == EntityKind::Entity && b.publicly_traded {
                RuleOutcome::Matched
            } else {
                RuleOutcome::NotMatched
            }
        }
    }
}

fn buyer_regulated_institution(f: &DeterminationFacts) -> RuleOutcome {
    match &f.buyer {
        None => RuleOutcome::MissingInput("buyer_profile"),
        Some(b) => {
            if b.regulated_financial_institution {
                RuleOutcome::Matched
            } else {
                RuleOutcome::NotMatched
            }
        }
    }
}

fn buyer_government_unit(f: &DeterminationFacts) -> RuleOutcome {
    match &f.buyer {
        None => RuleOutcome::MissingInput("buyer_profile"),
        Some(b) => {
            if b.government_unit {
                RuleOutcome::Matched
            } else {
                RuleOutcome::NotMatched
            }
        }
    }
}

fn trust_testamentary(f: &DeterminationFacts) -> RuleOutcome {
    match &f.buyer {
        None => RuleOutcome::MissingInput("buyer_profile"),
        Some(b) => {
            if b.kind != EntityKind::Trust {
                return RuleOutcome::NotMatched;
            }
            match b.trust_kind {
                None => RuleOutcome::MissingInput("trust_kind"),
                Some(TrustKind::Testamentary) => RuleOutcome::Matched,
                Some(_) => RuleOutcome::NotMatched,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog v2026.1
// ---------------------------------------------------------------------------

/// Rule catalog version 2026.1. Order is load-bearing: evaluation walks this
/// list top to bottom, and rationales preserve it.
pub fn catalog_v2026_1() -> RuleCatalog {
    RuleCatalog::new(
        "2026.1",
        vec![
            RuleDef {
                id: "EX-PROP-NONRES",
                family: RuleFamily::Property,
                summary: "property is outside the covered residential kinds",
                predicate: prop_non_residential,
            },
            RuleDef {
                id: "EX-XFER-GIFT",
                family: RuleFamily::Transfer,
                summary: "transfer for no consideration (gift)",
                predicate: xfer_gift,
            },
            RuleDef {
                id: "EX-XFER-ESTATE",
                family: RuleFamily::Transfer,
                summary: "transfer resulting from death or estate administration",
                predicate: xfer_estate,
            },
            RuleDef {
                id: "EX-XFER-DIVORCE",
                family: RuleFamily::Transfer,
                summary: "transfer incident to a divorce decree",
                predicate: xfer_divorce,
            },
            RuleDef {
                id: "EX-XFER-COURT",
                family: RuleFamily::Transfer,
                summary: "transfer supervised by a court, including bankruptcy",
                predicate: xfer_court_supervised,
            },
            RuleDef {
                id: "EX-FIN-INSTL",
                family: RuleFamily::Financing,
                summary: "purchase financed by an institutional lender",
                predicate: fin_institutional_lender,
            },
            RuleDef {
                id: "EX-BUYER-NATURAL",
                family: RuleFamily::Transferee,
                summary: "transferee is a natural person",
                predicate: buyer_natural_person,
            },
            RuleDef {
                id: "EX-BUYER-LISTED",
                family: RuleFamily::Transferee,
                summary: "transferee is a publicly traded company",
                predicate: buyer_listed_company,
            },
            RuleDef {
                id: "EX-BUYER-REGULATED",
                family: RuleFamily::Transferee,
                summary: "transferee is a regulated financial institution",
                predicate: buyer_regulated_institution,
            },
            RuleDef {
                id: "EX-BUYER-GOVT",
                family: RuleFamily::Transferee,
                summary: "transferee is a government unit",
                predicate: buyer_government_unit,
            },
            RuleDef {
                id: "EX-TRUST-TESTAMENTARY",
                family: RuleFamily::Trust,
                summary: "transferee trust was created by will",
                predicate: trust_testamentary,
            },
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let cat = catalog_v2026_1();
        let mut seen: Vec<&str> = Vec::new();
        for r in cat.rules() {
            assert!(!seen.contains(&r.id), "duplicate rule id {}", r.id);
            seen.push(r.id);
        }
    }

    #[test]
    fn catalog_families_are_contiguous_and_ordered() {
        // Evaluation assumes rules of one family are adjacent and families
        // appear in RuleFamily order.
        let cat = catalog_v2026_1();
        let families: Vec<_> = cat.rules().iter().map(|r| r.family).collect();
        let mut deduped = families.clone();
        deduped.dedup();
        let mut sorted = deduped.clone();
        sorted.sort();
        assert_eq!(deduped, sorted, "families out of order or interleaved");
    }

    #[test]
    fn rule_lookup_by_id() {
        let cat = catalog_v2026_1();
        assert!(cat.rule("EX-BUYER-NATURAL").is_some());
        assert!(cat.rule("EX-NO-SUCH-RULE").is_none());
    }
}

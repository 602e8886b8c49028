use crate::types::{DeterminationFacts, RuleCatalog, RuleFamily, RuleOutcome};
use tfd_schemas::{Determination, DeterminationStatus};

fn push_once(v: &mut Vec<String>, s: &str) {
    if !v.iter().any(|x| x == s) {
        v.push(s.to_string());
    }
}

/// Run the catalog against the facts. Pure: same catalog + same facts always
/// produce the same determination. The caller stamps `evaluated_at_utc`.
pub fn evaluate(catalog: &RuleCatalog, facts: &DeterminationFacts) -> Determination {
    let mut rationale: Vec<String> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    let mut satisfied_exclusive: Vec<RuleFamily> = Vec::new();

    // 1) Walk the catalog top to bottom. An exclusive family stops at its
    //    first match; skipped rules are not evaluated at all, so they can
    //    neither match nor report missing inputs.
    for rule in catalog.rules() {
        if rule.family.is_exclusive() && satisfied_exclusive.contains(&rule.family) {
            continue;
        }
        match (rule.predicate)(facts) {
            RuleOutcome::Matched => {
                rationale.push(rule.id.to_string());
                if rule.family.is_exclusive() {
                    satisfied_exclusive.push(rule.family);
                }
            }
            RuleOutcome::MissingInput(field) => push_once(&mut missing, field),
            RuleOutcome::NotMatched => {}
        }
    }

    // 2) Any exemption match is definitive. A matched predicate had every
    //    input it needed; unknowns elsewhere cannot un-exempt the transfer.
    if !rationale.is_empty() {
        return Determination {
            status: DeterminationStatus::Exempt,
            catalog_version: catalog.version().to_string(),
            rationale,
            missing_inputs: Vec::new(),
            evaluated_at_utc: None,
        };
    }

    // 3) Reportable is the demanding conclusion: it requires the full catalog
    //    to have run. Missing inputs block it.
    if !missing.is_empty() {
        return Determination {
            status: DeterminationStatus::Undetermined,
            catalog_version: catalog.version().to_string(),
            rationale: Vec::new(),
            missing_inputs: missing,
            evaluated_at_utc: None,
        };
    }

    // 4) Fully evaluated, no exemption applies.
    Determination {
        status: DeterminationStatus::Reportable,
        catalog_version: catalog.version().to_string(),
        rationale: Vec::new(),
        missing_inputs: Vec::new(),
        evaluated_at_utc: None,
    }
}

use tfd_schemas::{BuyerProfile, Financing, PropertyUse, TransactionRecord, TransferContext};

/// Facts the catalog predicates read. Assembled from the transaction record;
/// anything not yet known is `None` and surfaces as a missing input.
#[derive(Clone, Debug)]
pub struct DeterminationFacts {
    pub property_use: Option<PropertyUse>,
    pub financing: Option<Financing>,
    pub buyer: Option<BuyerProfile>,
    pub transfer: TransferContext,
    pub consideration_cents: Option<i64>,
}

impl DeterminationFacts {
    pub fn from_transaction(tx: &TransactionRecord) -> Self {
        Self {
            property_use: Some(tx.property.property_use),
            financing: tx.financing,
            buyer: tx.buyer_profile.clone(),
            transfer: tx.transfer_context.clone(),
            consideration_cents: tx.consideration_cents,
        }
    }
}

/// What one predicate concluded for one set of facts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Matched,
    NotMatched,
    /// The predicate could not run; names the missing fact.
    MissingInput(&'static str),
}

/// Rule families, in catalog evaluation order. Exclusive families stop at
/// their first match; non-exclusive families record every match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleFamily {
    Property,
    Transfer,
    Financing,
    Transferee,
    Trust,
}

impl RuleFamily {
    pub fn is_exclusive(&self) -> bool {
        match self {
            RuleFamily::Property | RuleFamily::Financing | RuleFamily::Transferee => true,
            RuleFamily::Transfer | RuleFamily::Trust => false,
        }
    }
}

/// One exemption rule. `id` is the stable identifier recorded in rationales;
/// it never changes meaning across catalog versions.
pub struct RuleDef {
    pub id: &'static str,
    pub family: RuleFamily,
    pub summary: &'static str,
    pub predicate: fn(&DeterminationFacts) -> RuleOutcome,
}

/// Ordered, immutable rule set. Changing membership or order requires a new
/// version constructor; determinations record the version that produced them.
pub struct RuleCatalog {
    version: &'static str,
    rules: Vec<RuleDef>,
}

impl RuleCatalog {
    pub(crate) fn new(version: &'static str, rules: Vec<RuleDef>) -> Self {
        Self { version, rules }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn rules(&self) -> &[RuleDef] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&RuleDef> {
        self.rules.iter().find(|r| r.id == id)
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One mapping application: which party field landed where in the model.
/// Pointers use JSON-pointer syntax; `source` is relative to the party
/// record, `target` to the model section the party feeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedField {
    pub party_id: Uuid,
    pub source: String,
    pub target: String,
}

/// A per-party, per-field problem. Warnings accumulate; they never stop the
/// merge and never touch other parties.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncWarning {
    pub party_id: Uuid,
    pub field: String,
    pub message: String,
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// False only when the merge itself could not complete.
    pub synced: bool,
    /// Parties that contributed at least one mapped field.
    pub parties_synced: usize,
    /// Every mapping applied, in deterministic merge order.
    pub fields_mapped: Vec<MappedField>,
    /// Leaf values that differ from the previous model. Zero on a re-run
    /// with unchanged inputs.
    pub changed_fields: usize,
    pub warnings: Vec<SyncWarning>,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.synced && self.errors.is_empty() && self.warnings.is_empty()
    }
}

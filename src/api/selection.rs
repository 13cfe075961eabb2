use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ItemCatalog, LabelQuery};

/// How an update changes the selection map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionOp {
    /// OR the targets into the map.
    Select,
    /// Clear the targets from the map.
    Deselect,
    /// Replace the map with exactly the targets.
    #[serde(alias = "exact_set")]
    Exact,
}

/// Items an update applies to: explicit ids or a label pattern resolved
/// against the item catalog at application time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionTargets {
    Ids(Vec<usize>),
    Pattern(LabelQuery),
}

impl SelectionTargets {
    /// Item ids this target set refers to. Ids outside the catalog are
    /// dropped.
    #[must_use]
    pub fn resolve(&self, catalog: &ItemCatalog) -> Vec<usize> {
        match self {
            Self::Ids(ids) => {
                let (valid, invalid): (Vec<usize>, Vec<usize>) =
                    ids.iter().partition(|item_id| **item_id < catalog.len());
                if !invalid.is_empty() {
                    warn!(
                        invalid_count = invalid.len(),
                        item_count = catalog.len(),
                        "ignoring selection targets outside the item range"
                    );
                }
                valid
            }
            Self::Pattern(query) => catalog.matching_ids(query),
        }
    }
}

/// One versioned mutation of the selection map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionUpdate {
    pub version: u64,
    pub op: SelectionOp,
    pub targets: SelectionTargets,
}

impl SelectionUpdate {
    #[must_use]
    pub fn new(version: u64, op: SelectionOp, targets: SelectionTargets) -> Self {
        Self {
            version,
            op,
            targets,
        }
    }
}

/// Per-item selected flags. Every item starts selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMap {
    flags: Vec<bool>,
}

impl SelectionMap {
    #[must_use]
    pub fn new(item_count: usize) -> Self {
        Self {
            flags: vec![true; item_count],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    #[must_use]
    pub fn is_selected(&self, item_id: usize) -> bool {
        self.flags.get(item_id).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.flags
    }

    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.flags.iter().filter(|flag| **flag).count()
    }

    /// Applies `op` to `item_ids`, which must already be in range.
    pub fn apply(&mut self, op: SelectionOp, item_ids: &[usize]) {
        match op {
            SelectionOp::Select => self.set_all(item_ids, true),
            SelectionOp::Deselect => self.set_all(item_ids, false),
            SelectionOp::Exact => {
                self.flags.fill(false);
                self.set_all(item_ids, true);
            }
        }
    }

    fn set_all(&mut self, item_ids: &[usize], value: bool) {
        for item_id in item_ids {
            if let Some(flag) = self.flags.get_mut(*item_id) {
                *flag = value;
            }
        }
    }
}

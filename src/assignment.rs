//! Structured assignment records produced by the part mapper.
//!
//! Workers receive these as-is; nothing is bit-packed.

use serde::{Deserialize, Serialize};

/// One entry of a worker's part list: a physical part and the replica copy to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartCopy {
    /// Physical part number within the logical file.
    pub part: usize,
    pub copy: usize,
}

impl PartCopy {
    #[must_use]
    pub const fn primary(part: usize) -> Self {
        Self { part, copy: 0 }
    }
}

/// Where lookups against a part are routed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartAssignment {
    /// Serviced by `worker`, reading replica `copy`.
    Mapped { worker: usize, copy: usize },
    /// No replica is on the node group; every worker accesses the part directly.
    #[default]
    Unmapped,
}

impl PartAssignment {
    #[must_use]
    pub fn worker(&self) -> Option<usize> {
        match self {
            Self::Mapped { worker, .. } => Some(*worker),
            Self::Unmapped => None,
        }
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped { .. })
    }
}

//! Opaque identity of a physical cluster host.
//!
//! Replica copies of a part are bound to a [`NodeId`], and a
//! [`NodeGroup`](crate::topology::NodeGroup) is an ordered sequence of them.
//! Two identities are the same host exactly when they compare equal; the
//! planner never interprets the contents.
//!
//! When a host runs several workers (multiple channels per node) it appears
//! several times in the group, once per worker slot.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};

/// Identity of a cluster host (usually an address or endpoint string).
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new `NodeId` from any string-like identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Return the underlying identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

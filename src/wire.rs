//! Per-worker plan encoding.
//!
//! Each worker receives one buffer: a postcard-encoded [`PlanEnvelope`]
//! holding a SHA-256 digest and the postcard-encoded [`WorkerPlan`]. Decoding
//! verifies the digest before the plan is handed out.
//!
//! A [`WorkerPlan`] carries:
//! - the header common to all workers (routing flags, tags, super-key shape,
//!   raw top-level keys),
//! - the index [`FileSection`] for this worker,
//! - the data [`FileSection`] when the join fetches from a separate file.

use crate::assignment::{PartAssignment, PartCopy};
use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Message tag allocated by the job for one service channel (lookup, fetch).
pub type MessageTag = u32;

/// File-independent portion of the plan, identical for every worker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanHeader {
    pub index_name: String,
    /// Participating index parts; zero means there is nothing to join against.
    pub total_index_parts: usize,
    pub tags: Vec<MessageTag>,
    pub remote_keyed_lookup: bool,
    pub remote_keyed_fetch: bool,
    /// Data parts per sub-index; zero unless the index is a super-key.
    pub super_width: usize,
    pub key_has_tlk: bool,
    /// Sub-index count, meaningful when `key_has_tlk`.
    pub super_sub_count: usize,
    /// Raw top-level-key content, one blob per sub-index (or one for a plain key).
    pub top_level_keys: Vec<Vec<u8>>,
}

/// Per-worker view of one file's distribution map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSection {
    pub total_parts: usize,
    /// Physical parts whose descriptors are in `descriptors`, in canonical order.
    pub parts: Vec<usize>,
    /// Opaque descriptor block produced by the file catalog.
    pub descriptors: Vec<u8>,
    /// Parts this worker handles: its own list when routing, otherwise all of `parts`.
    pub worker_parts: Vec<PartCopy>,
    /// Full routing table, present only when remote-service routing is enabled.
    pub part_map: Option<Vec<PartAssignment>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPlan {
    pub header: PlanHeader,
    pub index: Option<FileSection>,
    pub data: Option<FileSection>,
}

#[derive(Serialize, Deserialize)]
struct PlanEnvelope {
    checksum: [u8; 32],
    payload: Vec<u8>,
}

/// SHA-256 digest of `data`.
#[must_use]
pub fn compute_checksum(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

impl WorkerPlan {
    /// Encode into the buffer shipped to a worker.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Codec`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = postcard::to_allocvec(self)?;
        let envelope = PlanEnvelope {
            checksum: compute_checksum(&payload),
            payload,
        };
        Ok(postcard::to_allocvec(&envelope)?)
    }

    /// Decode and verify a buffer produced by [`WorkerPlan::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Codec`] if the buffer is malformed or its checksum does not match.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope: PlanEnvelope = postcard::from_bytes(bytes)?;
        if compute_checksum(&envelope.payload) != envelope.checksum {
            return Err(PlanError::Codec(
                "plan integrity check failed: checksum mismatch".to_string(),
            ));
        }
        Ok(postcard::from_bytes(&envelope.payload)?)
    }
}

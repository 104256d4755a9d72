//! File metadata provider interface.
//!
//! The planner queries the distributed file catalog through [`FileCatalog`]:
//! resolving a logical name, checking whether a replica copy physically
//! exists, reading raw part content (top-level keys), and serializing part
//! descriptors for shipment to workers. Calls may block on network round
//! trips; retries and timeouts belong to the implementation.
//!
//! [`MemoryCatalog`] is an in-memory implementation used by tests and by
//! embedders that already hold the metadata.

pub mod file;
pub mod memory;

pub use file::{FileAttributes, FileKind, FileLayout, LogicalFile, PartDescriptor, PartKind, PhysicalPart};
pub use memory::MemoryCatalog;

use anyhow::{Result, anyhow};

/// Narrow read-only view of the distributed file catalog.
pub trait FileCatalog: Send + Sync {
    /// Resolve a logical file by name. `Ok(None)` means it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be queried.
    fn resolve(&self, name: &str) -> Result<Option<LogicalFile>>;

    /// Whether replica `copy` of physical part `part` of `file` exists on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check itself fails.
    fn copy_exists(&self, file: &LogicalFile, part: usize, copy: usize) -> Result<bool>;

    /// Read the full content of replica `copy` of physical part `part`.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy cannot be read.
    fn read_part(&self, file: &LogicalFile, part: usize, copy: usize) -> Result<Vec<u8>>;

    /// Serialize the descriptors of the given physical parts, in the given order.
    ///
    /// The block is opaque to the planner and decoded by workers.
    ///
    /// # Errors
    ///
    /// Returns an error if a part index is out of range or encoding fails.
    fn serialize_parts(&self, file: &LogicalFile, parts: &[usize]) -> Result<Vec<u8>> {
        let descriptors = parts
            .iter()
            .map(|&p| {
                file.physical_part(p)
                    .map(|part| part.descriptor)
                    .ok_or_else(|| anyhow!("part {p} out of range for file '{}'", file.name))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(postcard::to_allocvec(&descriptors)?)
    }
}

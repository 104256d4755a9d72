//! In-memory file catalog.
//!
//! Copies are assumed to exist unless explicitly marked missing. Part content
//! must be registered before it can be read.

use crate::catalog::{FileCatalog, LogicalFile};
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};

// Keyed by (owning plain file name, part position within it, copy)
type CopyKey = (String, usize, usize);

#[derive(Clone, Debug, Default)]
pub struct MemoryCatalog {
    files: HashMap<String, LogicalFile>,
    missing: HashSet<CopyKey>,
    contents: HashMap<(String, usize), Vec<u8>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a logical file under its own name.
    pub fn insert(&mut self, file: LogicalFile) {
        self.files.insert(file.name.clone(), file);
    }

    #[must_use]
    pub fn with_file(mut self, file: LogicalFile) -> Self {
        self.insert(file);
        self
    }

    /// Mark a replica copy of a plain file's part as physically absent.
    pub fn mark_missing(&mut self, owner: &str, part: usize, copy: usize) {
        self.missing.insert((owner.to_string(), part, copy));
    }

    /// Register the raw content of a plain file's part (shared by all its copies).
    pub fn set_content(&mut self, owner: &str, part: usize, bytes: impl Into<Vec<u8>>) {
        self.contents.insert((owner.to_string(), part), bytes.into());
    }

    fn locate(file: &LogicalFile, part: usize) -> Result<(String, usize, usize)> {
        let physical = file
            .physical_part(part)
            .ok_or_else(|| anyhow!("part {part} out of range for file '{}'", file.name))?;
        Ok((
            physical.owner.name.clone(),
            physical.sub_part,
            physical.descriptor.copies.len(),
        ))
    }
}

impl FileCatalog for MemoryCatalog {
    fn resolve(&self, name: &str) -> Result<Option<LogicalFile>> {
        Ok(self.files.get(name).cloned())
    }

    fn copy_exists(&self, file: &LogicalFile, part: usize, copy: usize) -> Result<bool> {
        let (owner, sub_part, copies) = Self::locate(file, part)?;
        Ok(copy < copies && !self.missing.contains(&(owner, sub_part, copy)))
    }

    fn read_part(&self, file: &LogicalFile, part: usize, copy: usize) -> Result<Vec<u8>> {
        if !self.copy_exists(file, part, copy)? {
            return Err(anyhow!(
                "copy {copy} of part {part} of '{}' does not exist",
                file.name
            ));
        }
        let (owner, sub_part, _) = Self::locate(file, part)?;
        self.contents
            .get(&(owner.clone(), sub_part))
            .cloned()
            .ok_or_else(|| anyhow!("no content registered for part {sub_part} of '{owner}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeId;
    use crate::catalog::{FileKind, PartDescriptor};

    #[test]
    fn missing_copies_and_content() -> Result<()> {
        let file = LogicalFile::plain(
            "data",
            FileKind::Flat,
            vec![PartDescriptor::data(0, vec![NodeId::new("a"), NodeId::new("b")])],
        );
        let mut catalog = MemoryCatalog::new().with_file(file.clone());
        catalog.mark_missing("data", 0, 0);
        catalog.set_content("data", 0, b"payload".to_vec());

        assert!(!catalog.copy_exists(&file, 0, 0)?);
        assert!(catalog.copy_exists(&file, 0, 1)?);
        assert!(!catalog.copy_exists(&file, 0, 2)?);
        assert!(catalog.read_part(&file, 0, 0).is_err());
        assert_eq!(catalog.read_part(&file, 0, 1)?, b"payload");
        assert!(catalog.resolve("data")?.is_some());
        assert!(catalog.resolve("nope")?.is_none());
        Ok(())
    }

    #[test]
    fn default_descriptor_serialization_rejects_out_of_range() {
        let file = LogicalFile::plain("f", FileKind::Flat, vec![]);
        let catalog = MemoryCatalog::new();
        assert!(catalog.serialize_parts(&file, &[0]).is_err());
        assert!(catalog.serialize_parts(&file, &[]).is_ok());
    }
}

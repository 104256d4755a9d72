//! Logical file model: plain files, super-files and their physical parts.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Whether a logical file is a keyed index or a flat data file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Flat,
    Index,
}

/// Role of a physical part within its file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartKind {
    /// Ordinary data (or index leaf) part.
    Data,
    /// Trailing top-level-key part of a distributed index.
    TopLevelKey,
}

/// Metadata for one physical part of a plain file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDescriptor {
    /// Position of the part within its own (plain) file.
    pub index: usize,
    pub kind: PartKind,
    /// Replica placements, primary first.
    pub copies: Vec<NodeId>,
}

impl PartDescriptor {
    #[must_use]
    pub fn data(index: usize, copies: Vec<NodeId>) -> Self {
        Self {
            index,
            kind: PartKind::Data,
            copies,
        }
    }

    #[must_use]
    pub fn top_level_key(index: usize, copies: Vec<NodeId>) -> Self {
        Self {
            index,
            kind: PartKind::TopLevelKey,
            copies,
        }
    }

    #[must_use]
    pub fn is_top_level_key(&self) -> bool {
        self.kind == PartKind::TopLevelKey
    }
}

/// Published attributes of a logical file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    /// Index was built locally on each node (no global key order).
    pub local: bool,
    /// Index carries a partition field mask.
    pub partitioned: bool,
    /// Data was published encrypted.
    pub encrypted: bool,
    /// CRC of the published record layout, if known.
    pub format_crc: Option<u32>,
}

/// How the parts of a logical file are organised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileLayout {
    Plain {
        parts: Vec<PartDescriptor>,
    },
    /// Ordered list of sub-files. Interleaved super-files alternate sub-files
    /// part by part; otherwise sub-files are laid out one after another.
    Super {
        subfiles: Vec<LogicalFile>,
        interleaved: bool,
    },
}

/// A named dataset as published in the file catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalFile {
    pub name: String,
    pub kind: FileKind,
    pub attributes: FileAttributes,
    pub layout: FileLayout,
}

/// A physical part of a logical file, resolved through any super-file structure.
#[derive(Clone, Copy, Debug)]
pub struct PhysicalPart<'a> {
    /// The plain file that physically owns the part.
    pub owner: &'a LogicalFile,
    pub descriptor: &'a PartDescriptor,
    /// Top-level sub-file number, for parts of a super-file.
    pub subfile: Option<usize>,
    /// Part position within the sub-file (or the file itself when plain).
    pub sub_part: usize,
}

impl LogicalFile {
    #[must_use]
    pub fn plain(name: impl Into<String>, kind: FileKind, parts: Vec<PartDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes: FileAttributes::default(),
            layout: FileLayout::Plain { parts },
        }
    }

    #[must_use]
    pub fn super_file(
        name: impl Into<String>,
        kind: FileKind,
        subfiles: Vec<LogicalFile>,
        interleaved: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes: FileAttributes::default(),
            layout: FileLayout::Super {
                subfiles,
                interleaved,
            },
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: FileAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn is_index(&self) -> bool {
        self.kind == FileKind::Index
    }

    #[must_use]
    pub fn is_super(&self) -> bool {
        matches!(self.layout, FileLayout::Super { .. })
    }

    #[must_use]
    pub fn is_interleaved(&self) -> bool {
        matches!(
            self.layout,
            FileLayout::Super {
                interleaved: true,
                ..
            }
        )
    }

    /// Sub-files of a super-file; empty for a plain file.
    #[must_use]
    pub fn subfiles(&self) -> &[LogicalFile] {
        match &self.layout {
            FileLayout::Plain { .. } => &[],
            FileLayout::Super { subfiles, .. } => subfiles,
        }
    }

    /// Total physical part count, including any top-level-key parts.
    #[must_use]
    pub fn num_parts(&self) -> usize {
        match &self.layout {
            FileLayout::Plain { parts } => parts.len(),
            FileLayout::Super { subfiles, .. } => subfiles.iter().map(Self::num_parts).sum(),
        }
    }

    /// True when the last part is a top-level key.
    #[must_use]
    pub fn ends_with_top_level_key(&self) -> bool {
        self.num_parts()
            .checked_sub(1)
            .and_then(|last| self.physical_part(last))
            .is_some_and(|part| part.descriptor.is_top_level_key())
    }

    /// Resolve physical part `p` through the super-file structure.
    ///
    /// Interleaved super-files map `p` to sub-file `p % n`, part `p / n`, so
    /// a part beyond a shorter sub-file's width resolves to `None`.
    #[must_use]
    pub fn physical_part(&self, p: usize) -> Option<PhysicalPart<'_>> {
        match &self.layout {
            FileLayout::Plain { parts } => parts.get(p).map(|descriptor| PhysicalPart {
                owner: self,
                descriptor,
                subfile: None,
                sub_part: p,
            }),
            FileLayout::Super {
                subfiles,
                interleaved: true,
            } => {
                let n = subfiles.len();
                if n == 0 {
                    return None;
                }
                let (subfile, sub_part) = (p % n, p / n);
                subfiles[subfile]
                    .physical_part(sub_part)
                    .map(|inner| PhysicalPart {
                        subfile: Some(subfile),
                        sub_part,
                        ..inner
                    })
            }
            FileLayout::Super {
                subfiles,
                interleaved: false,
            } => {
                let mut offset = 0;
                for (subfile, sub) in subfiles.iter().enumerate() {
                    let width = sub.num_parts();
                    if p < offset + width {
                        let sub_part = p - offset;
                        return sub.physical_part(sub_part).map(|inner| PhysicalPart {
                            subfile: Some(subfile),
                            sub_part,
                            ..inner
                        });
                    }
                    offset += width;
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_index(name: &str, data_parts: usize, tlk: bool) -> LogicalFile {
        let mut parts: Vec<_> = (0..data_parts)
            .map(|i| PartDescriptor::data(i, vec![NodeId::new(format!("n{i}"))]))
            .collect();
        if tlk {
            parts.push(PartDescriptor::top_level_key(data_parts, vec![NodeId::new("n0")]));
        }
        LogicalFile::plain(name, FileKind::Index, parts)
    }

    #[test]
    fn sequential_super_resolves_sub_parts() {
        let file = LogicalFile::super_file(
            "sk",
            FileKind::Index,
            vec![plain_index("a", 3, true), plain_index("b", 3, true)],
            false,
        );
        assert_eq!(file.num_parts(), 8);

        let part = file.physical_part(5).expect("part 5");
        assert_eq!(part.subfile, Some(1));
        assert_eq!(part.sub_part, 1);
        assert_eq!(part.owner.name, "b");

        assert!(file.physical_part(3).is_some_and(|p| p.descriptor.is_top_level_key()));
        assert!(file.ends_with_top_level_key());
        assert!(file.physical_part(8).is_none());
    }

    #[test]
    fn interleaved_super_alternates_sub_files() {
        let file = LogicalFile::super_file(
            "sk",
            FileKind::Index,
            vec![plain_index("a", 2, false), plain_index("b", 2, false)],
            true,
        );
        let part = file.physical_part(3).expect("part 3");
        assert_eq!((part.subfile, part.sub_part), (Some(1), 1));
        let part = file.physical_part(2).expect("part 2");
        assert_eq!((part.subfile, part.sub_part), (Some(0), 1));
    }
}

//! Shape of a logical file as far as part numbering is concerned.
//!
//! Plain files, interleaved super-files and sequential super-files (with or
//! without trailing top-level keys) differ only in how a physical part maps
//! to its canonical part index. [`FileShape`] captures that in one value so a
//! single mapping algorithm can branch on it.
//!
//! Sequential super-files may mix sub-file widths: each sub-file's data parts
//! start where the previous sub-file's ended. Interleaved super-files
//! alternate sub-files part by part and so require one common width.

use crate::catalog::LogicalFile;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileShape {
    pub is_super: bool,
    pub sub_file_count: usize,
    /// Data parts of the first sub-file (top-level key excluded). Zero for plain files.
    pub sub_width: usize,
    pub has_tlk: bool,
    pub interleaved: bool,
    /// Canonical index of each sub-file's first data part, plus the total as a final entry.
    pub sub_offsets: Vec<usize>,
}

impl FileShape {
    /// Derive the shape of `file`, treating trailing parts as top-level keys when `has_tlk`.
    #[must_use]
    pub fn of(file: &LogicalFile, has_tlk: bool) -> Self {
        let subfiles = file.subfiles();
        let mut sub_offsets = Vec::with_capacity(subfiles.len() + 1);
        let mut offset = 0;
        sub_offsets.push(offset);
        for sub in subfiles {
            offset += sub.num_parts().saturating_sub(usize::from(has_tlk));
            sub_offsets.push(offset);
        }
        Self {
            is_super: file.is_super(),
            sub_file_count: subfiles.len(),
            sub_width: sub_offsets.get(1).copied().unwrap_or(0),
            has_tlk,
            interleaved: file.is_interleaved(),
            sub_offsets,
        }
    }

    /// Data parts of sub-file `subfile`.
    #[must_use]
    pub fn width_of(&self, subfile: usize) -> Option<usize> {
        Some(self.sub_offsets.get(subfile + 1)? - self.sub_offsets.get(subfile)?)
    }

    /// True when every sub-file has the same number of data parts.
    #[must_use]
    pub fn is_uniform(&self) -> bool {
        self.sub_offsets
            .windows(2)
            .all(|w| w[1] - w[0] == self.sub_width)
    }

    /// Number of top-level-key parts carried by the file.
    #[must_use]
    pub fn tlk_parts(&self) -> usize {
        match (self.has_tlk, self.is_super) {
            (false, _) => 0,
            (true, true) => self.sub_file_count,
            (true, false) => 1,
        }
    }

    /// Participating (non-TLK) part count given the physical part count.
    #[must_use]
    pub fn total_parts(&self, physical_parts: usize) -> usize {
        physical_parts.saturating_sub(self.tlk_parts())
    }

    /// Sub-files laid out one after another; zero when the file is plain or interleaved.
    #[must_use]
    pub fn sequential_subs(&self) -> usize {
        if self.is_super && !self.interleaved {
            self.sub_file_count
        } else {
            0
        }
    }

    /// Canonical part index of `sub_part` within `subfile`.
    ///
    /// Sub-files occupy consecutive ranges: `sub_width * subfile + sub_part`
    /// when widths are uniform, the running offset otherwise. `None` when the
    /// sub-file is unknown.
    #[must_use]
    pub fn canonical_index(&self, subfile: Option<usize>, sub_part: usize) -> Option<usize> {
        match subfile {
            Some(subfile) if self.is_super => {
                Some(self.sub_offsets.get(subfile)? + sub_part)
            }
            _ => Some(sub_part),
        }
    }
}

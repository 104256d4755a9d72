//! Fluent builders for topologies and logical files.

use crate::catalog::{FileAttributes, FileKind, LogicalFile, PartDescriptor};
use crate::topology::{NodeGroup, StaticTopology};
use crate::NodeId;

/// Identity of test host `i`.
#[must_use]
pub fn node(i: usize) -> NodeId {
    NodeId::new(format!("host{i:02}"))
}

/// Node group with one worker per host `0..width`.
#[must_use]
pub fn group(width: usize) -> NodeGroup {
    NodeGroup::new((0..width).map(node))
}

/// Single-channel cluster of `width` workers on distinct hosts.
#[must_use]
pub fn cluster(width: usize) -> StaticTopology {
    StaticTopology::new(group(width))
}

/// Cluster of `hosts` hosts each running `channels` workers.
///
/// Group position `i` runs on host `i % hosts`.
#[must_use]
pub fn multi_channel_cluster(hosts: usize, channels: usize) -> StaticTopology {
    let nodes = (0..hosts * channels).map(|i| node(i % hosts.max(1)));
    StaticTopology::new(NodeGroup::new(nodes))
        .with_channels_per_worker(channels)
        .with_node_cluster_width(hosts)
}

/// A fluent builder for plain logical files.
///
/// # Example
///
/// ```
/// use partroute::testing::{FileBuilder, node};
///
/// let file = FileBuilder::index("idx")
///     .part_on(vec![node(0), node(1)])
///     .part_on(vec![node(1)])
///     .with_tlk()
///     .build();
///
/// assert_eq!(file.num_parts(), 3);
/// assert!(file.ends_with_top_level_key());
/// ```
pub struct FileBuilder {
    name: String,
    kind: FileKind,
    parts: Vec<PartDescriptor>,
    attributes: FileAttributes,
}

impl FileBuilder {
    #[must_use]
    pub fn index(name: impl Into<String>) -> Self {
        Self::new(name, FileKind::Index)
    }

    #[must_use]
    pub fn flat(name: impl Into<String>) -> Self {
        Self::new(name, FileKind::Flat)
    }

    fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parts: Vec::new(),
            attributes: FileAttributes::default(),
        }
    }

    /// Add a data part with the given replica placements (primary first).
    #[must_use]
    pub fn part_on(mut self, copies: Vec<NodeId>) -> Self {
        let index = self.parts.len();
        self.parts.push(PartDescriptor::data(index, copies));
        self
    }

    /// Add `count` data parts, part `i` placed only on host `i % width`.
    #[must_use]
    pub fn striped(mut self, count: usize, width: usize) -> Self {
        for i in 0..count {
            self = self.part_on(vec![node(i % width.max(1))]);
        }
        self
    }

    /// Add `count` data parts with a primary on host `i % width` and a
    /// replica on the next host.
    #[must_use]
    pub fn replicated(mut self, count: usize, width: usize) -> Self {
        let width = width.max(1);
        for i in 0..count {
            self = self.part_on(vec![node(i % width), node((i + 1) % width)]);
        }
        self
    }

    /// Append a trailing top-level-key part held on host 0.
    #[must_use]
    pub fn with_tlk(mut self) -> Self {
        let index = self.parts.len();
        self.parts.push(PartDescriptor::top_level_key(index, vec![node(0)]));
        self
    }

    #[must_use]
    pub fn local(mut self) -> Self {
        self.attributes.local = true;
        self
    }

    #[must_use]
    pub fn partitioned(mut self) -> Self {
        self.attributes.partitioned = true;
        self
    }

    #[must_use]
    pub fn encrypted(mut self) -> Self {
        self.attributes.encrypted = true;
        self
    }

    #[must_use]
    pub fn format_crc(mut self, crc: u32) -> Self {
        self.attributes.format_crc = Some(crc);
        self
    }

    #[must_use]
    pub fn build(self) -> LogicalFile {
        LogicalFile::plain(self.name, self.kind, self.parts).with_attributes(self.attributes)
    }
}

/// Super-index over `subs`, laid out sequentially unless `interleaved`.
#[must_use]
pub fn super_index(name: impl Into<String>, subs: Vec<LogicalFile>, interleaved: bool) -> LogicalFile {
    LogicalFile::super_file(name, FileKind::Index, subs, interleaved)
}

/// Flat (data) super-file over `subs`, laid out sequentially unless `interleaved`.
#[must_use]
pub fn super_flat(name: impl Into<String>, subs: Vec<LogicalFile>, interleaved: bool) -> LogicalFile {
    LogicalFile::super_file(name, FileKind::Flat, subs, interleaved)
}

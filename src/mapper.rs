//! Part mapper: assigns every part of a logical file to the worker that
//! services it.
//!
//! For one logical file the mapper produces a [`DistributionMap`]:
//!
//! 1. **All parts** -- every participating physical part, ordered by canonical
//!    part index. Every worker indexes lookups with this same order.
//! 2. **Per-worker parts** -- the parts each worker holds locally or services
//!    for others, also ordered by canonical index.
//! 3. **Part to worker** -- for each canonical index, the single worker that
//!    services the part remotely, or [`PartAssignment::Unmapped`] when no
//!    replica lives on the node group.
//!
//! Top-level-key parts never participate; they are shipped separately.
//!
//! In distributed mode each replica copy is matched against the node group
//! with a circular search. The search start rotates past the last worker that
//! received a part, so parts with identical placement (or hosts running many
//! workers) spread over the group instead of piling onto its first match.

use crate::assignment::{PartAssignment, PartCopy};
use crate::catalog::{FileCatalog, LogicalFile, PhysicalPart};
use crate::claimed::ClaimedParts;
use crate::error::{PlanError, Result};
use crate::shape::FileShape;
use crate::topology::Topology;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the operator reaches index data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappingMode {
    /// Parts are routed to the worker holding a replica (default).
    #[default]
    Distributed,
    /// Workers only read what they hold. When `strict`, part `i` of each
    /// sub-file goes to worker `i`; otherwise every worker gets every part.
    Local { strict: bool },
}

/// Per-invocation mapping controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapOptions {
    /// Trailing parts are top-level keys and are excluded.
    pub index_with_tlk: bool,
    /// Every worker holding a local replica also lists the part, not only the first.
    pub allow_all_local_copies: bool,
    /// Only consider copy 0 and skip existence checks.
    ///
    /// Avoids walking every replica of a very large key, at the price of
    /// mis-mapping a part whose primary copy is absent.
    pub assume_primary: bool,
    pub mode: MappingMode,
}

/// Mapping of one logical file's parts onto the node group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionMap {
    shape: FileShape,
    all_parts: Vec<usize>,
    worker_parts: Vec<Vec<PartCopy>>,
    part_to_worker: Vec<PartAssignment>,
    /// Canonical index of each physical part; `None` for top-level keys.
    canonical: Vec<Option<usize>>,
}

/// Summary counts for a [`DistributionMap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStats {
    pub total_parts: usize,
    pub mapped_parts: usize,
    pub unmapped_parts: usize,
    pub workers_with_parts: usize,
    /// Entries across all worker lists (duplicates from broadcast or extra local copies included).
    pub worker_entries: usize,
}

impl DistributionMap {
    fn setup(shape: FileShape, workers: usize, total_parts: usize, physical_parts: usize) -> Self {
        Self {
            shape,
            all_parts: Vec::new(),
            worker_parts: vec![Vec::new(); workers],
            part_to_worker: vec![PartAssignment::Unmapped; total_parts],
            canonical: vec![None; physical_parts],
        }
    }

    #[must_use]
    pub fn shape(&self) -> &FileShape {
        &self.shape
    }

    /// Number of participating parts (top-level keys excluded).
    #[must_use]
    pub fn count(&self) -> usize {
        self.part_to_worker.len()
    }

    /// Physical parts in canonical order. Empty in local mode.
    #[must_use]
    pub fn all_parts(&self) -> &[usize] {
        &self.all_parts
    }

    /// Parts listed for `worker`; empty if the worker is outside the group.
    #[must_use]
    pub fn worker_parts(&self, worker: usize) -> &[PartCopy] {
        self.worker_parts.get(worker).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_parts.len()
    }

    /// Routing table indexed by canonical part index.
    #[must_use]
    pub fn part_to_worker(&self) -> &[PartAssignment] {
        &self.part_to_worker
    }

    #[must_use]
    pub fn query_worker(&self, canonical: usize) -> Option<PartAssignment> {
        self.part_to_worker.get(canonical).copied()
    }

    /// Canonical index of a physical part, `None` for top-level keys or out of range.
    #[must_use]
    pub fn canonical_index(&self, physical: usize) -> Option<usize> {
        self.canonical.get(physical).copied().flatten()
    }

    /// Number of workers with at least one listed part.
    #[must_use]
    pub fn workers_with_parts(&self) -> usize {
        self.worker_parts.iter().filter(|parts| !parts.is_empty()).count()
    }

    #[must_use]
    pub fn stats(&self) -> MapStats {
        let mapped_parts = self.part_to_worker.iter().filter(|a| a.is_mapped()).count();
        MapStats {
            total_parts: self.count(),
            mapped_parts,
            unmapped_parts: self.count() - mapped_parts,
            workers_with_parts: self.workers_with_parts(),
            worker_entries: self.worker_parts.iter().map(Vec::len).sum(),
        }
    }

    fn sort_key(&self, physical: usize) -> usize {
        self.canonical_index(physical).unwrap_or(usize::MAX)
    }

    /// Stable-sort all lists by canonical index. Idempotent.
    pub fn sort_by_canonical(&mut self) {
        let canonical = std::mem::take(&mut self.canonical);
        let key = |p: usize| canonical.get(p).copied().flatten().unwrap_or(usize::MAX);
        self.all_parts.sort_by_key(|&p| key(p));
        for parts in &mut self.worker_parts {
            parts.sort_by_key(|pc| key(pc.part));
        }
        self.canonical = canonical;
    }

    /// True when every list is ascending by canonical index.
    #[must_use]
    pub fn is_canonically_ordered(&self) -> bool {
        let ascending = |keys: Vec<usize>| keys.windows(2).all(|w| w[0] <= w[1]);
        ascending(self.all_parts.iter().map(|&p| self.sort_key(p)).collect())
            && self
                .worker_parts
                .iter()
                .all(|parts| ascending(parts.iter().map(|pc| self.sort_key(pc.part)).collect()))
    }
}

/// One mapping pass over a logical file.
///
/// Owns the rotating search cursor and the claimed-bit space, so each pass
/// starts from a clean state.
pub struct PartMapper<'a> {
    catalog: &'a dyn FileCatalog,
    topology: &'a dyn Topology,
    next_group_start: usize,
}

impl<'a> PartMapper<'a> {
    #[must_use]
    pub fn new(catalog: &'a dyn FileCatalog, topology: &'a dyn Topology) -> Self {
        Self {
            catalog,
            topology,
            next_group_start: 0,
        }
    }

    /// Map every participating part of `file` onto the node group.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::StructuralMismatch`] if a part's canonical index
    /// falls outside the participating part count, or a provider error if a
    /// replica existence check fails.
    pub fn map(mut self, file: &LogicalFile, options: MapOptions) -> Result<DistributionMap> {
        let group_size = self.topology.group().len();
        let shape = FileShape::of(file, options.index_with_tlk);
        let physical_parts = file.num_parts();
        let total_parts = shape.total_parts(physical_parts);

        if shape.interleaved && !shape.is_uniform() {
            let widths: Vec<_> = (0..shape.sub_file_count)
                .filter_map(|s| shape.width_of(s))
                .collect();
            return Err(PlanError::structural(
                &file.name,
                format!("interleaved super-file with sub-files of different widths {widths:?}"),
            ));
        }

        let mut map = DistributionMap::setup(shape.clone(), group_size, total_parts, physical_parts);
        let mut claimed = ClaimedParts::new(group_size, physical_parts);
        let mut seen = vec![false; total_parts];

        for p in 0..physical_parts {
            let part = file.physical_part(p).ok_or_else(|| {
                PlanError::structural(&file.name, format!("part {p} does not resolve to a sub-file part"))
            })?;
            if options.index_with_tlk && part.descriptor.is_top_level_key() {
                continue;
            }
            let canonical = shape
                .canonical_index(part.subfile, part.sub_part)
                .filter(|&c| c < total_parts)
                .ok_or_else(|| {
                    PlanError::structural(
                        &file.name,
                        format!("part {p} has no canonical index within {total_parts} parts"),
                    )
                })?;
            if std::mem::replace(&mut seen[canonical], true) {
                return Err(PlanError::structural(
                    &file.name,
                    format!("part {p} maps to canonical index {canonical} already taken"),
                ));
            }
            map.canonical[p] = Some(canonical);

            match options.mode {
                MappingMode::Local { strict: true } => {
                    if let Some(parts) = map.worker_parts.get_mut(part.sub_part) {
                        parts.push(PartCopy::primary(p));
                    }
                }
                MappingMode::Local { strict: false } => {
                    for parts in &mut map.worker_parts {
                        parts.push(PartCopy::primary(p));
                    }
                }
                MappingMode::Distributed => {
                    let assignment =
                        self.assign(file, p, &part, options, &mut map, &mut claimed)?;
                    if !assignment.is_mapped() {
                        // Off the node group: every worker gets the descriptor and reads it directly.
                        for parts in &mut map.worker_parts {
                            parts.push(PartCopy::primary(p));
                        }
                    }
                    map.part_to_worker[canonical] = assignment;
                }
            }
        }

        if options.mode == MappingMode::Distributed {
            map.all_parts = (0..physical_parts)
                .filter(|&p| map.canonical[p].is_some())
                .collect();
        }
        map.sort_by_canonical();

        let stats = map.stats();
        debug!(
            file = %file.name,
            total_parts = stats.total_parts,
            mapped = stats.mapped_parts,
            unmapped = stats.unmapped_parts,
            workers_with_parts = stats.workers_with_parts,
            "mapped file parts"
        );
        Ok(map)
    }

    /// Find the worker for physical part `p` by matching its replicas against the group.
    fn assign(
        &mut self,
        file: &LogicalFile,
        p: usize,
        part: &PhysicalPart<'_>,
        options: MapOptions,
        map: &mut DistributionMap,
        claimed: &mut ClaimedParts,
    ) -> Result<PartAssignment> {
        let group = self.topology.group();
        let group_size = group.len();
        if group_size == 0 {
            return Ok(PartAssignment::Unmapped);
        }
        let multi_channel = self.topology.channels_per_worker() > 1;
        let node_width = self.topology.node_cluster_width().max(1);

        let copies = if options.assume_primary {
            part.descriptor.copies.len().min(1)
        } else {
            part.descriptor.copies.len()
        };

        let mut assignment = PartAssignment::Unmapped;
        for (c, copy_node) in part.descriptor.copies.iter().take(copies).enumerate() {
            if !options.assume_primary && !self.catalog.copy_exists(file, p, c)? {
                continue;
            }
            let start = self.next_group_start;
            let mut gn = start;
            loop {
                if group.node(gn) == Some(copy_node) && !claimed.test_and_set(p, gn) {
                    let entry = PartCopy { part: p, copy: c };
                    if assignment.is_mapped() {
                        if options.allow_all_local_copies {
                            map.worker_parts[gn].push(entry);
                        }
                    } else {
                        map.worker_parts[gn].push(entry);
                        let worker = if multi_channel { gn % node_width } else { gn };
                        assignment = PartAssignment::Mapped { worker, copy: c };
                        self.next_group_start = (gn + 1) % group_size;
                    }
                }
                gn = (gn + 1) % group_size;
                if gn == start {
                    break;
                }
            }
        }
        Ok(assignment)
    }
}

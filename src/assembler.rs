//! Join plan assembler.
//!
//! Turns a keyed join request into a [`JoinPlan`] in one linear pass:
//!
//! 1. **Resolve** the index (and optional fetch file) through the catalog and
//!    validate kinds, encryption settings and record layout.
//! 2. **Check super-key consistency** -- every sub-index agrees on top-level
//!    key presence and width; local super-keys match the cluster width.
//! 3. **Map** the index and data files with the [`PartMapper`], concurrently
//!    when enabled.
//! 4. **Decide routing** with the viability heuristic, unless forced.
//! 5. **Embed** the raw top-level keys and pre-serialize part descriptors.
//!
//! The resulting plan is self-contained: [`JoinPlan::worker_buffer`] produces
//! each worker's bytes without further catalog access.

use crate::assignment::PartCopy;
use crate::catalog::{FileCatalog, LogicalFile};
use crate::config::JoinPlanOptions;
use crate::diagnostics::{Diagnostics, PlanWarning};
use crate::error::{PlanError, Result};
use crate::mapper::{DistributionMap, MapOptions, MappingMode, PartMapper};
use crate::topology::Topology;
use crate::viability::should_enable_remote_service;
use crate::wire::{FileSection, MessageTag, PlanHeader, WorkerPlan};
use tracing::{debug, info};

/// Fetch step of a full keyed join.
///
/// ```
/// use partroute::{FetchRequest, JoinRequest};
///
/// let request = JoinRequest::new("orders::idx")
///     .with_fetch(FetchRequest::new("orders").optional().with_encryption_key(b"k".to_vec()));
/// assert!(request.fetch.is_some_and(|f| f.optional));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub file_name: String,
    /// A missing data file yields an empty plan instead of an error.
    pub optional: bool,
    pub encryption_key: Option<Vec<u8>>,
}

impl FetchRequest {
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_encryption_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }
}

impl From<&str> for FetchRequest {
    fn from(file_name: &str) -> Self {
        Self::new(file_name)
    }
}

impl From<String> for FetchRequest {
    fn from(file_name: String) -> Self {
        Self::new(file_name)
    }
}

/// What the join operator asks the planner for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinRequest {
    pub index_name: String,
    /// A missing index yields an empty plan instead of an error.
    pub index_optional: bool,
    /// Present when rows are fetched from a separate data file.
    pub fetch: Option<FetchRequest>,
    /// Layout CRC the join was compiled against.
    pub expected_index_crc: Option<u32>,
    /// Service tags allocated by the job, echoed to workers.
    pub tags: Vec<MessageTag>,
}

impl JoinRequest {
    #[must_use]
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            ..Self::default()
        }
    }

    /// Add a fetch step, from a file name or a fully configured [`FetchRequest`].
    #[must_use]
    pub fn with_fetch(mut self, fetch: impl Into<FetchRequest>) -> Self {
        self.fetch = Some(fetch.into());
        self
    }

    #[must_use]
    pub fn optional_index(mut self) -> Self {
        self.index_optional = true;
        self
    }

    #[must_use]
    pub fn with_expected_index_crc(mut self, crc: u32) -> Self {
        self.expected_index_crc = Some(crc);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<MessageTag>) -> Self {
        self.tags = tags;
        self
    }

    /// Service tags a job should allocate for this request: lookup and fetch
    /// channels when a fetch step is present, none otherwise.
    #[must_use]
    pub fn required_tags(&self) -> usize {
        if self.fetch.is_some() { 2 } else { 0 }
    }
}

/// Descriptor blocks for one planned file.
#[derive(Clone, Debug)]
enum DescriptorBlocks {
    /// One block for the canonical all-parts list, shared by every worker.
    Shared(Vec<u8>),
    /// One block per worker for its own list (local mode).
    PerWorker(Vec<Vec<u8>>),
}

/// A planned file: its distribution map plus serialized descriptors.
#[derive(Clone, Debug)]
pub struct PlannedFile {
    name: String,
    map: DistributionMap,
    blocks: DescriptorBlocks,
}

impl PlannedFile {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn map(&self) -> &DistributionMap {
        &self.map
    }

    fn section(&self, worker: usize, routing: bool) -> FileSection {
        let map = &self.map;
        let (parts, descriptors, local) = match &self.blocks {
            DescriptorBlocks::PerWorker(blocks) => (
                map.worker_parts(worker).iter().map(|pc| pc.part).collect(),
                blocks.get(worker).cloned().unwrap_or_default(),
                true,
            ),
            DescriptorBlocks::Shared(block) => (map.all_parts().to_vec(), block.clone(), false),
        };
        let worker_parts = if routing || local {
            map.worker_parts(worker).to_vec()
        } else {
            parts.iter().copied().map(PartCopy::primary).collect()
        };
        FileSection {
            total_parts: map.count(),
            parts,
            descriptors,
            worker_parts,
            part_map: routing.then(|| map.part_to_worker().to_vec()),
        }
    }
}

/// The complete distribution plan for one keyed join.
#[derive(Clone, Debug)]
pub struct JoinPlan {
    header: PlanHeader,
    group_size: usize,
    local: bool,
    index: Option<PlannedFile>,
    data: Option<PlannedFile>,
    warnings: Vec<PlanWarning>,
}

impl JoinPlan {
    fn empty(request: &JoinRequest, group_size: usize, warnings: Vec<PlanWarning>) -> Self {
        Self {
            header: PlanHeader {
                index_name: request.index_name.clone(),
                ..PlanHeader::default()
            },
            group_size,
            local: false,
            index: None,
            data: None,
            warnings,
        }
    }

    #[must_use]
    pub fn header(&self) -> &PlanHeader {
        &self.header
    }

    /// True when there is nothing to join against (missing optional file or empty index).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.total_index_parts == 0
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.local
    }

    #[must_use]
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    #[must_use]
    pub fn remote_keyed_lookup(&self) -> bool {
        self.header.remote_keyed_lookup
    }

    #[must_use]
    pub fn remote_keyed_fetch(&self) -> bool {
        self.header.remote_keyed_fetch
    }

    #[must_use]
    pub fn index(&self) -> Option<&PlannedFile> {
        self.index.as_ref()
    }

    #[must_use]
    pub fn data(&self) -> Option<&PlannedFile> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn warnings(&self) -> &[PlanWarning] {
        &self.warnings
    }

    /// The plan as seen by `worker`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidWorker`] if `worker` is outside the node group.
    pub fn worker_plan(&self, worker: usize) -> Result<WorkerPlan> {
        if worker >= self.group_size {
            return Err(PlanError::InvalidWorker {
                worker,
                group_size: self.group_size,
            });
        }
        let index = self
            .index
            .as_ref()
            .map(|f| f.section(worker, self.header.remote_keyed_lookup));
        let data = self
            .data
            .as_ref()
            .map(|f| f.section(worker, self.header.remote_keyed_fetch));
        Ok(WorkerPlan {
            header: self.header.clone(),
            index,
            data,
        })
    }

    /// Encoded plan buffer for `worker`.
    ///
    /// # Errors
    ///
    /// Returns an error if `worker` is outside the group or encoding fails.
    pub fn worker_buffer(&self, worker: usize) -> Result<Vec<u8>> {
        self.worker_plan(worker)?.encode()
    }
}

/// Super-key structure resolved from the index's sub-files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct IndexStructure {
    key_has_tlk: bool,
    /// Zero unless the index is a super-key.
    super_width: usize,
    sub_count: usize,
    total_parts: usize,
}

/// Builds [`JoinPlan`]s against a catalog and topology.
pub struct JoinPlanAssembler<'a> {
    catalog: &'a dyn FileCatalog,
    topology: &'a dyn Topology,
    options: JoinPlanOptions,
}

impl<'a> JoinPlanAssembler<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a dyn FileCatalog,
        topology: &'a dyn Topology,
        options: JoinPlanOptions,
    ) -> Self {
        Self {
            catalog,
            topology,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &JoinPlanOptions {
        &self.options
    }

    /// Plan the distribution of index (and data) parts for `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] for any structural, configuration or provider
    /// failure; no partial plan is produced.
    pub fn build_plan(&self, request: &JoinRequest) -> Result<JoinPlan> {
        let mut diagnostics = Diagnostics::new();
        let group_size = self.topology.group().len();
        let opts = &self.options;

        let Some(index) = self.catalog.resolve(&request.index_name)? else {
            if request.index_optional {
                debug!(index = %request.index_name, "optional index not found, empty plan");
                return Ok(JoinPlan::empty(request, group_size, diagnostics.into_warnings()));
            }
            return Err(PlanError::FileNotFound(request.index_name.clone()));
        };
        if !index.is_index() {
            return Err(PlanError::structural(
                &index.name,
                "attempting to read flat file as an index",
            ));
        }

        let mut lookup_routing = opts.initial_lookup_routing();
        let mut fetch_routing = opts.initial_fetch_routing();

        let data = match &request.fetch {
            None => None,
            Some(fetch) => match self.resolve_data_file(&index, fetch, &mut diagnostics)? {
                Some(data) => {
                    if fetch_routing && !self.first_part_on_cluster(&data) {
                        info!(file = %data.name, "fetch file is off cluster, remote keyed fetch disabled");
                        fetch_routing = false;
                    }
                    Some(data)
                }
                None => {
                    debug!(file = %fetch.file_name, "optional fetch file not found, empty plan");
                    return Ok(JoinPlan::empty(request, group_size, diagnostics.into_warnings()));
                }
            },
        };

        let local_key = index.attributes.local && !index.attributes.partitioned;
        let local = local_key || opts.local_data;
        if local {
            lookup_routing = false;
            fetch_routing = false;
        }

        self.check_format(&index, request.expected_index_crc, &mut diagnostics)?;
        let structure = self.index_structure(&index)?;
        if structure.total_parts == 0 {
            debug!(index = %index.name, "index has no parts, empty plan");
            return Ok(JoinPlan::empty(request, group_size, diagnostics.into_warnings()));
        }

        let index_options = MapOptions {
            index_with_tlk: structure.key_has_tlk,
            allow_all_local_copies: opts.all_local_index_parts,
            assume_primary: opts.assume_primary,
            mode: if local {
                MappingMode::Local {
                    strict: opts.local_data,
                }
            } else {
                MappingMode::Distributed
            },
        };
        let data_options = MapOptions {
            index_with_tlk: false,
            allow_all_local_copies: opts.all_local_fetch_parts,
            assume_primary: opts.assume_primary,
            mode: MappingMode::Distributed,
        };
        let (index_map, data_map) =
            self.map_files(&index, index_options, data.as_ref(), data_options)?;

        if lookup_routing
            && !opts.force_remote_keyed_lookup
            && !should_enable_remote_service(&index_map, group_size)
        {
            lookup_routing = false;
            info!(
                cluster_nodes = group_size,
                key_width = index.num_parts(),
                nodes_mapped = index_map.workers_with_parts(),
                "remote keyed lookups disabled, too few nodes mapped to service requests of narrow key"
            );
        }
        let data_viable = data_map
            .as_ref()
            .is_none_or(|map| should_enable_remote_service(map, group_size));
        if fetch_routing && !opts.force_remote_keyed_fetch && !data_viable {
            fetch_routing = false;
            info!(
                cluster_nodes = group_size,
                nodes_mapped = data_map.as_ref().map_or(0, DistributionMap::workers_with_parts),
                "remote keyed fetches disabled, too few nodes mapped to service requests"
            );
        }

        // Local keys have no global key order to consult.
        let key_has_tlk = structure.key_has_tlk && !local_key;
        let top_level_keys = if key_has_tlk {
            self.read_top_level_keys(&index)?
        } else {
            Vec::new()
        };

        let header = PlanHeader {
            index_name: request.index_name.clone(),
            total_index_parts: structure.total_parts,
            tags: request.tags.clone(),
            remote_keyed_lookup: lookup_routing,
            remote_keyed_fetch: fetch_routing,
            super_width: structure.super_width,
            key_has_tlk,
            super_sub_count: if key_has_tlk { structure.sub_count } else { 0 },
            top_level_keys,
        };

        let index = self.planned_file(&index, index_map, local)?;
        let data = match (data, data_map) {
            (Some(file), Some(map)) => Some(self.planned_file(&file, map, false)?),
            _ => None,
        };

        info!(
            index = %header.index_name,
            total_index_parts = header.total_index_parts,
            remote_keyed_lookup = header.remote_keyed_lookup,
            remote_keyed_fetch = header.remote_keyed_fetch,
            local,
            "keyed join plan built"
        );
        Ok(JoinPlan {
            header,
            group_size,
            local,
            index: Some(index),
            data,
            warnings: diagnostics.into_warnings(),
        })
    }

    /// Resolve and validate the fetch file. `Ok(None)` when it is optional and missing.
    fn resolve_data_file(
        &self,
        index: &LogicalFile,
        fetch: &FetchRequest,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<LogicalFile>> {
        let Some(data) = self.catalog.resolve(&fetch.file_name)? else {
            if fetch.optional {
                return Ok(None);
            }
            return Err(PlanError::FileNotFound(fetch.file_name.clone()));
        };
        if data.is_index() {
            return Err(PlanError::structural(
                &data.name,
                "Full-Keyed-Join: attempting to read index as a flat file (fetch file)",
            ));
        }
        if index.is_super() {
            return Err(PlanError::UnsupportedCombination(format!(
                "Full-Keyed-Join: superkeys with full keyed joins are not supported (superkey: '{}')",
                index.name
            )));
        }
        let has_key = fetch.encryption_key.as_ref().is_some_and(|k| !k.is_empty());
        match (has_key, data.attributes.encrypted) {
            (true, false) => diagnostics.warn(PlanWarning::EncryptionKeyIgnored {
                file: data.name.clone(),
            }),
            (false, true) => {
                return Err(PlanError::ConfigurationMismatch {
                    file: data.name.clone(),
                    reason: "Full-Keyed-Join: file was published as encrypted but no encryption key provided"
                        .to_string(),
                });
            }
            _ => {}
        }
        Ok(Some(data))
    }

    /// Whether the primary copy of the file's first part is on the first group node.
    fn first_part_on_cluster(&self, file: &LogicalFile) -> bool {
        let first_copy = file
            .physical_part(0)
            .and_then(|part| part.descriptor.copies.first());
        match (first_copy, self.topology.group().node(0)) {
            (Some(copy), Some(node)) => copy == node,
            _ => false,
        }
    }

    fn check_format(
        &self,
        index: &LogicalFile,
        expected: Option<u32>,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let (Some(expected), Some(found)) = (expected, index.attributes.format_crc) else {
            return Ok(());
        };
        if expected == found {
            return Ok(());
        }
        if self.options.allow_format_translation {
            diagnostics.warn(PlanWarning::FormatTranslated {
                file: index.name.clone(),
                expected,
                found,
            });
            return Ok(());
        }
        Err(PlanError::FormatMismatch {
            file: index.name.clone(),
            expected,
            found,
        })
    }

    /// Validate super-key sub-files and derive TLK presence, width and participating part count.
    fn index_structure(&self, index: &LogicalFile) -> Result<IndexStructure> {
        if !index.is_super() {
            let key_has_tlk = index.ends_with_top_level_key();
            return Ok(IndexStructure {
                key_has_tlk,
                super_width: 0,
                sub_count: 1,
                total_parts: index.num_parts() - usize::from(key_has_tlk),
            });
        }

        let local_key = index.attributes.local;
        let cluster_width = self.topology.cluster_width();
        let mut first: Option<(bool, usize)> = None;
        for sub in index.subfiles() {
            let has_tlk = sub.ends_with_top_level_key();
            let width = sub.num_parts() - usize::from(has_tlk);
            match first {
                None => first = Some((has_tlk, width)),
                Some((key_has_tlk, super_width)) => {
                    if has_tlk != key_has_tlk {
                        return Err(PlanError::structural(
                            &index.name,
                            format!(
                                "superkey with a mixture of local/single and distributed sub-indexes (sub-index: '{}')",
                                sub.name
                            ),
                        ));
                    }
                    if key_has_tlk && width != super_width {
                        return Err(PlanError::structural(
                            &index.name,
                            format!(
                                "sub-indexes of different widths cannot be mixed (sub-index: '{}' has {width} parts, expected {super_width})",
                                sub.name
                            ),
                        ));
                    }
                }
            }
            if local_key && width != cluster_width {
                return Err(PlanError::structural(
                    &index.name,
                    format!(
                        "superkey of local indexes must be same width as target cluster (sub-index: '{}' has {width} parts, cluster width {cluster_width})",
                        sub.name
                    ),
                ));
            }
        }

        let sub_count = index.subfiles().len();
        let (key_has_tlk, super_width) = first.unwrap_or_default();
        let total_parts = if key_has_tlk {
            super_width * sub_count
        } else {
            index.num_parts()
        };
        Ok(IndexStructure {
            key_has_tlk,
            super_width,
            sub_count,
            total_parts,
        })
    }

    fn map_files(
        &self,
        index: &LogicalFile,
        index_options: MapOptions,
        data: Option<&LogicalFile>,
        data_options: MapOptions,
    ) -> Result<(DistributionMap, Option<DistributionMap>)> {
        let map_index = || PartMapper::new(self.catalog, self.topology).map(index, index_options);
        let map_data = || {
            data.map(|file| PartMapper::new(self.catalog, self.topology).map(file, data_options))
                .transpose()
        };
        let parallel = self.options.parallel_mapping && data.is_some();
        let (index_map, data_map) = join_maps(parallel, map_index, map_data);
        Ok((index_map?, data_map?))
    }

    /// Raw top-level keys, one per sub-index of a super-key or one for a plain key.
    fn read_top_level_keys(&self, index: &LogicalFile) -> Result<Vec<Vec<u8>>> {
        if index.is_super() {
            index
                .subfiles()
                .iter()
                .map(|sub| self.read_top_level_key(sub))
                .collect()
        } else {
            Ok(vec![self.read_top_level_key(index)?])
        }
    }

    /// Read the trailing TLK part from the first copy that exists.
    fn read_top_level_key(&self, file: &LogicalFile) -> Result<Vec<u8>> {
        let missing = || PlanError::TopLevelKeyMissing(file.name.clone());
        let last = file.num_parts().checked_sub(1).ok_or_else(missing)?;
        let part = file.physical_part(last).ok_or_else(missing)?;
        for copy in 0..part.descriptor.copies.len() {
            if self.catalog.copy_exists(file, last, copy)? {
                return Ok(self.catalog.read_part(file, last, copy)?);
            }
        }
        Err(missing())
    }

    fn planned_file(
        &self,
        file: &LogicalFile,
        map: DistributionMap,
        local: bool,
    ) -> Result<PlannedFile> {
        let blocks = if local {
            let blocks = (0..map.worker_count())
                .map(|w| {
                    let parts: Vec<usize> = map.worker_parts(w).iter().map(|pc| pc.part).collect();
                    self.catalog.serialize_parts(file, &parts)
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            DescriptorBlocks::PerWorker(blocks)
        } else {
            DescriptorBlocks::Shared(self.catalog.serialize_parts(file, map.all_parts())?)
        };
        Ok(PlannedFile {
            name: file.name.clone(),
            map,
            blocks,
        })
    }
}

/// Run both mapping passes, concurrently when `parallel`.
#[cfg(feature = "parallel-mapping")]
fn join_maps<A, B>(
    parallel: bool,
    a: impl FnOnce() -> A + Send,
    b: impl FnOnce() -> B + Send,
) -> (A, B)
where
    A: Send,
    B: Send,
{
    if parallel { rayon::join(a, b) } else { (a(), b()) }
}

#[cfg(not(feature = "parallel-mapping"))]
fn join_maps<A, B>(_parallel: bool, a: impl FnOnce() -> A, b: impl FnOnce() -> B) -> (A, B) {
    (a(), b())
}

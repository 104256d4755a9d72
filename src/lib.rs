//! # Partroute
//!
//! Distribution planning for **distributed keyed joins**. Given a keyed index
//! (possibly a super-key of many sub-indexes) and an optional data file, each
//! split into replicated parts spread across a cluster, Partroute decides:
//!
//! - which parts live on the cluster and which are off-cluster copies,
//! - which single worker services lookups and fetches against each part,
//! - the parts each worker holds or services,
//! - one part ordering shared by every worker,
//!
//! and encodes the result as one compact buffer per worker, so no further
//! cluster-wide coordination is needed at run time.
//!
//! ## Quick Start
//!
//! ```
//! use partroute::*;
//! use partroute::testing::{cluster, striped_index_catalog};
//!
//! # fn main() -> partroute::Result<()> {
//! let topology = cluster(4);
//! let catalog = striped_index_catalog("orders::idx", 4);
//!
//! let assembler = JoinPlanAssembler::new(&catalog, &topology, JoinPlanOptions::default());
//! let plan = assembler.build_plan(&JoinRequest::new("orders::idx"))?;
//! assert!(plan.remote_keyed_lookup());
//!
//! // Ship each worker its own buffer; workers decode it with `WorkerPlan::decode`.
//! let bytes = plan.worker_buffer(2)?;
//! let worker = WorkerPlan::decode(&bytes)?;
//! assert_eq!(worker.header.total_index_parts, 4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Collaborators
//!
//! The planner reads the cluster through [`Topology`] and the distributed file
//! catalog through [`FileCatalog`]. Both are narrow, read-only traits;
//! [`StaticTopology`] and [`MemoryCatalog`] are in-memory implementations.
//!
//! ### Part Mapper
//!
//! [`PartMapper`] maps one logical file into a [`DistributionMap`]. Replica
//! copies are matched against the node group with a rotating circular search;
//! parts with no replica on the group are broadcast to every worker.
//!
//! ### Viability heuristic
//!
//! [`should_enable_remote_service`] switches routing off when fewer than half
//! of the workers received any part (a narrow or foreign index).
//!
//! ### Join Plan Assembler
//!
//! [`JoinPlanAssembler`] validates inputs, maps the index and data files,
//! applies the heuristic, embeds top-level keys and produces a [`JoinPlan`].
//!
//! ## Module Overview
//!
//! - [`topology`] - Node groups and the topology provider trait
//! - [`catalog`] - Logical files, part descriptors and the catalog trait
//! - [`mapper`] - Part-to-worker mapping
//! - [`viability`] - Remote-service routing heuristic
//! - [`assembler`] - Plan assembly and per-worker views
//! - [`wire`] - Per-worker plan encoding
//! - [`config`] - Planner options
//! - [`explain`] - Plan summaries
//! - [`testing`] - Builders and fixtures for tests

pub mod assembler;
pub mod assignment;
pub mod catalog;
mod claimed;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod explain;
pub mod mapper;
pub mod node_id;
pub mod shape;
pub mod testing;
pub mod topology;
pub mod viability;
pub mod wire;

// General re-exports
pub use assembler::{FetchRequest, JoinPlan, JoinPlanAssembler, JoinRequest, PlannedFile};
pub use assignment::{PartAssignment, PartCopy};
pub use catalog::{FileCatalog, FileKind, LogicalFile, MemoryCatalog, PartDescriptor, PartKind};
pub use config::JoinPlanOptions;
pub use diagnostics::PlanWarning;
pub use error::{PlanError, Result};
pub use mapper::{DistributionMap, MapOptions, MappingMode, PartMapper};
pub use node_id::NodeId;
pub use shape::FileShape;
pub use topology::{NodeGroup, StaticTopology, Topology};
pub use viability::should_enable_remote_service;
pub use wire::{FileSection, MessageTag, PlanHeader, WorkerPlan};

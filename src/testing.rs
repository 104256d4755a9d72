//! Testing utilities for distribution planning.
//!
//! Builders for clusters and logical files, plus ready-made fixtures, so tests
//! can describe a placement scenario in a few lines:
//!
//! ```
//! use partroute::testing::*;
//!
//! let topology = cluster(4);
//! let index = FileBuilder::index("idx").striped(4, 4).build();
//! assert_eq!(index.num_parts(), 4);
//! ```
//!
//! Hosts are named `host00`, `host01`, ... by [`node`], and worker `i` of
//! [`cluster`] runs on `node(i)`.

pub mod builders;
pub mod fixtures;

pub use builders::*;
pub use fixtures::*;

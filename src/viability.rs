//! Remote-service viability heuristic.
//!
//! Routing lookups to the worker that owns a part only pays off when owners
//! are spread across the cluster. An index written on a narrower or mostly
//! disjoint cluster (a 1-way index copied in, say) leaves most workers with
//! nothing mapped; the few that do would service every request. In that case
//! routing is switched off and each worker reads parts directly.

use crate::mapper::DistributionMap;

/// Whether remote-service routing should stay enabled for `map`.
///
/// Disabled when strictly fewer than half of the `group_size` workers have
/// any part listed (`workers_with_parts * 2 < group_size`). Exactly half
/// keeps routing enabled: 5 of 10 passes, 3 of 10 does not.
#[must_use]
pub fn should_enable_remote_service(map: &DistributionMap, group_size: usize) -> bool {
    let nodes_with_mapped_parts = (0..group_size)
        .filter(|&w| !map.worker_parts(w).is_empty())
        .count();
    nodes_with_mapped_parts * 2 >= group_size
}

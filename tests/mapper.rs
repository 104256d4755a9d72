//! Tests for the part mapper.

use partroute::testing::*;
use partroute::*;
use std::collections::BTreeSet;

fn map(file: &LogicalFile, topology: &StaticTopology, options: MapOptions) -> Result<DistributionMap> {
    let catalog = MemoryCatalog::new();
    PartMapper::new(&catalog, topology).map(file, options)
}

fn parts_of(map: &DistributionMap, worker: usize) -> Vec<usize> {
    map.worker_parts(worker).iter().map(|pc| pc.part).collect()
}

#[test]
fn co_located_parts_map_to_their_own_worker() -> Result<()> {
    let topology = cluster(4);
    let file = FileBuilder::index("idx").striped(4, 4).build();
    let map = map(&file, &topology, MapOptions::default())?;

    let workers: Vec<_> = map.part_to_worker().iter().map(PartAssignment::worker).collect();
    assert_eq!(workers, vec![Some(0), Some(1), Some(2), Some(3)]);
    for w in 0..4 {
        assert_eq!(map.worker_parts(w), &[PartCopy::primary(w)]);
    }
    assert_eq!(map.all_parts(), &[0, 1, 2, 3]);
    Ok(())
}

#[test]
fn sequential_super_index_occupies_consecutive_ranges() -> Result<()> {
    let topology = cluster(3);
    let file = super_index(
        "sk",
        vec![
            FileBuilder::index("sk::a").striped(3, 3).build(),
            FileBuilder::index("sk::b").striped(3, 3).build(),
        ],
        false,
    );
    let map = map(&file, &topology, MapOptions::default())?;

    assert_eq!(map.all_parts(), &[0, 1, 2, 3, 4, 5]);
    let canonical: Vec<_> = (0..6).map(|p| map.canonical_index(p)).collect();
    assert_eq!(canonical, (0..6).map(Some).collect::<Vec<_>>());
    let workers: Vec<_> = map.part_to_worker().iter().map(PartAssignment::worker).collect();
    assert_eq!(workers, vec![Some(0), Some(1), Some(2), Some(0), Some(1), Some(2)]);
    assert_eq!(map.shape().sub_width, 3);
    Ok(())
}

#[test]
fn top_level_keys_are_excluded_from_distribution() -> Result<()> {
    let topology = cluster(3);
    let file = super_index(
        "sk",
        vec![
            FileBuilder::index("sk::a").striped(3, 3).with_tlk().build(),
            FileBuilder::index("sk::b").striped(3, 3).with_tlk().build(),
        ],
        false,
    );
    let options = MapOptions {
        index_with_tlk: true,
        ..MapOptions::default()
    };
    let map = map(&file, &topology, options)?;

    assert_eq!(map.count(), 6);
    assert_eq!(map.all_parts(), &[0, 1, 2, 4, 5, 6]);
    assert_eq!(map.canonical_index(3), None);
    assert_eq!(map.canonical_index(7), None);
    assert_eq!(map.canonical_index(4), Some(3));
    for w in 0..3 {
        assert!(map.worker_parts(w).iter().all(|pc| pc.part != 3 && pc.part != 7));
    }
    Ok(())
}

#[test]
fn interleaved_super_index_orders_by_canonical_index() -> Result<()> {
    let topology = cluster(2);
    let file = super_index(
        "sk",
        vec![
            FileBuilder::index("sk::a").striped(2, 2).build(),
            FileBuilder::index("sk::b").striped(2, 2).build(),
        ],
        true,
    );
    let map = map(&file, &topology, MapOptions::default())?;

    // Physical 1 is sub-file b part 0, canonical 2.
    assert_eq!(map.canonical_index(1), Some(2));
    assert_eq!(map.all_parts(), &[0, 2, 1, 3]);
    assert!(map.is_canonically_ordered());
    Ok(())
}

#[test]
fn off_cluster_part_is_broadcast_and_unmapped() -> Result<()> {
    let topology = cluster(4);
    let file = FileBuilder::index("idx")
        .part_on(vec![node(10), node(11)])
        .part_on(vec![node(1)])
        .build();
    let map = map(&file, &topology, MapOptions::default())?;

    assert_eq!(map.query_worker(0), Some(PartAssignment::Unmapped));
    assert_eq!(
        map.query_worker(1),
        Some(PartAssignment::Mapped { worker: 1, copy: 0 })
    );
    for w in 0..4 {
        assert!(map.worker_parts(w).contains(&PartCopy::primary(0)));
    }
    assert_eq!(parts_of(&map, 1), vec![0, 1]);
    assert_eq!(map.stats().unmapped_parts, 1);
    Ok(())
}

#[test]
fn all_local_copies_lists_every_replica_holder() -> Result<()> {
    let topology = cluster(2);
    let file = FileBuilder::index("idx").replicated(2, 2).build();

    let single = map(&file, &topology, MapOptions::default())?;
    assert_eq!(single.worker_parts(0), &[PartCopy { part: 0, copy: 0 }]);
    assert_eq!(single.worker_parts(1), &[PartCopy { part: 1, copy: 0 }]);

    let options = MapOptions {
        allow_all_local_copies: true,
        ..MapOptions::default()
    };
    let all = map(&file, &topology, options)?;
    assert_eq!(
        all.worker_parts(0),
        &[PartCopy { part: 0, copy: 0 }, PartCopy { part: 1, copy: 1 }]
    );
    assert_eq!(
        all.worker_parts(1),
        &[PartCopy { part: 0, copy: 1 }, PartCopy { part: 1, copy: 0 }]
    );
    // Primary routing is unchanged by the extra copies.
    assert_eq!(all.part_to_worker(), single.part_to_worker());
    Ok(())
}

#[test]
fn strict_local_mode_assigns_by_sub_part_position() -> Result<()> {
    let topology = cluster(3);
    let file = super_index(
        "sk",
        vec![
            FileBuilder::index("sk::a").striped(3, 3).build(),
            FileBuilder::index("sk::b").striped(3, 3).build(),
        ],
        false,
    );

    let strict = MapOptions {
        mode: MappingMode::Local { strict: true },
        ..MapOptions::default()
    };
    let map_strict = map(&file, &topology, strict)?;
    assert!(map_strict.all_parts().is_empty());
    assert_eq!(parts_of(&map_strict, 0), vec![0, 3]);
    assert_eq!(parts_of(&map_strict, 1), vec![1, 4]);
    assert_eq!(parts_of(&map_strict, 2), vec![2, 5]);

    let shared = MapOptions {
        mode: MappingMode::Local { strict: false },
        ..MapOptions::default()
    };
    let map_shared = map(&file, &topology, shared)?;
    for w in 0..3 {
        assert_eq!(parts_of(&map_shared, w), vec![0, 1, 2, 3, 4, 5]);
    }
    Ok(())
}

#[test]
fn every_part_is_covered_and_routed_once() -> Result<()> {
    let topology = cluster(5);
    // Mix of on-cluster, replicated and off-cluster placements.
    let file = FileBuilder::index("idx")
        .replicated(7, 5)
        .part_on(vec![node(40)])
        .part_on(vec![node(3), node(41)])
        .striped(4, 6)
        .build();
    let options = MapOptions {
        allow_all_local_copies: true,
        ..MapOptions::default()
    };
    let map = map(&file, &topology, options)?;

    let all: BTreeSet<usize> = map.all_parts().iter().copied().collect();
    assert_eq!(all.len(), file.num_parts());
    assert_eq!(map.part_to_worker().len(), map.all_parts().len());

    let covered: BTreeSet<usize> = (0..5)
        .flat_map(|w| map.worker_parts(w).iter().map(|pc| pc.part))
        .collect();
    assert!(all.is_subset(&covered));

    for (canonical, assignment) in map.part_to_worker().iter().enumerate() {
        if let PartAssignment::Mapped { worker, copy } = assignment {
            assert!(
                map.worker_parts(*worker)
                    .contains(&PartCopy { part: canonical, copy: *copy })
            );
        } else {
            for w in 0..5 {
                assert!(map.worker_parts(w).contains(&PartCopy::primary(canonical)));
            }
        }
    }
    Ok(())
}

#[test]
fn sorting_is_idempotent() -> Result<()> {
    let topology = cluster(3);
    let file = super_index(
        "sk",
        vec![
            FileBuilder::index("sk::a").replicated(3, 3).build(),
            FileBuilder::index("sk::b").replicated(3, 3).build(),
        ],
        true,
    );
    let options = MapOptions {
        allow_all_local_copies: true,
        ..MapOptions::default()
    };
    let map = map(&file, &topology, options)?;
    assert!(map.is_canonically_ordered());

    let mut resorted = map.clone();
    resorted.sort_by_canonical();
    assert_eq!(resorted, map);
    Ok(())
}

#[test]
fn empty_group_leaves_every_part_unmapped() -> Result<()> {
    let topology = StaticTopology::new(NodeGroup::default());
    let file = FileBuilder::index("idx").striped(3, 3).build();
    let map = map(&file, &topology, MapOptions::default())?;
    assert_eq!(map.worker_count(), 0);
    assert!(map.part_to_worker().iter().all(|a| !a.is_mapped()));
    Ok(())
}

/// Asserts every participating part has exactly one route and is reachable.
fn assert_single_route_per_part(map: &DistributionMap) {
    let routed: BTreeSet<usize> = map
        .all_parts()
        .iter()
        .filter_map(|&p| map.canonical_index(p))
        .collect();
    assert_eq!(routed.len(), map.all_parts().len());
    assert_eq!(routed, (0..map.count()).collect::<BTreeSet<_>>());

    for &p in map.all_parts() {
        let canonical = map.canonical_index(p).expect("participating part");
        match map.query_worker(canonical) {
            Some(PartAssignment::Mapped { worker, copy }) => {
                assert!(map.worker_parts(worker).contains(&PartCopy { part: p, copy }));
            }
            _ => {
                for w in 0..map.worker_count() {
                    assert!(map.worker_parts(w).contains(&PartCopy::primary(p)));
                }
            }
        }
    }
}

#[test]
fn sequential_super_file_with_mixed_widths() -> Result<()> {
    let topology = cluster(5);
    let file = super_flat(
        "sf",
        vec![
            FileBuilder::flat("sf::a").part_on(vec![node(0)]).build(),
            FileBuilder::flat("sf::b")
                .part_on(vec![node(1)])
                .part_on(vec![node(2)])
                .part_on(vec![node(3)])
                .build(),
            FileBuilder::flat("sf::c").part_on(vec![node(4)]).build(),
        ],
        false,
    );
    let map = map(&file, &topology, MapOptions::default())?;

    assert_eq!(map.count(), 5);
    assert_eq!(map.shape().sub_offsets, vec![0, 1, 4, 5]);
    assert_eq!(map.canonical_index(4), Some(4));
    assert_eq!(map.all_parts(), &[0, 1, 2, 3, 4]);
    let workers: Vec<_> = map.part_to_worker().iter().map(PartAssignment::worker).collect();
    assert_eq!(workers, (0..5).map(Some).collect::<Vec<_>>());
    assert_single_route_per_part(&map);
    Ok(())
}

#[test]
fn sequential_super_index_with_mixed_widths_skips_each_tlk() -> Result<()> {
    let topology = cluster(3);
    let file = super_index(
        "sk",
        vec![
            FileBuilder::index("sk::a").striped(2, 2).with_tlk().build(),
            FileBuilder::index("sk::b").part_on(vec![node(2)]).with_tlk().build(),
        ],
        false,
    );
    let options = MapOptions {
        index_with_tlk: true,
        ..MapOptions::default()
    };
    let map = map(&file, &topology, options)?;

    assert_eq!(map.count(), 3);
    assert_eq!(map.all_parts(), &[0, 1, 3]);
    assert_eq!(map.canonical_index(3), Some(2));
    assert_eq!(
        map.query_worker(2),
        Some(PartAssignment::Mapped { worker: 2, copy: 0 })
    );
    assert_single_route_per_part(&map);
    Ok(())
}

#[test]
fn interleaved_super_file_with_mixed_widths_is_rejected() {
    let topology = cluster(4);
    let file = super_index(
        "sk",
        vec![
            FileBuilder::index("sk::a").striped(3, 3).build(),
            FileBuilder::index("sk::b").part_on(vec![node(3)]).build(),
        ],
        true,
    );
    let err = map(&file, &topology, MapOptions::default()).unwrap_err();
    assert!(matches!(err, PlanError::StructuralMismatch { ref file, .. } if file == "sk"));
}

#[test]
fn uniform_interleaved_super_file_routes_every_part() -> Result<()> {
    let topology = cluster(4);
    let file = super_flat(
        "sf",
        vec![
            FileBuilder::flat("sf::a").replicated(3, 4).build(),
            FileBuilder::flat("sf::b").replicated(3, 4).build(),
        ],
        true,
    );
    let map = map(&file, &topology, MapOptions::default())?;
    assert_eq!(map.count(), 6);
    assert_single_route_per_part(&map);
    Ok(())
}

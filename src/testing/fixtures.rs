//! Pre-built catalogs for common planning scenarios.

use crate::catalog::{LogicalFile, MemoryCatalog};
use crate::testing::builders::{FileBuilder, super_index};

/// Raw top-level-key bytes registered for `owner` by the fixtures.
#[must_use]
pub fn tlk_bytes(owner: &str) -> Vec<u8> {
    format!("tlk:{owner}").into_bytes()
}

/// Register `file` and the content of any trailing top-level key it (or its sub-files) carries.
pub fn publish(catalog: &mut MemoryCatalog, file: LogicalFile) {
    let owners: Vec<&LogicalFile> = if file.is_super() {
        file.subfiles().iter().collect()
    } else {
        vec![&file]
    };
    for owner in owners {
        if owner.ends_with_top_level_key() {
            catalog.set_content(&owner.name, owner.num_parts() - 1, tlk_bytes(&owner.name));
        }
    }
    catalog.insert(file);
}

/// Distributed index of `width` parts striped over a `width`-host cluster, with a TLK.
#[must_use]
pub fn striped_index_catalog(name: &str, width: usize) -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    publish(&mut catalog, FileBuilder::index(name).striped(width, width).with_tlk().build());
    catalog
}

/// Super-key of `subs` sequential sub-indexes, each `width` parts plus a TLK.
#[must_use]
pub fn super_index_catalog(name: &str, subs: usize, width: usize) -> MemoryCatalog {
    let subfiles = (0..subs)
        .map(|s| {
            FileBuilder::index(format!("{name}::sub{s}"))
                .striped(width, width)
                .with_tlk()
                .build()
        })
        .collect();
    let mut catalog = MemoryCatalog::new();
    publish(&mut catalog, super_index(name, subfiles, false));
    catalog
}

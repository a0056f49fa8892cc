//! In-memory store for enriched field catalogs.
//!
//! Entries live until invalidated by tag. There is no time-based expiry: the
//! dataset is static, and metadata changes are followed by an explicit
//! invalidation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use carsearch_common::{FieldCatalog, Result};
use tracing::{debug, info};

/// Tag the search pipeline stores its catalog under.
pub const CATALOG_TAG: &str = "collection_properties";

#[derive(Default)]
pub struct CatalogCache {
    slots: RwLock<HashMap<String, Slot>>,
}

/// `generation` counts invalidations of the tag. A value computed under an
/// older generation is never stored.
#[derive(Default)]
struct Slot {
    generation: u64,
    catalog: Option<Arc<FieldCatalog>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: &str) -> Option<Arc<FieldCatalog>> {
        self.slots
            .read()
            .expect("catalog cache lock poisoned")
            .get(tag)?
            .catalog
            .clone()
    }

    /// Cached catalog for `tag`, or compute it via `f` and store it.
    ///
    /// Concurrent misses may each compute; the first stored value wins and is
    /// returned to every caller. If `tag` is invalidated while `f` runs, the
    /// computed value is returned to this caller but not stored.
    pub async fn get_or<F, Fut>(&self, tag: &str, f: F) -> Result<Arc<FieldCatalog>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FieldCatalog>>,
    {
        let generation = {
            let slots = self.slots.read().expect("catalog cache lock poisoned");
            match slots.get(tag) {
                Some(Slot {
                    catalog: Some(hit), ..
                }) => {
                    debug!(tag, "Catalog cache hit");
                    return Ok(hit.clone());
                }
                Some(slot) => slot.generation,
                None => 0,
            }
        };

        let computed = Arc::new(f().await?);

        let mut slots = self.slots.write().expect("catalog cache lock poisoned");
        let slot = slots.entry(tag.to_string()).or_default();
        if slot.generation != generation {
            debug!(tag, "Catalog invalidated while computing; not stored");
            return Ok(computed);
        }
        Ok(slot.catalog.get_or_insert(computed).clone())
    }

    /// Drop the entry for `tag`, including any computation still in flight.
    /// Returns whether an entry was present.
    pub fn invalidate(&self, tag: &str) -> bool {
        let mut slots = self.slots.write().expect("catalog cache lock poisoned");
        let slot = slots.entry(tag.to_string()).or_default();
        slot.generation += 1;
        let removed = slot.catalog.take().is_some();
        info!(tag, removed, "Catalog cache invalidated");
        removed
    }
}

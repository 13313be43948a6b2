// Owned registry of tenant caches, keyed by tenant id

use std::collections::btree_map::{self, BTreeMap};

use ghost_cache::MrcEngine;
use tracing::debug;

use crate::tenant::TenantCache;

/// Every tenant seen so far, iterated in ascending id order.
///
/// Tenants are created lazily on their first request and kept until the
/// registry is dropped.
pub struct TenantRegistry<E> {
    tenants: BTreeMap<u64, TenantCache<E>>,
}

impl<E: MrcEngine> TenantRegistry<E> {
    pub fn new() -> Self {
        Self {
            tenants: BTreeMap::new(),
        }
    }

    /// Returns the tenant `id`, creating it with `factory` if it is unknown.
    pub fn get_or_insert_with<F>(&mut self, id: u64, factory: F) -> &mut TenantCache<E>
    where
        F: FnOnce() -> TenantCache<E>,
    {
        self.tenants.entry(id).or_insert_with(|| {
            debug!(tenant = id, "registered tenant");
            factory()
        })
    }

    pub fn get(&self, id: u64) -> Option<&TenantCache<E>> {
        self.tenants.get(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.tenants.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u64, TenantCache<E>> {
        self.tenants.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, u64, TenantCache<E>> {
        self.tenants.iter_mut()
    }
}

impl<E: MrcEngine> Default for TenantRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, E> IntoIterator for &'a TenantRegistry<E> {
    type Item = (&'a u64, &'a TenantCache<E>);
    type IntoIter = btree_map::Iter<'a, u64, TenantCache<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tenants.iter()
    }
}

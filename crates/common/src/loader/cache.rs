//! Shared cache of decoded assets, keyed by resolved URL
//!
//! Each loader that shows an entry holds it; the entry is evicted when the
//! last holder releases it so memory stays bounded by what is on screen.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::LoadedAsset;

struct CacheEntry {
    asset: Arc<LoadedAsset>,
    holders: usize,
}

#[derive(Clone, Default)]
pub struct AssetCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a hold on the entry for `url`, if present.
    pub fn acquire(&self, url: &str) -> Option<Arc<LoadedAsset>> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(url)?;
        entry.holders += 1;
        Some(entry.asset.clone())
    }

    /// Insert `asset` under its URL and take a hold on it. A concurrent
    ///  insert for the same URL replaces the asset but keeps the holders.
    pub fn insert(&self, asset: Arc<LoadedAsset>) -> Arc<LoadedAsset> {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(asset.url.clone())
            .or_insert_with(|| CacheEntry {
                asset: asset.clone(),
                holders: 0,
            });
        entry.asset = asset.clone();
        entry.holders += 1;
        asset
    }

    /// Drop one hold on `url`. Returns true when the entry was evicted.
    pub fn release(&self, url: &str) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(url) else {
            return false;
        };

        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders == 0 {
            entries.remove(url);
            tracing::debug!(url, "evicted cached asset");
            return true;
        }
        false
    }

    pub fn holders(&self, url: &str) -> usize {
        self.entries.lock().get(url).map_or(0, |entry| entry.holders)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.lock().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Send registry: which media items have already been delivered.
//!
//! The registry is keyed by pool name and maps item uids to the time they
//! were sent. Every mutation is written through to disk immediately so a
//! restart never resends an item that was already delivered.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{MediaItem, SelectionOrder};

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Every item in pool '{pool}' has been sent")]
    Depleted { pool: String },

    #[error("Failed to persist registry: {0}")]
    Persistence(String),

    #[error("Failed to load registry: {0}")]
    Load(String),
}

/// Counters for one pool, as reported by `/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of items in the catalog pool.
    pub total: usize,

    /// Number of items recorded as sent.
    pub sent: usize,

    /// Number of items still available.
    pub remaining: usize,
}

type SentMap = BTreeMap<u32, NaiveDateTime>;

/// Persistent record of sent items, one map per pool.
#[derive(Debug)]
pub struct Registry {
    /// Where the registry is persisted.
    path: PathBuf,

    /// Sent uid -> timestamp, per pool.
    pools: BTreeMap<String, SentMap>,
}

impl Registry {
    /// Loads the registry from a YAML file; a missing file yields an empty
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();

        let pools = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| RegistryError::Load(format!("{}: {e}", path.display())))?;
            serde_yaml::from_str(&content)
                .map_err(|e| RegistryError::Load(format!("{}: {e}", path.display())))?
        } else {
            debug!("No registry file at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self { path, pools })
    }

    /// Creates an empty registry persisted at the given path.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pools: BTreeMap::new(),
        }
    }

    /// Picks the next unsent item from the pool.
    ///
    /// With [`SelectionOrder::InOrder`] the first unsent item in catalog
    /// order is returned; with [`SelectionOrder::Random`] a uniformly random
    /// unsent item is chosen.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Depleted`] when no unsent item remains
    /// (including when the pool itself is empty).
    pub fn pick_unsent<'a>(
        &self,
        pool: &str,
        items: &'a [MediaItem],
        order: SelectionOrder,
        rng: &mut impl Rng,
    ) -> Result<&'a MediaItem, RegistryError> {
        let sent = self.pools.get(pool);
        let unsent: Vec<&MediaItem> = items
            .iter()
            .filter(|item| !sent.is_some_and(|s| s.contains_key(&item.uid)))
            .collect();

        let picked = match order {
            SelectionOrder::InOrder => unsent.first().copied(),
            SelectionOrder::Random => unsent.choose(rng).copied(),
        };

        picked.ok_or_else(|| RegistryError::Depleted {
            pool: pool.to_owned(),
        })
    }

    /// Checks whether an item has been recorded as sent.
    #[must_use]
    pub fn is_sent(&self, pool: &str, uid: u32) -> bool {
        self.pools
            .get(pool)
            .is_some_and(|sent| sent.contains_key(&uid))
    }

    /// Records an item as sent and persists the registry immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if the write fails; in that
    /// case the in-memory record is rolled back so that state on disk and in
    /// memory stay consistent.
    pub fn mark_sent(
        &mut self,
        pool: &str,
        uid: u32,
        at: NaiveDateTime,
    ) -> Result<(), RegistryError> {
        let previous = self.pools.entry(pool.to_owned()).or_default().insert(uid, at);

        if let Err(e) = self.persist() {
            match previous {
                Some(at) => {
                    self.pools.entry(pool.to_owned()).or_default().insert(uid, at);
                }
                None => {
                    if let Some(sent) = self.pools.get_mut(pool) {
                        sent.remove(&uid);
                    }
                }
            }
            return Err(e);
        }

        info!("Marked {pool}/{uid} as sent");
        Ok(())
    }

    /// Clears the sent record of a pool and persists the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if the write fails.
    pub fn reset_pool(&mut self, pool: &str) -> Result<(), RegistryError> {
        if let Some(sent) = self.pools.get_mut(pool) {
            let cleared = std::mem::take(sent);
            if let Err(e) = self.persist() {
                if let Some(sent) = self.pools.get_mut(pool) {
                    *sent = cleared;
                }
                return Err(e);
            }
            info!("Pool '{pool}' reset, {} items available again", cleared.len());
        }
        Ok(())
    }

    /// Returns counters for a pool given the catalog size.
    #[must_use]
    pub fn stats(&self, pool: &str, total: usize) -> PoolStats {
        let sent = self.pools.get(pool).map_or(0, BTreeMap::len);
        PoolStats {
            total,
            sent,
            remaining: total.saturating_sub(sent),
        }
    }

    /// Returns the sent uids of a pool, in ascending order.
    #[must_use]
    pub fn sent_uids(&self, pool: &str) -> Vec<u32> {
        self.pools
            .get(pool)
            .map(|sent| sent.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Path the registry persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), RegistryError> {
        let content = serde_yaml::to_string(&self.pools)
            .map_err(|e| RegistryError::Persistence(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| RegistryError::Persistence(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::MediaItem;

    fn items() -> Vec<MediaItem> {
        vec![
            MediaItem::new(1, "a.jpg"),
            MediaItem::new(2, "b.jpg"),
            MediaItem::new(3, "c.jpg"),
        ]
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn temp_registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::empty(dir.path().join("register.yaml"));
        (dir, registry)
    }

    #[test]
    fn test_in_order_pick_is_deterministic() {
        let (_dir, mut registry) = temp_registry();
        let items = items();
        let mut rng = StdRng::seed_from_u64(0);

        for expected in [1, 2, 3] {
            let picked = registry
                .pick_unsent("pool", &items, SelectionOrder::InOrder, &mut rng)
                .unwrap();
            assert_eq!(picked.uid, expected);
            registry.mark_sent("pool", picked.uid, now()).unwrap();
        }

        let err = registry
            .pick_unsent("pool", &items, SelectionOrder::InOrder, &mut rng)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Depleted { .. }));
    }

    #[test]
    fn test_random_pick_never_repeats_sent_items() {
        let (_dir, mut registry) = temp_registry();
        let items = items();
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = Vec::new();

        for _ in 0..3 {
            let picked = registry
                .pick_unsent("pool", &items, SelectionOrder::Random, &mut rng)
                .unwrap();
            assert!(!seen.contains(&picked.uid));
            seen.push(picked.uid);
            registry.mark_sent("pool", picked.uid, now()).unwrap();
        }
    }

    #[test]
    fn test_empty_pool_is_depleted() {
        let (_dir, registry) = temp_registry();
        let mut rng = StdRng::seed_from_u64(0);

        let err = registry
            .pick_unsent("pool", &[], SelectionOrder::InOrder, &mut rng)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Depleted { .. }));
    }

    #[test]
    fn test_reset_pool_makes_items_available_again() {
        let (_dir, mut registry) = temp_registry();
        let items = items();
        let mut rng = StdRng::seed_from_u64(0);

        for item in &items {
            registry.mark_sent("pool", item.uid, now()).unwrap();
        }
        registry.reset_pool("pool").unwrap();

        let picked = registry
            .pick_unsent("pool", &items, SelectionOrder::InOrder, &mut rng)
            .unwrap();
        assert_eq!(picked.uid, 1);
    }

    #[test]
    fn test_stats_idempotent() {
        let (_dir, mut registry) = temp_registry();
        registry.mark_sent("pool", 1, now()).unwrap();

        let first = registry.stats("pool", 3);
        let second = registry.stats("pool", 3);
        assert_eq!(first, second);
        assert_eq!(
            first,
            PoolStats {
                total: 3,
                sent: 1,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_stats_unknown_pool() {
        let (_dir, registry) = temp_registry();
        assert_eq!(
            registry.stats("pool", 5),
            PoolStats {
                total: 5,
                sent: 0,
                remaining: 5
            }
        );
    }

    #[test]
    fn test_round_trip_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("register.yaml");

        let mut registry = Registry::empty(&path);
        registry.mark_sent("morning_media", 2, now()).unwrap();
        registry.mark_sent("morning_media", 7, now()).unwrap();
        registry.mark_sent("afternoon_media", 1, now()).unwrap();

        let reloaded = Registry::load(&path).unwrap();
        assert_eq!(reloaded.sent_uids("morning_media"), vec![2, 7]);
        assert_eq!(reloaded.sent_uids("afternoon_media"), vec![1]);
        assert!(reloaded.is_sent("morning_media", 2));
        assert!(!reloaded.is_sent("morning_media", 3));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(dir.path().join("nope.yaml")).unwrap();
        assert!(registry.sent_uids("pool").is_empty());
    }

    #[test]
    fn test_persist_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory path cannot be written as a file.
        let mut registry = Registry::empty(dir.path());

        let err = registry.mark_sent("pool", 1, now()).unwrap_err();
        assert!(matches!(err, RegistryError::Persistence(_)));
        assert!(!registry.is_sent("pool", 1));
    }
}

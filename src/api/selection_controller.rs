use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{PlotError, PlotResult};

use super::{ItemCatalog, SelectionMap, SelectionUpdate};

/// Bounds for messages parked while waiting for an earlier version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionSyncConfig {
    pub max_pending_updates: usize,
    pub max_pending_tile_requests: usize,
}

impl Default for SelectionSyncConfig {
    fn default() -> Self {
        Self {
            max_pending_updates: 1_024,
            max_pending_tile_requests: 4_096,
        }
    }
}

/// Result of submitting a selection update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T> {
    /// The update and any buffered successors were applied, in order.
    /// `released` holds tile requests whose required version is now
    /// satisfied; the caller dispatches them.
    Applied {
        version: u64,
        applied_versions: Vec<u64>,
        released: Vec<T>,
    },
    /// Parked until `expected` arrives.
    Buffered { expected: u64 },
    /// Already applied or already buffered; nothing changed.
    Duplicate { current: u64 },
}

/// Decision for a tile request tied to a selection version.
#[derive(Debug, Clone, PartialEq)]
pub enum TileDispatch<T> {
    Ready(T),
    Queued { required_version: u64, current: u64 },
}

/// Consistent copy of the selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub version: u64,
    pub selected: Vec<bool>,
}

#[derive(Debug)]
struct SyncState<T> {
    map: SelectionMap,
    version: u64,
    pending_updates: BTreeMap<u64, SelectionUpdate>,
    pending_tiles: BTreeMap<u64, Vec<T>>,
    pending_tile_count: usize,
}

impl<T> SyncState<T> {
    /// Removes every parked tile request whose version is now satisfied,
    /// lowest version first and arrival order within a version.
    fn take_ready_tiles(&mut self, released: &mut Vec<T>) {
        let later = self.pending_tiles.split_off(&(self.version + 1));
        let ready = std::mem::replace(&mut self.pending_tiles, later);
        for (_, bucket) in ready {
            self.pending_tile_count -= bucket.len();
            released.extend(bucket);
        }
    }
}

/// Owns the selection map and its even version counter.
///
/// Updates must be applied in strictly increasing version order (`v`, `v+2`,
/// ...) even when the transport delivers them out of order, and tile requests
/// that depend on a version must wait for it. Version checks, map mutation and
/// draining of both buffers happen under one mutex; released tile requests are
/// handed back to the caller so rendering runs after the lock is dropped.
///
/// The version is also published in an atomic. It is odd (`v+1`) while a
/// batch of updates is being applied, so lock-free readers such as renderer
/// workers can tell that the map they read may be mid-update.
#[derive(Debug)]
pub struct SelectionVersionController<T> {
    state: Mutex<SyncState<T>>,
    published_version: AtomicU64,
    catalog: Arc<ItemCatalog>,
    config: SelectionSyncConfig,
}

impl<T> SelectionVersionController<T> {
    #[must_use]
    pub fn new(catalog: Arc<ItemCatalog>, config: SelectionSyncConfig) -> Self {
        Self {
            state: Mutex::new(SyncState {
                map: SelectionMap::new(catalog.len()),
                version: 0,
                pending_updates: BTreeMap::new(),
                pending_tiles: BTreeMap::new(),
                pending_tile_count: 0,
            }),
            published_version: AtomicU64::new(0),
            catalog,
            config,
        }
    }

    // State is only written in whole steps, so a poisoned lock still guards
    // a consistent map.
    fn lock(&self) -> MutexGuard<'_, SyncState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    /// Last fully applied version.
    #[must_use]
    pub fn current_version(&self) -> u64 {
        self.lock().version
    }

    /// Lock-free version probe; odd while an update batch is in progress.
    #[must_use]
    pub fn published_version(&self) -> u64 {
        self.published_version.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn snapshot(&self) -> SelectionSnapshot {
        let state = self.lock();
        SelectionSnapshot {
            version: state.version,
            selected: state.map.as_slice().to_vec(),
        }
    }

    /// Selected flags for `item_ids`, read under the lock.
    #[must_use]
    pub fn selected_flags(&self, item_ids: &[usize]) -> Vec<bool> {
        let state = self.lock();
        item_ids
            .iter()
            .map(|item_id| state.map.is_selected(*item_id))
            .collect()
    }

    #[must_use]
    pub fn pending_update_count(&self) -> usize {
        self.lock().pending_updates.len()
    }

    #[must_use]
    pub fn pending_tile_request_count(&self) -> usize {
        self.lock().pending_tile_count
    }

    /// Applies or parks one selection update.
    ///
    /// Odd versions are a protocol violation and leave all state untouched.
    pub fn submit_update(&self, update: SelectionUpdate) -> PlotResult<UpdateOutcome<T>> {
        if update.version % 2 != 0 {
            return Err(PlotError::VersionParity {
                version: update.version,
            });
        }

        let mut state = self.lock();
        let current = state.version;

        if update.version <= current {
            debug!(
                version = update.version,
                current, "ignoring stale selection update"
            );
            return Ok(UpdateOutcome::Duplicate { current });
        }

        let expected = current + 2;
        if update.version > expected {
            if state.pending_updates.contains_key(&update.version) {
                debug!(
                    version = update.version,
                    "selection update already buffered, ignoring duplicate"
                );
                return Ok(UpdateOutcome::Duplicate { current });
            }
            if state.pending_updates.len() >= self.config.max_pending_updates {
                warn!(
                    version = update.version,
                    limit = self.config.max_pending_updates,
                    "dropping selection update, pending buffer is full"
                );
                return Err(PlotError::PendingLimit {
                    kind: "selection update",
                    limit: self.config.max_pending_updates,
                });
            }
            warn!(
                expected,
                received = update.version,
                "selection update received out of order"
            );
            state.pending_updates.insert(update.version, update);
            return Ok(UpdateOutcome::Buffered { expected });
        }

        self.published_version.store(current + 1, Ordering::Release);

        let mut applied_versions = Vec::new();
        let mut released = Vec::new();
        let mut next = Some(update);
        while let Some(update) = next {
            let item_ids = update.targets.resolve(&self.catalog);
            state.map.apply(update.op, &item_ids);
            state.version = update.version;
            applied_versions.push(update.version);
            trace!(
                version = update.version,
                op = ?update.op,
                targets = item_ids.len(),
                "applied selection update"
            );

            state.take_ready_tiles(&mut released);
            let following = state.version + 2;
            next = state.pending_updates.remove(&following);
        }

        let version = state.version;
        self.published_version.store(version, Ordering::Release);
        drop(state);

        debug!(
            version,
            applied = applied_versions.len(),
            released = released.len(),
            "selection version advanced"
        );
        Ok(UpdateOutcome::Applied {
            version,
            applied_versions,
            released,
        })
    }

    /// Hands `request` back when `required_version` is already applied,
    /// otherwise parks it until that version is reached.
    pub fn dispatch_or_queue(&self, required_version: u64, request: T) -> PlotResult<TileDispatch<T>> {
        let mut state = self.lock();
        let current = state.version;
        if required_version <= current {
            return Ok(TileDispatch::Ready(request));
        }

        if state.pending_tile_count >= self.config.max_pending_tile_requests {
            warn!(
                required_version,
                limit = self.config.max_pending_tile_requests,
                "dropping tile request, pending buffer is full"
            );
            return Err(PlotError::PendingLimit {
                kind: "tile request",
                limit: self.config.max_pending_tile_requests,
            });
        }

        warn!(
            required_version,
            current, "tile request waits for a newer selection version"
        );
        state
            .pending_tiles
            .entry(required_version)
            .or_default()
            .push(request);
        state.pending_tile_count += 1;
        Ok(TileDispatch::Queued {
            required_version,
            current,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{SelectionSyncConfig, SelectionVersionController, TileDispatch, UpdateOutcome};
    use crate::api::{ItemCatalog, SelectionOp, SelectionTargets, SelectionUpdate};

    fn controller(config: SelectionSyncConfig) -> SelectionVersionController<&'static str> {
        let mut catalog = ItemCatalog::new();
        catalog
            .extend_labels(["a", "b", "c"], None)
            .expect("labels");
        SelectionVersionController::new(Arc::new(catalog), config)
    }

    fn exact(version: u64, ids: &[usize]) -> SelectionUpdate {
        SelectionUpdate::new(version, SelectionOp::Exact, SelectionTargets::Ids(ids.to_vec()))
    }

    #[test]
    fn published_version_is_even_at_rest() {
        let controller = controller(SelectionSyncConfig::default());
        controller.submit_update(exact(2, &[0])).expect("in order");
        assert_eq!(controller.published_version(), 2);
        assert_eq!(controller.current_version(), 2);
    }

    #[test]
    fn odd_tile_versions_release_once_passed() {
        let controller = controller(SelectionSyncConfig::default());
        let queued = controller.dispatch_or_queue(3, "odd").expect("queued");
        assert!(matches!(queued, TileDispatch::Queued { .. }));

        let outcome = controller.submit_update(exact(2, &[1])).expect("v2");
        assert!(matches!(outcome, UpdateOutcome::Applied { ref released, .. } if released.is_empty()));
        let outcome = controller.submit_update(exact(4, &[1])).expect("v4");
        assert!(matches!(outcome, UpdateOutcome::Applied { ref released, .. } if released == &vec!["odd"]));
        assert_eq!(controller.pending_tile_request_count(), 0);
    }

    #[test]
    fn pending_update_limit_is_enforced() {
        let controller = controller(SelectionSyncConfig {
            max_pending_updates: 1,
            max_pending_tile_requests: 1,
        });
        controller.submit_update(exact(6, &[0])).expect("buffered");
        assert!(controller.submit_update(exact(8, &[0])).is_err());
        assert_eq!(controller.pending_update_count(), 1);

        controller.dispatch_or_queue(10, "first").expect("queued");
        assert!(controller.dispatch_or_queue(10, "second").is_err());
    }
}

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

use crate::types::{CubeId, SerialNumber};

/// Thread-safe bidirectional map between cube ids and serial numbers.
///
/// Reads take the shared lock; bulk swaps take the exclusive lock. Readers
/// see either the empty map or the complete result of the last published
/// composition, never a partially applied one.
#[derive(Clone)]
pub struct KeyMap {
    inner: Arc<RwLock<KeyMapInner>>,
    notifier: Arc<(Mutex<PublishStats>, Condvar)>,
}

/// Internal map storage behind `KeyMap` locks.
struct KeyMapInner {
    forward: IndexMap<CubeId, SerialNumber>,
    inverse: HashMap<SerialNumber, CubeId>,
}

/// Internal publication counter.
#[derive(Default)]
struct PublishStats {
    generation: u64,
}

impl KeyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(KeyMapInner {
                forward: IndexMap::new(),
                inverse: HashMap::new(),
            })),
            notifier: Arc::new((Mutex::new(PublishStats::default()), Condvar::new())),
        }
    }

    /// Insert a single pairing, replacing any entry that holds either key.
    pub fn put(&self, cube_id: CubeId, serial: SerialNumber) {
        let mut inner = self.inner.write().expect("key map poisoned");
        inner.insert_pair(cube_id, serial);
        drop(inner);
        self.bump_generation();
    }

    /// Look up the serial number derived for `cube_id`.
    pub fn forward(&self, cube_id: &str) -> Option<SerialNumber> {
        let inner = self.inner.read().expect("key map poisoned");
        inner.forward.get(cube_id).cloned()
    }

    /// Look up the cube id that `serial` was derived from.
    pub fn reverse(&self, serial: &str) -> Option<CubeId> {
        let inner = self.inner.read().expect("key map poisoned");
        inner.inverse.get(serial).cloned()
    }

    /// Replace the whole mapping under the exclusive lock.
    pub fn replace_all(&self, entries: Vec<(CubeId, SerialNumber)>) {
        self.replace_all_if(entries, || true);
    }

    /// Replace the whole mapping, gated on `publish` evaluated under the
    /// exclusive lock. Returns whether the swap happened.
    ///
    /// Evaluating the gate inside the critical section is what makes stale
    /// publication suppression race-free: a job whose cancellation flag is
    /// raised before a successor spawns can never swap after the successor.
    pub fn replace_all_if<F>(&self, entries: Vec<(CubeId, SerialNumber)>, publish: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut inner = self.inner.write().expect("key map poisoned");
        if !publish() {
            return false;
        }
        inner.forward.clear();
        inner.inverse.clear();
        for (cube_id, serial) in entries {
            inner.insert_pair(cube_id, serial);
        }
        drop(inner);
        self.bump_generation();
        true
    }

    /// Return a cloned snapshot of the current mapping in publication order.
    pub fn snapshot(&self) -> Vec<(CubeId, SerialNumber)> {
        let inner = self.inner.read().expect("key map poisoned");
        inner
            .forward
            .iter()
            .map(|(cube_id, serial)| (cube_id.clone(), serial.clone()))
            .collect()
    }

    /// Returns `true` when the map holds no pairings.
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.read().expect("key map poisoned");
        inner.forward.is_empty()
    }

    /// Return the number of pairings currently mapped.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("key map poisoned");
        inner.forward.len()
    }

    /// Return the number of completed mutations (puts and published swaps).
    pub fn generation(&self) -> u64 {
        let (lock, _) = &*self.notifier;
        lock.lock().expect("key map stats poisoned").generation
    }

    /// Wait until the generation exceeds `last_seen`, or until timeout elapses.
    pub fn wait_for_generation(&self, last_seen: u64, timeout: Duration) -> u64 {
        let (lock, cvar) = &*self.notifier;
        let mut stats = lock.lock().expect("key map stats poisoned");
        while stats.generation <= last_seen {
            let result = cvar
                .wait_timeout(stats, timeout)
                .expect("key map stats poisoned");
            stats = result.0;
            if result.1.timed_out() {
                break;
            }
        }
        stats.generation
    }

    fn bump_generation(&self) {
        let (lock, cvar) = &*self.notifier;
        let mut stats = lock.lock().expect("key map stats poisoned");
        stats.generation = stats.generation.saturating_add(1);
        cvar.notify_all();
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMapInner {
    /// Insert a pairing, evicting any entry that currently owns either key.
    /// Keeps the two directions 1:1.
    fn insert_pair(&mut self, cube_id: CubeId, serial: SerialNumber) {
        if let Some(previous_owner) = self.inverse.get(&serial) {
            if previous_owner != &cube_id {
                let previous_owner = previous_owner.clone();
                self.forward.swap_remove(&previous_owner);
            }
        }
        if let Some(previous_serial) = self.forward.insert(cube_id.clone(), serial.clone()) {
            if previous_serial != serial {
                self.inverse.remove(&previous_serial);
            }
        }
        self.inverse.insert(serial, cube_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_lookups_round_trip() {
        let map = KeyMap::new();
        assert!(map.is_empty());
        assert_eq!(map.forward("/a/1.cub"), None);
        assert_eq!(map.reverse("SN1"), None);

        map.put("/a/1.cub".to_string(), "SN1".to_string());
        assert_eq!(map.len(), 1);
        assert_eq!(map.forward("/a/1.cub").as_deref(), Some("SN1"));
        assert_eq!(map.reverse("SN1").as_deref(), Some("/a/1.cub"));
    }

    #[test]
    fn put_evicts_stale_owners_in_both_directions() {
        let map = KeyMap::new();
        map.put("/a/1.cub".to_string(), "SN1".to_string());
        map.put("/a/1.cub".to_string(), "SN2".to_string());
        assert_eq!(map.reverse("SN1"), None);
        assert_eq!(map.forward("/a/1.cub").as_deref(), Some("SN2"));

        map.put("/a/2.cub".to_string(), "SN2".to_string());
        assert_eq!(map.forward("/a/1.cub"), None);
        assert_eq!(map.reverse("SN2").as_deref(), Some("/a/2.cub"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn replace_all_swaps_wholesale() {
        let map = KeyMap::new();
        map.put("/old/1.cub".to_string(), "OLD1".to_string());

        map.replace_all(vec![
            ("/a/1.cub".to_string(), "SN1".to_string()),
            ("/a/2.cub".to_string(), "SN2".to_string()),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.forward("/old/1.cub"), None);
        assert_eq!(
            map.snapshot(),
            vec![
                ("/a/1.cub".to_string(), "SN1".to_string()),
                ("/a/2.cub".to_string(), "SN2".to_string()),
            ]
        );
    }

    #[test]
    fn gated_replace_refusal_leaves_map_untouched() {
        let map = KeyMap::new();
        map.put("/a/1.cub".to_string(), "SN1".to_string());
        let before = map.generation();

        let swapped = map.replace_all_if(
            vec![("/b/2.cub".to_string(), "SN2".to_string())],
            || false,
        );
        assert!(!swapped);
        assert_eq!(map.generation(), before);
        assert_eq!(map.forward("/a/1.cub").as_deref(), Some("SN1"));
        assert_eq!(map.forward("/b/2.cub"), None);
    }

    #[test]
    fn generation_waiters_are_woken_by_publication() {
        let map = KeyMap::new();
        assert_eq!(map.generation(), 0);
        assert_eq!(map.wait_for_generation(0, Duration::from_millis(1)), 0);

        let map_for_waiter = map.clone();
        let waiter =
            std::thread::spawn(move || map_for_waiter.wait_for_generation(0, Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(5));
        map.replace_all(vec![("/a/1.cub".to_string(), "SN1".to_string())]);
        assert_eq!(waiter.join().unwrap(), 1);
    }
}

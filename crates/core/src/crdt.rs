// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CRDT Doc adapter: a thin facade over named last-writer-wins maps.
//!
//! This is the in-process stand-in for the Yjs-compatible CRDT library the
//! production system depends on (see design notes in `DESIGN.md` — no
//! byte-compatible crate for that wire format exists in this workspace's
//! dependency graph, so the merge algorithm is implemented directly here
//! behind the same shape the rest of the system expects: named maps,
//! `get`/`set`/`delete`/`has`/`size`/`entries`, a nested submap primitive for
//! [`Pulse`](crate::pulse), an update-event stream, and snapshot encode/decode).
//!
//! Conflict resolution is last-writer-wins at the key level, ordered by
//! `(counter, site)` so replay order never affects the converged result —
//! the same invariant §5 requires of the real CRDT merge.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Logical clock stamp used to order concurrent writes deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub counter: u64,
    pub site: u64,
}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.counter, self.site).cmp(&(other.counter, other.site))
    }
}

/// A single LWW-register entry: a value (or tombstone) plus its write stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: serde_json::Value,
    stamp: Stamp,
    tombstone: bool,
}

/// One named map: `key -> Entry`. Used both for top-level collections
/// (Node, Task, Message, ...) and as the field set of a single Pulse
/// submap record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrdtMap {
    entries: HashMap<String, Entry>,
}

impl CrdtMap {
    fn apply_local(&mut self, key: &str, value: serde_json::Value, stamp: Stamp) {
        self.entries.insert(key.to_string(), Entry { value, stamp, tombstone: false });
    }

    fn apply_delete(&mut self, key: &str, stamp: Stamp) {
        match self.entries.get_mut(key) {
            Some(e) if stamp >= e.stamp => {
                e.tombstone = true;
                e.stamp = stamp;
                e.value = serde_json::Value::Null;
            }
            Some(_) => {}
            None => {
                self.entries.insert(
                    key.to_string(),
                    Entry { value: serde_json::Value::Null, stamp, tombstone: true },
                );
            }
        }
    }

    /// Merge a remote write, keeping the entry with the higher stamp.
    fn merge_set(&mut self, key: &str, value: serde_json::Value, stamp: Stamp, tombstone: bool) {
        match self.entries.get(key) {
            Some(existing) if existing.stamp >= stamp => {}
            _ => {
                self.entries.insert(key.to_string(), Entry { value, stamp, tombstone });
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key).filter(|e| !e.tombstone).map(|e| &e.value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn size(&self) -> usize {
        self.entries.values().filter(|e| !e.tombstone).count()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter(|(_, e)| !e.tombstone).map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.entries.values().filter(|e| !e.tombstone).map(|e| &e.value)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.entries.iter().filter(|(_, e)| !e.tombstone).map(|(k, e)| (k.as_str(), &e.value))
    }

    /// Drop every tombstone. Used when compacting a snapshot for persistence.
    fn compact(&mut self) {
        self.entries.retain(|_, e| !e.tombstone);
    }

    /// Merge every entry of `other` into `self` by last-writer-wins, same
    /// rule as [`CrdtMap::merge_set`] applied key by key.
    fn merge_from(&mut self, other: &CrdtMap) {
        for (key, entry) in &other.entries {
            self.merge_set(key, entry.value.clone(), entry.stamp, entry.tombstone);
        }
    }

    fn max_stamp_counter(&self) -> Option<u64> {
        self.entries.values().map(|e| e.stamp.counter).max()
    }
}

/// A single operation in an update batch: set or delete one key, optionally
/// scoped to a nested submap field (used by Pulse).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Op {
    pub collection: String,
    pub key: String,
    pub field: Option<String>,
    pub value: Option<serde_json::Value>,
    pub stamp: Stamp,
}

/// A batch of ops emitted on every mutation; the wire/update-event payload.
pub type DocUpdate = Vec<Op>;

/// On-disk/on-wire representation of the full document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DocSnapshot {
    maps: HashMap<String, CrdtMap>,
    submaps: HashMap<String, HashMap<String, CrdtMap>>,
}

struct DocInner {
    maps: HashMap<String, CrdtMap>,
    submaps: HashMap<String, HashMap<String, CrdtMap>>,
}

/// The shared replicated document: a set of named maps plus named submap
/// collections (currently only `"pulse"` uses the submap form).
pub struct Doc {
    site_id: u64,
    counter: AtomicU64,
    inner: Mutex<DocInner>,
    update_tx: broadcast::Sender<DocUpdate>,
}

impl Doc {
    pub fn new(site_id: u64) -> Arc<Self> {
        let (update_tx, _) = broadcast::channel(1024);
        Arc::new(Self {
            site_id,
            counter: AtomicU64::new(0),
            inner: Mutex::new(DocInner { maps: HashMap::new(), submaps: HashMap::new() }),
            update_tx,
        })
    }

    fn next_stamp(&self) -> Stamp {
        Stamp { counter: self.counter.fetch_add(1, Ordering::SeqCst) + 1, site: self.site_id }
    }

    /// Subscribe to the update-event stream.
    pub fn on_update(&self) -> broadcast::Receiver<DocUpdate> {
        self.update_tx.subscribe()
    }

    fn emit(&self, ops: DocUpdate) {
        if !ops.is_empty() {
            let _ = self.update_tx.send(ops);
        }
    }

    /// Set a key in a top-level map (whole-value LWW).
    pub fn set(&self, collection: &str, key: &str, value: serde_json::Value) {
        let stamp = self.next_stamp();
        {
            let mut inner = self.inner.lock();
            inner.maps.entry(collection.to_string()).or_default().apply_local(key, value.clone(), stamp);
        }
        self.emit(vec![Op {
            collection: collection.to_string(),
            key: key.to_string(),
            field: None,
            value: Some(value),
            stamp,
        }]);
    }

    /// Serialize `value` and set it on a top-level map. Logs and skips the
    /// write instead of panicking if `value` somehow fails to serialize, so
    /// a store's `put` function never has to carry its own `.expect()`.
    pub fn set_serialized<T: Serialize>(&self, collection: &str, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => self.set(collection, key, v),
            Err(err) => tracing::error!(%err, collection, key, "failed to serialize value for doc write"),
        }
    }

    /// Delete a key from a top-level map.
    pub fn delete(&self, collection: &str, key: &str) {
        let stamp = self.next_stamp();
        {
            let mut inner = self.inner.lock();
            inner.maps.entry(collection.to_string()).or_default().apply_delete(key, stamp);
        }
        self.emit(vec![Op {
            collection: collection.to_string(),
            key: key.to_string(),
            field: None,
            value: None,
            stamp,
        }]);
    }

    /// Read a key's current value from a top-level map.
    pub fn get(&self, collection: &str, key: &str) -> Option<serde_json::Value> {
        self.inner.lock().maps.get(collection).and_then(|m| m.get(key)).cloned()
    }

    pub fn has(&self, collection: &str, key: &str) -> bool {
        self.inner.lock().maps.get(collection).is_some_and(|m| m.has(key))
    }

    pub fn size(&self, collection: &str) -> usize {
        self.inner.lock().maps.get(collection).map(|m| m.size()).unwrap_or(0)
    }

    /// Snapshot every live (non-tombstoned) entry of a top-level map.
    pub fn entries(&self, collection: &str) -> Vec<(String, serde_json::Value)> {
        self.inner
            .lock()
            .maps
            .get(collection)
            .map(|m| m.entries().map(|(k, v)| (k.to_string(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn keys(&self, collection: &str) -> Vec<String> {
        self.inner
            .lock()
            .maps
            .get(collection)
            .map(|m| m.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Set a single field on a nested submap record without replacing the
    /// whole record. Used by heartbeat/presence so per-pulse identity is
    /// stable and frequent writes don't accumulate full-record tombstones.
    pub fn submap_set_field(&self, collection: &str, key: &str, field: &str, value: serde_json::Value) {
        let stamp = self.next_stamp();
        {
            let mut inner = self.inner.lock();
            let coll = inner.submaps.entry(collection.to_string()).or_default();
            coll.entry(key.to_string()).or_default().apply_local(field, value.clone(), stamp);
        }
        self.emit(vec![Op {
            collection: collection.to_string(),
            key: key.to_string(),
            field: Some(field.to_string()),
            value: Some(value),
            stamp,
        }]);
    }

    pub fn submap_get_field(&self, collection: &str, key: &str, field: &str) -> Option<serde_json::Value> {
        self.inner
            .lock()
            .submaps
            .get(collection)
            .and_then(|coll| coll.get(key))
            .and_then(|rec| rec.get(field))
            .cloned()
    }

    /// All fields of a submap record, or `None` if the record doesn't exist yet.
    pub fn submap_fields(&self, collection: &str, key: &str) -> Option<HashMap<String, serde_json::Value>> {
        self.inner.lock().submaps.get(collection).and_then(|coll| coll.get(key)).map(|rec| {
            rec.entries().map(|(k, v)| (k.to_string(), v.clone())).collect()
        })
    }

    /// Every key present in a submap collection.
    pub fn submap_keys(&self, collection: &str) -> Vec<String> {
        self.inner.lock().submaps.get(collection).map(|coll| coll.keys().cloned().collect()).unwrap_or_default()
    }

    /// Apply a batch of remote ops, merging each by last-writer-wins.
    pub fn apply_update(&self, ops: &DocUpdate) {
        let mut inner = self.inner.lock();
        for op in ops {
            match &op.field {
                None => {
                    let map = inner.maps.entry(op.collection.clone()).or_default();
                    match &op.value {
                        Some(v) => map.merge_set(&op.key, v.clone(), op.stamp, false),
                        None => map.merge_set(&op.key, serde_json::Value::Null, op.stamp, true),
                    }
                }
                Some(field) => {
                    let coll = inner.submaps.entry(op.collection.clone()).or_default();
                    let rec = coll.entry(op.key.clone()).or_default();
                    match &op.value {
                        Some(v) => rec.merge_set(field, v.clone(), op.stamp, false),
                        None => rec.merge_set(field, serde_json::Value::Null, op.stamp, true),
                    }
                }
            }
        }
        let highest = ops.iter().map(|o| o.stamp.counter).max();
        drop(inner);
        if let Some(highest) = highest {
            self.counter.fetch_max(highest, Ordering::SeqCst);
        }
    }

    /// Encode the full document (including tombstones) to bytes.
    pub fn encode_snapshot(&self) -> Result<Vec<u8>, serde_json::Error> {
        let inner = self.inner.lock();
        let snapshot = DocSnapshot { maps: inner.maps.clone(), submaps: inner.submaps.clone() };
        serde_json::to_vec(&snapshot)
    }

    /// Decode and fully replace this document's state from encoded bytes
    /// (used to load a persisted snapshot before any connection is opened).
    pub fn load_snapshot(&self, bytes: &[u8]) -> Result<(), serde_json::Error> {
        let snapshot: DocSnapshot = serde_json::from_slice(bytes)?;
        let mut inner = self.inner.lock();
        inner.maps = snapshot.maps;
        inner.submaps = snapshot.submaps;
        Ok(())
    }

    /// Merge a peer's full snapshot into this document by last-writer-wins,
    /// entry by entry. Unlike [`Doc::load_snapshot`], this preserves local
    /// writes made with a higher stamp than the remote peer's — required so
    /// an edge node that wrote offline doesn't lose that state on reconnect.
    pub fn merge_snapshot(&self, bytes: &[u8]) -> Result<(), serde_json::Error> {
        let snapshot: DocSnapshot = serde_json::from_slice(bytes)?;
        let mut inner = self.inner.lock();
        let mut highest = 0u64;
        for (name, map) in &snapshot.maps {
            if let Some(c) = map.max_stamp_counter() {
                highest = highest.max(c);
            }
            inner.maps.entry(name.clone()).or_default().merge_from(map);
        }
        for (name, coll) in &snapshot.submaps {
            let local_coll = inner.submaps.entry(name.clone()).or_default();
            for (key, rec) in coll {
                if let Some(c) = rec.max_stamp_counter() {
                    highest = highest.max(c);
                }
                local_coll.entry(key.clone()).or_default().merge_from(rec);
            }
        }
        drop(inner);
        self.counter.fetch_max(highest, Ordering::SeqCst);
        Ok(())
    }

    /// Encode a compacted snapshot: tombstones are dropped by applying the
    /// current live state to a fresh document and re-encoding it.
    pub fn compacted_snapshot(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut inner = self.inner.lock();
        for map in inner.maps.values_mut() {
            map.compact();
        }
        for coll in inner.submaps.values_mut() {
            for rec in coll.values_mut() {
                rec.compact();
            }
        }
        let snapshot = DocSnapshot { maps: inner.maps.clone(), submaps: inner.submaps.clone() };
        serde_json::to_vec(&snapshot)
    }
}

#[cfg(test)]
#[path = "crdt_tests.rs"]
mod tests;

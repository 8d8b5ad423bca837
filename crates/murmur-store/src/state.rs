//! In-memory state model.
//!
//! Holds the local node's view of the cluster plus its version counter
//! behind a single `RwLock`. Every multi-address computation runs as one
//! critical section so it observes a consistent cut of the whole snapshot.
//! Nothing here blocks on I/O.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use murmur_core::{
    reconcile, Info, MergeOutcome, NodeAddress, Snapshot, VersionSummary, VersionedValue,
};

/// The local node's versioned view of cluster state.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct StateStore {
    local: NodeAddress,
    inner: RwLock<StateInner>,
}

struct StateInner {
    /// Everything known, including the local node's own entry.
    snapshot: Snapshot,

    /// Version assigned to the next local publish.
    counter: u64,
}

impl StateStore {
    /// Create a store for the node at `local`, with an empty own entry.
    pub fn new(local: NodeAddress) -> Self {
        let mut snapshot = Snapshot::new();
        snapshot.insert(local.clone(), Info::new());

        Self {
            local,
            inner: RwLock::new(StateInner {
                snapshot,
                counter: 1,
            }),
        }
    }

    /// The local node's address.
    pub fn local_address(&self) -> &NodeAddress {
        &self.local
    }

    // A panic while holding the lock cannot leave the maps half-updated in a
    // way that breaks version monotonicity, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, StateInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// A deep, independent copy of the whole view.
    pub fn snapshot(&self) -> Snapshot {
        self.read().snapshot.clone()
    }

    /// Publish a local fact. Returns the version assigned to it.
    pub fn publish(&self, key: impl Into<String>, value: impl Into<String>) -> u64 {
        let mut inner = self.write();
        let version = inner.counter;
        inner.counter = inner.counter.saturating_add(1);

        let key = key.into();
        tracing::trace!(%key, version, "local publish");

        inner
            .snapshot
            .entry(self.local.clone())
            .or_default()
            .insert(key, VersionedValue::new(version, value));
        version
    }

    /// Look up a single value.
    pub fn get(&self, address: &NodeAddress, key: &str) -> Option<VersionedValue> {
        self.read()
            .snapshot
            .get(address)
            .and_then(|info| info.get(key))
            .cloned()
    }

    /// Highest known version for every address.
    pub fn summarize_max_versions(&self) -> VersionSummary {
        reconcile::summarize(&self.read().snapshot)
    }

    /// Entries a peer claiming `theirs` is missing or stale on.
    pub fn diff_missing_or_newer(&self, theirs: &VersionSummary) -> Snapshot {
        reconcile::diff_missing_or_newer(&self.read().snapshot, theirs)
    }

    /// Fold a remote diff into the view.
    ///
    /// If the diff carries entries for the local address that are at or
    /// above the local counter (state from an earlier life of this address),
    /// the counter is moved past them so subsequent local writes still win.
    /// Self-state at `u64::MAX` can never be outrun; such an entry for the
    /// local address is dropped instead of merged, and the counter is left
    /// alone.
    pub fn merge(&self, mut remote: Snapshot) -> MergeOutcome {
        let mut inner = self.write();

        let own_max = remote.get(&self.local).map(reconcile::max_version);
        if let Some(max) = own_max {
            if max >= inner.counter {
                match max.checked_add(1) {
                    Some(next) => {
                        tracing::debug!(
                            max,
                            counter = inner.counter,
                            "raising local counter past observed self-state"
                        );
                        inner.counter = next;
                    }
                    None => {
                        tracing::warn!(
                            local = %self.local,
                            "ignoring self-state at the maximum version"
                        );
                        remote.remove(&self.local);
                    }
                }
            }
        }

        reconcile::merge_into(&mut inner.snapshot, remote)
    }

    /// Make sure every address in `addresses` has an entry, creating empty
    /// ones as needed. No values are imported. Returns how many were created.
    pub fn ensure_known<'a, I>(&self, addresses: I) -> usize
    where
        I: IntoIterator<Item = &'a NodeAddress>,
    {
        let mut inner = self.write();
        let mut created = 0;
        for addr in addresses {
            if !inner.snapshot.contains_key(addr) {
                inner.snapshot.insert(addr.clone(), Info::new());
                created += 1;
            }
        }
        created
    }

    /// Every known address except the local one.
    pub fn known_peers(&self) -> Vec<NodeAddress> {
        let inner = self.read();
        let mut peers: Vec<NodeAddress> = inner
            .snapshot
            .keys()
            .filter(|addr| **addr != self.local)
            .cloned()
            .collect();
        peers.sort();
        peers
    }
}

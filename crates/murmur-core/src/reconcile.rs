//! Anti-entropy reconciliation.
//!
//! Pure functions over [`Snapshot`]s. A requester summarizes what it has
//! with [`summarize`]; the responder answers with
//! [`diff_missing_or_newer`]; the requester folds the answer in with
//! [`merge_into`]. Versions only ever move forward: a merge adopts a remote
//! entry only when it is strictly newer than the local one.

use std::collections::hash_map::Entry;

use crate::types::{Info, NodeAddress, Snapshot, VersionSummary};

/// Result of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Entries that were absent or strictly older locally and were adopted.
    pub adopted: usize,
    /// Addresses that were not present in the local snapshot before.
    pub new_addresses: Vec<NodeAddress>,
}

impl MergeOutcome {
    /// True if the merge changed nothing.
    pub fn is_noop(&self) -> bool {
        self.adopted == 0 && self.new_addresses.is_empty()
    }
}

/// Highest version present in `info`, or 0 if it is empty.
pub fn max_version(info: &Info) -> u64 {
    info.values().map(|v| v.version).max().unwrap_or(0)
}

/// Highest known version for every address in `snapshot`.
pub fn summarize(snapshot: &Snapshot) -> VersionSummary {
    snapshot
        .iter()
        .map(|(addr, info)| (addr.clone(), max_version(info)))
        .collect()
}

/// Entries in `local` that a peer claiming `theirs` is missing or stale on.
///
/// - For addresses the peer names, only entries with a version strictly
///   greater than the peer's claim are returned. Addresses with nothing
///   newer are left out entirely.
/// - For addresses known locally but absent from `theirs`, the full
///   [`Info`] is returned, even when it is empty, so the peer learns that
///   the address exists.
/// - Addresses the peer names that are unknown locally are ignored.
pub fn diff_missing_or_newer(local: &Snapshot, theirs: &VersionSummary) -> Snapshot {
    let mut diff = Snapshot::new();

    for (addr, info) in local {
        match theirs.get(addr) {
            None => {
                diff.insert(addr.clone(), info.clone());
            }
            Some(&claimed) => {
                let newer: Info = info
                    .iter()
                    .filter(|(_, v)| v.version > claimed)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if !newer.is_empty() {
                    diff.insert(addr.clone(), newer);
                }
            }
        }
    }

    diff
}

/// Fold `remote` into `local`.
///
/// A remote entry replaces the local one only if the local one is absent or
/// has a strictly lower version. Ties and locally newer entries are kept.
/// Unknown addresses are created, even when their remote [`Info`] is empty.
/// Applying the same `remote` twice is the same as applying it once.
pub fn merge_into(local: &mut Snapshot, remote: Snapshot) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (addr, remote_info) in remote {
        let local_info = match local.entry(addr) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                outcome.new_addresses.push(slot.key().clone());
                slot.insert(Info::with_capacity(remote_info.len()))
            }
        };

        for (key, remote_value) in remote_info {
            match local_info.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(remote_value);
                    outcome.adopted += 1;
                }
                Entry::Occupied(mut slot) => {
                    if slot.get().version < remote_value.version {
                        slot.insert(remote_value);
                        outcome.adopted += 1;
                    }
                }
            }
        }
    }

    outcome
}

/// `addresses` with every occurrence of `own` removed.
pub fn exclude_address<'a, I>(addresses: I, own: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    addresses
        .into_iter()
        .filter(|addr| addr.as_str() != own)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VersionedValue;

    fn addr(name: &str) -> NodeAddress {
        NodeAddress::new("memory", name)
    }

    fn info(entries: &[(&str, u64, &str)]) -> Info {
        entries
            .iter()
            .map(|(k, version, value)| (k.to_string(), VersionedValue::new(*version, *value)))
            .collect()
    }

    #[test]
    fn test_max_version_empty_is_zero() {
        assert_eq!(max_version(&Info::new()), 0);
    }

    #[test]
    fn test_max_version_picks_highest() {
        let i = info(&[("a", 3, "x"), ("b", 9, "y"), ("c", 4, "z")]);
        assert_eq!(max_version(&i), 9);
    }

    #[test]
    fn test_summarize_covers_every_address() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(addr("a"), info(&[("k", 2, "v")]));
        snapshot.insert(addr("b"), Info::new());

        let summary = summarize(&snapshot);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[&addr("a")], 2);
        assert_eq!(summary[&addr("b")], 0);
    }

    #[test]
    fn test_diff_full_info_for_unclaimed_address() {
        let mut local = Snapshot::new();
        local.insert(addr("a"), info(&[("x", 1, "1"), ("y", 2, "2")]));
        local.insert(addr("empty"), Info::new());

        let diff = diff_missing_or_newer(&local, &VersionSummary::new());
        assert_eq!(diff[&addr("a")].len(), 2);
        assert!(diff[&addr("empty")].is_empty());
    }

    #[test]
    fn test_diff_only_strictly_newer() {
        let mut local = Snapshot::new();
        local.insert(addr("a"), info(&[("x", 1, "1"), ("y", 2, "2"), ("z", 3, "3")]));

        let mut theirs = VersionSummary::new();
        theirs.insert(addr("a"), 2);

        let diff = diff_missing_or_newer(&local, &theirs);
        let a = &diff[&addr("a")];
        assert_eq!(a.len(), 1);
        assert_eq!(a["z"].version, 3);
    }

    #[test]
    fn test_diff_omits_up_to_date_addresses() {
        let mut local = Snapshot::new();
        local.insert(addr("a"), info(&[("x", 5, "1")]));

        let mut theirs = VersionSummary::new();
        theirs.insert(addr("a"), 5);

        assert!(diff_missing_or_newer(&local, &theirs).is_empty());
    }

    #[test]
    fn test_diff_ignores_addresses_unknown_locally() {
        let local = Snapshot::new();
        let mut theirs = VersionSummary::new();
        theirs.insert(addr("ghost"), 10);

        assert!(diff_missing_or_newer(&local, &theirs).is_empty());
    }

    #[test]
    fn test_merge_adopts_absent_and_older() {
        let mut local = Snapshot::new();
        local.insert(addr("a"), info(&[("x", 1, "old")]));

        let mut remote = Snapshot::new();
        remote.insert(addr("a"), info(&[("x", 2, "new"), ("y", 1, "fresh")]));

        let outcome = merge_into(&mut local, remote);
        assert_eq!(outcome.adopted, 2);
        assert!(outcome.new_addresses.is_empty());
        assert_eq!(local[&addr("a")]["x"].value, "new");
        assert_eq!(local[&addr("a")]["y"].value, "fresh");
    }

    #[test]
    fn test_merge_keeps_ties_and_newer() {
        let mut local = Snapshot::new();
        local.insert(addr("a"), info(&[("x", 4, "mine"), ("y", 2, "tie")]));

        let mut remote = Snapshot::new();
        remote.insert(addr("a"), info(&[("x", 3, "stale"), ("y", 2, "other")]));

        let outcome = merge_into(&mut local, remote);
        assert!(outcome.is_noop());
        assert_eq!(local[&addr("a")]["x"].value, "mine");
        assert_eq!(local[&addr("a")]["y"].value, "tie");
    }

    #[test]
    fn test_merge_creates_empty_addresses() {
        let mut local = Snapshot::new();
        let mut remote = Snapshot::new();
        remote.insert(addr("b"), Info::new());

        let outcome = merge_into(&mut local, remote);
        assert_eq!(outcome.adopted, 0);
        assert_eq!(outcome.new_addresses, vec![addr("b")]);
        assert!(local[&addr("b")].is_empty());
    }

    #[test]
    fn test_merge_twice_is_merge_once() {
        let mut remote = Snapshot::new();
        remote.insert(addr("a"), info(&[("x", 2, "2")]));
        remote.insert(addr("b"), info(&[("y", 7, "7")]));

        let mut once = Snapshot::new();
        once.insert(addr("a"), info(&[("x", 1, "1")]));
        let mut twice = once.clone();

        merge_into(&mut once, remote.clone());
        merge_into(&mut twice, remote.clone());
        let second = merge_into(&mut twice, remote);

        assert!(second.is_noop());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_exclude_address() {
        let seeds = vec![
            "127.0.0.1:1".to_string(),
            "127.0.0.1:2".to_string(),
            "127.0.0.1:1".to_string(),
        ];
        let filtered = exclude_address(&seeds, "127.0.0.1:1");
        assert_eq!(filtered, vec!["127.0.0.1:2".to_string()]);
        assert_eq!(seeds.len(), 3);
    }
}

/*
 * Copyright 2019 Cargill Incorporated
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 * -----------------------------------------------------------------------------
 */

//! Provides a simple, in-memory ledger backed by `std::collections::HashMap`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::protocol::rwset::TxReadWriteSet;

use super::{LedgerProvider, QueryError, QueryExecutor};

/// The committed key-value pairs of one channel, keyed by namespace and key.
pub type State = HashMap<(String, String), Vec<u8>>;

/// Injected failures, used to exercise the handling of an unreliable backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    None,
    /// Snapshots cannot be acquired.
    SnapshotUnavailable,
    /// Snapshots are acquired, but every lookup times out.
    QueryTimeout,
}

/// An in-memory ledger.
///
/// Each channel's state is held behind an `Arc`; commits replace the `Arc` rather than
/// modifying the state in place, so an outstanding snapshot never observes later commits.
#[derive(Clone)]
pub struct HashMapLedger {
    channels: Arc<Mutex<HashMap<String, Arc<State>>>>,
    failure_mode: Arc<Mutex<FailureMode>>,
    active_snapshots: Arc<AtomicUsize>,
}

impl Default for HashMapLedger {
    fn default() -> Self {
        HashMapLedger {
            channels: Arc::new(Mutex::new(HashMap::new())),
            failure_mode: Arc::new(Mutex::new(FailureMode::None)),
            active_snapshots: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl HashMapLedger {
    pub fn new() -> Self {
        HashMapLedger::default()
    }

    /// Sets a single key.
    pub fn put_state(
        &self,
        channel_id: &str,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), QueryError> {
        self.update(channel_id, |state| {
            state.insert((namespace.to_string(), key.to_string()), value);
        })
    }

    /// Applies every write of a read-write set, as a committer would for a valid transaction.
    pub fn commit(&self, channel_id: &str, rwset: &TxReadWriteSet) -> Result<(), QueryError> {
        self.update(channel_id, |state| {
            for ns_rwset in rwset.ns_rwsets() {
                for write in ns_rwset.rwset().writes() {
                    let key = (ns_rwset.namespace().to_string(), write.key().to_string());
                    if write.is_delete() {
                        state.remove(&key);
                    } else {
                        state.insert(key, write.value().to_vec());
                    }
                }
            }
        })
    }

    pub fn set_failure_mode(&self, mode: FailureMode) -> Result<(), QueryError> {
        let mut failure_mode = self
            .failure_mode
            .lock()
            .map_err(|_| QueryError::Unavailable("failure mode lock poisoned".into()))?;
        *failure_mode = mode;
        Ok(())
    }

    /// The number of snapshots acquired and not yet dropped.
    pub fn active_snapshots(&self) -> usize {
        self.active_snapshots.load(Ordering::SeqCst)
    }

    fn update<F>(&self, channel_id: &str, f: F) -> Result<(), QueryError>
    where
        F: FnOnce(&mut State),
    {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| QueryError::Unavailable("channels lock poisoned".into()))?;
        let mut next_state = channels
            .get(channel_id)
            .map(|state| State::clone(state))
            .unwrap_or_default();
        f(&mut next_state);
        channels.insert(channel_id.to_string(), Arc::new(next_state));
        Ok(())
    }

    fn failure_mode(&self) -> Result<FailureMode, QueryError> {
        self.failure_mode
            .lock()
            .map(|mode| *mode)
            .map_err(|_| QueryError::Unavailable("failure mode lock poisoned".into()))
    }
}

impl LedgerProvider for HashMapLedger {
    fn snapshot(&self, channel_id: &str) -> Result<Box<dyn QueryExecutor>, QueryError> {
        let failure_mode = self.failure_mode()?;
        if failure_mode == FailureMode::SnapshotUnavailable {
            return Err(QueryError::Unavailable(format!(
                "no snapshot of channel {} could be acquired",
                channel_id
            )));
        }

        let state = self
            .channels
            .lock()
            .map_err(|_| QueryError::Unavailable("channels lock poisoned".into()))?
            .get(channel_id)
            .cloned()
            .unwrap_or_default();

        self.active_snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HashMapSnapshot {
            state,
            failure_mode,
            active_snapshots: Arc::clone(&self.active_snapshots),
        }))
    }
}

struct HashMapSnapshot {
    state: Arc<State>,
    failure_mode: FailureMode,
    active_snapshots: Arc<AtomicUsize>,
}

impl QueryExecutor for HashMapSnapshot {
    fn get_state(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, QueryError> {
        if self.failure_mode == FailureMode::QueryTimeout {
            return Err(QueryError::Timeout(format!(
                "lookup of {} in namespace {}",
                key, namespace
            )));
        }

        Ok(self
            .state
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }
}

impl Drop for HashMapSnapshot {
    fn drop(&mut self) {
        self.active_snapshots.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::rwset::TxReadWriteSetBuilder;

    #[test]
    // a snapshot keeps reading the state it was taken from after later commits
    fn snapshot_isolation() {
        let ledger = HashMapLedger::new();
        ledger
            .put_state("mychannel", "lscc", "mycc", b"v1".to_vec())
            .unwrap();

        let snapshot = ledger.snapshot("mychannel").unwrap();
        let rwset = TxReadWriteSetBuilder::new()
            .with_write("lscc", "mycc", b"v2".to_vec())
            .with_write("lscc", "mycc~collection", b"config".to_vec())
            .build();
        ledger.commit("mychannel", &rwset).unwrap();

        assert_eq!(
            Some(b"v1".to_vec()),
            snapshot.get_state("lscc", "mycc").unwrap()
        );
        assert_eq!(None, snapshot.get_state("lscc", "mycc~collection").unwrap());

        let latest = ledger.snapshot("mychannel").unwrap();
        assert_eq!(
            Some(b"v2".to_vec()),
            latest.get_state("lscc", "mycc").unwrap()
        );
    }

    #[test]
    fn channels_are_separate() {
        let ledger = HashMapLedger::new();
        ledger
            .put_state("mychannel", "lscc", "mycc", b"v1".to_vec())
            .unwrap();

        let snapshot = ledger.snapshot("otherchannel").unwrap();
        assert_eq!(None, snapshot.get_state("lscc", "mycc").unwrap());
    }

    #[test]
    fn deletes_remove_keys() {
        let ledger = HashMapLedger::new();
        ledger
            .put_state("mychannel", "mycc", "a", b"1".to_vec())
            .unwrap();
        ledger
            .commit(
                "mychannel",
                &TxReadWriteSetBuilder::new().with_delete("mycc", "a").build(),
            )
            .unwrap();

        let snapshot = ledger.snapshot("mychannel").unwrap();
        assert_eq!(None, snapshot.get_state("mycc", "a").unwrap());
    }

    #[test]
    // the active snapshot count follows acquisition and drop
    fn snapshots_are_released_on_drop() {
        let ledger = HashMapLedger::new();
        assert_eq!(0, ledger.active_snapshots());

        let first = ledger.snapshot("mychannel").unwrap();
        let second = ledger.snapshot("mychannel").unwrap();
        assert_eq!(2, ledger.active_snapshots());

        drop(first);
        assert_eq!(1, ledger.active_snapshots());
        drop(second);
        assert_eq!(0, ledger.active_snapshots());
    }

    #[test]
    fn injected_failures() {
        let ledger = HashMapLedger::new();

        ledger
            .set_failure_mode(FailureMode::SnapshotUnavailable)
            .unwrap();
        match ledger.snapshot("mychannel") {
            Err(QueryError::Unavailable(_)) => (),
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("snapshot should not be available"),
        }
        assert_eq!(0, ledger.active_snapshots());

        ledger.set_failure_mode(FailureMode::QueryTimeout).unwrap();
        let snapshot = ledger.snapshot("mychannel").unwrap();
        assert_eq!(
            Err(QueryError::Timeout("lookup of mycc in namespace lscc".into())),
            snapshot.get_state("lscc", "mycc")
        );
    }
}

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

//! Read-only access to committed ledger state.
//!
//! Validation reads the ledger through a [`QueryExecutor`], a snapshot of one channel's state
//! acquired from a [`LedgerProvider`].  The snapshot is released when the executor is dropped.

mod error;
mod hashmap;

pub use self::error::QueryError;
pub use self::hashmap::{FailureMode, HashMapLedger};

/// Hands out read-only snapshots of channel state.
pub trait LedgerProvider: Send + Sync {
    /// Acquires a snapshot of the committed state of `channel_id`.
    fn snapshot(&self, channel_id: &str) -> Result<Box<dyn QueryExecutor>, QueryError>;
}

/// Point lookups into a snapshot of committed state.
pub trait QueryExecutor: Send {
    /// Returns the value of `key` in `namespace`, or `None` if the key is absent.
    fn get_state(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, QueryError>;
}

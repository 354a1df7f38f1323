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

use crate::ledger::{LedgerProvider, QueryExecutor};

use super::error::ValidationError;

/// A ledger snapshot acquired on the first lookup and released when dropped.
pub struct LazySnapshot<'a> {
    ledger: &'a dyn LedgerProvider,
    channel_id: &'a str,
    executor: Option<Box<dyn QueryExecutor>>,
}

impl<'a> LazySnapshot<'a> {
    pub fn new(ledger: &'a dyn LedgerProvider, channel_id: &'a str) -> Self {
        LazySnapshot {
            ledger,
            channel_id,
            executor: None,
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.executor.is_some()
    }

    /// Looks up a key, acquiring the snapshot first if needed.  Ledger failures are
    /// intermittent.
    pub fn get_state(
        &mut self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, ValidationError> {
        let executor = match self.executor.take() {
            Some(executor) => executor,
            None => self.ledger.snapshot(self.channel_id).map_err(|err| {
                error!(
                    "Unable to acquire ledger snapshot of channel {}: {}",
                    self.channel_id, err
                );
                ValidationError::from(err)
            })?,
        };

        let result = executor.get_state(namespace, key);
        self.executor = Some(executor);

        result.map_err(|err| {
            error!(
                "Unable to read {} from namespace {} on channel {}: {}",
                key, namespace, self.channel_id, err
            );
            ValidationError::from(err)
        })
    }
}

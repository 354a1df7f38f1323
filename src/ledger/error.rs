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

use std::error::Error;
use std::fmt;

/// An error that may occur on ledger reads.
///
/// Every variant describes the local environment, never the transaction being validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The ledger backend could not be reached.
    Unavailable(String),
    /// The ledger backend did not answer in time.
    Timeout(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryError::Unavailable(msg) => write!(f, "Ledger unavailable: {}", msg),
            QueryError::Timeout(msg) => write!(f, "Ledger query timed out: {}", msg),
        }
    }
}

impl Error for QueryError {}

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

//! Deterministic validation of endorsed transactions.
//!
//! A [`Validator`](validation::Validator) checks that a transaction's endorsements satisfy its
//! endorsement policy and, for chaincode deploys and upgrades, that the lifecycle writes are
//! consistent with the definition already committed to the ledger.  Each verdict is either
//! valid, invalid, or intermittent when the ledger could not be read.

#[macro_use]
extern crate log;

pub mod identity;
pub mod ledger;
#[allow(renamed_and_removed_lints)]
#[macro_use]
pub mod protos;
pub mod protocol;
pub mod validation;

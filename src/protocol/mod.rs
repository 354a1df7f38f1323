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

//! Structs for envelopes, endorsements, read-write sets, policies and chaincode definitions.
//!
//! Each struct converts to and from its protobuf message through the traits in
//! [`protos`](crate::protos).  Bytes that are signed are kept as bytes, so a struct decoded from
//! the wire can always be checked against the signatures over it.

pub mod chaincode;
pub mod collection;
pub mod envelope;
pub mod msp;
pub mod policy;
pub mod rwset;
pub mod transaction;

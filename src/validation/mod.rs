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

//! Endorsement and lifecycle validation of endorser transactions.

pub mod collection;
pub mod error;
pub mod extract;
pub mod lifecycle;
pub mod policy;
mod snapshot;
pub mod validator;

pub use self::collection::CollectionUpgradePolicy;
pub use self::error::{
    IntermittentReason, InvalidReason, Response, ValidationError, ValidationOutcome, ERROR,
    INTERMITTENT_ERROR, OK,
};
pub use self::policy::{CompiledPolicy, SignatureCache, SignedStatement};
pub use self::snapshot::LazySnapshot;
pub use self::validator::{
    ValidationRequest, Validator, ValidatorBuilder, ValidatorBuilderError, ValidatorConfig,
    DEFAULT_LIFECYCLE_NAMESPACE, DUPLICATED_IDENTITY_ERROR,
};

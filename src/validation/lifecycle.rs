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

//! Validation of chaincode deploys and upgrades issued through the lifecycle chaincode.
//!
//! A lifecycle invocation carries `[function, channel, deployment spec, policy, escc, vscc,
//! collection config]` as arguments.  Its writes to the lifecycle namespace must be exactly the
//! new chaincode definition under the chaincode's name, optionally followed by the collection
//! configuration, and must agree with the deployment spec.  The definition already on the
//! ledger decides whether the operation is allowed and which instantiation policy authorizes
//! it.

use std::fmt;

use crate::identity::IdentityProvider;
use crate::protocol::chaincode::{ChaincodeData, ChaincodeDeploymentSpec};
use crate::protocol::rwset::{KvWrite, TxReadWriteSet};
use crate::protos::FromBytes;

use super::collection::CollectionValidator;
use super::error::{InvalidReason, ValidationError};
use super::extract::ExtractedTransaction;
use super::policy::{CompiledPolicy, SignatureCache};
use super::snapshot::LazySnapshot;
use super::validator::ValidatorConfig;

const MIN_LIFECYCLE_ARGS: usize = 2;
const MAX_LIFECYCLE_ARGS: usize = 5;
const MAX_LIFECYCLE_ARGS_WITH_COLLECTIONS: usize = 6;
const COLLECTION_ARG_INDEX: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOperation {
    Deploy,
    Upgrade,
}

impl LifecycleOperation {
    /// Parses the function name of a lifecycle invocation.
    pub fn from_function(function: &[u8]) -> Option<LifecycleOperation> {
        match function {
            b"deploy" => Some(LifecycleOperation::Deploy),
            b"upgrade" => Some(LifecycleOperation::Upgrade),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LifecycleOperation::Deploy => f.write_str("deploy"),
            LifecycleOperation::Upgrade => f.write_str("upgrade"),
        }
    }
}

pub struct LifecycleValidator<'a> {
    config: &'a ValidatorConfig,
    provider: &'a dyn IdentityProvider,
    cache: &'a SignatureCache,
}

impl<'a> LifecycleValidator<'a> {
    pub fn new(
        config: &'a ValidatorConfig,
        provider: &'a dyn IdentityProvider,
        cache: &'a SignatureCache,
    ) -> Self {
        LifecycleValidator {
            config,
            provider,
            cache,
        }
    }

    pub fn validate(
        &self,
        transaction: &ExtractedTransaction,
        rwset: &TxReadWriteSet,
        state: &mut LazySnapshot,
    ) -> Result<(), ValidationError> {
        let args = transaction.args();
        let function = args.first().ok_or_else(|| {
            ValidationError::invalid(
                InvalidReason::MalformedTransaction,
                "lifecycle invocation has no arguments",
            )
        })?;
        let operation = LifecycleOperation::from_function(function).ok_or_else(|| {
            ValidationError::invalid(
                InvalidReason::InvalidLifecycleFunction,
                format!(
                    "VSCC error: committing an invocation of function {} of lscc is invalid",
                    String::from_utf8_lossy(function)
                ),
            )
        })?;

        let lifecycle_args = &args[1..];
        let max_args = if self.config.private_data() {
            MAX_LIFECYCLE_ARGS_WITH_COLLECTIONS
        } else {
            MAX_LIFECYCLE_ARGS
        };
        if lifecycle_args.len() < MIN_LIFECYCLE_ARGS || lifecycle_args.len() > max_args {
            return Err(ValidationError::invalid(
                InvalidReason::MalformedTransaction,
                format!(
                    "Wrong number of arguments for invocation lscc({}): expected between {} and {}, received {}",
                    operation,
                    MIN_LIFECYCLE_ARGS,
                    max_args,
                    lifecycle_args.len()
                ),
            ));
        }

        let deployment_spec =
            ChaincodeDeploymentSpec::from_bytes(&lifecycle_args[1]).map_err(|err| {
                ValidationError::invalid(
                    InvalidReason::MalformedTransaction,
                    format!("GetChaincodeDeploymentSpec error {}", err),
                )
            })?;
        let chaincode_id = match deployment_spec.chaincode_id() {
            Some(id) if !id.name().is_empty() => id,
            _ => {
                return Err(ValidationError::invalid(
                    InvalidReason::MalformedTransaction,
                    "VSCC error: invocation of lscc with an invalid deployment spec",
                ))
            }
        };

        let namespace = self.config.lifecycle_namespace();
        for ns_rwset in rwset.ns_rwsets() {
            if ns_rwset.namespace() != namespace
                && ns_rwset.namespace() != chaincode_id.name()
                && !ns_rwset.rwset().writes().is_empty()
            {
                return Err(ValidationError::invalid(
                    InvalidReason::UnexpectedWrite,
                    format!(
                        "LSCC invocation is attempting to write to namespace {}",
                        ns_rwset.namespace()
                    ),
                ));
            }
        }

        let writes = rwset
            .namespace(namespace)
            .ok_or_else(|| {
                ValidationError::invalid(
                    InvalidReason::MalformedTransaction,
                    "No read write set for lscc was found",
                )
            })?
            .rwset()
            .writes();
        if let Some(write) = writes.iter().find(|write| write.is_delete()) {
            return Err(ValidationError::invalid(
                InvalidReason::UnexpectedWrite,
                format!("LSCC may not delete key {} upon {}", write.key(), operation),
            ));
        }
        let definition_write = writes.first().ok_or_else(|| {
            ValidationError::invalid(
                InvalidReason::UnexpectedWrite,
                format!("LSCC must issue at least one putState upon {}", operation),
            )
        })?;
        if definition_write.key() != chaincode_id.name() {
            return Err(ValidationError::invalid(
                InvalidReason::UnexpectedWrite,
                format!(
                    "expected key {}, found {}",
                    chaincode_id.name(),
                    definition_write.key()
                ),
            ));
        }

        let definition = ChaincodeData::from_bytes(definition_write.value()).map_err(|err| {
            ValidationError::invalid(
                InvalidReason::MalformedTransaction,
                format!("unmarshalling of ChaincodeData failed, error {}", err),
            )
        })?;
        if definition.name() != chaincode_id.name() || definition.version() != chaincode_id.version()
        {
            return Err(ValidationError::invalid(
                InvalidReason::ArgMismatch,
                format!(
                    "expected cc {}:{}, found {}:{}",
                    chaincode_id.name(),
                    chaincode_id.version(),
                    definition.name(),
                    definition.version()
                ),
            ));
        }

        let existing = match state.get_state(namespace, chaincode_id.name())? {
            Some(bytes) => Some(ChaincodeData::from_bytes(&bytes).map_err(|err| {
                ValidationError::invalid(
                    InvalidReason::MalformedTransaction,
                    format!(
                        "definition of chaincode {} on the ledger does not decode: {}",
                        chaincode_id.name(),
                        err
                    ),
                )
            })?),
            None => None,
        };

        debug!(
            "Validating lscc {} of {}:{} on channel {}",
            operation,
            definition.name(),
            definition.version(),
            transaction.channel_id()
        );

        match operation {
            LifecycleOperation::Deploy => {
                if existing.is_some() {
                    return Err(ValidationError::invalid(
                        InvalidReason::ChaincodeExists,
                        format!("Chaincode {} is already instantiated", chaincode_id.name()),
                    ));
                }

                self.check_writes(operation, writes, &definition, lifecycle_args, state)?;
                self.check_instantiation_policy(
                    definition.instantiation_policy(),
                    transaction,
                    &definition,
                )
            }
            LifecycleOperation::Upgrade => {
                let existing = existing.ok_or_else(|| {
                    ValidationError::invalid(
                        InvalidReason::NoSuchChaincode,
                        format!("Upgrading non-existent chaincode {}", chaincode_id.name()),
                    )
                })?;
                if existing.version() == definition.version() {
                    return Err(ValidationError::invalid(
                        InvalidReason::VersionUnchanged,
                        format!(
                            "Existing version of the cc on the ledger ({}) should be different from the upgraded one",
                            definition.version()
                        ),
                    ));
                }

                self.check_writes(operation, writes, &definition, lifecycle_args, state)?;
                self.check_instantiation_policy(
                    existing.instantiation_policy(),
                    transaction,
                    &existing,
                )?;

                if self.config.require_new_instantiation_policy()
                    && definition.instantiation_policy() != existing.instantiation_policy()
                {
                    self.check_instantiation_policy(
                        definition.instantiation_policy(),
                        transaction,
                        &definition,
                    )?;
                }
                Ok(())
            }
        }
    }

    fn check_writes(
        &self,
        operation: LifecycleOperation,
        writes: &[KvWrite],
        definition: &ChaincodeData,
        lifecycle_args: &[Vec<u8>],
        state: &mut LazySnapshot,
    ) -> Result<(), ValidationError> {
        if self.config.private_data() {
            CollectionValidator::new(
                self.config.lifecycle_namespace(),
                self.config.collection_upgrade_policy(),
            )
            .validate(
                operation,
                writes,
                definition,
                lifecycle_args
                    .get(COLLECTION_ARG_INDEX)
                    .map(|arg| arg.as_slice()),
                state,
            )
        } else if writes.len() != 1 {
            Err(ValidationError::invalid(
                InvalidReason::UnexpectedWrite,
                format!(
                    "LSCC can only issue a single putState upon {}, got {} writes",
                    operation,
                    writes.len()
                ),
            ))
        } else {
            Ok(())
        }
    }

    /// The transaction creator must satisfy the instantiation policy of `definition`.
    fn check_instantiation_policy(
        &self,
        policy: &[u8],
        transaction: &ExtractedTransaction,
        definition: &ChaincodeData,
    ) -> Result<(), ValidationError> {
        if policy.is_empty() {
            return Err(ValidationError::invalid(
                InvalidReason::MalformedPolicy,
                format!(
                    "InstantiationPolicy missing for chaincode {}:{}",
                    definition.name(),
                    definition.version()
                ),
            ));
        }

        let policy = CompiledPolicy::from_bytes(policy)?;
        let evaluation = policy.evaluate_with_cache(
            std::slice::from_ref(transaction.creator()),
            self.provider,
            self.cache,
        );
        if evaluation.is_satisfied() {
            Ok(())
        } else {
            Err(ValidationError::invalid(
                InvalidReason::InstantiationPolicyNotSatisfied,
                format!(
                    "chaincode instantiation policy violated for {}:{}",
                    definition.name(),
                    definition.version()
                ),
            ))
        }
    }
}

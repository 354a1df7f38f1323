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

//! Validation of the private data collection configuration written by a deploy or upgrade.

use std::collections::HashSet;

use crate::protocol::chaincode::ChaincodeData;
use crate::protocol::collection::{collection_key, CollectionConfigPackage};
use crate::protocol::rwset::KvWrite;
use crate::protos::FromBytes;

use super::error::{InvalidReason, ValidationError};
use super::lifecycle::LifecycleOperation;
use super::policy::CompiledPolicy;
use super::snapshot::LazySnapshot;

/// How an upgrade may change the collections of a chaincode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionUpgradePolicy {
    /// The collection configuration may not change on upgrade.
    Forbid,
    /// New collections may be added; existing ones must be kept unchanged.
    AllowAdditions,
}

impl Default for CollectionUpgradePolicy {
    fn default() -> Self {
        CollectionUpgradePolicy::Forbid
    }
}

/// Checks the lifecycle writes of a deploy or upgrade against its collection configuration
/// argument and the configuration already on the ledger.
pub struct CollectionValidator<'a> {
    lifecycle_namespace: &'a str,
    upgrade_policy: CollectionUpgradePolicy,
}

impl<'a> CollectionValidator<'a> {
    pub fn new(lifecycle_namespace: &'a str, upgrade_policy: CollectionUpgradePolicy) -> Self {
        CollectionValidator {
            lifecycle_namespace,
            upgrade_policy,
        }
    }

    /// `writes` are the lifecycle namespace writes, the first of which is the definition.
    pub fn validate(
        &self,
        operation: LifecycleOperation,
        writes: &[KvWrite],
        definition: &ChaincodeData,
        collection_arg: Option<&[u8]>,
        state: &mut LazySnapshot,
    ) -> Result<(), ValidationError> {
        if writes.len() > 2 {
            return Err(ValidationError::invalid(
                InvalidReason::UnexpectedWrite,
                format!(
                    "LSCC can only issue one or two putState upon {}, got {} writes",
                    operation,
                    writes.len()
                ),
            ));
        }

        let key = collection_key(definition.name());
        let collection_write = match writes.get(1) {
            Some(write) if write.key() != key => {
                return Err(ValidationError::invalid(
                    InvalidReason::UnexpectedWrite,
                    format!(
                        "invalid key for the collection of chaincode {}:{}; expected '{}', received '{}'",
                        definition.name(),
                        definition.version(),
                        key,
                        write.key()
                    ),
                ))
            }
            Some(write) if write.is_delete() => {
                return Err(ValidationError::invalid(
                    InvalidReason::UnexpectedWrite,
                    format!(
                        "LSCC may not delete the collection of chaincode {}:{}",
                        definition.name(),
                        definition.version()
                    ),
                ))
            }
            Some(write) => write.value(),
            None => &[][..],
        };

        let collection_arg = collection_arg.unwrap_or(&[]);
        if collection_arg != collection_write {
            return Err(ValidationError::invalid(
                InvalidReason::ArgMismatch,
                format!(
                    "collection configuration arguments supplied for chaincode {}:{} do not match the configuration in the lscc writeset",
                    definition.name(),
                    definition.version()
                ),
            ));
        }

        let prior = state.get_state(self.lifecycle_namespace, &key)?;

        if operation == LifecycleOperation::Deploy && prior.is_some() {
            return Err(existing_collection(definition));
        }
        if collection_write.is_empty() {
            return Ok(());
        }

        let package = CollectionConfigPackage::from_bytes(collection_write).map_err(|err| {
            ValidationError::invalid(
                InvalidReason::MalformedCollectionConfig,
                format!("invalid collection configuration supplied: {}", err),
            )
        })?;

        let prior_package = match prior {
            Some(bytes) => Some(CollectionConfigPackage::from_bytes(&bytes).map_err(|err| {
                ValidationError::invalid(
                    InvalidReason::MalformedCollectionConfig,
                    format!("collection configuration on the ledger does not decode: {}", err),
                )
            })?),
            None => None,
        };

        check_package(
            &package,
            prior_package.as_ref(),
            operation,
            self.upgrade_policy,
        )
    }
}

/// Checks that `package` is well formed and, given the configuration already committed for
/// the chaincode, that `operation` may install it.
pub fn check_package(
    package: &CollectionConfigPackage,
    prior: Option<&CollectionConfigPackage>,
    operation: LifecycleOperation,
    upgrade_policy: CollectionUpgradePolicy,
) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for config in package.configs() {
        if config.name().is_empty() {
            return Err(malformed_collection("collection name must not be empty"));
        }
        if !names.insert(config.name()) {
            return Err(ValidationError::invalid(
                InvalidReason::DuplicateCollectionName,
                format!("collection {} is defined more than once", config.name()),
            ));
        }

        let policy = config.member_orgs_policy().ok_or_else(|| {
            malformed_collection(&format!(
                "collection {} has no member orgs policy",
                config.name()
            ))
        })?;
        CompiledPolicy::compile(policy).map_err(|err| {
            malformed_collection(&format!(
                "member orgs policy of collection {} is invalid: {}",
                config.name(),
                err.message()
            ))
        })?;

        if config.required_peer_count() < 0 {
            return Err(malformed_collection(&format!(
                "collection {} requires a negative number of peers",
                config.name()
            )));
        }
        if config.maximum_peer_count() < config.required_peer_count() {
            return Err(malformed_collection(&format!(
                "collection {} has maximum peer count {} below required peer count {}",
                config.name(),
                config.maximum_peer_count(),
                config.required_peer_count()
            )));
        }
    }

    match operation {
        LifecycleOperation::Deploy => match prior {
            None => Ok(()),
            Some(_) => Err(ValidationError::invalid(
                InvalidReason::ForbiddenCollectionUpdate,
                "collection data should not exist for a chaincode being deployed",
            )),
        },
        LifecycleOperation::Upgrade => match upgrade_policy {
            CollectionUpgradePolicy::Forbid => {
                if prior == Some(package) {
                    Ok(())
                } else {
                    Err(ValidationError::invalid(
                        InvalidReason::ForbiddenCollectionUpdate,
                        "collection configuration may not be changed on upgrade",
                    ))
                }
            }
            CollectionUpgradePolicy::AllowAdditions => {
                for existing in prior.map(|prior| prior.configs()).unwrap_or_default() {
                    if package.get(existing.name()) != Some(existing) {
                        return Err(ValidationError::invalid(
                            InvalidReason::ForbiddenCollectionUpdate,
                            format!(
                                "existing collection {} was removed or modified on upgrade",
                                existing.name()
                            ),
                        ));
                    }
                }
                Ok(())
            }
        },
    }
}

fn malformed_collection(message: &str) -> ValidationError {
    ValidationError::invalid(InvalidReason::MalformedCollectionConfig, message)
}

fn existing_collection(definition: &ChaincodeData) -> ValidationError {
    ValidationError::invalid(
        InvalidReason::ForbiddenCollectionUpdate,
        format!(
            "collection data should not exist for chaincode {}:{}",
            definition.name(),
            definition.version()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ledger::{FailureMode, HashMapLedger};
    use crate::protocol::chaincode::ChaincodeDataBuilder;
    use crate::protocol::collection::StaticCollectionConfigBuilder;
    use crate::protocol::policy::SignaturePolicyEnvelope;
    use crate::protocol::rwset::{TxReadWriteSet, TxReadWriteSetBuilder};
    use crate::protos::IntoBytes;

    const CHANNEL: &str = "testchannel";

    fn collection(name: &str) -> StaticCollectionConfigBuilder {
        StaticCollectionConfigBuilder::new()
            .with_name(name.into())
            .with_member_orgs_policy(SignaturePolicyEnvelope::signed_by_member("Org1MSP"))
            .with_required_peer_count(1)
            .with_maximum_peer_count(2)
    }

    fn package(names: &[&str]) -> CollectionConfigPackage {
        CollectionConfigPackage::new(names.iter().map(|name| collection(name).build()).collect())
    }

    fn definition() -> ChaincodeData {
        ChaincodeDataBuilder::new()
            .with_name("mycc".into())
            .with_version("1".into())
            .build()
            .unwrap()
    }

    fn writes(collection: Option<Vec<u8>>) -> TxReadWriteSet {
        let builder =
            TxReadWriteSetBuilder::new().with_write("lscc", "mycc", b"definition".to_vec());
        let builder = match collection {
            Some(bytes) => builder.with_write("lscc", "mycc~collection", bytes),
            None => builder,
        };
        builder.build()
    }

    fn validate(
        ledger: &HashMapLedger,
        operation: LifecycleOperation,
        upgrade_policy: CollectionUpgradePolicy,
        rwset: &TxReadWriteSet,
        collection_arg: Option<&[u8]>,
    ) -> Result<(), ValidationError> {
        let mut state = LazySnapshot::new(ledger, CHANNEL);
        CollectionValidator::new("lscc", upgrade_policy).validate(
            operation,
            rwset.namespace("lscc").unwrap().rwset().writes(),
            &definition(),
            collection_arg,
            &mut state,
        )
    }

    fn reason(result: Result<(), ValidationError>) -> Option<InvalidReason> {
        result.unwrap_err().invalid_reason()
    }

    #[test]
    fn deploy_with_collection() {
        let ledger = HashMapLedger::new();
        let bytes = package(&["mycollection"]).into_bytes().unwrap();

        assert!(validate(
            &ledger,
            LifecycleOperation::Deploy,
            CollectionUpgradePolicy::Forbid,
            &writes(Some(bytes.clone())),
            Some(&bytes),
        )
        .is_ok());
    }

    #[test]
    fn collection_delete_is_rejected() {
        let ledger = HashMapLedger::new();
        let rwset = TxReadWriteSetBuilder::new()
            .with_write("lscc", "mycc", b"definition".to_vec())
            .with_delete("lscc", "mycc~collection")
            .build();

        assert_eq!(
            Some(InvalidReason::UnexpectedWrite),
            reason(validate(
                &ledger,
                LifecycleOperation::Upgrade,
                CollectionUpgradePolicy::AllowAdditions,
                &rwset,
                None,
            ))
        );
    }

    #[test]
    // an absent argument and an empty collection write are equivalent
    fn deploy_without_collection() {
        let ledger = HashMapLedger::new();

        assert!(validate(
            &ledger,
            LifecycleOperation::Deploy,
            CollectionUpgradePolicy::Forbid,
            &writes(None),
            None,
        )
        .is_ok());
        assert!(validate(
            &ledger,
            LifecycleOperation::Deploy,
            CollectionUpgradePolicy::Forbid,
            &writes(Some(vec![])),
            Some(&[]),
        )
        .is_ok());
    }

    #[test]
    fn argument_must_match_write() {
        let ledger = HashMapLedger::new();
        let written = package(&["mycollection"]).into_bytes().unwrap();
        let supplied = package(&["othercollection"]).into_bytes().unwrap();

        assert_eq!(
            Some(InvalidReason::ArgMismatch),
            reason(validate(
                &ledger,
                LifecycleOperation::Deploy,
                CollectionUpgradePolicy::Forbid,
                &writes(Some(written.clone())),
                Some(&supplied),
            ))
        );
        assert_eq!(
            Some(InvalidReason::ArgMismatch),
            reason(validate(
                &ledger,
                LifecycleOperation::Deploy,
                CollectionUpgradePolicy::Forbid,
                &writes(Some(written)),
                None,
            ))
        );
    }

    #[test]
    fn reject_bad_writes() {
        let ledger = HashMapLedger::new();
        let bytes = package(&["mycollection"]).into_bytes().unwrap();

        let wrong_key = TxReadWriteSetBuilder::new()
            .with_write("lscc", "mycc", b"definition".to_vec())
            .with_write("lscc", "mycc~collections", bytes.clone())
            .build();
        assert_eq!(
            Some(InvalidReason::UnexpectedWrite),
            reason(validate(
                &ledger,
                LifecycleOperation::Deploy,
                CollectionUpgradePolicy::Forbid,
                &wrong_key,
                Some(&bytes),
            ))
        );

        let too_many = TxReadWriteSetBuilder::new()
            .with_write("lscc", "mycc", b"definition".to_vec())
            .with_write("lscc", "mycc~collection", bytes.clone())
            .with_write("lscc", "a", b"b".to_vec())
            .build();
        assert_eq!(
            Some(InvalidReason::UnexpectedWrite),
            reason(validate(
                &ledger,
                LifecycleOperation::Deploy,
                CollectionUpgradePolicy::Forbid,
                &too_many,
                Some(&bytes),
            ))
        );
    }

    #[test]
    fn reject_undecodable_collection() {
        let ledger = HashMapLedger::new();

        assert_eq!(
            Some(InvalidReason::MalformedCollectionConfig),
            reason(validate(
                &ledger,
                LifecycleOperation::Deploy,
                CollectionUpgradePolicy::Forbid,
                &writes(Some(b"barf".to_vec())),
                Some(b"barf"),
            ))
        );
    }

    #[test]
    // a deploy may not overwrite a collection configuration already on the ledger
    fn deploy_over_existing_collection() {
        let ledger = HashMapLedger::new();
        let bytes = package(&["mycollection"]).into_bytes().unwrap();
        ledger
            .put_state(CHANNEL, "lscc", "mycc~collection", bytes.clone())
            .unwrap();

        for collection in vec![Some(bytes), None] {
            let arg = collection.clone();
            assert_eq!(
                Some(InvalidReason::ForbiddenCollectionUpdate),
                reason(validate(
                    &ledger,
                    LifecycleOperation::Deploy,
                    CollectionUpgradePolicy::Forbid,
                    &writes(collection),
                    arg.as_deref(),
                ))
            );
        }
    }

    #[test]
    fn upgrade_rules() {
        let ledger = HashMapLedger::new();
        let prior = package(&["mycollection"]).into_bytes().unwrap();
        let extended = package(&["mycollection", "newcollection"])
            .into_bytes()
            .unwrap();
        let replaced = package(&["newcollection"]).into_bytes().unwrap();
        ledger
            .put_state(CHANNEL, "lscc", "mycc~collection", prior.clone())
            .unwrap();

        let upgrade = |policy, bytes: &Vec<u8>| {
            validate(
                &ledger,
                LifecycleOperation::Upgrade,
                policy,
                &writes(Some(bytes.clone())),
                Some(bytes),
            )
        };

        assert!(upgrade(CollectionUpgradePolicy::Forbid, &prior).is_ok());
        assert_eq!(
            Some(InvalidReason::ForbiddenCollectionUpdate),
            reason(upgrade(CollectionUpgradePolicy::Forbid, &extended))
        );

        assert!(upgrade(CollectionUpgradePolicy::AllowAdditions, &prior).is_ok());
        assert!(upgrade(CollectionUpgradePolicy::AllowAdditions, &extended).is_ok());
        assert_eq!(
            Some(InvalidReason::ForbiddenCollectionUpdate),
            reason(upgrade(CollectionUpgradePolicy::AllowAdditions, &replaced))
        );

        // upgrades without a collection write leave the configuration alone
        assert!(validate(
            &ledger,
            LifecycleOperation::Upgrade,
            CollectionUpgradePolicy::Forbid,
            &writes(None),
            None,
        )
        .is_ok());
    }

    #[test]
    fn ledger_failure_is_intermittent() {
        let ledger = HashMapLedger::new();
        ledger.set_failure_mode(FailureMode::QueryTimeout).unwrap();

        let err = validate(
            &ledger,
            LifecycleOperation::Deploy,
            CollectionUpgradePolicy::Forbid,
            &writes(None),
            None,
        )
        .unwrap_err();
        assert!(err.is_intermittent());
    }

    #[test]
    fn check_package_contents() {
        let check = |package: &CollectionConfigPackage| {
            check_package(
                package,
                None,
                LifecycleOperation::Deploy,
                CollectionUpgradePolicy::Forbid,
            )
            .map_err(|err| err.invalid_reason())
        };

        assert_eq!(Ok(()), check(&package(&["a", "b"])));
        assert_eq!(Ok(()), check(&CollectionConfigPackage::new(vec![])));

        assert_eq!(
            Err(Some(InvalidReason::DuplicateCollectionName)),
            check(&package(&["a", "a"]))
        );
        assert_eq!(
            Err(Some(InvalidReason::MalformedCollectionConfig)),
            check(&package(&[""]))
        );
        assert_eq!(
            Err(Some(InvalidReason::MalformedCollectionConfig)),
            check(&CollectionConfigPackage::new(vec![StaticCollectionConfigBuilder::new()
                .with_name("a".into())
                .build()]))
        );
        assert_eq!(
            Err(Some(InvalidReason::MalformedCollectionConfig)),
            check(&CollectionConfigPackage::new(vec![collection("a")
                .with_member_orgs_policy(
                    SignaturePolicyEnvelope::signed_by_member("Org1MSP")
                        .into_builder()
                        .with_identities(vec![])
                        .build()
                )
                .build()]))
        );
        assert_eq!(
            Err(Some(InvalidReason::MalformedCollectionConfig)),
            check(&CollectionConfigPackage::new(vec![collection("a")
                .with_required_peer_count(-1)
                .build()]))
        );
        assert_eq!(
            Err(Some(InvalidReason::MalformedCollectionConfig)),
            check(&CollectionConfigPackage::new(vec![collection("a")
                .with_required_peer_count(3)
                .with_maximum_peer_count(2)
                .build()]))
        );
    }
}

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

//! The validation entry points.
//!
//! A `Validator` is assembled from an identity provider, a ledger provider and a
//! `ValidatorConfig` by a `ValidatorBuilder`.  It validates one transaction at a time through
//! `validate` or the positional `invoke`, or a batch of independent transactions on a bounded
//! pool of worker threads through `validate_all`.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::identity::IdentityProvider;
use crate::ledger::LedgerProvider;

use super::collection::CollectionUpgradePolicy;
use super::error::{InvalidReason, Response, ValidationError, ValidationOutcome};
use super::extract::extract;
use super::lifecycle::LifecycleValidator;
use super::policy::{CompiledPolicy, SignatureCache};
use super::snapshot::LazySnapshot;

pub const DEFAULT_LIFECYCLE_NAMESPACE: &str = "lscc";

/// Reported when endorsements fail the policy after statements by an already seen identity
/// were discarded.
pub const DUPLICATED_IDENTITY_ERROR: &str =
    "Endorsement policy evaluation failure might be caused by duplicated identities";

const INVOKE_ARGS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    lifecycle_namespace: String,
    private_data: bool,
    require_new_instantiation_policy: bool,
    collection_upgrade_policy: CollectionUpgradePolicy,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            lifecycle_namespace: DEFAULT_LIFECYCLE_NAMESPACE.into(),
            private_data: true,
            require_new_instantiation_policy: true,
            collection_upgrade_policy: CollectionUpgradePolicy::default(),
        }
    }
}

impl ValidatorConfig {
    /// The namespace of the lifecycle chaincode, whose invocations get the deploy and upgrade
    /// checks.
    pub fn lifecycle_namespace(&self) -> &str {
        &self.lifecycle_namespace
    }

    /// Whether lifecycle invocations may carry a collection configuration.
    pub fn private_data(&self) -> bool {
        self.private_data
    }

    /// Whether an upgrade that changes the instantiation policy must also satisfy the new one.
    pub fn require_new_instantiation_policy(&self) -> bool {
        self.require_new_instantiation_policy
    }

    pub fn collection_upgrade_policy(&self) -> CollectionUpgradePolicy {
        self.collection_upgrade_policy
    }
}

#[derive(Debug, PartialEq)]
pub enum ValidatorBuilderError {
    MissingField(String),
    InvalidConfig(String),
}

impl Error for ValidatorBuilderError {}

impl fmt::Display for ValidatorBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidatorBuilderError::MissingField(ref s) => {
                write!(f, "unable to build validator, missing field: {}", s)
            }
            ValidatorBuilderError::InvalidConfig(ref s) => {
                write!(f, "unable to build validator, invalid config: {}", s)
            }
        }
    }
}

#[derive(Default)]
pub struct ValidatorBuilder {
    identity_provider: Option<Arc<dyn IdentityProvider>>,
    ledger_provider: Option<Arc<dyn LedgerProvider>>,
    config: ValidatorConfig,
    signature_cache_capacity: Option<usize>,
}

impl ValidatorBuilder {
    pub fn new() -> Self {
        ValidatorBuilder::default()
    }

    pub fn with_identity_provider(
        mut self,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> ValidatorBuilder {
        self.identity_provider = Some(identity_provider);
        self
    }

    pub fn with_ledger_provider(
        mut self,
        ledger_provider: Arc<dyn LedgerProvider>,
    ) -> ValidatorBuilder {
        self.ledger_provider = Some(ledger_provider);
        self
    }

    pub fn with_lifecycle_namespace(mut self, namespace: String) -> ValidatorBuilder {
        self.config.lifecycle_namespace = namespace;
        self
    }

    pub fn with_private_data(mut self, enabled: bool) -> ValidatorBuilder {
        self.config.private_data = enabled;
        self
    }

    pub fn with_new_instantiation_policy_check(mut self, enabled: bool) -> ValidatorBuilder {
        self.config.require_new_instantiation_policy = enabled;
        self
    }

    pub fn with_collection_upgrade_policy(
        mut self,
        policy: CollectionUpgradePolicy,
    ) -> ValidatorBuilder {
        self.config.collection_upgrade_policy = policy;
        self
    }

    pub fn with_signature_cache_capacity(mut self, capacity: usize) -> ValidatorBuilder {
        self.signature_cache_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<Validator, ValidatorBuilderError> {
        let identity = self.identity_provider.ok_or_else(|| {
            ValidatorBuilderError::MissingField("'identity_provider' field is required".into())
        })?;
        let ledger = self.ledger_provider.ok_or_else(|| {
            ValidatorBuilderError::MissingField("'ledger_provider' field is required".into())
        })?;

        if self.config.lifecycle_namespace.is_empty() {
            return Err(ValidatorBuilderError::InvalidConfig(
                "lifecycle namespace must not be empty".into(),
            ));
        }

        let cache = match self.signature_cache_capacity {
            Some(0) => {
                return Err(ValidatorBuilderError::InvalidConfig(
                    "signature cache capacity must be positive".into(),
                ))
            }
            Some(capacity) => SignatureCache::with_capacity(capacity),
            None => SignatureCache::new(),
        };

        Ok(Validator {
            identity,
            ledger,
            config: self.config,
            cache,
        })
    }
}

/// One transaction of a batch passed to `Validator::validate_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    envelope: Vec<u8>,
    policy: Vec<u8>,
    channel_id: String,
}

impl ValidationRequest {
    pub fn new(envelope: Vec<u8>, policy: Vec<u8>, channel_id: &str) -> Self {
        ValidationRequest {
            envelope,
            policy,
            channel_id: channel_id.into(),
        }
    }

    pub fn envelope(&self) -> &[u8] {
        &self.envelope
    }

    pub fn policy(&self) -> &[u8] {
        &self.policy
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

pub struct Validator {
    identity: Arc<dyn IdentityProvider>,
    ledger: Arc<dyn LedgerProvider>,
    config: ValidatorConfig,
    cache: SignatureCache,
}

impl Validator {
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validates a transaction given positional arguments
    /// `[validation parameter, envelope, endorsement policy]`.
    ///
    /// The channel is taken from the transaction itself.
    pub fn invoke(&self, args: &[Vec<u8>]) -> Response {
        if args.len() < INVOKE_ARGS {
            return Response::error("Incorrect number of arguments");
        }
        if args.len() > INVOKE_ARGS {
            return Response::error(format!(
                "Incorrect number of arguments: expected {}, got {}",
                INVOKE_ARGS,
                args.len()
            ));
        }
        if args[0].is_empty() {
            return Response::error("No validation parameter supplied");
        }
        if args[1].is_empty() {
            return Response::error("No block to validate");
        }
        if args[2].is_empty() {
            return Response::error("No policy supplied");
        }

        let outcome: ValidationOutcome = self.check(&args[1], &args[2], None).into();
        self.log_outcome(&outcome);
        outcome.into()
    }

    /// Validates the endorsements of a transaction against `policy`, and, for invocations of
    /// the lifecycle chaincode, the deploy or upgrade it performs.
    pub fn validate(&self, envelope: &[u8], policy: &[u8], channel_id: &str) -> ValidationOutcome {
        let outcome: ValidationOutcome = self.check(envelope, policy, Some(channel_id)).into();
        self.log_outcome(&outcome);
        outcome
    }

    /// Validates independent transactions on up to `workers` threads.  Outcomes are returned
    /// in the order of `requests`.
    pub fn validate_all(
        &self,
        requests: &[ValidationRequest],
        workers: usize,
    ) -> Vec<ValidationOutcome> {
        let workers = workers.max(1).min(requests.len());
        if workers <= 1 {
            return requests
                .iter()
                .map(|request| self.validate_request(request))
                .collect();
        }

        let next = AtomicUsize::new(0);
        let (sender, receiver) = mpsc::channel();

        thread::scope(|scope| {
            for worker in 0..workers {
                let sender = sender.clone();
                let next = &next;
                let spawned = thread::Builder::new()
                    .name(format!("Thread-Validator-{}", worker))
                    .spawn_scoped(scope, move || loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let request = match requests.get(index) {
                            Some(request) => request,
                            None => break,
                        };
                        if sender.send((index, self.validate_request(request))).is_err() {
                            break;
                        }
                    });
                if let Err(err) = spawned {
                    error!("Unable to start validation worker {}: {}", worker, err);
                }
            }
        });
        drop(sender);

        let mut outcomes: Vec<Option<ValidationOutcome>> = vec![None; requests.len()];
        for (index, outcome) in receiver {
            outcomes[index] = Some(outcome);
        }

        // Requests no worker got to, if workers could not be started.
        outcomes
            .into_iter()
            .zip(requests)
            .map(|(outcome, request)| outcome.unwrap_or_else(|| self.validate_request(request)))
            .collect()
    }

    fn validate_request(&self, request: &ValidationRequest) -> ValidationOutcome {
        self.validate(request.envelope(), request.policy(), request.channel_id())
    }

    fn check(
        &self,
        envelope: &[u8],
        policy: &[u8],
        channel_id: Option<&str>,
    ) -> Result<(), ValidationError> {
        let transaction = extract(envelope)?;

        if let Some(channel_id) = channel_id {
            if transaction.channel_id() != channel_id {
                return Err(ValidationError::invalid(
                    InvalidReason::MalformedTransaction,
                    format!(
                        "transaction is for channel {}, expected {}",
                        transaction.channel_id(),
                        channel_id
                    ),
                ));
            }
        }

        let policy = CompiledPolicy::from_bytes(policy)?;
        let evaluation =
            policy.evaluate_with_cache(transaction.endorsements(), &*self.identity, &self.cache);
        if !evaluation.is_satisfied() {
            if evaluation.duplicates_removed() {
                return Err(ValidationError::invalid(
                    InvalidReason::DuplicateIdentityUse,
                    DUPLICATED_IDENTITY_ERROR,
                ));
            }
            return Err(ValidationError::invalid(
                InvalidReason::PolicyNotSatisfied,
                format!(
                    "VSCC error: endorsement policy failure for transaction {}",
                    transaction.channel_header().tx_id()
                ),
            ));
        }

        let namespace = self.config.lifecycle_namespace();
        let rwset = transaction.read_write_set()?;
        if transaction.chaincode_id().name() == namespace {
            let mut state = LazySnapshot::new(&*self.ledger, transaction.channel_id());
            LifecycleValidator::new(&self.config, &*self.identity, &self.cache).validate(
                &transaction,
                &rwset,
                &mut state,
            )
        } else {
            let writes_lifecycle = rwset
                .namespace(namespace)
                .map(|ns_rwset| !ns_rwset.rwset().writes().is_empty())
                .unwrap_or(false);
            if writes_lifecycle {
                return Err(ValidationError::invalid(
                    InvalidReason::UnexpectedWrite,
                    format!(
                        "chaincode {} may not write to the {} namespace",
                        transaction.chaincode_id().name(),
                        namespace
                    ),
                ));
            }
            Ok(())
        }
    }

    fn log_outcome(&self, outcome: &ValidationOutcome) {
        match outcome {
            ValidationOutcome::Valid => debug!("Transaction is valid"),
            ValidationOutcome::Invalid(reason, message) => {
                warn!("Transaction is invalid ({}): {}", reason, message)
            }
            ValidationOutcome::Intermittent(reason, message) => {
                error!("Unable to validate transaction ({}): {}", reason, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identity::MspManager;
    use crate::ledger::HashMapLedger;

    #[test]
    fn default_config() {
        let config = ValidatorConfig::default();
        assert_eq!("lscc", config.lifecycle_namespace());
        assert!(config.private_data());
        assert!(config.require_new_instantiation_policy());
        assert_eq!(
            CollectionUpgradePolicy::Forbid,
            config.collection_upgrade_policy()
        );
    }

    #[test]
    fn builder_requires_providers() {
        let identity: Arc<dyn IdentityProvider> = Arc::new(MspManager::new(vec![]));
        let ledger: Arc<dyn LedgerProvider> = Arc::new(HashMapLedger::new());

        match ValidatorBuilder::new()
            .with_ledger_provider(ledger.clone())
            .build()
        {
            Err(ValidatorBuilderError::MissingField(_)) => (),
            _ => panic!("expected a missing identity provider"),
        }
        match ValidatorBuilder::new()
            .with_identity_provider(identity.clone())
            .build()
        {
            Err(ValidatorBuilderError::MissingField(_)) => (),
            _ => panic!("expected a missing ledger provider"),
        }
        match ValidatorBuilder::new()
            .with_identity_provider(identity.clone())
            .with_ledger_provider(ledger.clone())
            .with_lifecycle_namespace(String::new())
            .build()
        {
            Err(ValidatorBuilderError::InvalidConfig(_)) => (),
            _ => panic!("expected an invalid lifecycle namespace"),
        }
        match ValidatorBuilder::new()
            .with_identity_provider(identity.clone())
            .with_ledger_provider(ledger.clone())
            .with_signature_cache_capacity(0)
            .build()
        {
            Err(ValidatorBuilderError::InvalidConfig(_)) => (),
            _ => panic!("expected an invalid cache capacity"),
        }

        let validator = ValidatorBuilder::new()
            .with_identity_provider(identity)
            .with_ledger_provider(ledger)
            .with_private_data(false)
            .with_new_instantiation_policy_check(false)
            .with_collection_upgrade_policy(CollectionUpgradePolicy::AllowAdditions)
            .build()
            .unwrap();
        assert!(!validator.config().private_data());
        assert!(!validator.config().require_new_instantiation_policy());
        assert_eq!(
            CollectionUpgradePolicy::AllowAdditions,
            validator.config().collection_upgrade_policy()
        );
    }

    #[test]
    fn validator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Validator>();
    }
}

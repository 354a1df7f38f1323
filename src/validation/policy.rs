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

//! Signature policy evaluation.
//!
//! A policy is compiled once into a tree of [`Node`]s whose leaves hold resolved principals,
//! then evaluated against a set of signed statements.  Statements are deduplicated by
//! identity and their signatures verified before the tree is walked; the walk itself only
//! asks the identity provider about membership.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::identity::IdentityProvider;
use crate::protocol::msp::{Principal, SerializedIdentity};
use crate::protocol::policy::{SignaturePolicy, SignaturePolicyEnvelope};
use crate::protos::FromBytes;

use super::error::{InvalidReason, ValidationError};

const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// One signature: the serialized identity of the signer, the signed bytes and the signature.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedStatement {
    identity: Vec<u8>,
    data: Vec<u8>,
    signature: Vec<u8>,
}

impl SignedStatement {
    pub fn new(identity: Vec<u8>, data: Vec<u8>, signature: Vec<u8>) -> Self {
        SignedStatement {
            identity,
            data,
            signature,
        }
    }

    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    fn cache_key(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        for field in &[&self.identity, &self.data, &self.signature] {
            hasher.update(&(field.len() as u64).to_be_bytes());
            hasher.update(field);
        }
        hasher.finalize().to_vec()
    }
}

impl std::fmt::Debug for SignedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "SignedStatement {{ identity: {:?}, data: {} bytes, signature: {:?} }}",
            hex::encode(&self.identity),
            self.data.len(),
            hex::encode(&self.signature)
        )
    }
}

/// Remembers signature verification results, keyed by a digest of the statement.
///
/// The cache is cleared once it holds `capacity` results.
pub struct SignatureCache {
    results: Mutex<HashMap<Vec<u8>, bool>>,
    capacity: usize,
}

impl Default for SignatureCache {
    fn default() -> Self {
        SignatureCache::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl SignatureCache {
    pub fn new() -> Self {
        SignatureCache::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SignatureCache {
            results: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.results.lock().map(|results| results.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn verify(
        &self,
        statement: &SignedStatement,
        identity: &SerializedIdentity,
        provider: &dyn IdentityProvider,
    ) -> bool {
        let key = statement.cache_key();
        if let Ok(results) = self.results.lock() {
            if let Some(valid) = results.get(&key) {
                return *valid;
            }
        }

        let valid = provider.verify(identity, &statement.data, &statement.signature);

        if let Ok(mut results) = self.results.lock() {
            if results.len() >= self.capacity {
                results.clear();
            }
            results.insert(key, valid);
        }
        valid
    }
}

/// The outcome of evaluating a policy against a set of statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    satisfied: bool,
    duplicates_removed: bool,
}

impl Evaluation {
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// True if statements were dropped because their identity had already signed.
    pub fn duplicates_removed(&self) -> bool {
        self.duplicates_removed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    SignedBy(Principal),
    NOutOf { n: usize, children: Vec<Node> },
}

/// A signature policy checked for well-formedness and ready to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPolicy {
    root: Node,
}

impl CompiledPolicy {
    /// Compiles a policy envelope.
    ///
    /// Fails with `MalformedPolicy` if the envelope has no rule, a leaf refers to an identity
    /// the envelope does not carry, or a combinator requires a negative number of rules.
    pub fn compile(envelope: &SignaturePolicyEnvelope) -> Result<CompiledPolicy, ValidationError> {
        let rule = envelope.rule().ok_or_else(|| {
            ValidationError::invalid(InvalidReason::MalformedPolicy, "policy has no rule")
        })?;
        Ok(CompiledPolicy {
            root: compile_node(rule, envelope.identities())?,
        })
    }

    /// Decodes and compiles a serialized `SignaturePolicyEnvelope`.
    pub fn from_bytes(bytes: &[u8]) -> Result<CompiledPolicy, ValidationError> {
        let envelope = SignaturePolicyEnvelope::from_bytes(bytes).map_err(|err| {
            ValidationError::invalid(
                InvalidReason::MalformedPolicy,
                format!("could not unmarshal signature policy envelope: {}", err),
            )
        })?;
        CompiledPolicy::compile(&envelope)
    }

    /// Returns true if the statements satisfy the policy.
    pub fn evaluate(&self, statements: &[SignedStatement], provider: &dyn IdentityProvider) -> bool {
        self.evaluate_with_cache(statements, provider, &SignatureCache::with_capacity(statements.len()))
            .is_satisfied()
    }

    /// Evaluates the policy, consulting and filling `cache` for signature checks.
    pub fn evaluate_with_cache(
        &self,
        statements: &[SignedStatement],
        provider: &dyn IdentityProvider,
        cache: &SignatureCache,
    ) -> Evaluation {
        let mut seen = HashSet::new();
        let mut duplicates_removed = false;
        let mut identities = Vec::with_capacity(statements.len());

        for statement in statements {
            let identity = match SerializedIdentity::from_bytes(&statement.identity) {
                Ok(identity) => identity,
                Err(err) => {
                    warn!("Discarding statement with undecodable identity: {}", err);
                    continue;
                }
            };
            if !seen.insert(identity.clone()) {
                debug!("Discarding duplicate statement by {:?}", identity);
                duplicates_removed = true;
                continue;
            }
            if !cache.verify(statement, &identity, provider) {
                warn!("Discarding statement with invalid signature by {:?}", identity);
                continue;
            }
            identities.push(identity);
        }

        let mut used = vec![false; identities.len()];
        let satisfied = evaluate_node(&self.root, &identities, &mut used, provider);
        debug!(
            "Policy evaluated over {} verified identities: satisfied={}",
            identities.len(),
            satisfied
        );

        Evaluation {
            satisfied,
            duplicates_removed,
        }
    }
}

fn compile_node(
    policy: &SignaturePolicy,
    identities: &[Principal],
) -> Result<Node, ValidationError> {
    match policy {
        SignaturePolicy::SignedBy(index) => {
            let principal = usize_from(*index)
                .and_then(|index| identities.get(index))
                .ok_or_else(|| {
                    ValidationError::invalid(
                        InvalidReason::MalformedPolicy,
                        format!(
                            "identity index {} out of range, policy has {} identities",
                            index,
                            identities.len()
                        ),
                    )
                })?;
            Ok(Node::SignedBy(principal.clone()))
        }
        SignaturePolicy::NOutOf { n, rules } => {
            let n = usize_from(*n).ok_or_else(|| {
                ValidationError::invalid(
                    InvalidReason::MalformedPolicy,
                    format!("n out of {} must not be negative", n),
                )
            })?;
            Ok(Node::NOutOf {
                n,
                children: rules
                    .iter()
                    .map(|rule| compile_node(rule, identities))
                    .collect::<Result<_, _>>()?,
            })
        }
    }
}

fn usize_from(value: i32) -> Option<usize> {
    if value < 0 {
        None
    } else {
        Some(value as usize)
    }
}

// `used` marks identities already assigned to a leaf; a child of an n-out-of works on a copy
// which is kept only if the child is satisfied.
fn evaluate_node(
    node: &Node,
    identities: &[SerializedIdentity],
    used: &mut Vec<bool>,
    provider: &dyn IdentityProvider,
) -> bool {
    match node {
        Node::SignedBy(principal) => {
            for (i, identity) in identities.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if provider.is_member(identity, principal) {
                    used[i] = true;
                    return true;
                }
            }
            false
        }
        Node::NOutOf { n, children } => {
            let mut satisfied = 0;
            for child in children {
                if satisfied >= *n {
                    break;
                }
                let mut attempt = used.clone();
                if evaluate_node(child, identities, &mut attempt, provider) {
                    satisfied += 1;
                    *used = attempt;
                }
            }
            satisfied >= *n
        }
    }
}

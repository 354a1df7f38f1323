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

//! Signature policies.
//!
//! A signature policy is a tree of `SignedBy` leaves and `NOutOf` combinators.  Leaves refer to
//! a principal by its index in the identities of the enclosing `SignaturePolicyEnvelope`.  The
//! language has no negation, so every policy is monotone: adding signatures never turns a
//! satisfied policy into an unsatisfied one.

use protobuf::RepeatedField;

use crate::protos::msp_principal::MSPPrincipal;
use crate::protos::policies::SignaturePolicy_NOutOf;
use crate::protos::{self, FromNative, FromProto, IntoBytes, IntoProto, ProtoConversionError};

use super::msp::Principal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// Satisfied by a signature from the identity at this index.
    SignedBy(i32),
    /// Satisfied when at least `n` of the rules are satisfied by distinct signers.
    NOutOf { n: i32, rules: Vec<SignaturePolicy> },
}

impl SignaturePolicy {
    pub fn signed_by(index: i32) -> Self {
        SignaturePolicy::SignedBy(index)
    }

    pub fn n_out_of(n: i32, rules: Vec<SignaturePolicy>) -> Self {
        SignaturePolicy::NOutOf { n, rules }
    }
}

impl FromProto<protos::policies::SignaturePolicy> for SignaturePolicy {
    fn from_proto(
        mut policy: protos::policies::SignaturePolicy,
    ) -> Result<Self, ProtoConversionError> {
        if policy.has_signed_by() {
            Ok(SignaturePolicy::SignedBy(policy.get_signed_by()))
        } else if policy.has_n_out_of() {
            let mut n_out_of = policy.take_n_out_of();
            Ok(SignaturePolicy::NOutOf {
                n: n_out_of.get_n(),
                rules: n_out_of
                    .take_rules()
                    .into_iter()
                    .map(SignaturePolicy::from_proto)
                    .collect::<Result<_, _>>()?,
            })
        } else {
            Err(ProtoConversionError::InvalidTypeError(
                "signature policy has neither signed_by nor n_out_of set".into(),
            ))
        }
    }
}

impl FromNative<SignaturePolicy> for protos::policies::SignaturePolicy {
    fn from_native(policy: SignaturePolicy) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::policies::SignaturePolicy::new();
        match policy {
            SignaturePolicy::SignedBy(index) => proto.set_signed_by(index),
            SignaturePolicy::NOutOf { n, rules } => {
                let mut n_out_of = SignaturePolicy_NOutOf::new();
                n_out_of.set_n(n);
                n_out_of.set_rules(RepeatedField::from_vec(
                    rules
                        .into_iter()
                        .map(|rule| rule.into_proto())
                        .collect::<Result<_, _>>()?,
                ));
                proto.set_n_out_of(n_out_of);
            }
        }
        Ok(proto)
    }
}

proto_bytes_conversions!(SignaturePolicy, protos::policies::SignaturePolicy);

/// A policy rule together with the principals its leaves refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePolicyEnvelope {
    version: i32,
    rule: Option<SignaturePolicy>,
    identities: Vec<Principal>,
}

impl SignaturePolicyEnvelope {
    pub fn version(&self) -> i32 {
        self.version
    }

    /// The root of the policy tree, or `None` for an empty policy.
    pub fn rule(&self) -> Option<&SignaturePolicy> {
        self.rule.as_ref()
    }

    pub fn identities(&self) -> &[Principal] {
        &self.identities
    }

    /// A policy satisfied by any set of signatures, including the empty one.
    pub fn accept_all() -> Self {
        SignaturePolicyEnvelope {
            version: 0,
            rule: Some(SignaturePolicy::n_out_of(0, vec![])),
            identities: vec![],
        }
    }

    /// A policy no set of signatures can satisfy.
    pub fn reject_all() -> Self {
        SignaturePolicyEnvelope {
            version: 0,
            rule: Some(SignaturePolicy::n_out_of(1, vec![])),
            identities: vec![],
        }
    }

    /// A policy requiring a signature from any member of `msp_id`.
    pub fn signed_by_member(msp_id: &str) -> Self {
        Self::signed_by_principal(Principal::member(msp_id))
    }

    /// A policy requiring a signature from an admin of `msp_id`.
    pub fn signed_by_admin(msp_id: &str) -> Self {
        Self::signed_by_principal(Principal::admin(msp_id))
    }

    fn signed_by_principal(principal: Principal) -> Self {
        SignaturePolicyEnvelope {
            version: 0,
            rule: Some(SignaturePolicy::n_out_of(
                1,
                vec![SignaturePolicy::signed_by(0)],
            )),
            identities: vec![principal],
        }
    }

    /// Serializes the envelope, as stored in chaincode definitions and collection configs.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtoConversionError> {
        self.clone().into_bytes()
    }

    pub fn into_builder(self) -> SignaturePolicyEnvelopeBuilder {
        SignaturePolicyEnvelopeBuilder::new()
            .with_version(self.version)
            .with_identities(self.identities)
            .with_optional_rule(self.rule)
    }
}

impl FromProto<protos::policies::SignaturePolicyEnvelope> for SignaturePolicyEnvelope {
    fn from_proto(
        mut envelope: protos::policies::SignaturePolicyEnvelope,
    ) -> Result<Self, ProtoConversionError> {
        let rule = if envelope.has_rule() {
            Some(SignaturePolicy::from_proto(envelope.take_rule())?)
        } else {
            None
        };

        Ok(SignaturePolicyEnvelope {
            version: envelope.get_version(),
            rule,
            identities: envelope
                .take_identities()
                .into_iter()
                .map(Principal::from_proto)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl FromNative<SignaturePolicyEnvelope> for protos::policies::SignaturePolicyEnvelope {
    fn from_native(envelope: SignaturePolicyEnvelope) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::policies::SignaturePolicyEnvelope::new();
        proto.set_version(envelope.version);
        if let Some(rule) = envelope.rule {
            proto.set_rule(rule.into_proto()?);
        }
        proto.set_identities(RepeatedField::from_vec(
            envelope
                .identities
                .into_iter()
                .map(|principal| principal.into_proto())
                .collect::<Result<Vec<MSPPrincipal>, _>>()?,
        ));
        Ok(proto)
    }
}

proto_bytes_conversions!(
    SignaturePolicyEnvelope,
    protos::policies::SignaturePolicyEnvelope
);

#[derive(Default, Clone)]
pub struct SignaturePolicyEnvelopeBuilder {
    version: Option<i32>,
    rule: Option<SignaturePolicy>,
    identities: Option<Vec<Principal>>,
}

impl SignaturePolicyEnvelopeBuilder {
    pub fn new() -> Self {
        SignaturePolicyEnvelopeBuilder::default()
    }

    pub fn with_version(mut self, version: i32) -> SignaturePolicyEnvelopeBuilder {
        self.version = Some(version);
        self
    }

    pub fn with_rule(mut self, rule: SignaturePolicy) -> SignaturePolicyEnvelopeBuilder {
        self.rule = Some(rule);
        self
    }

    fn with_optional_rule(mut self, rule: Option<SignaturePolicy>) -> SignaturePolicyEnvelopeBuilder {
        self.rule = rule;
        self
    }

    pub fn with_identities(mut self, identities: Vec<Principal>) -> SignaturePolicyEnvelopeBuilder {
        self.identities = Some(identities);
        self
    }

    /// Builds the envelope.  An envelope without a rule is accepted here and rejected when the
    /// policy is compiled for evaluation.
    pub fn build(self) -> SignaturePolicyEnvelope {
        SignaturePolicyEnvelope {
            version: self.version.unwrap_or(0),
            rule: self.rule,
            identities: self.identities.unwrap_or_default(),
        }
    }
}

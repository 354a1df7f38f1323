// Copyright 2019 Cargill Incorporated
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use vscc::protocol::msp::Principal;
use vscc::protocol::policy::{SignaturePolicy, SignaturePolicyEnvelopeBuilder};
use vscc::protocol::rwset::TxReadWriteSetBuilder;
use vscc::validation::{
    InvalidReason, ValidationOutcome, DUPLICATED_IDENTITY_ERROR, ERROR, OK,
};

use common::{invoke_tx, member_policy, Network, CHANNEL, LSCC};

fn two_org_policy() -> Vec<u8> {
    SignaturePolicyEnvelopeBuilder::new()
        .with_rule(SignaturePolicy::n_out_of(
            2,
            vec![SignaturePolicy::signed_by(0), SignaturePolicy::signed_by(1)],
        ))
        .with_identities(vec![
            Principal::member("Org1MSP"),
            Principal::member("Org2MSP"),
        ])
        .build()
        .to_bytes()
        .expect("Unable to serialize policy")
}

#[test]
fn invoke_argument_errors() {
    let network = Network::new();
    let validator = network.validator();
    let envelope = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();
    let policy = member_policy("Org1MSP");

    assert_eq!(ERROR, validator.invoke(&[]).status());
    assert_eq!(
        ERROR,
        validator
            .invoke(&[b"param".to_vec(), envelope.clone()])
            .status()
    );
    assert_eq!(
        ERROR,
        validator
            .invoke(&[
                b"param".to_vec(),
                envelope.clone(),
                policy.clone(),
                b"extra".to_vec()
            ])
            .status()
    );
    assert_eq!(
        ERROR,
        validator
            .invoke(&[b"param".to_vec(), vec![], policy.clone()])
            .status()
    );
    assert_eq!(
        ERROR,
        validator
            .invoke(&[b"param".to_vec(), envelope.clone(), vec![]])
            .status()
    );
    assert_eq!(
        ERROR,
        validator
            .invoke(&[vec![], envelope.clone(), policy.clone()])
            .status()
    );

    let response = validator.invoke(&[b"param".to_vec(), envelope, policy]);
    assert_eq!(OK, response.status(), "{}", response.message());
}

#[test]
fn broken_envelope() {
    let network = Network::new();
    let validator = network.validator();

    let response = validator.invoke(&[b"param".to_vec(), b"barf".to_vec(), member_policy("Org1MSP")]);
    assert_eq!(ERROR, response.status());

    assert_eq!(
        Some(InvalidReason::MalformedTransaction),
        validator
            .validate(b"barf", &member_policy("Org1MSP"), CHANNEL)
            .invalid_reason()
    );
}

#[test]
fn valid_endorsement() {
    let network = Network::new();
    let envelope = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();

    assert_eq!(
        ValidationOutcome::Valid,
        network
            .validator()
            .validate(&envelope, &member_policy("Org1MSP"), CHANNEL)
    );
}

#[test]
// endorsements by another organization, or by a key no MSP has enrolled, do not count
fn wrong_msp() {
    let network = Network::new();
    let validator = network.validator();

    let by_org2 = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.org2_peer])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::PolicyNotSatisfied),
        validator
            .validate(&by_org2, &member_policy("Org1MSP"), CHANNEL)
            .invalid_reason()
    );

    let by_outsider = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.outsider])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::PolicyNotSatisfied),
        validator
            .validate(&by_outsider, &member_policy("Org1MSP"), CHANNEL)
            .invalid_reason()
    );

    let unendorsed = invoke_tx("mycc").build(&network.org1_admin, &[]).unwrap();
    assert_eq!(
        Some(InvalidReason::PolicyNotSatisfied),
        validator
            .validate(&unendorsed, &member_policy("Org1MSP"), CHANNEL)
            .invalid_reason()
    );
}

#[test]
fn two_organizations() {
    let network = Network::new();
    let validator = network.validator();

    let both = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.org1_peer, &network.org2_peer])
        .unwrap();
    assert!(validator.validate(&both, &two_org_policy(), CHANNEL).is_valid());

    let one = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::PolicyNotSatisfied),
        validator
            .validate(&one, &two_org_policy(), CHANNEL)
            .invalid_reason()
    );
}

#[test]
// one identity endorsing twice cannot satisfy a policy that needs two endorsements
fn duplicate_identity() {
    let network = Network::new();
    let policy = SignaturePolicyEnvelopeBuilder::new()
        .with_rule(SignaturePolicy::n_out_of(
            2,
            vec![SignaturePolicy::signed_by(0), SignaturePolicy::signed_by(0)],
        ))
        .with_identities(vec![Principal::member("Org1MSP")])
        .build()
        .to_bytes()
        .unwrap();
    let envelope = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.org1_peer, &network.org1_peer])
        .unwrap();

    let validator = network.validator();
    assert_eq!(
        ValidationOutcome::Invalid(
            InvalidReason::DuplicateIdentityUse,
            DUPLICATED_IDENTITY_ERROR.into()
        ),
        validator.validate(&envelope, &policy, CHANNEL)
    );

    let response = validator.invoke(&[b"param".to_vec(), envelope, policy]);
    assert_eq!(ERROR, response.status());
    assert_eq!(DUPLICATED_IDENTITY_ERROR, response.message());
}

#[test]
fn malformed_policy() {
    let network = Network::new();
    let validator = network.validator();
    let envelope = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();

    assert_eq!(
        Some(InvalidReason::MalformedPolicy),
        validator
            .validate(&envelope, b"barf", CHANNEL)
            .invalid_reason()
    );

    let out_of_range = SignaturePolicyEnvelopeBuilder::new()
        .with_rule(SignaturePolicy::n_out_of(
            1,
            vec![SignaturePolicy::signed_by(1)],
        ))
        .with_identities(vec![Principal::member("Org1MSP")])
        .build()
        .to_bytes()
        .unwrap();
    assert_eq!(
        Some(InvalidReason::MalformedPolicy),
        validator
            .validate(&envelope, &out_of_range, CHANNEL)
            .invalid_reason()
    );
}

#[test]
fn channel_mismatch() {
    let network = Network::new();
    let envelope = invoke_tx("mycc")
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();

    assert_eq!(
        Some(InvalidReason::MalformedTransaction),
        network
            .validator()
            .validate(&envelope, &member_policy("Org1MSP"), "otherchannel")
            .invalid_reason()
    );
}

#[test]
// only lifecycle invocations may write chaincode definitions
fn ordinary_chaincode_writing_lifecycle_namespace() {
    let network = Network::new();
    let envelope = invoke_tx("mycc")
        .with_rwset(
            TxReadWriteSetBuilder::new()
                .with_write("mycc", "a", b"10".to_vec())
                .with_write(LSCC, "mycc", b"definition".to_vec())
                .build(),
        )
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();

    assert_eq!(
        Some(InvalidReason::UnexpectedWrite),
        network
            .validator()
            .validate(&envelope, &member_policy("Org1MSP"), CHANNEL)
            .invalid_reason()
    );
}

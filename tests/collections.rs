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

use vscc::protocol::rwset::TxReadWriteSetBuilder;
use vscc::validation::{CollectionUpgradePolicy, InvalidReason, ValidationOutcome, Validator};

use common::{
    collection_package, member_policy, LifecycleTx, Network, CHANNEL, LSCC,
};

fn validate(validator: &Validator, envelope: &[u8]) -> ValidationOutcome {
    validator.validate(envelope, &member_policy("Org1MSP"), CHANNEL)
}

fn reason(validator: &Validator, envelope: &[u8]) -> Option<InvalidReason> {
    validate(validator, envelope).invalid_reason()
}

#[test]
fn deploy_with_collections() {
    let network = Network::new();
    let tx = LifecycleTx::deploy("mycc", "1")
        .with_collections(collection_package(&["mycollection", "othercollection"]));

    assert_eq!(
        ValidationOutcome::Valid,
        validate(
            &network.validator(),
            &tx.build(&network.org1_admin, &network.org1_peer)
        )
    );
}

#[test]
// the collection argument and the collection write must carry the same bytes
fn argument_and_write_mismatch() {
    let network = Network::new();
    let validator = network.validator();
    let package = collection_package(&["mycollection"]);

    let passed_not_written = LifecycleTx::deploy("mycc", "1").with_collections(package.clone());
    let envelope = passed_not_written
        .builder_with(
            passed_not_written.args(),
            TxReadWriteSetBuilder::new().with_write(
                LSCC,
                "mycc",
                passed_not_written.definition(),
            ),
        )
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::ArgMismatch),
        reason(&validator, &envelope)
    );

    let written_not_passed = LifecycleTx::deploy("mycc", "1").with_collections(package.clone());
    let mut args = written_not_passed.args();
    args.pop();
    let envelope = written_not_passed
        .builder_with(args, written_not_passed.rwset())
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::ArgMismatch),
        reason(&validator, &envelope)
    );

    let different = LifecycleTx::deploy("mycc", "1").with_collections(package);
    let mut args = different.args();
    args[6] = collection_package(&["othercollection"]);
    let envelope = different
        .builder_with(args, different.rwset())
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::ArgMismatch),
        reason(&validator, &envelope)
    );
}

#[test]
fn collection_under_wrong_key() {
    let network = Network::new();
    let package = collection_package(&["mycollection"]);
    let tx = LifecycleTx::deploy("mycc", "1").with_collections(package.clone());

    let envelope = tx
        .builder_with(
            tx.args(),
            TxReadWriteSetBuilder::new()
                .with_write(LSCC, "mycc", tx.definition())
                .with_write(LSCC, "mycc~collections", package),
        )
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::UnexpectedWrite),
        reason(&network.validator(), &envelope)
    );
}

#[test]
fn too_many_lifecycle_writes() {
    let network = Network::new();
    let tx = LifecycleTx::deploy("mycc", "1").with_collections(collection_package(&["a"]));

    let envelope = tx
        .builder_with(tx.args(), tx.rwset().with_write(LSCC, "b", b"c".to_vec()))
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::UnexpectedWrite),
        reason(&network.validator(), &envelope)
    );
}

#[test]
fn malformed_collections() {
    let network = Network::new();
    let validator = network.validator();

    let garbage = LifecycleTx::deploy("mycc", "1").with_collections(b"barf".to_vec());
    assert_eq!(
        Some(InvalidReason::MalformedCollectionConfig),
        reason(
            &validator,
            &garbage.build(&network.org1_admin, &network.org1_peer)
        )
    );

    let duplicated =
        LifecycleTx::deploy("mycc", "1").with_collections(collection_package(&["a", "b", "a"]));
    assert_eq!(
        Some(InvalidReason::DuplicateCollectionName),
        reason(
            &validator,
            &duplicated.build(&network.org1_admin, &network.org1_peer)
        )
    );
}

#[test]
// a deploy may not replace a collection configuration left on the ledger
fn deploy_over_existing_collections() {
    let network = Network::new();
    let package = collection_package(&["mycollection"]);
    network.commit_collections("mycc", &package);
    let validator = network.validator();

    let with_collections = LifecycleTx::deploy("mycc", "1").with_collections(package);
    assert_eq!(
        Some(InvalidReason::ForbiddenCollectionUpdate),
        reason(
            &validator,
            &with_collections.build(&network.org1_admin, &network.org1_peer)
        )
    );

    let without_collections = LifecycleTx::deploy("mycc", "1");
    assert_eq!(
        Some(InvalidReason::ForbiddenCollectionUpdate),
        reason(
            &validator,
            &without_collections.build(&network.org1_admin, &network.org1_peer)
        )
    );
}

#[test]
// deploy, then upgrade twice, committing each valid transaction
fn collection_sequence() {
    let network = Network::new();
    let validator = network.validator();
    let package = collection_package(&["mycollection"]);

    let deploy = LifecycleTx::deploy("mycc", "1").with_collections(package.clone());
    assert!(validate(
        &validator,
        &deploy.build(&network.org1_admin, &network.org1_peer)
    )
    .is_valid());
    network
        .ledger
        .commit(CHANNEL, &deploy.rwset().build())
        .unwrap();

    let unchanged = LifecycleTx::upgrade("mycc", "2").with_collections(package);
    assert!(validate(
        &validator,
        &unchanged.build(&network.org1_admin, &network.org1_peer)
    )
    .is_valid());
    network
        .ledger
        .commit(CHANNEL, &unchanged.rwset().build())
        .unwrap();

    let changed = LifecycleTx::upgrade("mycc", "3")
        .with_collections(collection_package(&["mycollection", "newcollection"]));
    assert_eq!(
        Some(InvalidReason::ForbiddenCollectionUpdate),
        reason(
            &validator,
            &changed.build(&network.org1_admin, &network.org1_peer)
        )
    );

    // upgrades that leave collections out do not touch them
    let untouched = LifecycleTx::upgrade("mycc", "3");
    assert!(validate(
        &validator,
        &untouched.build(&network.org1_admin, &network.org1_peer)
    )
    .is_valid());

    let redeploy = LifecycleTx::deploy("mycc", "3");
    assert_eq!(
        Some(InvalidReason::ChaincodeExists),
        reason(
            &validator,
            &redeploy.build(&network.org1_admin, &network.org1_peer)
        )
    );
}

#[test]
// collections may be added on upgrade, but existing ones are kept unchanged
fn upgrade_allowing_additions() {
    let network = Network::new();
    let validator = network
        .validator_builder()
        .with_collection_upgrade_policy(CollectionUpgradePolicy::AllowAdditions)
        .build()
        .unwrap();
    let deploy =
        LifecycleTx::deploy("mycc", "1").with_collections(collection_package(&["mycollection"]));
    network
        .ledger
        .commit(CHANNEL, &deploy.rwset().build())
        .unwrap();

    let added = LifecycleTx::upgrade("mycc", "2")
        .with_collections(collection_package(&["mycollection", "newcollection"]));
    assert!(validate(
        &validator,
        &added.build(&network.org1_admin, &network.org1_peer)
    )
    .is_valid());

    let removed =
        LifecycleTx::upgrade("mycc", "2").with_collections(collection_package(&["newcollection"]));
    assert_eq!(
        Some(InvalidReason::ForbiddenCollectionUpdate),
        reason(
            &validator,
            &removed.build(&network.org1_admin, &network.org1_peer)
        )
    );
}

#[test]
// lifecycle transactions may write collections but never delete them
fn upgrade_deleting_collections() {
    let network = Network::new();
    let validator = network.validator();

    let deploy = LifecycleTx::deploy("mycc", "1")
        .with_collections(collection_package(&["mycollection"]));
    assert!(validate(
        &validator,
        &deploy.build(&network.org1_admin, &network.org1_peer)
    )
    .is_valid());
    network
        .ledger
        .commit(CHANNEL, &deploy.rwset().build())
        .unwrap();

    let upgrade = LifecycleTx::upgrade("mycc", "2");
    let envelope = upgrade
        .builder_with(
            upgrade.args(),
            TxReadWriteSetBuilder::new()
                .with_write(LSCC, "mycc", upgrade.definition())
                .with_delete(LSCC, "mycc~collection"),
        )
        .build(&network.org1_admin, &[&network.org1_peer])
        .unwrap();
    assert_eq!(
        Some(InvalidReason::UnexpectedWrite),
        reason(&validator, &envelope)
    );

    let permissive = network
        .validator_builder()
        .with_collection_upgrade_policy(CollectionUpgradePolicy::AllowAdditions)
        .build()
        .unwrap();
    assert_eq!(
        Some(InvalidReason::UnexpectedWrite),
        reason(&permissive, &envelope)
    );
}

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

#![allow(dead_code)]

use std::sync::Arc;

use cylinder::{secp256k1::Secp256k1Context, Context};

use vscc::identity::{MspConfigBuilder, MspManager, SigningIdentity};
use vscc::ledger::HashMapLedger;
use vscc::protocol::chaincode::{
    ChaincodeDataBuilder, ChaincodeDeploymentSpec, ChaincodeId, ChaincodeSpec,
};
use vscc::protocol::collection::{
    CollectionConfigPackage, StaticCollectionConfig, StaticCollectionConfigBuilder,
};
use vscc::protocol::policy::SignaturePolicyEnvelope;
use vscc::protocol::rwset::TxReadWriteSetBuilder;
use vscc::protocol::transaction::EndorserTransactionBuilder;
use vscc::protos::IntoBytes;
use vscc::validation::{Validator, ValidatorBuilder};

pub const CHANNEL: &str = "testchannel";
pub const LSCC: &str = "lscc";

/// Two organizations, each with a peer and an admin, plus an identity no MSP knows.
pub struct Network {
    pub ledger: Arc<HashMapLedger>,
    pub org1_peer: SigningIdentity,
    pub org1_admin: SigningIdentity,
    pub org2_peer: SigningIdentity,
    pub outsider: SigningIdentity,
    msp_manager: Arc<MspManager>,
}

impl Network {
    pub fn new() -> Self {
        let org1_peer = new_identity("Org1MSP");
        let org1_admin = new_identity("Org1MSP");
        let org2_peer = new_identity("Org2MSP");
        let outsider = new_identity("Org1MSP");

        let msp_manager = MspManager::new(vec![
            MspConfigBuilder::new()
                .with_msp_id("Org1MSP".into())
                .with_peer(org1_peer.public_key().to_vec())
                .with_admin(org1_admin.public_key().to_vec())
                .build()
                .expect("Unable to build Org1MSP"),
            MspConfigBuilder::new()
                .with_msp_id("Org2MSP".into())
                .with_peer(org2_peer.public_key().to_vec())
                .build()
                .expect("Unable to build Org2MSP"),
        ]);

        Network {
            ledger: Arc::new(HashMapLedger::new()),
            org1_peer,
            org1_admin,
            org2_peer,
            outsider,
            msp_manager: Arc::new(msp_manager),
        }
    }

    pub fn validator_builder(&self) -> ValidatorBuilder {
        ValidatorBuilder::new()
            .with_identity_provider(self.msp_manager.clone())
            .with_ledger_provider(self.ledger.clone())
    }

    pub fn validator(&self) -> Validator {
        self.validator_builder()
            .build()
            .expect("Unable to build validator")
    }

    /// Commits a chaincode definition as a valid deploy would have.
    pub fn commit_definition(
        &self,
        name: &str,
        version: &str,
        instantiation_policy: &SignaturePolicyEnvelope,
    ) {
        self.ledger
            .put_state(
                CHANNEL,
                LSCC,
                name,
                chaincode_data(name, version, instantiation_policy),
            )
            .expect("Unable to commit definition");
    }

    pub fn commit_collections(&self, name: &str, package: &[u8]) {
        self.ledger
            .put_state(CHANNEL, LSCC, &format!("{}~collection", name), package.to_vec())
            .expect("Unable to commit collections");
    }
}

pub fn new_identity(msp_id: &str) -> SigningIdentity {
    let context = Secp256k1Context::new();
    let key = context.new_random_private_key();
    SigningIdentity::new(msp_id, context.new_signer(key)).expect("Unable to create identity")
}

pub fn member_policy(msp_id: &str) -> Vec<u8> {
    SignaturePolicyEnvelope::signed_by_member(msp_id)
        .to_bytes()
        .expect("Unable to serialize policy")
}

pub fn chaincode_data(
    name: &str,
    version: &str,
    instantiation_policy: &SignaturePolicyEnvelope,
) -> Vec<u8> {
    ChaincodeDataBuilder::new()
        .with_name(name.into())
        .with_version(version.into())
        .with_policy(member_policy("Org1MSP"))
        .with_instantiation_policy(
            instantiation_policy
                .to_bytes()
                .expect("Unable to serialize instantiation policy"),
        )
        .build()
        .expect("Unable to build chaincode data")
        .into_bytes()
        .expect("Unable to serialize chaincode data")
}

pub fn deployment_spec(name: &str, version: &str) -> Vec<u8> {
    ChaincodeDeploymentSpec::new(
        ChaincodeSpec::new(ChaincodeId::new(name, version), vec![]),
        b"code".to_vec(),
    )
    .into_bytes()
    .expect("Unable to serialize deployment spec")
}

pub fn collection(name: &str) -> StaticCollectionConfig {
    StaticCollectionConfigBuilder::new()
        .with_name(name.into())
        .with_member_orgs_policy(SignaturePolicyEnvelope::signed_by_member("Org1MSP"))
        .with_required_peer_count(1)
        .with_maximum_peer_count(2)
        .build()
}

pub fn collection_package(names: &[&str]) -> Vec<u8> {
    CollectionConfigPackage::new(names.iter().map(|name| collection(name)).collect())
        .into_bytes()
        .expect("Unable to serialize collection package")
}

/// A transaction invoking an ordinary chaincode.
pub fn invoke_tx(chaincode: &str) -> EndorserTransactionBuilder {
    EndorserTransactionBuilder::new()
        .with_channel_id(CHANNEL.into())
        .with_chaincode_id(ChaincodeId::new(chaincode, "1"))
        .with_args(vec![b"invoke".to_vec(), b"a".to_vec(), b"b".to_vec()])
        .with_rwset(
            TxReadWriteSetBuilder::new()
                .with_write(chaincode, "a", b"10".to_vec())
                .build(),
        )
}

/// A deploy or upgrade through the lifecycle chaincode whose write set matches its
/// arguments.  A collection package, if given, is both passed and written.
pub struct LifecycleTx {
    function: String,
    name: String,
    version: String,
    instantiation_policy: SignaturePolicyEnvelope,
    collections: Option<Vec<u8>>,
}

impl LifecycleTx {
    pub fn deploy(name: &str, version: &str) -> Self {
        LifecycleTx::new("deploy", name, version)
    }

    pub fn upgrade(name: &str, version: &str) -> Self {
        LifecycleTx::new("upgrade", name, version)
    }

    pub fn new(function: &str, name: &str, version: &str) -> Self {
        LifecycleTx {
            function: function.into(),
            name: name.into(),
            version: version.into(),
            instantiation_policy: SignaturePolicyEnvelope::signed_by_member("Org1MSP"),
            collections: None,
        }
    }

    pub fn with_instantiation_policy(mut self, policy: SignaturePolicyEnvelope) -> Self {
        self.instantiation_policy = policy;
        self
    }

    pub fn with_collections(mut self, package: Vec<u8>) -> Self {
        self.collections = Some(package);
        self
    }

    pub fn args(&self) -> Vec<Vec<u8>> {
        let mut args = vec![
            self.function.as_bytes().to_vec(),
            CHANNEL.as_bytes().to_vec(),
            deployment_spec(&self.name, &self.version),
            member_policy("Org1MSP"),
            b"escc".to_vec(),
            b"vscc".to_vec(),
        ];
        if let Some(ref collections) = self.collections {
            args.push(collections.clone());
        }
        args
    }

    pub fn definition(&self) -> Vec<u8> {
        chaincode_data(&self.name, &self.version, &self.instantiation_policy)
    }

    pub fn rwset(&self) -> TxReadWriteSetBuilder {
        let builder = TxReadWriteSetBuilder::new().with_write(LSCC, &self.name, self.definition());
        match self.collections {
            Some(ref collections) if !collections.is_empty() => builder.with_write(
                LSCC,
                &format!("{}~collection", self.name),
                collections.clone(),
            ),
            _ => builder,
        }
    }

    /// The transaction with the given arguments and write set.
    pub fn builder_with(
        &self,
        args: Vec<Vec<u8>>,
        rwset: TxReadWriteSetBuilder,
    ) -> EndorserTransactionBuilder {
        EndorserTransactionBuilder::new()
            .with_channel_id(CHANNEL.into())
            .with_chaincode_id(ChaincodeId::new(LSCC, "1"))
            .with_args(args)
            .with_rwset(rwset.build())
    }

    pub fn builder(&self) -> EndorserTransactionBuilder {
        self.builder_with(self.args(), self.rwset())
    }

    /// Created by `creator` and endorsed by `endorser`.
    pub fn build(&self, creator: &SigningIdentity, endorser: &SigningIdentity) -> Vec<u8> {
        self.builder()
            .build(creator, &[endorser])
            .expect("Unable to build lifecycle transaction")
    }
}

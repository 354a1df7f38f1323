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

//! Private data collection configuration.

use protobuf::RepeatedField;

use crate::protos::collection::{CollectionConfig, CollectionPolicyConfig};
use crate::protos::{self, FromNative, FromProto, IntoProto, ProtoConversionError};

use super::policy::SignaturePolicyEnvelope;

const COLLECTION_SEPARATOR: &str = "~";
const COLLECTION_SUFFIX: &str = "collection";

/// Returns the lifecycle namespace key under which the collection configuration of
/// `chaincode_name` is stored.
pub fn collection_key(chaincode_name: &str) -> String {
    format!(
        "{}{}{}",
        chaincode_name, COLLECTION_SEPARATOR, COLLECTION_SUFFIX
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCollectionConfig {
    name: String,
    member_orgs_policy: Option<SignaturePolicyEnvelope>,
    required_peer_count: i32,
    maximum_peer_count: i32,
    block_to_live: u64,
}

impl StaticCollectionConfig {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signature policy naming the organizations that hold the collection's data.
    pub fn member_orgs_policy(&self) -> Option<&SignaturePolicyEnvelope> {
        self.member_orgs_policy.as_ref()
    }

    pub fn required_peer_count(&self) -> i32 {
        self.required_peer_count
    }

    pub fn maximum_peer_count(&self) -> i32 {
        self.maximum_peer_count
    }

    pub fn block_to_live(&self) -> u64 {
        self.block_to_live
    }
}

impl FromProto<protos::collection::StaticCollectionConfig> for StaticCollectionConfig {
    fn from_proto(
        mut config: protos::collection::StaticCollectionConfig,
    ) -> Result<Self, ProtoConversionError> {
        let member_orgs_policy = if config.has_member_orgs_policy() {
            let mut policy = config.take_member_orgs_policy();
            if policy.has_signature_policy() {
                Some(SignaturePolicyEnvelope::from_proto(
                    policy.take_signature_policy(),
                )?)
            } else {
                None
            }
        } else {
            None
        };

        Ok(StaticCollectionConfig {
            name: config.take_name(),
            member_orgs_policy,
            required_peer_count: config.get_required_peer_count(),
            maximum_peer_count: config.get_maximum_peer_count(),
            block_to_live: config.get_block_to_live(),
        })
    }
}

impl FromNative<StaticCollectionConfig> for protos::collection::StaticCollectionConfig {
    fn from_native(config: StaticCollectionConfig) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::collection::StaticCollectionConfig::new();
        proto.set_name(config.name);
        if let Some(policy) = config.member_orgs_policy {
            let mut policy_config = CollectionPolicyConfig::new();
            policy_config.set_signature_policy(policy.into_proto()?);
            proto.set_member_orgs_policy(policy_config);
        }
        proto.set_required_peer_count(config.required_peer_count);
        proto.set_maximum_peer_count(config.maximum_peer_count);
        proto.set_block_to_live(config.block_to_live);
        Ok(proto)
    }
}

impl IntoProto<protos::collection::StaticCollectionConfig> for StaticCollectionConfig {}

/// The collections of a chaincode, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionConfigPackage {
    configs: Vec<StaticCollectionConfig>,
}

impl CollectionConfigPackage {
    pub fn new(configs: Vec<StaticCollectionConfig>) -> Self {
        CollectionConfigPackage { configs }
    }

    pub fn configs(&self) -> &[StaticCollectionConfig] {
        &self.configs
    }

    pub fn get(&self, name: &str) -> Option<&StaticCollectionConfig> {
        self.configs.iter().find(|config| config.name == name)
    }
}

impl FromProto<protos::collection::CollectionConfigPackage> for CollectionConfigPackage {
    fn from_proto(
        mut package: protos::collection::CollectionConfigPackage,
    ) -> Result<Self, ProtoConversionError> {
        let configs = package
            .take_config()
            .into_iter()
            .map(|mut config| {
                if config.has_static_collection_config() {
                    StaticCollectionConfig::from_proto(config.take_static_collection_config())
                } else {
                    Err(ProtoConversionError::InvalidTypeError(
                        "collection config is not a static collection config".into(),
                    ))
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(CollectionConfigPackage { configs })
    }
}

impl FromNative<CollectionConfigPackage> for protos::collection::CollectionConfigPackage {
    fn from_native(package: CollectionConfigPackage) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::collection::CollectionConfigPackage::new();
        proto.set_config(RepeatedField::from_vec(
            package
                .configs
                .into_iter()
                .map(|config| {
                    let mut proto_config = CollectionConfig::new();
                    proto_config.set_static_collection_config(config.into_proto()?);
                    Ok(proto_config)
                })
                .collect::<Result<_, ProtoConversionError>>()?,
        ));
        Ok(proto)
    }
}

proto_bytes_conversions!(
    CollectionConfigPackage,
    protos::collection::CollectionConfigPackage
);

#[derive(Default, Clone)]
pub struct StaticCollectionConfigBuilder {
    name: Option<String>,
    member_orgs_policy: Option<SignaturePolicyEnvelope>,
    required_peer_count: Option<i32>,
    maximum_peer_count: Option<i32>,
    block_to_live: Option<u64>,
}

impl StaticCollectionConfigBuilder {
    pub fn new() -> Self {
        StaticCollectionConfigBuilder::default()
    }

    pub fn with_name(mut self, name: String) -> StaticCollectionConfigBuilder {
        self.name = Some(name);
        self
    }

    pub fn with_member_orgs_policy(
        mut self,
        policy: SignaturePolicyEnvelope,
    ) -> StaticCollectionConfigBuilder {
        self.member_orgs_policy = Some(policy);
        self
    }

    pub fn with_required_peer_count(mut self, count: i32) -> StaticCollectionConfigBuilder {
        self.required_peer_count = Some(count);
        self
    }

    pub fn with_maximum_peer_count(mut self, count: i32) -> StaticCollectionConfigBuilder {
        self.maximum_peer_count = Some(count);
        self
    }

    pub fn with_block_to_live(mut self, block_to_live: u64) -> StaticCollectionConfigBuilder {
        self.block_to_live = Some(block_to_live);
        self
    }

    /// Builds the config without checking it; malformed configs are rejected at validation.
    pub fn build(self) -> StaticCollectionConfig {
        StaticCollectionConfig {
            name: self.name.unwrap_or_default(),
            member_orgs_policy: self.member_orgs_policy,
            required_peer_count: self.required_peer_count.unwrap_or(0),
            maximum_peer_count: self.maximum_peer_count.unwrap_or(0),
            block_to_live: self.block_to_live.unwrap_or(0),
        }
    }
}

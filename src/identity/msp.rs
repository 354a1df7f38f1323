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

//! Statically configured membership service providers.

use std::collections::{HashMap, HashSet};

use cylinder::{secp256k1::Secp256k1Context, Context, PublicKey, Signature, Verifier};

use crate::protocol::msp::{MspRoleType, Principal, SerializedIdentity};
use crate::protos::FromBytes;

use super::{IdentityProvider, MspError};

/// The enrolled public keys of one organization and the roles they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MspConfig {
    msp_id: String,
    members: HashSet<Vec<u8>>,
    admins: HashSet<Vec<u8>>,
    peers: HashSet<Vec<u8>>,
    clients: HashSet<Vec<u8>>,
    organizational_units: HashMap<Vec<u8>, HashSet<String>>,
}

impl MspConfig {
    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Returns true if the key is enrolled in this MSP with any role.
    pub fn is_enrolled(&self, public_key: &[u8]) -> bool {
        self.members.contains(public_key)
    }

    fn has_role(&self, public_key: &[u8], role: MspRoleType) -> bool {
        match role {
            MspRoleType::Member => self.members.contains(public_key),
            MspRoleType::Admin => self.admins.contains(public_key),
            MspRoleType::Peer => self.peers.contains(public_key),
            MspRoleType::Client => self.clients.contains(public_key),
        }
    }

    fn in_unit(&self, public_key: &[u8], unit: &str) -> bool {
        self.organizational_units
            .get(public_key)
            .map(|units| units.contains(unit))
            .unwrap_or(false)
    }
}

#[derive(Default, Clone)]
pub struct MspConfigBuilder {
    msp_id: Option<String>,
    members: HashSet<Vec<u8>>,
    admins: HashSet<Vec<u8>>,
    peers: HashSet<Vec<u8>>,
    clients: HashSet<Vec<u8>>,
    organizational_units: HashMap<Vec<u8>, HashSet<String>>,
}

impl MspConfigBuilder {
    pub fn new() -> Self {
        MspConfigBuilder::default()
    }

    pub fn with_msp_id(mut self, msp_id: String) -> MspConfigBuilder {
        self.msp_id = Some(msp_id);
        self
    }

    /// Enrolls a key with no role beyond membership.
    pub fn with_member(mut self, public_key: Vec<u8>) -> MspConfigBuilder {
        self.members.insert(public_key);
        self
    }

    pub fn with_admin(mut self, public_key: Vec<u8>) -> MspConfigBuilder {
        self.members.insert(public_key.clone());
        self.admins.insert(public_key);
        self
    }

    pub fn with_peer(mut self, public_key: Vec<u8>) -> MspConfigBuilder {
        self.members.insert(public_key.clone());
        self.peers.insert(public_key);
        self
    }

    pub fn with_client(mut self, public_key: Vec<u8>) -> MspConfigBuilder {
        self.members.insert(public_key.clone());
        self.clients.insert(public_key);
        self
    }

    /// Places an enrolled key in an organizational unit.
    pub fn with_organizational_unit(mut self, public_key: Vec<u8>, unit: &str) -> MspConfigBuilder {
        self.organizational_units
            .entry(public_key)
            .or_insert_with(HashSet::new)
            .insert(unit.to_string());
        self
    }

    pub fn build(self) -> Result<MspConfig, MspError> {
        let msp_id = self
            .msp_id
            .ok_or_else(|| MspError::InvalidConfig("'msp_id' field is required".to_string()))?;
        if msp_id.is_empty() {
            return Err(MspError::InvalidConfig("'msp_id' must not be empty".to_string()));
        }
        let members = &self.members;
        if let Some(key) = self
            .organizational_units
            .keys()
            .find(|key| !members.contains(*key))
        {
            return Err(MspError::InvalidConfig(format!(
                "organizational unit assigned to unenrolled key {}",
                hex::encode(key)
            )));
        }

        Ok(MspConfig {
            msp_id,
            members: self.members,
            admins: self.admins,
            peers: self.peers,
            clients: self.clients,
            organizational_units: self.organizational_units,
        })
    }
}

/// An `IdentityProvider` over a fixed set of MSPs, verifying secp256k1 signatures.
pub struct MspManager {
    msps: HashMap<String, MspConfig>,
}

impl MspManager {
    pub fn new(configs: Vec<MspConfig>) -> Self {
        MspManager {
            msps: configs
                .into_iter()
                .map(|config| (config.msp_id.clone(), config))
                .collect(),
        }
    }

    pub fn msp(&self, msp_id: &str) -> Option<&MspConfig> {
        self.msps.get(msp_id)
    }

    /// Returns the MSP the identity is enrolled in, if any.
    fn resolve(&self, identity: &SerializedIdentity) -> Option<&MspConfig> {
        self.msps
            .get(identity.msp_id())
            .filter(|msp| msp.is_enrolled(identity.id_bytes()))
    }

    fn check_signature(
        &self,
        identity: &SerializedIdentity,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, MspError> {
        let verifier = Secp256k1Context::new().new_verifier();
        Ok(verifier.verify(
            data,
            &Signature::new(signature.to_vec()),
            &PublicKey::new(identity.id_bytes().to_vec()),
        )?)
    }
}

impl IdentityProvider for MspManager {
    fn verify(&self, identity: &SerializedIdentity, data: &[u8], signature: &[u8]) -> bool {
        if self.resolve(identity).is_none() {
            debug!("Identity {:?} is not enrolled in a known MSP", identity);
            return false;
        }

        match self.check_signature(identity, data, signature) {
            Ok(valid) => valid,
            Err(err) => {
                debug!("Unable to verify signature of {:?}: {}", identity, err);
                false
            }
        }
    }

    fn is_member(&self, identity: &SerializedIdentity, principal: &Principal) -> bool {
        match principal {
            Principal::Role { msp_id, role } => {
                identity.msp_id() == msp_id
                    && self
                        .resolve(identity)
                        .map(|msp| msp.has_role(identity.id_bytes(), *role))
                        .unwrap_or(false)
            }
            Principal::OrganizationUnit {
                msp_id,
                organizational_unit,
            } => {
                identity.msp_id() == msp_id
                    && self
                        .resolve(identity)
                        .map(|msp| msp.in_unit(identity.id_bytes(), organizational_unit))
                        .unwrap_or(false)
            }
            Principal::Identity(bytes) => match SerializedIdentity::from_bytes(bytes) {
                Ok(expected) => &expected == identity && self.resolve(identity).is_some(),
                Err(err) => {
                    debug!("Identity principal does not decode: {}", err);
                    false
                }
            },
        }
    }
}

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

//! Identities and the principals policies are expressed against.

use std::fmt;

use protobuf::Message;

use crate::protos::msp_principal::{
    MSPPrincipal, MSPPrincipal_Classification, MSPRole, MSPRole_MSPRoleType, OrganizationUnit,
};
use crate::protos::{self, FromNative, FromProto, ProtoConversionError};

/// An identity as it appears in signature headers and endorsements.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SerializedIdentity {
    msp_id: String,
    id_bytes: Vec<u8>,
}

impl SerializedIdentity {
    pub fn new(msp_id: &str, id_bytes: Vec<u8>) -> Self {
        SerializedIdentity {
            msp_id: msp_id.to_string(),
            id_bytes,
        }
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// The public key of this identity.
    pub fn id_bytes(&self) -> &[u8] {
        &self.id_bytes
    }
}

impl fmt::Debug for SerializedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SerializedIdentity {{ msp_id: {:?}, id_bytes: {:?} }}",
            self.msp_id,
            hex::encode(&self.id_bytes)
        )
    }
}

impl FromProto<protos::msp_principal::SerializedIdentity> for SerializedIdentity {
    fn from_proto(
        identity: protos::msp_principal::SerializedIdentity,
    ) -> Result<Self, ProtoConversionError> {
        Ok(SerializedIdentity {
            msp_id: identity.get_mspid().to_string(),
            id_bytes: identity.get_id_bytes().to_vec(),
        })
    }
}

impl FromNative<SerializedIdentity> for protos::msp_principal::SerializedIdentity {
    fn from_native(identity: SerializedIdentity) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::msp_principal::SerializedIdentity::new();
        proto.set_mspid(identity.msp_id);
        proto.set_id_bytes(identity.id_bytes);
        Ok(proto)
    }
}

proto_bytes_conversions!(
    SerializedIdentity,
    protos::msp_principal::SerializedIdentity
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MspRoleType {
    Member,
    Admin,
    Client,
    Peer,
}

impl fmt::Display for MspRoleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MspRoleType::Member => f.write_str("member"),
            MspRoleType::Admin => f.write_str("admin"),
            MspRoleType::Client => f.write_str("client"),
            MspRoleType::Peer => f.write_str("peer"),
        }
    }
}

/// The criteria a signer has to meet to satisfy a `SignedBy` leaf of a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Any identity holding `role` in the MSP `msp_id`.
    Role { msp_id: String, role: MspRoleType },
    /// Any identity of the MSP `msp_id` that belongs to the given organizational unit.
    OrganizationUnit {
        msp_id: String,
        organizational_unit: String,
    },
    /// Exactly this serialized identity.
    Identity(Vec<u8>),
}

impl Principal {
    pub fn member(msp_id: &str) -> Self {
        Principal::Role {
            msp_id: msp_id.to_string(),
            role: MspRoleType::Member,
        }
    }

    pub fn admin(msp_id: &str) -> Self {
        Principal::Role {
            msp_id: msp_id.to_string(),
            role: MspRoleType::Admin,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Principal::Role { msp_id, role } => write!(f, "{}.{}", msp_id, role),
            Principal::OrganizationUnit {
                msp_id,
                organizational_unit,
            } => write!(f, "{}.ou:{}", msp_id, organizational_unit),
            Principal::Identity(identity) => write!(f, "identity:{}", hex::encode(identity)),
        }
    }
}

impl FromProto<MSPPrincipal> for Principal {
    fn from_proto(principal: MSPPrincipal) -> Result<Self, ProtoConversionError> {
        match principal.get_principal_classification() {
            MSPPrincipal_Classification::ROLE => {
                let role: MSPRole = Message::parse_from_bytes(principal.get_principal())
                    .map_err(|err| {
                        ProtoConversionError::DeserializationError(format!(
                            "unable to get MSPRole from principal: {}",
                            err
                        ))
                    })?;
                let role_type = match role.get_role() {
                    MSPRole_MSPRoleType::MEMBER => MspRoleType::Member,
                    MSPRole_MSPRoleType::ADMIN => MspRoleType::Admin,
                    MSPRole_MSPRoleType::CLIENT => MspRoleType::Client,
                    MSPRole_MSPRoleType::PEER => MspRoleType::Peer,
                };
                Ok(Principal::Role {
                    msp_id: role.get_msp_identifier().to_string(),
                    role: role_type,
                })
            }
            MSPPrincipal_Classification::ORGANIZATION_UNIT => {
                let unit: OrganizationUnit = Message::parse_from_bytes(principal.get_principal())
                    .map_err(|err| {
                    ProtoConversionError::DeserializationError(format!(
                        "unable to get OrganizationUnit from principal: {}",
                        err
                    ))
                })?;
                Ok(Principal::OrganizationUnit {
                    msp_id: unit.get_msp_identifier().to_string(),
                    organizational_unit: unit.get_organizational_unit_identifier().to_string(),
                })
            }
            MSPPrincipal_Classification::IDENTITY => {
                Ok(Principal::Identity(principal.get_principal().to_vec()))
            }
        }
    }
}

impl FromNative<Principal> for MSPPrincipal {
    fn from_native(principal: Principal) -> Result<Self, ProtoConversionError> {
        let mut proto = MSPPrincipal::new();
        match principal {
            Principal::Role { msp_id, role } => {
                let mut proto_role = MSPRole::new();
                proto_role.set_msp_identifier(msp_id);
                proto_role.set_role(match role {
                    MspRoleType::Member => MSPRole_MSPRoleType::MEMBER,
                    MspRoleType::Admin => MSPRole_MSPRoleType::ADMIN,
                    MspRoleType::Client => MSPRole_MSPRoleType::CLIENT,
                    MspRoleType::Peer => MSPRole_MSPRoleType::PEER,
                });
                proto.set_principal_classification(MSPPrincipal_Classification::ROLE);
                proto.set_principal(write_principal(&proto_role)?);
            }
            Principal::OrganizationUnit {
                msp_id,
                organizational_unit,
            } => {
                let mut unit = OrganizationUnit::new();
                unit.set_msp_identifier(msp_id);
                unit.set_organizational_unit_identifier(organizational_unit);
                proto.set_principal_classification(
                    MSPPrincipal_Classification::ORGANIZATION_UNIT,
                );
                proto.set_principal(write_principal(&unit)?);
            }
            Principal::Identity(identity) => {
                proto.set_principal_classification(MSPPrincipal_Classification::IDENTITY);
                proto.set_principal(identity);
            }
        }
        Ok(proto)
    }
}

fn write_principal<M: Message>(message: &M) -> Result<Vec<u8>, ProtoConversionError> {
    message.write_to_bytes().map_err(|err| {
        ProtoConversionError::SerializationError(format!(
            "unable to get bytes from principal: {}",
            err
        ))
    })
}

proto_bytes_conversions!(Principal, MSPPrincipal);

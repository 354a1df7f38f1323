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

//! Chaincode identifiers, specs and the definitions stored in the lifecycle namespace.

use protobuf::RepeatedField;

use crate::protos::chaincode::ChaincodeSpec_Type;
use crate::protos::{self, FromNative, FromProto, IntoProto, ProtoConversionError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeId {
    path: String,
    name: String,
    version: String,
}

impl ChaincodeId {
    pub fn new(name: &str, version: &str) -> Self {
        ChaincodeId {
            path: String::new(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl FromProto<protos::chaincode::ChaincodeID> for ChaincodeId {
    fn from_proto(id: protos::chaincode::ChaincodeID) -> Result<Self, ProtoConversionError> {
        Ok(ChaincodeId {
            path: id.get_path().to_string(),
            name: id.get_name().to_string(),
            version: id.get_version().to_string(),
        })
    }
}

impl FromNative<ChaincodeId> for protos::chaincode::ChaincodeID {
    fn from_native(id: ChaincodeId) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::chaincode::ChaincodeID::new();
        proto.set_path(id.path);
        proto.set_name(id.name);
        proto.set_version(id.version);
        Ok(proto)
    }
}

proto_bytes_conversions!(ChaincodeId, protos::chaincode::ChaincodeID);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaincodeType {
    Undefined,
    Golang,
    Node,
    Car,
    Java,
}

impl Default for ChaincodeType {
    fn default() -> Self {
        ChaincodeType::Undefined
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeSpec {
    chaincode_type: ChaincodeType,
    chaincode_id: Option<ChaincodeId>,
    args: Vec<Vec<u8>>,
    timeout: i32,
}

impl ChaincodeSpec {
    pub fn new(chaincode_id: ChaincodeId, args: Vec<Vec<u8>>) -> Self {
        ChaincodeSpec {
            chaincode_type: ChaincodeType::Golang,
            chaincode_id: Some(chaincode_id),
            args,
            timeout: 0,
        }
    }

    pub fn chaincode_type(&self) -> ChaincodeType {
        self.chaincode_type
    }

    pub fn chaincode_id(&self) -> Option<&ChaincodeId> {
        self.chaincode_id.as_ref()
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    pub fn timeout(&self) -> i32 {
        self.timeout
    }
}

impl FromProto<protos::chaincode::ChaincodeSpec> for ChaincodeSpec {
    fn from_proto(
        mut spec: protos::chaincode::ChaincodeSpec,
    ) -> Result<Self, ProtoConversionError> {
        let chaincode_type = match spec.get_chaincode_type() {
            ChaincodeSpec_Type::UNDEFINED => ChaincodeType::Undefined,
            ChaincodeSpec_Type::GOLANG => ChaincodeType::Golang,
            ChaincodeSpec_Type::NODE => ChaincodeType::Node,
            ChaincodeSpec_Type::CAR => ChaincodeType::Car,
            ChaincodeSpec_Type::JAVA => ChaincodeType::Java,
        };
        let chaincode_id = if spec.has_chaincode_id() {
            Some(ChaincodeId::from_proto(spec.take_chaincode_id())?)
        } else {
            None
        };

        Ok(ChaincodeSpec {
            chaincode_type,
            chaincode_id,
            args: spec.take_input().take_args().into_vec(),
            timeout: spec.get_timeout(),
        })
    }
}

impl FromNative<ChaincodeSpec> for protos::chaincode::ChaincodeSpec {
    fn from_native(spec: ChaincodeSpec) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::chaincode::ChaincodeSpec::new();
        proto.set_chaincode_type(match spec.chaincode_type {
            ChaincodeType::Undefined => ChaincodeSpec_Type::UNDEFINED,
            ChaincodeType::Golang => ChaincodeSpec_Type::GOLANG,
            ChaincodeType::Node => ChaincodeSpec_Type::NODE,
            ChaincodeType::Car => ChaincodeSpec_Type::CAR,
            ChaincodeType::Java => ChaincodeSpec_Type::JAVA,
        });
        if let Some(chaincode_id) = spec.chaincode_id {
            proto.set_chaincode_id(chaincode_id.into_proto()?);
        }
        let mut input = protos::chaincode::ChaincodeInput::new();
        input.set_args(RepeatedField::from_vec(spec.args));
        proto.set_input(input);
        proto.set_timeout(spec.timeout);
        Ok(proto)
    }
}

proto_bytes_conversions!(ChaincodeSpec, protos::chaincode::ChaincodeSpec);

/// The chaincode and arguments a proposal invokes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeInvocationSpec {
    chaincode_spec: Option<ChaincodeSpec>,
}

impl ChaincodeInvocationSpec {
    pub fn new(chaincode_spec: ChaincodeSpec) -> Self {
        ChaincodeInvocationSpec {
            chaincode_spec: Some(chaincode_spec),
        }
    }

    pub fn chaincode_spec(&self) -> Option<&ChaincodeSpec> {
        self.chaincode_spec.as_ref()
    }

    /// The invocation arguments, empty when the spec carries no input.
    pub fn args(&self) -> &[Vec<u8>] {
        self.chaincode_spec
            .as_ref()
            .map(|spec| spec.args())
            .unwrap_or_default()
    }
}

impl FromProto<protos::chaincode::ChaincodeInvocationSpec> for ChaincodeInvocationSpec {
    fn from_proto(
        mut spec: protos::chaincode::ChaincodeInvocationSpec,
    ) -> Result<Self, ProtoConversionError> {
        let chaincode_spec = if spec.has_chaincode_spec() {
            Some(ChaincodeSpec::from_proto(spec.take_chaincode_spec())?)
        } else {
            None
        };
        Ok(ChaincodeInvocationSpec { chaincode_spec })
    }
}

impl FromNative<ChaincodeInvocationSpec> for protos::chaincode::ChaincodeInvocationSpec {
    fn from_native(spec: ChaincodeInvocationSpec) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::chaincode::ChaincodeInvocationSpec::new();
        if let Some(chaincode_spec) = spec.chaincode_spec {
            proto.set_chaincode_spec(chaincode_spec.into_proto()?);
        }
        Ok(proto)
    }
}

proto_bytes_conversions!(
    ChaincodeInvocationSpec,
    protos::chaincode::ChaincodeInvocationSpec
);

/// The chaincode a deploy or upgrade installs, passed to the lifecycle chaincode as an argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeDeploymentSpec {
    chaincode_spec: Option<ChaincodeSpec>,
    code_package: Vec<u8>,
}

impl ChaincodeDeploymentSpec {
    pub fn new(chaincode_spec: ChaincodeSpec, code_package: Vec<u8>) -> Self {
        ChaincodeDeploymentSpec {
            chaincode_spec: Some(chaincode_spec),
            code_package,
        }
    }

    pub fn chaincode_spec(&self) -> Option<&ChaincodeSpec> {
        self.chaincode_spec.as_ref()
    }

    pub fn chaincode_id(&self) -> Option<&ChaincodeId> {
        self.chaincode_spec
            .as_ref()
            .and_then(|spec| spec.chaincode_id())
    }

    pub fn code_package(&self) -> &[u8] {
        &self.code_package
    }
}

impl FromProto<protos::chaincode::ChaincodeDeploymentSpec> for ChaincodeDeploymentSpec {
    fn from_proto(
        mut spec: protos::chaincode::ChaincodeDeploymentSpec,
    ) -> Result<Self, ProtoConversionError> {
        let chaincode_spec = if spec.has_chaincode_spec() {
            Some(ChaincodeSpec::from_proto(spec.take_chaincode_spec())?)
        } else {
            None
        };
        Ok(ChaincodeDeploymentSpec {
            chaincode_spec,
            code_package: spec.take_code_package(),
        })
    }
}

impl FromNative<ChaincodeDeploymentSpec> for protos::chaincode::ChaincodeDeploymentSpec {
    fn from_native(spec: ChaincodeDeploymentSpec) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::chaincode::ChaincodeDeploymentSpec::new();
        if let Some(chaincode_spec) = spec.chaincode_spec {
            proto.set_chaincode_spec(chaincode_spec.into_proto()?);
        }
        proto.set_code_package(spec.code_package);
        Ok(proto)
    }
}

proto_bytes_conversions!(
    ChaincodeDeploymentSpec,
    protos::chaincode::ChaincodeDeploymentSpec
);

/// The definition of an instantiated chaincode, stored under its name in the lifecycle
/// namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeData {
    name: String,
    version: String,
    escc: String,
    vscc: String,
    policy: Vec<u8>,
    data: Vec<u8>,
    id: Vec<u8>,
    instantiation_policy: Vec<u8>,
}

impl ChaincodeData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn escc(&self) -> &str {
        &self.escc
    }

    pub fn vscc(&self) -> &str {
        &self.vscc
    }

    /// The serialized endorsement policy.
    pub fn policy(&self) -> &[u8] {
        &self.policy
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// The serialized instantiation policy; empty when the definition carries none.
    pub fn instantiation_policy(&self) -> &[u8] {
        &self.instantiation_policy
    }

    pub fn into_builder(self) -> ChaincodeDataBuilder {
        ChaincodeDataBuilder::new()
            .with_name(self.name)
            .with_version(self.version)
            .with_escc(self.escc)
            .with_vscc(self.vscc)
            .with_policy(self.policy)
            .with_data(self.data)
            .with_id(self.id)
            .with_instantiation_policy(self.instantiation_policy)
    }
}

impl FromProto<protos::chaincode::ChaincodeData> for ChaincodeData {
    fn from_proto(mut data: protos::chaincode::ChaincodeData) -> Result<Self, ProtoConversionError> {
        Ok(ChaincodeData {
            name: data.take_name(),
            version: data.take_version(),
            escc: data.take_escc(),
            vscc: data.take_vscc(),
            policy: data.take_policy(),
            data: data.take_data(),
            id: data.take_id(),
            instantiation_policy: data.take_instantiation_policy(),
        })
    }
}

impl FromNative<ChaincodeData> for protos::chaincode::ChaincodeData {
    fn from_native(data: ChaincodeData) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::chaincode::ChaincodeData::new();
        proto.set_name(data.name);
        proto.set_version(data.version);
        proto.set_escc(data.escc);
        proto.set_vscc(data.vscc);
        proto.set_policy(data.policy);
        proto.set_data(data.data);
        proto.set_id(data.id);
        proto.set_instantiation_policy(data.instantiation_policy);
        Ok(proto)
    }
}

proto_bytes_conversions!(ChaincodeData, protos::chaincode::ChaincodeData);

#[derive(Debug)]
pub enum ChaincodeDataBuildError {
    MissingField(String),
}

impl std::error::Error for ChaincodeDataBuildError {}

impl std::fmt::Display for ChaincodeDataBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ChaincodeDataBuildError::MissingField(ref s) => write!(f, "MissingField: {}", s),
        }
    }
}

#[derive(Default, Clone)]
pub struct ChaincodeDataBuilder {
    name: Option<String>,
    version: Option<String>,
    escc: Option<String>,
    vscc: Option<String>,
    policy: Option<Vec<u8>>,
    data: Option<Vec<u8>>,
    id: Option<Vec<u8>>,
    instantiation_policy: Option<Vec<u8>>,
}

impl ChaincodeDataBuilder {
    pub fn new() -> Self {
        ChaincodeDataBuilder::default()
    }

    pub fn with_name(mut self, name: String) -> ChaincodeDataBuilder {
        self.name = Some(name);
        self
    }

    pub fn with_version(mut self, version: String) -> ChaincodeDataBuilder {
        self.version = Some(version);
        self
    }

    pub fn with_escc(mut self, escc: String) -> ChaincodeDataBuilder {
        self.escc = Some(escc);
        self
    }

    pub fn with_vscc(mut self, vscc: String) -> ChaincodeDataBuilder {
        self.vscc = Some(vscc);
        self
    }

    pub fn with_policy(mut self, policy: Vec<u8>) -> ChaincodeDataBuilder {
        self.policy = Some(policy);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> ChaincodeDataBuilder {
        self.data = Some(data);
        self
    }

    pub fn with_id(mut self, id: Vec<u8>) -> ChaincodeDataBuilder {
        self.id = Some(id);
        self
    }

    pub fn with_instantiation_policy(mut self, policy: Vec<u8>) -> ChaincodeDataBuilder {
        self.instantiation_policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<ChaincodeData, ChaincodeDataBuildError> {
        let name = self.name.ok_or_else(|| {
            ChaincodeDataBuildError::MissingField("'name' field is required".to_string())
        })?;
        let version = self.version.ok_or_else(|| {
            ChaincodeDataBuildError::MissingField("'version' field is required".to_string())
        })?;

        Ok(ChaincodeData {
            name,
            version,
            escc: self.escc.unwrap_or_else(|| "escc".to_string()),
            vscc: self.vscc.unwrap_or_else(|| "vscc".to_string()),
            policy: self.policy.unwrap_or_default(),
            data: self.data.unwrap_or_default(),
            id: self.id.unwrap_or_default(),
            instantiation_policy: self.instantiation_policy.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protos::{FromBytes, IntoBytes};

    #[test]
    fn chaincode_data_builder() {
        let data = ChaincodeDataBuilder::new()
            .with_name("mycc".into())
            .with_version("1".into())
            .with_instantiation_policy(vec![1, 2, 3])
            .build()
            .unwrap();

        assert_eq!("mycc", data.name());
        assert_eq!("1", data.version());
        assert_eq!("escc", data.escc());
        assert_eq!("vscc", data.vscc());
        assert_eq!(&[1, 2, 3], data.instantiation_policy());

        let bytes = data.clone().into_bytes().unwrap();
        assert_eq!(data, ChaincodeData::from_bytes(&bytes).unwrap());
    }

    #[test]
    fn chaincode_data_builder_requires_version() {
        match ChaincodeDataBuilder::new().with_name("mycc".into()).build() {
            Err(ChaincodeDataBuildError::MissingField(_)) => (),
            res => panic!("expected a missing field error, got {:?}", res),
        }
    }

    #[test]
    // a deployment spec without a chaincode spec has no id rather than failing to decode
    fn deployment_spec_without_chaincode_spec() {
        let bytes = ChaincodeDeploymentSpec::default().into_bytes().unwrap();
        let spec = ChaincodeDeploymentSpec::from_bytes(&bytes).unwrap();

        assert!(spec.chaincode_id().is_none());
    }

    #[test]
    fn invocation_spec_args() {
        let spec = ChaincodeInvocationSpec::new(ChaincodeSpec::new(
            ChaincodeId::new("lscc", ""),
            vec![b"deploy".to_vec(), b"mychannel".to_vec()],
        ));
        let bytes = spec.into_bytes().unwrap();
        let decoded = ChaincodeInvocationSpec::from_bytes(&bytes).unwrap();

        assert_eq!(
            &[b"deploy".to_vec(), b"mychannel".to_vec()],
            decoded.args()
        );
        assert_eq!(
            Some("lscc"),
            decoded
                .chaincode_spec()
                .and_then(|spec| spec.chaincode_id())
                .map(|id| id.name())
        );
    }
}

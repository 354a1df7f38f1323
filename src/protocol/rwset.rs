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

//! Read-write sets produced by simulating a proposal.

use protobuf::{Message, RepeatedField};

use crate::protos::rwset::TxReadWriteSet_DataModel;
use crate::protos::{self, FromNative, FromProto, IntoProto, ProtoConversionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    block_num: u64,
    tx_num: u64,
}

impl Version {
    pub fn new(block_num: u64, tx_num: u64) -> Self {
        Version { block_num, tx_num }
    }

    pub fn block_num(&self) -> u64 {
        self.block_num
    }

    pub fn tx_num(&self) -> u64 {
        self.tx_num
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRead {
    key: String,
    version: Option<Version>,
}

impl KvRead {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The version read, or `None` if the key did not exist at simulation time.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvWrite {
    key: String,
    is_delete: bool,
    value: Vec<u8>,
}

impl KvWrite {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_delete(&self) -> bool {
        self.is_delete
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvRwSet {
    reads: Vec<KvRead>,
    writes: Vec<KvWrite>,
}

impl KvRwSet {
    pub fn reads(&self) -> &[KvRead] {
        &self.reads
    }

    pub fn writes(&self) -> &[KvWrite] {
        &self.writes
    }
}

/// The reads and writes of a single namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsReadWriteSet {
    namespace: String,
    rwset: KvRwSet,
}

impl NsReadWriteSet {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn rwset(&self) -> &KvRwSet {
        &self.rwset
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxReadWriteSet {
    ns_rwsets: Vec<NsReadWriteSet>,
}

impl TxReadWriteSet {
    pub fn ns_rwsets(&self) -> &[NsReadWriteSet] {
        &self.ns_rwsets
    }

    /// Returns the read-write set of `namespace`, if the transaction touched it.
    pub fn namespace(&self, namespace: &str) -> Option<&NsReadWriteSet> {
        self.ns_rwsets
            .iter()
            .find(|ns_rwset| ns_rwset.namespace == namespace)
    }

    pub fn is_empty(&self) -> bool {
        self.ns_rwsets.is_empty()
    }
}

impl FromProto<protos::rwset::KVRead> for KvRead {
    fn from_proto(mut read: protos::rwset::KVRead) -> Result<Self, ProtoConversionError> {
        let version = if read.has_version() {
            let version = read.take_version();
            Some(Version::new(version.get_block_num(), version.get_tx_num()))
        } else {
            None
        };
        Ok(KvRead {
            key: read.take_key(),
            version,
        })
    }
}

impl FromNative<KvRead> for protos::rwset::KVRead {
    fn from_native(read: KvRead) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::rwset::KVRead::new();
        proto.set_key(read.key);
        if let Some(version) = read.version {
            let mut proto_version = protos::rwset::Version::new();
            proto_version.set_block_num(version.block_num);
            proto_version.set_tx_num(version.tx_num);
            proto.set_version(proto_version);
        }
        Ok(proto)
    }
}

impl FromProto<protos::rwset::KVWrite> for KvWrite {
    fn from_proto(mut write: protos::rwset::KVWrite) -> Result<Self, ProtoConversionError> {
        Ok(KvWrite {
            key: write.take_key(),
            is_delete: write.get_is_delete(),
            value: write.take_value(),
        })
    }
}

impl FromNative<KvWrite> for protos::rwset::KVWrite {
    fn from_native(write: KvWrite) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::rwset::KVWrite::new();
        proto.set_key(write.key);
        proto.set_is_delete(write.is_delete);
        proto.set_value(write.value);
        Ok(proto)
    }
}

impl IntoProto<protos::rwset::KVRead> for KvRead {}
impl IntoProto<protos::rwset::KVWrite> for KvWrite {}

impl FromProto<protos::rwset::KVRWSet> for KvRwSet {
    fn from_proto(mut rwset: protos::rwset::KVRWSet) -> Result<Self, ProtoConversionError> {
        Ok(KvRwSet {
            reads: rwset
                .take_reads()
                .into_iter()
                .map(KvRead::from_proto)
                .collect::<Result<_, _>>()?,
            writes: rwset
                .take_writes()
                .into_iter()
                .map(KvWrite::from_proto)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl FromNative<KvRwSet> for protos::rwset::KVRWSet {
    fn from_native(rwset: KvRwSet) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::rwset::KVRWSet::new();
        proto.set_reads(RepeatedField::from_vec(
            rwset
                .reads
                .into_iter()
                .map(|read| read.into_proto())
                .collect::<Result<_, _>>()?,
        ));
        proto.set_writes(RepeatedField::from_vec(
            rwset
                .writes
                .into_iter()
                .map(|write| write.into_proto())
                .collect::<Result<_, _>>()?,
        ));
        Ok(proto)
    }
}

proto_bytes_conversions!(KvRwSet, protos::rwset::KVRWSet);

impl FromProto<protos::rwset::NsReadWriteSet> for NsReadWriteSet {
    fn from_proto(
        mut ns_rwset: protos::rwset::NsReadWriteSet,
    ) -> Result<Self, ProtoConversionError> {
        let rwset: protos::rwset::KVRWSet = Message::parse_from_bytes(ns_rwset.get_rwset())
            .map_err(|err| {
                ProtoConversionError::DeserializationError(format!(
                    "unable to get KVRWSet of namespace {}: {}",
                    ns_rwset.get_namespace(),
                    err
                ))
            })?;
        Ok(NsReadWriteSet {
            namespace: ns_rwset.take_namespace(),
            rwset: KvRwSet::from_proto(rwset)?,
        })
    }
}

impl FromNative<NsReadWriteSet> for protos::rwset::NsReadWriteSet {
    fn from_native(ns_rwset: NsReadWriteSet) -> Result<Self, ProtoConversionError> {
        let rwset: protos::rwset::KVRWSet = ns_rwset.rwset.into_proto()?;
        let mut proto = protos::rwset::NsReadWriteSet::new();
        proto.set_namespace(ns_rwset.namespace);
        proto.set_rwset(rwset.write_to_bytes().map_err(|err| {
            ProtoConversionError::SerializationError(format!(
                "unable to get bytes from KVRWSet: {}",
                err
            ))
        })?);
        Ok(proto)
    }
}

impl IntoProto<protos::rwset::NsReadWriteSet> for NsReadWriteSet {}

impl FromProto<protos::rwset::TxReadWriteSet> for TxReadWriteSet {
    fn from_proto(
        mut rwset: protos::rwset::TxReadWriteSet,
    ) -> Result<Self, ProtoConversionError> {
        Ok(TxReadWriteSet {
            ns_rwsets: rwset
                .take_ns_rwset()
                .into_iter()
                .map(NsReadWriteSet::from_proto)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl FromNative<TxReadWriteSet> for protos::rwset::TxReadWriteSet {
    fn from_native(rwset: TxReadWriteSet) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::rwset::TxReadWriteSet::new();
        proto.set_data_model(TxReadWriteSet_DataModel::KV);
        proto.set_ns_rwset(RepeatedField::from_vec(
            rwset
                .ns_rwsets
                .into_iter()
                .map(|ns_rwset| ns_rwset.into_proto())
                .collect::<Result<_, _>>()?,
        ));
        Ok(proto)
    }
}

proto_bytes_conversions!(TxReadWriteSet, protos::rwset::TxReadWriteSet);

/// Accumulates reads and writes per namespace, keeping namespaces in the order they are first
/// touched.
#[derive(Default, Clone)]
pub struct TxReadWriteSetBuilder {
    ns_rwsets: Vec<NsReadWriteSet>,
}

impl TxReadWriteSetBuilder {
    pub fn new() -> Self {
        TxReadWriteSetBuilder::default()
    }

    pub fn with_read(
        mut self,
        namespace: &str,
        key: &str,
        version: Option<Version>,
    ) -> TxReadWriteSetBuilder {
        self.rwset_mut(namespace).reads.push(KvRead {
            key: key.to_string(),
            version,
        });
        self
    }

    pub fn with_write(mut self, namespace: &str, key: &str, value: Vec<u8>) -> TxReadWriteSetBuilder {
        self.rwset_mut(namespace).writes.push(KvWrite {
            key: key.to_string(),
            is_delete: false,
            value,
        });
        self
    }

    pub fn with_delete(mut self, namespace: &str, key: &str) -> TxReadWriteSetBuilder {
        self.rwset_mut(namespace).writes.push(KvWrite {
            key: key.to_string(),
            is_delete: true,
            value: vec![],
        });
        self
    }

    fn rwset_mut(&mut self, namespace: &str) -> &mut KvRwSet {
        let index = match self
            .ns_rwsets
            .iter()
            .position(|ns_rwset| ns_rwset.namespace == namespace)
        {
            Some(index) => index,
            None => {
                self.ns_rwsets.push(NsReadWriteSet {
                    namespace: namespace.to_string(),
                    rwset: KvRwSet::default(),
                });
                self.ns_rwsets.len() - 1
            }
        };
        &mut self.ns_rwsets[index].rwset
    }

    pub fn build(self) -> TxReadWriteSet {
        TxReadWriteSet {
            ns_rwsets: self.ns_rwsets,
        }
    }
}

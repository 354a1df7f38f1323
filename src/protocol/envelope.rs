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

//! Envelopes and the headers carried in their payload.

use std::fmt;

use crate::protos::{self, FromNative, FromProto, ProtoConversionError};

/// The kinds of message an envelope may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    Message,
    Config,
    ConfigUpdate,
    EndorserTransaction,
    OrdererTransaction,
    DeliverSeekInfo,
    ChaincodePackage,
}

impl HeaderType {
    pub fn from_i32(value: i32) -> Option<HeaderType> {
        match value {
            0 => Some(HeaderType::Message),
            1 => Some(HeaderType::Config),
            2 => Some(HeaderType::ConfigUpdate),
            3 => Some(HeaderType::EndorserTransaction),
            4 => Some(HeaderType::OrdererTransaction),
            5 => Some(HeaderType::DeliverSeekInfo),
            6 => Some(HeaderType::ChaincodePackage),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            HeaderType::Message => 0,
            HeaderType::Config => 1,
            HeaderType::ConfigUpdate => 2,
            HeaderType::EndorserTransaction => 3,
            HeaderType::OrdererTransaction => 4,
            HeaderType::DeliverSeekInfo => 5,
            HeaderType::ChaincodePackage => 6,
        }
    }
}

/// A payload together with the creator's signature over it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl Envelope {
    pub fn new(payload: Vec<u8>, signature: Vec<u8>) -> Self {
        Envelope { payload, signature }
    }

    /// The serialized `Payload`; these are the bytes the creator signed.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Envelope {{ payload: {} bytes, signature: {:?} }}",
            self.payload.len(),
            hex::encode(&self.signature)
        )
    }
}

impl FromProto<protos::common::Envelope> for Envelope {
    fn from_proto(mut envelope: protos::common::Envelope) -> Result<Self, ProtoConversionError> {
        Ok(Envelope {
            payload: envelope.take_payload(),
            signature: envelope.take_signature(),
        })
    }
}

impl FromNative<Envelope> for protos::common::Envelope {
    fn from_native(envelope: Envelope) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::common::Envelope::new();
        proto.set_payload(envelope.payload);
        proto.set_signature(envelope.signature);
        Ok(proto)
    }
}

proto_bytes_conversions!(Envelope, protos::common::Envelope);

/// Serialized channel and signature headers, kept as bytes so each decodes on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    channel_header: Vec<u8>,
    signature_header: Vec<u8>,
}

impl Header {
    pub fn new(channel_header: Vec<u8>, signature_header: Vec<u8>) -> Self {
        Header {
            channel_header,
            signature_header,
        }
    }

    pub fn channel_header(&self) -> &[u8] {
        &self.channel_header
    }

    pub fn signature_header(&self) -> &[u8] {
        &self.signature_header
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    header: Option<Header>,
    data: Vec<u8>,
}

impl Payload {
    pub fn new(header: Header, data: Vec<u8>) -> Self {
        Payload {
            header: Some(header),
            data,
        }
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// The serialized message body; a `Transaction` for endorser transactions.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl FromProto<protos::common::Payload> for Payload {
    fn from_proto(mut payload: protos::common::Payload) -> Result<Self, ProtoConversionError> {
        let header = if payload.has_header() {
            let mut header = payload.take_header();
            Some(Header {
                channel_header: header.take_channel_header(),
                signature_header: header.take_signature_header(),
            })
        } else {
            None
        };
        Ok(Payload {
            header,
            data: payload.take_data(),
        })
    }
}

impl FromNative<Payload> for protos::common::Payload {
    fn from_native(payload: Payload) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::common::Payload::new();
        if let Some(header) = payload.header {
            let mut proto_header = protos::common::Header::new();
            proto_header.set_channel_header(header.channel_header);
            proto_header.set_signature_header(header.signature_header);
            proto.set_header(proto_header);
        }
        proto.set_data(payload.data);
        Ok(proto)
    }
}

proto_bytes_conversions!(Payload, protos::common::Payload);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelHeader {
    header_type: i32,
    version: i32,
    channel_id: String,
    tx_id: String,
    epoch: u64,
    extension: Vec<u8>,
}

impl ChannelHeader {
    /// The header type, or `None` if the value is not a known `HeaderType`.
    pub fn header_type(&self) -> Option<HeaderType> {
        HeaderType::from_i32(self.header_type)
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// For endorser transactions, the serialized `ChaincodeHeaderExtension`.
    pub fn extension(&self) -> &[u8] {
        &self.extension
    }
}

impl FromProto<protos::common::ChannelHeader> for ChannelHeader {
    fn from_proto(
        mut header: protos::common::ChannelHeader,
    ) -> Result<Self, ProtoConversionError> {
        Ok(ChannelHeader {
            header_type: header.get_header_type(),
            version: header.get_version(),
            channel_id: header.take_channel_id(),
            tx_id: header.take_tx_id(),
            epoch: header.get_epoch(),
            extension: header.take_extension(),
        })
    }
}

impl FromNative<ChannelHeader> for protos::common::ChannelHeader {
    fn from_native(header: ChannelHeader) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::common::ChannelHeader::new();
        proto.set_header_type(header.header_type);
        proto.set_version(header.version);
        proto.set_channel_id(header.channel_id);
        proto.set_tx_id(header.tx_id);
        proto.set_epoch(header.epoch);
        proto.set_extension(header.extension);
        Ok(proto)
    }
}

proto_bytes_conversions!(ChannelHeader, protos::common::ChannelHeader);

#[derive(Default, Clone)]
pub struct ChannelHeaderBuilder {
    header_type: Option<i32>,
    version: Option<i32>,
    channel_id: Option<String>,
    tx_id: Option<String>,
    epoch: Option<u64>,
    extension: Option<Vec<u8>>,
}

impl ChannelHeaderBuilder {
    pub fn new() -> Self {
        ChannelHeaderBuilder::default()
    }

    pub fn with_header_type(mut self, header_type: HeaderType) -> ChannelHeaderBuilder {
        self.header_type = Some(header_type.as_i32());
        self
    }

    /// Sets a raw header type, including values that are not a known `HeaderType`.
    pub fn with_raw_header_type(mut self, header_type: i32) -> ChannelHeaderBuilder {
        self.header_type = Some(header_type);
        self
    }

    pub fn with_version(mut self, version: i32) -> ChannelHeaderBuilder {
        self.version = Some(version);
        self
    }

    pub fn with_channel_id(mut self, channel_id: String) -> ChannelHeaderBuilder {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn with_tx_id(mut self, tx_id: String) -> ChannelHeaderBuilder {
        self.tx_id = Some(tx_id);
        self
    }

    pub fn with_epoch(mut self, epoch: u64) -> ChannelHeaderBuilder {
        self.epoch = Some(epoch);
        self
    }

    pub fn with_extension(mut self, extension: Vec<u8>) -> ChannelHeaderBuilder {
        self.extension = Some(extension);
        self
    }

    pub fn build(self) -> ChannelHeader {
        ChannelHeader {
            header_type: self
                .header_type
                .unwrap_or_else(|| HeaderType::EndorserTransaction.as_i32()),
            version: self.version.unwrap_or(0),
            channel_id: self.channel_id.unwrap_or_default(),
            tx_id: self.tx_id.unwrap_or_default(),
            epoch: self.epoch.unwrap_or(0),
            extension: self.extension.unwrap_or_default(),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignatureHeader {
    creator: Vec<u8>,
    nonce: Vec<u8>,
}

impl SignatureHeader {
    pub fn new(creator: Vec<u8>, nonce: Vec<u8>) -> Self {
        SignatureHeader { creator, nonce }
    }

    /// The serialized `SerializedIdentity` of the transaction creator.
    pub fn creator(&self) -> &[u8] {
        &self.creator
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }
}

impl fmt::Debug for SignatureHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SignatureHeader {{ creator: {:?}, nonce: {:?} }}",
            hex::encode(&self.creator),
            hex::encode(&self.nonce)
        )
    }
}

impl FromProto<protos::common::SignatureHeader> for SignatureHeader {
    fn from_proto(
        mut header: protos::common::SignatureHeader,
    ) -> Result<Self, ProtoConversionError> {
        Ok(SignatureHeader {
            creator: header.take_creator(),
            nonce: header.take_nonce(),
        })
    }
}

impl FromNative<SignatureHeader> for protos::common::SignatureHeader {
    fn from_native(header: SignatureHeader) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::common::SignatureHeader::new();
        proto.set_creator(header.creator);
        proto.set_nonce(header.nonce);
        Ok(proto)
    }
}

proto_bytes_conversions!(SignatureHeader, protos::common::SignatureHeader);

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

//! Endorser transactions: the proposal, its simulated result and the endorsements over it.

use std::error::Error as StdError;

use protobuf::RepeatedField;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::identity::{MspError, SigningIdentity};
use crate::protos::{self, FromNative, FromProto, IntoBytes, IntoProto, ProtoConversionError};

use super::chaincode::{ChaincodeId, ChaincodeInvocationSpec, ChaincodeSpec};
use super::envelope::{ChannelHeaderBuilder, Envelope, Header, HeaderType, Payload, SignatureHeader};
use super::rwset::TxReadWriteSet;

const DEFAULT_NONCE_SIZE: usize = 24;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    actions: Vec<TransactionAction>,
}

impl Transaction {
    pub fn new(actions: Vec<TransactionAction>) -> Self {
        Transaction { actions }
    }

    pub fn actions(&self) -> &[TransactionAction] {
        &self.actions
    }

    pub fn take_actions(self) -> Vec<TransactionAction> {
        self.actions
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionAction {
    header: Vec<u8>,
    payload: Vec<u8>,
}

impl TransactionAction {
    pub fn new(header: Vec<u8>, payload: Vec<u8>) -> Self {
        TransactionAction { header, payload }
    }

    /// The serialized `SignatureHeader` of the proposal.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// The serialized `ChaincodeActionPayload`.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl FromProto<protos::proposal::TransactionAction> for TransactionAction {
    fn from_proto(
        mut action: protos::proposal::TransactionAction,
    ) -> Result<Self, ProtoConversionError> {
        Ok(TransactionAction {
            header: action.take_header(),
            payload: action.take_payload(),
        })
    }
}

impl FromNative<TransactionAction> for protos::proposal::TransactionAction {
    fn from_native(action: TransactionAction) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::proposal::TransactionAction::new();
        proto.set_header(action.header);
        proto.set_payload(action.payload);
        Ok(proto)
    }
}

impl IntoProto<protos::proposal::TransactionAction> for TransactionAction {}

impl FromProto<protos::proposal::Transaction> for Transaction {
    fn from_proto(
        mut transaction: protos::proposal::Transaction,
    ) -> Result<Self, ProtoConversionError> {
        Ok(Transaction {
            actions: transaction
                .take_actions()
                .into_iter()
                .map(TransactionAction::from_proto)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl FromNative<Transaction> for protos::proposal::Transaction {
    fn from_native(transaction: Transaction) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::proposal::Transaction::new();
        proto.set_actions(RepeatedField::from_vec(
            transaction
                .actions
                .into_iter()
                .map(|action| action.into_proto())
                .collect::<Result<_, _>>()?,
        ));
        Ok(proto)
    }
}

proto_bytes_conversions!(Transaction, protos::proposal::Transaction);

/// A peer's signature over a proposal response.
#[derive(Clone, PartialEq, Eq)]
pub struct Endorsement {
    endorser: Vec<u8>,
    signature: Vec<u8>,
}

impl Endorsement {
    pub fn new(endorser: Vec<u8>, signature: Vec<u8>) -> Self {
        Endorsement {
            endorser,
            signature,
        }
    }

    /// The serialized `SerializedIdentity` of the endorsing peer.
    pub fn endorser(&self) -> &[u8] {
        &self.endorser
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

impl std::fmt::Debug for Endorsement {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Endorsement {{ endorser: {:?}, signature: {:?} }}",
            hex::encode(&self.endorser),
            hex::encode(&self.signature)
        )
    }
}

impl FromProto<protos::proposal::Endorsement> for Endorsement {
    fn from_proto(
        mut endorsement: protos::proposal::Endorsement,
    ) -> Result<Self, ProtoConversionError> {
        Ok(Endorsement {
            endorser: endorsement.take_endorser(),
            signature: endorsement.take_signature(),
        })
    }
}

impl FromNative<Endorsement> for protos::proposal::Endorsement {
    fn from_native(endorsement: Endorsement) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::proposal::Endorsement::new();
        proto.set_endorser(endorsement.endorser);
        proto.set_signature(endorsement.signature);
        Ok(proto)
    }
}

impl IntoProto<protos::proposal::Endorsement> for Endorsement {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeEndorsedAction {
    proposal_response_payload: Vec<u8>,
    endorsements: Vec<Endorsement>,
}

impl ChaincodeEndorsedAction {
    pub fn new(proposal_response_payload: Vec<u8>, endorsements: Vec<Endorsement>) -> Self {
        ChaincodeEndorsedAction {
            proposal_response_payload,
            endorsements,
        }
    }

    /// The serialized `ProposalResponsePayload` every endorsement signs.
    pub fn proposal_response_payload(&self) -> &[u8] {
        &self.proposal_response_payload
    }

    pub fn endorsements(&self) -> &[Endorsement] {
        &self.endorsements
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeActionPayload {
    chaincode_proposal_payload: Vec<u8>,
    action: Option<ChaincodeEndorsedAction>,
}

impl ChaincodeActionPayload {
    pub fn new(chaincode_proposal_payload: Vec<u8>, action: ChaincodeEndorsedAction) -> Self {
        ChaincodeActionPayload {
            chaincode_proposal_payload,
            action: Some(action),
        }
    }

    /// The serialized `ChaincodeProposalPayload`.
    pub fn chaincode_proposal_payload(&self) -> &[u8] {
        &self.chaincode_proposal_payload
    }

    pub fn action(&self) -> Option<&ChaincodeEndorsedAction> {
        self.action.as_ref()
    }
}

impl FromProto<protos::proposal::ChaincodeActionPayload> for ChaincodeActionPayload {
    fn from_proto(
        mut payload: protos::proposal::ChaincodeActionPayload,
    ) -> Result<Self, ProtoConversionError> {
        let action = if payload.has_action() {
            let mut action = payload.take_action();
            Some(ChaincodeEndorsedAction {
                proposal_response_payload: action.take_proposal_response_payload(),
                endorsements: action
                    .take_endorsements()
                    .into_iter()
                    .map(Endorsement::from_proto)
                    .collect::<Result<_, _>>()?,
            })
        } else {
            None
        };
        Ok(ChaincodeActionPayload {
            chaincode_proposal_payload: payload.take_chaincode_proposal_payload(),
            action,
        })
    }
}

impl FromNative<ChaincodeActionPayload> for protos::proposal::ChaincodeActionPayload {
    fn from_native(payload: ChaincodeActionPayload) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::proposal::ChaincodeActionPayload::new();
        proto.set_chaincode_proposal_payload(payload.chaincode_proposal_payload);
        if let Some(action) = payload.action {
            let mut proto_action = protos::proposal::ChaincodeEndorsedAction::new();
            proto_action.set_proposal_response_payload(action.proposal_response_payload);
            proto_action.set_endorsements(RepeatedField::from_vec(
                action
                    .endorsements
                    .into_iter()
                    .map(|endorsement| endorsement.into_proto())
                    .collect::<Result<_, _>>()?,
            ));
            proto.set_action(proto_action);
        }
        Ok(proto)
    }
}

proto_bytes_conversions!(
    ChaincodeActionPayload,
    protos::proposal::ChaincodeActionPayload
);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalResponsePayload {
    proposal_hash: Vec<u8>,
    extension: Vec<u8>,
}

impl ProposalResponsePayload {
    pub fn new(proposal_hash: Vec<u8>, extension: Vec<u8>) -> Self {
        ProposalResponsePayload {
            proposal_hash,
            extension,
        }
    }

    pub fn proposal_hash(&self) -> &[u8] {
        &self.proposal_hash
    }

    /// The serialized `ChaincodeAction`.
    pub fn extension(&self) -> &[u8] {
        &self.extension
    }
}

impl FromProto<protos::proposal::ProposalResponsePayload> for ProposalResponsePayload {
    fn from_proto(
        mut payload: protos::proposal::ProposalResponsePayload,
    ) -> Result<Self, ProtoConversionError> {
        Ok(ProposalResponsePayload {
            proposal_hash: payload.take_proposal_hash(),
            extension: payload.take_extension(),
        })
    }
}

impl FromNative<ProposalResponsePayload> for protos::proposal::ProposalResponsePayload {
    fn from_native(payload: ProposalResponsePayload) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::proposal::ProposalResponsePayload::new();
        proto.set_proposal_hash(payload.proposal_hash);
        proto.set_extension(payload.extension);
        Ok(proto)
    }
}

proto_bytes_conversions!(
    ProposalResponsePayload,
    protos::proposal::ProposalResponsePayload
);

/// The result of simulating a proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeAction {
    results: Vec<u8>,
    events: Vec<u8>,
    response_status: i32,
    response_message: String,
    chaincode_id: Option<ChaincodeId>,
}

impl ChaincodeAction {
    pub fn new(results: Vec<u8>, chaincode_id: ChaincodeId) -> Self {
        ChaincodeAction {
            results,
            events: vec![],
            response_status: 200,
            response_message: String::new(),
            chaincode_id: Some(chaincode_id),
        }
    }

    /// The serialized `TxReadWriteSet`.
    pub fn results(&self) -> &[u8] {
        &self.results
    }

    pub fn events(&self) -> &[u8] {
        &self.events
    }

    pub fn response_status(&self) -> i32 {
        self.response_status
    }

    pub fn response_message(&self) -> &str {
        &self.response_message
    }

    pub fn chaincode_id(&self) -> Option<&ChaincodeId> {
        self.chaincode_id.as_ref()
    }
}

impl FromProto<protos::proposal::ChaincodeAction> for ChaincodeAction {
    fn from_proto(
        mut action: protos::proposal::ChaincodeAction,
    ) -> Result<Self, ProtoConversionError> {
        let chaincode_id = if action.has_chaincode_id() {
            Some(ChaincodeId::from_proto(action.take_chaincode_id())?)
        } else {
            None
        };
        let mut response = action.take_response();
        Ok(ChaincodeAction {
            results: action.take_results(),
            events: action.take_events(),
            response_status: response.get_status(),
            response_message: response.take_message(),
            chaincode_id,
        })
    }
}

impl FromNative<ChaincodeAction> for protos::proposal::ChaincodeAction {
    fn from_native(action: ChaincodeAction) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::proposal::ChaincodeAction::new();
        proto.set_results(action.results);
        proto.set_events(action.events);
        let mut response = protos::proposal::Response::new();
        response.set_status(action.response_status);
        response.set_message(action.response_message);
        proto.set_response(response);
        if let Some(chaincode_id) = action.chaincode_id {
            proto.set_chaincode_id(chaincode_id.into_proto()?);
        }
        Ok(proto)
    }
}

proto_bytes_conversions!(ChaincodeAction, protos::proposal::ChaincodeAction);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeProposalPayload {
    input: Vec<u8>,
}

impl ChaincodeProposalPayload {
    pub fn new(input: Vec<u8>) -> Self {
        ChaincodeProposalPayload { input }
    }

    /// The serialized `ChaincodeInvocationSpec`.
    pub fn input(&self) -> &[u8] {
        &self.input
    }
}

impl FromProto<protos::proposal::ChaincodeProposalPayload> for ChaincodeProposalPayload {
    fn from_proto(
        mut payload: protos::proposal::ChaincodeProposalPayload,
    ) -> Result<Self, ProtoConversionError> {
        Ok(ChaincodeProposalPayload {
            input: payload.take_input(),
        })
    }
}

impl FromNative<ChaincodeProposalPayload> for protos::proposal::ChaincodeProposalPayload {
    fn from_native(payload: ChaincodeProposalPayload) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::proposal::ChaincodeProposalPayload::new();
        proto.set_input(payload.input);
        Ok(proto)
    }
}

proto_bytes_conversions!(
    ChaincodeProposalPayload,
    protos::proposal::ChaincodeProposalPayload
);

/// Carried in the channel header extension; names the chaincode a proposal invokes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaincodeHeaderExtension {
    payload_visibility: Vec<u8>,
    chaincode_id: Option<ChaincodeId>,
}

impl ChaincodeHeaderExtension {
    pub fn new(chaincode_id: ChaincodeId) -> Self {
        ChaincodeHeaderExtension {
            payload_visibility: vec![],
            chaincode_id: Some(chaincode_id),
        }
    }

    pub fn payload_visibility(&self) -> &[u8] {
        &self.payload_visibility
    }

    pub fn chaincode_id(&self) -> Option<&ChaincodeId> {
        self.chaincode_id.as_ref()
    }
}

impl FromProto<protos::proposal::ChaincodeHeaderExtension> for ChaincodeHeaderExtension {
    fn from_proto(
        mut extension: protos::proposal::ChaincodeHeaderExtension,
    ) -> Result<Self, ProtoConversionError> {
        let chaincode_id = if extension.has_chaincode_id() {
            Some(ChaincodeId::from_proto(extension.take_chaincode_id())?)
        } else {
            None
        };
        Ok(ChaincodeHeaderExtension {
            payload_visibility: extension.take_payload_visibility(),
            chaincode_id,
        })
    }
}

impl FromNative<ChaincodeHeaderExtension> for protos::proposal::ChaincodeHeaderExtension {
    fn from_native(extension: ChaincodeHeaderExtension) -> Result<Self, ProtoConversionError> {
        let mut proto = protos::proposal::ChaincodeHeaderExtension::new();
        proto.set_payload_visibility(extension.payload_visibility);
        if let Some(chaincode_id) = extension.chaincode_id {
            proto.set_chaincode_id(chaincode_id.into_proto()?);
        }
        Ok(proto)
    }
}

proto_bytes_conversions!(
    ChaincodeHeaderExtension,
    protos::proposal::ChaincodeHeaderExtension
);

#[derive(Debug)]
pub enum TransactionBuildError {
    MissingField(String),
    SerializationError(String),
    SigningError(String),
}

impl StdError for TransactionBuildError {}

impl std::fmt::Display for TransactionBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            TransactionBuildError::MissingField(ref s) => write!(f, "MissingField: {}", s),
            TransactionBuildError::SerializationError(ref s) => {
                write!(f, "SerializationError: {}", s)
            }
            TransactionBuildError::SigningError(ref s) => write!(f, "SigningError: {}", s),
        }
    }
}

impl From<ProtoConversionError> for TransactionBuildError {
    fn from(e: ProtoConversionError) -> Self {
        TransactionBuildError::SerializationError(format!("{}", e))
    }
}

impl From<MspError> for TransactionBuildError {
    fn from(err: MspError) -> Self {
        match err {
            MspError::SigningError(_) => TransactionBuildError::SigningError(err.to_string()),
            _ => TransactionBuildError::SerializationError(err.to_string()),
        }
    }
}

/// Builds a signed, endorsed transaction envelope.
///
/// Every endorser signs the same proposal response, which carries the read-write set; the
/// creator signs the envelope payload.
#[derive(Default, Clone)]
pub struct EndorserTransactionBuilder {
    channel_id: Option<String>,
    header_type: Option<i32>,
    tx_id: Option<String>,
    chaincode_id: Option<ChaincodeId>,
    args: Option<Vec<Vec<u8>>>,
    rwset: Option<TxReadWriteSet>,
    nonce: Option<Vec<u8>>,
}

impl EndorserTransactionBuilder {
    pub fn new() -> Self {
        EndorserTransactionBuilder::default()
    }

    pub fn with_channel_id(mut self, channel_id: String) -> EndorserTransactionBuilder {
        self.channel_id = Some(channel_id);
        self
    }

    /// Overrides the header type, which defaults to `EndorserTransaction`.
    pub fn with_header_type(mut self, header_type: i32) -> EndorserTransactionBuilder {
        self.header_type = Some(header_type);
        self
    }

    pub fn with_tx_id(mut self, tx_id: String) -> EndorserTransactionBuilder {
        self.tx_id = Some(tx_id);
        self
    }

    /// The chaincode the transaction invokes.
    pub fn with_chaincode_id(mut self, chaincode_id: ChaincodeId) -> EndorserTransactionBuilder {
        self.chaincode_id = Some(chaincode_id);
        self
    }

    pub fn with_args(mut self, args: Vec<Vec<u8>>) -> EndorserTransactionBuilder {
        self.args = Some(args);
        self
    }

    pub fn with_rwset(mut self, rwset: TxReadWriteSet) -> EndorserTransactionBuilder {
        self.rwset = Some(rwset);
        self
    }

    pub fn with_nonce(mut self, nonce: Vec<u8>) -> EndorserTransactionBuilder {
        self.nonce = Some(nonce);
        self
    }

    pub fn build_envelope(
        self,
        creator: &SigningIdentity,
        endorsers: &[&SigningIdentity],
    ) -> Result<Envelope, TransactionBuildError> {
        let channel_id = self.channel_id.ok_or_else(|| {
            TransactionBuildError::MissingField("'channel_id' field is required".to_string())
        })?;
        let chaincode_id = self.chaincode_id.ok_or_else(|| {
            TransactionBuildError::MissingField("'chaincode_id' field is required".to_string())
        })?;
        let args = self.args.unwrap_or_default();
        let rwset = self.rwset.unwrap_or_default();
        let nonce = self.nonce.unwrap_or_else(|| {
            let mut rng = rand::thread_rng();
            (0..DEFAULT_NONCE_SIZE).map(|_| rng.gen::<u8>()).collect()
        });

        let creator_bytes = creator.serialize()?;
        let tx_id = self.tx_id.unwrap_or_else(|| {
            let mut hasher = Sha256::new();
            hasher.update(&nonce);
            hasher.update(&creator_bytes);
            hex::encode(hasher.finalize())
        });

        let extension = ChaincodeHeaderExtension::new(chaincode_id.clone()).into_bytes()?;
        let channel_header = ChannelHeaderBuilder::new()
            .with_raw_header_type(
                self.header_type
                    .unwrap_or_else(|| HeaderType::EndorserTransaction.as_i32()),
            )
            .with_channel_id(channel_id)
            .with_tx_id(tx_id)
            .with_extension(extension)
            .build()
            .into_bytes()?;
        let signature_header = SignatureHeader::new(creator_bytes, nonce).into_bytes()?;

        let invocation =
            ChaincodeInvocationSpec::new(ChaincodeSpec::new(chaincode_id.clone(), args))
                .into_bytes()?;
        let proposal_payload = ChaincodeProposalPayload::new(invocation).into_bytes()?;

        let proposal_hash = {
            let mut hasher = Sha256::new();
            hasher.update(&channel_header);
            hasher.update(&signature_header);
            hasher.update(&proposal_payload);
            hasher.finalize().to_vec()
        };
        let action = ChaincodeAction::new(rwset.into_bytes()?, chaincode_id).into_bytes()?;
        let response_payload = ProposalResponsePayload::new(proposal_hash, action).into_bytes()?;

        let endorsements = endorsers
            .iter()
            .map(|endorser| {
                let endorser_bytes = endorser.serialize()?;
                let mut signed = response_payload.clone();
                signed.extend_from_slice(&endorser_bytes);
                Ok(Endorsement::new(endorser_bytes, endorser.sign(&signed)?))
            })
            .collect::<Result<Vec<_>, TransactionBuildError>>()?;

        let action_payload = ChaincodeActionPayload::new(
            proposal_payload,
            ChaincodeEndorsedAction::new(response_payload, endorsements),
        )
        .into_bytes()?;
        let transaction = Transaction::new(vec![TransactionAction::new(
            signature_header.clone(),
            action_payload,
        )])
        .into_bytes()?;

        let payload =
            Payload::new(Header::new(channel_header, signature_header), transaction).into_bytes()?;
        let signature = creator.sign(&payload)?;

        Ok(Envelope::new(payload, signature))
    }

    /// Builds the envelope and serializes it.
    pub fn build(
        self,
        creator: &SigningIdentity,
        endorsers: &[&SigningIdentity],
    ) -> Result<Vec<u8>, TransactionBuildError> {
        Ok(self.build_envelope(creator, endorsers)?.into_bytes()?)
    }
}

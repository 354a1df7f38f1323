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

//! Extraction of the parts of an endorser transaction that validation looks at.

use crate::protocol::chaincode::{ChaincodeId, ChaincodeInvocationSpec};
use crate::protocol::envelope::{ChannelHeader, Envelope, HeaderType, Payload, SignatureHeader};
use crate::protocol::rwset::TxReadWriteSet;
use crate::protocol::transaction::{
    ChaincodeAction, ChaincodeActionPayload, ChaincodeHeaderExtension, ChaincodeProposalPayload,
    ProposalResponsePayload, Transaction,
};
use crate::protos::{FromBytes, ProtoConversionError};

use super::error::{InvalidReason, ValidationError};
use super::policy::SignedStatement;

/// The decoded contents of an endorser transaction envelope.
#[derive(Debug, Clone)]
pub struct ExtractedTransaction {
    channel_header: ChannelHeader,
    signature_header: SignatureHeader,
    chaincode_id: ChaincodeId,
    invocation: ChaincodeInvocationSpec,
    action: ChaincodeAction,
    endorsements: Vec<SignedStatement>,
    creator: SignedStatement,
}

impl ExtractedTransaction {
    pub fn channel_header(&self) -> &ChannelHeader {
        &self.channel_header
    }

    pub fn channel_id(&self) -> &str {
        self.channel_header.channel_id()
    }

    pub fn signature_header(&self) -> &SignatureHeader {
        &self.signature_header
    }

    /// The chaincode the transaction invokes, as named in the channel header extension.
    pub fn chaincode_id(&self) -> &ChaincodeId {
        &self.chaincode_id
    }

    /// The arguments the chaincode was invoked with.
    pub fn args(&self) -> &[Vec<u8>] {
        self.invocation.args()
    }

    pub fn action(&self) -> &ChaincodeAction {
        &self.action
    }

    /// One statement per endorsement: the endorser signs the proposal response payload
    /// followed by its own serialized identity.
    pub fn endorsements(&self) -> &[SignedStatement] {
        &self.endorsements
    }

    /// The transaction creator's signature over the envelope payload.
    pub fn creator(&self) -> &SignedStatement {
        &self.creator
    }

    /// Decodes the read-write set the endorsers simulated.
    pub fn read_write_set(&self) -> Result<TxReadWriteSet, ValidationError> {
        if self.action.results().is_empty() {
            return Ok(TxReadWriteSet::default());
        }
        TxReadWriteSet::from_bytes(self.action.results())
            .map_err(|err| malformed("could not unmarshal read-write set", err))
    }
}

/// Decodes an envelope down to its endorsements and chaincode action.
///
/// Any part that fails to decode, a missing header, an empty channel id or a header type
/// other than `EndorserTransaction` makes the transaction `MalformedTransaction`.
pub fn extract(envelope_bytes: &[u8]) -> Result<ExtractedTransaction, ValidationError> {
    let envelope = Envelope::from_bytes(envelope_bytes)
        .map_err(|err| malformed("could not unmarshal envelope", err))?;
    let payload = Payload::from_bytes(envelope.payload())
        .map_err(|err| malformed("could not unmarshal payload", err))?;
    let header = payload.header().ok_or_else(|| {
        ValidationError::invalid(InvalidReason::MalformedTransaction, "payload has no header")
    })?;

    let channel_header = ChannelHeader::from_bytes(header.channel_header())
        .map_err(|err| malformed("could not unmarshal channel header", err))?;
    let signature_header = SignatureHeader::from_bytes(header.signature_header())
        .map_err(|err| malformed("could not unmarshal signature header", err))?;

    if channel_header.channel_id().is_empty() {
        return Err(ValidationError::invalid(
            InvalidReason::MalformedTransaction,
            "channel header has no channel id",
        ));
    }
    if channel_header.header_type() != Some(HeaderType::EndorserTransaction) {
        return Err(ValidationError::invalid(
            InvalidReason::MalformedTransaction,
            format!(
                "only endorser transactions are validated, got header type {:?}",
                channel_header.header_type()
            ),
        ));
    }

    let extension = ChaincodeHeaderExtension::from_bytes(channel_header.extension())
        .map_err(|err| malformed("could not unmarshal chaincode header extension", err))?;
    let chaincode_id = match extension.chaincode_id() {
        Some(id) if !id.name().is_empty() => id.clone(),
        _ => {
            return Err(ValidationError::invalid(
                InvalidReason::MalformedTransaction,
                "chaincode header extension names no chaincode",
            ))
        }
    };

    let mut actions = Transaction::from_bytes(payload.data())
        .map_err(|err| malformed("could not unmarshal transaction", err))?
        .take_actions();
    if actions.len() != 1 {
        return Err(ValidationError::invalid(
            InvalidReason::MalformedTransaction,
            format!("expected exactly one transaction action, got {}", actions.len()),
        ));
    }
    let action = actions.remove(0);

    let action_payload = ChaincodeActionPayload::from_bytes(action.payload())
        .map_err(|err| malformed("could not unmarshal chaincode action payload", err))?;
    let endorsed_action = action_payload.action().ok_or_else(|| {
        ValidationError::invalid(
            InvalidReason::MalformedTransaction,
            "chaincode action payload has no endorsed action",
        )
    })?;

    let response_payload =
        ProposalResponsePayload::from_bytes(endorsed_action.proposal_response_payload())
            .map_err(|err| malformed("could not unmarshal proposal response payload", err))?;
    let chaincode_action = ChaincodeAction::from_bytes(response_payload.extension())
        .map_err(|err| malformed("could not unmarshal chaincode action", err))?;

    let proposal_payload =
        ChaincodeProposalPayload::from_bytes(action_payload.chaincode_proposal_payload())
            .map_err(|err| malformed("could not unmarshal chaincode proposal payload", err))?;
    let invocation = ChaincodeInvocationSpec::from_bytes(proposal_payload.input())
        .map_err(|err| malformed("could not unmarshal chaincode invocation spec", err))?;

    let endorsements = endorsed_action
        .endorsements()
        .iter()
        .map(|endorsement| {
            let mut data = endorsed_action.proposal_response_payload().to_vec();
            data.extend_from_slice(endorsement.endorser());
            SignedStatement::new(
                endorsement.endorser().to_vec(),
                data,
                endorsement.signature().to_vec(),
            )
        })
        .collect();

    let creator = SignedStatement::new(
        signature_header.creator().to_vec(),
        envelope.payload().to_vec(),
        envelope.signature().to_vec(),
    );

    debug!(
        "Extracted transaction {} on channel {} invoking {}",
        channel_header.tx_id(),
        channel_header.channel_id(),
        chaincode_id.name()
    );

    Ok(ExtractedTransaction {
        channel_header,
        signature_header,
        chaincode_id,
        invocation,
        action: chaincode_action,
        endorsements,
        creator,
    })
}

fn malformed(context: &str, err: ProtoConversionError) -> ValidationError {
    ValidationError::invalid(
        InvalidReason::MalformedTransaction,
        format!("{}: {}", context, err),
    )
}

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

//! Identities, signatures and membership.
//!
//! Validation consumes identities only through the [`IdentityProvider`] trait.  The bundled
//! [`MspManager`] resolves identities against statically configured membership service
//! providers whose members are secp256k1 public keys.

mod error;
mod msp;

use cylinder::{Signature, Signer};

use crate::protocol::msp::{Principal, SerializedIdentity};
use crate::protos::IntoBytes;

pub use self::error::MspError;
pub use self::msp::{MspConfig, MspConfigBuilder, MspManager};

/// Verifies signatures and answers membership questions about serialized identities.
pub trait IdentityProvider: Send + Sync {
    /// Returns true if `signature` is a valid signature by `identity` over `data`.
    ///
    /// Identities that cannot be resolved never verify.
    fn verify(&self, identity: &SerializedIdentity, data: &[u8], signature: &[u8]) -> bool;

    /// Returns true if `identity` satisfies `principal`.
    fn is_member(&self, identity: &SerializedIdentity, principal: &Principal) -> bool;
}

/// A signer together with the MSP it is enrolled in.
pub struct SigningIdentity {
    identity: SerializedIdentity,
    signer: Box<dyn Signer>,
}

impl SigningIdentity {
    pub fn new(msp_id: &str, signer: Box<dyn Signer>) -> Result<Self, MspError> {
        let public_key = signer.public_key()?;
        Ok(SigningIdentity {
            identity: SerializedIdentity::new(msp_id, public_key.as_slice().to_vec()),
            signer,
        })
    }

    pub fn identity(&self) -> &SerializedIdentity {
        &self.identity
    }

    pub fn public_key(&self) -> &[u8] {
        self.identity.id_bytes()
    }

    /// The identity in its wire form, as placed in signature headers and endorsements.
    pub fn serialize(&self) -> Result<Vec<u8>, MspError> {
        Ok(self.identity.clone().into_bytes()?)
    }

    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, MspError> {
        let signature: Signature = self.signer.sign(data)?;
        Ok(signature.as_slice().to_vec())
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SigningIdentity {{ identity: {:?} }}", self.identity)
    }
}

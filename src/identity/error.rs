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

use std::error::Error;
use std::fmt;

use cylinder::{SigningError, VerificationError};

use crate::protos::ProtoConversionError;

#[derive(Debug)]
pub enum MspError {
    /// A configuration could not be built.
    InvalidConfig(String),
    /// The identity could not be encoded.
    SerializationError(ProtoConversionError),
    SigningError(SigningError),
    VerificationError(VerificationError),
}

impl fmt::Display for MspError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MspError::InvalidConfig(msg) => write!(f, "Invalid MSP config: {}", msg),
            MspError::SerializationError(err) => write!(f, "Unable to serialize identity: {}", err),
            MspError::SigningError(err) => write!(f, "Unable to sign: {}", err),
            MspError::VerificationError(err) => write!(f, "Unable to verify: {}", err),
        }
    }
}

impl Error for MspError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MspError::InvalidConfig(_) => None,
            MspError::SerializationError(err) => Some(err),
            MspError::SigningError(err) => Some(err),
            MspError::VerificationError(err) => Some(err),
        }
    }
}

impl From<ProtoConversionError> for MspError {
    fn from(err: ProtoConversionError) -> Self {
        MspError::SerializationError(err)
    }
}

impl From<SigningError> for MspError {
    fn from(err: SigningError) -> Self {
        MspError::SigningError(err)
    }
}

impl From<VerificationError> for MspError {
    fn from(err: VerificationError) -> Self {
        MspError::VerificationError(err)
    }
}

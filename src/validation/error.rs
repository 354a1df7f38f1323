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

//! Validation failures and verdicts.
//!
//! A failure is either `Invalid`, a deterministic ruling every node reaches for the same
//! inputs, or `Intermittent`, a local failure to reach any ruling.  The two are never
//! converted into one another.

use std::error::Error;
use std::fmt;

use crate::ledger::QueryError;
use crate::protos::ProtoConversionError;

/// Status of a transaction that passed validation.
pub const OK: i32 = 200;
/// Status of a transaction that is invalid.
pub const ERROR: i32 = 500;
/// Status of a transaction that could not be validated for local reasons, and should be
/// validated again later.
pub const INTERMITTENT_ERROR: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    MalformedTransaction,
    MalformedPolicy,
    PolicyNotSatisfied,
    DuplicateIdentityUse,
    NoSuchChaincode,
    ChaincodeExists,
    VersionUnchanged,
    InstantiationPolicyNotSatisfied,
    InvalidLifecycleFunction,
    UnexpectedWrite,
    ArgMismatch,
    MalformedCollectionConfig,
    DuplicateCollectionName,
    ForbiddenCollectionUpdate,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            InvalidReason::MalformedTransaction => "MalformedTransaction",
            InvalidReason::MalformedPolicy => "MalformedPolicy",
            InvalidReason::PolicyNotSatisfied => "PolicyNotSatisfied",
            InvalidReason::DuplicateIdentityUse => "DuplicateIdentityUse",
            InvalidReason::NoSuchChaincode => "NoSuchChaincode",
            InvalidReason::ChaincodeExists => "ChaincodeExists",
            InvalidReason::VersionUnchanged => "VersionUnchanged",
            InvalidReason::InstantiationPolicyNotSatisfied => "InstantiationPolicyNotSatisfied",
            InvalidReason::InvalidLifecycleFunction => "InvalidLifecycleFunction",
            InvalidReason::UnexpectedWrite => "UnexpectedWrite",
            InvalidReason::ArgMismatch => "ArgMismatch",
            InvalidReason::MalformedCollectionConfig => "MalformedCollectionConfig",
            InvalidReason::DuplicateCollectionName => "DuplicateCollectionName",
            InvalidReason::ForbiddenCollectionUpdate => "ForbiddenCollectionUpdate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntermittentReason {
    LedgerUnavailable,
}

impl fmt::Display for IntermittentReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntermittentReason::LedgerUnavailable => f.write_str("LedgerUnavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The transaction is invalid.
    Invalid {
        reason: InvalidReason,
        message: String,
    },
    /// This node cannot currently decide whether the transaction is valid.
    Intermittent {
        reason: IntermittentReason,
        message: String,
    },
}

impl ValidationError {
    pub fn invalid<S: Into<String>>(reason: InvalidReason, message: S) -> Self {
        ValidationError::Invalid {
            reason,
            message: message.into(),
        }
    }

    pub fn intermittent<S: Into<String>>(reason: IntermittentReason, message: S) -> Self {
        ValidationError::Intermittent {
            reason,
            message: message.into(),
        }
    }

    pub fn is_intermittent(&self) -> bool {
        match self {
            ValidationError::Invalid { .. } => false,
            ValidationError::Intermittent { .. } => true,
        }
    }

    /// The reason of an invalid transaction, or `None` for intermittent failures.
    pub fn invalid_reason(&self) -> Option<InvalidReason> {
        match self {
            ValidationError::Invalid { reason, .. } => Some(*reason),
            ValidationError::Intermittent { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ValidationError::Invalid { message, .. } => message,
            ValidationError::Intermittent { message, .. } => message,
        }
    }
}

impl Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::Invalid { reason, message } => write!(f, "{}: {}", reason, message),
            ValidationError::Intermittent { reason, message } => {
                write!(f, "Intermittent {}: {}", reason, message)
            }
        }
    }
}

impl From<QueryError> for ValidationError {
    fn from(err: QueryError) -> Self {
        ValidationError::intermittent(IntermittentReason::LedgerUnavailable, err.to_string())
    }
}

/// Decoding failures are attributed to the transaction; callers decoding policies or
/// collection configs map them to a more specific reason.
impl From<ProtoConversionError> for ValidationError {
    fn from(err: ProtoConversionError) -> Self {
        ValidationError::invalid(InvalidReason::MalformedTransaction, err.to_string())
    }
}

/// The verdict on one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(InvalidReason, String),
    Intermittent(IntermittentReason, String),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        *self == ValidationOutcome::Valid
    }

    pub fn is_intermittent(&self) -> bool {
        match self {
            ValidationOutcome::Intermittent(..) => true,
            _ => false,
        }
    }

    pub fn invalid_reason(&self) -> Option<InvalidReason> {
        match self {
            ValidationOutcome::Invalid(reason, _) => Some(*reason),
            _ => None,
        }
    }
}

impl From<ValidationError> for ValidationOutcome {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Invalid { reason, message } => {
                ValidationOutcome::Invalid(reason, message)
            }
            ValidationError::Intermittent { reason, message } => {
                ValidationOutcome::Intermittent(reason, message)
            }
        }
    }
}

impl From<Result<(), ValidationError>> for ValidationOutcome {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::Valid,
            Err(err) => err.into(),
        }
    }
}

/// The result of the positional entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: i32,
    message: String,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            status: OK,
            message: String::new(),
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Response {
            status: ERROR,
            message: message.into(),
        }
    }

    pub fn intermittent_error<S: Into<String>>(message: S) -> Self {
        Response {
            status: INTERMITTENT_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ValidationOutcome> for Response {
    fn from(outcome: ValidationOutcome) -> Self {
        match outcome {
            ValidationOutcome::Valid => Response::ok(),
            ValidationOutcome::Invalid(_, message) => Response::error(message),
            ValidationOutcome::Intermittent(_, message) => Response::intermittent_error(message),
        }
    }
}

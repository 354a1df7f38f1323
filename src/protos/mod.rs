/*
 * Copyright 2018 Bitwise IO, Inc.
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

//! Generated protobuf messages and the traits used to convert between them and the native
//! structs in [`protocol`](crate::protocol).

use std::error::Error as StdError;
use std::fmt;

include!(concat!(env!("OUT_DIR"), "/protos/mod.rs"));

/// Converts a protobuf message into its native counterpart.
pub trait FromProto<P>: Sized {
    fn from_proto(other: P) -> Result<Self, ProtoConversionError>;
}

/// Converts a native struct into its protobuf counterpart.
pub trait FromNative<N>: Sized {
    fn from_native(other: N) -> Result<Self, ProtoConversionError>;
}

pub trait FromBytes<N>: Sized {
    fn from_bytes(bytes: &[u8]) -> Result<N, ProtoConversionError>;
}

pub trait IntoNative<T>: Sized
where
    T: FromProto<Self>,
{
    fn into_native(self) -> Result<T, ProtoConversionError> {
        FromProto::from_proto(self)
    }
}

pub trait IntoProto<T>: Sized
where
    T: FromNative<Self>,
{
    fn into_proto(self) -> Result<T, ProtoConversionError> {
        FromNative::from_native(self)
    }
}

pub trait IntoBytes: Sized {
    fn into_bytes(self) -> Result<Vec<u8>, ProtoConversionError>;
}

#[derive(Debug)]
pub enum ProtoConversionError {
    SerializationError(String),
    DeserializationError(String),
    InvalidTypeError(String),
}

impl StdError for ProtoConversionError {}

impl fmt::Display for ProtoConversionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ProtoConversionError::SerializationError(ref s) => {
                write!(f, "SerializationError: {}", s)
            }
            ProtoConversionError::DeserializationError(ref s) => {
                write!(f, "DeserializationError: {}", s)
            }
            ProtoConversionError::InvalidTypeError(ref s) => write!(f, "InvalidTypeError: {}", s),
        }
    }
}

/// Implements `FromBytes`, `IntoBytes`, `IntoProto` and `IntoNative` for a native struct that
/// already implements `FromProto` and `FromNative` against the given protobuf message.
macro_rules! proto_bytes_conversions {
    ($native:ident, $proto:ty) => {
        impl $crate::protos::FromBytes<$native> for $native {
            fn from_bytes(bytes: &[u8]) -> Result<$native, $crate::protos::ProtoConversionError> {
                let proto: $proto = protobuf::Message::parse_from_bytes(bytes).map_err(|err| {
                    $crate::protos::ProtoConversionError::DeserializationError(format!(
                        "unable to get {} from bytes: {}",
                        stringify!($native),
                        err
                    ))
                })?;
                $crate::protos::IntoNative::into_native(proto)
            }
        }

        impl $crate::protos::IntoBytes for $native {
            fn into_bytes(self) -> Result<Vec<u8>, $crate::protos::ProtoConversionError> {
                let proto: $proto = $crate::protos::IntoProto::into_proto(self)?;
                protobuf::Message::write_to_bytes(&proto).map_err(|err| {
                    $crate::protos::ProtoConversionError::SerializationError(format!(
                        "unable to get bytes from {}: {}",
                        stringify!($native),
                        err
                    ))
                })
            }
        }

        impl $crate::protos::IntoProto<$proto> for $native {}
        impl $crate::protos::IntoNative<$native> for $proto {}
    };
}

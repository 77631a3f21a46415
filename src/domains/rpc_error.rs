use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domains::message::MessageBody;

/// Numeric error codes shared with peers in `"error"` bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Timeout,
    NotSupported,
    TemporarilyUnavailable,
    MalformedRequest,
    Crash,
    Abort,
    KeyDoesNotExist,
    KeyAlreadyExists,
    PreconditionFailed,
    TxnConflict,
    Other(u32),
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Timeout => 0,
            Self::NotSupported => 10,
            Self::TemporarilyUnavailable => 11,
            Self::MalformedRequest => 12,
            Self::Crash => 13,
            Self::Abort => 14,
            Self::KeyDoesNotExist => 20,
            Self::KeyAlreadyExists => 21,
            Self::PreconditionFailed => 22,
            Self::TxnConflict => 30,
            Self::Other(code) => code,
        }
    }

    pub fn name(self) -> Cow<'static, str> {
        match self {
            Self::Timeout => Cow::Borrowed("Timeout"),
            Self::NotSupported => Cow::Borrowed("NotSupported"),
            Self::TemporarilyUnavailable => Cow::Borrowed("TemporarilyUnavailable"),
            Self::MalformedRequest => Cow::Borrowed("MalformedRequest"),
            Self::Crash => Cow::Borrowed("Crash"),
            Self::Abort => Cow::Borrowed("Abort"),
            Self::KeyDoesNotExist => Cow::Borrowed("KeyDoesNotExist"),
            Self::KeyAlreadyExists => Cow::Borrowed("KeyAlreadyExists"),
            Self::PreconditionFailed => Cow::Borrowed("PreconditionFailed"),
            Self::TxnConflict => Cow::Borrowed("TxnConflict"),
            Self::Other(code) => Cow::Owned(format!("ErrorCode<{code}>")),
        }
    }

    /// Timeout and crash leave the outcome of the request unknown.
    pub fn is_definite(self) -> bool {
        !matches!(self, Self::Timeout | Self::Crash)
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Timeout,
            10 => Self::NotSupported,
            11 => Self::TemporarilyUnavailable,
            12 => Self::MalformedRequest,
            13 => Self::Crash,
            14 => Self::Abort,
            20 => Self::KeyDoesNotExist,
            21 => Self::KeyAlreadyExists,
            22 => Self::PreconditionFailed,
            30 => Self::TxnConflict,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("RPCError({code}, {text:?})")]
pub struct RpcError {
    pub code: ErrorCode,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: u32,
    pub text: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: "error".to_string(),
            code: self.code.as_u32(),
            text: self.text.clone(),
        }
    }

    /// Recovers the error carried by an `"error"` reply, if the header is one.
    pub fn from_header(header: &MessageBody) -> Option<Self> {
        if header.kind != "error" {
            return None;
        }
        let code = ErrorCode::from(header.code.unwrap_or_default());
        Some(Self::new(code, header.text.clone().unwrap_or_default()))
    }
}

use thiserror::Error;

use crate::domains::rpc_error::RpcError;

#[derive(Debug, Error)]
pub enum VortexError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("malformed body: {0}")]
    MalformedBody(String),
    #[error("no handler for message type {0:?}")]
    NoHandlerForType(String),
    #[error("duplicate message handler for {0:?} message type")]
    DuplicateHandler(String),
    #[error("rpc timed out")]
    Timeout,
    #[error("{0}")]
    Rpc(RpcError),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<RpcError> for VortexError {
    fn from(err: RpcError) -> Self {
        Self::Rpc(err)
    }
}

pub type Result<T> = std::result::Result<T, VortexError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::rpc_error::ErrorCode;

    #[test]
    fn display_names_the_failure() {
        let err = VortexError::Config("x".to_string());
        assert!(format!("{err}").contains("configuration error"));

        let err = VortexError::NoHandlerForType("bogus".to_string());
        assert_eq!(err.to_string(), "no handler for message type \"bogus\"");

        let err: VortexError = RpcError::new(ErrorCode::Crash, "boom").into();
        assert_eq!(err.to_string(), "RPCError(Crash, \"boom\")");
    }
}

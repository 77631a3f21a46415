pub mod message;
pub mod rpc_error;

pub mod config;
pub mod domains;
pub mod error;
pub mod handlers;
pub mod interfaces;
pub mod node;
pub mod runtime;
pub mod services;
pub mod workloads;

pub use crate::config::RuntimeConfig;
pub use crate::domains::message::{Envelope, InitBody, MessageBody};
pub use crate::domains::rpc_error::{ErrorCode, RpcError};
pub use crate::error::{Result, VortexError};
pub use crate::interfaces::handler::Handler;
pub use crate::node::Node;
pub use crate::runtime::Runtime;

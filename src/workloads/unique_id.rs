use std::time::{SystemTime, UNIX_EPOCH};

use rand_core::{OsRng, RngCore};
use serde::Serialize;

use crate::domains::message::Envelope;
use crate::error::{Result, VortexError};
use crate::node::Node;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOk {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
}

/// Wall-clock nanoseconds followed by 64 random bits, as one decimal string.
pub fn next_unique_id() -> Result<String> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| VortexError::Runtime(e.to_string()))?
        .as_nanos();
    Ok(format!("{nanos}{}", OsRng.next_u64()))
}

pub async fn generate(node: Node, msg: Envelope) -> Result<()> {
    let body = GenerateOk {
        kind: "generate_ok",
        id: next_unique_id()?,
    };
    node.reply(&msg, &body).await
}

pub fn register(runtime: &mut Runtime) -> Result<()> {
    runtime.handle("generate", generate)?;
    Ok(())
}

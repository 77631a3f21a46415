use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domains::message::Envelope;
use crate::error::Result;
use crate::node::Node;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Deserialize)]
pub struct Echo {
    pub echo: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct EchoOk {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub echo: Value,
}

pub async fn echo(node: Node, msg: Envelope) -> Result<()> {
    let request: Echo = msg.decode_body()?;
    let body = EchoOk {
        kind: "echo_ok",
        echo: request.echo,
    };
    node.reply(&msg, &body).await
}

pub fn register(runtime: &mut Runtime) -> Result<()> {
    runtime.handle("echo", echo)?;
    Ok(())
}

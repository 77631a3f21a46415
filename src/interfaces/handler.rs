use std::future::Future;

use async_trait::async_trait;

use crate::domains::message::Envelope;
use crate::error::Result;
use crate::node::Node;

/// Processes fresh requests of one message type.
///
/// Plain `async fn(Node, Envelope) -> Result<()>` functions and closures
/// returning such futures are handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, node: Node, msg: Envelope) -> Result<()>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Node, Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, node: Node, msg: Envelope) -> Result<()> {
        (self)(node, msg).await
    }
}

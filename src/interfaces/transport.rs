use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::error::Result;

pub type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Destination for outbound envelopes, one complete line per call.
#[async_trait]
pub trait LineSink: Send + Sync {
    async fn write_line(&self, line: &[u8]) -> Result<()>;
}

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::handlers::registry::HandlerRegistry;
use crate::interfaces::handler::Handler;
use crate::interfaces::transport::LineSink;
use crate::node::Node;
use crate::services::dispatch::Dispatcher;
use crate::services::transport::{read_lines, LineWriter};

/// Collects handlers at setup time, then owns the dispatch loop.
///
/// ```ignore
/// let mut runtime = Runtime::new(RuntimeConfig::default());
/// runtime.handle("echo", echo)?;
/// runtime.run_stdio().await?;
/// ```
pub struct Runtime {
    config: RuntimeConfig,
    registry: HandlerRegistry,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            registry: HandlerRegistry::new(),
        }
    }

    /// Fails with `DuplicateHandler` if `kind` already has a handler.
    pub fn handle<H>(&mut self, kind: &str, handler: H) -> Result<&mut Self>
    where
        H: Handler + 'static,
    {
        self.registry.register(kind, Arc::new(handler))?;
        Ok(self)
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.registry.types()
    }

    pub async fn run<R, W>(self, input: R, output: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.run_with_sink(input, Arc::new(LineWriter::new(output)))
            .await
    }

    pub async fn run_with_sink<R>(self, input: R, sink: Arc<dyn LineSink>) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.config.validate()?;
        tracing::info!(handlers = ?self.registry.types(), "node starting");
        let node = Node::new(sink, &self.config);
        let mut dispatcher = Dispatcher::new(node, self.registry, &self.config);
        dispatcher.run(read_lines(input)).await
    }

    pub async fn run_stdio(self) -> Result<()> {
        self.run(tokio::io::stdin(), tokio::io::stdout()).await
    }
}

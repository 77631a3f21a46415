use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::Semaphore;

use crate::config::RuntimeConfig;
use crate::domains::message::{Envelope, InitBody, MessageBody};
use crate::error::{Result, VortexError};
use crate::handlers::registry::HandlerRegistry;
use crate::interfaces::handler::Handler;
use crate::node::Node;

enum Next {
    OutputFailed,
    Line(Option<Result<Vec<u8>>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Running,
    Draining,
    Stopped,
}

/// Reads envelopes in arrival order and routes each one either to the
/// continuation waiting on it or to the handler registered for its type.
pub struct Dispatcher {
    node: Node,
    registry: HandlerRegistry,
    admission: Option<Arc<Semaphore>>,
    state: DispatchState,
}

impl Dispatcher {
    pub fn new(node: Node, registry: HandlerRegistry, config: &RuntimeConfig) -> Self {
        Self {
            node,
            registry,
            admission: config
                .max_in_flight
                .map(|limit| Arc::new(Semaphore::new(limit))),
            state: DispatchState::Running,
        }
    }

    fn transition(&mut self, next: DispatchState) {
        tracing::debug!(from = ?self.state, to = ?next, "dispatch state");
        self.state = next;
    }

    /// Returns the first fatal error, or `Ok(())` once the input ended and
    /// every in-flight handler finished.
    pub async fn run<S>(&mut self, mut lines: S) -> Result<()>
    where
        S: Stream<Item = Result<Vec<u8>>> + Unpin,
    {
        let mut fatal = self.node.subscribe_fatal();
        loop {
            let next = tokio::select! {
                biased;
                Ok(()) = fatal.changed() => Next::OutputFailed,
                line = lines.next() => Next::Line(line),
            };
            let line = match next {
                Next::OutputFailed => {
                    let reason = fatal.borrow_and_update().clone();
                    match reason {
                        Some(reason) => return self.stop(VortexError::Transport(reason)),
                        None => continue,
                    }
                }
                Next::Line(None) => break,
                Next::Line(Some(line)) => line,
            };
            let routed = match line {
                Ok(line) => self.dispatch(&line).await,
                Err(err) => Err(err),
            };
            if let Err(err) = routed {
                return self.stop(err);
            }
        }

        self.transition(DispatchState::Draining);
        self.node.tasks().wait().await;
        self.transition(DispatchState::Stopped);

        let reason = fatal.borrow().clone();
        match reason {
            Some(reason) => Err(VortexError::Transport(reason)),
            None => Ok(()),
        }
    }

    fn stop(&mut self, err: VortexError) -> Result<()> {
        tracing::error!(error = %err, "dispatch loop stopped");
        self.transition(DispatchState::Stopped);
        Err(err)
    }

    async fn dispatch(&self, line: &[u8]) -> Result<()> {
        let msg = Envelope::decode(line)?;
        let header = msg.header()?;
        tracing::debug!(src = msg.src(), body = msg.body().get(), "received");

        if let Some(in_reply_to) = header.in_reply_to {
            if !self.node.resolve_reply(in_reply_to, msg) {
                tracing::info!(in_reply_to, "ignoring reply with no callback");
            }
            return Ok(());
        }

        if header.kind == "init" {
            self.dispatch_init(msg);
            return Ok(());
        }

        let handler = self
            .registry
            .get(&header.kind)
            .ok_or_else(|| VortexError::NoHandlerForType(header.kind.clone()))?;

        if !self.node.is_initialized() {
            tracing::warn!(kind = %header.kind, src = msg.src(), "dropping message received before init");
            return Ok(());
        }

        // Permits are taken by the handler task, never by the loop, so
        // replies behind a throttled request are still routed.
        let admission = self.admission.clone();
        let node = self.node.clone();
        let kind = header.kind;
        self.node.tasks().spawn(async move {
            let _permit = match admission {
                Some(admission) => match admission.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(err) => {
                        tracing::warn!(kind = %kind, error = %err, "admission closed");
                        return;
                    }
                },
                None => None,
            };
            if let Err(err) = handler.handle(node, msg).await {
                tracing::warn!(kind = %kind, error = %err, "handler error");
            }
        });
        Ok(())
    }

    // Identity is set here, before the next line is read, so no handler can
    // observe an uninitialised node once init has been routed.
    fn dispatch_init(&self, msg: Envelope) {
        let initialized = msg
            .decode_body::<InitBody>()
            .and_then(|init| self.node.init(&init.node_id, init.node_ids));
        if let Err(err) = initialized {
            tracing::warn!(error = %err, src = msg.src(), "init failed");
            return;
        }
        tracing::info!(node_id = %self.node.id(), peers = ?self.node.node_ids(), "node initialized");

        let app_init = self.registry.get("init");
        let node = self.node.clone();
        self.node.tasks().spawn(async move {
            if let Err(err) = complete_init(node, app_init, msg).await {
                tracing::warn!(error = %err, "init handler error");
            }
        });
    }
}

async fn complete_init(node: Node, app_init: Option<Arc<dyn Handler>>, msg: Envelope) -> Result<()> {
    if let Some(handler) = app_init {
        handler.handle(node.clone(), msg.clone()).await?;
    }
    node.reply(&msg, &MessageBody::of_type("init_ok")).await
}

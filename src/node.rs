use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{oneshot, watch};

use crate::config::RuntimeConfig;
use crate::domains::message::Envelope;
use crate::domains::rpc_error::RpcError;
use crate::error::{Result, VortexError};
use crate::interfaces::transport::LineSink;
use crate::services::correlation::{Continuation, CorrelationTable};
use crate::services::tasks::TaskGroup;

/// Handle to the running node, shared with every handler and continuation.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    state: Mutex<NodeState>,
    sink: Arc<dyn LineSink>,
    tasks: TaskGroup,
    fatal: watch::Sender<Option<String>>,
    default_rpc_timeout: Duration,
}

struct NodeState {
    id: String,
    node_ids: Vec<String>,
    initialized: bool,
    next_msg_id: u64,
    pending: CorrelationTable,
}

impl NodeState {
    fn allocate_msg_id(&mut self) -> u64 {
        let id = self.next_msg_id;
        self.next_msg_id += 1;
        id
    }
}

impl Node {
    pub fn new(sink: Arc<dyn LineSink>, config: &RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                state: Mutex::new(NodeState {
                    id: String::new(),
                    node_ids: Vec::new(),
                    initialized: false,
                    next_msg_id: 1,
                    pending: CorrelationTable::new(),
                }),
                sink,
                tasks: TaskGroup::new(),
                fatal: watch::channel(None).0,
                default_rpc_timeout: config.default_rpc_timeout(),
            }),
        }
    }

    // Nothing under this lock can panic halfway through a mutation, so a
    // poisoned guard still holds consistent state.
    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn tasks(&self) -> &TaskGroup {
        &self.inner.tasks
    }

    /// Carries the first output failure; the dispatch loop stops on it.
    pub(crate) fn subscribe_fatal(&self) -> watch::Receiver<Option<String>> {
        self.inner.fatal.subscribe()
    }

    pub fn id(&self) -> String {
        self.state().id.clone()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.state().node_ids.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    pub fn init(&self, id: &str, node_ids: Vec<String>) -> Result<()> {
        let mut state = self.state();
        if state.initialized {
            return Err(VortexError::Config(format!(
                "node already initialized as {:?}",
                state.id
            )));
        }
        state.id = id.to_string();
        state.node_ids = node_ids;
        state.initialized = true;
        Ok(())
    }

    pub fn next_msg_id(&self) -> u64 {
        self.state().allocate_msg_id()
    }

    pub fn pending_rpcs(&self) -> usize {
        self.state().pending.len()
    }

    pub fn default_rpc_timeout(&self) -> Duration {
        self.inner.default_rpc_timeout
    }

    pub async fn send<B: Serialize + ?Sized>(&self, dest: &str, body: &B) -> Result<()> {
        let envelope = Envelope::new(&self.id(), dest, body)?;
        self.send_envelope(&envelope).await
    }

    async fn send_envelope(&self, envelope: &Envelope) -> Result<()> {
        let line = envelope.encode()?;
        tracing::debug!(dest = envelope.dest(), body = envelope.body().get(), "sent");
        if let Err(err) = self.inner.sink.write_line(&line).await {
            let reason = match &err {
                VortexError::Transport(reason) => reason.clone(),
                other => other.to_string(),
            };
            self.inner.fatal.send_if_modified(|slot| {
                if slot.is_some() {
                    return false;
                }
                *slot = Some(reason);
                true
            });
            return Err(err);
        }
        Ok(())
    }

    /// Sends `body` back to the request's source with `in_reply_to` set to
    /// the request's `msg_id`, overriding any value already in `body`.
    pub async fn reply<B: Serialize + ?Sized>(&self, request: &Envelope, body: &B) -> Result<()> {
        let header = request.header()?;
        let msg_id = header.msg_id.ok_or_else(|| {
            VortexError::MalformedBody(format!(
                "cannot reply to {:?} message without msg_id",
                header.kind
            ))
        })?;
        let mut body = body_object(body)?;
        body.insert("in_reply_to".to_string(), Value::from(msg_id));
        self.send(request.src(), &body).await
    }

    pub async fn reply_error(&self, request: &Envelope, err: &RpcError) -> Result<()> {
        self.reply(request, &err.to_body()).await
    }

    /// Sends `body` with a fresh `msg_id` and runs `continuation` exactly
    /// once: with the matching reply, or with [`VortexError::Timeout`] once
    /// `timeout` elapses. Returns the assigned `msg_id`.
    ///
    /// If the send itself fails the call is unregistered, the continuation is
    /// dropped unrun and the transport error is returned. The timeout clock
    /// starts once the send has completed.
    pub async fn rpc<B, F, Fut>(
        &self,
        dest: &str,
        body: &B,
        timeout: Duration,
        continuation: F,
    ) -> Result<u64>
    where
        B: Serialize + ?Sized,
        F: FnOnce(Result<Envelope>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut body = body_object(body)?;
        let continuation: Continuation = Box::new(move |result| continuation(result).boxed());

        let id = {
            let mut state = self.state();
            let id = state.allocate_msg_id();
            state.pending.insert(id, continuation);
            id
        };
        body.insert("msg_id".to_string(), Value::from(id));

        let sent = match Envelope::new(&self.id(), dest, &body) {
            Ok(envelope) => self.send_envelope(&envelope).await,
            Err(err) => Err(err),
        };
        if let Err(err) = sent {
            drop(self.state().pending.take(id));
            return Err(err);
        }

        // The timer is only armed once the request is on the wire, so a
        // failed send can never also resume the continuation.
        let node = self.clone();
        let timer = self.inner.tasks.spawn(async move {
            tokio::time::sleep(timeout).await;
            let expired = node.state().pending.take(id);
            if let Some(call) = expired {
                tracing::debug!(msg_id = id, ?timeout, "rpc timed out");
                node.run_continuation(id, call.expire(), Err(VortexError::Timeout))
                    .await;
            }
        });
        if !self.state().pending.attach_timer(id, timer.abort_handle()) {
            // Answered while the send was in flight.
            timer.abort();
        }
        Ok(id)
    }

    pub async fn rpc_with_default_timeout<B, F, Fut>(
        &self,
        dest: &str,
        body: &B,
        continuation: F,
    ) -> Result<u64>
    where
        B: Serialize + ?Sized,
        F: FnOnce(Result<Envelope>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.rpc(dest, body, self.default_rpc_timeout(), continuation)
            .await
    }

    /// Suspends the calling task until the reply arrives or `timeout`
    /// elapses. An `"error"` reply comes back as [`VortexError::Rpc`].
    pub async fn sync_rpc<B: Serialize + ?Sized>(
        &self,
        dest: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<Envelope> {
        let (tx, rx) = oneshot::channel();
        self.rpc(dest, body, timeout, move |result| async move {
            let _ = tx.send(result);
            Ok(())
        })
        .await?;

        let reply = rx
            .await
            .map_err(|_| VortexError::Runtime("rpc continuation dropped".to_string()))??;
        let header = reply.header()?;
        if let Some(err) = RpcError::from_header(&header) {
            return Err(err.into());
        }
        Ok(reply)
    }

    pub async fn sync_rpc_with_default_timeout<B: Serialize + ?Sized>(
        &self,
        dest: &str,
        body: &B,
    ) -> Result<Envelope> {
        self.sync_rpc(dest, body, self.default_rpc_timeout()).await
    }

    /// Routes a reply to its pending continuation. Returns false when nothing
    /// was waiting for `in_reply_to`.
    pub(crate) fn resolve_reply(&self, in_reply_to: u64, reply: Envelope) -> bool {
        let call = self.state().pending.take(in_reply_to);
        let Some(call) = call else {
            return false;
        };
        let continuation = call.resolve();
        let node = self.clone();
        self.inner.tasks.spawn(async move {
            node.run_continuation(in_reply_to, continuation, Ok(reply))
                .await;
        });
        true
    }

    async fn run_continuation(&self, msg_id: u64, continuation: Continuation, result: Result<Envelope>) {
        if let Err(err) = continuation(result).await {
            tracing::warn!(msg_id, error = %err, "callback error");
        }
    }
}

fn body_object<B: Serialize + ?Sized>(body: &B) -> Result<Map<String, Value>> {
    match serde_json::to_value(body).map_err(|e| VortexError::Serialization(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(VortexError::MalformedBody(format!(
            "message body must be a JSON object, got {other}"
        ))),
    }
}

use std::collections::HashMap;

use futures::future::BoxFuture;
use tokio::task::AbortHandle;

use crate::domains::message::Envelope;
use crate::error::Result;

/// Resumes an outstanding RPC with its reply, or with `Timeout`.
pub type Continuation = Box<dyn FnOnce(Result<Envelope>) -> BoxFuture<'static, Result<()>> + Send>;

pub struct PendingCall {
    continuation: Continuation,
    timer: Option<AbortHandle>,
}

impl PendingCall {
    /// Cancels the timeout (if armed) and hands back the continuation.
    pub fn resolve(self) -> Continuation {
        if let Some(timer) = self.timer {
            timer.abort();
        }
        self.continuation
    }

    /// Hands back the continuation without touching the timer; used by the
    /// timer task itself.
    pub fn expire(self) -> Continuation {
        self.continuation
    }
}

/// Outstanding RPCs keyed by the `msg_id` they were sent with.
///
/// Entries are removed exactly once: whichever of reply or timeout calls
/// [`CorrelationTable::take`] first gets the continuation.
#[derive(Default)]
pub struct CorrelationTable {
    pending: HashMap<u64, PendingCall>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u64, continuation: Continuation) {
        self.pending.insert(
            id,
            PendingCall {
                continuation,
                timer: None,
            },
        );
    }

    /// Returns false when the entry is already gone.
    pub fn attach_timer(&mut self, id: u64, timer: AbortHandle) -> bool {
        match self.pending.get_mut(&id) {
            Some(call) => {
                call.timer = Some(timer);
                true
            }
            None => false,
        }
    }

    pub fn take(&mut self, id: u64) -> Option<PendingCall> {
        self.pending.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use futures::FutureExt;

    use super::*;
    use crate::error::VortexError;

    fn counting(counter: Arc<AtomicUsize>) -> Continuation {
        Box::new(move |result| {
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                result.map(|_| ())
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn second_take_sees_nothing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut table = CorrelationTable::new();
        table.insert(7, counting(counter.clone()));
        assert_eq!(table.len(), 1);

        let call = table.take(7).unwrap();
        assert!(table.take(7).is_none());
        assert_eq!(table.len(), 0);

        let err = (call.resolve())(Err(VortexError::Timeout)).await.unwrap_err();
        assert!(matches!(err, VortexError::Timeout));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_aborts_the_timer() {
        let mut table = CorrelationTable::new();
        table.insert(1, counting(Arc::new(AtomicUsize::new(0))));
        let timer = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        assert!(table.attach_timer(1, timer.abort_handle()));
        assert!(!table.attach_timer(2, timer.abort_handle()));

        let _ = table.take(1).unwrap().resolve();
        assert!(timer.await.unwrap_err().is_cancelled());
    }
}

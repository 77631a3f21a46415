use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Tracks spawned work so shutdown can wait for every in-flight task.
#[derive(Clone, Default)]
pub struct TaskGroup {
    inner: Arc<TaskGroupInner>,
}

#[derive(Default)]
struct TaskGroupInner {
    active: AtomicUsize,
    idle: Notify,
}

struct ActiveGuard {
    inner: Arc<TaskGroupInner>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.active.fetch_add(1, Ordering::AcqRel);
        let guard = ActiveGuard {
            inner: self.inner.clone(),
        };
        tokio::spawn(async move {
            let _guard = guard;
            fut.await;
        })
    }

    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Resolves once no tracked task is running, including tasks spawned
    /// while waiting.
    pub async fn wait(&self) {
        loop {
            let idle = self.inner.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            idle.await;
        }
    }
}

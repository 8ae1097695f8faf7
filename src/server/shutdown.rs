//! Graceful shutdown handshake.
//!
//! [`ShutdownHandle`] carries two one-way flags: *requested* (stop accepting
//! new calls) and *terminated* (every in-flight session has drained and the
//! listener is gone). [`ShutdownCoordinator`] turns an interrupt source into
//! exactly one shutdown request and reports when teardown finished.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug)]
struct Flags {
    requested: watch::Sender<bool>,
    terminated: watch::Sender<bool>,
}

/// Cloneable handle used to stop a running server and observe teardown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flags: Arc<Flags>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    /// Handle with neither flag set.
    pub fn new() -> Self {
        let (requested, _) = watch::channel(false);
        let (terminated, _) = watch::channel(false);
        Self {
            flags: Arc::new(Flags {
                requested,
                terminated,
            }),
        }
    }

    /// Ask the server to stop accepting calls and drain.
    ///
    /// Returns `true` only for the call that initiated shutdown; later calls
    /// have no effect.
    pub fn shutdown(&self) -> bool {
        let initiated = self.flags.requested.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        });
        if initiated {
            info!("shutdown requested; draining in-flight sessions");
        }
        initiated
    }

    /// Whether shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.flags.requested.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub async fn requested(&self) {
        let mut rx = self.flags.requested.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|requested| *requested).await;
    }

    pub(crate) fn mark_terminated(&self) {
        self.flags.terminated.send_replace(true);
    }

    /// Whether teardown has finished.
    pub fn is_terminated(&self) -> bool {
        *self.flags.terminated.borrow()
    }

    /// Resolves once the server has finished tearing down.
    pub async fn terminated(&self) {
        let mut rx = self.flags.terminated.subscribe();
        let _ = rx.wait_for(|terminated| *terminated).await;
    }
}

/// Interrupt watcher bound to one server.
///
/// The first interrupt triggers [`ShutdownHandle::shutdown`]; further
/// interrupts while teardown is running are logged and ignored.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    done: oneshot::Receiver<()>,
    task: JoinHandle<()>,
}

impl ShutdownCoordinator {
    /// Spawn the watcher. Each item from `interrupts` is one interrupt.
    pub fn spawn<S>(handle: ShutdownHandle, interrupts: S) -> Self
    where
        S: Stream<Item = ()> + Send + Unpin + 'static,
    {
        let (done_tx, done) = oneshot::channel();
        let mut interrupts = interrupts.fuse();

        let task = tokio::spawn(async move {
            tokio::select! {
                interrupt = interrupts.next() => {
                    if interrupt.is_some() {
                        info!("received an interrupt, stopping services");
                        handle.shutdown();
                    }
                }
                // Shut down through another handle clone.
                _ = handle.requested() => {}
            }

            let teardown = handle.terminated();
            tokio::pin!(teardown);
            loop {
                tokio::select! {
                    _ = &mut teardown => break,
                    Some(()) = interrupts.next() => {
                        warn!("shutdown already in progress; ignoring interrupt");
                    }
                }
            }

            let _ = done_tx.send(());
        });

        Self { done, task }
    }

    /// Wait until the server finished teardown after shutdown was requested.
    pub async fn wait(self) {
        if self.done.await.is_err() {
            // Watcher task ended without finishing the handshake.
            let _ = self.task.await;
        }
    }
}

/// Interrupt source backed by `SIGINT` / Ctrl+C.
pub fn ctrl_c_interrupts() -> impl Stream<Item = ()> + Send + Unpin + 'static {
    Box::pin(futures_util::stream::unfold((), |()| async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some(((), ())),
            Err(e) => {
                warn!(error = %e, "failed to listen for interrupts");
                None
            }
        }
    }))
}

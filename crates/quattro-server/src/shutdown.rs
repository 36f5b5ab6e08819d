//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared stop signal for the listener and every connection task.
///
/// Connection tasks select on [`token`](Self::token) and run their normal
/// cleanup when it fires.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            timeout,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token, then wait up to the configured timeout for
    /// `handles` to finish. Tasks still running afterwards are aborted.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>) {
        self.shutdown();
        info!(
            task_count = handles.len(),
            timeout_secs = self.timeout.as_secs(),
            "waiting for tasks to complete"
        );

        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        let drain = futures::future::join_all(handles);
        if tokio::time::timeout(self.timeout, drain).await.is_err() {
            warn!(timeout = ?self.timeout, "shutdown timed out, aborting remaining tasks");
            for handle in aborts {
                handle.abort();
            }
        }
    }
}

use tokio::sync::watch;

/// Sender side held by the caller that may abort a pipeline run.
/// Call `trigger()` to broadcast cancellation to all outstanding tokens.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Receiver side threaded through `Orchestrator::run`. The orchestrator
/// checks it between segments and races it against the in-flight remote
/// call, so cancellation abandons that call at best effort.
/// Clone freely — each clone independently observes the signal.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Construct a linked handle/token pair.
pub fn new_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    /// Broadcast cancellation to all outstanding [`CancelToken`] clones.
    pub fn trigger(self) {
        // Errors only if every token has been dropped — harmless.
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// Whether cancellation has already been requested. Cheap; suitable for
    /// the between-segments check.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Asynchronously wait until cancellation is triggered. Resolves
    /// immediately if it already was.
    ///
    /// If the handle is dropped without triggering, cancellation can never
    /// occur any more; this future then parks forever instead of resolving
    /// spuriously, so racing it in a `select!` stays sound.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|&v| v).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Wait for `SIGINT` (Ctrl-C) or `SIGTERM` (container stop / kill).
///
/// Free function so the binary can call it once without any prior state.
pub async fn wait_for_os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

    tokio::select! {
        _ = sigint.recv()  => tracing::info!("🔔 SIGINT received"),
        _ = sigterm.recv() => tracing::info!("🔔 SIGTERM received"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_is_observed() {
        let (handle, mut token) = new_pair();
        assert!(!token.is_cancelled());
        handle.trigger();
        assert!(token.is_cancelled());
        // resolves immediately when already triggered
        token.wait().await;
    }

    #[tokio::test]
    async fn dropped_handle_never_resolves_wait() {
        let (handle, mut token) = new_pair();
        drop(handle);
        assert!(!token.is_cancelled());
        let timed_out = tokio::time::timeout(Duration::from_millis(20), token.wait())
            .await
            .is_err();
        assert!(timed_out, "wait() must park when cancellation became impossible");
    }

    #[tokio::test]
    async fn clones_observe_independently() {
        let (handle, token) = new_pair();
        let mut second = token.clone();
        handle.trigger();
        second.wait().await;
        assert!(token.is_cancelled());
    }
}

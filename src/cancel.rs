// ABOUTME: Cooperative cancellation shared between packaging and upload work.
// ABOUTME: Cheap to clone; observable both synchronously and from async code.

use futures::future::select_all;
use std::sync::Arc;
use tokio::sync::watch;

/// A cancellation flag that every clone observes.
///
/// Packaging runs on a blocking thread and polls [`is_cancelled`](Self::is_cancelled)
/// before each write; uploads race [`cancelled`](Self::cancelled) against the request.
/// A [`child`](Self::child) also observes its parent, but cancelling it leaves the
/// parent alone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
    parent: Option<Arc<CancelSignal>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            parent: None,
        }
    }

    /// A new signal that is tripped by its own `cancel` or by this one's.
    pub fn child(&self) -> Self {
        Self {
            parent: Some(Arc::new(self.clone())),
            ..Self::new()
        }
    }

    /// Trip the signal. Idempotent.
    pub fn cancel(&self) {
        if !self.tx.send_replace(true) {
            tracing::debug!("cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.lineage().any(|signal| *signal.tx.borrow())
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone
    /// of this signal or of an ancestor.
    pub async fn cancelled(&self) {
        let mut receivers: Vec<_> = self.lineage().map(|signal| signal.tx.subscribe()).collect();
        // Each sender lives in the lineage held by self, so no channel closes underneath us.
        let waits = receivers
            .iter_mut()
            .map(|rx| Box::pin(rx.wait_for(|cancelled| *cancelled)));
        let _ = select_all(waits).await;
    }

    fn lineage(&self) -> impl Iterator<Item = &CancelSignal> {
        std::iter::successors(Some(self), |signal| signal.parent.as_deref())
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn clones_share_state() {
        let signal = CancelSignal::new();
        let other = signal.clone();
        assert!(!other.is_cancelled());
        signal.cancel();
        assert!(other.is_cancelled());
        signal.cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_finished());
        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[test]
    fn child_follows_parent_but_not_the_reverse() {
        let parent = CancelSignal::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn child_wakes_when_parent_is_cancelled() {
        let parent = CancelSignal::new();
        let child = parent.child().child();
        let task = tokio::spawn(async move { child.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_finished());
        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("child waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_is_immediate_when_already_tripped() {
        let signal = CancelSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("already cancelled");
    }
}

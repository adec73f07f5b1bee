//! UI-safe execution contexts.
//!
//! Deliveries that touch presentation state are marshalled through a
//! [`UiExecutor`]. Hosts with a dedicated UI loop use [`UiQueue`] and drain
//! the matching [`UiEventLoop`] from that loop; headless hosts use
//! [`ImmediateExecutor`].

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::ports::{UiExecutor, UiJob};

/// Runs jobs inline on whichever thread submits them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateExecutor;

impl UiExecutor for ImmediateExecutor {
    fn execute(&self, job: UiJob) {
        job();
    }
}

/// Sending half of a UI job queue.
#[derive(Debug, Clone)]
pub struct UiQueue {
    tx: mpsc::UnboundedSender<UiJob>,
}

impl UiQueue {
    /// Creates a queue and the loop that drains it.
    #[must_use]
    pub fn new() -> (Self, UiEventLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiEventLoop::new(rx))
    }
}

impl UiExecutor for UiQueue {
    fn execute(&self, job: UiJob) {
        if self.tx.send(job).is_err() {
            warn!("UI event loop is gone, dropping delivery");
        }
    }
}

/// Receiving half of a UI job queue, owned by the UI thread.
pub struct UiEventLoop {
    rx: mpsc::UnboundedReceiver<UiJob>,
    poll_timeout: Duration,
}

impl std::fmt::Debug for UiEventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiEventLoop")
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

impl UiEventLoop {
    const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;

    fn new(rx: mpsc::UnboundedReceiver<UiJob>) -> Self {
        Self {
            rx,
            poll_timeout: Duration::from_millis(Self::DEFAULT_POLL_TIMEOUT_MS),
        }
    }

    /// Sets how long [`Self::poll`] waits for a job.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Runs every job already queued without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Waits for the next job and runs it. Returns false once every queue
    /// handle has been dropped.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Waits up to the poll timeout for a job, then runs it along with any
    /// others already queued. Returns how many ran.
    pub async fn poll(&mut self) -> usize {
        match tokio::time::timeout(self.poll_timeout, self.rx.recv()).await {
            Ok(Some(job)) => {
                job();
                1 + self.run_pending()
            }
            Ok(None) | Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_immediate_executor_runs_inline() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        ImmediateExecutor.execute(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queue_defers_until_drained() {
        let (queue, mut ui_loop) = UiQueue::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            queue.execute(Box::new(move || order.lock().push(i)));
        }

        assert!(order.lock().is_empty());
        assert_eq!(ui_loop.run_pending(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_run_next_reports_closed_queue() {
        let (queue, mut ui_loop) = UiQueue::new();
        queue.execute(Box::new(|| {}));
        drop(queue);

        assert!(ui_loop.run_next().await);
        assert!(!ui_loop.run_next().await);
    }

    #[tokio::test]
    async fn test_poll_times_out_when_idle() {
        let (_queue, ui_loop) = UiQueue::new();
        let mut ui_loop = ui_loop.with_timeout(Duration::from_millis(5));
        assert_eq!(ui_loop.poll().await, 0);
    }
}

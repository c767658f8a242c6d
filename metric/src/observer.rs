use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Progress sink for one refresh cycle.
pub trait RefreshObserver: Send + Sync {
    fn is_cancelled(&self) -> bool;

    fn on_finish(&self) {}
}

/// Observer that can be cancelled from another thread and counts finishes.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    finished: AtomicUsize,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn finish_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl RefreshObserver for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn on_finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

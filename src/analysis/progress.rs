use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag checked between rows or sheets; work already done is kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Receives `(completed, total, label)` after each unit of work.
pub trait ProgressObserver {
    fn report(&self, completed: usize, total: usize, label: &str);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize, &str),
{
    fn report(&self, completed: usize, total: usize, label: &str) {
        self(completed, total, label);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn report(&self, _completed: usize, _total: usize, _label: &str) {}
}

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{AppError, Result};

/// Latest-request-wins delay for interactive re-rendering.
///
/// Each [`schedule`](Self::schedule) supersedes the pending request and bumps
/// the generation; results tagged with an older generation are stale.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    due: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            due: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, now: Instant) -> u64 {
        self.generation += 1;
        self.due = Some(now + self.delay);
        self.generation
    }

    /// Fires at most once per schedule, after the delay has passed.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                Some(self.generation)
            }
            _ => None,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.due.map(|due| due.saturating_duration_since(now))
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Drops the pending request and invalidates anything in flight.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.due = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Batch,
    Export,
}

impl fmt::Display for JobKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch => formatter.write_str("batch"),
            Self::Export => formatter.write_str("export"),
        }
    }
}

/// Admits one long-running job at a time; a second start is rejected.
#[derive(Debug, Clone, Default)]
pub struct JobSlot {
    active: Arc<Mutex<Option<JobKind>>>,
}

/// Holds the slot until dropped, typically at the end of a worker thread.
#[derive(Debug)]
pub struct JobGuard {
    active: Arc<Mutex<Option<JobKind>>>,
}

impl JobSlot {
    pub fn try_start(&self, kind: JobKind) -> Result<JobGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = *active {
            return Err(AppError::Busy(running));
        }
        *active = Some(kind);
        Ok(JobGuard {
            active: Arc::clone(&self.active),
        })
    }

    pub fn active(&self) -> Option<JobKind> {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        self.active().is_some()
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

//! Progress reporting
//!
//! The pipeline announces each step before doing its work. Observers are
//! fire-and-forget: nothing they do can influence the run.

use std::sync::Mutex;

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based step index
    pub step: u32,
    /// Total number of steps
    pub total: u32,
    pub message: String,
}

/// Receives progress notifications from a running pipeline
pub trait ProgressObserver {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent),
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Keeps every notification (useful for front ends polling a run)
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn event(step: u32) -> ProgressEvent {
        ProgressEvent {
            step,
            total: 8,
            message: format!("step {}", step),
        }
    }

    #[test]
    fn test_closure_observer() {
        let count = Cell::new(0);
        let observer = |e: &ProgressEvent| count.set(count.get() + e.step);
        observer.on_progress(&event(2));
        observer.on_progress(&event(3));
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_recording_observer() {
        let recorder = RecordingProgress::new();
        recorder.on_progress(&event(1));
        recorder.on_progress(&event(2));
        assert_eq!(recorder.events(), vec![event(1), event(2)]);
    }
}

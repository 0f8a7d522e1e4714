//! Progress reporter port

use crate::domain::ProgressEvent;

/// Observer notified by the runner as a run advances.
///
/// Notifications are synchronous and ordered, and always happen after the
/// transaction they describe has committed.
pub trait ProgressReporter {
    fn report(&mut self, event: &ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: FnMut(&ProgressEvent),
{
    fn report(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Collects every event it receives, in order
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub events: Vec<ProgressEvent>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events.iter().map(|e| e.percent).collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }
}

use crate::platform::runtime;
use crate::tracker::api::{FlushReport, Tracker};

/// Host application lifecycle transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostLifecycleEvent {
    /// The application came to the foreground.
    Resume,
    /// The application moved to the background.
    Pause,
    /// The host is tearing the application down.
    Destroy,
}

/// Bridges host lifecycle callbacks to [`Tracker::flush`].
///
/// Only a move to the background dispatches queued requests. Resuming and teardown do nothing,
/// so requests still queued when the process exits are lost.
#[derive(Clone, Debug)]
pub struct LifecycleAdapter {
    tracker: Tracker,
}

impl LifecycleAdapter {
    pub fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn handle(&self, event: HostLifecycleEvent) {
        match event {
            HostLifecycleEvent::Resume => self.on_host_resume(),
            HostLifecycleEvent::Pause => self.on_host_pause(),
            HostLifecycleEvent::Destroy => self.on_host_destroy(),
        }
    }

    pub fn on_host_resume(&self) {}

    /// Starts a flush in the background and returns immediately.
    pub fn on_host_pause(&self) {
        let tracker = self.tracker.clone();
        runtime::spawn_detached(async move {
            let report = tracker.flush().await;
            if !report.is_complete() {
                log::debug!(
                    "background flush left {} request(s) queued",
                    report.remaining
                );
            }
        });
    }

    /// Awaitable form of [`Self::on_host_pause`] for hosts already running async code.
    pub async fn on_host_pause_async(&self) -> FlushReport {
        self.tracker.flush().await
    }

    pub fn on_host_destroy(&self) {}
}

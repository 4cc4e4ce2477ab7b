use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::logger::{log_arg, Logger};
use crate::platform::runtime::{with_timeout, TimeoutError};
use crate::tracker::config::{TrackerConfig, TrackerSettings};
use crate::tracker::constants::TRACKER_LOGGER_NAME;
use crate::tracker::dimensions::{DimensionRegistry, DimensionSnapshot, DimensionUpdate};
use crate::tracker::error::{transport_error, TrackerError, TrackerResult};
use crate::tracker::event::{non_empty, EventOptions, SearchOptions, TrackEvent};
use crate::tracker::request::{
    build_request, BuildOutcome, OutboundRequest, RequestContext, SuppressReason,
};
use crate::tracker::transport::{CollectorClient, HttpCollectorClient};

/// Matomo tracker: accepts tracking calls, queues the resulting requests and dispatches them on
/// [`Tracker::flush`].
///
/// Tracking calls never fail. Before [`Tracker::init_tracker`] succeeds, and while the user is
/// opted out, they are silently ignored. Invalid input is reported through [`Tracker::logger`].
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("state", &self.state())
            .field("queued", &self.queue_len())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    Ready,
    OptedOut,
}

/// Outcome of a single [`Tracker::flush`] call.
#[derive(Clone, Debug, Default)]
pub struct FlushReport {
    /// Requests delivered and removed from the queue.
    pub sent: usize,
    /// Requests still queued after the flush.
    pub remaining: usize,
    /// Failure that stopped the flush, if any.
    pub error: Option<TrackerError>,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.remaining == 0
    }
}

struct TrackerInner {
    settings: TrackerSettings,
    logger: Logger,
    collector_override: Option<Arc<dyn CollectorClient>>,
    core: Mutex<TrackerCore>,
    flushing: AtomicBool,
}

#[derive(Clone, Debug)]
struct QueuedRequest {
    sequence: u64,
    request: OutboundRequest,
}

#[derive(Default)]
struct SessionState {
    last_activity: Option<DateTime<Utc>>,
    force_new: bool,
}

impl SessionState {
    fn is_new_visit(&self, now: DateTime<Utc>, timeout: std::time::Duration) -> bool {
        if self.force_new {
            return true;
        }
        match self.last_activity {
            None => true,
            Some(last) => (now - last).to_std().map_or(false, |idle| idle >= timeout),
        }
    }

    fn record_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity = Some(now);
        self.force_new = false;
    }
}

#[derive(Default)]
struct TrackerCore {
    config: Option<TrackerConfig>,
    collector: Option<Arc<dyn CollectorClient>>,
    visitor_id: Option<String>,
    user_id: Option<String>,
    dimensions: DimensionRegistry,
    session: SessionState,
    app_download_key: Option<String>,
    queue: VecDeque<QueuedRequest>,
    next_sequence: u64,
}

impl TrackerCore {
    fn state(&self) -> TrackerState {
        match &self.config {
            None => TrackerState::Uninitialized,
            Some(config) if config.opted_out() => TrackerState::OptedOut,
            Some(_) => TrackerState::Ready,
        }
    }

    fn request_context(
        &self,
        settings: &TrackerSettings,
        now: DateTime<Utc>,
    ) -> Option<RequestContext> {
        let config = self.config.as_ref()?;
        Some(RequestContext {
            site_id: config.site_id(),
            opted_out: config.opted_out(),
            visitor_id: self.visitor_id.clone().unwrap_or_default(),
            user_id: self.user_id.clone(),
            new_visit: self.session.is_new_visit(now, settings.session_timeout()),
            timestamp: now,
            application_base_url: settings.application_base_url(),
            application_id: settings.application_id().to_string(),
            application_version: settings.application_version().to_string(),
            user_agent: settings.user_agent().map(str::to_owned),
            language: settings.language().map(str::to_owned),
        })
    }

    /// Appends `request`, evicting the oldest entry when the queue is full.
    fn push(&mut self, request: OutboundRequest, max_size: usize) -> Option<OutboundRequest> {
        let evicted = if self.queue.len() >= max_size {
            self.queue.pop_front().map(|queued| queued.request)
        } else {
            None
        };
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push_back(QueuedRequest { sequence, request });
        evicted
    }

    fn remove_through(&mut self, sequence: u64) {
        while self.queue.front().is_some_and(|queued| queued.sequence <= sequence) {
            self.queue.pop_front();
        }
    }
}

enum EnqueueOutcome {
    Queued { evicted: Option<OutboundRequest> },
    Suppressed(SuppressReason),
}

impl Tracker {
    /// Creates an uninitialized tracker that dispatches over HTTP once configured.
    pub fn new(settings: TrackerSettings) -> Self {
        Self::build(settings, None)
    }

    /// Creates an uninitialized tracker that dispatches through `collector` instead of HTTP.
    pub fn with_collector(settings: TrackerSettings, collector: Arc<dyn CollectorClient>) -> Self {
        Self::build(settings, Some(collector))
    }

    fn build(
        settings: TrackerSettings,
        collector_override: Option<Arc<dyn CollectorClient>>,
    ) -> Self {
        let inner = TrackerInner {
            settings,
            logger: Logger::new(TRACKER_LOGGER_NAME),
            collector_override,
            core: Mutex::new(TrackerCore::default()),
            flushing: AtomicBool::new(false),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.inner.settings
    }

    /// Logger receiving every failure absorbed by the tracking calls.
    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    pub fn state(&self) -> TrackerState {
        self.lock_core().state()
    }

    /// Configures the collector endpoint and site.
    ///
    /// May be called again to replace the configuration; the opt-out choice, queued requests,
    /// user id and custom dimensions are kept. The next request opens a new visit.
    pub fn init_tracker(&self, url: &str, site_id: i64) -> TrackerResult<()> {
        let mut config = TrackerConfig::new(url, site_id)?;
        let collector: Arc<dyn CollectorClient> = match &self.inner.collector_override {
            Some(collector) => Arc::clone(collector),
            None => Arc::new(HttpCollectorClient::new(
                config.collector_url().clone(),
                self.inner.settings.dispatch_timeout(),
            )?),
        };

        let mut core = self.lock_core();
        if core.visitor_id.is_none() {
            core.visitor_id = Some(self.inner.settings.resolve_visitor_id()?);
        }
        if let Some(previous) = &core.config {
            config.set_opted_out(previous.opted_out());
        }
        log::debug!(
            "tracker configured for site {} at {}",
            config.site_id(),
            config.collector_url()
        );
        core.config = Some(config);
        core.collector = Some(collector);
        core.session.force_new = true;
        Ok(())
    }

    /// Disables (`true`) or re-enables (`false`) tracking. Queued requests and custom dimensions
    /// are left untouched.
    pub fn set_app_opt_out(&self, opted_out: bool) {
        let mut core = self.lock_core();
        match core.config.as_mut() {
            Some(config) => config.set_opted_out(opted_out),
            None => log::debug!("ignoring opt-out change on an uninitialized tracker"),
        }
    }

    pub fn opted_out(&self) -> bool {
        self.state() == TrackerState::OptedOut
    }

    /// Sets the user id sent with later requests; `None` or an empty string clears it.
    pub fn set_user_id(&self, user_id: Option<&str>) {
        let mut core = self.lock_core();
        if core.config.is_none() {
            log::debug!("ignoring user id on an uninitialized tracker");
            return;
        }
        core.user_id = non_empty(user_id);
    }

    pub fn user_id(&self) -> Option<String> {
        self.lock_core().user_id.clone()
    }

    pub fn visitor_id(&self) -> Option<String> {
        self.lock_core().visitor_id.clone()
    }

    /// Sets a custom dimension for every later request; `None` or an empty value removes it.
    pub fn set_custom_dimension(&self, id: i64, value: Option<&str>) {
        let result = {
            let mut core = self.lock_core();
            if core.config.is_none() {
                log::debug!("ignoring custom dimension {id} on an uninitialized tracker");
                return;
            }
            core.dimensions.set(id, value)
        };

        match result {
            Ok(DimensionUpdate::Truncated) => self.inner.logger.warn_with([
                log_arg("custom dimension value truncated to 255 characters; id"),
                log_arg(id),
            ]),
            Ok(_) => {}
            Err(err) => self.report(&err),
        }
    }

    pub fn dimensions(&self) -> DimensionSnapshot {
        self.lock_core().dimensions.snapshot()
    }

    pub fn clear_custom_dimensions(&self) {
        self.lock_core().dimensions.clear();
    }

    /// Forces the next request to open a new visit.
    pub fn start_new_session(&self) {
        self.lock_core().session.force_new = true;
    }

    pub fn track_screen(&self, screen: &str, title: Option<&str>) {
        self.track(TrackEvent::screen(screen, title));
    }

    pub fn track_event(&self, category: &str, action: &str, options: EventOptions) {
        self.track(TrackEvent::event(category, action, options));
    }

    pub fn track_search(&self, query: &str, options: SearchOptions) {
        self.track(TrackEvent::search(query, options));
    }

    pub fn track_outlink(&self, url: &str) {
        self.track_link(url, TrackEvent::outlink);
    }

    pub fn track_download_link(&self, url: &str) {
        self.track_link(url, TrackEvent::download_link);
    }

    /// Records the installation of the current application version. Repeated calls for the
    /// same version are ignored.
    pub fn track_app_download(&self) {
        let settings = &self.inner.settings;
        let key = format!("{}:{}", settings.application_id(), settings.application_version());

        let outcome = {
            let mut core = self.lock_core();
            if core.app_download_key.as_deref() == Some(key.as_str()) {
                log::debug!("app download already tracked for {key}");
                return;
            }
            let outcome = self.enqueue(&mut core, &TrackEvent::AppDownload);
            if matches!(outcome, EnqueueOutcome::Queued { .. }) {
                core.app_download_key = Some(key);
            }
            outcome
        };
        self.log_outcome(&TrackEvent::AppDownload, outcome);
    }

    /// Builds and queues a request for `event`.
    pub fn track(&self, event: TrackEvent) {
        let outcome = {
            let mut core = self.lock_core();
            self.enqueue(&mut core, &event)
        };
        self.log_outcome(&event, outcome);
    }

    pub fn queue_len(&self) -> usize {
        self.lock_core().queue.len()
    }

    /// Requests waiting for dispatch, oldest first.
    pub fn queued_requests(&self) -> Vec<OutboundRequest> {
        self.lock_core()
            .queue
            .iter()
            .map(|queued| queued.request.clone())
            .collect()
    }

    /// Sends queued requests in order, removing each one once the collector accepts it.
    ///
    /// Stops at the first failure and leaves that request and everything after it queued for
    /// the next flush. Nothing is sent while uninitialized or opted out. A call made while
    /// another flush is running returns immediately.
    pub async fn flush(&self) -> FlushReport {
        let Some(_guard) = FlushGuard::acquire(&self.inner.flushing) else {
            log::debug!("flush already in progress");
            return FlushReport {
                remaining: self.queue_len(),
                ..Default::default()
            };
        };

        let (collector, batch) = {
            let core = self.lock_core();
            match (&core.config, &core.collector) {
                (Some(config), Some(collector)) if !config.opted_out() => {
                    (Arc::clone(collector), core.queue.iter().cloned().collect::<Vec<_>>())
                }
                _ => {
                    return FlushReport {
                        remaining: core.queue.len(),
                        ..Default::default()
                    }
                }
            }
        };

        let timeout = self.inner.settings.dispatch_timeout();
        let mut sent = 0;
        let mut sent_through = None;
        let mut failure = None;
        for queued in &batch {
            let result = match with_timeout(collector.send(&queued.request), timeout).await {
                Ok(result) => result,
                Err(TimeoutError) => Err(transport_error(format!(
                    "tracking request timed out after {}ms",
                    timeout.as_millis()
                ))),
            };
            match result {
                Ok(()) => {
                    sent += 1;
                    sent_through = Some(queued.sequence);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let remaining = {
            let mut core = self.lock_core();
            if let Some(sequence) = sent_through {
                core.remove_through(sequence);
            }
            core.queue.len()
        };

        if let Some(err) = &failure {
            self.report(err);
        }
        log::debug!("flush sent {sent} request(s), {remaining} remaining");

        FlushReport {
            sent,
            remaining,
            error: failure,
        }
    }

    fn track_link(&self, url: &str, parse: fn(&str) -> TrackerResult<TrackEvent>) {
        if self.state() == TrackerState::Uninitialized {
            log::debug!("ignoring link tracking on an uninitialized tracker");
            return;
        }
        match parse(url) {
            Ok(event) => self.track(event),
            Err(err) => self.report(&err),
        }
    }

    fn enqueue(&self, core: &mut TrackerCore, event: &TrackEvent) -> EnqueueOutcome {
        let settings = &self.inner.settings;
        let now = Utc::now();
        let context = core.request_context(settings, now);
        match build_request(event, context.as_ref(), &core.dimensions.snapshot()) {
            BuildOutcome::Built(request) => {
                core.session.record_activity(now);
                let evicted = core.push(request, settings.max_queue_size());
                EnqueueOutcome::Queued { evicted }
            }
            BuildOutcome::Suppressed(reason) => EnqueueOutcome::Suppressed(reason),
        }
    }

    fn log_outcome(&self, event: &TrackEvent, outcome: EnqueueOutcome) {
        match outcome {
            EnqueueOutcome::Queued { evicted: None } => {
                log::debug!("queued {} request", event.kind());
            }
            EnqueueOutcome::Queued { evicted: Some(_) } => self.inner.logger.warn_with([
                log_arg("dispatch queue full; dropped oldest request, max"),
                log_arg(self.inner.settings.max_queue_size()),
            ]),
            EnqueueOutcome::Suppressed(reason) => {
                log::debug!("{} request suppressed: {reason:?}", event.kind());
            }
        }
    }

    fn report(&self, err: &TrackerError) {
        self.inner
            .logger
            .error_with([log_arg(err.message()), log_arg(err.code_str())]);
    }

    fn lock_core(&self) -> MutexGuard<'_, TrackerCore> {
        self.inner
            .core
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct FlushGuard<'a>(&'a AtomicBool);

impl<'a> FlushGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

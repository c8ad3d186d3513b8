//! Geolocation tracker state machine.
//!
//! ```text
//! Idle ──locate_once──▶ OneShotPending ──fix, error, timeout or cancel──▶ Idle
//! Idle ──enable_driving_mode──▶ Tracking
//! any ──disable_driving_mode / stop / drop──▶ Idle
//! ```
//!
//! While tracking, two independently cancellable tasks feed one
//! latest-position slot: a continuous subscription and a fallback poll.
//! Some platforms deliver continuous updates unreliably; the poll covers
//! for them. The slot is last-write-wins.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::Coordinate;

use super::source::{LocationError, PositionOptions, PositionSource};

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Options for single fixes.
    pub one_shot: PositionOptions,

    /// Options for the continuous subscription.
    pub watch: PositionOptions,

    /// Options for each fallback poll.
    pub poll: PositionOptions,

    /// Time between fallback polls.
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            one_shot: PositionOptions {
                high_accuracy: true,
                maximum_age: Duration::ZERO,
                timeout: Duration::from_secs(10),
            },
            watch: PositionOptions {
                high_accuracy: true,
                maximum_age: Duration::from_secs(5),
                timeout: Duration::from_secs(10),
            },
            poll: PositionOptions {
                high_accuracy: true,
                maximum_age: Duration::from_secs(5),
                timeout: Duration::from_secs(10),
            },
            poll_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    OneShotPending,
    Tracking,
}

/// Which mechanism produced a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixOrigin {
    OneShot,
    Subscription,
    Poll,
}

/// A published position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    /// Increases with every publication.
    pub seq: u64,
    pub origin: FixOrigin,
    pub coordinate: Coordinate,
}

#[derive(Debug, Default)]
struct SlotState {
    /// Bumped whenever tracking starts or stops; tasks from an older
    /// generation can no longer publish.
    generation: u64,
    seq: u64,
}

/// The latest-position slot shared by every mechanism.
#[derive(Debug)]
struct Slot {
    state: Mutex<SlotState>,
    position: watch::Sender<Option<PositionUpdate>>,
    error: watch::Sender<Option<LocationError>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::default()),
            position: watch::Sender::new(None),
            error: watch::Sender::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new generation and return its id.
    fn next_generation(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        state.generation
    }

    /// Publish a position. Tracking tasks pass their generation and are
    /// refused once it has been revoked; one-shot fixes pass `None`.
    fn publish(&self, generation: Option<u64>, origin: FixOrigin, coordinate: Coordinate) -> bool {
        let mut state = self.lock();
        if generation.is_some_and(|g| g != state.generation) {
            return false;
        }
        state.seq += 1;
        self.position.send_replace(Some(PositionUpdate {
            seq: state.seq,
            origin,
            coordinate,
        }));
        true
    }

    fn fail(&self, generation: Option<u64>, error: LocationError) -> bool {
        let state = self.lock();
        if generation.is_some_and(|g| g != state.generation) {
            return false;
        }
        self.error.send_replace(Some(error));
        true
    }
}

/// Bounds a single fix by `options.timeout`.
async fn fix_within(
    source: &dyn PositionSource,
    options: PositionOptions,
) -> Result<Coordinate, LocationError> {
    tokio::time::timeout(options.timeout, source.current_position(options))
        .await
        .unwrap_or(Err(LocationError::Timeout))
}

/// Marks a one-shot fix in flight; back to `Idle` on drop, including when
/// the `locate_once` future is cancelled.
struct PendingFix<'a>(&'a watch::Sender<TrackerState>);

impl<'a> PendingFix<'a> {
    fn enter(state: &'a watch::Sender<TrackerState>) -> Self {
        state.send_if_modified(|s| {
            let idle = *s == TrackerState::Idle;
            if idle {
                *s = TrackerState::OneShotPending;
            }
            idle
        });
        Self(state)
    }
}

impl Drop for PendingFix<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|s| {
            let pending = *s == TrackerState::OneShotPending;
            if pending {
                *s = TrackerState::Idle;
            }
            pending
        });
    }
}

struct TrackingTasks {
    subscription: JoinHandle<()>,
    poll: JoinHandle<()>,
}

/// Produces the user's position, once or continuously.
pub struct GeolocationTracker {
    source: Arc<dyn PositionSource>,
    config: TrackerConfig,
    state: watch::Sender<TrackerState>,
    slot: Arc<Slot>,
    tasks: Option<TrackingTasks>,
}

impl GeolocationTracker {
    pub fn new(source: Arc<dyn PositionSource>, config: TrackerConfig) -> Self {
        Self {
            source,
            config,
            state: watch::Sender::new(TrackerState::Idle),
            slot: Arc::new(Slot::new()),
            tasks: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn state_changes(&self) -> watch::Receiver<TrackerState> {
        self.state.subscribe()
    }

    /// Watch the latest published position.
    pub fn subscribe(&self) -> watch::Receiver<Option<PositionUpdate>> {
        self.slot.position.subscribe()
    }

    /// Watch the latest location error.
    pub fn errors(&self) -> watch::Receiver<Option<LocationError>> {
        self.slot.error.subscribe()
    }

    pub fn latest(&self) -> Option<PositionUpdate> {
        self.slot.position.borrow().clone()
    }

    /// Take a single fix and publish it.
    ///
    /// From `Idle` this passes through `OneShotPending`; while tracking the
    /// state is left alone. A source that does not answer within
    /// `one_shot.timeout` yields [`LocationError::Timeout`].
    pub async fn locate_once(&mut self) -> Result<Coordinate, LocationError> {
        let pending = PendingFix::enter(&self.state);

        let result = fix_within(self.source.as_ref(), self.config.one_shot).await;

        match &result {
            Ok(coordinate) => {
                self.slot.publish(None, FixOrigin::OneShot, *coordinate);
            }
            Err(e) => {
                tracing::warn!(error = %e, "one-shot position failed");
                self.slot.fail(None, e.clone());
            }
        }

        drop(pending);
        result
    }

    /// Start continuous tracking. No-op if already tracking.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enable_driving_mode(&mut self) {
        if self.state() == TrackerState::Tracking {
            return;
        }

        let generation = self.slot.next_generation();

        let subscription = tokio::spawn(run_subscription(
            self.source.clone(),
            self.config.watch,
            self.slot.clone(),
            generation,
        ));
        let poll = tokio::spawn(run_poll(
            self.source.clone(),
            self.config.poll,
            self.config.poll_interval,
            self.slot.clone(),
            generation,
        ));

        self.tasks = Some(TrackingTasks { subscription, poll });
        self.state.send_replace(TrackerState::Tracking);
        tracing::info!(generation, "driving mode enabled");
    }

    /// Stop tracking and optionally take one fresh fix.
    pub async fn disable_driving_mode(
        &mut self,
        refresh: bool,
    ) -> Option<Result<Coordinate, LocationError>> {
        self.stop();
        if refresh {
            Some(self.locate_once().await)
        } else {
            None
        }
    }

    /// Cancel both tracking mechanisms and return to `Idle`. Idempotent.
    ///
    /// Once this returns, no update from the cancelled tasks is published.
    pub fn stop(&mut self) {
        if let Some(tasks) = self.tasks.take() {
            self.slot.next_generation();
            tasks.subscription.abort();
            tasks.poll.abort();
            tracing::info!("driving mode disabled");
        }
        self.state.send_if_modified(|s| {
            let changed = *s != TrackerState::Idle;
            *s = TrackerState::Idle;
            changed
        });
    }
}

impl Drop for GeolocationTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_subscription(
    source: Arc<dyn PositionSource>,
    options: PositionOptions,
    slot: Arc<Slot>,
    generation: u64,
) {
    let mut updates = source.watch_position(options);
    while let Some(update) = updates.next().await {
        let accepted = match update {
            Ok(coordinate) => slot.publish(Some(generation), FixOrigin::Subscription, coordinate),
            Err(e) => {
                tracing::warn!(error = %e, "position subscription error");
                slot.fail(Some(generation), e)
            }
        };
        if !accepted {
            break;
        }
    }
    tracing::debug!(generation, "position subscription ended");
}

async fn run_poll(
    source: Arc<dyn PositionSource>,
    options: PositionOptions,
    period: Duration,
    slot: Arc<Slot>,
    generation: u64,
) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // First tick is immediate, skip it

    loop {
        ticker.tick().await;
        let accepted = match fix_within(source.as_ref(), options).await {
            Ok(coordinate) => slot.publish(Some(generation), FixOrigin::Poll, coordinate),
            Err(e) => {
                tracing::warn!(error = %e, "position poll failed");
                slot.fail(Some(generation), e)
            }
        };
        if !accepted {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::stream::BoxStream;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts live subscriptions; decrements when the stream is dropped.
    struct WatchGuard(Arc<AtomicUsize>);

    impl Drop for WatchGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct FakeDevice {
        position: Coordinate,
        deny: bool,
        watch_period: Duration,
        fixes_served: AtomicUsize,
        live_watches: Arc<AtomicUsize>,
    }

    impl FakeDevice {
        fn new() -> Self {
            Self {
                position: Coordinate::new(51.5, -0.09).unwrap(),
                deny: false,
                watch_period: Duration::from_secs(3),
                fixes_served: AtomicUsize::new(0),
                live_watches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn denying() -> Self {
            Self {
                deny: true,
                ..Self::new()
            }
        }

        fn fixes(&self) -> usize {
            self.fixes_served.load(Ordering::SeqCst)
        }

        fn live_watches(&self) -> usize {
            self.live_watches.load(Ordering::SeqCst)
        }
    }

    impl PositionSource for FakeDevice {
        fn current_position(
            &self,
            _options: PositionOptions,
        ) -> BoxFuture<'_, Result<Coordinate, LocationError>> {
            Box::pin(async move {
                if self.deny {
                    return Err(LocationError::PermissionDenied);
                }
                self.fixes_served.fetch_add(1, Ordering::SeqCst);
                Ok(self.position)
            })
        }

        fn watch_position(
            &self,
            _options: PositionOptions,
        ) -> BoxStream<'static, Result<Coordinate, LocationError>> {
            self.live_watches.fetch_add(1, Ordering::SeqCst);
            let guard = WatchGuard(self.live_watches.clone());
            let state = (guard, self.position, self.watch_period);
            futures::stream::unfold(state, |state| async move {
                tokio::time::sleep(state.2).await;
                let position = state.1;
                Some((Ok(position), state))
            })
            .boxed()
        }
    }

    /// A device that never produces a fix.
    struct SilentDevice;

    impl PositionSource for SilentDevice {
        fn current_position(
            &self,
            _options: PositionOptions,
        ) -> BoxFuture<'_, Result<Coordinate, LocationError>> {
            Box::pin(futures::future::pending())
        }

        fn watch_position(
            &self,
            _options: PositionOptions,
        ) -> BoxStream<'static, Result<Coordinate, LocationError>> {
            futures::stream::pending().boxed()
        }
    }

    fn tracker(device: &Arc<FakeDevice>) -> GeolocationTracker {
        GeolocationTracker::new(device.clone(), TrackerConfig::default())
    }

    #[tokio::test]
    async fn one_shot_returns_to_idle() {
        let device = Arc::new(FakeDevice::new());
        let mut tracker = tracker(&device);
        assert_eq!(tracker.state(), TrackerState::Idle);

        let coordinate = tracker.locate_once().await.unwrap();
        assert_eq!(coordinate, device.position);
        assert_eq!(tracker.state(), TrackerState::Idle);

        let update = tracker.latest().unwrap();
        assert_eq!(update.origin, FixOrigin::OneShot);
        assert_eq!(update.seq, 1);
    }

    #[tokio::test]
    async fn one_shot_failure_is_published_and_returns_to_idle() {
        let device = Arc::new(FakeDevice::denying());
        let mut tracker = tracker(&device);
        let errors = tracker.errors();

        let err = tracker.locate_once().await.unwrap_err();
        assert_eq!(err, LocationError::PermissionDenied);
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(tracker.latest().is_none());
        assert_eq!(*errors.borrow(), Some(LocationError::PermissionDenied));
    }

    #[tokio::test(start_paused = true)]
    async fn tracking_uses_both_mechanisms_until_disabled() {
        let device = Arc::new(FakeDevice::new());
        let mut tracker = tracker(&device);
        let mut rx = tracker.subscribe();

        tracker.enable_driving_mode();
        assert_eq!(tracker.state(), TrackerState::Tracking);

        let mut seen = HashSet::new();
        let collect = async {
            loop {
                rx.changed().await.unwrap();
                if let Some(origin) = rx.borrow_and_update().as_ref().map(|u| u.origin) {
                    seen.insert(origin);
                }
                if seen.contains(&FixOrigin::Subscription) && seen.contains(&FixOrigin::Poll) {
                    break;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(15), collect)
            .await
            .expect("both mechanisms should report within one poll interval");

        let result = tracker.disable_driving_mode(false).await;
        assert!(result.is_none());
        assert_eq!(tracker.state(), TrackerState::Idle);

        let last_seq = tracker.latest().unwrap().seq;
        let polls = device.fixes();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(tracker.latest().unwrap().seq, last_seq);
        assert_eq!(device.fixes(), polls);
        assert_eq!(device.live_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disable_with_refresh_takes_a_fix() {
        let device = Arc::new(FakeDevice::new());
        let mut tracker = tracker(&device);

        tracker.enable_driving_mode();
        let result = tracker.disable_driving_mode(true).await;

        assert_eq!(result, Some(Ok(device.position)));
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert_eq!(tracker.latest().unwrap().origin, FixOrigin::OneShot);
    }

    #[tokio::test(start_paused = true)]
    async fn enable_twice_keeps_one_subscription() {
        let device = Arc::new(FakeDevice::new());
        let mut tracker = tracker(&device);

        tracker.enable_driving_mode();
        tracker.enable_driving_mode();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(device.live_watches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let device = Arc::new(FakeDevice::new());
        let mut tracker = tracker(&device);

        tracker.stop();
        tracker.enable_driving_mode();
        tracker.stop();
        tracker.stop();
        assert_eq!(tracker.state(), TrackerState::Idle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(device.live_watches(), 0);
        assert!(tracker.latest().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_tracker_cancels_tracking() {
        let device = Arc::new(FakeDevice::new());
        let mut tracker = tracker(&device);
        tracker.enable_driving_mode();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(device.live_watches(), 1);

        drop(tracker);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(device.live_watches(), 0);
        assert_eq!(device.fixes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_one_shot_times_out() {
        let mut tracker = GeolocationTracker::new(Arc::new(SilentDevice), TrackerConfig::default());
        let errors = tracker.errors();
        let started = tokio::time::Instant::now();

        let err = tracker.locate_once().await.unwrap_err();

        assert_eq!(err, LocationError::Timeout);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert_eq!(*errors.borrow(), Some(LocationError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_one_shot_returns_to_idle() {
        let mut tracker = GeolocationTracker::new(Arc::new(SilentDevice), TrackerConfig::default());
        let states = tracker.state_changes();

        {
            let fix = tracker.locate_once();
            tokio::pin!(fix);
            tokio::select! {
                _ = &mut fix => panic!("a silent device should not answer"),
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
            assert_eq!(*states.borrow(), TrackerState::OneShotPending);
        }

        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(tracker.latest().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_poll_reports_timeout_while_tracking() {
        let mut tracker = GeolocationTracker::new(Arc::new(SilentDevice), TrackerConfig::default());
        let errors = tracker.errors();

        tracker.enable_driving_mode();
        // First poll at 10 s, bounded by its own 10 s timeout
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(*errors.borrow(), Some(LocationError::Timeout));
        assert_eq!(tracker.state(), TrackerState::Tracking);

        tracker.stop();
        assert_eq!(tracker.state(), TrackerState::Idle);
    }
}

//! Message-thread notification pump.
//!
//! Mutators only raise dirty flags. The pump is the other half: on every tick
//! it walks all parameters and data items of a [`StateRegistry`], clears each
//! raised flag and calls that entity's listeners. It is the only place
//! listener callbacks run.
//!
//! Scheduling is adaptive. A tick that dispatched something schedules the
//! next one after the fast interval; an idle tick grows the interval by one
//! idle step, bounded to the idle floor and ceiling:
//!
//! ```text
//!            activity
//!    ┌──────────────────────┐
//!    v                      │
//! Active ──── no activity ──> Idle ──┐ no activity:
//!  (fast)                    (slow) <┘ interval = clamp(prev + step, floor, ceiling)
//! ```
//!
//! Either drive [`NotificationPump::tick`] from an existing message loop
//! (honouring the returned delay) or let [`PumpThread`] run it on its own
//! thread. A registry accepts one pump thread at a time.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::PumpConfig;
use crate::error::{ConfigError, PumpError};
use crate::registry::StateRegistry;

/// Pump scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// The last tick dispatched at least one notification.
    Active,
    /// The last tick found nothing to dispatch.
    Idle,
}

/// Polls a registry's dirty flags and runs listeners.
///
/// Not `Sync`: a pump belongs to exactly one thread, so ticks never overlap.
pub struct NotificationPump {
    registry: Arc<StateRegistry>,
    config: PumpConfig,
    interval: Duration,
    state: PumpState,
}

impl NotificationPump {
    /// Create a pump; the first tick is due after the fast interval.
    ///
    /// Fails if `config` doesn't pass [`PumpConfig::validate`].
    pub fn new(registry: Arc<StateRegistry>, config: PumpConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry,
            config,
            interval: config.fast_interval(),
            state: PumpState::Active,
        })
    }

    /// Dispatch everything that changed and return the delay until the next tick.
    pub fn tick(&mut self) -> Duration {
        let dispatched = self.registry.dispatch_pending();

        if dispatched > 0 {
            log::trace!("pump dispatched {} notification(s)", dispatched);
            self.state = PumpState::Active;
            self.interval = self.config.fast_interval();
        } else {
            self.state = PumpState::Idle;
            self.interval = self
                .interval
                .saturating_add(self.config.idle_step())
                .clamp(self.config.idle_floor(), self.config.idle_ceiling());
        }
        self.interval
    }

    /// State after the last tick.
    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Delay until the next tick is due.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Registry being polled.
    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }
}

/// Wake-up channel between mutators and a [`PumpThread`].
#[derive(Debug, Default)]
pub(crate) struct PumpSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

#[derive(Debug, Default)]
struct SignalState {
    woken: bool,
    stopped: bool,
    running: bool,
}

impl PumpSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Request an out-of-band tick.
    pub(crate) fn wake(&self) {
        self.lock().woken = true;
        self.condvar.notify_one();
    }

    /// Register a pump thread; `false` if one is already registered.
    pub(crate) fn claim(&self) -> bool {
        let mut state = self.lock();
        if state.running {
            return false;
        }
        state.running = true;
        state.stopped = false;
        true
    }

    /// Unregister the pump thread once it has exited.
    pub(crate) fn release(&self) {
        self.lock().running = false;
    }

    /// Ask the pump thread to exit.
    pub(crate) fn stop(&self) {
        self.lock().stopped = true;
        self.condvar.notify_all();
    }

    /// Consume a pending wake request.
    #[cfg(test)]
    pub(crate) fn take_wake(&self) -> bool {
        std::mem::take(&mut self.lock().woken)
    }

    /// Sleep until `timeout` elapses or a wake arrives.
    ///
    /// Returns `false` once the signal has been stopped.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (mut guard, _) = self
            .condvar
            .wait_timeout_while(guard, timeout, |s| !s.woken && !s.stopped)
            .unwrap_or_else(PoisonError::into_inner);
        guard.woken = false;
        !guard.stopped
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A [`NotificationPump`] running on a dedicated thread.
///
/// That thread becomes the message thread for listener purposes. The thread
/// is stopped and joined when the handle is dropped.
pub struct PumpThread {
    signal: Arc<PumpSignal>,
    handle: Option<JoinHandle<()>>,
}

impl PumpThread {
    /// Start pumping `registry` on a new thread named `procstate-pump`.
    ///
    /// Fails with [`PumpError::AlreadyRunning`] while another pump thread
    /// serves the same registry; listeners only ever run on one thread.
    pub fn spawn(registry: Arc<StateRegistry>, config: PumpConfig) -> Result<Self, PumpError> {
        let mut pump = NotificationPump::new(registry, config)?;
        let signal = pump.registry().signal();
        if !signal.claim() {
            return Err(PumpError::AlreadyRunning);
        }

        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("procstate-pump".to_string())
            .spawn(move || {
                log::debug!("pump thread started");
                let mut delay = pump.interval();
                while thread_signal.wait(delay) {
                    delay = pump.tick();
                }
                log::debug!("pump thread stopped");
            })
            .map_err(|e| {
                signal.release();
                PumpError::Spawn(e)
            })?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Run a tick as soon as possible instead of at the scheduled time.
    pub fn wake(&self) {
        self.signal.wake();
    }

    /// Stop the thread and wait for it to finish its current tick.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.signal.stop();
            if handle.join().is_err() {
                log::error!("pump thread panicked");
            }
            self.signal.release();
        }
    }
}

impl Drop for PumpThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_info::ParameterSpec;
    use crate::registry::StateRegistryBuilder;
    use std::time::Instant;

    fn registry() -> Arc<StateRegistry> {
        let mut builder = StateRegistryBuilder::new();
        builder
            .add_parameter(ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0))
            .unwrap();
        Arc::new(builder.build())
    }

    #[test]
    fn test_first_tick_reports_initial_values() {
        let mut pump = NotificationPump::new(registry(), PumpConfig::default()).unwrap();
        assert_eq!(pump.tick(), Duration::from_millis(20));
        assert_eq!(pump.state(), PumpState::Active);
    }

    #[test]
    fn test_idle_backoff_is_bounded() {
        let mut pump = NotificationPump::new(registry(), PumpConfig::default()).unwrap();
        pump.tick();

        // 20 + 20 clamps up to the floor
        assert_eq!(pump.tick(), Duration::from_millis(50));
        assert_eq!(pump.state(), PumpState::Idle);
        assert_eq!(pump.tick(), Duration::from_millis(70));

        for _ in 0..100 {
            let next = pump.tick();
            assert!(next >= Duration::from_millis(50));
            assert!(next <= Duration::from_millis(500));
        }
        assert_eq!(pump.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_activity_resets_to_fast_interval() {
        let mut pump = NotificationPump::new(registry(), PumpConfig::default()).unwrap();
        for _ in 0..30 {
            pump.tick();
        }
        assert_eq!(pump.interval(), Duration::from_millis(500));

        pump.registry().parameter("volume").unwrap().set_value(0.5);
        assert_eq!(pump.tick(), Duration::from_millis(20));
        assert_eq!(pump.state(), PumpState::Active);
    }

    #[test]
    fn test_signal_wait() {
        let signal = PumpSignal::new();
        signal.wake();
        let start = Instant::now();
        assert!(signal.wait(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(!signal.take_wake());

        signal.stop();
        assert!(!signal.wait(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let inverted = PumpConfig::new().with_idle_floor_ms(600);
        assert!(matches!(
            NotificationPump::new(registry(), inverted),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PumpThread::spawn(registry(), inverted),
            Err(PumpError::Config(_))
        ));

        let stalled = PumpConfig::new().with_fast_interval_ms(0);
        assert!(NotificationPump::new(registry(), stalled).is_err());
    }

    #[test]
    fn test_huge_idle_step_stays_at_ceiling() {
        let config = PumpConfig::new()
            .with_idle_ceiling_ms(u64::MAX)
            .with_idle_step_ms(u64::MAX);
        let mut pump = NotificationPump::new(registry(), config).unwrap();
        pump.tick();
        for _ in 0..3 {
            assert_eq!(pump.tick(), Duration::from_millis(u64::MAX));
        }
    }

    #[test]
    fn test_one_pump_thread_per_registry() {
        let registry = registry();
        let first = PumpThread::spawn(Arc::clone(&registry), PumpConfig::default()).unwrap();
        assert!(matches!(
            PumpThread::spawn(Arc::clone(&registry), PumpConfig::default()),
            Err(PumpError::AlreadyRunning)
        ));

        // The refused spawn must not have stopped the running thread
        assert!(!registry.signal().lock().stopped);

        drop(first);
        let second = PumpThread::spawn(Arc::clone(&registry), PumpConfig::default()).unwrap();
        assert!(!registry.signal().lock().stopped);
        second.stop();
        assert!(!registry.signal().lock().running);
    }

    #[test]
    fn test_pump_thread_stops_on_drop() {
        let thread = PumpThread::spawn(registry(), PumpConfig::default()).unwrap();
        thread.wake();
        drop(thread);
    }
}

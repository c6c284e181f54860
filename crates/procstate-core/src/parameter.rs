//! Automatable parameters with lock-free atomic storage.
//!
//! A [`Parameter`] stores its current natural-unit value in a single
//! `AtomicU64` (the bit pattern of an `f64`). Every write snaps the value to
//! the parameter's range, stores it with one atomic swap, and raises the
//! parameter's dirty flag when the value actually changed. Nothing on that
//! path locks or allocates, so the audio thread and host automation can write
//! concurrently.
//!
//! Listeners are never called from a write. They run on the message thread
//! when the [`NotificationPump`](crate::NotificationPump) finds the dirty
//! flag set, receiving the value current at that moment. Several writes
//! between two pump ticks therefore produce a single call with the last value.
//!
//! # Thread roles
//!
//! | Method | Audio thread | Message thread | Loader thread |
//! |--------|:---:|:---:|:---:|
//! | [`value`](Parameter::value), [`normalized`](Parameter::normalized), [`RawValue::get`] | yes | yes | yes |
//! | [`set_normalized`](Parameter::set_normalized), [`set_value`](Parameter::set_value) | yes | yes | yes |
//! | [`add_listener`](Parameter::add_listener), [`remove_listener`](Parameter::remove_listener) | no | yes | no |

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::host::HostNotifier;
use crate::listeners::{DirtyFlag, ListenerId, ListenerList};
use crate::parameter_format::{strip_suffix_ignore_case, Formatter};
use crate::parameter_info::{ParameterFlags, ParameterSpec, TextToValue, ValueToText};
use crate::parameter_range::ParameterRange;

/// Callback invoked with `(parameter_id, new_value)` on the message thread.
pub type ParameterListener = dyn Fn(&str, f64) + Send + Sync;

/// Read handle to a parameter's natural-unit value.
///
/// Cloneable and valid for as long as any clone lives, so the audio thread can
/// fetch it once during setup and read it every block without a lookup.
///
/// ```ignore
/// let volume = registry.raw_value("volume").expect("registered in setup");
/// for sample in block.iter_mut() {
///     *sample *= volume.get() as f32;
/// }
/// ```
#[derive(Clone)]
pub struct RawValue(Arc<AtomicU64>);

impl RawValue {
    /// Current natural-unit value. One relaxed atomic load.
    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawValue").field(&self.get()).finish()
    }
}

/// A single automatable value owned by a [`StateRegistry`](crate::StateRegistry).
pub struct Parameter {
    index: usize,
    id: String,
    name: String,
    label: String,
    range: ParameterRange,
    default_value: f64,
    flags: ParameterFlags,
    formatter: Formatter,
    to_text: Option<ValueToText>,
    from_text: Option<TextToValue>,
    /// Natural-unit value as `f64` bits.
    value: Arc<AtomicU64>,
    /// Set until the first write, which always raises the dirty flag.
    first_write: AtomicBool,
    dirty: DirtyFlag,
    listeners: ListenerList<ParameterListener>,
    host: Option<Arc<dyn HostNotifier>>,
}

impl Parameter {
    pub(crate) fn new(
        index: usize,
        spec: ParameterSpec,
        host: Option<Arc<dyn HostNotifier>>,
    ) -> Self {
        let default_value = spec.range.snap(spec.default_value);

        Self {
            index,
            id: spec.id,
            name: spec.name,
            label: spec.label,
            range: spec.range,
            default_value,
            flags: spec.flags,
            formatter: spec.formatter,
            to_text: spec.to_text,
            from_text: spec.from_text,
            value: Arc::new(AtomicU64::new(default_value.to_bits())),
            first_write: AtomicBool::new(true),
            // Listeners hear about every parameter once after construction
            dirty: DirtyFlag::new(true),
            listeners: ListenerList::new(),
            host,
        }
    }

    // === Metadata ===

    /// Position in the registry (enumeration order).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Unique string identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Value range.
    pub fn range(&self) -> &ParameterRange {
        &self.range
    }

    /// Classification flags.
    pub fn flags(&self) -> ParameterFlags {
        self.flags
    }

    /// Whether this is a meta parameter.
    pub fn is_meta(&self) -> bool {
        self.flags.is_meta
    }

    /// Whether the host may automate this parameter.
    pub fn is_automatable(&self) -> bool {
        self.flags.is_automatable
    }

    /// Whether the host should treat this parameter as discrete.
    pub fn is_discrete(&self) -> bool {
        self.flags.is_discrete
    }

    /// Default value in natural units (snapped to the range).
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Default value, normalized.
    pub fn default_normalized(&self) -> f64 {
        self.range.normalize(self.default_value)
    }

    /// Number of legal values for host UIs.
    pub fn num_steps(&self) -> i32 {
        self.range.num_steps()
    }

    // === Value access ===

    /// Current value in natural units.
    #[inline]
    pub fn value(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Current value, normalized to 0.0-1.0.
    #[inline]
    pub fn normalized(&self) -> f64 {
        self.range.normalize(self.value())
    }

    /// Handle for zero-lookup reads from the audio thread.
    pub fn raw_value(&self) -> RawValue {
        RawValue(Arc::clone(&self.value))
    }

    /// Set from a normalized value (host automation entry point).
    ///
    /// The value is converted to natural units and snapped before it is
    /// stored. Lock-free and allocation-free. NaN is ignored.
    #[inline]
    pub fn set_normalized(&self, normalized: f64) {
        if normalized.is_nan() {
            return;
        }
        self.store(self.range.denormalize(normalized));
    }

    /// Set from a natural-unit value, telling the host when it changes.
    ///
    /// This is the entry point for edits that originate inside the
    /// component (UI, presets). Lock-free; the host hook must be too.
    /// The value is snapped in natural units directly rather than going
    /// through [`set_normalized`](Self::set_normalized), which would add
    /// skew rounding error.
    pub fn set_value(&self, value: f64) {
        if value.is_nan() {
            return;
        }
        if self.store(value) {
            if let Some(host) = &self.host {
                host.parameter_changed(self.index, self.normalized());
            }
        }
    }

    /// Set from a natural-unit value without notifying the host.
    ///
    /// Used when the host itself is pushing state (restore).
    pub(crate) fn restore_value(&self, value: f64) {
        if !value.is_nan() {
            self.store(value);
        }
    }

    /// Snap and store; returns whether the stored value changed.
    #[inline]
    fn store(&self, value: f64) -> bool {
        let snapped = self.range.snap(value);
        let previous = f64::from_bits(self.value.swap(snapped.to_bits(), Ordering::Relaxed));
        let first = self.first_write.swap(false, Ordering::Relaxed);
        let changed = previous != snapped;

        if changed || first {
            self.dirty.mark();
        }
        changed
    }

    // === Gestures ===

    /// Tell the host a drag-style edit is starting.
    pub fn begin_change_gesture(&self) {
        if let Some(host) = &self.host {
            host.begin_gesture(self.index);
        }
    }

    /// Tell the host a drag-style edit has finished.
    pub fn end_change_gesture(&self) {
        if let Some(host) = &self.host {
            host.end_gesture(self.index);
        }
    }

    // === Text conversion ===

    /// Display text for a natural-unit value.
    pub fn text_for_value(&self, value: f64) -> String {
        match &self.to_text {
            Some(to_text) => to_text(value),
            None => self.formatter.text(value),
        }
    }

    /// Display text for the current value.
    pub fn text(&self) -> String {
        self.text_for_value(self.value())
    }

    /// Parse display text into a legal natural-unit value.
    ///
    /// The default parser accepts the parameter's unit label as a suffix.
    /// Returns `None` if the text can't be parsed.
    pub fn value_for_text(&self, text: &str) -> Option<f64> {
        let parsed = match &self.from_text {
            Some(from_text) => from_text(text),
            None => {
                let trimmed = text.trim();
                let bare = strip_suffix_ignore_case(trimmed, &self.label).unwrap_or(trimmed);
                self.formatter.parse(bare)
            }
        }?;

        if parsed.is_nan() {
            None
        } else {
            Some(self.range.snap(parsed))
        }
    }

    // === Listeners ===

    /// Subscribe to change notifications.
    ///
    /// The callback runs on the message thread, from the notification pump.
    pub fn add_listener(
        &self,
        listener: impl Fn(&str, f64) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    /// Unsubscribe. Returns `false` if `id` was not subscribed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether a change is waiting for the next pump tick.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_pending()
    }

    /// Clear the dirty flag and call listeners if it was set.
    pub(crate) fn dispatch_if_dirty(&self) -> bool {
        if !self.dirty.take() {
            return false;
        }
        let value = self.value();
        self.listeners.for_each(|listener| listener(&self.id, value));
        true
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("index", &self.index)
            .field("id", &self.id)
            .field("value", &self.value())
            .field("range", &self.range)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Drop for Parameter {
    fn drop(&mut self) {
        let remaining = self.listeners.len();
        if remaining > 0 {
            log::error!(
                "parameter {:?} dropped with {} listener(s) still attached",
                self.id,
                remaining
            );
            debug_assert!(
                std::thread::panicking(),
                "listeners must be removed before parameter {:?} is dropped",
                self.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn volume() -> Parameter {
        Parameter::new(0, ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0), None)
    }

    #[derive(Default)]
    struct RecordingHost {
        changes: Mutex<Vec<(usize, f64)>>,
        gestures: Mutex<Vec<&'static str>>,
    }

    impl HostNotifier for RecordingHost {
        fn parameter_changed(&self, index: usize, normalized: f64) {
            self.changes.lock().unwrap().push((index, normalized));
        }
        fn begin_gesture(&self, _index: usize) {
            self.gestures.lock().unwrap().push("begin");
        }
        fn end_gesture(&self, _index: usize) {
            self.gestures.lock().unwrap().push("end");
        }
    }

    #[test]
    fn test_defaults() {
        let p = volume();
        assert_eq!(p.value(), 1.0);
        assert_eq!(p.normalized(), 0.5);
        assert_eq!(p.default_normalized(), 0.5);
        assert!(p.is_automatable());
        assert!(!p.is_meta());
        assert!(!p.is_discrete());
    }

    #[test]
    fn test_set_normalized_snaps_and_clamps() {
        let range = ParameterRange::new(0.0..=10.0).with_interval(0.5);
        let p = Parameter::new(0, ParameterSpec::with_range("p", "P", range, 0.0), None);

        p.set_normalized(0.23);
        assert!((p.value() - 2.5).abs() < 1e-10);

        p.set_normalized(1.7);
        assert_eq!(p.value(), 10.0);

        p.set_normalized(-3.0);
        assert_eq!(p.value(), 0.0);
    }

    #[test]
    fn test_normalized_stays_in_range_and_on_step() {
        let range = ParameterRange::new(-24.0..=24.0)
            .with_interval(0.25)
            .with_skew(0.7);
        let p = Parameter::new(0, ParameterSpec::with_range("p", "P", range, 0.0), None);

        for i in 0..=1000 {
            p.set_normalized(i as f64 / 1000.0);
            let v = p.value();
            assert!(range.contains(v));
            let steps = (v - range.start) / range.interval;
            assert!((steps - steps.round()).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&p.normalized()));
        }
    }

    #[test]
    fn test_initially_dirty_then_clean_after_dispatch() {
        let p = volume();
        assert!(p.is_dirty());
        assert!(p.dispatch_if_dirty());
        assert!(!p.is_dirty());
        assert!(!p.dispatch_if_dirty());
    }

    #[test]
    fn test_first_write_always_marks_dirty() {
        let p = volume();
        p.dispatch_if_dirty();

        // Same value as the default, still the first write
        p.set_value(1.0);
        assert!(p.is_dirty());
        p.dispatch_if_dirty();

        // Same value again: nothing to report
        p.set_value(1.0);
        assert!(!p.is_dirty());

        p.set_value(1.5);
        assert!(p.is_dirty());
    }

    #[test]
    fn test_listeners_only_run_on_dispatch() {
        let p = volume();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = {
            let seen = Arc::clone(&seen);
            p.add_listener(move |id, v| seen.lock().unwrap().push((id.to_string(), v)))
        };
        p.dispatch_if_dirty();
        seen.lock().unwrap().clear();

        p.set_value(0.2);
        p.set_value(0.4);
        p.set_value(0.6);
        assert!(seen.lock().unwrap().is_empty());

        p.dispatch_if_dirty();
        assert_eq!(*seen.lock().unwrap(), vec![("volume".to_string(), 0.6)]);

        assert!(p.remove_listener(id));
    }

    #[test]
    fn test_set_value_notifies_host_only_on_change() {
        let host = Arc::new(RecordingHost::default());
        let p = Parameter::new(
            3,
            ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0),
            Some(host.clone() as Arc<dyn HostNotifier>),
        );

        p.set_value(1.0);
        p.set_value(2.0);
        p.set_value(2.0);
        assert_eq!(*host.changes.lock().unwrap(), vec![(3, 1.0)]);

        // Host-driven writes are not echoed back
        p.set_normalized(0.0);
        p.restore_value(1.0);
        assert_eq!(host.changes.lock().unwrap().len(), 1);

        p.begin_change_gesture();
        p.end_change_gesture();
        assert_eq!(*host.gestures.lock().unwrap(), vec!["begin", "end"]);
    }

    #[test]
    fn test_nan_is_ignored() {
        let p = volume();
        p.set_normalized(f64::NAN);
        p.set_value(f64::NAN);
        assert_eq!(p.value(), 1.0);
    }

    #[test]
    fn test_raw_value_tracks_writes() {
        let p = volume();
        let raw = p.raw_value();
        p.set_value(1.25);
        assert_eq!(raw.get(), 1.25);
        p.set_normalized(0.0);
        assert_eq!(raw.get(), 0.0);
    }

    #[test]
    fn test_default_text_conversion() {
        let p = Parameter::new(
            0,
            ParameterSpec::new("gain", "Gain", -60.0..=12.0, 0.0)
                .with_label("dB")
                .with_formatter(Formatter::Decibels {
                    precision: 1,
                    min_db: -60.0,
                }),
            None,
        );
        assert_eq!(p.text_for_value(-6.0), "-6.0");
        assert_eq!(p.value_for_text("-6.0dB"), Some(-6.0));
        assert_eq!(p.value_for_text("-6.0 dB"), Some(-6.0));
        assert_eq!(p.value_for_text("40"), Some(12.0));
        assert_eq!(p.value_for_text("loud"), None);
    }

    #[test]
    fn test_custom_text_conversion() {
        let p = Parameter::new(
            0,
            ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0)
                .with_to_text(|v| format!("{:.0}%", v * 50.0))
                .with_from_text(|s| s.trim_end_matches('%').parse::<f64>().ok().map(|v| v / 50.0)),
            None,
        );
        assert_eq!(p.text(), "50%");
        assert_eq!(p.value_for_text("100%"), Some(2.0));
    }

    #[test]
    fn test_concurrent_writers_stay_in_range() {
        let range = ParameterRange::new(0.0..=1.0).with_interval(0.1);
        let p = Arc::new(Parameter::new(
            0,
            ParameterSpec::with_range("p", "P", range, 0.0),
            None,
        ));
        let writes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let p = Arc::clone(&p);
                let writes = Arc::clone(&writes);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        p.set_normalized(((i * (t + 1)) % 97) as f64 / 96.0);
                        writes.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(writes.load(Ordering::Relaxed), 4000);
        let v = p.value();
        assert!(range.contains(v));
        assert!(((v * 10.0) - (v * 10.0).round()).abs() < 1e-9);
    }
}

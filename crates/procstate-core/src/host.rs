//! Host automation hook.
//!
//! Plugin format wrappers implement [`HostNotifier`] to learn about
//! parameter edits that originate inside the component (UI drags, state
//! restores driven by the component itself), so the host can record
//! automation. Parameters are identified by their registration index.

/// Receiver for parameter edits the host should hear about.
///
/// `parameter_changed` can be called from any thread, including the audio
/// thread; implementations must not block or allocate.
pub trait HostNotifier: Send + Sync {
    /// A parameter was set to a new normalized value.
    fn parameter_changed(&self, index: usize, normalized: f64);

    /// The user started an edit gesture (e.g. mouse down on a knob).
    fn begin_gesture(&self, _index: usize) {}

    /// The user finished an edit gesture.
    fn end_gesture(&self, _index: usize) {}
}

//! Binding a UI control to a parameter.
//!
//! A [`ParameterAttachment`] keeps one control and one parameter in sync:
//!
//! - parameter changes reach the control through a listener, so they arrive
//!   on the message thread via the notification pump;
//! - control edits go to [`Parameter::set_value`], so the host hears about
//!   them;
//! - drags are bracketed with change gestures.
//!
//! Controls often report programmatic updates as if the user had moved
//! them. Edits arriving while the attachment is itself updating the control
//! are dropped, so a value never bounces back into the parameter.
//!
//! ```ignore
//! let attachment = ParameterAttachment::new(Arc::clone(&registry), "volume", knob.clone())?;
//! knob.on_change({
//!     let link = attachment.link();
//!     move |v| link.control_changed(v)
//! });
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{RegistryError, RegistryResult};
use crate::listeners::ListenerId;
use crate::parameter::Parameter;
use crate::parameter_range::ParameterRange;
use crate::registry::{ParameterHandle, StateRegistry};

/// A UI control that displays a single value.
pub trait Control: Send + Sync {
    /// Adopt the parameter's range and default (e.g. for double-click reset).
    fn configure(&self, _range: &ParameterRange, _default_value: f64) {}

    /// Show a new natural-unit value.
    fn set_displayed_value(&self, value: f64);
}

struct Shared {
    registry: Arc<StateRegistry>,
    handle: ParameterHandle,
    /// Raised while the attachment is pushing a value into the control.
    updating: AtomicBool,
}

impl Shared {
    fn parameter(&self) -> &Parameter {
        self.registry.parameter_at(self.handle)
    }
}

/// Handle a control uses to report user edits to its attachment.
#[derive(Clone)]
pub struct ControlLink(Arc<Shared>);

impl ControlLink {
    /// The user moved the control to `value` (natural units).
    pub fn control_changed(&self, value: f64) {
        if !self.0.updating.load(Ordering::Acquire) {
            self.0.parameter().set_value(value);
        }
    }

    /// The user grabbed the control.
    pub fn drag_started(&self) {
        self.0.parameter().begin_change_gesture();
    }

    /// The user released the control.
    pub fn drag_ended(&self) {
        self.0.parameter().end_change_gesture();
    }
}

impl fmt::Debug for ControlLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControlLink")
            .field(&self.0.parameter().id())
            .finish()
    }
}

/// Keeps a [`Control`] and a parameter in sync until dropped.
///
/// Create and drop attachments on the message thread.
pub struct ParameterAttachment {
    shared: Arc<Shared>,
    listener: ListenerId,
}

impl ParameterAttachment {
    /// Attach `control` to the parameter `id`.
    ///
    /// The control is configured and shows the current value before this
    /// returns.
    pub fn new(
        registry: Arc<StateRegistry>,
        id: &str,
        control: Arc<dyn Control>,
    ) -> RegistryResult<Self> {
        let handle = registry
            .parameter_handle(id)
            .ok_or_else(|| RegistryError::UnknownIdentifier(id.to_string()))?;
        let shared = Arc::new(Shared {
            registry,
            handle,
            updating: AtomicBool::new(false),
        });

        let parameter = shared.parameter();
        control.configure(parameter.range(), parameter.default_value());
        push_value(&shared.updating, control.as_ref(), parameter.value());

        let listener = {
            let shared_for_listener = Arc::clone(&shared);
            parameter.add_listener(move |_, value| {
                push_value(&shared_for_listener.updating, control.as_ref(), value);
            })
        };

        Ok(Self { shared, listener })
    }

    /// Link for forwarding control edits.
    pub fn link(&self) -> ControlLink {
        ControlLink(Arc::clone(&self.shared))
    }

    /// The attached parameter.
    pub fn parameter(&self) -> &Parameter {
        self.shared.parameter()
    }
}

fn push_value(updating: &AtomicBool, control: &dyn Control, value: f64) {
    updating.store(true, Ordering::Release);
    control.set_displayed_value(value);
    updating.store(false, Ordering::Release);
}

impl Drop for ParameterAttachment {
    fn drop(&mut self) {
        self.shared.parameter().remove_listener(self.listener);
    }
}

impl fmt::Debug for ParameterAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterAttachment")
            .field("parameter", &self.parameter().id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostNotifier;
    use crate::parameter_info::ParameterSpec;
    use crate::registry::StateRegistryBuilder;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Knob {
        shown: Mutex<Vec<f64>>,
        configured: Mutex<Option<(f64, f64, f64)>>,
        /// Simulates a widget that reports programmatic updates as edits.
        echo: Mutex<Option<ControlLink>>,
    }

    impl Control for Knob {
        fn configure(&self, range: &ParameterRange, default_value: f64) {
            *self.configured.lock().unwrap() = Some((range.start, range.end, default_value));
        }

        fn set_displayed_value(&self, value: f64) {
            self.shown.lock().unwrap().push(value);
            if let Some(link) = self.echo.lock().unwrap().clone() {
                link.control_changed(value + 0.5);
            }
        }
    }

    #[derive(Default)]
    struct Host {
        events: Mutex<Vec<String>>,
    }

    impl HostNotifier for Host {
        fn parameter_changed(&self, index: usize, normalized: f64) {
            self.events.lock().unwrap().push(format!("set {index} {normalized}"));
        }
        fn begin_gesture(&self, index: usize) {
            self.events.lock().unwrap().push(format!("begin {index}"));
        }
        fn end_gesture(&self, index: usize) {
            self.events.lock().unwrap().push(format!("end {index}"));
        }
    }

    fn registry(host: Arc<Host>) -> Arc<StateRegistry> {
        let mut builder = StateRegistryBuilder::new().with_host(host);
        builder
            .add_parameter(ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0))
            .unwrap();
        Arc::new(builder.build())
    }

    #[test]
    fn test_unknown_parameter() {
        let registry = registry(Arc::default());
        assert!(ParameterAttachment::new(registry, "missing", Arc::new(Knob::default())).is_err());
    }

    #[test]
    fn test_initial_sync_and_updates() {
        let registry = registry(Arc::default());
        let knob = Arc::new(Knob::default());
        let attachment =
            ParameterAttachment::new(Arc::clone(&registry), "volume", knob.clone()).unwrap();

        assert_eq!(*knob.configured.lock().unwrap(), Some((0.0, 2.0, 1.0)));
        assert_eq!(*knob.shown.lock().unwrap(), vec![1.0]);
        assert_eq!(registry.parameter("volume").unwrap().listener_count(), 1);

        attachment.parameter().set_normalized(0.25);
        registry.dispatch_pending();
        assert_eq!(knob.shown.lock().unwrap().last(), Some(&0.5));

        drop(attachment);
        assert_eq!(registry.parameter("volume").unwrap().listener_count(), 0);
    }

    #[test]
    fn test_control_edits_reach_host_with_gestures() {
        let host = Arc::new(Host::default());
        let registry = registry(Arc::clone(&host));
        let attachment =
            ParameterAttachment::new(Arc::clone(&registry), "volume", Arc::new(Knob::default()))
                .unwrap();

        let link = attachment.link();
        link.drag_started();
        link.control_changed(1.5);
        link.drag_ended();

        assert_eq!(
            *host.events.lock().unwrap(),
            vec!["begin 0".to_string(), "set 0 0.75".to_string(), "end 0".to_string()]
        );
        assert_eq!(registry.parameter("volume").unwrap().value(), 1.5);
    }

    #[test]
    fn test_programmatic_updates_are_not_echoed() {
        let registry = registry(Arc::default());
        let knob = Arc::new(Knob::default());
        let attachment =
            ParameterAttachment::new(Arc::clone(&registry), "volume", knob.clone()).unwrap();
        *knob.echo.lock().unwrap() = Some(attachment.link());

        attachment.parameter().set_value(0.5);
        registry.dispatch_pending();

        assert_eq!(knob.shown.lock().unwrap().last(), Some(&0.5));
        assert_eq!(attachment.parameter().value(), 0.5);

        *knob.echo.lock().unwrap() = None;
    }
}

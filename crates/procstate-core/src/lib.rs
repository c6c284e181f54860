//! # procstate-core
//!
//! Real-time safe parameter and state synchronization for audio components.
//!
//! The audio thread reads and writes parameter values through single atomic
//! words. Every write raises a dirty flag; a [`NotificationPump`] on the
//! message thread polls those flags and calls listeners, coalescing bursts of
//! writes into one call carrying the latest value. The whole state
//! (parameters plus auxiliary data items) snapshots to a [`StateNode`] tree
//! and to a binary envelope for host persistence.
//!
//! ## Main Types
//!
//! - [`StateRegistryBuilder`] / [`StateRegistry`] - registration and lookup
//! - [`Parameter`] - atomic automatable value
//! - [`DataItem`] - trait for auxiliary serializable state
//! - [`FileReference`] - data item referencing a file
//! - [`NotificationPump`] / [`PumpThread`] - listener dispatch
//! - [`ParameterAttachment`] - UI control binding
//! - [`HostNotifier`] - automation hook for plugin wrappers
//!
//! ## Threads
//!
//! ```text
//! audio thread ── set_normalized / RawValue::get ──┐
//! loader thread ── restore / from_binary ──────────┼──> dirty flags
//! message thread ── set_value (UI) ────────────────┘        │
//!                                                           v
//! message thread <── listeners ── NotificationPump::tick ───┘
//! ```

pub mod attachment;
pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod file_reference;
pub mod host;
pub mod listeners;
pub mod parameter;
pub mod parameter_format;
pub mod parameter_info;
pub mod parameter_range;
pub mod pump;
pub mod registry;
pub mod tree;

// Re-exports for convenience
pub use attachment::{Control, ControlLink, ParameterAttachment};
pub use config::PumpConfig;
pub use data::{check_kind, ChangeNotifier, DataItem, DataListener};
pub use error::{CodecError, ConfigError, DataError, PumpError, RegistryError, RegistryResult};
pub use file_reference::FileReference;
pub use host::HostNotifier;
pub use listeners::ListenerId;
pub use parameter::{Parameter, ParameterListener, RawValue};
pub use parameter_format::Formatter;
pub use parameter_info::{ParameterFlags, ParameterSpec};
pub use parameter_range::{ParameterRange, DEFAULT_NUM_STEPS};
pub use pump::{NotificationPump, PumpState, PumpThread};
pub use registry::{DataHandle, ParameterHandle, StateRegistry, StateRegistryBuilder};
pub use tree::StateNode;

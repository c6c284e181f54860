//! # procstate
//!
//! Processor state management for Rust audio components.
//!
//! procstate keeps automatable parameters and auxiliary state of an audio
//! component in one registry, lets the audio thread read and write values
//! without locking, delivers changes to the UI on the message thread, and
//! saves and restores the whole state for the host.
//!
//! ## Architecture
//!
//! ```text
//! StateRegistryBuilder (setup: parameters, data items, host hook)
//!        ↓ build()
//! Arc<StateRegistry> ── RawValue ──> audio thread
//!        ↓
//! PumpThread / NotificationPump ──> listeners, ParameterAttachment (UI)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use procstate::prelude::*;
//!
//! let mut builder = StateRegistryBuilder::new();
//! builder.add_parameter(ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0))?;
//! let registry = Arc::new(builder.build());
//!
//! let volume = registry.raw_value("volume").expect("registered above");
//! let _pump = PumpThread::spawn(Arc::clone(&registry), PumpConfig::default())?;
//!
//! // Audio callback
//! for sample in block.iter_mut() {
//!     *sample *= volume.get() as f32;
//! }
//!
//! // Host persistence
//! let chunk = registry.to_binary()?;
//! registry.from_binary(&chunk)?;
//! ```

// Re-export sub-crates
pub use procstate_core as core;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use procstate::prelude::*;
/// ```
pub mod prelude {
    pub use procstate_core::{
        // Registry
        DataHandle, ParameterHandle, StateRegistry, StateRegistryBuilder,
        // Parameters
        Formatter, Parameter, ParameterFlags, ParameterRange, ParameterSpec, RawValue,
        // Auxiliary data
        ChangeNotifier, DataItem, FileReference, StateNode,
        // Notification
        ListenerId, NotificationPump, PumpConfig, PumpState, PumpThread,
        // UI and host integration
        Control, ControlLink, HostNotifier, ParameterAttachment,
        // Error types
        CodecError, ConfigError, DataError, PumpError, RegistryError, RegistryResult,
    };
}

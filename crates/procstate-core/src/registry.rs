//! The parameter and data registry.
//!
//! Registration happens once, on a [`StateRegistryBuilder`]. Calling
//! [`build`](StateRegistryBuilder::build) seals it into a [`StateRegistry`]
//! that has no registration methods and can be shared across threads behind
//! an `Arc`. Lookups on the sealed registry are read-only scans over
//! immutable collections and never lock.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = StateRegistryBuilder::new();
//! let volume = builder.add_parameter(
//!     ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0),
//! )?;
//! builder.add_data(Arc::new(FileReference::new("sample")))?;
//! let registry = Arc::new(builder.build());
//!
//! registry.parameter_at(volume).set_value(0.5);
//! let saved = registry.to_binary()?;
//! ```
//!
//! # Snapshot layout
//!
//! ```text
//! state
//! ├── parameters
//! │   ├── PARAM id="volume" value="0.5"
//! │   └── ...
//! └── data
//!     ├── FILE __id="sample" file="/audio/kick.wav"
//!     └── ...
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::codec;
use crate::data::DataItem;
use crate::error::{CodecError, RegistryError, RegistryResult};
use crate::host::HostNotifier;
use crate::parameter::{Parameter, RawValue};
use crate::parameter_info::ParameterSpec;
use crate::pump::PumpSignal;
use crate::tree::StateNode;

/// Root tag of a snapshot.
pub const STATE_TAG: &str = "state";
/// Tag of the parameter section.
pub const PARAMETERS_TAG: &str = "parameters";
/// Tag of one parameter entry.
pub const PARAM_TAG: &str = "PARAM";
/// Tag of the data section.
pub const DATA_TAG: &str = "data";
/// Parameter id attribute.
pub const ID_ATTRIBUTE: &str = "id";
/// Parameter value attribute (natural units).
pub const VALUE_ATTRIBUTE: &str = "value";
/// Data item id attribute, added next to the item's own attributes.
pub const DATA_ID_ATTRIBUTE: &str = "__id";

/// Index of a parameter in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterHandle(usize);

impl ParameterHandle {
    /// Position in enumeration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a data item in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataHandle(usize);

impl DataHandle {
    /// Position in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A registered data item, kept both as a trait object and as `Any` so
/// callers can get their concrete type back.
struct DataEntry {
    item: Arc<dyn DataItem>,
    any: Arc<dyn Any + Send + Sync>,
}

// =========================================================================
// Builder
// =========================================================================

/// Setup phase of a [`StateRegistry`].
pub struct StateRegistryBuilder {
    specs: Vec<ParameterSpec>,
    data: Vec<DataEntry>,
    host: Option<Arc<dyn HostNotifier>>,
    signal: Arc<PumpSignal>,
}

impl StateRegistryBuilder {
    /// Start an empty registry.
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            data: Vec::new(),
            host: None,
            signal: Arc::new(PumpSignal::new()),
        }
    }

    /// Install the host automation hook shared by every parameter.
    pub fn with_host(mut self, host: Arc<dyn HostNotifier>) -> Self {
        self.host = Some(host);
        self
    }

    /// Register a parameter. Enumeration order is registration order.
    pub fn add_parameter(&mut self, spec: ParameterSpec) -> RegistryResult<ParameterHandle> {
        if self.specs.iter().any(|s| s.id == spec.id) {
            return Err(RegistryError::DuplicateIdentifier(spec.id));
        }
        log::debug!("registered parameter {:?} at index {}", spec.id, self.specs.len());
        self.specs.push(spec);
        Ok(ParameterHandle(self.specs.len() - 1))
    }

    /// Register a data item. Data ids have their own namespace.
    pub fn add_data<T: DataItem + 'static>(&mut self, item: Arc<T>) -> RegistryResult<DataHandle> {
        if self.data.iter().any(|e| e.item.id() == item.id()) {
            return Err(RegistryError::DuplicateIdentifier(item.id().to_string()));
        }
        item.notifier().attach(Arc::clone(&self.signal));
        log::debug!("registered {} data item {:?}", item.kind(), item.id());

        self.data.push(DataEntry {
            item: Arc::clone(&item) as Arc<dyn DataItem>,
            any: item,
        });
        Ok(DataHandle(self.data.len() - 1))
    }

    /// Number of parameters registered so far.
    pub fn parameter_count(&self) -> usize {
        self.specs.len()
    }

    /// Seal the registry.
    pub fn build(self) -> StateRegistry {
        let parameters: Vec<Parameter> = self
            .specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| Parameter::new(index, spec, self.host.clone()))
            .collect();

        log::debug!(
            "state registry sealed with {} parameter(s) and {} data item(s)",
            parameters.len(),
            self.data.len()
        );

        StateRegistry {
            parameters,
            data: self.data,
            signal: self.signal,
        }
    }
}

impl Default for StateRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Sealed registry
// =========================================================================

/// Owns every parameter and data item of a component.
pub struct StateRegistry {
    parameters: Vec<Parameter>,
    data: Vec<DataEntry>,
    signal: Arc<PumpSignal>,
}

impl StateRegistry {
    // === Parameters ===

    /// Find a parameter by id.
    ///
    /// This is a linear scan; cache the result or its handle.
    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.id() == id)
    }

    /// Find a parameter, treating absence as an error.
    pub fn expect_parameter(&self, id: &str) -> RegistryResult<&Parameter> {
        self.parameter(id)
            .ok_or_else(|| RegistryError::UnknownIdentifier(id.to_string()))
    }

    /// Handle for a parameter id.
    pub fn parameter_handle(&self, id: &str) -> Option<ParameterHandle> {
        self.parameters
            .iter()
            .position(|p| p.id() == id)
            .map(ParameterHandle)
    }

    /// Parameter behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different registry with more
    /// parameters than this one.
    pub fn parameter_at(&self, handle: ParameterHandle) -> &Parameter {
        &self.parameters[handle.0]
    }

    /// All parameters in registration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Lock-free read handle to a parameter's value, for the audio thread.
    pub fn raw_value(&self, id: &str) -> Option<RawValue> {
        self.parameter(id).map(Parameter::raw_value)
    }

    // === Data items ===

    /// Find a data item by id.
    pub fn data(&self, id: &str) -> Option<&Arc<dyn DataItem>> {
        self.data.iter().find(|e| e.item.id() == id).map(|e| &e.item)
    }

    /// Find a data item by id and recover its concrete type.
    ///
    /// Returns `None` if the id is unknown or the item is not a `T`.
    pub fn data_as<T: DataItem + 'static>(&self, id: &str) -> Option<Arc<T>> {
        let entry = self.data.iter().find(|e| e.item.id() == id)?;
        Arc::clone(&entry.any).downcast::<T>().ok()
    }

    /// Handle for a data id.
    pub fn data_handle(&self, id: &str) -> Option<DataHandle> {
        self.data
            .iter()
            .position(|e| e.item.id() == id)
            .map(DataHandle)
    }

    /// Data item behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different registry.
    pub fn data_at(&self, handle: DataHandle) -> &Arc<dyn DataItem> {
        &self.data[handle.0].item
    }

    /// All data items in registration order.
    pub fn data_items(&self) -> impl Iterator<Item = &Arc<dyn DataItem>> {
        self.data.iter().map(|e| &e.item)
    }

    // === Persistence ===

    /// Capture the full state as a tree.
    pub fn snapshot(&self) -> StateNode {
        let mut parameters = StateNode::new(PARAMETERS_TAG);
        for p in &self.parameters {
            parameters.push(
                StateNode::new(PARAM_TAG)
                    .with_attribute(ID_ATTRIBUTE, p.id())
                    .with_attribute(VALUE_ATTRIBUTE, p.value().to_string()),
            );
        }

        let mut data = StateNode::new(DATA_TAG);
        for entry in &self.data {
            data.push(
                entry
                    .item
                    .serialize()
                    .with_attribute(DATA_ID_ATTRIBUTE, entry.item.id()),
            );
        }

        StateNode::new(STATE_TAG)
            .with_child(parameters)
            .with_child(data)
    }

    /// Apply a tree produced by [`snapshot`](Self::snapshot).
    ///
    /// Never fails: every parameter without a usable entry returns to its
    /// default, and every data item without an entry (or whose restore
    /// fails) is reset. Host automation is not notified. Data items may
    /// block while restoring, so call this from a loader thread rather than
    /// the audio thread.
    pub fn restore(&self, root: &StateNode) {
        let empty = StateNode::new(STATE_TAG);
        let root = if root.has_tag(STATE_TAG) {
            root
        } else {
            log::warn!("state root is {:?}, restoring defaults", root.tag);
            &empty
        };

        let parameters = root.child(PARAMETERS_TAG);
        for p in &self.parameters {
            let value = parameters
                .and_then(|section| section.child_with_attribute(ID_ATTRIBUTE, p.id()))
                .and_then(|entry| entry.attribute_f64(VALUE_ATTRIBUTE));
            match value {
                Some(value) => p.restore_value(value),
                None => {
                    log::warn!("no saved value for parameter {:?}, using default", p.id());
                    p.restore_value(p.default_value());
                }
            }
        }

        let data = root.child(DATA_TAG);
        for entry in &self.data {
            let item = &entry.item;
            let saved =
                data.and_then(|section| section.child_with_attribute(DATA_ID_ATTRIBUTE, item.id()));
            let Some(saved) = saved else {
                log::warn!("no saved state for data item {:?}, resetting", item.id());
                item.reset_to_default();
                continue;
            };

            let mut node = saved.clone();
            node.remove_attribute(DATA_ID_ATTRIBUTE);
            if let Err(e) = item.restore(&node) {
                log::warn!("restoring data item {:?} failed ({}), resetting", item.id(), e);
                item.reset_to_default();
            }
        }
    }

    /// Encode the current state as a binary envelope.
    pub fn to_binary(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(&self.snapshot())
    }

    /// Restore from a binary envelope.
    ///
    /// A malformed envelope is rejected before anything is applied.
    pub fn from_binary(&self, bytes: &[u8]) -> Result<(), CodecError> {
        let root = codec::decode(bytes).inspect_err(|e| {
            log::warn!("rejected state blob: {}", e);
        })?;
        self.restore(&root);
        Ok(())
    }

    /// Return every parameter and data item to its default.
    pub fn reset_to_defaults(&self) {
        for p in &self.parameters {
            p.restore_value(p.default_value());
        }
        for entry in &self.data {
            entry.item.reset_to_default();
        }
    }

    // === Pump support ===

    /// Run listeners for everything that changed; returns how many entities
    /// were dispatched. Message thread only.
    pub(crate) fn dispatch_pending(&self) -> usize {
        let mut dispatched = 0;
        for p in &self.parameters {
            if p.dispatch_if_dirty() {
                dispatched += 1;
            }
        }
        for entry in &self.data {
            if entry.item.notifier().dispatch_if_dirty(entry.item.id()) {
                dispatched += 1;
            }
        }
        dispatched
    }

    pub(crate) fn signal(&self) -> Arc<PumpSignal> {
        Arc::clone(&self.signal)
    }
}

impl fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRegistry")
            .field("parameters", &self.parameters)
            .field(
                "data",
                &self.data.iter().map(|e| e.item.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

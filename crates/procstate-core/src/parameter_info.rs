//! Parameter declaration types.
//!
//! - [`ParameterSpec`] - everything needed to create a parameter (id, name,
//!   range, default, converters, flags)
//! - [`ParameterFlags`] - meta / automatable / discrete classification
//!
//! Specs are handed to
//! [`StateRegistryBuilder::add_parameter`](crate::StateRegistryBuilder::add_parameter)
//! during setup.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::parameter_format::Formatter;
use crate::parameter_range::ParameterRange;

/// Custom plain value → display text conversion.
pub type ValueToText = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// Custom display text → plain value conversion.
pub type TextToValue = Arc<dyn Fn(&str) -> Option<f64> + Send + Sync>;

/// Flags classifying a parameter for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterFlags {
    /// Parameter controls other parameters.
    pub is_meta: bool,
    /// Parameter can be automated by the host.
    pub is_automatable: bool,
    /// Host should treat the parameter as taking discrete values.
    pub is_discrete: bool,
}

impl Default for ParameterFlags {
    fn default() -> Self {
        Self {
            is_meta: false,
            is_automatable: true,
            is_discrete: false,
        }
    }
}

/// Declaration of a single parameter.
///
/// # Example
///
/// ```ignore
/// let volume = ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0)
///     .with_label("x")
///     .with_to_text(|v| format!("{:.0}%", v * 50.0));
/// ```
#[derive(Clone)]
pub struct ParameterSpec {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit label (e.g., "dB", "Hz").
    pub label: String,
    /// Value range.
    pub range: ParameterRange,
    /// Default value in natural units.
    pub default_value: f64,
    /// Classification flags.
    pub flags: ParameterFlags,
    /// Fallback formatter when no custom converters are given.
    pub formatter: Formatter,
    /// Custom value → text converter.
    pub to_text: Option<ValueToText>,
    /// Custom text → value converter.
    pub from_text: Option<TextToValue>,
}

impl ParameterSpec {
    /// Create a continuous, linear, automatable parameter spec.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        range: RangeInclusive<f64>,
        default_value: f64,
    ) -> Self {
        Self::with_range(id, name, ParameterRange::new(range), default_value)
    }

    /// Create a spec from a prepared [`ParameterRange`] (interval, skew).
    pub fn with_range(
        id: impl Into<String>,
        name: impl Into<String>,
        range: ParameterRange,
        default_value: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            label: String::new(),
            range,
            default_value,
            flags: ParameterFlags::default(),
            formatter: Formatter::default(),
            to_text: None,
            from_text: None,
        }
    }

    /// Set the unit label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the classification flags.
    pub fn with_flags(mut self, flags: ParameterFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Mark as a meta parameter.
    pub fn meta(mut self) -> Self {
        self.flags.is_meta = true;
        self
    }

    /// Disable automation for this parameter.
    pub fn non_automatable(mut self) -> Self {
        self.flags.is_automatable = false;
        self
    }

    /// Mark as discrete.
    pub fn discrete(mut self) -> Self {
        self.flags.is_discrete = true;
        self
    }

    /// Replace the fallback formatter.
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Install a custom value → text converter.
    pub fn with_to_text(mut self, f: impl Fn(f64) -> String + Send + Sync + 'static) -> Self {
        self.to_text = Some(Arc::new(f));
        self
    }

    /// Install a custom text → value converter.
    pub fn with_from_text(
        mut self,
        f: impl Fn(&str) -> Option<f64> + Send + Sync + 'static,
    ) -> Self {
        self.from_text = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("label", &self.label)
            .field("range", &self.range)
            .field("default_value", &self.default_value)
            .field("flags", &self.flags)
            .field("formatter", &self.formatter)
            .field("to_text", &self.to_text.is_some())
            .field("from_text", &self.from_text.is_some())
            .finish()
    }
}

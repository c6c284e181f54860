//! Noise - white noise generator demonstrating procstate.
//!
//! The component has one parameter, `volume` (0 to 2, default 1), read on
//! the audio thread through a [`RawValue`], and one data item, `sample`, a
//! [`FileReference`] whose change action checks that the file exists.
//! Host persistence goes through the registry's binary envelope.

use std::path::Path;
use std::sync::Arc;

use procstate::prelude::*;

/// Pump timing read from the bundled `Pump.toml`.
pub fn pump_config() -> Result<PumpConfig, ConfigError> {
    PumpConfig::from_toml_str(include_str!("../Pump.toml"))
}

// =============================================================================
// Noise Processor
// =============================================================================

/// White noise scaled by the `volume` parameter.
pub struct Noise {
    registry: Arc<StateRegistry>,
    volume: RawValue,
    sample: Arc<FileReference>,
    noise_state: u32,
}

impl Noise {
    /// Register the parameters and data items and seal the registry.
    pub fn new() -> RegistryResult<Self> {
        let mut builder = StateRegistryBuilder::new();
        let volume = builder.add_parameter(
            ParameterSpec::new("volume", "Volume", 0.0..=2.0, 1.0)
                .with_label("%")
                .with_formatter(Formatter::Percent { precision: 0 }),
        )?;

        let sample = Arc::new(FileReference::new("sample").with_change_action(check_file));
        builder.add_data(Arc::clone(&sample))?;

        let registry = Arc::new(builder.build());
        let volume = registry.parameter_at(volume).raw_value();

        Ok(Self {
            registry,
            volume,
            sample,
            noise_state: 0x1234_5678,
        })
    }

    /// Shared registry, for the UI and the pump.
    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    /// The referenced sample file.
    pub fn sample(&self) -> &Arc<FileReference> {
        &self.sample
    }

    /// Fill every channel with noise. Lock-free and allocation-free.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        let volume = self.volume.get() as f32;
        for channel in channels.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = volume * next_random(&mut self.noise_state);
            }
        }
    }

    /// Serialize the full state for the host.
    pub fn state_information(&self) -> Result<Vec<u8>, CodecError> {
        self.registry.to_binary()
    }

    /// Restore state handed back by the host.
    pub fn set_state_information(&self, data: &[u8]) -> Result<(), CodecError> {
        self.registry.from_binary(data)
    }
}

/// Change action for the sample reference.
fn check_file(path: &Path) -> Result<(), String> {
    if path.is_file() {
        log::info!("loaded sample {}", path.display());
        Ok(())
    } else {
        Err(format!("{} is not a file", path.display()))
    }
}

/// Xorshift PRNG mapped to `[0, 1)`.
fn next_random(state: &mut u32) -> f32 {
    let mut x = *state;
    if x == 0 {
        x = 1;
    }
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    (x >> 8) as f32 / (1u32 << 24) as f32
}

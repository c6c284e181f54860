//! Runs the noise component for a moment without a host.
//!
//! A pump thread stands in for the message thread, a printing control
//! stands in for the UI, and the state is saved and restored the way a host
//! would do it.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use noise::{pump_config, Noise};
use procstate::prelude::*;

/// Prints every value the attachment pushes to it.
struct ConsoleKnob;

impl Control for ConsoleKnob {
    fn configure(&self, range: &ParameterRange, default_value: f64) {
        println!(
            "knob range {}..={} (default {})",
            range.start, range.end, default_value
        );
    }

    fn set_displayed_value(&self, value: f64) {
        println!("knob shows {value:.2}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut noise = Noise::new()?;
    let registry = Arc::clone(noise.registry());
    let pump = PumpThread::spawn(Arc::clone(&registry), pump_config()?)?;
    let knob = ParameterAttachment::new(
        Arc::clone(&registry),
        "volume",
        Arc::new(ConsoleKnob),
    )?;

    let mut left = vec![0.0f32; 512];
    let mut right = vec![0.0f32; 512];

    // Burst of UI edits, coalesced by the pump
    let link = knob.link();
    link.drag_started();
    for step in 1..=10 {
        link.control_changed(step as f64 * 0.05);
    }
    link.drag_ended();
    thread::sleep(Duration::from_millis(100));

    {
        let mut channels: [&mut [f32]; 2] = [left.as_mut_slice(), right.as_mut_slice()];
        noise.process(&mut channels);
    }
    let peak = left.iter().chain(right.iter()).fold(0.0f32, |a, s| a.max(s.abs()));
    println!("peak after edits: {peak:.3}");

    let saved = noise.state_information()?;
    println!("saved {} bytes of state", saved.len());

    if let Some(volume) = registry.parameter("volume") {
        volume.set_value(2.0);
    }
    thread::sleep(Duration::from_millis(100));

    noise.set_state_information(&saved)?;
    thread::sleep(Duration::from_millis(100));
    println!(
        "restored volume: {}",
        registry.parameter("volume").map(Parameter::text).unwrap_or_default()
    );

    drop(knob);
    pump.stop();
    Ok(())
}

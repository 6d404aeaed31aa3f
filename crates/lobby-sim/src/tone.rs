//! Synthetic microphone input.

use std::f32::consts::TAU;

/// Continuous sine tone, split into frames on demand.
pub struct ToneGenerator {
    step: f32,
    phase: f32,
}

impl ToneGenerator {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self {
            step: TAU * frequency / sample_rate.max(1) as f32,
            phase: 0.0,
        }
    }

    pub fn next_frame(&mut self, samples: usize) -> Vec<i16> {
        let mut frame = Vec::with_capacity(samples);
        for _ in 0..samples {
            frame.push((self.phase.sin() * i16::MAX as f32 * 0.25) as i16);
            self.phase = (self.phase + self.step) % TAU;
        }
        frame
    }
}

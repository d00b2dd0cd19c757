//! Test tone generator
//!
//! A sine with a slow amplitude sweep, so the level statistics have
//! something to spread over instead of a single histogram bin.

use std::f32::consts::TAU;

/// Sweep period of the amplitude envelope
const SWEEP_SECONDS: f32 = 4.0;

/// Lowest envelope level (about -60 dB)
const MIN_GAIN: f32 = 0.001;

pub struct ToneGenerator {
    phase: f32,
    phase_inc: f32,
    sweep_phase: f32,
    sweep_inc: f32,
}

impl ToneGenerator {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        let rate = sample_rate.max(1) as f32;
        Self {
            phase: 0.0,
            phase_inc: TAU * frequency / rate,
            sweep_phase: 0.0,
            sweep_inc: TAU / (SWEEP_SECONDS * rate),
        }
    }

    /// Fill one planar stereo block
    pub fn fill(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            // Envelope in dB space: MIN_GAIN at the trough, full scale at the crest
            let sweep = 0.5 - 0.5 * self.sweep_phase.cos();
            let gain = MIN_GAIN.powf(1.0 - sweep);
            let sample = self.phase.sin() * gain;

            *l = sample;
            *r = sample;

            self.phase = (self.phase + self.phase_inc) % TAU;
            self.sweep_phase = (self.sweep_phase + self.sweep_inc) % TAU;
        }
    }
}

//! FFT Spectrum Analyzer
//!
//! Windowing and transform unit of the spectrum engine.
//! Accumulates mono samples in a ring buffer and, once per analysis hop,
//! runs a Hann-windowed real-to-complex FFT over the most recent
//! `analysis_size` samples to produce a power spectrum.
//!
//! # Real-time Safety
//!
//! Every buffer (ring, window, FFT input/output/scratch, magnitudes) is
//! allocated in [`SpectrumAnalyzer::new`]. Pushing samples and computing the
//! spectrum never allocate, lock or block.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::DspError;

/// Default analysis size (must be power of 2)
/// 8192 samples at 48kHz = ~170ms window, ~5.9Hz resolution
pub const ANALYSIS_SIZE: usize = 8192;

/// Smallest analysis size accepted by [`SpectrumAnalyzer::new`]
pub const MIN_ANALYSIS_SIZE: usize = 16;

/// Level floor in dB shared by the spectrum and the statistics engine
pub const MIN_DB: f32 = -120.0;

/// Number of positive-frequency bands for a given analysis size (N/2 + 1)
pub const fn num_bands(analysis_size: usize) -> usize {
    analysis_size / 2 + 1
}

/// Hann window coefficient
/// Hann window reduces spectral leakage in FFT analysis
fn hann_window(n: usize, size: usize) -> f32 {
    0.5 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / (size - 1) as f32).cos())
}

/// Pre-computed Hann window lookup table
struct HannWindow {
    coeffs: Box<[f32]>,
}

impl HannWindow {
    fn new(size: usize) -> Self {
        let coeffs = (0..size).map(|i| hann_window(i, size)).collect();
        Self { coeffs }
    }

    #[inline]
    fn apply(&self, sample: f32, index: usize) -> f32 {
        sample * self.coeffs[index]
    }
}

/// Spectrum analyzer that turns a live sample stream into a power spectrum
///
/// Owned by the audio thread. The result of [`compute`](Self::compute) is
/// meant to be copied into a [`SpectrumHandoff`](crate::SpectrumHandoff)
/// for consumption on another thread.
pub struct SpectrumAnalyzer {
    /// Number of samples transformed per analysis block
    analysis_size: usize,
    /// New samples between two transforms
    hop_size: usize,
    /// Ring buffer of the most recent mono samples
    sample_buffer: Box<[f32]>,
    /// Next write position in the ring (also the oldest sample)
    write_pos: usize,
    /// Samples accumulated so far, saturating at `analysis_size`
    filled: usize,
    /// Samples written since the last analysis boundary
    samples_since_fft: usize,
    window: HannWindow,
    fft: Arc<dyn RealToComplex<f32>>,
    /// Working buffer for FFT input (windowed samples)
    fft_input: Vec<f32>,
    /// Working buffer for FFT output (N/2 + 1 complex bins)
    fft_output: Vec<Complex<f32>>,
    /// Scratch space so the transform never allocates
    fft_scratch: Vec<Complex<f32>>,
    /// Output power spectrum
    magnitudes: Vec<f32>,
    /// 1 / bands^2
    scale: f32,
    /// Transforms that reported an error (for debugging)
    failure_count: u64,
}

impl SpectrumAnalyzer {
    /// Create an analyzer that transforms once per full analysis block
    pub fn new(analysis_size: usize) -> Result<Self, DspError> {
        Self::with_hop_size(analysis_size, analysis_size)
    }

    /// Create an analyzer with an explicit hop size
    ///
    /// A hop smaller than `analysis_size` produces overlapping blocks and a
    /// higher update rate for the same frequency resolution.
    pub fn with_hop_size(analysis_size: usize, hop_size: usize) -> Result<Self, DspError> {
        if !analysis_size.is_power_of_two() || analysis_size < MIN_ANALYSIS_SIZE {
            return Err(DspError::InvalidAnalysisSize(analysis_size));
        }
        if hop_size == 0 || hop_size > analysis_size {
            return Err(DspError::InvalidHopSize {
                hop: hop_size,
                analysis_size,
            });
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(analysis_size);

        let fft_input = fft.make_input_vec();
        let fft_output = fft.make_output_vec();
        let fft_scratch = fft.make_scratch_vec();
        let bands = num_bands(analysis_size);

        Ok(Self {
            analysis_size,
            hop_size,
            sample_buffer: vec![0.0; analysis_size].into_boxed_slice(),
            write_pos: 0,
            filled: 0,
            samples_since_fft: 0,
            window: HannWindow::new(analysis_size),
            fft,
            fft_input,
            fft_output,
            fft_scratch,
            magnitudes: vec![0.0; bands],
            scale: 1.0 / (bands as f32 * bands as f32),
            failure_count: 0,
        })
    }

    pub fn analysis_size(&self) -> usize {
        self.analysis_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of output bands (analysis_size / 2 + 1)
    pub fn num_bands(&self) -> usize {
        self.magnitudes.len()
    }

    /// Whether a full analysis block has been accumulated
    pub fn is_ready(&self) -> bool {
        self.filled == self.analysis_size
    }

    /// Number of transforms that failed since creation
    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Push one mono sample, returns true when an analysis boundary is reached
    ///
    /// # Real-time Safety
    /// No allocations, no locks, O(1) time.
    #[inline]
    pub fn push_sample(&mut self, sample: f32) -> bool {
        // NaN/inf would poison every bin of the next transform
        let sample = if sample.is_finite() { sample } else { 0.0 };

        self.sample_buffer[self.write_pos] = sample;
        // analysis_size is a power of two, so masking wraps the ring
        self.write_pos = (self.write_pos + 1) & (self.analysis_size - 1);

        if self.filled < self.analysis_size {
            self.filled += 1;
        }
        self.samples_since_fft += 1;

        if self.filled == self.analysis_size && self.samples_since_fft >= self.hop_size {
            self.samples_since_fft = 0;
            true
        } else {
            false
        }
    }

    /// Push a block of mono samples
    ///
    /// Returns true if at least one analysis boundary was crossed.
    /// The caller should then [`compute`](Self::compute) once; the transform
    /// always covers the most recent samples.
    pub fn push_mono(&mut self, samples: &[f32]) -> bool {
        let mut boundary = false;
        for &sample in samples {
            boundary |= self.push_sample(sample);
        }
        boundary
    }

    /// Push a planar stereo block, mixing to mono (average of L+R)
    pub fn push_planar(&mut self, left: &[f32], right: &[f32]) -> bool {
        let mut boundary = false;
        for (&l, &r) in left.iter().zip(right.iter()) {
            boundary |= self.push_sample((l + r) * 0.5);
        }
        boundary
    }

    /// Push an interleaved block with `channels` channels per frame
    pub fn push_interleaved(&mut self, buffer: &[f32], channels: usize) -> bool {
        if channels == 0 {
            return false;
        }

        let gain = 1.0 / channels as f32;
        let mut boundary = false;
        for frame in buffer.chunks_exact(channels) {
            let mono = frame.iter().sum::<f32>() * gain;
            boundary |= self.push_sample(mono);
        }
        boundary
    }

    /// Compute the power spectrum of the most recent `analysis_size` samples
    ///
    /// Returns `None` until a full block has been accumulated (or if the
    /// transform failed). Bin 0 and the Nyquist bin carry only a real part;
    /// interior bins combine real and imaginary parts.
    ///
    /// # Real-time Safety
    /// No allocations, O(N log N).
    pub fn compute(&mut self) -> Option<&[f32]> {
        if !self.is_ready() {
            return None;
        }

        // Read from ring buffer in correct order (oldest first)
        let mask = self.analysis_size - 1;
        for (i, input) in self.fft_input.iter_mut().enumerate() {
            let sample = self.sample_buffer[(self.write_pos + i) & mask];
            *input = self.window.apply(sample, i);
        }

        if self
            .fft
            .process_with_scratch(&mut self.fft_input, &mut self.fft_output, &mut self.fft_scratch)
            .is_err()
        {
            self.failure_count += 1;
            return None;
        }

        let nyquist = self.fft_output.len() - 1;
        for (k, (bin, power)) in self
            .fft_output
            .iter()
            .zip(self.magnitudes.iter_mut())
            .enumerate()
        {
            let raw = if k == 0 || k == nyquist {
                bin.re * bin.re
            } else {
                bin.norm_sqr()
            };
            let scaled = raw * self.scale;
            *power = if scaled.is_finite() { scaled } else { 0.0 };
        }

        Some(&self.magnitudes)
    }

    /// Clear accumulated samples; the next spectrum needs a full block again
    pub fn reset(&mut self) {
        self.sample_buffer.fill(0.0);
        self.magnitudes.fill(0.0);
        self.write_pos = 0;
        self.filled = 0;
        self.samples_since_fft = 0;
    }
}

/// Convert a power value to dB, clamped at [`MIN_DB`]
///
/// Zero, negative, NaN and infinite powers all map to the floor.
pub fn power_to_db(power: f32) -> f32 {
    if !power.is_finite() || power <= 0.0 {
        return MIN_DB;
    }
    (10.0 * power.log10()).max(MIN_DB)
}

/// Convert a linear amplitude to dB, clamped at [`MIN_DB`]
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    let amplitude = amplitude.abs();
    if !amplitude.is_finite() || amplitude == 0.0 {
        return MIN_DB;
    }
    (20.0 * amplitude.log10()).max(MIN_DB)
}

/// Center frequency in Hz of spectrum band `bin` out of `bands`
pub fn bin_frequency_hz(bin: usize, sample_rate: u32, bands: usize) -> f32 {
    if bands < 2 {
        return 0.0;
    }
    0.5 * sample_rate as f32 * bin as f32 / (bands - 1) as f32
}

//! Prism DSP - Spectrum and Level Statistics Primitives
//!
//! This crate provides the analysis building blocks of the Prism spectrum
//! plugin:
//! - Hann-windowed real FFT over a ring of the most recent samples
//! - Lock-free double-buffered handoff of the latest spectrum
//! - Moving-window level statistics (mean, kurtosis, dB histogram)
//! - A minimal ordered change signal for configuration observers
//!
//! # Architecture
//!
//! Everything the audio thread touches is allocated up front. Pushing
//! samples, computing the spectrum, publishing it and recording a level
//! never allocate, lock or block.

mod error;
mod fft;
mod handoff;
mod processor;
mod signal;
mod statistics;

pub use error::DspError;
pub use fft::{
    amplitude_to_db, bin_frequency_hz, num_bands, power_to_db, SpectrumAnalyzer, ANALYSIS_SIZE,
    MIN_ANALYSIS_SIZE, MIN_DB,
};
pub use handoff::{SpectrumFrame, SpectrumHandoff};
pub use processor::{AudioProcessor, ProcessContext};
pub use signal::{ConnectionId, Signal};
pub use statistics::{AudioStatistics, StatisticsSnapshot, HISTOGRAM_MAX_DB, HISTOGRAM_MIN_DB};

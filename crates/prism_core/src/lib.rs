//! Prism Core - Spectrum Plugin
//!
//! This crate provides the spectrum analysis plugin of the Prism effects
//! host, including:
//! - Pass-through processing of real-time audio blocks
//! - FFT magnitude spectrum handed to the UI without locks
//! - Rolling level statistics (mean, kurtosis, dB histogram)
//! - Change notifications when the histogram shape changes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     UI / Control Thread                     │
//! │  SpectrumMonitor ◀── compute_magnitudes / get_statistics    │
//! │        │  Command ──▶ apply()   bins_changed ──▶ observers  │
//! └─────────────────────────────────────────────────────────────┘
//!                 ▲ lock-free handoff    ▲ try_lock
//!                 │                      │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   process() ──▶ SpectrumAnalyzer ──▶ publish                │
//! │        └──────▶ block level ──▶ AudioStatistics             │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod message;
mod spectrum;

pub use config::{
    SpectrumConfig, StatisticsConfig, MAX_HISTOGRAM_BINS, MAX_WINDOW_SIZE, MIN_HISTOGRAM_BINS,
    MIN_WINDOW_SIZE,
};
pub use error::{EngineError, EngineResult};
pub use message::{Command, Event};
pub use spectrum::{Spectrum, SpectrumMonitor};

// Re-export DSP types for convenience
pub use prism_dsp::{
    power_to_db, AudioProcessor, ConnectionId, ProcessContext, SpectrumFrame, StatisticsSnapshot,
    MIN_DB,
};

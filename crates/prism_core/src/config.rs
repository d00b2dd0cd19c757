//! Spectrum Engine Configuration
//!
//! Analysis size and hop are fixed when the engine is built. The statistics
//! window and histogram shape can change at runtime through
//! [`SpectrumMonitor`](crate::SpectrumMonitor).

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use prism_dsp::{ANALYSIS_SIZE, MIN_ANALYSIS_SIZE};

/// Smallest statistics window (levels)
pub const MIN_WINDOW_SIZE: usize = 128;
/// Largest statistics window (levels)
pub const MAX_WINDOW_SIZE: usize = 8192;
/// Fewest histogram bins
pub const MIN_HISTOGRAM_BINS: usize = 10;
/// Most histogram bins
pub const MAX_HISTOGRAM_BINS: usize = 128;

/// Moving-window statistics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Number of block levels kept for mean/kurtosis (128 - 8192)
    pub window_size: usize,

    /// Uniform bins over [-120, 0] dB (10 - 128)
    pub histogram_bins: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            histogram_bins: 50,
        }
    }
}

impl StatisticsConfig {
    pub fn check_window_size(value: usize) -> EngineResult<()> {
        if !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&value) {
            return Err(EngineError::WindowSizeOutOfRange {
                value,
                min: MIN_WINDOW_SIZE,
                max: MAX_WINDOW_SIZE,
            });
        }
        Ok(())
    }

    pub fn check_histogram_bins(value: usize) -> EngineResult<()> {
        if !(MIN_HISTOGRAM_BINS..=MAX_HISTOGRAM_BINS).contains(&value) {
            return Err(EngineError::HistogramBinsOutOfRange {
                value,
                min: MIN_HISTOGRAM_BINS,
                max: MAX_HISTOGRAM_BINS,
            });
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        Self::check_window_size(self.window_size)?;
        Self::check_histogram_bins(self.histogram_bins)
    }
}

/// Overall spectrum engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Samples per analysis block (power of two)
    pub analysis_size: usize,

    /// New samples between two spectra, `None` = one spectrum per block
    pub hop_size: Option<usize>,

    /// Level statistics
    pub statistics: StatisticsConfig,

    /// Start with analysis disabled
    pub bypass: bool,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            analysis_size: ANALYSIS_SIZE,
            hop_size: None,
            statistics: StatisticsConfig::default(),
            bypass: false,
        }
    }
}

impl SpectrumConfig {
    /// Config for a fast-updating display: 4x overlapping blocks
    pub fn overlapped() -> Self {
        Self {
            hop_size: Some(ANALYSIS_SIZE / 4),
            ..Self::default()
        }
    }

    /// Hop size actually used by the analyzer
    pub fn effective_hop_size(&self) -> usize {
        self.hop_size.unwrap_or(self.analysis_size)
    }

    /// Spectra per second at the given sample rate
    pub fn update_rate_hz(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.effective_hop_size() as f32
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        if !self.analysis_size.is_power_of_two() || self.analysis_size < MIN_ANALYSIS_SIZE {
            return Err(EngineError::InvalidConfig(format!(
                "analysis size must be a power of two >= {}, got {}",
                MIN_ANALYSIS_SIZE, self.analysis_size
            )));
        }

        let hop = self.effective_hop_size();
        if hop == 0 || hop > self.analysis_size {
            return Err(EngineError::InvalidConfig(format!(
                "hop size must be between 1 and {}, got {}",
                self.analysis_size, hop
            )));
        }

        self.statistics.validate()
    }
}

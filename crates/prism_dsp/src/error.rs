//! DSP Error Types

use thiserror::Error;

/// Errors that can occur while building DSP components
///
/// None of these can happen on the audio thread: sizes are validated once
/// at construction or reconfiguration time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DspError {
    #[error("Analysis size must be a power of two >= 16, got {0}")]
    InvalidAnalysisSize(usize),

    #[error("Hop size {hop} must be between 1 and the analysis size {analysis_size}")]
    InvalidHopSize { hop: usize, analysis_size: usize },

    #[error("Statistics window size must be positive, got {0}")]
    InvalidWindowSize(usize),

    #[error("Histogram bin count must be positive, got {0}")]
    InvalidHistogramBins(usize),
}

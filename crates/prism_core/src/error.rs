//! Engine Error Types

use thiserror::Error;

/// Errors that can occur while configuring the spectrum engine
///
/// Processing itself never fails: invalid samples are clamped and missing
/// data is reported as `None`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Statistics window size {value} out of range ({min}-{max})")]
    WindowSizeOutOfRange { value: usize, min: usize, max: usize },

    #[error("Histogram bin count {value} out of range ({min}-{max})")]
    HistogramBinsOutOfRange { value: usize, min: usize, max: usize },

    #[error("DSP error: {0}")]
    DspError(#[from] prism_dsp::DspError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

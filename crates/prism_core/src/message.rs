//! Message Types for Thread Communication
//!
//! Commands flow from the UI/control thread -> spectrum monitor
//! Events flow from the spectrum monitor -> UI/presentation layer

use serde::{Deserialize, Serialize};

use prism_dsp::{SpectrumFrame, StatisticsSnapshot};

/// Configuration commands applied through [`SpectrumMonitor::apply`](crate::SpectrumMonitor::apply)
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Rebuild the histogram with this many bins (resets statistics)
    SetHistogramBins(usize),

    /// Resize the statistics window (resets statistics)
    SetWindowSize(usize),

    /// Clear statistics without changing sizes
    ResetStatistics,

    /// Enable/disable analysis (audio always passes through)
    SetBypass(bool),
}

/// Events delivered to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// A fresh spectrum was consumed from the handoff
    SpectrumUpdate {
        sample_rate: u32,
        /// Power per band, DC to Nyquist
        magnitudes: Vec<f32>,
    },

    /// Statistics snapshot
    StatisticsUpdate {
        mean: f64,
        kurtosis: f64,
        /// Bin counts normalized to [0, 1]
        histogram: Vec<f64>,
        samples: usize,
    },

    /// Histogram shape changed; cached histogram data is stale
    HistogramBinsChanged { bins: usize },

    /// Error occurred
    Error { message: String },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}

impl From<SpectrumFrame> for Event {
    fn from(frame: SpectrumFrame) -> Self {
        Event::SpectrumUpdate {
            sample_rate: frame.sample_rate,
            magnitudes: frame.magnitudes,
        }
    }
}

impl From<StatisticsSnapshot> for Event {
    fn from(snapshot: StatisticsSnapshot) -> Self {
        Event::StatisticsUpdate {
            mean: snapshot.mean,
            kurtosis: snapshot.kurtosis,
            histogram: snapshot.histogram,
            samples: snapshot.samples,
        }
    }
}

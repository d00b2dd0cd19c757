//! Command-line argument parsing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use prism_core::SpectrumConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "prism-monitor")]
#[command(about = "Feed a test tone through the Prism spectrum plugin and print events as JSON lines", long_about = None)]
pub struct Args {
    /// JSON file with a SpectrumConfig (missing fields use defaults)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How long to run
    #[arg(long, value_name = "SECONDS", default_value_t = 5.0)]
    pub seconds: f32,

    /// Sample rate of the generated signal
    #[arg(long, value_name = "HZ", default_value_t = 48000)]
    pub sample_rate: u32,

    /// Frames per audio callback
    #[arg(long, value_name = "FRAMES", default_value_t = 512)]
    pub block_size: usize,

    /// Display refresh rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Test tone frequency
    #[arg(long, value_name = "HZ", default_value_t = 1000.0)]
    pub tone: f32,

    /// Override the histogram bin count
    #[arg(long, value_name = "BINS")]
    pub histogram_bins: Option<usize>,

    /// Override the statistics window size
    #[arg(long, value_name = "LEVELS")]
    pub window_size: Option<usize>,

    /// Override the hop size
    #[arg(long, value_name = "SAMPLES")]
    pub hop_size: Option<usize>,

    /// Change the histogram bin count after this many seconds
    #[arg(long, value_name = "SECONDS", requires = "rebin_to")]
    pub rebin_after: Option<f32>,

    /// Bin count used by --rebin-after
    #[arg(long, value_name = "BINS", requires = "rebin_after")]
    pub rebin_to: Option<usize>,

    /// Print the full spectrum instead of the strongest band only
    #[arg(long)]
    pub full_spectrum: bool,
}

impl Args {
    /// Load the config file (if any) and apply command-line overrides
    pub fn spectrum_config(&self) -> Result<SpectrumConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => SpectrumConfig::default(),
        };

        if let Some(bins) = self.histogram_bins {
            config.statistics.histogram_bins = bins;
        }
        if let Some(window_size) = self.window_size {
            config.statistics.window_size = window_size;
        }
        if self.hop_size.is_some() {
            config.hop_size = self.hop_size;
        }

        config.validate()?;
        Ok(config)
    }
}

//! Amplitude Statistics
//!
//! Rolling statistical model of recent signal levels:
//! - a circular window of dB levels for mean and kurtosis
//! - a histogram over the fixed range [-120, 0] dB
//!
//! Levels are stored in dB because that is what consumers display, but
//! kurtosis is computed on linear amplitude (`10^(dB/20)`): higher moments of
//! log-compressed data would describe the logarithm, not the signal.
//!
//! The histogram is cumulative since the last reset. Overwriting the oldest
//! window entry does not decrement its bin.

use serde::{Deserialize, Serialize};

use crate::error::DspError;
use crate::fft::MIN_DB;

/// Lower edge of the histogram and clamp floor for levels
pub const HISTOGRAM_MIN_DB: f64 = MIN_DB as f64;

/// Upper edge of the histogram and clamp ceiling for levels
pub const HISTOGRAM_MAX_DB: f64 = 0.0;

/// Point-in-time view of the statistics for a consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Mean level in dB over the window
    pub mean: f64,
    /// Excess kurtosis of the linear amplitudes in the window
    pub kurtosis: f64,
    /// Per-bin counts normalized to [0, 1] by the fullest bin
    pub histogram: Vec<f64>,
    /// Number of valid samples in the window
    pub samples: usize,
}

/// Moving-window level statistics with a dB histogram
#[derive(Debug, Clone)]
pub struct AudioStatistics {
    /// Circular buffer of clamped dB levels
    buffer: Vec<f64>,
    /// Next write position in `buffer`
    current_pos: usize,
    /// Valid samples in `buffer`, saturating at its length
    total_samples: usize,
    /// Counts per uniform bin over [HISTOGRAM_MIN_DB, HISTOGRAM_MAX_DB]
    histogram: Vec<u64>,
}

impl AudioStatistics {
    pub fn new(window_size: usize, histogram_bins: usize) -> Result<Self, DspError> {
        if window_size == 0 {
            return Err(DspError::InvalidWindowSize(window_size));
        }
        if histogram_bins == 0 {
            return Err(DspError::InvalidHistogramBins(histogram_bins));
        }

        Ok(Self {
            buffer: vec![0.0; window_size],
            current_pos: 0,
            total_samples: 0,
            histogram: vec![0; histogram_bins],
        })
    }

    pub fn window_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn histogram_bins(&self) -> usize {
        self.histogram.len()
    }

    /// Number of valid samples in the window
    pub fn len(&self) -> usize {
        self.total_samples
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }

    /// Record one level in dB
    ///
    /// NaN is treated as silence, everything else is clamped to
    /// [-120, 0] dB before storage.
    ///
    /// # Real-time Safety
    /// No allocations, O(1) time.
    #[inline]
    pub fn add_sample(&mut self, level_db: f32) {
        let db = if level_db.is_nan() {
            HISTOGRAM_MIN_DB
        } else {
            (level_db as f64).clamp(HISTOGRAM_MIN_DB, HISTOGRAM_MAX_DB)
        };

        self.buffer[self.current_pos] = db;
        self.current_pos = (self.current_pos + 1) % self.buffer.len();

        if self.total_samples < self.buffer.len() {
            self.total_samples += 1;
        }

        let bin = self.bin_index(db);
        self.histogram[bin] += 1;
    }

    /// Histogram bin for an already clamped level
    ///
    /// The range is closed at the top: 0 dB lands in the last bin.
    fn bin_index(&self, db: f64) -> usize {
        let bins = self.histogram.len();
        let position = (db - HISTOGRAM_MIN_DB) / (HISTOGRAM_MAX_DB - HISTOGRAM_MIN_DB);
        ((position * bins as f64) as usize).min(bins - 1)
    }

    /// Valid part of the window (order does not matter for the moments)
    fn samples(&self) -> &[f64] {
        &self.buffer[..self.total_samples]
    }

    /// Mean level in dB, 0 when no samples were recorded
    pub fn get_mean(&self) -> f64 {
        if self.total_samples == 0 {
            return 0.0;
        }
        self.samples().iter().sum::<f64>() / self.total_samples as f64
    }

    /// Excess kurtosis of the linear amplitudes in the window
    ///
    /// Uses the sample standard deviation (n - 1) and the population fourth
    /// moment. Returns 0 with fewer than 4 samples or zero variance.
    /// O(window) per call.
    pub fn get_kurtosis(&self) -> f64 {
        let n = self.total_samples;
        if n < 4 {
            return 0.0;
        }

        let values = self.samples();
        let linear = |db: f64| 10.0_f64.powf(db / 20.0);

        // Identical levels: the variance is exactly zero, but rounding in the
        // mean would otherwise leave a tiny sd and a bogus -2
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min == max {
            return 0.0;
        }

        let mean = values.iter().map(|&db| linear(db)).sum::<f64>() / n as f64;

        let variance = values
            .iter()
            .map(|&db| {
                let d = linear(db) - mean;
                d * d
            })
            .sum::<f64>()
            / (n - 1) as f64;

        let sd = variance.sqrt();
        if sd == 0.0 || !sd.is_finite() {
            return 0.0;
        }

        let fourth = values
            .iter()
            .map(|&db| {
                let z = (linear(db) - mean) / sd;
                z * z * z * z
            })
            .sum::<f64>()
            / n as f64;

        fourth - 3.0
    }

    /// Bin counts normalized by the maximum count, all zero when empty
    pub fn get_histogram_data(&self) -> Vec<f64> {
        let max = self.histogram.iter().copied().max().unwrap_or(0);
        if max == 0 {
            return vec![0.0; self.histogram.len()];
        }

        let max = max as f64;
        self.histogram.iter().map(|&count| count as f64 / max).collect()
    }

    /// Bin edges in dB (`histogram_bins + 1` values from -120 to 0)
    pub fn histogram_ranges(&self) -> Vec<f64> {
        let bins = self.histogram.len();
        let width = (HISTOGRAM_MAX_DB - HISTOGRAM_MIN_DB) / bins as f64;
        (0..=bins)
            .map(|i| HISTOGRAM_MIN_DB + width * i as f64)
            .collect()
    }

    /// Rebuild the histogram with `bins` uniform bins and reset everything
    ///
    /// Allocates; never call from the audio thread.
    pub fn update_histogram_bins(&mut self, bins: usize) -> Result<(), DspError> {
        if bins == 0 {
            return Err(DspError::InvalidHistogramBins(bins));
        }
        self.histogram = vec![0; bins];
        self.reset();
        Ok(())
    }

    /// Resize the moving window and reset everything
    ///
    /// Allocates; never call from the audio thread.
    pub fn update_window_size(&mut self, window_size: usize) -> Result<(), DspError> {
        if window_size == 0 {
            return Err(DspError::InvalidWindowSize(window_size));
        }
        self.buffer = vec![0.0; window_size];
        self.reset();
        Ok(())
    }

    /// Clear the window and histogram, keeping the configured sizes
    pub fn reset(&mut self) {
        self.histogram.fill(0);
        self.buffer.fill(0.0);
        self.current_pos = 0;
        self.total_samples = 0;
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            mean: self.get_mean(),
            kurtosis: self.get_kurtosis(),
            histogram: self.get_histogram_data(),
            samples: self.total_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sizes() {
        assert_eq!(
            AudioStatistics::new(0, 10).err(),
            Some(DspError::InvalidWindowSize(0))
        );
        assert_eq!(
            AudioStatistics::new(128, 0).err(),
            Some(DspError::InvalidHistogramBins(0))
        );
    }

    #[test]
    fn test_empty_statistics() {
        let stats = AudioStatistics::new(128, 10).unwrap();
        assert!(stats.is_empty());
        assert_eq!(stats.get_mean(), 0.0);
        assert_eq!(stats.get_kurtosis(), 0.0);
        assert_eq!(stats.get_histogram_data(), vec![0.0; 10]);
    }

    #[test]
    fn test_mean_of_constant_level() {
        let mut stats = AudioStatistics::new(256, 50).unwrap();
        for _ in 0..1000 {
            stats.add_sample(-40.0);
        }

        assert_eq!(stats.len(), 256);
        assert!((stats.get_mean() + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_overwrites_oldest() {
        let mut stats = AudioStatistics::new(4, 10).unwrap();
        for _ in 0..4 {
            stats.add_sample(-10.0);
        }
        for _ in 0..4 {
            stats.add_sample(-20.0);
        }

        assert_eq!(stats.len(), 4);
        assert!((stats.get_mean() + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_window_mean() {
        let mut stats = AudioStatistics::new(128, 10).unwrap();
        stats.add_sample(-10.0);
        stats.add_sample(-30.0);

        assert_eq!(stats.len(), 2);
        assert!((stats.get_mean() + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_kurtosis_needs_four_samples() {
        let mut stats = AudioStatistics::new(128, 10).unwrap();
        stats.add_sample(0.0);
        stats.add_sample(-20.0);
        stats.add_sample(-40.0);
        assert_eq!(stats.get_kurtosis(), 0.0);
    }

    #[test]
    fn test_kurtosis_zero_variance() {
        let mut stats = AudioStatistics::new(1000, 10).unwrap();
        for _ in 0..1000 {
            stats.add_sample(-33.3);
        }
        assert_eq!(stats.get_kurtosis(), 0.0);
    }

    #[test]
    fn test_kurtosis_on_linear_amplitude() {
        let mut stats = AudioStatistics::new(128, 10).unwrap();
        // Linear amplitudes 1.0, 0.1, 0.1, 0.1
        stats.add_sample(0.0);
        stats.add_sample(-20.0);
        stats.add_sample(-20.0);
        stats.add_sample(-20.0);

        // mean 0.325, sd 0.45, z = 1.5 / -0.5
        // (1.5^4 + 3 * 0.5^4) / 4 - 3 = -1.6875
        assert!((stats.get_kurtosis() + 1.6875).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_binning_and_normalization() {
        // 12 bins of 10 dB
        let mut stats = AudioStatistics::new(128, 12).unwrap();
        stats.add_sample(-5.0);
        stats.add_sample(0.0);
        stats.add_sample(-115.0);
        stats.add_sample(-120.0);

        let hist = stats.get_histogram_data();
        assert_eq!(hist.len(), 12);
        assert_eq!(hist[0], 1.0);
        assert_eq!(hist[11], 1.0);
        assert!(hist[1..11].iter().all(|&v| v == 0.0));

        stats.add_sample(-1.0);
        let hist = stats.get_histogram_data();
        assert_eq!(hist[11], 1.0);
        assert!((hist[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_is_cumulative() {
        let mut stats = AudioStatistics::new(2, 10).unwrap();
        for _ in 0..5 {
            stats.add_sample(-60.0);
        }
        stats.add_sample(-6.0);

        // Window only holds 2 samples, histogram remembers all 6
        assert_eq!(stats.len(), 2);
        let hist = stats.get_histogram_data();
        assert!((hist[9] - 0.2).abs() < 1e-12);
        assert_eq!(hist[5], 1.0);
    }

    #[test]
    fn test_invalid_levels_are_clamped() {
        let mut stats = AudioStatistics::new(128, 10).unwrap();
        stats.add_sample(f32::NAN);
        stats.add_sample(10.0);
        stats.add_sample(-500.0);
        stats.add_sample(f32::INFINITY);
        stats.add_sample(f32::NEG_INFINITY);

        // Stored: -120, 0, -120, 0, -120
        assert!((stats.get_mean() + 72.0).abs() < 1e-9);
        assert!(stats.get_kurtosis().is_finite());
        assert!(stats.get_histogram_data().iter().all(|v| v.is_finite()));
        assert_eq!(stats.get_histogram_data()[0], 1.0);
    }

    #[test]
    fn test_update_histogram_bins_resets() {
        let mut stats = AudioStatistics::new(128, 10).unwrap();
        for _ in 0..50 {
            stats.add_sample(-12.0);
        }

        stats.update_histogram_bins(64).unwrap();
        assert_eq!(stats.histogram_bins(), 64);
        assert_eq!(stats.get_histogram_data(), vec![0.0; 64]);
        assert!(stats.is_empty());
        assert_eq!(stats.window_size(), 128);

        assert!(stats.update_histogram_bins(0).is_err());
        assert_eq!(stats.histogram_bins(), 64);
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut once = AudioStatistics::new(128, 10).unwrap();
        let mut twice = AudioStatistics::new(128, 10).unwrap();
        for _ in 0..20 {
            once.add_sample(-3.0);
            twice.add_sample(-3.0);
        }

        once.update_histogram_bins(32).unwrap();
        twice.update_histogram_bins(32).unwrap();
        twice.update_histogram_bins(32).unwrap();

        assert_eq!(once.snapshot(), twice.snapshot());
        assert_eq!(once.histogram_bins(), twice.histogram_bins());
    }

    #[test]
    fn test_update_window_size() {
        let mut stats = AudioStatistics::new(128, 10).unwrap();
        stats.add_sample(-1.0);

        stats.update_window_size(512).unwrap();
        assert_eq!(stats.window_size(), 512);
        assert!(stats.is_empty());
        assert!(stats.update_window_size(0).is_err());
    }

    #[test]
    fn test_reset_keeps_sizes() {
        let mut stats = AudioStatistics::new(300, 20).unwrap();
        for i in 0..400 {
            stats.add_sample(-(i as f32 % 120.0));
        }

        stats.reset();
        assert_eq!(stats.window_size(), 300);
        assert_eq!(stats.histogram_bins(), 20);
        assert_eq!(stats.get_mean(), 0.0);
        assert_eq!(stats.get_histogram_data(), vec![0.0; 20]);
    }

    #[test]
    fn test_histogram_ranges() {
        let stats = AudioStatistics::new(128, 12).unwrap();
        let ranges = stats.histogram_ranges();
        assert_eq!(ranges.len(), 13);
        assert_eq!(ranges[0], -120.0);
        assert!((ranges[12] - 0.0).abs() < 1e-9);
        assert!((ranges[1] + 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut stats = AudioStatistics::new(128, 10).unwrap();
        stats.add_sample(-40.0);

        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        let restored: StatisticsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.samples, 1);
        assert_eq!(restored.histogram.len(), 10);
    }
}

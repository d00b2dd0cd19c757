//! Spectrum Plugin
//!
//! Real-time spectrum analyzer and level statistics, split in two halves:
//!
//! ```text
//!   audio callback                         display tick / control
//! ┌──────────────────┐                   ┌──────────────────────────┐
//! │ Spectrum         │   SpectrumHandoff │ SpectrumMonitor          │
//! │  analyzer ───────┼──── publish ────▶ │  compute_magnitudes()    │
//! │  block level ────┼── try_lock ─┐     │  get_statistics()        │
//! └──────────────────┘             ▼     │  update_histogram_bins() │
//!                     Mutex<AudioStatistics> ◀─── lock ────────────┘
//! ```
//!
//! The audio half never waits: the spectrum goes through the lock-free
//! handoff, and the block level is dropped if the monitor happens to hold
//! the statistics lock.
//!
//! The monitor never parks on that lock either. It acquires with a
//! `try_lock` loop (spin, then yield), so the mutex never has a parked
//! waiter and the audio thread's unlock always stays on the fast path
//! with no wake-up syscall.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::config::{SpectrumConfig, StatisticsConfig};
use crate::error::EngineResult;
use crate::message::Command;
use prism_dsp::{
    amplitude_to_db, AudioProcessor, AudioStatistics, ConnectionId, ProcessContext, Signal,
    SpectrumAnalyzer, SpectrumFrame, SpectrumHandoff, StatisticsSnapshot,
};

/// State shared between the audio half and the monitor half
struct SharedState {
    handoff: SpectrumHandoff,
    statistics: Mutex<AudioStatistics>,
    bypassed: AtomicBool,
    /// Block levels dropped because the statistics were locked
    skipped_levels: AtomicU64,
    /// Transforms the analyzer reported as failed
    transform_failures: AtomicU64,
}

/// Busy-wait attempts before the monitor starts yielding its time slice
const LOCK_SPIN_LIMIT: u32 = 64;

/// Audio-thread half of the spectrum plugin
///
/// Owns the analyzer and its sample history. Pass-through: audio is
/// never modified.
pub struct Spectrum {
    analyzer: SpectrumAnalyzer,
    shared: Arc<SharedState>,
}

/// Consumer half of the spectrum plugin
///
/// Lives on the UI/control thread. Reads spectra and statistics and owns
/// the statistics configuration.
pub struct SpectrumMonitor {
    shared: Arc<SharedState>,
    bins_changed: Signal<usize>,
}

impl Spectrum {
    /// Build the plugin and return its audio and monitor halves
    pub fn new(config: &SpectrumConfig) -> EngineResult<(Spectrum, SpectrumMonitor)> {
        config.validate()?;

        let analyzer =
            SpectrumAnalyzer::with_hop_size(config.analysis_size, config.effective_hop_size())?;
        let statistics = AudioStatistics::new(
            config.statistics.window_size,
            config.statistics.histogram_bins,
        )?;

        let shared = Arc::new(SharedState {
            handoff: SpectrumHandoff::new(analyzer.num_bands()),
            statistics: Mutex::new(statistics),
            bypassed: AtomicBool::new(config.bypass),
            skipped_levels: AtomicU64::new(0),
            transform_failures: AtomicU64::new(0),
        });

        info!(
            analysis_size = config.analysis_size,
            hop_size = config.effective_hop_size(),
            window_size = config.statistics.window_size,
            histogram_bins = config.statistics.histogram_bins,
            "Spectrum engine created"
        );

        let spectrum = Spectrum {
            analyzer,
            shared: Arc::clone(&shared),
        };
        let monitor = SpectrumMonitor {
            shared,
            bins_changed: Signal::new(),
        };

        Ok((spectrum, monitor))
    }

    /// Process one planar stereo block
    ///
    /// Copies input to output, then analyses the input.
    ///
    /// # Real-time Safety
    /// No allocations, no blocking locks.
    pub fn process_planar(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
        sample_rate: u32,
    ) {
        let n = left_in.len().min(left_out.len());
        left_out[..n].copy_from_slice(&left_in[..n]);
        let n = right_in.len().min(right_out.len());
        right_out[..n].copy_from_slice(&right_in[..n]);

        self.analyze_planar(left_in, right_in, sample_rate);
    }

    /// Analyse a planar stereo block without producing output
    pub fn analyze_planar(&mut self, left: &[f32], right: &[f32], sample_rate: u32) {
        if self.shared.bypassed.load(Ordering::Relaxed) || left.is_empty() {
            return;
        }

        if self.analyzer.push_planar(left, right) {
            self.publish_spectrum(sample_rate);
        }

        let peak = block_peak(left).max(block_peak(right));
        self.record_level(peak);
    }

    fn publish_spectrum(&mut self, sample_rate: u32) {
        let failures = self.analyzer.failure_count();
        if let Some(spectrum) = self.analyzer.compute() {
            self.shared.handoff.publish(sample_rate, spectrum);
            return;
        }

        let new_failures = self.analyzer.failure_count() - failures;
        if new_failures > 0 {
            self.shared
                .transform_failures
                .fetch_add(new_failures, Ordering::Relaxed);
        }
    }

    fn record_level(&self, peak: f32) {
        // Rust pattern: try_lock keeps the audio thread wait-free; the monitor
        // only holds the lock for a copy or a reconfiguration
        match self.shared.statistics.try_lock() {
            Some(mut statistics) => statistics.add_sample(amplitude_to_db(peak)),
            None => {
                self.shared.skipped_levels.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Forget the sample history (next spectrum needs a full block)
    pub fn reset(&mut self) {
        self.analyzer.reset();
    }

    /// Analysis adds no delay to the audio path
    pub fn latency_seconds(&self) -> f32 {
        0.0
    }

    pub fn analysis_size(&self) -> usize {
        self.analyzer.analysis_size()
    }
}

/// Peak absolute value of a block, non-finite samples skipped
///
/// The analyzer zeroes NaN and infinities, so the level ignores them too.
#[inline]
fn block_peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0_f32, |peak, s| peak.max(s.abs()))
}

impl AudioProcessor for Spectrum {
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext) {
        if !self.is_enabled() || buffer.is_empty() {
            return;
        }

        if self.analyzer.push_interleaved(buffer, context.channels) {
            self.publish_spectrum(context.sample_rate);
        }

        self.record_level(block_peak(buffer));
    }

    fn reset(&mut self) {
        Spectrum::reset(self);
    }

    fn name(&self) -> &'static str {
        "Spectrum Analyzer"
    }

    fn is_enabled(&self) -> bool {
        !self.shared.bypassed.load(Ordering::Relaxed)
    }
}

impl SpectrumMonitor {
    /// Acquire the statistics without ever parking
    ///
    /// A parked waiter would make the audio thread's unlock wake it.
    fn lock_statistics(&self) -> MutexGuard<'_, AudioStatistics> {
        let mut spins = 0;
        loop {
            if let Some(guard) = self.shared.statistics.try_lock() {
                return guard;
            }
            if spins < LOCK_SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
    }

    /// Take the newest spectrum, `None` if nothing new since the last call
    pub fn compute_magnitudes(&self) -> Option<SpectrumFrame> {
        self.shared.handoff.consume()
    }

    /// Same as [`compute_magnitudes`](Self::compute_magnitudes) into a reusable buffer
    pub fn compute_magnitudes_into(&self, out: &mut [f32]) -> Option<u32> {
        self.shared.handoff.consume_into(out)
    }

    /// Number of bands in every spectrum
    pub fn band_count(&self) -> usize {
        self.shared.handoff.band_count()
    }

    /// Mean, kurtosis and normalized histogram
    pub fn get_statistics(&self) -> StatisticsSnapshot {
        // Copy out under the lock so the audio thread's try_lock rarely misses
        let statistics = self.lock_statistics().clone();
        statistics.snapshot()
    }

    pub fn get_mean(&self) -> f64 {
        self.lock_statistics().get_mean()
    }

    pub fn get_kurtosis(&self) -> f64 {
        let statistics = self.lock_statistics().clone();
        statistics.get_kurtosis()
    }

    pub fn get_histogram_data(&self) -> Vec<f64> {
        self.lock_statistics().get_histogram_data()
    }

    /// Histogram bin edges in dB
    pub fn histogram_ranges(&self) -> Vec<f64> {
        self.lock_statistics().histogram_ranges()
    }

    pub fn histogram_bins(&self) -> usize {
        self.lock_statistics().histogram_bins()
    }

    pub fn window_size(&self) -> usize {
        self.lock_statistics().window_size()
    }

    /// Rebuild the histogram with `bins` bins and reset statistics
    ///
    /// Notifies every `bins_changed` observer once, after the statistics
    /// lock has been released.
    pub fn update_histogram_bins(&self, bins: usize) -> EngineResult<()> {
        StatisticsConfig::check_histogram_bins(bins)?;

        self.lock_statistics().update_histogram_bins(bins)?;
        info!(bins, "Histogram bin count changed");

        self.bins_changed.emit(&bins);
        Ok(())
    }

    /// Resize the statistics window and reset statistics
    pub fn update_window_size(&self, window_size: usize) -> EngineResult<()> {
        StatisticsConfig::check_window_size(window_size)?;

        self.lock_statistics().update_window_size(window_size)?;
        info!(window_size, "Statistics window size changed");
        Ok(())
    }

    /// Clear statistics, keeping window size and bin count
    pub fn reset_statistics(&self) {
        self.lock_statistics().reset();
        debug!("Statistics reset");
    }

    /// Clear statistics and drop any unread spectrum
    pub fn reset(&self) {
        self.reset_statistics();
        self.shared.handoff.clear();
    }

    pub fn set_bypass(&self, bypassed: bool) {
        let previous = self.shared.bypassed.swap(bypassed, Ordering::Relaxed);
        if previous != bypassed {
            info!(bypassed, "Spectrum bypass changed");
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.shared.bypassed.load(Ordering::Relaxed)
    }

    /// Block levels dropped because the statistics lock was held
    pub fn skipped_levels(&self) -> u64 {
        self.shared.skipped_levels.load(Ordering::Relaxed)
    }

    /// Spectra dropped because the transform failed
    pub fn transform_failures(&self) -> u64 {
        self.shared.transform_failures.load(Ordering::Relaxed)
    }

    /// Observe histogram bin count changes
    pub fn connect_bins_changed<F>(&mut self, callback: F) -> ConnectionId
    where
        F: Fn(&usize) + Send + Sync + 'static,
    {
        self.bins_changed.connect(callback)
    }

    pub fn disconnect_bins_changed(&mut self, id: ConnectionId) -> bool {
        self.bins_changed.disconnect(id)
    }

    /// Apply a control command
    pub fn apply(&self, command: Command) -> EngineResult<()> {
        debug!(?command, "Applying command");
        match command {
            Command::SetHistogramBins(bins) => self.update_histogram_bins(bins),
            Command::SetWindowSize(size) => self.update_window_size(size),
            Command::ResetStatistics => {
                self.reset_statistics();
                Ok(())
            }
            Command::SetBypass(bypassed) => {
                self.set_bypass(bypassed);
                Ok(())
            }
        }
    }
}

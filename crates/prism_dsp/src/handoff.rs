//! Lock-Free Spectrum Handoff
//!
//! Moves the latest spectrum from the audio thread to any reader thread
//! without locks on either side.
//!
//! # Protocol
//!
//! Two slots and one atomic control word:
//!
//! ```text
//! bit 0      current slot index (the one readers may copy)
//! bit 1      new data published and not yet consumed
//! bit 2      producer busy writing the non-current slot
//! bits 3..   publish generation (wrapping)
//! ```
//!
//! The producer only ever writes the non-current slot and flips the index
//! once the write is complete. A reader copies the current slot, then clears
//! the new-data bit with a compare-exchange that fails if the generation
//! moved meanwhile. A failed exchange means the copy may be torn, so the
//! reader retries. Slots hold `f32` bit patterns in `AtomicU32` cells, which
//! keeps a racing copy well-defined until it is validated.
//!
//! This is a freshness channel, not a queue: two publishes without a
//! consume in between drop the older spectrum.

use std::sync::atomic::{fence, AtomicU32, Ordering};

use crate::fft::bin_frequency_hz;
use crate::fft::power_to_db;

const BIT_IDX: u32 = 1 << 0;
const BIT_NEWDATA: u32 = 1 << 1;
const BIT_BUSY: u32 = 1 << 2;
const FLAGS_MASK: u32 = BIT_IDX | BIT_NEWDATA | BIT_BUSY;
const GENERATION_ONE: u32 = 1 << 3;

/// Attempts a reader makes before reporting "not ready"
const MAX_READ_ATTEMPTS: usize = 8;

/// One published spectrum as seen by a consumer
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    /// Sample rate of the audio the spectrum was computed from
    pub sample_rate: u32,
    /// Power per band, band 0 = DC, last band = Nyquist
    pub magnitudes: Vec<f32>,
}

impl SpectrumFrame {
    pub fn band_count(&self) -> usize {
        self.magnitudes.len()
    }

    /// Center frequency of every band in Hz
    pub fn frequencies(&self) -> Vec<f32> {
        let bands = self.band_count();
        (0..bands)
            .map(|bin| bin_frequency_hz(bin, self.sample_rate, bands))
            .collect()
    }

    /// Magnitudes converted to dB and clamped at the floor
    pub fn to_db(&self) -> Vec<f32> {
        self.magnitudes.iter().map(|&p| power_to_db(p)).collect()
    }
}

struct Slot {
    rate: AtomicU32,
    bins: Box<[AtomicU32]>,
}

impl Slot {
    fn new(band_count: usize) -> Self {
        Self {
            rate: AtomicU32::new(0),
            bins: (0..band_count).map(|_| AtomicU32::new(0)).collect(),
        }
    }
}

/// Double-buffered, single-producer spectrum exchange
pub struct SpectrumHandoff {
    slots: [Slot; 2],
    control: AtomicU32,
}

impl SpectrumHandoff {
    /// Create a handoff for spectra of `band_count` values
    pub fn new(band_count: usize) -> Self {
        Self {
            slots: [Slot::new(band_count), Slot::new(band_count)],
            control: AtomicU32::new(0),
        }
    }

    /// Number of values per published spectrum
    pub fn band_count(&self) -> usize {
        self.slots[0].bins.len()
    }

    /// Whether a published spectrum is waiting to be consumed
    pub fn has_new_data(&self) -> bool {
        self.control.load(Ordering::Acquire) & BIT_NEWDATA != 0
    }

    /// Publish a spectrum (producer thread only)
    ///
    /// Values beyond `band_count` are ignored, missing values are written
    /// as zero.
    ///
    /// # Real-time Safety
    /// No allocations, no locks, O(n) time. Must only be called from a
    /// single thread.
    pub fn publish(&self, sample_rate: u32, spectrum: &[f32]) {
        let word = self.control.fetch_or(BIT_BUSY, Ordering::Acquire);
        // Slot writes must not become visible before the busy bit
        fence(Ordering::Release);

        let target = (word & BIT_IDX) ^ BIT_IDX;
        let slot = &self.slots[target as usize];

        slot.rate.store(sample_rate, Ordering::Relaxed);
        let values = spectrum.iter().copied().chain(std::iter::repeat(0.0));
        for (cell, value) in slot.bins.iter().zip(values) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }

        let generation = (word & !FLAGS_MASK).wrapping_add(GENERATION_ONE);
        self.control
            .store(generation | target | BIT_NEWDATA, Ordering::Release);
    }

    /// Copy the newest unread spectrum into `out`
    ///
    /// Returns the sample rate, or `None` if nothing new was published
    /// (or the producer kept overtaking the read). Copies
    /// `min(out.len(), band_count)` values.
    pub fn consume_into(&self, out: &mut [f32]) -> Option<u32> {
        for _ in 0..MAX_READ_ATTEMPTS {
            let word = self.control.load(Ordering::Acquire);

            if word & BIT_NEWDATA == 0 {
                return None;
            }
            if word & BIT_BUSY != 0 {
                std::hint::spin_loop();
                continue;
            }

            let slot = &self.slots[(word & BIT_IDX) as usize];
            let rate = slot.rate.load(Ordering::Relaxed);
            for (value, cell) in out.iter_mut().zip(slot.bins.iter()) {
                *value = f32::from_bits(cell.load(Ordering::Relaxed));
            }

            // Slot reads must complete before validation
            fence(Ordering::Acquire);

            if self
                .control
                .compare_exchange(
                    word,
                    word & !BIT_NEWDATA,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return Some(rate);
            }

            std::hint::spin_loop();
        }

        None
    }

    /// Take the newest unread spectrum as an owned frame
    ///
    /// Allocates; call from the consumer thread only.
    pub fn consume(&self) -> Option<SpectrumFrame> {
        let mut magnitudes = vec![0.0; self.band_count()];
        self.consume_into(&mut magnitudes)
            .map(|sample_rate| SpectrumFrame {
                sample_rate,
                magnitudes,
            })
    }

    /// Drop any pending spectrum
    pub fn clear(&self) {
        self.control.fetch_and(!BIT_NEWDATA, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_handoff_not_ready() {
        let handoff = SpectrumHandoff::new(8);
        assert!(!handoff.has_new_data());
        assert!(handoff.consume().is_none());
    }

    #[test]
    fn test_round_trip() {
        let handoff = SpectrumHandoff::new(4);
        let spectrum = [0.25, 0.5, 0.75, 1.0];

        handoff.publish(48000, &spectrum);
        assert!(handoff.has_new_data());

        let frame = handoff.consume().unwrap();
        assert_eq!(frame.sample_rate, 48000);
        assert_eq!(frame.magnitudes, spectrum.to_vec());

        // Nothing new since the last consume
        assert!(handoff.consume().is_none());
    }

    #[test]
    fn test_latest_publish_wins() {
        let handoff = SpectrumHandoff::new(3);

        for i in 0..5 {
            let value = i as f32;
            handoff.publish(44100 + i, &[value, value, value]);
        }

        let frame = handoff.consume().unwrap();
        assert_eq!(frame.sample_rate, 44104);
        assert_eq!(frame.magnitudes, vec![4.0, 4.0, 4.0]);
        assert!(handoff.consume().is_none());
    }

    #[test]
    fn test_busy_producer_is_not_read() {
        let handoff = SpectrumHandoff::new(2);
        handoff.publish(48000, &[1.0, 2.0]);

        handoff.control.fetch_or(BIT_BUSY, Ordering::AcqRel);
        assert!(handoff.consume().is_none());

        // Data is still pending once the producer is done
        handoff.control.fetch_and(!BIT_BUSY, Ordering::AcqRel);
        assert_eq!(handoff.consume().unwrap().magnitudes, vec![1.0, 2.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let handoff = SpectrumHandoff::new(4);

        handoff.publish(48000, &[1.0, 2.0]);
        assert_eq!(
            handoff.consume().unwrap().magnitudes,
            vec![1.0, 2.0, 0.0, 0.0]
        );

        handoff.publish(48000, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            handoff.consume().unwrap().magnitudes,
            vec![1.0, 2.0, 3.0, 4.0]
        );
    }

    #[test]
    fn test_consume_into_partial_buffer() {
        let handoff = SpectrumHandoff::new(4);
        handoff.publish(96000, &[1.0, 2.0, 3.0, 4.0]);

        let mut out = [0.0; 2];
        assert_eq!(handoff.consume_into(&mut out), Some(96000));
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn test_clear_drops_pending() {
        let handoff = SpectrumHandoff::new(2);
        handoff.publish(48000, &[1.0, 1.0]);
        handoff.clear();
        assert!(handoff.consume().is_none());
    }

    #[test]
    fn test_frame_helpers() {
        let frame = SpectrumFrame {
            sample_rate: 48000,
            magnitudes: vec![1.0, 0.0, 0.01],
        };
        assert_eq!(frame.band_count(), 3);
        assert_eq!(frame.frequencies(), vec![0.0, 12000.0, 24000.0]);

        let db = frame.to_db();
        assert!(db[0].abs() < 1e-6);
        assert_eq!(db[1], crate::MIN_DB);
        assert!((db[2] + 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_concurrent_frames_are_never_torn() {
        const BANDS: usize = 512;
        const PUBLISHES: u32 = 20_000;

        let handoff = SpectrumHandoff::new(BANDS);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let mut spectrum = vec![0.0; BANDS];
                for i in 1..=PUBLISHES {
                    spectrum.fill(i as f32);
                    handoff.publish(i, &spectrum);
                }
            });

            let mut out = vec![0.0; BANDS];
            let mut last_seen = 0;
            while last_seen < PUBLISHES {
                if let Some(rate) = handoff.consume_into(&mut out) {
                    // Every value must come from the same publish
                    assert!(out.iter().all(|&v| v == rate as f32));
                    // Freshness only moves forward
                    assert!(rate > last_seen);
                    last_seen = rate;
                }
            }
        });
    }
}

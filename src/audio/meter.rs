use atomic_float::AtomicF32;
use nih_plug::prelude::util;
use std::sync::{atomic::Ordering, Arc, Mutex};

/// Meter ballistics for the UI side. Attack is fast so transients register,
/// release is slow so the bars fall naturally instead of flickering.
const METER_ATTACK: f32 = 0.3;
const METER_RELEASE: f32 = 0.02;

/// How many consumer ticks a peak stays latched before falling back.
/// The editor polls roughly at frame rate, so this is on the order of a
/// second of hold.
const PEAK_HOLD_TICKS: u32 = 60;

/// Audio-thread half of the metering channel.
///
/// One scalar peak per processed block, published to the left and right
/// slots as duplicate values (the meter is fed from a single magnitude and
/// the display shows a mirrored pair). Writes are relaxed atomics; the
/// reader only ever needs "most recent value wins".
#[derive(Clone)]
pub struct MeterProducer {
    peak_left: Arc<AtomicF32>,
    peak_right: Arc<AtomicF32>,
}

impl MeterProducer {
    /// Publish the peak magnitude of the most recent block. Real-time safe:
    /// no allocations, no locks.
    pub fn store_peak(&self, peak: f32) {
        let peak_db = if peak > 0.0 {
            util::gain_to_db(peak)
        } else {
            util::MINUS_INFINITY_DB
        };

        self.peak_left.store(peak_db, Ordering::Relaxed);
        self.peak_right.store(peak_db, Ordering::Relaxed);
    }
}

/// Smoothing and peak-hold state carried between consumer ticks.
struct BallisticsState {
    smoothed_left: f32,
    smoothed_right: f32,
    held_peak_db: f32,
    hold_ticks: u32,
}

/// UI-thread half of the metering channel.
///
/// `tick()` pulls the latest raw peaks and runs the display ballistics;
/// the editor calls it once per frame before drawing.
#[derive(Clone)]
pub struct MeterConsumer {
    peak_left: Arc<AtomicF32>,
    peak_right: Arc<AtomicF32>,
    state: Arc<Mutex<BallisticsState>>,
}

impl MeterConsumer {
    /// Advance the display ballistics one step from the latest raw peaks.
    pub fn tick(&self) {
        let left_db = self.peak_left.load(Ordering::Relaxed);
        let right_db = self.peak_right.load(Ordering::Relaxed);

        if let Ok(mut state) = self.state.lock() {
            state.smoothed_left = smooth(state.smoothed_left, left_db);
            state.smoothed_right = smooth(state.smoothed_right, right_db);

            let raw_peak = left_db.max(right_db);
            if raw_peak > state.held_peak_db {
                state.held_peak_db = raw_peak;
                state.hold_ticks = 0;
            } else {
                state.hold_ticks += 1;
                if state.hold_ticks >= PEAK_HOLD_TICKS {
                    state.held_peak_db = raw_peak;
                    state.hold_ticks = 0;
                }
            }
        }
    }

    /// Smoothed levels in dBFS for drawing the (left, right) bars.
    pub fn smoothed_levels(&self) -> (f32, f32) {
        match self.state.lock() {
            Ok(state) => (state.smoothed_left, state.smoothed_right),
            Err(_) => (util::MINUS_INFINITY_DB, util::MINUS_INFINITY_DB),
        }
    }

    /// Latched peak in dBFS for the readout above the bars.
    pub fn held_peak_db(&self) -> f32 {
        match self.state.lock() {
            Ok(state) => state.held_peak_db,
            Err(_) => util::MINUS_INFINITY_DB,
        }
    }
}

/// One-pole attack/release step toward `target_db`.
fn smooth(current_db: f32, target_db: f32) -> f32 {
    let coeff = if target_db > current_db {
        METER_ATTACK
    } else {
        METER_RELEASE
    };
    target_db * coeff + current_db * (1.0 - coeff)
}

/// Build a connected producer/consumer pair. The producer goes to the audio
/// thread, the consumer to the editor.
pub fn meter_channel() -> (MeterProducer, MeterConsumer) {
    let peak_left = Arc::new(AtomicF32::new(util::MINUS_INFINITY_DB));
    let peak_right = Arc::new(AtomicF32::new(util::MINUS_INFINITY_DB));

    let producer = MeterProducer {
        peak_left: peak_left.clone(),
        peak_right: peak_right.clone(),
    };
    let consumer = MeterConsumer {
        peak_left,
        peak_right,
        state: Arc::new(Mutex::new(BallisticsState {
            smoothed_left: util::MINUS_INFINITY_DB,
            smoothed_right: util::MINUS_INFINITY_DB,
            held_peak_db: util::MINUS_INFINITY_DB,
            hold_ticks: 0,
        })),
    };

    (producer, consumer)
}

use nih_plug::prelude::*;

/// Ramp window for gain changes. Fixed once the stage is configured; the
/// ramp always takes this long to reach a new target regardless of block
/// size, so parameter jumps never produce audible stepping.
const GAIN_RAMP_MS: f32 = 20.0;

/// Core gain/mute processing stage.
///
/// This is deliberately independent of the plugin API: it works on plain
/// channel slices and carries only the smoothing ramp between calls. The
/// `Plugin` implementation adapts `nih_plug::Buffer` onto it.
pub struct GainStage {
    sample_rate: f32,

    /// Smoothed gain state. The target is set once per block from the gain
    /// parameter, then advanced one step per output frame.
    ramp: Smoother<f32>,

    /// Last target handed to the ramp. Retargeting restarts the smoother's
    /// window, so an unchanged target must not be set again or a ramp
    /// spanning multiple blocks would never finish.
    target: f32,
}

impl Default for GainStage {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            ramp: Smoother::new(SmoothingStyle::Linear(GAIN_RAMP_MS)),
            target: 0.0,
        }
    }
}

impl GainStage {
    /// Set the sample rate the ramp advances against. Must be called before
    /// the first `process()` and again whenever the rate changes. Calling it
    /// twice with the same rate is a no-op.
    pub fn configure(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Snap the ramp to `gain`, discarding any in-flight transition. Called
    /// when playback (re)starts so a stale ramp never leaks into a new run.
    pub fn reset(&mut self, gain: f32) {
        self.target = gain.max(0.0);
        self.ramp.reset(self.target);
    }

    /// Process one block in place and return its peak magnitude.
    ///
    /// Applies the ramped gain to every frame, then hard-zeroes the buffer
    /// when muted (mute wins over whatever the ramp is doing), then scans
    /// for the peak absolute sample value post-gain, post-mute.
    ///
    /// Real-time safe: no allocation, no locks, no I/O. Any channel count
    /// and block length is accepted, including empty buffers.
    pub fn process(&mut self, channels: &mut [&mut [f32]], gain_target: f32, muted: bool) -> f32 {
        // Out-of-range targets are clamped rather than rejected; an audio
        // callback can never fail mid-block. Only an actual target change
        // may retarget the ramp: the smoother restarts its full window on
        // every `set_target`, and the 20ms window is measured from the
        // change, not from the start of whatever block happens to see it.
        let gain_target = gain_target.max(0.0);
        if gain_target != self.target {
            self.target = gain_target;
            self.ramp.set_target(self.sample_rate, gain_target);
        }

        let num_frames = channels.first().map_or(0, |channel| channel.len());

        // The ramp advances once per frame so every channel of a frame sees
        // the same gain value.
        for frame in 0..num_frames {
            let gain = self.ramp.next();
            for channel in channels.iter_mut() {
                channel[frame] *= gain;
            }
        }

        if muted {
            for channel in channels.iter_mut() {
                channel.fill(0.0);
            }
        }

        let mut peak = 0.0f32;
        for channel in channels.iter() {
            for sample in channel.iter() {
                peak = peak.max(sample.abs());
            }
        }
        peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;

    fn stereo_buffer(value: f32, frames: usize) -> (Vec<f32>, Vec<f32>) {
        (vec![value; frames], vec![value; frames])
    }

    fn process_stereo(
        stage: &mut GainStage,
        left: &mut [f32],
        right: &mut [f32],
        gain: f32,
        muted: bool,
    ) -> f32 {
        let mut channels = [left, right];
        stage.process(&mut channels, gain, muted)
    }

    #[test]
    fn settled_ramp_scales_by_gain_target() {
        let mut stage = GainStage::default();
        stage.configure(SAMPLE_RATE);
        stage.reset(0.25);

        let (mut left, mut right) = stereo_buffer(0.8, 512);
        let peak = process_stereo(&mut stage, &mut left, &mut right, 0.25, false);

        for sample in left.iter().chain(right.iter()) {
            assert!((sample - 0.2).abs() < 1e-6, "got {sample}");
        }
        assert!((peak - 0.2).abs() < 1e-6);
    }

    #[test]
    fn ramp_converges_to_target_after_window() {
        let mut stage = GainStage::default();
        stage.configure(SAMPLE_RATE);
        stage.reset(0.0);

        // One second of audio is far past the 20ms window.
        let (mut left, mut right) = stereo_buffer(1.0, SAMPLE_RATE as usize);
        process_stereo(&mut stage, &mut left, &mut right, 0.5, false);

        let (mut left, mut right) = stereo_buffer(1.0, 256);
        process_stereo(&mut stage, &mut left, &mut right, 0.5, false);
        for sample in left.iter().chain(right.iter()) {
            assert!((sample - 0.5).abs() < 1e-5, "got {sample}");
        }
    }

    #[test]
    fn ramp_rises_monotonically_over_twenty_ms() {
        let mut stage = GainStage::default();
        stage.configure(SAMPLE_RATE);
        stage.reset(0.0);

        // 20ms at 48kHz is 960 frames; give the ramp room to settle after.
        let (mut left, mut right) = stereo_buffer(1.0, 2000);
        process_stereo(&mut stage, &mut left, &mut right, 1.0, false);

        for window in left[..960].windows(2) {
            assert!(window[1] >= window[0], "ramp dipped: {:?}", window);
        }
        for &sample in &left[1000..] {
            assert!((sample - 1.0).abs() < 1e-5, "not settled: {sample}");
        }
        for sample in left.iter() {
            assert!((0.0..=1.0 + 1e-5).contains(sample));
        }
        // Both channels see the same per-frame gain.
        assert_eq!(left, right);
    }

    #[test]
    fn ramp_finishes_on_schedule_across_small_blocks() {
        let mut stage = GainStage::default();
        stage.configure(SAMPLE_RATE);
        stage.reset(0.0);

        // Hosts rarely deliver 20ms in one callback. Drive the same 0→1
        // jump as ten 128-frame blocks; the ramp must keep advancing across
        // block boundaries and still settle at the 960th frame overall.
        let mut output = Vec::new();
        for _ in 0..10 {
            let (mut left, mut right) = stereo_buffer(1.0, 128);
            process_stereo(&mut stage, &mut left, &mut right, 1.0, false);
            output.extend_from_slice(&left);
        }

        for window in output[..960].windows(2) {
            assert!(window[1] >= window[0], "ramp dipped: {:?}", window);
        }
        for (frame, &sample) in output.iter().enumerate().skip(960) {
            assert!(
                (sample - 1.0).abs() < 1e-5,
                "frame {frame} not settled: {sample}"
            );
        }
    }

    #[test]
    fn mute_silences_regardless_of_ramp_state() {
        let mut stage = GainStage::default();
        stage.configure(SAMPLE_RATE);
        stage.reset(0.0);

        // Mid-ramp: target jumps to full gain in the same call as the mute.
        let (mut left, mut right) = stereo_buffer(0.9, 333);
        let peak = process_stereo(&mut stage, &mut left, &mut right, 1.0, true);

        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn peak_tracks_processed_magnitude() {
        let mut stage = GainStage::default();
        stage.configure(SAMPLE_RATE);
        stage.reset(0.5);

        let mut left = vec![0.1, -0.8, 0.3, 0.0];
        let mut right = vec![-0.2, 0.4, 0.6, -0.1];
        let peak = process_stereo(&mut stage, &mut left, &mut right, 0.5, false);

        // Largest input magnitude is 0.8, scaled by the settled 0.5 gain.
        assert!((peak - 0.4).abs() < 1e-6, "got {peak}");
        assert!(peak >= 0.0);
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let mut stage = GainStage::default();
        stage.configure(SAMPLE_RATE);
        stage.reset(1.0);

        let mut channels: [&mut [f32]; 0] = [];
        assert_eq!(stage.process(&mut channels, 1.0, false), 0.0);

        let (mut left, mut right) = stereo_buffer(0.0, 0);
        let peak = process_stereo(&mut stage, &mut left, &mut right, 1.0, false);
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn negative_gain_target_clamps_to_silence() {
        let mut stage = GainStage::default();
        stage.configure(SAMPLE_RATE);
        stage.reset(0.0);

        let (mut left, mut right) = stereo_buffer(1.0, 64);
        let peak = process_stereo(&mut stage, &mut left, &mut right, -3.0, false);

        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn configure_is_idempotent() {
        let mut once = GainStage::default();
        once.configure(SAMPLE_RATE);
        once.reset(0.0);

        let mut twice = GainStage::default();
        twice.configure(SAMPLE_RATE);
        twice.configure(SAMPLE_RATE);
        twice.reset(0.0);

        let (mut left_a, mut right_a) = stereo_buffer(1.0, 1500);
        let (mut left_b, mut right_b) = stereo_buffer(1.0, 1500);
        process_stereo(&mut once, &mut left_a, &mut right_a, 1.0, false);
        process_stereo(&mut twice, &mut left_b, &mut right_b, 1.0, false);

        assert_eq!(left_a, left_b);
    }
}

mod audio;
mod editor;

use audio::{meter_channel, GainStage, MeterConsumer, MeterProducer};
use nih_plug::prelude::*;
use nih_plug_iced::IcedState;
use std::sync::Arc;

/// A gain/mute utility plugin: one smoothed gain multiply, a hard mute, and
/// a stereo peak meter in the editor.
pub struct GainPlugin {
    params: Arc<GainPluginParams>,

    /// The actual DSP. Owns the gain ramp; everything else lives in the
    /// parameter system.
    stage: GainStage,

    /// Per-block peak magnitudes travel to the editor through this pair.
    meter_producer: MeterProducer,
    meter_consumer: MeterConsumer,
}

#[derive(Params)]
pub struct GainPluginParams {
    /// Stored as linear gain over the full fader range; the formatter shows
    /// it in decibels. Smoothing is handled inside the gain stage rather
    /// than by the parameter, so the ramp window stays fixed at stream
    /// setup time.
    #[id = "gain"]
    pub gain: FloatParam,

    /// Hard mute. Applied after the gain ramp, so it always wins.
    #[id = "mute"]
    pub mute: BoolParam,

    /// Editor window size, round-tripped with the host's state blob.
    #[persist = "editor-state"]
    pub editor_state: Arc<IcedState>,
}

impl Default for GainPlugin {
    fn default() -> Self {
        let (meter_producer, meter_consumer) = meter_channel();

        Self {
            params: Arc::new(GainPluginParams::default()),
            stage: GainStage::default(),
            meter_producer,
            meter_consumer,
        }
    }
}

impl Default for GainPluginParams {
    fn default() -> Self {
        Self {
            gain: FloatParam::new("Gain", 0.8, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_unit(" dB")
                .with_value_to_string(formatters::v2s_f32_gain_to_db(1))
                .with_string_to_value(formatters::s2v_f32_gain_to_db()),
            mute: BoolParam::new("Mute", false),
            editor_state: editor::default_state(),
        }
    }
}

impl Plugin for GainPlugin {
    const NAME: &'static str = "Gain Plugin";
    const VENDOR: &'static str = "helpermedia";
    const URL: &'static str = env!("CARGO_PKG_HOMEPAGE");
    const EMAIL: &'static str = "dev@helpermedia.dev";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo by default, mono supported; same layout on both sides, like
    // any well-behaved utility effect.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        nih_plug::nih_log!(
            "initializing at {} Hz, max block {}",
            buffer_config.sample_rate,
            buffer_config.max_buffer_size
        );

        // Establish the 20ms ramp window against the new sample rate.
        self.stage.configure(buffer_config.sample_rate);
        true
    }

    fn reset(&mut self) {
        // May run on the audio thread; must not allocate. Snap the ramp so a
        // transport jump doesn't replay a stale gain transition.
        self.stage.reset(self.params.gain.value());
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let peak = self.stage.process(
            buffer.as_slice(),
            self.params.gain.value(),
            self.params.mute.value(),
        );

        // Metering only matters while someone is looking at it.
        if self.params.editor_state.is_open() {
            self.meter_producer.store_peak(peak);
        }

        ProcessStatus::Normal
    }

    fn editor(&mut self, _async_executor: AsyncExecutor<Self>) -> Option<Box<dyn Editor>> {
        editor::create(
            self.params.clone(),
            self.meter_consumer.clone(),
            self.params.editor_state.clone(),
        )
    }
}

impl ClapPlugin for GainPlugin {
    const CLAP_ID: &'static str = "dev.helpermedia.gain-plugin";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Smoothed gain/mute with a stereo peak meter");
    const CLAP_MANUAL_URL: Option<&'static str> = Some(Self::URL);
    const CLAP_SUPPORT_URL: Option<&'static str> = None;

    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Utility,
    ];
}

impl Vst3Plugin for GainPlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"GainPluginMeter!";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Tools];
}

nih_export_clap!(GainPlugin);
nih_export_vst3!(GainPlugin);

use nih_plug::prelude::{util, Editor, GuiContext};
use nih_plug_iced::widgets as nih_widgets;
use nih_plug_iced::*;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::MeterConsumer;
use crate::GainPluginParams;

pub(crate) fn default_state() -> Arc<IcedState> {
    IcedState::from_size(400, 240)
}

pub(crate) fn create(
    params: Arc<GainPluginParams>,
    meter: MeterConsumer,
    editor_state: Arc<IcedState>,
) -> Option<Box<dyn Editor>> {
    create_iced_editor::<GainPluginEditor>(editor_state, (params, meter))
}

struct GainPluginEditor {
    params: Arc<GainPluginParams>,
    context: Arc<dyn GuiContext>,

    /// Reads the peak levels published by the audio thread and runs the
    /// display ballistics. Ticked once per frame from `view()`.
    meter: MeterConsumer,

    gain_slider_state: nih_widgets::param_slider::State,
    mute_slider_state: nih_widgets::param_slider::State,
    meter_left_state: nih_widgets::peak_meter::State,
    meter_right_state: nih_widgets::peak_meter::State,
}

#[derive(Debug, Clone, Copy)]
enum Message {
    ParamUpdate(nih_widgets::ParamMessage),
}

impl IcedEditor for GainPluginEditor {
    type Executor = executor::Default;
    type Message = Message;
    type InitializationFlags = (Arc<GainPluginParams>, MeterConsumer);

    fn new(
        (params, meter): Self::InitializationFlags,
        context: Arc<dyn GuiContext>,
    ) -> (Self, Command<Self::Message>) {
        let editor = GainPluginEditor {
            params,
            context,
            meter,

            gain_slider_state: Default::default(),
            mute_slider_state: Default::default(),
            meter_left_state: Default::default(),
            meter_right_state: Default::default(),
        };

        (editor, Command::none())
    }

    fn context(&self) -> &dyn GuiContext {
        self.context.as_ref()
    }

    fn update(
        &mut self,
        _window: &mut WindowQueue,
        message: Self::Message,
    ) -> Command<Self::Message> {
        match message {
            Message::ParamUpdate(message) => self.handle_param_message(message),
        }

        Command::none()
    }

    fn view(&mut self) -> Element<'_, Self::Message> {
        // Advance the meter ballistics before drawing this frame.
        self.meter.tick();
        let (level_left, level_right) = self.meter.smoothed_levels();
        let held_peak = self.meter.held_peak_db();

        let peak_readout = if held_peak <= util::MINUS_INFINITY_DB + 1.0 {
            String::from("peak: -inf dB")
        } else {
            format!("peak: {held_peak:.1} dB")
        };

        Column::new()
            .align_items(Alignment::Center)
            .push(
                Text::new("Gain Plugin")
                    .size(32)
                    .height(44.into())
                    .width(Length::Fill)
                    .horizontal_alignment(alignment::Horizontal::Center)
                    .vertical_alignment(alignment::Vertical::Bottom),
            )
            .push(
                Text::new("Gain")
                    .height(20.into())
                    .width(Length::Fill)
                    .horizontal_alignment(alignment::Horizontal::Center)
                    .vertical_alignment(alignment::Vertical::Center),
            )
            .push(
                nih_widgets::ParamSlider::new(&mut self.gain_slider_state, &self.params.gain)
                    .map(Message::ParamUpdate),
            )
            .push(
                Text::new("Mute")
                    .height(20.into())
                    .width(Length::Fill)
                    .horizontal_alignment(alignment::Horizontal::Center)
                    .vertical_alignment(alignment::Vertical::Center),
            )
            .push(
                nih_widgets::ParamSlider::new(&mut self.mute_slider_state, &self.params.mute)
                    .map(Message::ParamUpdate),
            )
            .push(Space::with_height(10.into()))
            .push(
                nih_widgets::PeakMeter::new(&mut self.meter_left_state, level_left)
                    .hold_time(Duration::from_millis(600)),
            )
            .push(
                nih_widgets::PeakMeter::new(&mut self.meter_right_state, level_right)
                    .hold_time(Duration::from_millis(600)),
            )
            .push(
                Text::new(peak_readout)
                    .size(14)
                    .height(20.into())
                    .width(Length::Fill)
                    .horizontal_alignment(alignment::Horizontal::Center)
                    .vertical_alignment(alignment::Vertical::Center),
            )
            .into()
    }

    fn background_color(&self) -> nih_plug_iced::Color {
        nih_plug_iced::Color {
            r: 0.12,
            g: 0.12,
            b: 0.14,
            a: 1.0,
        }
    }
}

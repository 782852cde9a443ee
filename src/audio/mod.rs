pub mod gain_stage;
pub mod meter;

pub use gain_stage::GainStage;
pub use meter::{meter_channel, MeterConsumer, MeterProducer};

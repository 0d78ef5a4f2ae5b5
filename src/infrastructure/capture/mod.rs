//! Audio capture adapters

mod cpal_capture;

pub use cpal_capture::{list_input_devices, CpalCapture, InputDeviceInfo, TARGET_SAMPLE_RATE};

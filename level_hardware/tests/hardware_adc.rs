#![cfg(feature = "hardware")]

use std::time::Duration;

use level_hardware::HardwareAdc;
use level_hardware::error::HwError;
use level_traits::AnalogInput;

// These only run with the `hardware` feature on a board with SPI enabled.
// The read test needs an MCP3208 on SPI0/CE0; the error paths need nothing.

#[test]
fn rejects_bitwidth_other_than_twelve() {
    match HardwareAdc::new(0, 0, 1_000_000, 0, 10) {
        Err(HwError::UnsupportedBitwidth(10)) => {}
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("expected bitwidth rejection"),
    }
}

#[test]
fn rejects_channel_out_of_range() {
    match HardwareAdc::new(0, 0, 1_000_000, 8, 12) {
        Err(HwError::InvalidChannel(8)) => {}
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("expected channel rejection"),
    }
}

#[test]
fn reads_within_converter_range() {
    let Ok(mut adc) = HardwareAdc::new(0, 0, 1_000_000, 0, 12) else {
        // No SPI device on this rig; nothing to assert.
        return;
    };
    let raw = adc.read(Duration::from_millis(5)).expect("spi read");
    assert!((0..=4095).contains(&raw));
}

//! MCP3208 8-channel 12-bit SPI converter.
//!
//! Frame layout (single-ended): `0b0000_011D`, `D D 00_0000`, `0x00` out;
//! the 12-bit result comes back in the low nibble of byte 1 and all of byte 2.

/// Highest channel index on the MCP3208.
pub const MAX_CHANNEL: u8 = 7;
/// Native resolution in bits.
pub const BITWIDTH: u8 = 12;

/// Build the 3-byte single-ended conversion request for `channel`.
#[inline]
pub fn command_bytes(channel: u8) -> [u8; 3] {
    let ch = channel & 0x07;
    [0x06 | (ch >> 2), (ch & 0x03) << 6, 0x00]
}

/// Extract the 12-bit conversion result from the response frame.
#[inline]
pub fn decode(rx: [u8; 3]) -> i32 {
    (i32::from(rx[1] & 0x0F) << 8) | i32::from(rx[2])
}

#[cfg(feature = "hardware")]
pub use driver::Mcp3208;

#[cfg(feature = "hardware")]
mod driver {
    use std::time::{Duration, Instant};

    use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
    use tracing::trace;

    use super::{MAX_CHANNEL, command_bytes, decode};
    use crate::error::{HwError, Result};

    pub struct Mcp3208 {
        spi: Spi,
        channel: u8,
    }

    impl Mcp3208 {
        pub fn new(bus: u8, slave_select: u8, clock_hz: u32, channel: u8) -> Result<Self> {
            if channel > MAX_CHANNEL {
                return Err(HwError::InvalidChannel(channel));
            }
            let bus = match bus {
                0 => Bus::Spi0,
                1 => Bus::Spi1,
                2 => Bus::Spi2,
                other => return Err(HwError::Init(format!("unknown spi bus {other}"))),
            };
            let ss = match slave_select {
                0 => SlaveSelect::Ss0,
                1 => SlaveSelect::Ss1,
                2 => SlaveSelect::Ss2,
                other => return Err(HwError::Init(format!("unknown slave select {other}"))),
            };
            let spi = Spi::new(bus, ss, clock_hz, Mode::Mode0)
                .map_err(|e| HwError::Init(format!("open spi: {e}")))?;
            Ok(Self { spi, channel })
        }

        pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
            let started = Instant::now();
            let tx = command_bytes(self.channel);
            let mut rx = [0u8; 3];
            let n = self
                .spi
                .transfer(&mut rx, &tx)
                .map_err(|e| HwError::Spi(e.to_string()))?;
            if n != rx.len() {
                return Err(HwError::Spi(format!("short transfer: {n} bytes")));
            }
            // The kernel transfer itself is not interruptible; reject results that arrive late.
            if started.elapsed() > timeout {
                return Err(HwError::Timeout);
            }
            let raw = decode(rx);
            trace!(raw, channel = self.channel, "mcp3208 raw read");
            Ok(raw)
        }
    }
}

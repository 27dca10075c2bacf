use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("spi error: {0}")]
    Spi(String),
    #[error("adc read timeout")]
    Timeout,
    #[error("invalid adc channel {0} (expected 0..=7)")]
    InvalidChannel(u8),
    #[error("unsupported bitwidth {0} for this converter")]
    UnsupportedBitwidth(u8),
    #[error("adc init failed: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, HwError>;

//! Maps `Box<dyn Error>` from trait boundaries to typed `LevelError`.
//!
//! `level_traits::AnalogInput` returns `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `level_hardware::HwError` downcasting.

use crate::error::LevelError;

/// Map a trait-boundary error to a typed `LevelError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> LevelError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<level_hardware::error::HwError>() {
            return match hw {
                level_hardware::error::HwError::Timeout => LevelError::Timeout,
                other => LevelError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        LevelError::Timeout
    } else {
        LevelError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_timeout_maps_to_timeout() {
        let e: Box<dyn std::error::Error + Send + Sync> = "spi timeout".into();
        assert_eq!(map_hw_error(e.as_ref()), LevelError::Timeout);
    }

    #[test]
    fn other_strings_map_to_hardware() {
        let e: Box<dyn std::error::Error + Send + Sync> = "bus glitch".into();
        assert_eq!(
            map_hw_error(e.as_ref()),
            LevelError::Hardware("bus glitch".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hw_errors_are_downcast() {
        use level_hardware::error::HwError;
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::Timeout);
        assert_eq!(map_hw_error(e.as_ref()), LevelError::Timeout);
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::Spi("nack".into()));
        assert_eq!(
            map_hw_error(e.as_ref()),
            LevelError::HardwareFault("spi error: nack".into())
        );
    }
}

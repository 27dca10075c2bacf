pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// A single converter channel: one blocking raw read per call.
///
/// Implementations must return within roughly `timeout`; a read that cannot
/// complete in time reports an error rather than stalling the caller.
pub trait AnalogInput {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
}

impl<A: AnalogInput + ?Sized> AnalogInput for Box<A> {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }
}

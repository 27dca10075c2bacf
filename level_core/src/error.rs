use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for converter")]
    Timeout,
    #[error("read failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    #[error("{consecutive} consecutive cycles skipped on read failures")]
    ReadFailures { consecutive: u32 },
    #[error("output closed")]
    OutputClosed,
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for LevelError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            LevelError::OutputClosed
        } else {
            LevelError::Io(e.to_string())
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing analog input")]
    MissingAdc,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

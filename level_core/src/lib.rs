#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Periodic level sampling (hardware-agnostic).
//!
//! Every period the loop takes a burst of raw converter reads, averages them,
//! subtracts the rest baseline and writes one `timestamp_us,raw,level` line.
//! All converter access goes through `level_traits::AnalogInput`; all timing
//! goes through `level_traits::Clock`, so the loop runs unchanged against a
//! deterministic test clock.
//!
//! ## Architecture
//!
//! - **Sampling**: burst averaging and read-failure policy (`sampler`)
//! - **Arithmetic**: truncating mean and clamped level (`level`)
//! - **Scheduling**: absolute deadlines with overrun re-anchoring (`schedule`)
//! - **Loop**: cycle state machine, skip watchdog, stop flag (`core`, `builder`, `runner`)
//! - **Output**: one flushed line per cycle (`record`)
//! - **Analysis**: offline statistics over captured records (`analysis`)

pub mod analysis;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod core;
pub mod error;
pub mod hw_error;
pub mod level;
pub mod mocks;
pub mod record;
pub mod runner;
pub mod sampler;
pub mod schedule;
pub mod stats;
pub mod status;
pub mod util;

pub use crate::builder::{LevelLoopBuilder, Missing, Set, build_loop};
pub use crate::config::{ReadCfg, ReadPolicy, SamplingCfg};
pub use crate::core::LevelLoop;
pub use crate::error::{BuildError, LevelError, Report, Result};
pub use crate::record::CycleRecord;
pub use crate::stats::RunStats;
pub use crate::status::{CycleState, CycleStatus};

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Laser-to-RF lock controller (hardware-agnostic).
//!
//! Every hardware interaction goes through `femto_traits::ChannelService`,
//! reached per connection through a [`link::Link`].
//!
//! ## Architecture
//!
//! - **Model**: the periodic sawtooth relating phase, trigger and measured
//!   time (`sawtooth`), and its calibration sweep and grid fit (`calibration`)
//! - **Measurement**: time-interval counter reader with range, jitter and
//!   stability gates (`counter`, `ring`)
//! - **Actuation**: phase shifter and trigger (`actuator`), setpoint planning
//!   (`setpoint`), bucket-jump correction (`bucket`), drift feedback (`drift`)
//! - **Supervision**: health checks, heartbeat, status text and the
//!   reinitializing control loop (`health`, `watchdog`, `status`, `supervisor`)
//! - **Telemetry**: degrees/time sync, move latency, channel error summaries
//!   (`degrees`, `latency`, `report`)
//!
//! ## Units
//!
//! Times and phases are ns in `f64`; frequencies are GHz. Hardware scale
//! factors (counter seconds, motor units) are applied at the channel edge.

pub mod actuator;
pub mod bucket;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod counter;
pub mod degrees;
pub mod drift;
pub mod error;
pub mod health;
pub mod hw_error;
pub mod latency;
pub mod link;
pub mod report;
pub mod ring;
pub mod sawtooth;
pub mod setpoint;
pub mod status;
pub mod supervisor;
pub mod watchdog;

pub use bucket::{BucketDecision, BucketJumpCorrector, Gate};
pub use calibration::{CalibrationFit, CalibrationOutcome, Calibrator};
pub use config::LockerCfg;
pub use counter::{ReadOutcome, TimeIntervalReader, ValidatedSample};
pub use error::{BuildError, LockError, Report, Result};
pub use link::{Link, SharedClock};
pub use sawtooth::{ModelParameters, Prediction};
pub use supervisor::{CycleReport, LockState, LockSupervisor, SupervisorStats};

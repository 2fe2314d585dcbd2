//! Channel service backends.
//!
//! There is no control-system transport in this workspace; the backends here
//! are an in-memory key/value store and a simulated laser locker built on it,
//! used by the CLI and by integration tests.
pub mod error;
pub mod memory;
pub mod sim;

pub use error::HwError;
pub use memory::MemoryService;
pub use sim::{SimConnection, SimFactory, SimParams, SimulatedLocker};

//! General utility code that didn't fit anywhere else
//!
//! Note that most of this module is not exported.
// (c) 2025 Ross Younger

pub(crate) mod stats;
pub(crate) mod watchdog;

mod tracing;
pub use tracing::TimeFormat;
pub(crate) use tracing::{
    is_initialized as tracing_is_initialised, setup as setup_tracing, trace_level,
    ConsoleTraceType,
};

#[cfg(test)]
pub(crate) mod test_port;

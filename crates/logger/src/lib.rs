//! Process-wide tracing setup shared by the checker binaries.

mod subscriber;

pub use subscriber::{LogFormat, LoggingConfig, init, try_init};

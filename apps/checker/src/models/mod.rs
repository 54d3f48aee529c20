pub mod monitor;

pub use monitor::{Header, Monitor, MonitorKind, MonitorSet, Periodicity};

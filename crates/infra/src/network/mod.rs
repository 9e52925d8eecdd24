//! Connectivity monitoring

pub mod monitor;
pub mod probe;

pub use monitor::ConnectivityMonitor;
pub use probe::TcpReachabilityProbe;

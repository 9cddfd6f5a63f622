// Library interface for the tether client and daemon
// This allows benchmarks and tests to access internal modules

pub mod command;
pub mod config;
pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

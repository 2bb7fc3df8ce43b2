//! Library crate for portscan-rs: port spec resolution, the concurrent
//! connect scanner and its CLI/HTTP front ends.
pub mod output;
pub mod ports;
pub mod scanner;
pub mod server;
pub mod types;

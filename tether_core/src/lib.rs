// tether_core/src/lib.rs

// Pure bridge library: no simulation engine, no concrete middleware.
pub mod bridge;
pub mod buffers;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod messages;
pub mod naming;
pub mod orientation;
pub mod prelude;
pub mod state;
pub mod throttle;
pub mod transport;
pub mod watchdog;

// tether_sim/src/simulation/plugins/mod.rs

pub mod bodies;
pub mod bridge;
pub mod control_plane;
pub mod run_limit;

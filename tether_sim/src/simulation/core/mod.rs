// tether_sim/src/simulation/core/mod.rs

pub mod app_state;
pub mod components;
pub mod events;
pub mod network;
pub mod simulation_setup;
pub mod spawn_requests;

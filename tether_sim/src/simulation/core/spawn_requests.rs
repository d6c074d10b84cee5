// tether_sim/src/simulation/core/spawn_requests.rs
use crate::prelude::EntityConfig;
use bevy::prelude::Component;

#[derive(Component, Clone)]
pub struct SpawnEntityRequest(pub EntityConfig);

// tether_sim/src/simulation/config/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scenario file {0:?} does not exist")]
    ScenarioNotFound(PathBuf),

    #[error("failed to load scenario {path:?}: {source}")]
    Scenario {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error("prefab '{0}' not found in catalog")]
    MissingPrefab(String),

    #[error("prefab '{0}' must resolve to a table to be merged")]
    NotATable(String),

    #[error("prefab '{0}' inherits from itself")]
    PrefabCycle(String),

    #[error("invalid entity definition: {0}")]
    InvalidEntity(String),
}

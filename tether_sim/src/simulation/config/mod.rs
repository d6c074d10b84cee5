// tether_sim/src/simulation/config/mod.rs

//! This module handles loading, resolving, and validating all simulation
//! configuration from disk, including the prefab catalog system.

mod catalog;
mod error;
mod paths;
mod resolver;

pub mod structs;

use std::path::Path;

use bevy::prelude::*;
use figment::{
    providers::{Format, Toml},
    Figment,
};

use crate::prelude::AppState;
pub use catalog::{load_catalog_from_disk, PrefabCatalog};
pub use error::ConfigError;
pub use paths::{SystemPaths, CATALOG_PATH_ENV};
pub use resolver::resolve_entity_value;
pub use structs::{EntityConfig, ScenarioConfig};

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app
            // A resource to hold the final, resolved entity configurations.
            .init_resource::<ResolvedEntities>()
            // The resource for the raw, unresolved catalog data.
            .init_resource::<PrefabCatalog>()
            // Normally inserted by the binary; these are the fallbacks.
            .init_resource::<ScenarioConfig>()
            .init_resource::<SystemPaths>()
            .add_systems(
                OnEnter(AppState::AssetLoading),
                (
                    load_catalog_from_disk,
                    resolve_scenario_entities,
                    transition_to_scene_building,
                )
                    .chain(),
            );
    }
}

#[derive(Resource, Default, Debug)]
pub struct ResolvedEntities(pub Vec<EntityConfig>);

/// Reads a scenario file. Relative paths are the caller's business; see
/// `SystemPaths::resolve`.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::ScenarioNotFound(path.to_path_buf()));
    }
    Figment::new()
        .merge(Toml::file(path))
        .extract()
        .map_err(|e| ConfigError::Scenario {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}

/// Resolves every raw entity against the catalog. Entities that fail are
/// reported and skipped, the rest of the scenario still runs.
pub fn resolve_entities(
    scenario: &ScenarioConfig,
    catalog: &PrefabCatalog,
) -> (Vec<EntityConfig>, Vec<ConfigError>) {
    let mut resolved = Vec::new();
    let mut errors = Vec::new();

    for entity_value in &scenario.entities {
        let entity = resolve_entity_value(entity_value, catalog).and_then(|value| {
            value
                .deserialize::<EntityConfig>()
                .map_err(|e| ConfigError::InvalidEntity(e.to_string()))
        });
        match entity {
            Ok(entity) => resolved.push(entity),
            Err(e) => errors.push(e),
        }
    }

    // Two bridges on the same topics would steal each other's commands.
    let mut seen = std::collections::HashSet::new();
    resolved.retain(|entity| {
        let unique = seen.insert((entity.namespace.clone(), entity.name.clone()));
        if !unique {
            errors.push(ConfigError::InvalidEntity(format!(
                "duplicate entity '{}' in namespace '{}'",
                entity.name, entity.namespace
            )));
        }
        unique
    });

    (resolved, errors)
}

fn resolve_scenario_entities(
    scenario: Res<ScenarioConfig>,
    catalog: Res<PrefabCatalog>,
    mut resolved_entities: ResMut<ResolvedEntities>,
) {
    let (resolved, errors) = resolve_entities(&scenario, &catalog);
    for e in &errors {
        error!("Skipping entity: {}", e);
    }
    for entity in &resolved {
        info!(
            "Resolved entity '{}' (namespace '{}')",
            entity.name, entity.namespace
        );
    }
    resolved_entities.0 = resolved;
}

fn transition_to_scene_building(mut next_state: ResMut<NextState<AppState>>) {
    info!("Configuration loading and resolution complete. Transitioning to SceneBuilding state.");
    next_state.set(AppState::SceneBuilding);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_and_duplicate_entities_are_skipped() {
        let scenario: ScenarioConfig = toml::from_str(
            r#"
            [[entities]]
            name = "box"

            [[entities]]
            name = "box"

            [[entities]]
            name = "ghost"
            colour = "red"

            [[entities]]
            from = "nowhere"

            [[entities]]
            name = "box"
            namespace = "other"
            "#,
        )
        .unwrap();

        let (resolved, errors) = resolve_entities(&scenario, &PrefabCatalog::default());
        let names: Vec<_> = resolved
            .iter()
            .map(|e| (e.namespace.as_str(), e.name.as_str()))
            .collect();
        assert_eq!(names, vec![("", "box"), ("other", "box")]);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn missing_scenario_file_is_reported() {
        let err = load_scenario(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ScenarioNotFound(_)));
    }
}

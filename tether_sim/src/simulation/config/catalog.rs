// tether_sim/src/simulation/config/catalog.rs

//! This module defines the `PrefabCatalog` resource and the system that loads
//! all prefab definitions from disk at startup.

use bevy::prelude::*;
use figment::{
    providers::{Format, Toml},
    value::Value,
    Figment,
};
use std::{collections::HashMap, path::Path};
use walkdir::WalkDir;

use super::paths::SystemPaths;

/// A Bevy resource that holds the entire parsed catalog of prefabs.
/// The key is a dotted path relative to the catalog directory (e.g.
/// "vehicles.rover") and the value is the raw, parsed TOML table.
#[derive(Resource, Default, Debug)]
pub struct PrefabCatalog(pub HashMap<String, Value>);

impl PrefabCatalog {
    /// Adds every `.toml` file below `dir`. Files that fail to parse are
    /// logged and skipped.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        let mut loaded = 0;
        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                !e.file_type().is_dir() && e.path().extension().is_some_and(|ext| ext == "toml")
            })
        {
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            // Create a key like "vehicles.rover" from the path.
            let key = relative
                .with_extension("")
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, ".");

            match Figment::new().merge(Toml::file(path)).extract::<Value>() {
                Ok(data) => {
                    debug!("Loaded catalog item: '{}'", key);
                    if self.0.insert(key.clone(), data).is_some() {
                        info!("Catalog item '{}' overridden by {:?}", key, path);
                    }
                    loaded += 1;
                }
                Err(e) => {
                    error!("Failed to load catalog item from {:?}: {}", path, e);
                }
            }
        }
        loaded
    }
}

/// Walks every catalog directory from `SystemPaths` and populates the
/// `PrefabCatalog` resource.
pub fn load_catalog_from_disk(paths: Res<SystemPaths>, mut catalog: ResMut<PrefabCatalog>) {
    for dir in &paths.catalog_dirs {
        if !dir.exists() {
            warn!("Catalog directory not found at {:?}, skipping.", dir);
            continue;
        }
        let loaded = catalog.load_dir(dir);
        info!("Loaded {} prefab(s) from {:?}", loaded, dir);
    }
}

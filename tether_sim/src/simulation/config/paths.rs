// tether_sim/src/simulation/config/paths.rs

use std::path::{Path, PathBuf};

use bevy::prelude::Resource;

/// Environment variable holding extra catalog directories, in the platform's
/// path-list format.
pub const CATALOG_PATH_ENV: &str = "TETHER_CATALOG_PATH";

/// Where the application finds its files. Built once at startup and handed to
/// the config loader.
#[derive(Resource, Debug, Clone, PartialEq, Default)]
pub struct SystemPaths {
    pub root: PathBuf,
    /// Searched in order; a later directory overrides prefabs with the same key.
    pub catalog_dirs: Vec<PathBuf>,
}

impl SystemPaths {
    /// `<root>/assets/catalog` followed by every directory in
    /// `TETHER_CATALOG_PATH`.
    pub fn from_env(root: Option<PathBuf>) -> Self {
        let extra = std::env::var_os(CATALOG_PATH_ENV);
        Self::with_catalog_path(root.unwrap_or_else(|| PathBuf::from(".")), extra.as_deref())
    }

    pub fn with_catalog_path(root: PathBuf, catalog_path: Option<&std::ffi::OsStr>) -> Self {
        let mut catalog_dirs = vec![root.join("assets").join("catalog")];
        if let Some(list) = catalog_path {
            catalog_dirs.extend(std::env::split_paths(list).filter(|p| !p.as_os_str().is_empty()));
        }
        Self { root, catalog_dirs }
    }

    /// Resolves a relative path against the root. Absolute paths pass through.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

// pitch_sim/src/simulation/config/catalog.rs

//! This module defines the `RobotCatalog`, a set of named roster presets
//! loaded from TOML files on disk.

use bevy::prelude::*;
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use pitch_core::messages::RobotSpecs;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use walkdir::WalkDir;

/// A team of identical robots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterPreset {
    pub count: u32,
    /// Shared specs. The id is assigned per robot.
    pub specs: RobotSpecs,
}

impl Default for RosterPreset {
    fn default() -> Self {
        Self {
            count: 11,
            specs: RobotSpecs::default(),
        }
    }
}

impl RosterPreset {
    /// Specs for robots `0..count`.
    pub fn roster(&self) -> Vec<RobotSpecs> {
        (0..self.count)
            .map(|id| RobotSpecs {
                id,
                ..self.specs.clone()
            })
            .collect()
    }
}

/// Every preset found under a catalog directory. The key is the file path
/// relative to the directory, without extension and with `.` as separator
/// (e.g. "division_a.default").
#[derive(Resource, Default, Debug)]
pub struct RobotCatalog(pub BTreeMap<String, RosterPreset>);

impl RobotCatalog {
    /// Walks `dir` and parses every `.toml` file. Unparsable files are
    /// logged and skipped.
    pub fn load(dir: &Path) -> Self {
        let mut catalog = Self::default();
        if !dir.exists() {
            warn!(
                "Robot catalog directory not found at {:?}, no presets will be loaded.",
                dir
            );
            return catalog;
        }

        info!("Loading robot catalog from: {:?}", dir);

        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| {
                !e.file_type().is_dir() && e.path().extension().is_some_and(|ext| ext == "toml")
            })
        {
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let key = relative
                .with_extension("")
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, ".");

            match Figment::from(Serialized::defaults(RosterPreset::default()))
                .merge(Toml::file(path))
                .extract::<RosterPreset>()
            {
                Ok(preset) => {
                    info!("Loaded roster preset '{}' ({} robots)", key, preset.count);
                    catalog.0.insert(key, preset);
                }
                Err(e) => {
                    error!("Failed to load roster preset from {:?}: {}", path, e);
                }
            }
        }
        catalog
    }

    pub fn get(&self, name: &str) -> Option<&RosterPreset> {
        self.0.get(name)
    }
}

mod world;

pub use world::{UpperPhysics, WorldConfig};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum number of tile layers per world (background, midground, foreground)
pub const MAX_TILE_LAYERS: usize = 3;

// Tables for the Anodyne 1.509 release
const BUILTIN_WORLDS: &str = include_str!("../../assets/worlds.json");
const BUILTIN_SPRITES: &str = include_str!("../../assets/sprites.json");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where an atlas image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpriteSource {
    Path(String),
    Detailed {
        path: String,
        /// Halve the opacity ceiling at load time (drop shadows)
        #[serde(default)]
        fade: bool,
    },
}

impl SpriteSource {
    pub fn path(&self) -> &str {
        match self {
            Self::Path(path) | Self::Detailed { path, .. } => path,
        }
    }

    pub fn fade(&self) -> bool {
        matches!(self, Self::Detailed { fade: true, .. })
    }
}

#[derive(Debug, Deserialize)]
struct WorldTable {
    registry: String,
    worlds: Vec<WorldConfig>,
}

#[derive(Debug, Deserialize)]
struct SpriteTable {
    sprites: BTreeMap<String, SpriteSource>,
}

/// Everything a build needs besides the game files themselves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Path of the entity registry
    pub registry: String,
    pub worlds: Vec<WorldConfig>,
    /// Atlas key -> image. Entity types use their own name as key.
    pub sprites: BTreeMap<String, SpriteSource>,
}

impl BuildConfig {
    /// The embedded configuration
    pub fn builtin() -> Result<Self, ConfigError> {
        let worlds: WorldTable = serde_json::from_str(BUILTIN_WORLDS)?;
        let sprites: SpriteTable = serde_json::from_str(BUILTIN_SPRITES)?;
        let config = Self {
            registry: worlds.registry,
            worlds: worlds.worlds,
            sprites: sprites.sprites,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a combined configuration document
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as a combined configuration document
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn world(&self, name: &str) -> Option<&WorldConfig> {
        self.worlds.iter().find(|w| w.name == name)
    }

    pub fn world_names(&self) -> impl Iterator<Item = &str> {
        self.worlds.iter().map(|w| w.name.as_str())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for world in &self.worlds {
            if !seen.insert(world.name.as_str()) {
                return Err(ConfigError::Invalid(format!("world {} listed twice", world.name)));
            }
            if world.layers.len() > MAX_TILE_LAYERS {
                return Err(ConfigError::Invalid(format!(
                    "world {} has {} layers, at most {} are supported",
                    world.name,
                    world.layers.len(),
                    MAX_TILE_LAYERS
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_parses() {
        let config = BuildConfig::builtin().unwrap();
        assert_eq!(config.worlds.len(), 25);
        assert_eq!(config.registry, "global/Registry_EmbedXML.dat");

        let suburb = config.world("SUBURB").unwrap();
        assert!(suburb.grayscale);
        assert_eq!(config.world("GO").unwrap().upper_physics, UpperPhysics::Keep);
        assert_eq!(config.world("CROWD").unwrap().upper_physics, UpperPhysics::Ignore);
        assert_eq!(config.world("HOTEL").unwrap().upper_physics, UpperPhysics::Reject);

        let circus = config.world("CIRCUS").unwrap();
        assert_eq!(circus.layers.len(), 3);
        assert!(circus.layers[1].is_none());
    }

    #[test]
    fn test_builtin_sprite_table() {
        let config = BuildConfig::builtin().unwrap();
        let shadow = &config.sprites["Spike_Roller_H_S"];
        assert!(shadow.fade());
        assert!(shadow.path().ends_with("hori_shadow_sprite.png"));
        assert!(!config.sprites["Slime"].fade());
        assert!(config.sprites.contains_key("physics_icons"));
        // Types with several candidate sheets have no default atlas
        assert!(!config.sprites.contains_key("Door"));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = BuildConfig::builtin().unwrap();
        config.save(&path).unwrap();

        let loaded = BuildConfig::load(&path).unwrap();
        assert_eq!(loaded.worlds, config.worlds);
        assert_eq!(loaded.sprites, config.sprites);
    }

    #[test]
    fn test_duplicate_world_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let json = r#"{
            "registry": "r.xml",
            "worlds": [
                {"name": "A", "tileset": "a.png", "layers": ["a.dat"], "physics": " #"},
                {"name": "A", "tileset": "a.png", "layers": ["a.dat"], "physics": " #"}
            ],
            "sprites": {}
        }"#;
        fs::write(&path, json).unwrap();
        assert!(matches!(BuildConfig::load(&path), Err(ConfigError::Invalid(_))));
    }
}

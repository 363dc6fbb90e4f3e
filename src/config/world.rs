use crate::physics::{PhysicsError, PhysicsPalette, TileProperty};
use serde::{Deserialize, Serialize};

/// What to do when the midground layer contributes physics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpperPhysics {
    /// The layer carries real collision data
    Keep,
    /// Known harmless: leave the layer out of the physics rendering
    Ignore,
    /// Unexpected: fail the world, the palette is probably wrong
    #[default]
    Reject,
}

/// Inputs for one world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub name: String,
    /// Tileset atlas path
    pub tileset: String,
    /// Background, midground, foreground; `null` where a world lacks one
    pub layers: Vec<Option<String>>,
    /// Physics palette, one category character per tile index
    #[serde(default)]
    pub physics: String,
    /// Tile-property declarations; when present they replace `physics`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tile_properties: Vec<TileProperty>,
    /// Render the visual layers in grayscale
    #[serde(default)]
    pub grayscale: bool,
    #[serde(default)]
    pub upper_physics: UpperPhysics,
}

impl WorldConfig {
    /// The physics palette, built from tile properties when any are given
    pub fn palette(&self) -> Result<PhysicsPalette, PhysicsError> {
        if self.tile_properties.is_empty() {
            PhysicsPalette::parse(&self.physics)
        } else {
            PhysicsPalette::from_tile_properties(&self.tile_properties)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_properties_replace_palette_string() {
        let json = r#"{
            "name": "GO",
            "tileset": "go.png",
            "layers": ["go.dat"],
            "tile_properties": [
                {"start": 1, "collision": "org.flixel.FlxObject.ANY", "run_length": 2},
                {"start": 3, "collision": "org.flixel.FlxObject.NONE", "callback": "ladder", "run_length": 1}
            ]
        }"#;
        let world: WorldConfig = serde_json::from_str(json).unwrap();
        assert!(world.physics.is_empty());
        assert_eq!(world.palette().unwrap().to_string(), " ##l");

        let plain = WorldConfig {
            tile_properties: Vec::new(),
            physics: " w".into(),
            ..world
        };
        assert_eq!(plain.palette().unwrap().to_string(), " w");
    }
}

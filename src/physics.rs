use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Category codes in the order their icons appear in the physics-icon atlas
const ICON_CODES: &str = " #l,<^>vwhs&12345678";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhysicsError {
    #[error("palette index {index}: unknown category code {code:?}")]
    UnknownCode { index: usize, code: char },

    #[error("tile {start}: callback {callback:?} requires NONE collision, got {collision:?}")]
    Contradiction {
        start: u32,
        collision: String,
        callback: String,
    },

    #[error("layer {layer} produced physics, which this world does not allow")]
    UnexpectedLayer { layer: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicsCategory {
    Open,
    Solid,
    Ladder,
    Slow,
    Conveyor(Direction),
    Water,
    Hole,
    Spike,
    /// Solid geometry on the midground layer
    Impervious,
    /// One-sided walls `1`..=`4`
    ThinWall(u8),
    /// Numbered special tiles `5`..=`8`
    Special(u8),
}

impl PhysicsCategory {
    pub fn from_code(code: char) -> Option<Self> {
        let category = match code {
            ' ' => Self::Open,
            '#' => Self::Solid,
            'l' => Self::Ladder,
            ',' => Self::Slow,
            '<' => Self::Conveyor(Direction::Left),
            '^' => Self::Conveyor(Direction::Up),
            '>' => Self::Conveyor(Direction::Right),
            'v' => Self::Conveyor(Direction::Down),
            'w' => Self::Water,
            'h' => Self::Hole,
            's' => Self::Spike,
            '&' => Self::Impervious,
            '1'..='4' => Self::ThinWall(code as u8 - b'0'),
            '5'..='8' => Self::Special(code as u8 - b'0'),
            _ => return None,
        };
        Some(category)
    }

    pub fn code(self) -> char {
        match self {
            Self::Open => ' ',
            Self::Solid => '#',
            Self::Ladder => 'l',
            Self::Slow => ',',
            Self::Conveyor(Direction::Left) => '<',
            Self::Conveyor(Direction::Up) => '^',
            Self::Conveyor(Direction::Right) => '>',
            Self::Conveyor(Direction::Down) => 'v',
            Self::Water => 'w',
            Self::Hole => 'h',
            Self::Spike => 's',
            Self::Impervious => '&',
            Self::ThinWall(n) | Self::Special(n) => (b'0' + n) as char,
        }
    }

    /// Cell of this category's icon in the physics-icon atlas
    pub fn icon_index(self) -> u32 {
        let code = self.code();
        ICON_CODES
            .chars()
            .position(|c| c == code)
            .map_or(0, |i| i as u32)
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

// ============================================================================
// Palette
// ============================================================================

/// One `setTileProperties` declaration from the game scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileProperty {
    pub start: u32,
    /// Collision flags, e.g. `org.flixel.FlxObject.ANY`
    pub collision: String,
    /// Tile callback name; empty or `null` for none
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(default)]
    pub run_length: u32,
}

/// Tile index -> physics category for one world
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhysicsPalette {
    categories: Vec<PhysicsCategory>,
}

impl PhysicsPalette {
    /// Parse a palette string, one category code per tile index
    pub fn parse(codes: &str) -> Result<Self, PhysicsError> {
        let categories = codes
            .chars()
            .enumerate()
            .map(|(index, code)| {
                PhysicsCategory::from_code(code).ok_or(PhysicsError::UnknownCode { index, code })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { categories })
    }

    /// Build a palette from tile-property declarations.
    ///
    /// Index 0 defaults to open and any undeclared index to solid.
    /// Unrecognised flags or callbacks are skipped with a warning.
    pub fn from_tile_properties(properties: &[TileProperty]) -> Result<Self, PhysicsError> {
        let mut declared: Vec<Option<PhysicsCategory>> = vec![Some(PhysicsCategory::Open)];

        for prop in properties {
            let mut category = match prop.collision.rsplit('.').next() {
                Some("NONE") => PhysicsCategory::Open,
                Some("ANY") => PhysicsCategory::Solid,
                _ => {
                    warn!(start = prop.start, collision = %prop.collision, "unknown collision flags");
                    continue;
                },
            };

            match prop.callback.as_deref() {
                None | Some("" | "null") => {},
                Some("ladder") => {
                    if category != PhysicsCategory::Open {
                        return Err(PhysicsError::Contradiction {
                            start: prop.start,
                            collision: prop.collision.clone(),
                            callback: "ladder".into(),
                        });
                    }
                    category = PhysicsCategory::Ladder;
                },
                Some(other) => {
                    warn!(start = prop.start, callback = other, "unknown tile callback");
                    continue;
                },
            }

            let end = (prop.start + prop.run_length.max(1)) as usize;
            if declared.len() < end {
                declared.resize(end, None);
            }
            for slot in &mut declared[prop.start as usize..end] {
                *slot = Some(category);
            }
        }

        let categories = declared
            .into_iter()
            .map(|c| c.unwrap_or(PhysicsCategory::Solid))
            .collect();
        Ok(Self { categories })
    }

    /// Category of `tile`; indices past the end are solid
    pub fn lookup(&self, tile: u32) -> PhysicsCategory {
        self.categories
            .get(tile as usize)
            .copied()
            .unwrap_or(PhysicsCategory::Solid)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl fmt::Display for PhysicsPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.categories.iter().try_for_each(|c| write!(f, "{}", c.code()))
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Layer-aware classification against one world's palette
#[derive(Debug, Clone, Copy)]
pub struct PhysicsClassifier<'a> {
    palette: &'a PhysicsPalette,
}

impl<'a> PhysicsClassifier<'a> {
    /// Layers above this index never affect physics
    pub const MAX_LAYER: usize = 1;

    pub fn new(palette: &'a PhysicsPalette) -> Self {
        Self { palette }
    }

    /// Category of `tile` on tile layer `layer`, or `None` for layers that
    /// never carry physics.
    ///
    /// Tile 0 is looked up on the background but is empty on upper layers,
    /// and midground solids become impervious.
    pub fn classify(&self, layer: usize, tile: u32) -> Option<PhysicsCategory> {
        if layer > Self::MAX_LAYER {
            return None;
        }
        if layer > 0 && tile == 0 {
            return Some(PhysicsCategory::Open);
        }
        let category = self.palette.lookup(tile);
        if layer == 1 && category == PhysicsCategory::Solid {
            return Some(PhysicsCategory::Impervious);
        }
        Some(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(start: u32, collision: &str, callback: Option<&str>, run_length: u32) -> TileProperty {
        TileProperty {
            start,
            collision: collision.into(),
            callback: callback.map(str::to_string),
            run_length,
        }
    }

    #[test]
    fn test_codes_roundtrip_and_icon_order() {
        for (i, code) in ICON_CODES.chars().enumerate() {
            let category = PhysicsCategory::from_code(code).unwrap();
            assert_eq!(category.code(), code);
            assert_eq!(category.icon_index(), i as u32);
        }
        assert_eq!(PhysicsCategory::from_code('3'), Some(PhysicsCategory::ThinWall(3)));
        assert_eq!(PhysicsCategory::from_code('6'), Some(PhysicsCategory::Special(6)));
        assert_eq!(PhysicsCategory::from_code('x'), None);
    }

    #[test]
    fn test_tile_zero_depends_on_layer() {
        let palette = PhysicsPalette::default();
        let classifier = PhysicsClassifier::new(&palette);
        assert_eq!(classifier.classify(0, 0), Some(PhysicsCategory::Solid));
        assert_eq!(classifier.classify(1, 0), Some(PhysicsCategory::Open));
        assert_eq!(classifier.classify(3, 5), None);
    }

    #[test]
    fn test_midground_solid_becomes_impervious() {
        let palette = PhysicsPalette::parse(" #h").unwrap();
        let classifier = PhysicsClassifier::new(&palette);
        assert_eq!(classifier.classify(0, 1), Some(PhysicsCategory::Solid));
        assert_eq!(classifier.classify(1, 1), Some(PhysicsCategory::Impervious));
        assert_eq!(classifier.classify(1, 2), Some(PhysicsCategory::Hole));
        // Past the end defaults to solid, so impervious on the midground
        assert_eq!(classifier.classify(1, 40), Some(PhysicsCategory::Impervious));
        assert_eq!(classifier.classify(0, 0), Some(PhysicsCategory::Open));
    }

    #[test]
    fn test_parse_rejects_unknown_code() {
        assert_eq!(
            PhysicsPalette::parse(" #?"),
            Err(PhysicsError::UnknownCode { index: 2, code: '?' })
        );
    }

    #[test]
    fn test_builtin_palettes_parse() {
        let config = crate::config::BuildConfig::builtin().unwrap();
        for world in &config.worlds {
            let palette = PhysicsPalette::parse(&world.physics)
                .unwrap_or_else(|e| panic!("{}: {}", world.name, e));
            assert_eq!(palette.to_string(), world.physics);
        }
    }

    #[test]
    fn test_palette_from_tile_properties() {
        let palette = PhysicsPalette::from_tile_properties(&[
            prop(1, "org.flixel.FlxObject.ANY", None, 3),
            prop(5, "org.flixel.FlxObject.NONE", Some("ladder"), 2),
            prop(8, "org.flixel.FlxObject.NONE", Some("null"), 1),
            prop(9, "org.flixel.FlxObject.FLOOR", None, 1),
            prop(10, "org.flixel.FlxObject.NONE", Some("water"), 1),
        ])
        .unwrap();

        // 4 undeclared, 9 and 10 skipped
        assert_eq!(palette.to_string(), " ####ll# ");
        assert_eq!(palette.lookup(9), PhysicsCategory::Solid);
    }

    #[test]
    fn test_ladder_on_solid_is_contradiction() {
        let err = PhysicsPalette::from_tile_properties(&[prop(
            3,
            "org.flixel.FlxObject.ANY",
            Some("ladder"),
            1,
        )])
        .unwrap_err();
        assert!(matches!(err, PhysicsError::Contradiction { start: 3, .. }));
    }
}

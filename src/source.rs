//! Map data source: tile layer grids and the entity registry
//!
//! Layer files are comma-separated tile indices, one row per line. The
//! registry is an XML document grouping entity placements by world:
//!
//! ```text
//! <root>
//!   <map name="BEDROOM">
//!     <Slime x="96" y="128" frame="0"/>
//!     <Door x="16" y="32" frame="0" type="4"/>
//!   </map>
//! </root>
//! ```

use crate::display::TILE_SIZE;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// World (map) identifier, e.g. `"BEDROOM"`
pub type WorldId = String;

/// Entity placements grouped by world, in document order
pub type Registry = HashMap<WorldId, Vec<EntityRecord>>;

/// Registry worlds whose entities are filed under the wrong name
const REGISTRY_RENAMES: &[(&str, &str)] = &[("TRAIN", "CELL")];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("layer has no rows")]
    Empty,

    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column {col}: {value:?} is not a tile index")]
    BadCell {
        row: usize,
        col: usize,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: not found (also tried under the source root)")]
    NotFound { path: PathBuf },

    #[error("layer {path}: {source}")]
    Grid {
        path: PathBuf,
        #[source]
        source: GridError,
    },

    #[error("registry: {0}")]
    Registry(String),
}

// ============================================================================
// TileGrid
// ============================================================================

/// Rectangular grid of tile indices, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    rows: Vec<Vec<u32>>,
    cols: usize,
}

impl TileGrid {
    /// Validate that `rows` is non-empty and rectangular
    pub fn new(rows: Vec<Vec<u32>>) -> Result<Self, GridError> {
        let cols = rows.first().map(Vec::len).ok_or(GridError::Empty)?;
        if cols == 0 {
            return Err(GridError::Empty);
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(GridError::Ragged {
                row,
                expected: cols,
                found: r.len(),
            });
        }
        Ok(Self { rows, cols })
    }

    /// Parse comma-separated layer text. Trailing blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, GridError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        let rows = lines
            .iter()
            .enumerate()
            .map(|(row, line)| {
                line.split(',')
                    .enumerate()
                    .map(|(col, cell)| {
                        cell.trim().parse::<u32>().map_err(|_| GridError::BadCell {
                            row,
                            col,
                            value: cell.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(rows)
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Option<u32> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Pixel size of a canvas covering this grid
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.cols as u32 * TILE_SIZE,
            self.rows.len() as u32 * TILE_SIZE,
        )
    }

    /// Iterate `(col, row, tile_index)` in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(row, r)| r.iter().enumerate().map(move |(col, &t)| (col, row, t)))
    }
}

// ============================================================================
// EntityRecord
// ============================================================================

/// One placed entity from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// Entity type, e.g. `"Slime"`
    pub name: String,
    pub x: i32,
    pub y: i32,
    /// Type-specific discriminator (animation index, direction, ...)
    pub frame: i32,
    /// The registry's `type` attribute
    pub subtype: Option<String>,
    pub world: WorldId,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>, x: i32, y: i32, frame: i32, world: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            frame,
            subtype: None,
            world: world.into(),
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>, SourceError> {
    let attr = element
        .try_get_attribute(key)
        .map_err(|e| SourceError::Registry(e.to_string()))?;
    attr.map(|a| {
        a.unescape_value()
            .map(|v| v.into_owned())
            .map_err(|e| SourceError::Registry(e.to_string()))
    })
    .transpose()
}

fn required(element: &BytesStart<'_>, tag: &str, key: &str) -> Result<String, SourceError> {
    attribute(element, key)?
        .ok_or_else(|| SourceError::Registry(format!("<{}> is missing {:?}", tag, key)))
}

/// Registry coordinates are written as decimals; they truncate toward zero
fn coordinate(tag: &str, key: &str, value: &str) -> Result<i32, SourceError> {
    value
        .trim()
        .parse::<f64>()
        .map(|v| v as i32)
        .map_err(|_| SourceError::Registry(format!("<{}> {}={:?} is not a number", tag, key, value)))
}

/// Parse the entity registry, applying the fixed world renames
pub fn parse_registry(xml: &str) -> Result<Registry, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut registry = Registry::new();
    let mut world = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SourceError::Registry(e.to_string()))?;
        let element = match event {
            Event::Start(e) | Event::Empty(e) => e,
            Event::Eof => break,
            _ => continue,
        };

        let name = element.name();
        let tag = std::str::from_utf8(name.as_ref())
            .map_err(|e| SourceError::Registry(e.to_string()))?
            .to_string();

        match tag.as_str() {
            "root" => {},
            "map" => {
                world = required(&element, &tag, "name")?;
                if let Some((_, to)) = REGISTRY_RENAMES.iter().find(|(from, _)| *from == world) {
                    world = (*to).to_string();
                }
            },
            _ => {
                let x = coordinate(&tag, "x", &required(&element, &tag, "x")?)?;
                let y = coordinate(&tag, "y", &required(&element, &tag, "y")?)?;
                let frame_text = required(&element, &tag, "frame")?;
                let frame = frame_text.trim().parse::<i32>().map_err(|_| {
                    SourceError::Registry(format!("<{}> frame={:?} is not an integer", tag, frame_text))
                })?;
                let subtype = attribute(&element, "type")?;

                registry.entry(world.clone()).or_default().push(EntityRecord {
                    name: tag,
                    x,
                    y,
                    frame,
                    subtype,
                    world: world.clone(),
                });
            },
        }
    }

    Ok(registry)
}

// ============================================================================
// MapDataSource
// ============================================================================

/// Supplies raw map inputs. Paths are the relative paths used in the
/// configuration (`data/CSV_Data_BEDROOM_BG.dat`, ...).
pub trait MapDataSource: Send + Sync {
    fn load_layer(&self, path: &str) -> Result<TileGrid, SourceError>;
    fn load_registry(&self, path: &str) -> Result<Registry, SourceError>;
    /// Raw bytes of an image asset, for the raster codec
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, SourceError>;
}

/// Reads inputs from an extracted game directory
#[derive(Debug, Clone)]
pub struct FsDataSource {
    root: PathBuf,
}

impl FsDataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Try the path as given, then under the root, then a `.dat` path as `.bin`
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let direct = PathBuf::from(path);
        let mut candidates = vec![direct.clone(), self.root.join(path)];
        if let Some(stem) = path.strip_suffix(".dat") {
            candidates.push(self.root.join(format!("{}.bin", stem)));
        }

        candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or(SourceError::NotFound { path: direct })
    }

    fn read_to_string(&self, path: &str) -> Result<String, SourceError> {
        let resolved = self.resolve(path)?;
        fs::read_to_string(&resolved).map_err(|source| SourceError::Io {
            path: resolved,
            source,
        })
    }
}

impl MapDataSource for FsDataSource {
    fn load_layer(&self, path: &str) -> Result<TileGrid, SourceError> {
        let text = self.read_to_string(path)?;
        TileGrid::parse(&text).map_err(|source| SourceError::Grid {
            path: PathBuf::from(path),
            source,
        })
    }

    fn load_registry(&self, path: &str) -> Result<Registry, SourceError> {
        parse_registry(&self.read_to_string(path)?)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let resolved = self.resolve(path)?;
        fs::read(&resolved).map_err(|source| SourceError::Io {
            path: resolved,
            source,
        })
    }
}

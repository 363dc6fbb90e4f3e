//! Map layer assembly
//!
//! Turns a world's tile grids into one canvas per populated layer, either
//! with tileset art or with physics icons. Output slots are fixed:
//!
//! | slot | contents                 |
//! |------|--------------------------|
//! | 0    | background tiles         |
//! | 1    | midground tiles          |
//! | 2    | entities (filled later)  |
//! | 3    | foreground tiles         |

use crate::atlas::Atlas;
use crate::config::UpperPhysics;
use crate::display::{BlitError, PixelBuffer, Transform, TILE_SIZE};
use crate::error::BuildError;
use crate::physics::{PhysicsClassifier, PhysicsError, PhysicsPalette};
use crate::source::TileGrid;
use tracing::debug;

pub const SLOT_COUNT: usize = 4;
pub const ENTITY_SLOT: usize = 2;

/// Output slot for tile layer `layer`; the foreground skips the entity slot
pub const fn slot_for_layer(layer: usize) -> usize {
    if layer >= ENTITY_SLOT {
        layer + 1
    } else {
        layer
    }
}

/// Up to four same-sized canvases; `None` where nothing was drawn
#[derive(Debug, Clone)]
pub struct LayerSet {
    slots: [Option<PixelBuffer>; SLOT_COUNT],
    width: u32,
    height: u32,
}

impl LayerSet {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            slots: Default::default(),
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Blank canvas matching this set's dimensions
    pub fn blank_canvas(&self) -> PixelBuffer {
        PixelBuffer::with_size(self.width, self.height)
    }

    pub fn get(&self, slot: usize) -> Option<&PixelBuffer> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn set(&mut self, slot: usize, canvas: PixelBuffer) {
        debug_assert_eq!((canvas.width(), canvas.height()), (self.width, self.height));
        self.slots[slot] = Some(canvas);
    }

    /// `(slot, canvas)` for every populated slot, in slot order
    pub fn populated(&self) -> impl Iterator<Item = (usize, &PixelBuffer)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|c| (i, c)))
    }

    pub fn populated_mut(&mut self) -> impl Iterator<Item = &mut PixelBuffer> {
        self.slots.iter_mut().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Composite slots 1..=3 onto slot 0 in order.
    /// A missing background flattens onto a transparent canvas.
    pub fn flatten(self) -> Result<PixelBuffer, BlitError> {
        let [base, rest @ ..] = self.slots;
        let mut base = base.unwrap_or_else(|| PixelBuffer::with_size(self.width, self.height));
        for layer in rest.iter().flatten() {
            base.blit_full(layer, 0, 0)?;
        }
        Ok(base)
    }
}

/// Pixel size of a world: taken from its first configured layer
pub fn world_size(grids: &[Option<TileGrid>]) -> Result<(u32, u32), BuildError> {
    grids
        .iter()
        .flatten()
        .next()
        .map(TileGrid::pixel_size)
        .ok_or(BuildError::NoLayers)
}

/// Cell range of `grid` that fits on `canvas`
fn clipped_cells<'g>(
    canvas: &PixelBuffer,
    grid: &'g TileGrid,
) -> impl Iterator<Item = (usize, usize, u32)> + 'g {
    let cols = grid.cols().min((canvas.width() / TILE_SIZE) as usize);
    let rows = grid.row_count().min((canvas.height() / TILE_SIZE) as usize);
    grid.cells().filter(move |&(c, r, _)| c < cols && r < rows)
}

/// Builds the tile-derived slots of one world
pub struct MapLayerAssembler<'a> {
    grids: &'a [Option<TileGrid>],
    paths: &'a [Option<String>],
    width: u32,
    height: u32,
}

impl<'a> MapLayerAssembler<'a> {
    /// `grids[i]` is tile layer `i` (background, midground, foreground)
    pub fn new(grids: &'a [Option<TileGrid>]) -> Result<Self, BuildError> {
        let (width, height) = world_size(grids)?;
        Ok(Self {
            grids,
            paths: &[],
            width,
            height,
        })
    }

    /// Layer file paths, parallel to the grids, for error messages
    pub fn with_paths(mut self, paths: &'a [Option<String>]) -> Self {
        self.paths = paths;
        self
    }

    fn layer_name(&self, layer: usize) -> String {
        self.paths
            .get(layer)
            .and_then(Option::as_deref)
            .map_or_else(|| layer.to_string(), str::to_string)
    }

    fn layers(&self) -> impl Iterator<Item = (usize, &'a TileGrid)> {
        self.grids
            .iter()
            .enumerate()
            .filter_map(|(i, g)| g.as_ref().map(|g| (i, g)))
    }

    /// Visual rendering: every non-zero cell gets its tileset cell
    pub fn assemble_visual(&self, tileset: &Atlas) -> Result<LayerSet, BuildError> {
        let mut set = LayerSet::new(self.width, self.height);

        for (layer, grid) in self.layers() {
            let mut canvas = set.blank_canvas();
            let drawn = paint_tiles(&mut canvas, grid, tileset)
                .map_err(|e| e.in_layer(self.layer_name(layer)))?;
            if drawn {
                set.set(slot_for_layer(layer), canvas);
            } else {
                debug!(layer, "layer is empty");
            }
        }
        Ok(set)
    }

    /// Physics rendering: cells are replaced by their category icon
    pub fn assemble_physics(
        &self,
        palette: &PhysicsPalette,
        upper: UpperPhysics,
        icons: &Atlas,
    ) -> Result<LayerSet, BuildError> {
        let classifier = PhysicsClassifier::new(palette);
        let mut set = LayerSet::new(self.width, self.height);

        for (layer, grid) in self.layers() {
            if layer > PhysicsClassifier::MAX_LAYER {
                continue;
            }

            let mut canvas = set.blank_canvas();
            let solid = paint_physics(&mut canvas, grid, &classifier, layer, icons)
                .map_err(|e| e.in_layer(self.layer_name(layer)))?;
            if !solid {
                continue;
            }

            if layer > 0 {
                match upper {
                    UpperPhysics::Keep => {},
                    UpperPhysics::Ignore => {
                        debug!(layer, "ignoring upper-layer physics");
                        continue;
                    },
                    UpperPhysics::Reject => {
                        return Err(PhysicsError::UnexpectedLayer { layer }.into());
                    },
                }
            }
            set.set(slot_for_layer(layer), canvas);
        }
        Ok(set)
    }
}

/// Blit tileset cells for every non-zero index; true if anything was drawn
fn paint_tiles(canvas: &mut PixelBuffer, grid: &TileGrid, tileset: &Atlas) -> Result<bool, BuildError> {
    let mut drawn = false;
    let cells: Vec<_> = clipped_cells(canvas, grid).filter(|&(_, _, t)| t != 0).collect();

    for (col, row, tile) in cells {
        let rect = tileset.cell(tile)?;
        canvas
            .blit(
                tileset.image(),
                rect,
                (col as u32 * TILE_SIZE) as i32,
                (row as u32 * TILE_SIZE) as i32,
                Transform::IDENTITY,
            )
            .map_err(|e| BuildError::blit(format!("tile {tile}"), e))?;
        drawn = true;
    }
    Ok(drawn)
}

/// Blit the category icon of every cell; true if any non-open category was
/// found. Open cells are painted on the background only.
fn paint_physics(
    canvas: &mut PixelBuffer,
    grid: &TileGrid,
    classifier: &PhysicsClassifier<'_>,
    layer: usize,
    icons: &Atlas,
) -> Result<bool, BuildError> {
    let mut solid_found = false;
    let cells: Vec<_> = clipped_cells(canvas, grid).collect();

    for (col, row, tile) in cells {
        let Some(category) = classifier.classify(layer, tile) else {
            return Ok(false);
        };
        if category.is_open() && layer != 0 {
            continue;
        }
        solid_found |= !category.is_open();

        let rect = icons.cell(category.icon_index())?;
        canvas
            .blit(
                icons.image(),
                rect,
                (col as u32 * TILE_SIZE) as i32,
                (row as u32 * TILE_SIZE) as i32,
                Transform::IDENTITY,
            )
            .map_err(|e| BuildError::blit(format!("physics icon {:?}", category.code()), e))?;
    }
    Ok(solid_found)
}

use crate::codec::{CodecError, RasterCodec};
use crate::config::SpriteSource;
use crate::display::{PixelBuffer, Rect};
use crate::source::{MapDataSource, SourceError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;

/// Sprite-table keys of the fixed tool images
pub const PHYSICS_ICONS: &str = "physics_icons";
pub const GRID_OVERLAY: &str = "grid_overlay";
pub const GRID_OVERLAY_SOLID: &str = "grid_overlay_solid";
pub const BLOCKER: &str = "blocker";
pub const VBLOCK: &str = "vblock";

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("no atlas configured for {0:?}")]
    UnknownKey(String),

    #[error("loading {path}: {source}")]
    Source {
        path: String,
        #[source]
        source: SourceError,
    },

    #[error("decoding {path}: {source}")]
    Codec {
        path: String,
        #[source]
        source: CodecError,
    },

    #[error("tile {index} is outside the {cols}x{rows}-cell atlas {atlas}")]
    TileOutOfRange {
        atlas: String,
        index: u32,
        cols: u32,
        rows: u32,
    },
}

/// An image addressed by square cells, numbered row-major
#[derive(Debug, Clone)]
pub struct Atlas {
    name: String,
    image: Arc<PixelBuffer>,
    tile_size: u32,
}

impl Atlas {
    /// `name` is the path or sprite key, for error messages
    pub fn new(name: impl Into<String>, image: Arc<PixelBuffer>, tile_size: u32) -> Self {
        Self {
            name: name.into(),
            image,
            tile_size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    #[inline]
    pub fn cols(&self) -> u32 {
        self.image.width() / self.tile_size
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.image.height() / self.tile_size
    }

    /// Source rectangle of cell `index`: `(index % cols, index / cols)`
    pub fn cell(&self, index: u32) -> Result<Rect, AtlasError> {
        let (cols, rows) = (self.cols(), self.rows());
        if cols == 0 || index / cols >= rows {
            return Err(AtlasError::TileOutOfRange {
                atlas: self.name.clone(),
                index,
                cols,
                rows,
            });
        }
        Ok(Rect::cell(index % cols, index / cols, self.tile_size))
    }
}

/// Decoded image for one cache key; empty until the first successful load
type Slot = Arc<Mutex<Option<Arc<PixelBuffer>>>>;

/// Process-wide image cache keyed by path and fade flag
pub struct AtlasStore {
    source: Arc<dyn MapDataSource>,
    codec: Arc<dyn RasterCodec>,
    sprites: BTreeMap<String, SpriteSource>,
    cache: RwLock<HashMap<(String, bool), Slot>>,
}

impl AtlasStore {
    pub fn new(
        source: Arc<dyn MapDataSource>,
        codec: Arc<dyn RasterCodec>,
        sprites: BTreeMap<String, SpriteSource>,
    ) -> Self {
        Self {
            source,
            codec,
            sprites,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Whether the sprite table has an entry for `key`
    pub fn has_sprite(&self, key: &str) -> bool {
        self.sprites.contains_key(key)
    }

    /// A sprite sheet by sprite-table key
    pub fn sprite(&self, key: &str) -> Result<Arc<PixelBuffer>, AtlasError> {
        let entry = self
            .sprites
            .get(key)
            .ok_or_else(|| AtlasError::UnknownKey(key.to_string()))?;
        self.load(entry.path(), entry.fade())
    }

    /// A tileset image addressed in `tile_size` cells
    pub fn tileset(&self, path: &str, tile_size: u32) -> Result<Atlas, AtlasError> {
        Ok(Atlas::new(path, self.load(path, false)?, tile_size))
    }

    /// Load an image once; later calls share the cached buffer.
    /// Only callers of the same key wait on each other.
    pub fn load(&self, path: &str, fade: bool) -> Result<Arc<PixelBuffer>, AtlasError> {
        let slot = self.slot(path, fade);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = entry.as_ref() {
            return Ok(Arc::clone(hit));
        }

        let bytes = self.source.read_bytes(path).map_err(|source| AtlasError::Source {
            path: path.to_string(),
            source,
        })?;
        let mut image = self.codec.decode(&bytes).map_err(|source| AtlasError::Codec {
            path: path.to_string(),
            source,
        })?;
        if fade {
            image.fade_alpha();
        }
        debug!(path, fade, width = image.width(), height = image.height(), "loaded atlas");

        let image = Arc::new(image);
        *entry = Some(Arc::clone(&image));
        Ok(image)
    }

    fn slot(&self, path: &str, fade: bool) -> Slot {
        let key = (path.to_string(), fade);
        if let Some(slot) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_default())
    }

    /// Load every configured sprite up front; returns how many were loaded
    pub fn preload(&self) -> Result<usize, AtlasError> {
        for key in self.sprites.keys() {
            self.sprite(key)?;
        }
        Ok(self.sprites.len())
    }

    /// Number of images decoded so far
    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }
}

use crate::atlas::AtlasError;
use crate::codec::CodecError;
use crate::display::BlitError;
use crate::physics::PhysicsError;
use crate::source::SourceError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort one world's build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("world {world}: {source}")]
    World {
        world: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("unknown world {0:?}")]
    UnknownWorld(String),

    #[error("no tile layers configured")]
    NoLayers,

    #[error("layer {layer}: {source}")]
    Layer {
        layer: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Atlas(#[from] AtlasError),

    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error("drawing {what}: {source}")]
    Blit {
        what: String,
        #[source]
        source: BlitError,
    },

    #[error("encoding {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("writing {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn blit(what: impl Into<String>, source: BlitError) -> Self {
        Self::Blit {
            what: what.into(),
            source,
        }
    }

    /// Attach the tile layer being painted
    pub fn in_layer(self, layer: impl Into<String>) -> Self {
        Self::Layer {
            layer: layer.into(),
            source: Box::new(self),
        }
    }

    /// Attach the world name, once
    pub fn in_world(self, world: &str) -> Self {
        match self {
            Self::World { .. } => self,
            other => Self::World {
                world: world.to_string(),
                source: Box::new(other),
            },
        }
    }
}

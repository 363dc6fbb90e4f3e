//! mapforge - Anodyne world map compositor
//!
//! Builds full-world images from the game's tile layers, tilesets and entity
//! registry, or a physics rendering that shows collision categories.

pub mod atlas;
pub mod builder;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod entities;
pub mod error;
pub mod layers;
pub mod physics;
pub mod source;

pub use builder::{BuildOptions, BuildOutput, MapBuilder};
pub use error::BuildError;

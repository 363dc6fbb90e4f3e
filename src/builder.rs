use crate::atlas::{Atlas, AtlasStore, GRID_OVERLAY, GRID_OVERLAY_SOLID, PHYSICS_ICONS};
use crate::codec::RasterCodec;
use crate::config::{BuildConfig, WorldConfig};
use crate::diagnostics::Diagnostics;
use crate::display::{PixelBuffer, GRID_SPACING, TILE_SIZE};
use crate::entities::EntityRenderDispatcher;
use crate::error::BuildError;
use crate::layers::{LayerSet, MapLayerAssembler, ENTITY_SLOT};
use crate::source::{EntityRecord, MapDataSource, Registry, TileGrid};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span};

/// Output image extension
pub const OUTPUT_EXTENSION: &str = "png";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Render collision categories instead of tiles
    pub physics: bool,
    /// Keep every populated slot as its own image
    pub separate: bool,
    /// Tile the debug grid overlay over every layer
    pub grid: bool,
}

/// File stem of a world's output: `GO`, or `GO_p` in physics mode
pub fn output_stem(world: &str, physics: bool) -> String {
    if physics {
        format!("{world}_p")
    } else {
        world.to_string()
    }
}

/// Where a world's flattened visual image is written
pub fn flattened_path(dir: &Path, world: &str) -> PathBuf {
    dir.join(format!("{world}.{OUTPUT_EXTENSION}"))
}

/// Finished images of one world, with their file names
#[derive(Debug)]
pub struct BuildOutput {
    pub world: String,
    pub images: Vec<(String, PixelBuffer)>,
}

impl BuildOutput {
    fn from_layers(world: &str, layers: LayerSet, options: BuildOptions) -> Result<Self, BuildError> {
        let stem = output_stem(world, options.physics);
        let images = if options.separate {
            layers
                .populated()
                .map(|(slot, canvas)| (format!("{stem}_{slot}.{OUTPUT_EXTENSION}"), canvas.clone()))
                .collect()
        } else {
            let flat = layers
                .flatten()
                .map_err(|e| BuildError::blit("flattened layers", e))?;
            vec![(format!("{stem}.{OUTPUT_EXTENSION}"), flat)]
        };
        Ok(Self {
            world: world.to_string(),
            images,
        })
    }

    /// Encode and write every image into `dir`
    pub fn write(&self, dir: &Path, codec: &dyn RasterCodec) -> Result<Vec<PathBuf>, BuildError> {
        self.images
            .iter()
            .map(|(name, image)| {
                let bytes = codec.encode(image).map_err(|source| BuildError::Encode {
                    name: name.clone(),
                    source,
                })?;
                let path = dir.join(name);
                fs::write(&path, bytes).map_err(|source| BuildError::Io {
                    path: path.clone(),
                    source,
                })?;
                debug!(path = %path.display(), "wrote image");
                Ok(path)
            })
            .collect()
    }
}

/// Builds worlds against one configuration, atlas cache and registry.
///
/// Shared by reference across worker threads; every world gets fresh
/// canvases.
pub struct MapBuilder {
    config: BuildConfig,
    source: Arc<dyn MapDataSource>,
    atlases: AtlasStore,
    registry: Registry,
    diagnostics: Diagnostics,
}

impl MapBuilder {
    /// Loads the registry named by the configuration
    pub fn new(
        config: BuildConfig,
        source: Arc<dyn MapDataSource>,
        codec: Arc<dyn RasterCodec>,
    ) -> Result<Self, BuildError> {
        let registry = source.load_registry(&config.registry)?;
        info!(
            worlds = registry.len(),
            entities = registry.values().map(Vec::len).sum::<usize>(),
            "loaded entity registry"
        );
        Ok(Self::with_registry(config, source, codec, registry))
    }

    pub fn with_registry(
        config: BuildConfig,
        source: Arc<dyn MapDataSource>,
        codec: Arc<dyn RasterCodec>,
        registry: Registry,
    ) -> Self {
        let atlases = AtlasStore::new(Arc::clone(&source), codec, config.sprites.clone());
        Self {
            config,
            source,
            atlases,
            registry,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn atlases(&self) -> &AtlasStore {
        &self.atlases
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Build one world; errors carry the world name
    pub fn build_world(&self, name: &str, options: BuildOptions) -> Result<BuildOutput, BuildError> {
        let _span = info_span!("world", name).entered();
        let start = Instant::now();

        let output = self
            .config
            .world(name)
            .ok_or_else(|| BuildError::UnknownWorld(name.to_string()))
            .and_then(|world| self.build_layers(world, options))
            .and_then(|layers| BuildOutput::from_layers(name, layers, options))
            .map_err(|e| e.in_world(name))?;

        info!(
            images = output.images.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built world"
        );
        Ok(output)
    }

    /// All slots of one world after entities and post effects
    pub fn build_layers(&self, world: &WorldConfig, options: BuildOptions) -> Result<LayerSet, BuildError> {
        let grids = world
            .layers
            .iter()
            .map(|path| path.as_deref().map(|p| self.source.load_layer(p)).transpose())
            .collect::<Result<Vec<Option<TileGrid>>, _>>()?;
        let assembler = MapLayerAssembler::new(&grids)?.with_paths(&world.layers);

        let mut layers = if options.physics {
            let palette = world.palette()?;
            let icon_image = self.atlases.sprite(PHYSICS_ICONS)?;
            let icons = Atlas::new(PHYSICS_ICONS, icon_image, TILE_SIZE);
            assembler.assemble_physics(&palette, world.upper_physics, &icons)?
        } else {
            let tileset = self.atlases.tileset(&world.tileset, TILE_SIZE)?;
            assembler.assemble_visual(&tileset)?
        };

        let entities = self.entities(&world.name);
        let dispatcher = EntityRenderDispatcher::new(&self.atlases, &self.diagnostics);
        let mut canvas = layers.blank_canvas();
        let drawn = if options.physics {
            dispatcher.render_physics(entities, &mut canvas)?
        } else {
            dispatcher.render(&world.name, entities, &mut canvas)?
        };
        if drawn {
            layers.set(ENTITY_SLOT, canvas);
        }

        if world.grayscale && !options.physics {
            layers.populated_mut().for_each(PixelBuffer::grayscale);
        }

        if options.grid {
            let key = if options.physics {
                GRID_OVERLAY_SOLID
            } else {
                GRID_OVERLAY
            };
            let overlay = self.atlases.sprite(key)?;
            for layer in layers.populated_mut() {
                overlay_grid(layer, &overlay)?;
            }
        }

        Ok(layers)
    }

    fn entities(&self, world: &str) -> &[EntityRecord] {
        self.registry.get(world).map_or(&[][..], Vec::as_slice)
    }
}

/// Blit `overlay` at every grid intersection that leaves a full cell
fn overlay_grid(layer: &mut PixelBuffer, overlay: &PixelBuffer) -> Result<(), BuildError> {
    for j in 0..layer.height() / GRID_SPACING {
        for i in 0..layer.width() / GRID_SPACING {
            layer
                .blit_full(overlay, (i * GRID_SPACING) as i32, (j * GRID_SPACING) as i32)
                .map_err(|e| BuildError::blit("grid overlay", e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::tests::{MemorySource, TextCodec};
    use crate::config::{SpriteSource, UpperPhysics};
    use crate::display::{pack, unpack};
    use crate::physics::{PhysicsError, TileProperty};
    use std::collections::BTreeMap;

    const RED: u32 = 0xff00_00ff;
    const SLIME: u32 = 0x00ff_00ff;

    fn solid(width: u32, height: u32, p: u32) -> PixelBuffer {
        let mut image = PixelBuffer::with_size(width, height);
        image.fill(p);
        image
    }

    fn world(name: &str, layers: &[Option<&str>]) -> WorldConfig {
        WorldConfig {
            name: name.into(),
            tileset: "tiles.png".into(),
            layers: layers.iter().map(|l| l.map(str::to_string)).collect(),
            physics: " #".into(),
            tile_properties: Vec::new(),
            grayscale: false,
            upper_physics: UpperPhysics::Reject,
        }
    }

    /// 320x320 background of tile 1, a 16x16 red tileset cell
    fn fixture(worlds: Vec<WorldConfig>, registry: Registry) -> MapBuilder {
        let mut source = MemorySource::default();
        let mut tiles = PixelBuffer::with_size(32, 16);
        for y in 0..16 {
            for x in 16..32 {
                tiles.set_pixel(x, y, RED);
            }
        }
        source.add_image("tiles.png", &tiles);
        source.add_image("slime.png", &solid(16, 16, SLIME));
        source.add_image("icons.png", &solid(20 * 16, 16, 0x0000_ffff));
        source.add_image("grid.png", &solid(1, 1, 0xffff_ffff));

        let row = vec![1; 20];
        source
            .layers
            .insert("bg.dat".into(), TileGrid::new(vec![row; 20]).unwrap());
        source
            .layers
            .insert("mid.dat".into(), TileGrid::new(vec![vec![0, 1]]).unwrap());
        source
            .layers
            .insert("oob.dat".into(), TileGrid::new(vec![vec![0, 9]]).unwrap());

        let sprites: BTreeMap<String, SpriteSource> = [
            ("Slime", "slime.png"),
            (PHYSICS_ICONS, "icons.png"),
            (GRID_OVERLAY, "grid.png"),
            (GRID_OVERLAY_SOLID, "grid.png"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), SpriteSource::Path(v.to_string())))
        .collect();

        let config = BuildConfig {
            registry: "registry.xml".into(),
            worlds,
            sprites,
        };
        MapBuilder::with_registry(config, Arc::new(source), Arc::new(TextCodec), registry)
    }

    fn slime_registry(world: &str) -> Registry {
        let mut registry = Registry::new();
        registry.insert(
            world.to_string(),
            vec![EntityRecord::new("Slime", 32, 48, 0, world)],
        );
        registry
    }

    #[test]
    fn test_flattened_world_has_entities_on_top() {
        let builder = fixture(vec![world("BEDROOM", &[Some("bg.dat")])], slime_registry("BEDROOM"));
        let output = builder
            .build_world("BEDROOM", BuildOptions::default())
            .unwrap();

        assert_eq!(output.images.len(), 1);
        let (name, image) = &output.images[0];
        assert_eq!(name, "BEDROOM.png");
        assert_eq!((image.width(), image.height()), (320, 320));
        assert_eq!(image.get_pixel(0, 0), Some(RED));
        assert_eq!(image.get_pixel(32, 48), Some(SLIME));
        assert_eq!(image.get_pixel(48, 48), Some(RED));
    }

    #[test]
    fn test_separate_layers_use_slot_names() {
        let builder = fixture(
            vec![world("BEDROOM", &[Some("bg.dat"), None, Some("mid.dat")])],
            slime_registry("BEDROOM"),
        );
        let options = BuildOptions {
            separate: true,
            ..BuildOptions::default()
        };
        let output = builder.build_world("BEDROOM", options).unwrap();
        let names: Vec<&str> = output.images.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["BEDROOM_0.png", "BEDROOM_2.png", "BEDROOM_3.png"]);
    }

    #[test]
    fn test_grayscale_worlds() {
        let mut gray = world("SUBURB", &[Some("bg.dat")]);
        gray.grayscale = true;
        let builder = fixture(vec![gray], Registry::new());

        let output = builder.build_world("SUBURB", BuildOptions::default()).unwrap();
        let (r, g, b, a) = unpack(output.images[0].1.get_pixel(0, 0).unwrap());
        assert_eq!((r, g, b, a), (85, 85, 85, 255));

        // Physics renderings keep their colours
        let physics = BuildOptions {
            physics: true,
            ..BuildOptions::default()
        };
        let output = builder.build_world("SUBURB", physics).unwrap();
        assert_eq!(output.images[0].0, "SUBURB_p.png");
        assert_eq!(output.images[0].1.get_pixel(0, 0), Some(pack(0, 0, 255, 255)));
    }

    #[test]
    fn test_grid_overlay_every_160_pixels() {
        let builder = fixture(vec![world("BEDROOM", &[Some("bg.dat")])], Registry::new());
        let options = BuildOptions {
            grid: true,
            ..BuildOptions::default()
        };
        let image = &builder.build_world("BEDROOM", options).unwrap().images[0].1;
        for (x, y) in [(0, 0), (160, 0), (0, 160), (160, 160)] {
            assert_eq!(image.get_pixel(x, y), Some(0xffff_ffff), "({x}, {y})");
        }
        assert_eq!(image.get_pixel(1, 0), Some(RED));
    }

    #[test]
    fn test_failures_name_the_world() {
        let mut strict = world("HOTEL", &[Some("bg.dat"), Some("mid.dat")]);
        strict.upper_physics = UpperPhysics::Reject;
        let builder = fixture(vec![strict, world("GONE", &[Some("missing.dat")])], Registry::new());

        let physics = BuildOptions {
            physics: true,
            ..BuildOptions::default()
        };
        let err = builder.build_world("HOTEL", physics).unwrap_err();
        let BuildError::World { world, source } = &err else {
            panic!("no world context: {err}");
        };
        assert_eq!(world, "HOTEL");
        assert!(matches!(
            **source,
            BuildError::Physics(PhysicsError::UnexpectedLayer { layer: 1 })
        ));

        let err = builder.build_world("GONE", BuildOptions::default()).unwrap_err();
        assert!(err.to_string().contains("missing.dat"));

        assert!(builder.build_world("NOWHERE", BuildOptions::default()).is_err());
    }

    #[test]
    fn test_tile_out_of_range_names_its_files() {
        let builder = fixture(vec![world("X", &[Some("oob.dat")])], Registry::new());
        let err = builder.build_world("X", BuildOptions::default()).unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("world X: layer oob.dat: "), "{message}");
        assert!(message.contains("tiles.png"), "{message}");
        assert!(message.contains("tile 9"), "{message}");
    }

    #[test]
    fn test_physics_and_visual_share_dimensions() {
        // All-open physics leaves no populated slot to flatten
        let mut open = world("BEDROOM", &[Some("bg.dat")]);
        open.physics = "  ".into();
        let builder = fixture(vec![open], slime_registry("BEDROOM"));

        let visual = builder.build_world("BEDROOM", BuildOptions::default()).unwrap();
        let physics = BuildOptions {
            physics: true,
            ..BuildOptions::default()
        };
        let physics = builder.build_world("BEDROOM", physics).unwrap();

        let size = |output: &BuildOutput| {
            let image = &output.images[0].1;
            (image.width(), image.height())
        };
        assert_eq!(size(&visual), (320, 320));
        assert_eq!(size(&physics), size(&visual));
        assert!(physics.images[0].1.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_palette_from_tile_properties() {
        let mut declared = world("BEDROOM", &[Some("bg.dat")]);
        declared.physics = String::new();
        declared.tile_properties = vec![TileProperty {
            start: 1,
            collision: "org.flixel.FlxObject.NONE".into(),
            callback: Some("ladder".into()),
            run_length: 1,
        }];
        let builder = fixture(vec![declared], Registry::new());

        let physics = BuildOptions {
            physics: true,
            ..BuildOptions::default()
        };
        let output = builder.build_world("BEDROOM", physics).unwrap();
        // Every cell is tile 1, a ladder, so the icon atlas colour shows
        assert_eq!(output.images[0].1.get_pixel(5, 5), Some(pack(0, 0, 255, 255)));
    }

    #[test]
    fn test_write_outputs() {
        let builder = fixture(vec![world("BEDROOM", &[Some("bg.dat")])], Registry::new());
        let output = builder.build_world("BEDROOM", BuildOptions::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let paths = output.write(dir.path(), &TextCodec).unwrap();
        assert_eq!(paths, vec![flattened_path(dir.path(), "BEDROOM")]);
        assert!(paths[0].is_file());
    }
}

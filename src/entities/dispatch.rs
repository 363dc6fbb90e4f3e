use super::{rules, RenderInstruction, Resolution, RuleContext};
use crate::atlas::{AtlasStore, BLOCKER, VBLOCK};
use crate::diagnostics::Diagnostics;
use crate::display::{BlitError, PixelBuffer, Rect};
use crate::error::BuildError;
use crate::source::EntityRecord;
use tracing::trace;

/// Entity types another entity can absorb at the same position
pub const CONSUMABLE_TYPES: &[&str] = &["Dust"];

/// Consumables not yet claimed, in registry order
#[derive(Debug, Default)]
pub struct ConsumablePool<'e> {
    entries: Vec<&'e EntityRecord>,
}

impl<'e> ConsumablePool<'e> {
    pub fn new(entries: Vec<&'e EntityRecord>) -> Self {
        Self { entries }
    }

    /// Remove the first entry at exactly `(x, y)`; true if one was there
    pub fn claim(&mut self, x: i32, y: i32) -> bool {
        match self.entries.iter().position(|e| e.x == x && e.y == y) {
            Some(i) => {
                self.entries.remove(i);
                true
            },
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn into_entries(self) -> Vec<&'e EntityRecord> {
        self.entries
    }
}

/// Resolves a world's entities and draws them onto the entity canvas
pub struct EntityRenderDispatcher<'a> {
    atlases: &'a AtlasStore,
    diagnostics: &'a Diagnostics,
}

impl<'a> EntityRenderDispatcher<'a> {
    pub fn new(atlases: &'a AtlasStore, diagnostics: &'a Diagnostics) -> Self {
        Self {
            atlases,
            diagnostics,
        }
    }

    /// Draw instructions for `entities`, in draw order.
    ///
    /// Non-consumables resolve first so they can claim consumables; whatever
    /// is left of the consumables resolves afterwards.
    pub fn resolve(&self, world: &str, entities: &[EntityRecord]) -> Vec<RenderInstruction> {
        let (consumables, others): (Vec<_>, Vec<_>) = entities
            .iter()
            .partition(|e| CONSUMABLE_TYPES.contains(&e.name.as_str()));

        let mut pool = ConsumablePool::new(consumables);
        let mut out = Vec::new();
        for entity in others {
            self.resolve_one(world, entity, &mut pool, &mut out);
        }

        let remaining = std::mem::take(&mut pool).into_entries();
        for entity in remaining {
            self.resolve_one(world, entity, &mut pool, &mut out);
        }
        out
    }

    fn resolve_one<'e>(
        &self,
        world: &'e str,
        entity: &'e EntityRecord,
        pool: &mut ConsumablePool<'e>,
        out: &mut Vec<RenderInstruction>,
    ) {
        if !self.in_bounds(entity) {
            return;
        }

        let name = entity.name.as_str();
        let mut ctx = RuleContext::new(entity, world, pool, self.diagnostics);
        let resolution = match rules::lookup(name) {
            Some(rule) => rule(&mut ctx),
            None if self.atlases.has_sprite(name) => {
                self.diagnostics
                    .warn_once(&format!("default:{name}"), || format!("default rendering sprite: {name}"));
                ctx.sprite().into()
            },
            None => Resolution::Unknown {
                key: name.to_string(),
                message: format!("ignoring entity: {name}"),
            },
        };

        match resolution {
            Resolution::Draw(instructions) => {
                if let Some(missing) = instructions.iter().find(|i| !self.atlases.has_sprite(&i.atlas)) {
                    self.diagnostics.warn_once(name, || {
                        format!("ignoring entity: {name} (no atlas {:?})", missing.atlas)
                    });
                    return;
                }
                out.extend(instructions);
            },
            Resolution::Hidden => trace!(name, x = entity.x, y = entity.y, "hidden entity"),
            Resolution::Unknown { key, message } => {
                self.diagnostics.warn_once(&key, || message);
            },
        }
    }

    fn in_bounds(&self, entity: &EntityRecord) -> bool {
        if entity.x < 0 || entity.y < 0 {
            self.diagnostics.warn(format!(
                "ignoring out of bounds entity: {} at {}, {}",
                entity.name, entity.x, entity.y
            ));
            return false;
        }
        true
    }

    /// Physics instructions: only invisible blockers carry collision
    pub fn resolve_physics(&self, entities: &[EntityRecord]) -> Vec<RenderInstruction> {
        entities
            .iter()
            .filter(|e| e.name == "Solid_Sprite")
            .filter(|e| self.in_bounds(e))
            .filter_map(|e| {
                let key = match e.subtype()? {
                    "blocker" => BLOCKER,
                    "vblock" => VBLOCK,
                    _ => return None,
                };
                Some(RenderInstruction::whole(key, e.x, e.y))
            })
            .collect()
    }

    /// Resolve and draw; true if anything landed on `canvas`
    pub fn render(
        &self,
        world: &str,
        entities: &[EntityRecord],
        canvas: &mut PixelBuffer,
    ) -> Result<bool, BuildError> {
        let instructions = self.resolve(world, entities);
        self.execute(&instructions, canvas)
    }

    pub fn render_physics(
        &self,
        entities: &[EntityRecord],
        canvas: &mut PixelBuffer,
    ) -> Result<bool, BuildError> {
        let instructions = self.resolve_physics(entities);
        self.execute(&instructions, canvas)
    }

    /// Draws that would leave the canvas are skipped with a diagnostic;
    /// a sprite sheet too small for its cell fails the world.
    pub fn execute(
        &self,
        instructions: &[RenderInstruction],
        canvas: &mut PixelBuffer,
    ) -> Result<bool, BuildError> {
        let mut drawn = false;
        for instruction in instructions {
            let image = self.atlases.sprite(&instruction.atlas)?;
            let rect = instruction
                .src
                .unwrap_or_else(|| Rect::new(0, 0, image.width(), image.height()));

            match canvas.blit(
                &image,
                rect,
                instruction.dst_x,
                instruction.dst_y,
                instruction.transform,
            ) {
                Ok(()) => drawn = true,
                Err(e @ BlitError::DestinationOutOfBounds { .. }) => {
                    self.diagnostics
                        .warn(format!("skipping {} draw: {}", instruction.atlas, e));
                },
                Err(e) => return Err(BuildError::blit(instruction.atlas.clone(), e)),
            }
        }
        Ok(drawn)
    }
}

/// Resolve one entity in isolation, with no consumables available
#[cfg(test)]
pub(crate) fn resolve_alone(entity: &EntityRecord) -> Resolution {
    let diagnostics = Diagnostics::new();
    let mut pool = ConsumablePool::default();
    let mut ctx = RuleContext::new(entity, &entity.world, &mut pool, &diagnostics);
    match rules::lookup(&entity.name) {
        Some(rule) => rule(&mut ctx),
        None => super::SpriteDraw::new(&entity.name, entity.x, entity.y).into(),
    }
}

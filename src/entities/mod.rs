//! Entity rendering
//!
//! Every registry entity is resolved by a per-type rule into zero or more
//! draw instructions against the sprite table. Rules see the entity, its
//! world and the pool of consumable decorations a rule may absorb.

mod dispatch;
mod rules;

pub use dispatch::{ConsumablePool, EntityRenderDispatcher, CONSUMABLE_TYPES};

use crate::diagnostics::Diagnostics;
use crate::display::{Rect, Transform, TILE_SIZE};
use crate::source::EntityRecord;
use std::fmt;

/// One blit from a sprite-table atlas onto the entity canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInstruction {
    /// Sprite-table key
    pub atlas: String,
    /// `None` copies the whole atlas image
    pub src: Option<Rect>,
    pub dst_x: i32,
    pub dst_y: i32,
    pub transform: Transform,
}

impl RenderInstruction {
    pub fn new(atlas: impl Into<String>, src: Rect, dst_x: i32, dst_y: i32) -> Self {
        Self {
            atlas: atlas.into(),
            src: Some(src),
            dst_x,
            dst_y,
            transform: Transform::IDENTITY,
        }
    }

    /// Copy an entire atlas image
    pub fn whole(atlas: impl Into<String>, dst_x: i32, dst_y: i32) -> Self {
        Self {
            atlas: atlas.into(),
            src: None,
            dst_x,
            dst_y,
            transform: Transform::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// The primary sprite of an entity plus any overlays drawn after it.
///
/// Starts as a 16x16 cell at the atlas origin, drawn at the entity position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteDraw {
    pub atlas: String,
    pub sx: u32,
    pub sy: u32,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    pub transform: Transform,
    overlays: Vec<RenderInstruction>,
}

impl SpriteDraw {
    pub fn new(atlas: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            atlas: atlas.into(),
            sx: 0,
            sy: 0,
            width: TILE_SIZE,
            height: TILE_SIZE,
            x,
            y,
            transform: Transform::IDENTITY,
            overlays: Vec::new(),
        }
    }

    pub fn atlas(mut self, key: impl Into<String>) -> Self {
        self.atlas = key.into();
        self
    }

    pub fn src(mut self, sx: u32, sy: u32) -> Self {
        self.sx = sx;
        self.sy = sy;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn offset(mut self, dx: i32, dy: i32) -> Self {
        self.x += dx;
        self.y += dy;
        self
    }

    pub fn flipped(mut self) -> Self {
        self.transform.flip_h = true;
        self
    }

    pub fn rotated(mut self, quarter_turns: i8) -> Self {
        self.transform.quarter_turns = quarter_turns;
        self
    }

    /// Queue another draw after the primary one
    pub fn overlay(mut self, instruction: RenderInstruction) -> Self {
        self.overlays.push(instruction);
        self
    }

    pub fn src_rect(&self) -> Rect {
        Rect::new(self.sx, self.sy, self.width, self.height)
    }

    pub fn into_instructions(self) -> Vec<RenderInstruction> {
        let primary = RenderInstruction::new(&self.atlas, self.src_rect(), self.x, self.y)
            .with_transform(self.transform);
        std::iter::once(primary).chain(self.overlays).collect()
    }
}

/// What a rule decided for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Draw(Vec<RenderInstruction>),
    /// Deliberately not drawn (markers, triggers, hidden variants)
    Hidden,
    /// Combination the table does not know; reported once per `key`
    Unknown { key: String, message: String },
}

impl From<SpriteDraw> for Resolution {
    fn from(draw: SpriteDraw) -> Self {
        Self::Draw(draw.into_instructions())
    }
}

/// Inputs a rule may consult while resolving one entity
pub struct RuleContext<'c, 'e> {
    entity: &'e EntityRecord,
    world: &'e str,
    consumables: &'c mut ConsumablePool<'e>,
    diagnostics: &'c Diagnostics,
}

impl<'c, 'e> RuleContext<'c, 'e> {
    pub fn new(
        entity: &'e EntityRecord,
        world: &'e str,
        consumables: &'c mut ConsumablePool<'e>,
        diagnostics: &'c Diagnostics,
    ) -> Self {
        Self {
            entity,
            world,
            consumables,
            diagnostics,
        }
    }

    #[inline]
    pub fn name(&self) -> &'e str {
        &self.entity.name
    }

    #[inline]
    pub fn world(&self) -> &'e str {
        self.world
    }

    #[inline]
    pub fn frame(&self) -> i32 {
        self.entity.frame
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.entity.x
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.entity.y
    }

    #[inline]
    pub fn subtype(&self) -> Option<&'e str> {
        self.entity.subtype()
    }

    /// World is `name`
    #[inline]
    pub fn in_world(&self, name: &str) -> bool {
        self.world == name
    }

    /// The lower half of REDCAVE uses the alternate enemy palette
    pub fn is_boi(&self) -> bool {
        self.in_world("REDCAVE") && self.entity.y > 1000
    }

    /// The entity's own sprite at its position
    pub fn sprite(&self) -> SpriteDraw {
        SpriteDraw::new(self.name(), self.x(), self.y())
    }

    /// Another atlas at the entity position
    pub fn sprite_from(&self, key: &str) -> SpriteDraw {
        SpriteDraw::new(key, self.x(), self.y())
    }

    /// Absorb a consumable placed exactly where this entity is
    pub fn claim_consumable(&mut self) -> bool {
        self.consumables.claim(self.entity.x, self.entity.y)
    }

    /// Warn once per `key` but keep resolving
    pub fn warn_once(&self, key: &str, message: impl FnOnce() -> String) {
        self.diagnostics.warn_once(key, message);
    }

    /// Skip the entity, reporting `what` once per entity type
    pub fn unknown(&self, what: impl fmt::Display) -> Resolution {
        Resolution::Unknown {
            key: format!("{}:{}:{}", self.name(), self.world, what),
            message: format!(
                "ignoring {} with {} in {} at {},{}",
                self.name(),
                what,
                self.world,
                self.x(),
                self.y()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_draw_defaults_and_overlays() {
        let draw = SpriteDraw::new("Slime", 32, 48)
            .src(16, 0)
            .offset(-3, -2)
            .overlay(RenderInstruction::new("bike", Rect::new(20, 0, 20, 20), 0, 0));
        let instructions = draw.into_instructions();

        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].src, Some(Rect::new(16, 0, 16, 16)));
        assert_eq!((instructions[0].dst_x, instructions[0].dst_y), (29, 46));
        assert_eq!(instructions[1].atlas, "bike");
    }
}

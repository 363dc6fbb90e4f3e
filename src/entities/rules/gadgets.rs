use crate::display::Rect;
use crate::entities::{RenderInstruction, Resolution, RuleContext};

/// Preview row in the nexus door sheet for each door's `frame`
const NEXUS_PREVIEWS: &[(i32, u32)] = &[
    (13, 0),  // STREET
    (49, 1),  // OVERWORLD
    (62, 2),  // REDCAVE
    (61, 3),  // CROWD
    (60, 4),  // APARTMENT
    (59, 5),  // HOTEL
    (58, 6),  // CIRCUS
    (54, 7),  // CLIFF
    (50, 8),  // FOREST
    (64, 9),  // WINDMILL
    (53, 10), // REDSEA
    (55, 11), // BEACH
    (63, 12), // BEDROOM
    (48, 13), // FIELDS
    (52, 14), // GO
    (51, 15), // TERMINAL
    (57, 16), // HAPPY
    (47, 17), // SPACE
    (45, 18), // CELL
    (46, 19), // SUBURB
    (56, 20), // BLUE
];

/// Card-gate row in the big gate sheet, by world
const CARD_GATES: &[(&str, u32)] = &[
    ("OVERWORLD", 8),
    ("BEACH", 9),
    ("SUBURB", 10),
    ("CELL", 13),
    ("TERMINAL", 14),
    ("NEXUS", 15),
];

pub(super) fn switch_pillar(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    match ctx.frame() {
        0 => ctx.sprite().src(16, 0).into(),
        1 => ctx.sprite().into(),
        f => ctx.unknown(format!("frame {f}")),
    }
}

/// Four facings laid out left to right
pub(super) fn facing_strip(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sx = (ctx.frame() & 3) as u32 * 16;
    ctx.sprite().src(sx, 0).into()
}

pub(super) fn on_off_laser(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let draw = ctx.sprite();
    match ctx.frame() {
        0 => draw.src(0, 16).into(),
        1 => draw.rotated(-1).into(),
        2 => draw.into(),
        3 => draw.rotated(1).into(),
        f => {
            ctx.warn_once(&format!("On_Off_Laser:frame:{f}"), || {
                format!("unknown On_Off_Laser direction {f}, drawing it facing down")
            });
            draw.into()
        },
    }
}

pub(super) fn dash_trap(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sx = if ctx.is_boi() { 32 } else { 0 };
    ctx.sprite().src(sx, 16).into()
}

pub(super) fn key_block(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let gate = ctx.sprite_from("big_gate").size(32, 16);
    let row = match ctx.frame() {
        0 => return ctx.sprite().into(),
        1 => 7,
        2 => 0,
        3 => 6,
        4 if ctx.in_world("BLANK") => {
            // Two card gates share this world
            if ctx.y() == 864 {
                11
            } else {
                16
            }
        },
        4 => match CARD_GATES.iter().find(|(w, _)| ctx.in_world(w)) {
            Some(&(_, row)) => row,
            None => return ctx.unknown("card gate"),
        },
        f => return ctx.unknown(format!("frame {f}")),
    };
    gate.src(0, row * 16).into()
}

pub(super) fn nonsolid(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    match ctx.subtype() {
        Some("Rail_1") => ctx.sprite_from("nonsolid_rail_sprite").into(),
        Some("Rail_CROWD") => ctx.sprite_from("nonsolid_rail_crowd").into(),
        other => ctx.unknown(format!("type {other:?}")),
    }
}

pub(super) fn jump_trigger(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let invisible = ["APARTMENT", "CLIFF", "BEACH", "CROWD", "DEBUG"]
        .iter()
        .any(|w| ctx.in_world(w));
    // Only type 1 shows in HOTEL
    if invisible || (ctx.in_world("HOTEL") && ctx.subtype() != Some("1")) {
        return Resolution::Hidden;
    }
    ctx.sprite().into()
}

pub(super) fn gate(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = if ctx.in_world("BLANK") { 32 } else { 0 };
    ctx.sprite().src(0, sy).into()
}

pub(super) fn console(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    if !ctx.in_world("WINDMILL") {
        return ctx.sprite().into();
    }
    let rect = Rect::new(0, 0, 48, 48);
    ctx.sprite_from("windmill_console")
        .size(48, 48)
        .overlay(RenderInstruction::new("windmill_shell", rect, ctx.x(), ctx.y()))
        .into()
}

/// Moving platform; one carrying dust swaps to its loaded cell
pub(super) fn propelled(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = if ctx.frame() & 1 == 0 { 16 } else { 0 };
    let sx = if ctx.claim_consumable() { 16 } else { 0 };
    ctx.sprite().src(sx, sy).into()
}

pub(super) fn treasure(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = if ctx.in_world("CELL") { 32 } else { 0 };
    ctx.sprite().src(0, sy).into()
}

pub(super) fn dash_pad(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sx = ctx.frame().max(0) as u32 * 16;
    ctx.sprite().src(sx, 16).into()
}

/// Frames 0-3 are the faded shadows, 4-7 the rollers
pub(super) fn spike_roller(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let (key, horizontal) = match ctx.frame() {
        0 | 3 => ("Spike_Roller_H_S", true),
        1 | 2 => ("Spike_Roller_V_S", false),
        4 | 7 => ("Spike_Roller_H", true),
        5 | 6 => ("Spike_Roller_V", false),
        f => return ctx.unknown(format!("frame {f}")),
    };
    let draw = ctx.sprite_from(key);
    if horizontal {
        draw.size(128, 16).into()
    } else {
        draw.size(16, 128).into()
    }
}

pub(super) fn button(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = match ctx.world() {
        "REDCAVE" => 32,
        "CELL" => 64,
        _ => 16,
    };
    ctx.sprite().src(0, sy).into()
}

/// Shared by holes and cracked floor tiles
pub(super) fn floor_hazard(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let (sx, sy) = match ctx.world() {
        "BEDROOM" => (0, 0),
        "STREET" => (16, 0),
        "REDCAVE" => (32, 0),
        "CIRCUS" => (32, 16),
        // One style per floor quadrant
        "HOTEL" => match (ctx.x() >= 960, ctx.y() >= 800) {
            (false, false) => (0, 16),
            (true, true) => (16, 16),
            _ => (48, 0),
        },
        _ => return ctx.unknown("world"),
    };
    ctx.sprite().src(sx, sy).into()
}

pub(super) fn key(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    // The key below the first screen never appears in game
    if ctx.y() > 100 {
        return ctx.unknown(format!("placement at {},{}", ctx.x(), ctx.y()));
    }
    ctx.sprite().into()
}

pub(super) fn dungeon_statue(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sx = match ctx.world() {
        "BEDROOM" => 0,
        "REDCAVE" => 32,
        "CROWD" => 64,
        _ => return ctx.unknown("world"),
    };
    ctx.sprite().src(sx, 0).size(32, 48).into()
}

pub(super) fn door(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    match ctx.subtype() {
        Some("1" | "5" | "6" | "8" | "10" | "11" | "12" | "13" | "14" | "15") => Resolution::Hidden,
        Some("4") => {
            let sy = if ctx.in_world("CELL") { 16 } else { 0 };
            ctx.sprite_from("door_portal").src(0, sy).into()
        },
        Some("7") if ctx.in_world("NEXUS") => Resolution::Hidden,
        Some("7") => ctx.sprite_from("whirlpool").into(),
        Some("9") if !ctx.in_world("NEXUS") => Resolution::Hidden,
        Some("9") => {
            let frame = ctx.frame();
            match NEXUS_PREVIEWS.iter().find(|(f, _)| *f == frame) {
                Some(&(_, row)) => ctx
                    .sprite_from("nexus_doors")
                    .src(0, row * 32)
                    .size(32, 32)
                    .into(),
                None => ctx.unknown(format!("nexus door frame {frame}")),
            }
        },
        Some("16") => {
            let sy = if ctx.in_world("CELL") { 32 } else { 0 };
            ctx.sprite_from("nexus_pad").src(0, sy).size(32, 32).into()
        },
        other => ctx.unknown(format!("type {other:?}")),
    }
}

pub(super) fn solid_sprite(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    match ctx.subtype() {
        // Collision only; drawn by the physics rendering
        Some("blocker" | "vblock") => Resolution::Hidden,
        Some("sign") => {
            let (sx, sy) = match ctx.frame() {
                2 => (0, 16),
                3 => (16, 16),
                4 => (0, 32),
                f => return ctx.unknown(format!("sign frame {f}")),
            };
            ctx.sprite_from("npc_rock").src(sx, sy).into()
        },
        Some("red_cave_n_ss" | "red_cave_r_ss" | "red_cave_l_ss") => {
            ctx.sprite_from("red_cave").size(64, 64).into()
        },
        Some("tree") => ctx.sprite_from("debug_tree").size(64, 64).into(),
        other => ctx.unknown(format!("type {other:?}")),
    }
}

/// Only checkpoints are visible
pub(super) fn event(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    if ctx.frame() != 2 {
        return Resolution::Hidden;
    }
    let sy = if ctx.in_world("CELL") { 16 } else { 0 };
    ctx.sprite_from("checkpoint").src(0, sy).into()
}

pub(super) fn fire_pillar(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().offset(0, 16).into()
}

pub(super) fn red_pillar(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(16, 64).into()
}

#[cfg(test)]
mod tests {
    use crate::entities::dispatch::resolve_alone;
    use crate::entities::Resolution;
    use crate::display::{Rect, Transform};
    use crate::source::EntityRecord;

    fn draws(entity: &EntityRecord) -> Vec<(String, Rect, i32, i32)> {
        match resolve_alone(entity) {
            Resolution::Draw(list) => list
                .into_iter()
                .map(|i| (i.atlas, i.src.unwrap(), i.dst_x, i.dst_y))
                .collect(),
            other => panic!("expected a draw, got {other:?}"),
        }
    }

    #[test]
    fn test_key_block_card_gates_by_world() {
        let gate = EntityRecord::new("KeyBlock", 0, 0, 4, "TERMINAL");
        assert_eq!(draws(&gate)[0].1, Rect::new(0, 14 * 16, 32, 16));

        let blank = EntityRecord::new("KeyBlock", 0, 864, 4, "BLANK");
        assert_eq!(draws(&blank)[0].1.y, 11 * 16);

        let stray = EntityRecord::new("KeyBlock", 0, 0, 4, "BEDROOM");
        assert!(matches!(resolve_alone(&stray), Resolution::Unknown { .. }));
    }

    #[test]
    fn test_on_off_laser_rotations() {
        for (frame, turns) in [(1, -1), (3, 1), (2, 0)] {
            let laser = EntityRecord::new("On_Off_Laser", 0, 0, frame, "REDCAVE");
            let Resolution::Draw(list) = resolve_alone(&laser) else {
                panic!("laser not drawn");
            };
            assert_eq!(list[0].transform, Transform::rotated(turns));
        }
    }

    #[test]
    fn test_windmill_console_has_shell_overlay() {
        let console = EntityRecord::new("Console", 96, 64, 0, "WINDMILL");
        let list = draws(&console);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].0, "windmill_console");
        assert_eq!(list[1], ("windmill_shell".into(), Rect::new(0, 0, 48, 48), 96, 64));
    }

    #[test]
    fn test_doors_by_kind() {
        let hidden = EntityRecord::new("Door", 0, 0, 0, "BEDROOM").with_subtype("11");
        assert_eq!(resolve_alone(&hidden), Resolution::Hidden);

        let preview = EntityRecord::new("Door", 32, 32, 52, "NEXUS").with_subtype("9");
        assert_eq!(draws(&preview)[0].1, Rect::new(0, 14 * 32, 32, 32));

        let elsewhere = EntityRecord::new("Door", 32, 32, 52, "GO").with_subtype("9");
        assert_eq!(resolve_alone(&elsewhere), Resolution::Hidden);
    }

    #[test]
    fn test_hotel_hole_quadrants() {
        let cell = |x, y| draws(&EntityRecord::new("Hole", x, y, 0, "HOTEL"))[0].1;
        assert_eq!((cell(0, 0).x, cell(0, 0).y), (0, 16));
        assert_eq!((cell(960, 800).x, cell(960, 800).y), (16, 16));
        assert_eq!((cell(960, 0).x, cell(960, 0).y), (48, 0));
    }
}

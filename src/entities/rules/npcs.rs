use crate::display::Rect;
use crate::entities::{RenderInstruction, Resolution, RuleContext, SpriteDraw};

/// Hand-placed suburb residents with `frame >= 6`, keyed by position
const SUBURB_RESIDENTS: &[((i32, i32), (u32, u32))] = &[
    ((192, 848), (0, 0)),
    ((544, 848), (0, 64)),
    ((688, 848), (0, 32)),
    ((32, 1008), (0, 0)),
    ((592, 896), (0, 16)),
    ((96, 1216), (128, 16)),
    ((272, 1216), (128, 0)),
];

/// The hanged resident
const NOOSE_POSITION: (i32, i32) = (192, 1008);

/// The right half of SPACE is the inverted world
fn inverted(ctx: &RuleContext<'_, '_>) -> bool {
    ctx.x() > 912
}

pub(super) fn stag(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(64, 80).into()
}

pub(super) fn redsea_npc(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = (ctx.frame().max(0) * 16 / 10) as u32;
    ctx.sprite().src(0, sy).into()
}

pub(super) fn circus_folks(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    // Past this column the performers have already fallen
    let fallen = ctx.x() >= 1340;
    match ctx.frame() {
        0 => {
            let arthur = ctx.sprite_from("circus_folks_arthur").src(0, 64);
            if fallen {
                arthur.src(32, 64).into()
            } else {
                // Balancing on top of the stack
                arthur.offset(0, -7 * 16).into()
            }
        },
        1 => {
            let sy = if fallen { 48 } else { 0 };
            ctx.sprite_from("circus_folks_javiera").src(0, sy).into()
        },
        2 => ctx
            .sprite_from("circus_folks_both")
            .size(16, 32)
            .offset(0, -64)
            .into(),
        f => ctx.unknown(format!("frame {f}")),
    }
}

pub(super) fn npc(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    match ctx.subtype() {
        Some("Cell_Body") => {
            let (sx, sy) = match ctx.frame() {
                0 => (0, 0),
                2 => (32, 0),
                4 => (0, 16),
                6 => (32, 16),
                f => return ctx.unknown(format!("cell body frame {f}")),
            };
            ctx.sprite_from("npc_cell_bodies").src(sx, sy).into()
        },
        Some("rock") => match ctx.world() {
            "CELL" => ctx.sprite_from("npc_rock").src(16, 0).into(),
            "SPACE" => {
                let sx = if inverted(ctx) { 16 } else { 0 };
                ctx.sprite_from("Space_NPC").src(sx, 48).into()
            },
            _ => ctx.sprite_from("npc_rock").into(),
        },
        Some("statue") => ctx.sprite_from("npc_sage_statue").into(),
        Some("big_key") => {
            let sy = match ctx.world() {
                "BEDROOM" => 0,
                "REDCAVE" => 16,
                "CROWD" => 32,
                _ => return ctx.unknown("big key"),
            };
            ctx.sprite_from("big_key").src(0, sy).into()
        },
        Some("generic") => generic_npc(ctx),
        Some("biofilm") => ctx.sprite_from("biofilm").size(32, 32).into(),
        // The "like music?" scribbler
        Some("npc_test") => ctx.sprite_from("npc_squiggles").into(),
        other => ctx.unknown(format!("type {other:?}")),
    }
}

/// `generic` NPCs are one-off characters told apart by world and frame
fn generic_npc(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let frame = ctx.frame();
    let draw = match (ctx.world(), frame) {
        // Windmill blades, the save point voice and the game-over dimmer
        ("WINDMILL" | "HAPPY" | "DRAWER", _) => return Resolution::Hidden,

        // Hews the lobster
        ("BEACH", 7) => ctx.sprite_from("beach_npcs"),
        ("BEACH", 16) => ctx.sprite_from("Trade_NPC").src(96, 128),
        ("BLUE", _) => ctx.sprite_from("npc_snowman"),
        ("CELL", _) => ctx.sprite_from("npc_cell_bodies").src(0, 32),
        ("CLIFF", 7) => ctx.sprite_from("npc_golem"),
        ("CLIFF", 6) => ctx.sprite_from("Dog"),
        ("HOTEL", 12) => ctx.sprite_from("npc_hotel").src(32, 0),
        // Eye watching from the water
        ("HOTEL", 5) => ctx.sprite_from("Eye_Boss").src(72, 0).size(24, 24),
        ("FIELDS", _) => return fields_npc(ctx),
        // James
        ("FOREST", _) => ctx.sprite_from("Forest_NPC").src(0, 16),
        // Drifter in the lower half, kings above
        ("SPACE", _) if ctx.y() > 500 => ctx.sprite_from("Space_NPC"),
        ("SPACE", _) => {
            let sx = if inverted(ctx) { 64 } else { 0 };
            ctx.sprite_from("Space_NPC").src(sx, 64).size(32, 32)
        },
        ("REDCAVE", _) => ctx.sprite_from("smoke_red").size(32, 32),
        // Rock in the bright room, cone blocking HAPPY
        ("GO", 7) => ctx.sprite_from("npc_rock"),
        ("GO", 11) => ctx.sprite_from("ground_thorn").src(48, 16).offset(0, 8),
        ("SUBURB", _) => ctx.sprite_from("Suburb_Walker"),
        ("DEBUG", 17) => ctx.sprite_from("npc_devs"),
        ("DEBUG", 18) => ctx.sprite_from("npc_devs").src(0, 16),
        ("APARTMENT", _) => ctx.sprite_from("random_npcs"),
        _ => return ctx.unknown(format!("generic frame {frame}")),
    };
    draw.into()
}

fn fields_npc(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let trade = ctx.sprite_from("Trade_NPC").src(0, 128);
    match ctx.frame() {
        // Olive
        8 => ctx.sprite_from("Forest_NPC").src(0, 48).into(),
        // Bob, Chikapu, Kuribu
        13 => trade.into(),
        14 => trade.src(32, 128).into(),
        15 => trade.src(64, 128).into(),
        // Rank and the oddly aligned bush beside him
        7 => {
            let (x, y) = (ctx.x(), ctx.y());
            trade
                .src(32, 96)
                .size(16, 32)
                .overlay(RenderInstruction::new("Trade_NPC", Rect::new(0, 48, 16, 16), x + 16, y + 12))
                .into()
        },
        f => ctx.unknown(format!("fields frame {f}")),
    }
}

pub(super) fn trade_npc(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let draw = ctx.sprite();
    match ctx.frame() {
        0 => draw.into(),
        // Fish
        1 | 2 => draw.src(0, 32).into(),
        3 => fintys_shop(draw.src(0, 80)).into(),
        4 => draw.src(0, 16).into(),
        f => ctx.unknown(format!("frame {f}")),
    }
}

/// Finty's wares: gun, money sack, shoes
fn fintys_shop(draw: SpriteDraw) -> SpriteDraw {
    let (x, y) = (draw.x, draw.y + 32);
    [(64, x - 32), (80, x + 4), (96, x + 38)]
        .into_iter()
        .fold(draw, |draw, (sx, dx)| {
            draw.overlay(RenderInstruction::new("Trade_NPC", Rect::new(sx, 80, 16, 16), dx, y))
        })
}

pub(super) fn forest_npc(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let (sx, sy) = match ctx.frame() {
        // Thorax
        0 => (16, 0),
        // Mushroom
        20 => (0, 32),
        // Crickson
        30 => (0, 48),
        // Scared rabbit
        34 => (64, 48),
        f => return ctx.unknown(format!("frame {f}")),
    };
    ctx.sprite().src(sx, sy).into()
}

pub(super) fn space_npc(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = if inverted(ctx) { 16 } else { 0 };
    let sx = if matches!(ctx.frame(), 8 | 18) { 128 } else { 0 };
    ctx.sprite().src(sx, sy).into()
}

pub(super) fn space_face(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sx = if inverted(ctx) { 32 } else { 0 };
    ctx.sprite_from("Space_NPC").src(sx, 32).into()
}

pub(super) fn suburb_walker(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let frame = ctx.frame();
    if (0..6).contains(&frame) {
        return ctx.sprite().src(0, frame as u32 * 16).into();
    }

    let position = (ctx.x(), ctx.y());
    if position == NOOSE_POSITION {
        let (x, y) = position;
        return (1..=3)
            .fold(ctx.sprite().src(0, 96), |draw, i| {
                draw.overlay(RenderInstruction::new(
                    "Suburb_Walker",
                    Rect::new(16, 96, 16, 16),
                    x,
                    y - 16 * i,
                ))
            })
            .into();
    }

    match SUBURB_RESIDENTS.iter().find(|(p, _)| *p == position) {
        Some(&(_, (sx, sy))) => ctx.sprite().src(sx, sy).into(),
        None => ctx.unknown(format!("frame {frame}")),
    }
}

pub(super) fn mitra(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let on_bike = ctx.sprite_from("mitra_on_bike").src(40, 0).size(20, 20).offset(0, -4);
    match ctx.world() {
        "FIELDS" => {
            let bike = RenderInstruction::new("bike", Rect::new(20, 0, 20, 20), ctx.x() - 22, ctx.y() - 11);
            ctx.sprite().src(0, 16).overlay(bike).into()
        },
        "CLIFF" => on_bike.flipped().into(),
        "OVERWORLD" => on_bike.into(),
        // Nowhere sensible to show her
        "GO" => Resolution::Hidden,
        world => {
            ctx.warn_once(&format!("Mitra:{world}"), || {
                format!("default rendering Mitra in {world}")
            });
            ctx.sprite().into()
        },
    }
}

pub(super) fn sage(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    const KNOWN: &[&str] = &["BEDROOM", "REDCAVE", "CROWD", "NEXUS", "TERMINAL", "OVERWORLD", "GO"];
    let world = ctx.world();
    if world == "BLANK" {
        return Resolution::Hidden;
    }
    if !KNOWN.contains(&world) {
        ctx.warn_once(&format!("Sage:{world}"), || {
            format!("default rendering Sage in {world}")
        });
    }
    ctx.sprite().src(0, 16).into()
}

pub(super) fn happy_npc(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    match ctx.frame() {
        // Briar walking along the trough
        18 => Resolution::Hidden,
        0 | 1 | 3 => ctx.sprite().src(0, 16).into(),
        _ => ctx.sprite().into(),
    }
}

pub(super) fn fisherman(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite_from("beach_npcs").src(0, 16).into()
}

pub(super) fn health_cicada(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = if ctx.in_world("CELL") { 32 } else { 0 };
    ctx.sprite().src(0, sy).into()
}

#[cfg(test)]
mod tests {
    use crate::display::Rect;
    use crate::entities::dispatch::resolve_alone;
    use crate::entities::{RenderInstruction, Resolution};
    use crate::source::EntityRecord;

    fn draws(entity: &EntityRecord) -> Vec<RenderInstruction> {
        match resolve_alone(entity) {
            Resolution::Draw(list) => list,
            other => panic!("expected a draw, got {other:?}"),
        }
    }

    #[test]
    fn test_fintys_shop_has_three_wares() {
        let list = draws(&EntityRecord::new("Trade_NPC", 100, 50, 3, "BEACH"));
        assert_eq!(list.len(), 4);
        assert_eq!(list[0].src, Some(Rect::new(0, 80, 16, 16)));
        let wares: Vec<_> = list[1..].iter().map(|i| (i.dst_x, i.dst_y)).collect();
        assert_eq!(wares, vec![(68, 82), (104, 82), (138, 82)]);
    }

    #[test]
    fn test_ranks_bush() {
        let entity = EntityRecord::new("NPC", 64, 64, 7, "FIELDS").with_subtype("generic");
        let list = draws(&entity);
        assert_eq!(list[0].src, Some(Rect::new(32, 96, 16, 32)));
        assert_eq!((list[1].dst_x, list[1].dst_y), (80, 76));
    }

    #[test]
    fn test_generic_npcs_by_world() {
        let hidden = EntityRecord::new("NPC", 0, 0, 3, "WINDMILL").with_subtype("generic");
        assert_eq!(resolve_alone(&hidden), Resolution::Hidden);

        let king = EntityRecord::new("NPC", 1000, 100, 0, "SPACE").with_subtype("generic");
        assert_eq!(draws(&king)[0].src, Some(Rect::new(64, 64, 32, 32)));

        let stray = EntityRecord::new("NPC", 0, 0, 3, "BEACH").with_subtype("generic");
        assert!(matches!(resolve_alone(&stray), Resolution::Unknown { .. }));
    }

    #[test]
    fn test_suburb_noose() {
        let list = draws(&EntityRecord::new("Suburb_Walker", 192, 1008, 9, "SUBURB"));
        assert_eq!(list.len(), 4);
        assert_eq!(list[3].dst_y, 1008 - 48);

        let walker = draws(&EntityRecord::new("Suburb_Walker", 0, 0, 3, "SUBURB"));
        assert_eq!(walker[0].src, Some(Rect::new(0, 48, 16, 16)));

        let nobody = EntityRecord::new("Suburb_Walker", 1, 1, 9, "SUBURB");
        assert!(matches!(resolve_alone(&nobody), Resolution::Unknown { .. }));
    }

    #[test]
    fn test_mitra_on_bike_in_cliff() {
        let list = draws(&EntityRecord::new("Mitra", 40, 40, 0, "CLIFF"));
        assert_eq!(list[0].atlas, "mitra_on_bike");
        assert_eq!(list[0].dst_y, 36);
        assert!(list[0].transform.flip_h);
    }
}

use crate::display::{Rect, Transform};
use crate::entities::{RenderInstruction, Resolution, RuleContext};

/// The wall boss is assembled from fixed parts regardless of where the
/// registry places it
const WALL_BOSS_PARTS: &[(&str, Rect, i32, i32, bool)] = &[
    ("wall_boss_wall", Rect::new(0, 0, 160, 32), 1440, 960, false),
    ("wall_boss_mouth", Rect::new(16, 0, 32, 32), 1504, 960, false),
    ("wall_boss_hand", Rect::new(0, 0, 32, 32), 1456, 992, false),
    ("wall_boss_hand", Rect::new(0, 0, 32, 32), 1552, 992, true),
];

/// Plain 16x16 first cell
pub(super) fn simple(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().into()
}

pub(super) fn silverfish(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let draw = ctx.sprite().src(0, 16);
    match ctx.frame() {
        0 => draw.src(32, 16).flipped().into(),
        1 => draw.into(),
        2 => draw.src(32, 16).into(),
        3 => draw.src(0, 32).into(),
        f => {
            ctx.warn_once(&format!("Silverfish:frame:{f}"), || {
                format!("unknown Silverfish direction {f}, drawing it facing down")
            });
            draw.into()
        },
    }
}

/// Walkers whose frames are 24 pixels tall
pub(super) fn tall(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(16, 24).into()
}

pub(super) fn slasher(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(24, 24).into()
}

pub(super) fn splitboss(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(24, 32).into()
}

pub(super) fn contort(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(16, 32).into()
}

pub(super) fn large(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(32, 32).into()
}

pub(super) fn red_walker(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(32, 48).into()
}

pub(super) fn shadow_briar(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    if ctx.in_world("GO") {
        return Resolution::Hidden;
    }
    let sx = match ctx.frame() {
        0 | 2 | 3 | 4 => 0,
        1 => 64,
        f => return ctx.unknown(format!("frame {f}")),
    };
    ctx.sprite().src(sx, 32).into()
}

pub(super) fn chaser(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sx = if ctx.frame() == 0 { 32 } else { 0 };
    ctx.sprite().src(sx, 32).size(16, 32).into()
}

pub(super) fn rat(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = if ctx.in_world("CELL") { 16 } else { 0 };
    ctx.sprite().src(0, sy).into()
}

pub(super) fn eye_boss(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = if ctx.y() == 1648 { 24 } else { 0 };
    ctx.sprite().src(0, sy).size(24, 24).into()
}

pub(super) fn sage_boss(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().size(16, 24).offset(24, 0).into()
}

pub(super) fn mover(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    ctx.sprite().src(16, 0).into()
}

pub(super) fn annoyer(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let (sx, sy) = match ctx.frame() {
        _ if ctx.in_world("CELL") => (0, 16),
        2 => (0, 32),
        8 => (32, 16),
        _ => (0, 0),
    };
    // Spawns slightly off its placement
    ctx.sprite().src(sx, sy).offset(-3, -2).into()
}

pub(super) fn slime(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sx = if ctx.is_boi() { 32 } else { 0 };
    ctx.sprite().src(sx, 0).into()
}

pub(super) fn frog(ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let sy = if ctx.is_boi() { 32 } else { 0 };
    ctx.sprite().src(0, sy).into()
}

pub(super) fn wall_boss(_ctx: &mut RuleContext<'_, '_>) -> Resolution {
    let parts = WALL_BOSS_PARTS
        .iter()
        .map(|&(key, rect, x, y, flip_h)| {
            let transform = if flip_h {
                Transform::flipped()
            } else {
                Transform::IDENTITY
            };
            RenderInstruction::new(key, rect, x, y).with_transform(transform)
        })
        .collect();
    Resolution::Draw(parts)
}

#[cfg(test)]
mod tests {
    use crate::display::{Rect, Transform};
    use crate::entities::dispatch::resolve_alone;
    use crate::entities::Resolution;
    use crate::source::EntityRecord;

    fn first(entity: &EntityRecord) -> crate::entities::RenderInstruction {
        match resolve_alone(entity) {
            Resolution::Draw(list) => list.into_iter().next().unwrap(),
            other => panic!("expected a draw, got {other:?}"),
        }
    }

    #[test]
    fn test_redcave_lower_half_palette() {
        let upper = EntityRecord::new("Slime", 0, 1000, 0, "REDCAVE");
        let lower = EntityRecord::new("Slime", 0, 1001, 0, "REDCAVE");
        assert_eq!(first(&upper).src, Some(Rect::new(0, 0, 16, 16)));
        assert_eq!(first(&lower).src, Some(Rect::new(32, 0, 16, 16)));

        let frog = EntityRecord::new("Frog", 0, 2000, 0, "REDCAVE");
        assert_eq!(first(&frog).src, Some(Rect::new(0, 32, 16, 16)));
    }

    #[test]
    fn test_silverfish_left_is_mirrored_right() {
        let left = first(&EntityRecord::new("Silverfish", 0, 0, 0, "APARTMENT"));
        let right = first(&EntityRecord::new("Silverfish", 0, 0, 2, "APARTMENT"));
        assert_eq!(left.src, right.src);
        assert_eq!(left.transform, Transform::flipped());
        assert_eq!(right.transform, Transform::IDENTITY);
    }

    #[test]
    fn test_annoyer_offset() {
        let annoyer = first(&EntityRecord::new("Annoyer", 100, 100, 8, "BEDROOM"));
        assert_eq!((annoyer.dst_x, annoyer.dst_y), (97, 98));
        assert_eq!(annoyer.src, Some(Rect::new(32, 16, 16, 16)));
    }

    #[test]
    fn test_wall_boss_ignores_its_position() {
        let Resolution::Draw(parts) = resolve_alone(&EntityRecord::new("WallBoss", 3, 4, 0, "CROWD"))
        else {
            panic!("wall boss not drawn");
        };
        assert_eq!(parts.len(), 4);
        assert_eq!((parts[0].dst_x, parts[0].dst_y), (1440, 960));
        assert_eq!(parts[1].src, Some(Rect::new(16, 0, 32, 32)));
        assert!(parts[3].transform.flip_h);
    }

    #[test]
    fn test_shadow_briar_hidden_in_go() {
        let briar = EntityRecord::new("Shadow_Briar", 0, 0, 0, "GO");
        assert_eq!(resolve_alone(&briar), Resolution::Hidden);
        let up = first(&EntityRecord::new("Shadow_Briar", 0, 0, 1, "HAPPY"));
        assert_eq!(up.src, Some(Rect::new(64, 32, 16, 16)));
    }
}

mod creatures;
mod gadgets;
mod npcs;

use super::{Resolution, RuleContext};

pub type Rule = fn(&mut RuleContext<'_, '_>) -> Resolution;

fn hidden(_ctx: &mut RuleContext<'_, '_>) -> Resolution {
    Resolution::Hidden
}

/// Types missing here fall back to default rendering when a sprite with
/// their name exists
const RULES: &[(&str, Rule)] = &[
    // Gadgets
    ("Switch_Pillar", gadgets::switch_pillar),
    ("Pew_Laser", gadgets::facing_strip),
    ("Steam_Pipe", gadgets::facing_strip),
    ("On_Off_Laser", gadgets::on_off_laser),
    ("Dash_Trap", gadgets::dash_trap),
    ("KeyBlock", gadgets::key_block),
    ("Nonsolid", gadgets::nonsolid),
    ("Jump_Trigger", gadgets::jump_trigger),
    ("Gate", gadgets::gate),
    ("Console", gadgets::console),
    ("Propelled", gadgets::propelled),
    ("Treasure", gadgets::treasure),
    ("Dash_Pad", gadgets::dash_pad),
    ("Spike_Roller", gadgets::spike_roller),
    ("Button", gadgets::button),
    ("Hole", gadgets::floor_hazard),
    ("CrackedTile", gadgets::floor_hazard),
    ("Key", gadgets::key),
    ("Dungeon_Statue", gadgets::dungeon_statue),
    ("Door", gadgets::door),
    ("Solid_Sprite", gadgets::solid_sprite),
    ("Event", gadgets::event),
    ("Fire_Pillar", gadgets::fire_pillar),
    ("Red_Pillar", gadgets::red_pillar),
    // Markers
    ("solid_tile", hidden),
    ("Water_Anim", hidden),
    ("Go_Detector", hidden),
    ("Stop_Marker", hidden),
    // Creatures
    ("Silverfish", creatures::silverfish),
    ("Gasguy", creatures::tall),
    ("Teleguy", creatures::tall),
    ("Sun_Guy", creatures::tall),
    ("Dustmaid", creatures::tall),
    ("Follower_Bro", creatures::tall),
    ("Slasher", creatures::slasher),
    ("Splitboss", creatures::splitboss),
    ("Contort", creatures::contort),
    ("Lion", creatures::large),
    ("Elevator", creatures::large),
    ("Big_Door", creatures::large),
    ("Red_Boss", creatures::large),
    ("Red_Walker", creatures::red_walker),
    ("Shadow_Briar", creatures::shadow_briar),
    ("Chaser", creatures::chaser),
    ("Rat", creatures::rat),
    ("Eye_Boss", creatures::eye_boss),
    ("Sage_Boss", creatures::sage_boss),
    ("Mover", creatures::mover),
    ("Annoyer", creatures::annoyer),
    ("Slime", creatures::slime),
    ("Frog", creatures::frog),
    ("WallBoss", creatures::wall_boss),
    ("Person", creatures::simple),
    ("Pillar_Switch", creatures::simple),
    ("Dog", creatures::simple),
    ("Shieldy", creatures::simple),
    ("Rotator", creatures::simple),
    ("Dust", creatures::simple),
    ("Burst_Plant", creatures::simple),
    ("Four_Shooter", creatures::simple),
    ("Eye_Light", creatures::simple),
    ("Sadbro", creatures::simple),
    ("Suburb_Killer", creatures::simple),
    // Characters
    ("Huge_Fucking_Stag", npcs::stag),
    ("Redsea_NPC", npcs::redsea_npc),
    ("Circus_Folks", npcs::circus_folks),
    ("NPC", npcs::npc),
    ("Trade_NPC", npcs::trade_npc),
    ("Forest_NPC", npcs::forest_npc),
    ("Space_NPC", npcs::space_npc),
    ("Space_Face", npcs::space_face),
    ("Suburb_Walker", npcs::suburb_walker),
    ("Mitra", npcs::mitra),
    ("Sage", npcs::sage),
    ("Happy_NPC", npcs::happy_npc),
    ("Fisherman", npcs::fisherman),
    ("Health_Cicada", npcs::health_cicada),
];

/// Resolver for entity type `name`
pub fn lookup(name: &str) -> Option<Rule> {
    RULES.iter().find(|(n, _)| *n == name).map(|&(_, rule)| rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::entities::dispatch::resolve_alone;
    use crate::source::EntityRecord;
    use std::collections::HashSet;

    #[test]
    fn test_rule_names_are_unique() {
        let mut seen = HashSet::new();
        for (name, _) in RULES {
            assert!(seen.insert(*name), "{name} listed twice");
        }
    }

    #[test]
    fn test_plain_draws_use_configured_sprites() {
        let config = BuildConfig::builtin().unwrap();
        for (name, _) in RULES {
            let entity = EntityRecord::new(*name, 0, 0, 0, "BEDROOM");
            if let Resolution::Draw(list) = resolve_alone(&entity) {
                for instruction in list {
                    assert!(
                        config.sprites.contains_key(&instruction.atlas),
                        "{name} draws from unconfigured {:?}",
                        instruction.atlas
                    );
                }
            }
        }
    }
}

//! Default combat: alternating strikes, terrain-based hit chance.

use warband_core::{CommandError, GameState, Terrain};

use crate::error::ActionError;
use crate::hooks::{Combat, CombatResult, Engagement};
use crate::rng::RandomSource;

/// Hit chance when a hex has no terrain, which only happens off-map.
const DEFAULT_HIT_CHANCE: u32 = 60;

/// Attacker and defender alternate strikes, attacker first, until both
/// are out of strikes or one side dies. Each strike draws one synced
/// value; it hits when the roll is below the target's terrain hit chance.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrikeCombat;

impl Combat for StrikeCombat {
    fn resolve(
        &self,
        game: &GameState,
        engagement: &Engagement,
        rng: &mut dyn RandomSource,
    ) -> Result<CombatResult, ActionError> {
        let attacker = game
            .unit(engagement.attacker)
            .ok_or(CommandError::UnitNotFound(engagement.attacker))?;
        let defender = game
            .unit(engagement.defender)
            .ok_or(CommandError::UnitNotFound(engagement.defender))?;
        let weapon = attacker
            .attacks
            .get(engagement.weapon)
            .ok_or(CommandError::InvalidWeapon {
                index: engagement.weapon as i64,
                count: attacker.attacks.len(),
            })?;
        let counter = match engagement.defender_weapon {
            Some(i) => Some(defender.attacks.get(i).ok_or(CommandError::InvalidWeapon {
                index: i as i64,
                count: defender.attacks.len(),
            })?),
            None => None,
        };

        let chance_vs = |loc| {
            game.map
                .terrain(loc)
                .map_or(DEFAULT_HIT_CHANCE, Terrain::hit_chance)
        };
        let to_hit_defender = chance_vs(defender.location);
        let to_hit_attacker = chance_vs(attacker.location);

        let mut out = CombatResult {
            attacker_hp: attacker.hitpoints,
            defender_hp: defender.hitpoints,
            hits: 0,
            strikes: 0,
        };
        let rounds = weapon.strikes.max(counter.map_or(0, |w| w.strikes));
        for round in 0..rounds {
            if round < weapon.strikes {
                out.strikes += 1;
                if rng.random_below(100)? < to_hit_defender {
                    out.hits += 1;
                    out.defender_hp = out.defender_hp.saturating_sub(weapon.damage);
                    if out.defender_hp == 0 {
                        break;
                    }
                }
            }
            if let Some(w) = counter.filter(|w| round < w.strikes) {
                out.strikes += 1;
                if rng.random_below(100)? < to_hit_attacker {
                    out.hits += 1;
                    out.attacker_hp = out.attacker_hp.saturating_sub(w.damage);
                    if out.attacker_hp == 0 {
                        break;
                    }
                }
            }
        }
        Ok(out)
    }
}

//! Player actions
//!
//! Submission runs in two halves. [`Battle::check`] validates against the
//! current state and changes nothing, so a rejected action never costs a
//! turn. [`Battle::prepare`] then spends resources, rolls, and returns the
//! staged effects with the animation that introduces them.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use super::events::BattleEvent;
use super::pending::{hit_effects, Effect, Target};
use super::{ActionError, Battle};
use crate::collab::Animation;
use crate::combat::{effectiveness, scale_damage, AttackResult, Move};
use crate::data::{ItemDef, SkillDef, SummonDef};
use crate::summons::{Side, SpawnError};

/// One player choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    Attack,
    Skill(String),
    Defend,
    Item(String),
    Flee,
    LimitBreak,
}

impl FromStr for PlayerAction {
    type Err = ActionError;

    /// Parse `attack`, `defend`, `flee`, `limit`, `skill:<id>` or `item:<id>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((kind, id)) = s.split_once(':') {
            let id = id.trim().to_string();
            return match kind.trim().to_lowercase().as_str() {
                "skill" if !id.is_empty() => Ok(PlayerAction::Skill(id)),
                "item" if !id.is_empty() => Ok(PlayerAction::Item(id)),
                _ => Err(ActionError::UnknownAction(s.to_string())),
            };
        }
        match s.to_lowercase().as_str() {
            "attack" => Ok(PlayerAction::Attack),
            "defend" => Ok(PlayerAction::Defend),
            "flee" => Ok(PlayerAction::Flee),
            "limit" | "limit_break" => Ok(PlayerAction::LimitBreak),
            _ => Err(ActionError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerAction::Attack => write!(f, "attack"),
            PlayerAction::Skill(id) => write!(f, "skill:{}", id),
            PlayerAction::Defend => write!(f, "defend"),
            PlayerAction::Item(id) => write!(f, "item:{}", id),
            PlayerAction::Flee => write!(f, "flee"),
            PlayerAction::LimitBreak => write!(f, "limit"),
        }
    }
}

/// A validated action with the definitions it needs
#[derive(Debug, Clone)]
pub(super) enum Checked {
    Attack,
    Skill {
        skill: SkillDef,
        summon: Option<SummonDef>,
    },
    Defend,
    Item(ItemDef),
    Flee,
    LimitBreak,
}

/// A resolved action waiting for its animation
#[derive(Debug)]
pub(super) struct Prepared {
    pub effects: Vec<Effect>,
    pub animation: Animation,
    pub delay: u64,
}

pub(super) fn roll_animation(attacker: &str, result: &AttackResult) -> Animation {
    Animation::AttackRoll {
        attacker: attacker.to_string(),
        roll: result.roll,
        total: result.total,
        target_ac: result.target_ac,
        hit: result.hit,
    }
}

pub(super) fn attack_event(attacker: &str, defender: &str, mv: &Move, result: &AttackResult) -> BattleEvent {
    BattleEvent::Attack {
        attacker: attacker.to_string(),
        defender: defender.to_string(),
        move_name: mv.name.clone(),
        result: result.clone(),
    }
}

impl Battle {
    pub(super) fn check(&self, action: &PlayerAction) -> Result<Checked, ActionError> {
        let session = self.session.as_ref().ok_or(ActionError::NoSession)?;
        let rules = &self.config.rules;

        match action {
            PlayerAction::Attack => Ok(Checked::Attack),
            PlayerAction::Defend => Ok(Checked::Defend),
            PlayerAction::Skill(id) => {
                let skill = self
                    .find_skill(id)
                    .ok_or_else(|| ActionError::SkillNotFound(id.clone()))?;
                if skill.mana_cost > session.player.mana {
                    return Err(ActionError::NotEnoughMana {
                        need: skill.mana_cost,
                        have: session.player.mana,
                    });
                }
                let summon = match &skill.summon {
                    None => None,
                    Some(summon_id) => {
                        let unknown = || SpawnError::UnknownSummon(summon_id.clone());
                        if !self.config.features.summons {
                            return Err(unknown().into());
                        }
                        let def = self.find_summon(summon_id).ok_or_else(unknown)?;
                        if session.summons.count(Side::Player) >= rules.max_summons_per_side {
                            return Err(SpawnError::CapReached {
                                side: Side::Player,
                                cap: rules.max_summons_per_side,
                            }
                            .into());
                        }
                        Some(def)
                    }
                };
                Ok(Checked::Skill { skill, summon })
            }
            PlayerAction::Item(id) => {
                let not_found = || ActionError::ItemNotFound(id.clone());
                if !self.caps.inventory.has(id) {
                    return Err(not_found());
                }
                match self.caps.tables.item(id) {
                    Ok(Some(item)) => Ok(Checked::Item(item)),
                    Ok(None) => Err(not_found()),
                    Err(e) => {
                        debug!("Item table lookup for {} failed: {}", id, e);
                        Err(not_found())
                    }
                }
            }
            PlayerAction::Flee => {
                if session.config.scenes.flee.is_none() {
                    return Err(ActionError::CannotFlee);
                }
                Ok(Checked::Flee)
            }
            PlayerAction::LimitBreak => {
                if session.player.limit_charge < rules.limit_max {
                    return Err(ActionError::LimitNotReady {
                        charge: session.player.limit_charge,
                        max: rules.limit_max,
                    });
                }
                Ok(Checked::LimitBreak)
            }
        }
    }

    pub(super) fn prepare(&mut self, checked: Checked) -> Result<Prepared, ActionError> {
        let rules = &self.config.rules;
        let timing = &self.config.timing;
        let session = self.session.as_mut().ok_or(ActionError::NoSession)?;
        let player = session.player.name.clone();
        let enemy = session.enemy.name.clone();
        let mut effects = Vec::new();

        let (animation, delay) = match checked {
            Checked::Attack => {
                let mv = Move::basic(&session.player);
                let result = self.style.resolve(
                    &mut self.dice,
                    &session.player,
                    &session.enemy,
                    &mv,
                    rules.defend_bonus,
                    None,
                );
                session.push(attack_event(&player, &enemy, &mv, &result));
                effects.extend(hit_effects(Target::Enemy, Target::Player, &result));
                (roll_animation(&player, &result), timing.roll_beat_ms)
            }
            Checked::Skill { skill, summon } => {
                session.player.spend_mana(skill.mana_cost);
                session.push(BattleEvent::SkillUsed {
                    skill: skill.id.clone(),
                    mana_cost: skill.mana_cost,
                });
                info!("{} uses {}", player, skill.name);

                let mut animation = Animation::Text {
                    line: format!("{} uses {}!", player, skill.name),
                };
                let mut delay = timing.text_beat_ms;

                if let Some(def) = summon {
                    match session.summons.spawn(&def, &player, Side::Player) {
                        Ok(id) => session.push(BattleEvent::SummonSpawned {
                            id,
                            name: def.name.clone(),
                            side: Side::Player,
                        }),
                        Err(e) => session.push(BattleEvent::SummonFailed {
                            summoner: player.clone(),
                            reason: e.to_string(),
                        }),
                    }
                } else if let Some(damage) = skill.damage {
                    let mv = Move {
                        name: skill.name.clone(),
                        damage,
                        element: skill.element.unwrap_or(session.player.element),
                        status: skill.status.clone(),
                    };
                    for _ in 0..skill.hits.max(1) {
                        let result = self.style.resolve(
                            &mut self.dice,
                            &session.player,
                            &session.enemy,
                            &mv,
                            rules.defend_bonus,
                            None,
                        );
                        session.push(attack_event(&player, &enemy, &mv, &result));
                        effects.extend(hit_effects(Target::Enemy, Target::Player, &result));
                        animation = roll_animation(&player, &result);
                    }
                    delay = timing.roll_beat_ms;
                }

                if let Some(heal) = skill.heal.filter(|h| *h > 0) {
                    effects.push(Effect::Heal {
                        target: Target::Player,
                        amount: heal,
                    });
                    if skill.damage.is_none() {
                        animation = Animation::HealRoll {
                            target: player.clone(),
                            amount: heal,
                        };
                        delay = timing.roll_beat_ms;
                    }
                }
                if let Some(status) = &skill.self_status {
                    effects.push(Effect::ApplyStatus {
                        target: Target::Player,
                        effect: status.to_effect(),
                    });
                }
                (animation, delay)
            }
            Checked::Defend => {
                session.player.defending_turns_remaining = rules.defend_turns;
                session.push(BattleEvent::Defending {
                    turns: rules.defend_turns,
                });
                let line = format!("{} takes a defensive stance!", player);
                (Animation::Text { line }, timing.text_beat_ms)
            }
            Checked::Item(item) => {
                if !self.caps.inventory.consume(&item.id) {
                    return Err(ActionError::ItemNotFound(item.id));
                }
                session.push(BattleEvent::ItemUsed {
                    item: item.id.clone(),
                });
                if item.heal > 0 {
                    effects.push(Effect::Heal {
                        target: Target::Player,
                        amount: item.heal,
                    });
                }
                if item.mana > 0 {
                    effects.push(Effect::RestoreMana {
                        target: Target::Player,
                        amount: item.mana,
                    });
                }
                for status in &item.cures {
                    effects.push(Effect::Cure {
                        target: Target::Player,
                        status: *status,
                    });
                }
                if let Some(status) = &item.status {
                    effects.push(Effect::ApplyStatus {
                        target: Target::Player,
                        effect: self.caps.tables.tune(status).to_effect(),
                    });
                }
                if item.heal > 0 {
                    let animation = Animation::HealRoll {
                        target: player,
                        amount: item.heal,
                    };
                    (animation, timing.roll_beat_ms)
                } else {
                    let line = format!("{} uses {}!", player, item.name);
                    (Animation::Text { line }, timing.text_beat_ms)
                }
            }
            Checked::Flee => {
                let roll = self.dice.roll_d20();
                let success = roll.value >= rules.flee_threshold;
                session.fled = success;
                session.push(BattleEvent::FleeAttempt { roll, success });
                info!("{} tries to flee: rolled {} ({})", player, roll.value, success);
                let animation = Animation::AttackRoll {
                    attacker: player,
                    roll,
                    total: roll.value as i32,
                    target_ac: rules.flee_threshold as i32,
                    hit: success,
                };
                (animation, timing.roll_beat_ms)
            }
            Checked::LimitBreak => {
                session.player.limit_charge = 0;
                let base = self.dice.roll_damage(&rules.limit_break_dice);
                let effect = effectiveness(session.player.element, session.enemy.element);
                let damage = scale_damage(base, effect, false);
                if damage > 0 {
                    effects.push(Effect::InterceptCheck {
                        target: Target::Enemy,
                        source: Target::Player,
                        amount: damage,
                    });
                }
                session.push(BattleEvent::LimitBreak { damage });
                info!("{} unleashes a limit break for {}", player, damage);
                let line = format!("{} unleashes a limit break!", player);
                (Animation::Text { line }, timing.roll_beat_ms)
            }
        };

        Ok(Prepared {
            effects,
            animation,
            delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!("attack".parse::<PlayerAction>(), Ok(PlayerAction::Attack));
        assert_eq!(" Defend ".parse::<PlayerAction>(), Ok(PlayerAction::Defend));
        assert_eq!("limit".parse::<PlayerAction>(), Ok(PlayerAction::LimitBreak));
        assert_eq!(
            "skill:fireball".parse::<PlayerAction>(),
            Ok(PlayerAction::Skill("fireball".to_string()))
        );
        assert_eq!(
            "item: potion".parse::<PlayerAction>(),
            Ok(PlayerAction::Item("potion".to_string()))
        );
        assert!(matches!(
            "dance".parse::<PlayerAction>(),
            Err(ActionError::UnknownAction(_))
        ));
        assert!("skill:".parse::<PlayerAction>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for action in [
            PlayerAction::Attack,
            PlayerAction::Skill("fireball".to_string()),
            PlayerAction::Item("potion".to_string()),
            PlayerAction::LimitBreak,
        ] {
            assert_eq!(action.to_string().parse::<PlayerAction>(), Ok(action));
        }
    }
}

//! Pending-effect staging
//!
//! Resolution produces [`Effect`] lists without touching any combatant.
//! The orchestrator applies them through [`BattleSession::apply_effects`]
//! once the presentation beat allows. Clamping, interception, stagger,
//! limit charge, intent breaks and the death check all live here.

use tracing::{debug, info};

use super::events::{BattleEvent, Outcome};
use super::session::BattleSession;
use crate::combat::{Applied, AttackResult, Periodic, StatusEffect, StatusType, TickReport};
use crate::config::RulesConfig;
use crate::summons::{Side, SummonId};

/// Who an effect lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Player,
    Enemy,
    Summon(SummonId),
}

/// A staged change to the battle
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Damage that cannot be intercepted (status ticks, reflection)
    Damage { target: Target, amount: i32 },
    /// A landed hit. Lethal hits on the enemy may be taken by a summon.
    InterceptCheck {
        target: Target,
        source: Target,
        amount: i32,
    },
    Heal { target: Target, amount: i32 },
    RestoreMana { target: Target, amount: i32 },
    ApplyStatus { target: Target, effect: StatusEffect },
    Cure { target: Target, status: StatusType },
}

/// Effects of a resolved attack from `source` on `target`
pub fn hit_effects(target: Target, source: Target, result: &AttackResult) -> Vec<Effect> {
    let mut effects = Vec::new();
    if result.damage > 0 {
        effects.push(Effect::InterceptCheck {
            target,
            source,
            amount: result.damage,
        });
    }
    for effect in &result.inflicted {
        effects.push(Effect::ApplyStatus {
            target,
            effect: effect.clone(),
        });
    }
    if result.reflected > 0 {
        effects.push(Effect::Damage {
            target: source,
            amount: result.reflected,
        });
    }
    effects
}

/// Effects of one status tick on `target`
pub fn periodic_effects(target: Target, report: &TickReport) -> Vec<Effect> {
    report
        .periodic
        .iter()
        .map(|p| match *p {
            Periodic::Damage { amount, .. } => Effect::Damage { target, amount },
            Periodic::Heal { amount, .. } => Effect::Heal { target, amount },
            Periodic::Mana { amount, .. } => Effect::RestoreMana { target, amount },
        })
        .collect()
}

impl BattleSession {
    /// Apply staged effects in order. Stops at the first effect that ends
    /// the battle; does nothing once it has ended.
    pub fn apply_effects(&mut self, effects: Vec<Effect>, rules: &RulesConfig) -> Option<Outcome> {
        for effect in effects {
            if self.outcome.is_some() {
                debug!("Battle over, dropping {:?}", effect);
                break;
            }
            match effect {
                Effect::Damage { target, amount } => self.deal(target, None, amount, rules),
                Effect::InterceptCheck {
                    target,
                    source,
                    amount,
                } => {
                    let target = self.intercept(target, amount);
                    self.deal(target, Some(source), amount, rules);
                }
                Effect::Heal { target, amount } => {
                    if let Some(c) = self.combatant_mut(target) {
                        let healed = c.heal(amount);
                        let event = BattleEvent::Healed {
                            target: c.name.clone(),
                            amount: healed,
                            hp: c.hp,
                        };
                        self.push(event);
                    }
                }
                Effect::RestoreMana { target, amount } => {
                    if let Some(c) = self.combatant_mut(target) {
                        let restored = c.restore_mana(amount);
                        let event = BattleEvent::ManaRestored {
                            target: c.name.clone(),
                            amount: restored,
                            mana: c.mana,
                        };
                        self.push(event);
                    }
                }
                Effect::ApplyStatus { target, effect } => self.apply_status(target, effect, rules),
                Effect::Cure { target, status } => {
                    if let Some(c) = self.combatant_mut(target) {
                        if c.statuses.remove(status) {
                            let event = BattleEvent::Cured {
                                target: c.name.clone(),
                                status,
                            };
                            self.push(event);
                        }
                    }
                }
            }
            self.check_outcome();
        }
        self.outcome
    }

    /// Redirect a lethal hit on the enemy to one of its summons
    fn intercept(&mut self, target: Target, amount: i32) -> Target {
        if target != Target::Enemy || amount < self.enemy.hp {
            return target;
        }
        match self.summons.interceptor(Side::Enemy) {
            Some(id) => {
                let summon = self.name_of(Target::Summon(id));
                info!("{} intercepts {} damage", summon, amount);
                self.push(BattleEvent::Intercepted { summon, amount });
                Target::Summon(id)
            }
            None => target,
        }
    }

    fn deal(&mut self, target: Target, source: Option<Target>, amount: i32, rules: &RulesConfig) {
        let Some(c) = self.combatant_mut(target) else {
            return;
        };
        let lost = c.take_damage(amount);
        let staggered = c.add_stagger(lost);
        let (name, hp) = (c.name.clone(), c.hp);
        self.push(BattleEvent::Damaged {
            target: name.clone(),
            amount: lost,
            hp,
        });

        // Limit charge comes from damage taken and damage dealt
        match (target, source) {
            (Target::Player, _) | (Target::Enemy, Some(Target::Player)) => {
                self.player.add_limit_charge(lost, rules.limit_max);
            }
            _ => {}
        }

        if let Target::Summon(id) = target {
            if hp <= 0 {
                if let Some(summon) = self.summons.dismiss(id) {
                    debug!("Summon {} ({}) defeated", summon.name(), id);
                    self.push(BattleEvent::SummonDefeated { id, name });
                }
                return;
            }
        }

        if staggered && hp > 0 {
            debug!("{} staggered", name);
            self.push(BattleEvent::Staggered { target: name });
            let stun = StatusEffect::new(StatusType::Stun, rules.stagger_turns, 0);
            self.apply_status(target, stun, rules);
        }
    }

    fn apply_status(&mut self, target: Target, effect: StatusEffect, rules: &RulesConfig) {
        let status = effect.status;
        let Some(c) = self.combatant_mut(target) else {
            return;
        };
        if c.statuses.apply(effect, rules.status_stack_cap) == Applied::Ignored {
            return;
        }
        let Some(active) = c.statuses.get(status) else {
            return;
        };
        let event = BattleEvent::StatusApplied {
            target: c.name.clone(),
            status,
            stacks: active.stacks,
            remaining: active.remaining,
        };
        self.push(event);

        if target == Target::Enemy {
            let intents = &self.config.enemy.intents;
            if let Some(broken) = self.intents.check_break(intents, status, self.turn) {
                let line = intents
                    .get(broken.index)
                    .and_then(|def| def.dialogue.broken.clone());
                info!("Intent {} broken by {}", broken.intent_id, status);
                self.push(BattleEvent::IntentBroken {
                    intent: broken.intent_id,
                    status,
                    line,
                });
            }
        }
    }

    fn check_outcome(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        if self.player.is_defeated() {
            self.outcome = Some(Outcome::Defeat);
        } else if self.enemy.is_defeated() {
            self.outcome = Some(Outcome::Victory);
        }
    }
}

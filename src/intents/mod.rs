//! Telegraphed enemy actions
//!
//! An intent is announced one or more enemy turns before it executes. The
//! announcement is the enemy's whole action for that cycle. Each later
//! enemy turn counts it down; at zero it replaces the normal enemy turn and
//! always hits. A status matching the intent's break condition cancels it
//! while pending.
//!
//! Every announced intent ends in exactly one of `executed` or `broken`, and
//! both record its cooldown.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::{
    effectiveness, scale_damage, Combatant, DamageDice, Dice, ElementType, StatusEffect,
    StatusOnHit, StatusType,
};
use crate::data::SkillDef;

/// What an intent does when it goes off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Attack,
    Heal,
    Buff,
}

/// When an intent may be proposed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentTrigger {
    /// Percent chance per eligible enemy turn
    #[serde(default = "always")]
    pub chance: u32,
    /// Only eligible while enemy HP is below this percent of max
    #[serde(default)]
    pub below_hp_percent: Option<u32>,
}

fn always() -> u32 {
    100
}

impl Default for IntentTrigger {
    fn default() -> Self {
        Self {
            chance: 100,
            below_hp_percent: None,
        }
    }
}

/// Lines shown at each stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDialogue {
    #[serde(default)]
    pub announce: Option<String>,
    #[serde(default)]
    pub execute: Option<String>,
    #[serde(default)]
    pub broken: Option<String>,
}

/// A configured enemy intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDef {
    pub id: String,
    pub kind: IntentKind,
    /// Bound skill id in the data tables
    #[serde(default)]
    pub skill: Option<String>,
    /// Inline damage, used when the skill is missing or tables are down
    #[serde(default)]
    pub damage: Option<DamageDice>,
    #[serde(default)]
    pub element: Option<ElementType>,
    #[serde(default = "one")]
    pub hits: u32,
    #[serde(default)]
    pub heal: i32,
    /// Attack: inflicted on the player per hit. Buff: applied to the enemy.
    #[serde(default)]
    pub status: Option<StatusOnHit>,
    #[serde(default = "one")]
    pub prep_turns: u32,
    #[serde(default = "yes")]
    pub telegraph: bool,
    #[serde(default)]
    pub break_condition: Option<StatusType>,
    #[serde(default)]
    pub trigger: IntentTrigger,
    /// Turns after use or break before it may be proposed again
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub dialogue: IntentDialogue,
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

/// An announced intent waiting to go off
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingIntent {
    pub intent_id: String,
    /// Index into the enemy's intent list
    pub index: usize,
    /// Enemy turns left before it executes
    pub remaining: u32,
    pub announced_turn: u32,
}

/// Result of counting a pending intent down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentTick {
    /// Nothing pending
    Idle,
    /// Still counting down
    Charging { remaining: u32 },
    /// Reached zero; execute this turn
    Ready { index: usize },
}

/// Per-battle intent bookkeeping
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntentTracker {
    active: Option<PendingIntent>,
    /// Intent id -> turn it was last executed or broken
    last_used: HashMap<String, u32>,
}

impl IntentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingIntent> {
        self.active.as_ref()
    }

    /// Whether `def` is still cooling down at `turn`
    pub fn on_cooldown(&self, def: &IntentDef, turn: u32) -> bool {
        self.last_used
            .get(&def.id)
            .is_some_and(|used| turn.saturating_sub(*used) < def.cooldown)
    }

    /// Propose and announce an intent. Returns the index of the announced
    /// intent, or `None` if one is already pending or none triggered.
    pub fn generate(
        &mut self,
        defs: &[IntentDef],
        enemy: &Combatant,
        dice: &mut Dice,
        turn: u32,
    ) -> Option<usize> {
        if self.active.is_some() {
            return None;
        }

        let hp_percent = i64::from(enemy.hp.max(0)) * 100 / i64::from(enemy.max_hp.max(1));
        for (index, def) in defs.iter().enumerate() {
            if self.on_cooldown(def, turn) {
                continue;
            }
            if def
                .trigger
                .below_hp_percent
                .is_some_and(|limit| hp_percent >= i64::from(limit))
            {
                continue;
            }
            if !dice.chance(def.trigger.chance) {
                continue;
            }

            self.active = Some(PendingIntent {
                intent_id: def.id.clone(),
                index,
                remaining: def.prep_turns.max(1),
                announced_turn: turn,
            });
            debug!("Intent {} announced on turn {}", def.id, turn);
            return Some(index);
        }
        None
    }

    /// Count the pending intent down by one enemy turn
    pub fn tick(&mut self) -> IntentTick {
        match self.active.as_mut() {
            None => IntentTick::Idle,
            Some(pending) => {
                pending.remaining = pending.remaining.saturating_sub(1);
                if pending.remaining == 0 {
                    IntentTick::Ready {
                        index: pending.index,
                    }
                } else {
                    IntentTick::Charging {
                        remaining: pending.remaining,
                    }
                }
            }
        }
    }

    /// Clear the pending intent after it executed, recording its cooldown
    pub fn complete(&mut self, turn: u32) -> Option<PendingIntent> {
        let pending = self.active.take()?;
        self.last_used.insert(pending.intent_id.clone(), turn);
        Some(pending)
    }

    /// Cancel the pending intent if `status` is its break condition
    pub fn check_break(
        &mut self,
        defs: &[IntentDef],
        status: StatusType,
        turn: u32,
    ) -> Option<PendingIntent> {
        let pending = self.active.as_ref()?;
        let def = defs.get(pending.index)?;
        if def.break_condition != Some(status) {
            return None;
        }
        let broken = self.active.take()?;
        self.last_used.insert(broken.intent_id.clone(), turn);
        debug!("Intent {} broken by {}", broken.intent_id, status);
        Some(broken)
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.active = None;
        self.last_used.clear();
    }
}

/// Computed effect of an executed intent, not yet applied
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntentOutcome {
    /// Damage of each hit against the player, already halved if defending
    pub hits: Vec<i32>,
    pub heal: i32,
    pub on_player: Vec<StatusEffect>,
    pub on_enemy: Vec<StatusEffect>,
    /// Damage was halved by the defending stance
    pub halved: bool,
}

impl IntentOutcome {
    pub fn total_damage(&self) -> i32 {
        self.hits.iter().sum()
    }
}

/// Resolve an intent. Attacks always hit; each hit is rolled on its own.
/// `bound` is the intent's skill from the data tables, if it was found.
pub fn resolve_intent(
    def: &IntentDef,
    bound: Option<&SkillDef>,
    enemy: &Combatant,
    player: &Combatant,
    dice: &mut Dice,
) -> IntentOutcome {
    let mut outcome = IntentOutcome::default();

    match def.kind {
        IntentKind::Attack => {
            let damage = bound
                .and_then(|s| s.damage)
                .or(def.damage)
                .unwrap_or(enemy.damage);
            let element = bound
                .and_then(|s| s.element)
                .or(def.element)
                .unwrap_or(enemy.element);
            let hits = bound.map(|s| s.hits).unwrap_or(def.hits).max(1);
            let status = def.status.as_ref().or(bound.and_then(|s| s.status.as_ref()));
            let effect = effectiveness(element, player.element);
            outcome.halved = player.is_defending();

            for _ in 0..hits {
                let rolled = scale_damage(dice.roll_damage(&damage), effect, false);
                let landed = if outcome.halved && rolled > 0 {
                    (rolled / 2).max(1)
                } else {
                    rolled
                };
                outcome.hits.push(landed);
                if let Some(on_hit) = status {
                    if dice.chance(on_hit.chance) {
                        outcome.on_player.push(on_hit.to_effect());
                    }
                }
            }
        }
        IntentKind::Heal => {
            outcome.heal = bound.and_then(|s| s.heal).unwrap_or(def.heal).max(0);
        }
        IntentKind::Buff => {
            let status = def
                .status
                .as_ref()
                .or(bound.and_then(|s| s.self_status.as_ref()));
            if let Some(status) = status {
                outcome.on_enemy.push(status.to_effect());
            }
        }
    }

    outcome
}

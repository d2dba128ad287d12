//! Combat system module
//!
//! Implements d20-style combat resolution with:
//! - Dice rolling (e.g., "2d6+3") with a forced-roll override
//! - Attack resolution with to-hit, criticals and fumbles
//! - Elemental type multipliers
//! - Status effects (burn, stun, confusion, ...)
//! - Per-combatant state (HP, mana, stagger, limit charge)
//! - Pluggable battle styles

mod damage;
mod dice;
mod effects;
mod state;
mod style;

pub use damage::{effectiveness, scale_damage, Effectiveness, ElementType, TYPE_CHART};
pub use dice::{parse_dice, D20, DamageDice, Dice, DiceError, DiceRoll};
pub use effects::{
    tick_statuses, Applied, Periodic, StatusEffect, StatusOnHit, StatusSet, StatusType,
    TickReport,
};
pub use state::{resolve_attack, AttackOptions, AttackResult, Combatant, HitRule, Move, Role};
pub use style::{BattleStyle, ClassicStyle, ElementalStyle, ReactiveStyle, StyleKind};

//! Summoned allies and minions
//!
//! Summons are temporary combatants owned by one side. Each side has a cap
//! on how many may be active. A summon leaves when its duration runs out,
//! when it is dismissed, or when its HP reaches zero. Enemy-side summons can
//! step in front of a hit that would otherwise kill their owner.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::combat::{Combatant, DamageDice, Move, Role};
use crate::data::{SummonBehavior, SummonDef};

/// Unique id of one summoned instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SummonId(Uuid);

impl SummonId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SummonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side a summon fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opposing(&self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player => write!(f, "player"),
            Side::Enemy => write!(f, "enemy"),
        }
    }
}

/// Why a summon could not be created
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("{side} side already has {cap} summons")]
    CapReached { side: Side, cap: usize },

    #[error("summon not found: {0}")]
    UnknownSummon(String),
}

/// What a summon does on its turn
#[derive(Debug, Clone, PartialEq)]
pub enum SummonAction {
    Attack(Move),
    HealOwner(i32),
    Hold,
}

/// One active summon
#[derive(Debug, Clone, Serialize)]
pub struct Summon {
    pub id: SummonId,
    pub def_id: String,
    pub side: Side,
    pub owner: String,
    pub combatant: Combatant,
    pub behavior: SummonBehavior,
    pub heal: i32,
    /// Turns left; `None` stays until dismissed or killed
    pub remaining: Option<u32>,
}

impl Summon {
    fn from_def(def: &SummonDef, owner: &str, side: Side) -> Self {
        let combatant = Combatant::new(def.name.clone(), Role::Summon, def.hp)
            .with_armor_class(def.armor_class)
            .with_attack_bonus(def.attack_bonus)
            .with_damage(def.damage.unwrap_or(DamageDice::Fixed(1)))
            .with_element(def.element);
        Self {
            id: SummonId::new(),
            def_id: def.id.clone(),
            side,
            owner: owner.to_string(),
            combatant,
            behavior: def.behavior,
            heal: def.heal,
            remaining: def.duration,
        }
    }

    pub fn name(&self) -> &str {
        &self.combatant.name
    }

    pub fn is_dead(&self) -> bool {
        self.combatant.is_defeated()
    }

    /// This turn's action
    pub fn action(&self) -> SummonAction {
        match self.behavior {
            SummonBehavior::Attack => SummonAction::Attack(Move::basic(&self.combatant)),
            SummonBehavior::Heal if self.heal > 0 => SummonAction::HealOwner(self.heal),
            SummonBehavior::Heal | SummonBehavior::Intercept => SummonAction::Hold,
        }
    }

    /// Count down one turn. Returns true when the duration has run out.
    pub fn tick(&mut self) -> bool {
        match self.remaining.as_mut() {
            Some(turns) => {
                *turns = turns.saturating_sub(1);
                *turns == 0
            }
            None => false,
        }
    }
}

/// All summons in a battle, both sides
#[derive(Debug, Clone, Serialize)]
pub struct SummonRoster {
    summons: Vec<Summon>,
    cap_per_side: usize,
}

impl SummonRoster {
    /// Create an empty roster
    pub fn new(cap_per_side: usize) -> Self {
        Self {
            summons: Vec::new(),
            cap_per_side,
        }
    }

    /// Create a summon for `side`. Nothing changes if the side is full.
    pub fn spawn(&mut self, def: &SummonDef, owner: &str, side: Side) -> Result<SummonId, SpawnError> {
        if self.count(side) >= self.cap_per_side {
            return Err(SpawnError::CapReached {
                side,
                cap: self.cap_per_side,
            });
        }
        let summon = Summon::from_def(def, owner, side);
        let id = summon.id;
        debug!("Spawned {} ({}) for {} side", def.name, id, side);
        self.summons.push(summon);
        Ok(id)
    }

    pub fn count(&self, side: Side) -> usize {
        self.summons.iter().filter(|s| s.side == side).count()
    }

    pub fn is_empty(&self) -> bool {
        self.summons.is_empty()
    }

    pub fn get(&self, id: SummonId) -> Option<&Summon> {
        self.summons.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SummonId) -> Option<&mut Summon> {
        self.summons.iter_mut().find(|s| s.id == id)
    }

    /// Ids on one side, oldest first
    pub fn ids(&self, side: Side) -> Vec<SummonId> {
        self.summons
            .iter()
            .filter(|s| s.side == side)
            .map(|s| s.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Summon> {
        self.summons.iter()
    }

    /// Remove a summon by id
    pub fn dismiss(&mut self, id: SummonId) -> Option<Summon> {
        let index = self.summons.iter().position(|s| s.id == id)?;
        Some(self.summons.remove(index))
    }

    /// The summon that would absorb a lethal hit aimed at `side`'s main
    /// combatant: intercept-behaviour summons first, then the oldest
    pub fn interceptor(&self, side: Side) -> Option<SummonId> {
        let living = || self.summons.iter().filter(move |s| s.side == side && !s.is_dead());
        living()
            .find(|s| s.behavior == SummonBehavior::Intercept)
            .or_else(|| living().next())
            .map(|s| s.id)
    }

    pub fn clear(&mut self) {
        self.summons.clear();
    }
}

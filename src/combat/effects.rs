//! Status effects system
//!
//! Manages temporary effects on combatants:
//! - Damage over time (burn, poison) and healing over time (regen)
//! - Mana regeneration (focus)
//! - Action prevention (stun, freeze) and self-damaging confusion
//!
//! Durations are counted in full turn cycles. A status is removed on the
//! tick that brings its duration to zero, never earlier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dice::{DamageDice, Dice, DiceRoll};
use super::state::Combatant;

/// Types of status effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusType {
    /// Fire damage each tick
    Burn,
    /// Poison damage each tick
    Poison,
    /// Heals each tick
    Regen,
    /// Restores mana each tick
    Focus,
    /// Cannot act
    Stun,
    /// Cannot act
    Freeze,
    /// Hurts itself and cannot act
    Confusion,
}

impl StatusType {
    /// Whether this status prevents its owner from acting
    pub fn prevents_action(&self) -> bool {
        matches!(
            self,
            StatusType::Stun | StatusType::Freeze | StatusType::Confusion
        )
    }

    /// Per-tick magnitude used when neither the data tables nor the move
    /// specify one
    pub fn default_magnitude(&self) -> i32 {
        match self {
            StatusType::Burn => 3,
            StatusType::Poison => 2,
            StatusType::Regen => 3,
            StatusType::Focus => 2,
            StatusType::Stun | StatusType::Freeze | StatusType::Confusion => 0,
        }
    }
}

impl FromStr for StatusType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "burn" | "burning" => Ok(StatusType::Burn),
            "poison" | "poisoned" => Ok(StatusType::Poison),
            "regen" | "regenerating" => Ok(StatusType::Regen),
            "focus" | "mana_regen" => Ok(StatusType::Focus),
            "stun" | "stunned" => Ok(StatusType::Stun),
            "freeze" | "frozen" => Ok(StatusType::Freeze),
            "confusion" | "confused" => Ok(StatusType::Confusion),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusType::Burn => "burn",
            StatusType::Poison => "poison",
            StatusType::Regen => "regen",
            StatusType::Focus => "focus",
            StatusType::Stun => "stun",
            StatusType::Freeze => "freeze",
            StatusType::Confusion => "confusion",
        };
        write!(f, "{}", s)
    }
}

/// A status a move inflicts when it lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusOnHit {
    pub status: StatusType,
    pub duration: u32,
    /// Percent chance to apply (default 100)
    #[serde(default = "default_chance")]
    pub chance: u32,
    /// Per-tick magnitude override
    #[serde(default)]
    pub magnitude: Option<i32>,
}

fn default_chance() -> u32 {
    100
}

impl StatusOnHit {
    pub fn new(status: StatusType, duration: u32) -> Self {
        Self {
            status,
            duration,
            chance: 100,
            magnitude: None,
        }
    }

    /// Build the status instance this inflicts
    pub fn to_effect(&self) -> StatusEffect {
        StatusEffect::new(
            self.status,
            self.duration,
            self.magnitude.unwrap_or_else(|| self.status.default_magnitude()),
        )
    }
}

/// A status effect instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Type of effect
    pub status: StatusType,
    /// Remaining duration in turn cycles
    pub remaining: u32,
    /// Stack count (at least 1)
    pub stacks: u32,
    /// Per-tick magnitude for a single stack
    pub magnitude: i32,
}

impl StatusEffect {
    /// Create a new single-stack status effect
    pub fn new(status: StatusType, duration: u32, magnitude: i32) -> Self {
        Self {
            status,
            remaining: duration,
            stacks: 1,
            magnitude,
        }
    }

    /// Per-tick amount across all stacks
    pub fn amount(&self) -> i32 {
        self.magnitude * self.stacks as i32
    }

    /// Check if effect has expired
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}

/// How an application changed the status set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A new instance was added
    New,
    /// An existing instance was restacked
    Restacked { stacks: u32, remaining: u32 },
    /// Zero-duration applications are ignored
    Ignored,
}

/// Periodic outcome of a single status during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Periodic {
    Damage { status: StatusType, amount: i32 },
    Heal { status: StatusType, amount: i32 },
    Mana { status: StatusType, amount: i32 },
}

/// What one tick did to a combatant's statuses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// False if an action-preventing status was active during the tick
    pub can_act: bool,
    /// Periodic effects to apply (not yet applied)
    pub periodic: Vec<Periodic>,
    /// Statuses removed because their duration reached zero
    pub expired: Vec<StatusType>,
}

/// The active statuses on a single combatant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSet {
    effects: Vec<StatusEffect>,
}

impl StatusSet {
    /// Create new empty status set
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status. An existing instance of the same type is restacked:
    /// the longer remaining duration wins, stacks grow up to `stack_cap`,
    /// and the larger magnitude is kept.
    pub fn apply(&mut self, effect: StatusEffect, stack_cap: u32) -> Applied {
        if effect.remaining == 0 {
            return Applied::Ignored;
        }

        if let Some(existing) = self.effects.iter_mut().find(|e| e.status == effect.status) {
            existing.remaining = existing.remaining.max(effect.remaining);
            existing.stacks = (existing.stacks + 1).min(stack_cap.max(1));
            existing.magnitude = existing.magnitude.max(effect.magnitude);
            Applied::Restacked {
                stacks: existing.stacks,
                remaining: existing.remaining,
            }
        } else {
            self.effects.push(effect);
            Applied::New
        }
    }

    /// Remove a status by type, returning whether it was present
    pub fn remove(&mut self, status: StatusType) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.status != status);
        self.effects.len() != before
    }

    /// Check if a specific status is active
    pub fn has(&self, status: StatusType) -> bool {
        self.effects.iter().any(|e| e.status == status)
    }

    /// Get a status if present
    pub fn get(&self, status: StatusType) -> Option<&StatusEffect> {
        self.effects.iter().find(|e| e.status == status)
    }

    /// Whether any active status prevents acting
    pub fn prevents_action(&self) -> bool {
        self.effects.iter().any(|e| e.status.prevents_action())
    }

    /// All active statuses, in application order
    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Tick every active status once.
    ///
    /// Periodic amounts are reported, not applied. `confusion_die` is the
    /// die size of confusion's self-damage.
    pub fn tick(&mut self, dice: &mut Dice, confusion_die: u32) -> TickReport {
        let mut report = TickReport {
            can_act: !self.prevents_action(),
            ..TickReport::default()
        };

        for effect in &mut self.effects {
            let periodic = match effect.status {
                StatusType::Burn | StatusType::Poison => Some(Periodic::Damage {
                    status: effect.status,
                    amount: effect.amount(),
                }),
                StatusType::Regen => Some(Periodic::Heal {
                    status: effect.status,
                    amount: effect.amount(),
                }),
                StatusType::Focus => Some(Periodic::Mana {
                    status: effect.status,
                    amount: effect.amount(),
                }),
                StatusType::Confusion => {
                    let die = DamageDice::Roll(DiceRoll::new(1, confusion_die.max(1), 0));
                    Some(Periodic::Damage {
                        status: effect.status,
                        amount: dice.roll_damage(&die),
                    })
                }
                StatusType::Stun | StatusType::Freeze => None,
            };
            if let Some(periodic) = periodic {
                report.periodic.push(periodic);
            }

            effect.remaining = effect.remaining.saturating_sub(1);
            if effect.is_expired() {
                report.expired.push(effect.status);
            }
        }

        self.effects.retain(|e| !e.is_expired());
        report
    }
}

/// Tick a combatant's statuses once for the current turn cycle
pub fn tick_statuses(combatant: &mut Combatant, dice: &mut Dice, confusion_die: u32) -> TickReport {
    combatant.statuses.tick(dice, confusion_die)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("burn".parse::<StatusType>(), Ok(StatusType::Burn));
        assert_eq!("STUNNED".parse::<StatusType>(), Ok(StatusType::Stun));
        assert_eq!("confused".parse::<StatusType>(), Ok(StatusType::Confusion));
        assert!("hexed".parse::<StatusType>().is_err());
    }

    #[test]
    fn test_prevents_action() {
        assert!(StatusType::Stun.prevents_action());
        assert!(StatusType::Freeze.prevents_action());
        assert!(StatusType::Confusion.prevents_action());
        assert!(!StatusType::Burn.prevents_action());
        assert!(!StatusType::Regen.prevents_action());
    }

    #[test]
    fn test_duration_decrements_once_per_tick() {
        let mut dice = Dice::seeded(1);
        let mut set = StatusSet::new();
        set.apply(StatusEffect::new(StatusType::Burn, 3, 2), 3);

        for expected in [2, 1] {
            let report = set.tick(&mut dice, 5);
            assert_eq!(set.get(StatusType::Burn).unwrap().remaining, expected);
            assert!(report.expired.is_empty());
        }

        let report = set.tick(&mut dice, 5);
        assert_eq!(report.expired, vec![StatusType::Burn]);
        assert!(!set.has(StatusType::Burn));
    }

    #[test]
    fn test_last_tick_still_applies_periodic() {
        let mut dice = Dice::seeded(1);
        let mut set = StatusSet::new();
        set.apply(StatusEffect::new(StatusType::Regen, 1, 4), 3);

        let report = set.tick(&mut dice, 5);
        assert_eq!(
            report.periodic,
            vec![Periodic::Heal {
                status: StatusType::Regen,
                amount: 4
            }]
        );
        assert_eq!(report.expired, vec![StatusType::Regen]);
    }

    #[test]
    fn test_restack_keeps_longer_duration() {
        let mut set = StatusSet::new();
        assert_eq!(set.apply(StatusEffect::new(StatusType::Poison, 4, 2), 3), Applied::New);

        // Shorter application keeps the longer remaining duration
        let applied = set.apply(StatusEffect::new(StatusType::Poison, 2, 1), 3);
        assert_eq!(applied, Applied::Restacked { stacks: 2, remaining: 4 });

        // Longer application refreshes
        set.apply(StatusEffect::new(StatusType::Poison, 6, 1), 3);
        let poison = set.get(StatusType::Poison).unwrap();
        assert_eq!(poison.remaining, 6);
        assert_eq!(poison.stacks, 3);
        assert_eq!(poison.magnitude, 2);
        assert_eq!(poison.amount(), 6);

        // Capped at three stacks, single instance
        set.apply(StatusEffect::new(StatusType::Poison, 1, 1), 3);
        assert_eq!(set.get(StatusType::Poison).unwrap().stacks, 3);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_zero_duration_ignored() {
        let mut set = StatusSet::new();
        assert_eq!(
            set.apply(StatusEffect::new(StatusType::Stun, 0, 0), 3),
            Applied::Ignored
        );
        assert!(set.is_empty());
    }

    #[test]
    fn test_stun_decides_can_act_before_decrement() {
        let mut dice = Dice::seeded(1);
        let mut set = StatusSet::new();
        set.apply(StatusEffect::new(StatusType::Stun, 1, 0), 3);

        let report = set.tick(&mut dice, 5);
        assert!(!report.can_act);
        assert_eq!(report.expired, vec![StatusType::Stun]);

        let report = set.tick(&mut dice, 5);
        assert!(report.can_act);
    }

    #[test]
    fn test_confusion_self_damage_uses_die() {
        let mut dice = Dice::seeded(11);
        for _ in 0..50 {
            let mut set = StatusSet::new();
            set.apply(StatusEffect::new(StatusType::Confusion, 2, 0), 3);
            let report = set.tick(&mut dice, 5);
            assert!(!report.can_act);
            match report.periodic.as_slice() {
                [Periodic::Damage { status: StatusType::Confusion, amount }] => {
                    assert!((1..=5).contains(amount));
                }
                other => panic!("unexpected periodic {:?}", other),
            }
        }
    }
}

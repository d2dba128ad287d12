//! Dice rolling system
//!
//! Parses and rolls dice notation like "2d6+3", "1d20", "4d6-2", and bare
//! numbers like "7" that are treated as already-resolved damage.
//!
//! All randomness in a battle flows through a single [`Dice`] source so that
//! tests can seed it and the dev override can force upcoming rolls.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most dice a single expression may roll
pub const MAX_DICE: u32 = 100;

/// Largest die an expression may name
pub const MAX_SIDES: u32 = 1000;

/// Errors produced while parsing dice notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("missing 'd' in dice notation: {0}")]
    MissingSeparator(String),

    #[error("invalid dice count: {0}")]
    InvalidCount(String),

    #[error("invalid die sides: {0}")]
    InvalidSides(String),

    #[error("invalid modifier: {0}")]
    InvalidModifier(String),
}

/// A parsed dice roll specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Modifier to add/subtract
    pub modifier: i32,
}

impl DiceRoll {
    /// Create a new dice roll
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i32 {
        saturate(i64::from(self.count) + i64::from(self.modifier))
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i32 {
        saturate(i64::from(self.count) * i64::from(self.sides) + i64::from(self.modifier))
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl FromStr for DiceRoll {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice(notation: &str) -> Result<DiceRoll, DiceError> {
    let notation = notation.trim().to_lowercase();

    let d_pos = notation
        .find('d')
        .ok_or_else(|| DiceError::MissingSeparator(notation.clone()))?;

    // "d6" means "1d6"
    let count_str = &notation[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| DiceError::InvalidCount(count_str.to_string()))?
    };

    if count == 0 || count > MAX_DICE {
        return Err(DiceError::InvalidCount(count_str.to_string()));
    }

    let rest = &notation[d_pos + 1..];

    let (sides_str, modifier) = if let Some(plus_pos) = rest.find('+') {
        let mod_str = &rest[plus_pos + 1..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| DiceError::InvalidModifier(mod_str.to_string()))?;
        (&rest[..plus_pos], modifier)
    } else if let Some(minus_pos) = rest.rfind('-').filter(|p| *p > 0) {
        let mod_str = &rest[minus_pos..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| DiceError::InvalidModifier(mod_str.to_string()))?;
        (&rest[..minus_pos], modifier)
    } else {
        (rest, 0)
    };

    let sides: u32 = sides_str
        .parse()
        .map_err(|_| DiceError::InvalidSides(sides_str.to_string()))?;

    if sides == 0 || sides > MAX_SIDES {
        return Err(DiceError::InvalidSides(sides_str.to_string()));
    }

    Ok(DiceRoll {
        count,
        sides,
        modifier,
    })
}

/// A damage expression: dice to roll, or an already-resolved number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DamageDice {
    Fixed(i32),
    Roll(DiceRoll),
}

impl DamageDice {
    /// Lowest value this expression can produce before the floor-at-1 clamp
    pub fn min(&self) -> i32 {
        match self {
            DamageDice::Fixed(n) => *n,
            DamageDice::Roll(roll) => roll.min(),
        }
    }

    /// Highest value this expression can produce before the floor-at-1 clamp
    pub fn max(&self) -> i32 {
        match self {
            DamageDice::Fixed(n) => *n,
            DamageDice::Roll(roll) => roll.max(),
        }
    }
}

impl Default for DamageDice {
    fn default() -> Self {
        DamageDice::Roll(DiceRoll::new(1, 6, 0))
    }
}

impl FromStr for DamageDice {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i32>() {
            return Ok(DamageDice::Fixed(n));
        }
        parse_dice(trimmed).map(DamageDice::Roll)
    }
}

impl TryFrom<String> for DamageDice {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DamageDice> for String {
    fn from(value: DamageDice) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DamageDice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageDice::Fixed(n) => write!(f, "{}", n),
            DamageDice::Roll(roll) => write!(f, "{}", roll),
        }
    }
}

/// A d20 result and whether it came from the forced-roll override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct D20 {
    pub value: u32,
    pub forced: bool,
}

impl D20 {
    /// Natural 20
    pub fn is_critical(&self) -> bool {
        self.value == 20
    }

    /// Natural 1, unless the roll was forced
    pub fn is_fumble(&self) -> bool {
        self.value == 1 && !self.forced
    }
}

/// The single randomness source for a battle
#[derive(Debug)]
pub struct Dice {
    rng: StdRng,
    forced_d20: VecDeque<u32>,
    forced_damage: VecDeque<i32>,
}

impl Default for Dice {
    fn default() -> Self {
        Self::new()
    }
}

impl Dice {
    /// Create a dice source seeded from the OS
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Create a deterministic dice source
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            forced_d20: VecDeque::new(),
            forced_damage: VecDeque::new(),
        }
    }

    /// Force the next d20 roll (dev override). Values are clamped to [1, 20].
    pub fn force_d20(&mut self, value: u32) {
        self.forced_d20.push_back(value.clamp(1, 20));
    }

    /// Force the next damage roll total (dev override)
    pub fn force_damage(&mut self, total: i32) {
        self.forced_damage.push_back(total);
    }

    /// Drop any forced rolls that were never consumed
    pub fn clear_forced(&mut self) {
        self.forced_d20.clear();
        self.forced_damage.clear();
    }

    /// Roll a d20, uniform over [1, 20]
    pub fn roll_d20(&mut self) -> D20 {
        match self.forced_d20.pop_front() {
            Some(value) => D20 {
                value,
                forced: true,
            },
            None => D20 {
                value: self.rng.random_range(1..=20),
                forced: false,
            },
        }
    }

    /// Roll a single die with the given number of sides
    pub fn roll_die(&mut self, sides: u32) -> i32 {
        saturate(i64::from(self.rng.random_range(1..=sides.max(1))))
    }

    /// Roll raw dice notation without the floor clamp
    pub fn roll_raw(&mut self, dice: &DamageDice) -> i32 {
        if let Some(total) = self.forced_damage.pop_front() {
            return total;
        }
        match dice {
            DamageDice::Fixed(n) => *n,
            DamageDice::Roll(roll) => {
                let mut total = i64::from(roll.modifier);
                for _ in 0..roll.count {
                    total += i64::from(self.roll_die(roll.sides));
                }
                saturate(total)
            }
        }
    }

    /// Roll damage, floored at 1
    pub fn roll_damage(&mut self, dice: &DamageDice) -> i32 {
        self.roll_raw(dice).max(1)
    }

    /// Percentage check: true with probability `percent`/100
    pub fn chance(&mut self, percent: u32) -> bool {
        if percent >= 100 {
            return true;
        }
        if percent == 0 {
            return false;
        }
        self.rng.random_range(0..100) < percent
    }

    /// Uniform index in [0, len)
    pub fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            0
        } else {
            self.rng.random_range(0..len)
        }
    }
}

//! Elemental types and damage scaling
//!
//! Handles damage calculation with:
//! - Elemental types for attackers, defenders and moves
//! - A fixed, directed type chart (attacker type -> defender type)
//! - Immunity (0x), weakness (0.5x), strength (2x)
//! - Critical doubling and the floor-at-1 clamp

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Elemental type of a combatant or move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Plain weapons, claws, fists
    #[default]
    Physical,
    Fire,
    Ice,
    Lightning,
    Water,
    Earth,
    Holy,
    Shadow,
}

impl ElementType {
    /// Get all element types
    pub fn all() -> &'static [ElementType] {
        &[
            ElementType::Physical,
            ElementType::Fire,
            ElementType::Ice,
            ElementType::Lightning,
            ElementType::Water,
            ElementType::Earth,
            ElementType::Holy,
            ElementType::Shadow,
        ]
    }
}

impl FromStr for ElementType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "physical" | "normal" => Ok(ElementType::Physical),
            "fire" => Ok(ElementType::Fire),
            "ice" | "cold" => Ok(ElementType::Ice),
            "lightning" | "electric" => Ok(ElementType::Lightning),
            "water" => Ok(ElementType::Water),
            "earth" | "ground" => Ok(ElementType::Earth),
            "holy" | "light" => Ok(ElementType::Holy),
            "shadow" | "dark" => Ok(ElementType::Shadow),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementType::Physical => "physical",
            ElementType::Fire => "fire",
            ElementType::Ice => "ice",
            ElementType::Lightning => "lightning",
            ElementType::Water => "water",
            ElementType::Earth => "earth",
            ElementType::Holy => "holy",
            ElementType::Shadow => "shadow",
        };
        write!(f, "{}", s)
    }
}

/// How effective an attacking type is against a defending type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effectiveness {
    /// Takes no damage
    Immune,
    /// Takes half damage (rounded down)
    Weak,
    /// Same type or no chart entry
    Neutral,
    /// Takes double damage
    Strong,
}

impl Effectiveness {
    /// Apply this multiplier to a damage amount
    pub fn apply(&self, damage: i32) -> i32 {
        match self {
            Effectiveness::Immune => 0,
            Effectiveness::Weak => damage / 2,
            Effectiveness::Neutral => damage,
            Effectiveness::Strong => damage * 2,
        }
    }

    /// The multiplier as a float, for display
    pub fn multiplier(&self) -> f32 {
        match self {
            Effectiveness::Immune => 0.0,
            Effectiveness::Weak => 0.5,
            Effectiveness::Neutral => 1.0,
            Effectiveness::Strong => 2.0,
        }
    }
}

/// Directed type chart. Pairs not listed are neutral.
pub const TYPE_CHART: &[(ElementType, ElementType, Effectiveness)] = &[
    (ElementType::Fire, ElementType::Ice, Effectiveness::Strong),
    (ElementType::Fire, ElementType::Earth, Effectiveness::Strong),
    (ElementType::Fire, ElementType::Water, Effectiveness::Weak),
    (ElementType::Water, ElementType::Fire, Effectiveness::Strong),
    (ElementType::Water, ElementType::Earth, Effectiveness::Strong),
    (ElementType::Water, ElementType::Lightning, Effectiveness::Weak),
    (ElementType::Ice, ElementType::Earth, Effectiveness::Strong),
    (ElementType::Ice, ElementType::Fire, Effectiveness::Weak),
    (ElementType::Lightning, ElementType::Water, Effectiveness::Strong),
    (ElementType::Lightning, ElementType::Earth, Effectiveness::Immune),
    (ElementType::Earth, ElementType::Lightning, Effectiveness::Strong),
    (ElementType::Earth, ElementType::Fire, Effectiveness::Weak),
    (ElementType::Holy, ElementType::Shadow, Effectiveness::Strong),
    (ElementType::Shadow, ElementType::Holy, Effectiveness::Strong),
    (ElementType::Shadow, ElementType::Shadow, Effectiveness::Weak),
    (ElementType::Physical, ElementType::Shadow, Effectiveness::Weak),
];

/// Look up the effectiveness of `attacker` against `defender`
pub fn effectiveness(attacker: ElementType, defender: ElementType) -> Effectiveness {
    TYPE_CHART
        .iter()
        .find(|(a, d, _)| *a == attacker && *d == defender)
        .map(|(_, _, e)| *e)
        .unwrap_or(Effectiveness::Neutral)
}

/// Scale rolled damage through the type multiplier and critical doubling.
///
/// The result is floored at 1 unless the defender is immune.
pub fn scale_damage(base: i32, effect: Effectiveness, critical: bool) -> i32 {
    if effect == Effectiveness::Immune {
        return 0;
    }
    let scaled = effect.apply(base);
    let scaled = if critical { scaled * 2 } else { scaled };
    scaled.max(1)
}

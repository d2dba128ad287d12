//! Battle styles
//!
//! A style fixes how attack rolls are judged and when timed input is asked
//! for. One style is chosen when a battle starts and kept for its lifetime.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::dice::Dice;
use super::state::{resolve_attack, AttackOptions, AttackResult, Combatant, HitRule, Move};
use crate::qte::{QteModifiers, QtePath};

/// Style selector used in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    /// d20 + bonus against armor class
    #[default]
    #[serde(alias = "dnd")]
    Classic,
    /// Armor is ignored; type matchups carry the fight
    #[serde(alias = "pokemon")]
    Elemental,
    /// Classic rolls with timed reactions on every enemy attack
    #[serde(alias = "exp33")]
    Reactive,
}

impl StyleKind {
    /// Build the style implementation for a session
    pub fn build(self) -> Box<dyn BattleStyle> {
        match self {
            StyleKind::Classic => Box::new(ClassicStyle),
            StyleKind::Elemental => Box::new(ElementalStyle),
            StyleKind::Reactive => Box::new(ReactiveStyle),
        }
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StyleKind::Classic => "classic",
            StyleKind::Elemental => "elemental",
            StyleKind::Reactive => "reactive",
        };
        write!(f, "{}", s)
    }
}

/// Resolution rules that vary between styles
pub trait BattleStyle: fmt::Debug {
    fn kind(&self) -> StyleKind;

    /// How rolls are judged against armor class
    fn hit_rule(&self) -> HitRule;

    /// Whether the player is asked for timed input on this path
    fn solicits_qte(&self, path: QtePath) -> bool;

    /// Resolve an attack under this style
    fn resolve(
        &self,
        dice: &mut Dice,
        attacker: &Combatant,
        defender: &Combatant,
        mv: &Move,
        defend_bonus: i32,
        qte: Option<QteModifiers>,
    ) -> AttackResult {
        let opts = AttackOptions {
            hit_rule: self.hit_rule(),
            defend_bonus,
            qte,
        };
        resolve_attack(dice, attacker, defender, mv, &opts)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassicStyle;

impl BattleStyle for ClassicStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Classic
    }

    fn hit_rule(&self) -> HitRule {
        HitRule::ArmorClass
    }

    fn solicits_qte(&self, path: QtePath) -> bool {
        path == QtePath::Defend
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ElementalStyle;

impl BattleStyle for ElementalStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Elemental
    }

    fn hit_rule(&self) -> HitRule {
        HitRule::IgnoreArmor
    }

    fn solicits_qte(&self, _path: QtePath) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReactiveStyle;

impl BattleStyle for ReactiveStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Reactive
    }

    fn hit_rule(&self) -> HitRule {
        HitRule::ArmorClass
    }

    fn solicits_qte(&self, _path: QtePath) -> bool {
        true
    }
}

//! Timed-input (QTE) modifiers
//!
//! The engine never runs timed input itself. An external input collaborator
//! reports an outcome tier and the engine maps it onto an already-rolled
//! [`AttackResult`]:
//!
//! - Parry: the attacker takes fixed reflected damage, the defender none
//! - Dodge: the defender takes nothing
//! - Confuse: the defender takes full (or defend-reduced) damage and is confused
//! - Fail: as confuse, and every remaining defend charge is lost

use serde::{Deserialize, Serialize};

use crate::combat::{AttackResult, StatusEffect};

/// Outcome tier reported by the input collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QteTier {
    Parry,
    Dodge,
    Confuse,
    Fail,
}

/// Which reaction the defender is attempting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QtePath {
    /// Plain dodge: the attack roll still decides whether anything landed
    Dodge,
    /// Defending stance: the tier alone decides what lands
    Defend,
}

/// What the input collaborator is asked to judge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QteRequest {
    pub attacker: String,
    pub defender: String,
    pub move_name: String,
    pub path: QtePath,
}

/// Source of timed-input outcomes
pub trait QteInput {
    /// Report the tier for this attack, or `None` if no input was given
    fn outcome(&mut self, request: &QteRequest) -> Option<QteTier>;
}

/// Everything needed to map a tier onto a result
#[derive(Debug, Clone, PartialEq)]
pub struct QteModifiers {
    pub tier: QteTier,
    pub path: QtePath,
    pub reflect_damage: i32,
    /// Status given on confuse/fail
    pub confusion: StatusEffect,
}

/// Apply a QTE outcome to a resolved attack.
///
/// `landed` is the scaled damage the move would deal if it connects.
pub fn apply_qte(result: &mut AttackResult, mods: &QteModifiers, landed: i32) {
    result.qte = Some(mods.tier);

    match mods.path {
        QtePath::Dodge if !result.hit => {}
        QtePath::Dodge => {
            let rolled = result.damage;
            match mods.tier {
                QteTier::Parry => negate(result, mods.reflect_damage),
                QteTier::Dodge => negate(result, 0),
                QteTier::Confuse => confuse(result, mods, rolled, false),
                QteTier::Fail => confuse(result, mods, rolled, true),
            }
        }
        QtePath::Defend => {
            let reduced = if landed > 0 { (landed / 2).max(1) } else { 0 };
            match mods.tier {
                QteTier::Parry => negate(result, mods.reflect_damage),
                QteTier::Dodge => negate(result, 0),
                QteTier::Confuse => confuse(result, mods, reduced, false),
                QteTier::Fail => confuse(result, mods, reduced, true),
            }
        }
    }
}

fn negate(result: &mut AttackResult, reflected: i32) {
    result.hit = false;
    result.damage = 0;
    result.inflicted.clear();
    result.reflected = reflected.max(0);
}

fn confuse(result: &mut AttackResult, mods: &QteModifiers, damage: i32, breaks_stance: bool) {
    result.hit = true;
    result.damage = damage;
    result.inflicted.push(mods.confusion.clone());
    result.breaks_stance = breaks_stance;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{D20, HitRule, StatusType};

    fn mods(tier: QteTier, path: QtePath) -> QteModifiers {
        QteModifiers {
            tier,
            path,
            reflect_damage: 3,
            confusion: StatusEffect::new(StatusType::Confusion, 2, 0),
        }
    }

    fn rolled(hit: bool, damage: i32) -> AttackResult {
        let value = if hit { 18 } else { 3 };
        let mut result = AttackResult::new(D20 { value, forced: true }, 0, 10, HitRule::ArmorClass);
        if hit {
            result.damage = damage;
        }
        result
    }

    #[test]
    fn test_parry_reflects() {
        let mut result = rolled(true, 8);
        apply_qte(&mut result, &mods(QteTier::Parry, QtePath::Dodge), 8);
        assert!(!result.hit);
        assert_eq!(result.damage, 0);
        assert_eq!(result.reflected, 3);
        assert_eq!(result.qte, Some(QteTier::Parry));
    }

    #[test]
    fn test_dodge_negates() {
        let mut result = rolled(true, 8);
        apply_qte(&mut result, &mods(QteTier::Dodge, QtePath::Dodge), 8);
        assert_eq!(result.damage, 0);
        assert_eq!(result.reflected, 0);
        assert!(result.inflicted.is_empty());
    }

    #[test]
    fn test_confuse_full_damage_on_dodge_path() {
        let mut result = rolled(true, 8);
        apply_qte(&mut result, &mods(QteTier::Confuse, QtePath::Dodge), 8);
        assert_eq!(result.damage, 8);
        assert_eq!(result.inflicted[0].status, StatusType::Confusion);
        assert!(!result.breaks_stance);
    }

    #[test]
    fn test_dodge_path_miss_is_untouched() {
        let mut result = rolled(false, 0);
        apply_qte(&mut result, &mods(QteTier::Fail, QtePath::Dodge), 8);
        assert!(!result.hit);
        assert_eq!(result.damage, 0);
        assert!(result.inflicted.is_empty());
    }

    #[test]
    fn test_defend_path_ignores_roll() {
        let mut result = rolled(false, 0);
        apply_qte(&mut result, &mods(QteTier::Confuse, QtePath::Defend), 9);
        assert!(result.hit);
        assert_eq!(result.damage, 4);
        assert_eq!(result.inflicted.len(), 1);
    }

    #[test]
    fn test_fail_breaks_stance() {
        let mut result = rolled(true, 6);
        apply_qte(&mut result, &mods(QteTier::Fail, QtePath::Defend), 6);
        assert!(result.breaks_stance);
        assert_eq!(result.damage, 3);
    }

    #[test]
    fn test_defend_path_immune_stays_zero() {
        let mut result = rolled(true, 0);
        apply_qte(&mut result, &mods(QteTier::Confuse, QtePath::Defend), 0);
        assert_eq!(result.damage, 0);
    }
}

//! Combatant state and attack resolution
//!
//! Tracks the per-combatant numbers a battle needs:
//! - HP (always within [0, max_hp]), mana, armor class, attack bonus
//! - Stagger meter and limit charge
//! - Defending stance charges
//!
//! and resolves a single attack roll into a structured [`AttackResult`]
//! without mutating either side.

use serde::{Deserialize, Serialize};

use super::damage::{effectiveness, scale_damage, Effectiveness, ElementType};
use super::dice::{D20, DamageDice, Dice};
use super::effects::{StatusEffect, StatusOnHit, StatusSet};
use crate::qte::{apply_qte, QteModifiers, QteTier};

/// Which part a combatant plays in the battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Enemy,
    Summon,
}

/// A participant in a battle
#[derive(Debug, Clone, Serialize)]
pub struct Combatant {
    pub name: String,
    pub role: Role,
    pub hp: i32,
    pub max_hp: i32,
    /// Player only; zero for other roles
    pub mana: i32,
    pub max_mana: i32,
    pub armor_class: i32,
    pub attack_bonus: i32,
    pub damage: DamageDice,
    pub element: ElementType,
    pub statuses: StatusSet,
    pub stagger: i32,
    /// Zero disables staggering
    pub stagger_threshold: i32,
    /// Player only
    pub limit_charge: u32,
    pub defending_turns_remaining: u32,
}

impl Combatant {
    /// Create a combatant at full HP with default stats
    pub fn new(name: impl Into<String>, role: Role, max_hp: i32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            name: name.into(),
            role,
            hp: max_hp,
            max_hp,
            mana: 0,
            max_mana: 0,
            armor_class: 10,
            attack_bonus: 0,
            damage: DamageDice::default(),
            element: ElementType::Physical,
            statuses: StatusSet::new(),
            stagger: 0,
            stagger_threshold: 0,
            limit_charge: 0,
            defending_turns_remaining: 0,
        }
    }

    pub fn with_mana(mut self, max_mana: i32) -> Self {
        self.max_mana = max_mana.max(0);
        self.mana = self.max_mana;
        self
    }

    pub fn with_armor_class(mut self, ac: i32) -> Self {
        self.armor_class = ac;
        self
    }

    pub fn with_attack_bonus(mut self, bonus: i32) -> Self {
        self.attack_bonus = bonus;
        self
    }

    pub fn with_damage(mut self, damage: DamageDice) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_element(mut self, element: ElementType) -> Self {
        self.element = element;
        self
    }

    pub fn with_stagger_threshold(mut self, threshold: i32) -> Self {
        self.stagger_threshold = threshold.max(0);
        self
    }

    /// HP of 0 ends this combatant's participation
    pub fn is_defeated(&self) -> bool {
        self.hp <= 0
    }

    pub fn is_defending(&self) -> bool {
        self.defending_turns_remaining > 0
    }

    /// Armor class against an incoming roll, including the defend bonus
    pub fn effective_ac(&self, defend_bonus: i32) -> i32 {
        if self.is_defending() {
            self.armor_class + defend_bonus
        } else {
            self.armor_class
        }
    }

    /// Lose HP, clamped at zero. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, self.hp.max(0));
        self.hp -= actual;
        actual
    }

    /// Heal (cannot exceed max_hp). Returns the HP actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, (self.max_hp - self.hp).max(0));
        self.hp += actual;
        actual
    }

    /// Restore mana (cannot exceed max_mana)
    pub fn restore_mana(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, (self.max_mana - self.mana).max(0));
        self.mana += actual;
        actual
    }

    /// Spend mana if enough is available
    pub fn spend_mana(&mut self, cost: i32) -> bool {
        if cost > self.mana {
            return false;
        }
        self.mana -= cost.max(0);
        true
    }

    /// Add to the stagger meter. Returns true when the meter fills, in which
    /// case it is reset.
    pub fn add_stagger(&mut self, amount: i32) -> bool {
        if self.stagger_threshold <= 0 || amount <= 0 {
            return false;
        }
        self.stagger += amount;
        if self.stagger >= self.stagger_threshold {
            self.stagger = 0;
            true
        } else {
            false
        }
    }

    /// Add limit charge, capped at `max`
    pub fn add_limit_charge(&mut self, amount: i32, max: u32) {
        if amount > 0 {
            self.limit_charge = (self.limit_charge + amount as u32).min(max);
        }
    }

    /// Consume one defending stance charge
    pub fn consume_stance(&mut self) {
        self.defending_turns_remaining = self.defending_turns_remaining.saturating_sub(1);
    }
}

/// The resolution-time view of an attack, skill or enemy move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub name: String,
    pub damage: DamageDice,
    #[serde(default)]
    pub element: ElementType,
    #[serde(default)]
    pub status: Option<StatusOnHit>,
}

impl Move {
    /// A combatant's basic attack
    pub fn basic(attacker: &Combatant) -> Self {
        Self {
            name: "attack".to_string(),
            damage: attacker.damage,
            element: attacker.element,
            status: None,
        }
    }
}

/// How the hit check treats armor class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitRule {
    /// Roll + bonus against armor class
    #[default]
    ArmorClass,
    /// Only a natural 1 misses
    IgnoreArmor,
    /// No miss possible
    AlwaysHit,
}

/// Per-resolution knobs supplied by the battle style and orchestrator
#[derive(Debug, Clone, Default)]
pub struct AttackOptions {
    pub hit_rule: HitRule,
    /// Added to the defender's AC while it is defending
    pub defend_bonus: i32,
    pub qte: Option<QteModifiers>,
}

/// Result of an attack roll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackResult {
    pub hit: bool,
    /// The d20 roll
    pub roll: D20,
    /// Roll plus attack bonus
    pub total: i32,
    pub target_ac: i32,
    pub is_crit: bool,
    pub is_fumble: bool,
    /// Damage before type multiplier and crit
    pub base_damage: i32,
    /// Damage the defender will take
    pub damage: i32,
    pub effectiveness: Effectiveness,
    /// Statuses the defender will receive
    pub inflicted: Vec<StatusEffect>,
    /// Damage reflected back at the attacker (parry)
    pub reflected: i32,
    /// The defender loses every remaining stance charge
    pub breaks_stance: bool,
    pub qte: Option<QteTier>,
}

impl AttackResult {
    /// Evaluate the hit check for a roll
    pub fn new(roll: D20, attack_bonus: i32, target_ac: i32, rule: HitRule) -> Self {
        let is_crit = roll.is_critical();
        let is_fumble = roll.is_fumble();
        let total = roll.value as i32 + attack_bonus;

        // Critical always hits, fumble always misses
        let hit = match rule {
            HitRule::AlwaysHit => true,
            HitRule::IgnoreArmor => !is_fumble,
            HitRule::ArmorClass => is_crit || (!is_fumble && total >= target_ac),
        };

        Self {
            hit,
            roll,
            total,
            target_ac,
            is_crit,
            is_fumble,
            base_damage: 0,
            damage: 0,
            effectiveness: Effectiveness::Neutral,
            inflicted: Vec::new(),
            reflected: 0,
            breaks_stance: false,
            qte: None,
        }
    }

    /// Multiplier as a float, for display
    pub fn multiplier(&self) -> f32 {
        self.effectiveness.multiplier()
    }
}

/// Resolve one attack from `attacker` against `defender`.
///
/// Pure with respect to both combatants: nothing is applied here. The
/// caller stages the returned damage and statuses.
pub fn resolve_attack(
    dice: &mut Dice,
    attacker: &Combatant,
    defender: &Combatant,
    mv: &Move,
    opts: &AttackOptions,
) -> AttackResult {
    let roll = dice.roll_d20();
    let target_ac = defender.effective_ac(opts.defend_bonus);
    let mut result = AttackResult::new(roll, attacker.attack_bonus, target_ac, opts.hit_rule);
    result.effectiveness = effectiveness(mv.element, defender.element);

    // Damage is rolled even on a miss so a defend-path QTE can land it
    result.base_damage = dice.roll_damage(&mv.damage);
    let scaled = scale_damage(result.base_damage, result.effectiveness, result.is_crit);

    if result.hit {
        result.damage = scaled;
        if let Some(on_hit) = &mv.status {
            if dice.chance(on_hit.chance) {
                result.inflicted.push(on_hit.to_effect());
            }
        }
    }

    if let Some(qte) = &opts.qte {
        apply_qte(&mut result, qte, scaled);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::effects::StatusType;

    fn fighter() -> Combatant {
        Combatant::new("hero", Role::Player, 20)
            .with_attack_bonus(5)
            .with_damage("1d6".parse().unwrap())
    }

    fn goblin() -> Combatant {
        Combatant::new("goblin", Role::Enemy, 15).with_armor_class(12)
    }

    #[test]
    fn test_hp_clamping() {
        let mut c = Combatant::new("c", Role::Enemy, 10);
        assert_eq!(c.take_damage(4), 4);
        assert_eq!(c.hp, 6);
        assert_eq!(c.take_damage(50), 6);
        assert_eq!(c.hp, 0);
        assert!(c.is_defeated());
        assert_eq!(c.heal(100), 10);
        assert_eq!(c.hp, 10);
        assert_eq!(c.take_damage(-5), 0);
        assert_eq!(c.hp, 10);
    }

    #[test]
    fn test_mana() {
        let mut c = Combatant::new("mage", Role::Player, 10).with_mana(8);
        assert!(c.spend_mana(5));
        assert_eq!(c.mana, 3);
        assert!(!c.spend_mana(4));
        assert_eq!(c.mana, 3);
        assert_eq!(c.restore_mana(10), 5);
    }

    #[test]
    fn test_stagger_meter() {
        let mut c = Combatant::new("ogre", Role::Enemy, 40).with_stagger_threshold(10);
        assert!(!c.add_stagger(6));
        assert!(c.add_stagger(5));
        assert_eq!(c.stagger, 0);

        let mut never = Combatant::new("slime", Role::Enemy, 40);
        assert!(!never.add_stagger(1000));
    }

    #[test]
    fn test_limit_charge_caps() {
        let mut c = fighter();
        c.add_limit_charge(70, 100);
        c.add_limit_charge(70, 100);
        assert_eq!(c.limit_charge, 100);
    }

    #[test]
    fn test_attack_result_rules() {
        let natural = |v| D20 { value: v, forced: false };

        let r = AttackResult::new(natural(20), 0, 99, HitRule::ArmorClass);
        assert!(r.hit && r.is_crit);

        let r = AttackResult::new(natural(1), 50, 5, HitRule::ArmorClass);
        assert!(!r.hit && r.is_fumble);

        let r = AttackResult::new(natural(15), 5, 18, HitRule::ArmorClass);
        assert!(r.hit);
        assert_eq!(r.total, 20);

        let r = AttackResult::new(natural(10), 3, 18, HitRule::ArmorClass);
        assert!(!r.hit);

        let r = AttackResult::new(natural(2), 0, 30, HitRule::IgnoreArmor);
        assert!(r.hit);

        // A forced 1 is compared normally
        let r = AttackResult::new(D20 { value: 1, forced: true }, 15, 12, HitRule::ArmorClass);
        assert!(r.hit && !r.is_fumble);
    }

    #[test]
    fn test_resolve_forced_hit() {
        let mut dice = Dice::seeded(5);
        dice.force_d20(15);
        let attacker = fighter();
        let defender = goblin();
        let result = resolve_attack(
            &mut dice,
            &attacker,
            &defender,
            &Move::basic(&attacker),
            &AttackOptions::default(),
        );
        assert!(result.hit);
        assert_eq!(result.total, 20);
        assert_eq!(result.target_ac, 12);
        assert!(!result.is_crit);
        assert_eq!(result.effectiveness, Effectiveness::Neutral);
        assert!((1..=6).contains(&result.damage));
    }

    #[test]
    fn test_resolve_defending_raises_ac() {
        let mut dice = Dice::seeded(5);
        dice.force_d20(10);
        let attacker = fighter();
        let mut defender = goblin();
        defender.defending_turns_remaining = 1;
        let opts = AttackOptions {
            defend_bonus: 4,
            ..AttackOptions::default()
        };
        let result = resolve_attack(&mut dice, &attacker, &defender, &Move::basic(&attacker), &opts);
        assert_eq!(result.target_ac, 16);
        assert!(!result.hit);
        assert_eq!(result.damage, 0);
    }

    #[test]
    fn test_resolve_crit_and_status() {
        let mut dice = Dice::seeded(5);
        dice.force_d20(20);
        dice.force_damage(3);
        let attacker = fighter();
        let defender = goblin().with_element(ElementType::Ice);
        let mv = Move {
            name: "fire bolt".to_string(),
            damage: "1d6".parse().unwrap(),
            element: ElementType::Fire,
            status: Some(StatusOnHit::new(StatusType::Burn, 2)),
        };
        let result = resolve_attack(&mut dice, &attacker, &defender, &mv, &AttackOptions::default());
        assert!(result.is_crit);
        assert_eq!(result.base_damage, 3);
        // 3 * 2 (strong) * 2 (crit)
        assert_eq!(result.damage, 12);
        assert_eq!(result.multiplier(), 2.0);
        assert_eq!(result.inflicted.len(), 1);
        assert_eq!(result.inflicted[0].status, StatusType::Burn);
    }

    #[test]
    fn test_resolve_miss_inflicts_nothing() {
        let mut dice = Dice::seeded(5);
        dice.force_d20(2);
        let attacker = fighter();
        let defender = goblin();
        let mv = Move {
            status: Some(StatusOnHit::new(StatusType::Poison, 3)),
            ..Move::basic(&attacker)
        };
        let result = resolve_attack(&mut dice, &attacker, &defender, &mv, &AttackOptions::default());
        assert!(!result.hit);
        assert_eq!(result.damage, 0);
        assert!(result.inflicted.is_empty());
    }
}

//! Static data tables
//!
//! Read-only definitions for skills, items, summons and statuses. The engine
//! reaches them through the [`DataTables`] trait so that a host can report
//! the tables as unavailable; the battle then falls back to the inline
//! definitions carried by its start configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::combat::{DamageDice, ElementType, StatusOnHit, StatusType};

/// Errors from a data table lookup or load
#[derive(Debug, Error)]
pub enum TablesError {
    #[error("data tables unavailable")]
    Unavailable,

    #[error("failed to read data tables: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse data tables: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A player skill or enemy move definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mana_cost: i32,
    #[serde(default)]
    pub damage: Option<DamageDice>,
    #[serde(default)]
    pub element: Option<ElementType>,
    #[serde(default)]
    pub heal: Option<i32>,
    /// Status inflicted on the target when a hit lands
    #[serde(default)]
    pub status: Option<StatusOnHit>,
    /// Status the user applies to itself
    #[serde(default)]
    pub self_status: Option<StatusOnHit>,
    /// Number of independently resolved hits
    #[serde(default = "one")]
    pub hits: u32,
    /// Summon definition id spawned by this skill
    #[serde(default)]
    pub summon: Option<String>,
}

fn one() -> u32 {
    1
}

/// A consumable item definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub heal: i32,
    #[serde(default)]
    pub mana: i32,
    #[serde(default)]
    pub cures: Vec<StatusType>,
    /// Status applied to the user
    #[serde(default)]
    pub status: Option<StatusOnHit>,
}

/// What a summon does on its turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummonBehavior {
    /// Attacks the opposing side's main combatant
    Attack,
    /// Heals its owner
    Heal,
    /// Does nothing but stand in front of lethal hits
    Intercept,
}

/// A summonable ally or minion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonDef {
    pub id: String,
    pub name: String,
    pub hp: i32,
    /// Turns before it leaves; `None` stays until dismissed or killed
    #[serde(default)]
    pub duration: Option<u32>,
    pub behavior: SummonBehavior,
    #[serde(default)]
    pub damage: Option<DamageDice>,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default = "default_summon_ac")]
    pub armor_class: i32,
    #[serde(default)]
    pub heal: i32,
    #[serde(default)]
    pub element: ElementType,
}

fn default_summon_ac() -> i32 {
    10
}

/// Per-status tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDef {
    pub status: StatusType,
    pub magnitude: i32,
    #[serde(default)]
    pub description: String,
}

/// Read-only lookup of static definitions
pub trait DataTables {
    fn skill(&self, id: &str) -> Result<Option<SkillDef>, TablesError>;
    fn item(&self, id: &str) -> Result<Option<ItemDef>, TablesError>;
    fn summon(&self, id: &str) -> Result<Option<SummonDef>, TablesError>;
    fn status(&self, status: StatusType) -> Result<Option<StatusDef>, TablesError>;

    /// Per-tick magnitude the tables give `status`, if any
    fn magnitude(&self, status: StatusType) -> Option<i32> {
        match self.status(status) {
            Ok(def) => def.map(|d| d.magnitude),
            Err(e) => {
                debug!("Status table lookup for {} failed: {}", status, e);
                None
            }
        }
    }

    /// Fill in a status magnitude from the tables unless one is set
    fn tune(&self, on_hit: &StatusOnHit) -> StatusOnHit {
        let mut tuned = on_hit.clone();
        if tuned.magnitude.is_none() {
            tuned.magnitude = self.magnitude(on_hit.status);
        }
        tuned
    }

    /// Tune every status a skill inflicts or grants
    fn tune_skill(&self, mut skill: SkillDef) -> SkillDef {
        skill.status = skill.status.as_ref().map(|s| self.tune(s));
        skill.self_status = skill.self_status.as_ref().map(|s| self.tune(s));
        skill
    }
}

/// Stand-in for a data source that cannot be reached
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableTables;

impl DataTables for UnavailableTables {
    fn skill(&self, _id: &str) -> Result<Option<SkillDef>, TablesError> {
        Err(TablesError::Unavailable)
    }

    fn item(&self, _id: &str) -> Result<Option<ItemDef>, TablesError> {
        Err(TablesError::Unavailable)
    }

    fn summon(&self, _id: &str) -> Result<Option<SummonDef>, TablesError> {
        Err(TablesError::Unavailable)
    }

    fn status(&self, _status: StatusType) -> Result<Option<StatusDef>, TablesError> {
        Err(TablesError::Unavailable)
    }
}

/// On-disk catalog layout
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    skills: Vec<SkillDef>,
    #[serde(default)]
    items: Vec<ItemDef>,
    #[serde(default)]
    summons: Vec<SummonDef>,
    #[serde(default)]
    statuses: Vec<StatusDef>,
}

/// In-memory data tables, usually loaded from JSON
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    skills: HashMap<String, SkillDef>,
    items: HashMap<String, ItemDef>,
    summons: HashMap<String, SummonDef>,
    statuses: HashMap<StatusType, StatusDef>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, TablesError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for skill in file.skills {
            catalog.add_skill(skill);
        }
        for item in file.items {
            catalog.add_item(item);
        }
        for summon in file.summons {
            catalog.add_summon(summon);
        }
        for status in file.statuses {
            catalog.add_status(status);
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TablesError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&text)?;
        debug!(
            "Loaded catalog: {} skills, {} items, {} summons",
            catalog.skills.len(),
            catalog.items.len(),
            catalog.summons.len()
        );
        Ok(catalog)
    }

    pub fn add_skill(&mut self, skill: SkillDef) {
        self.skills.insert(skill.id.clone(), skill);
    }

    pub fn add_item(&mut self, item: ItemDef) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn add_summon(&mut self, summon: SummonDef) {
        self.summons.insert(summon.id.clone(), summon);
    }

    pub fn add_status(&mut self, status: StatusDef) {
        self.statuses.insert(status.status, status);
    }
}

impl DataTables for Catalog {
    fn skill(&self, id: &str) -> Result<Option<SkillDef>, TablesError> {
        Ok(self.skills.get(id).cloned())
    }

    fn item(&self, id: &str) -> Result<Option<ItemDef>, TablesError> {
        Ok(self.items.get(id).cloned())
    }

    fn summon(&self, id: &str) -> Result<Option<SummonDef>, TablesError> {
        Ok(self.summons.get(id).cloned())
    }

    fn status(&self, status: StatusType) -> Result<Option<StatusDef>, TablesError> {
        Ok(self.statuses.get(&status).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "skills": [
            {"id": "fireball", "name": "Fireball", "mana_cost": 5, "damage": "2d6",
             "element": "fire", "status": {"status": "burn", "duration": 2}},
            {"id": "wolf_call", "name": "Call Wolf", "mana_cost": 4, "summon": "wolf"}
        ],
        "items": [
            {"id": "potion", "name": "Potion", "heal": 10},
            {"id": "antidote", "name": "Antidote", "cures": ["poison"]}
        ],
        "summons": [
            {"id": "wolf", "name": "Wolf", "hp": 8, "duration": 3, "behavior": "attack", "damage": "1d4"}
        ],
        "statuses": [
            {"status": "burn", "magnitude": 4}
        ]
    }"#;

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::from_json_str(CATALOG).unwrap();

        let fireball = catalog.skill("fireball").unwrap().unwrap();
        assert_eq!(fireball.mana_cost, 5);
        assert_eq!(fireball.hits, 1);
        assert_eq!(fireball.element, Some(ElementType::Fire));
        assert_eq!(fireball.status.as_ref().unwrap().chance, 100);
        assert!(fireball.summon.is_none());
        assert_eq!(
            catalog.skill("wolf_call").unwrap().unwrap().summon.as_deref(),
            Some("wolf")
        );

        let antidote = catalog.item("antidote").unwrap().unwrap();
        assert_eq!(antidote.cures, vec![StatusType::Poison]);

        let wolf = catalog.summon("wolf").unwrap().unwrap();
        assert_eq!(wolf.behavior, SummonBehavior::Attack);
        assert_eq!(wolf.armor_class, 10);

        assert_eq!(catalog.status(StatusType::Burn).unwrap().unwrap().magnitude, 4);
        assert!(catalog.skill("missing").unwrap().is_none());
    }

    #[test]
    fn test_unavailable_tables() {
        assert!(matches!(
            UnavailableTables.skill("fireball"),
            Err(TablesError::Unavailable)
        ));
        assert!(matches!(
            UnavailableTables.status(StatusType::Stun),
            Err(TablesError::Unavailable)
        ));
    }

    #[test]
    fn test_tune_status_magnitude() {
        let catalog = Catalog::from_json_str(CATALOG).unwrap();
        let burn = StatusOnHit::new(StatusType::Burn, 2);
        assert_eq!(catalog.tune(&burn).to_effect().magnitude, 4);

        // An explicit magnitude wins over the table
        let hot = StatusOnHit {
            magnitude: Some(9),
            ..burn.clone()
        };
        assert_eq!(catalog.tune(&hot).to_effect().magnitude, 9);

        // No table entry, or no tables at all, keeps the built-in default
        let poison = StatusOnHit::new(StatusType::Poison, 2);
        assert_eq!(catalog.tune(&poison).to_effect().magnitude, 2);
        assert_eq!(UnavailableTables.tune(&burn).to_effect().magnitude, 3);

        let fireball = catalog.skill("fireball").unwrap().unwrap();
        let tuned = catalog.tune_skill(fireball);
        assert_eq!(tuned.status.unwrap().magnitude, Some(4));
    }

    #[test]
    fn test_bad_dice_rejected() {
        let bad = r#"{"skills": [{"id": "x", "name": "X", "damage": "2x6"}]}"#;
        assert!(matches!(Catalog::from_json_str(bad), Err(TablesError::Parse(_))));
    }
}

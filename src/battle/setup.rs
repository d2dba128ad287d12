//! Battle start configuration
//!
//! A flat record naming the enemy, optional player overrides and the scenes
//! to load on each outcome. Keys from the scene authoring format
//! (`enemy_hp`, `enemy_defense`, `victory_target`, ...) are accepted as
//! aliases.

use std::path::Path;

use figment::providers::{Format, Json, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::combat::{Combatant, DamageDice, ElementType, Move, Role, StatusOnHit, StyleKind};
use crate::config::ConfigError;
use crate::data::{SkillDef, SummonDef};
use crate::intents::IntentDef;

const DEFAULT_PLAYER_NAME: &str = "Player";
const DEFAULT_PLAYER_HP: i32 = 20;
const DEFAULT_PLAYER_MANA: i32 = 10;
const DEFAULT_ARMOR_CLASS: i32 = 10;
const DEFAULT_PLAYER_ATTACK: i32 = 2;

fn default_armor_class() -> i32 {
    DEFAULT_ARMOR_CLASS
}

/// Scene ids handed to the narrative engine on each outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneTargets {
    #[serde(alias = "victory_target")]
    pub win: String,
    #[serde(alias = "defeat_target")]
    pub lose: String,
    /// Fleeing is refused when unset
    #[serde(default, alias = "flee_target")]
    pub flee: Option<String>,
}

impl SceneTargets {
    pub fn new(win: impl Into<String>, lose: impl Into<String>) -> Self {
        Self {
            win: win.into(),
            lose: lose.into(),
            flee: None,
        }
    }

    pub fn with_flee(mut self, flee: impl Into<String>) -> Self {
        self.flee = Some(flee.into());
        self
    }
}

/// One entry in an enemy's move list. A `skill` reference is looked up in
/// the data tables first; the inline fields are the fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnemyMove {
    pub name: String,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub damage: Option<DamageDice>,
    #[serde(default)]
    pub element: Option<ElementType>,
    #[serde(default)]
    pub status: Option<StatusOnHit>,
    #[serde(default)]
    pub heal: Option<i32>,
    #[serde(default)]
    pub summon: Option<String>,
}

/// What an enemy move turns into once its skill reference is resolved
#[derive(Debug, Clone, PartialEq)]
pub enum EnemyAction {
    Attack(Move),
    Heal(i32),
    Summon(String),
}

impl EnemyMove {
    pub fn resolve(&self, enemy: &Combatant, skill: Option<&SkillDef>) -> EnemyAction {
        let summon = skill
            .and_then(|s| s.summon.clone())
            .or_else(|| self.summon.clone());
        if let Some(summon) = summon {
            return EnemyAction::Summon(summon);
        }

        let damage = skill.and_then(|s| s.damage).or(self.damage);
        let heal = skill.and_then(|s| s.heal).or(self.heal);
        if let (None, Some(heal)) = (damage, heal) {
            return EnemyAction::Heal(heal);
        }

        EnemyAction::Attack(Move {
            name: skill.map_or_else(|| self.name.clone(), |s| s.name.clone()),
            damage: damage.unwrap_or(enemy.damage),
            element: skill
                .and_then(|s| s.element)
                .or(self.element)
                .unwrap_or(enemy.element),
            status: skill
                .and_then(|s| s.status.clone())
                .or_else(|| self.status.clone()),
        })
    }
}

/// Enemy stats and behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyConfig {
    #[serde(alias = "enemy_name")]
    pub name: String,
    /// Starting HP
    #[serde(alias = "enemy_hp")]
    pub hp: i32,
    /// Defaults to `hp`
    #[serde(default, alias = "enemy_max_hp")]
    pub max_hp: Option<i32>,
    #[serde(default = "default_armor_class", alias = "enemy_defense")]
    pub armor_class: i32,
    #[serde(default, alias = "enemy_attack")]
    pub attack_bonus: i32,
    #[serde(default)]
    pub damage: DamageDice,
    #[serde(default)]
    pub element: ElementType,
    /// Zero disables staggering
    #[serde(default)]
    pub stagger_threshold: i32,
    #[serde(default)]
    pub moves: Vec<EnemyMove>,
    #[serde(default)]
    pub intents: Vec<IntentDef>,
}

impl EnemyConfig {
    pub fn new(name: impl Into<String>, hp: i32) -> Self {
        Self {
            name: name.into(),
            hp,
            max_hp: None,
            armor_class: DEFAULT_ARMOR_CLASS,
            attack_bonus: 0,
            damage: DamageDice::default(),
            element: ElementType::default(),
            stagger_threshold: 0,
            moves: Vec::new(),
            intents: Vec::new(),
        }
    }

    fn build(&self) -> Combatant {
        let max_hp = self.max_hp.unwrap_or(self.hp);
        let mut enemy = Combatant::new(self.name.clone(), Role::Enemy, max_hp)
            .with_armor_class(self.armor_class)
            .with_attack_bonus(self.attack_bonus)
            .with_damage(self.damage)
            .with_element(self.element)
            .with_stagger_threshold(self.stagger_threshold);
        enemy.hp = self.hp.clamp(1, enemy.max_hp);
        enemy
    }
}

/// Player stat overrides; unset fields keep the engine defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerOverrides {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "player_hp")]
    pub max_hp: Option<i32>,
    #[serde(default)]
    pub max_mana: Option<i32>,
    #[serde(default, alias = "player_defense")]
    pub armor_class: Option<i32>,
    #[serde(default, alias = "player_attack")]
    pub attack_bonus: Option<i32>,
    #[serde(default)]
    pub damage: Option<DamageDice>,
    #[serde(default)]
    pub element: Option<ElementType>,
    #[serde(default)]
    pub stagger_threshold: Option<i32>,
    /// Skills usable when the data tables do not know them
    #[serde(default)]
    pub skills: Vec<SkillDef>,
}

impl PlayerOverrides {
    fn build(&self) -> Combatant {
        let name = self.name.as_deref().unwrap_or(DEFAULT_PLAYER_NAME);
        Combatant::new(name, Role::Player, self.max_hp.unwrap_or(DEFAULT_PLAYER_HP))
            .with_mana(self.max_mana.unwrap_or(DEFAULT_PLAYER_MANA))
            .with_armor_class(self.armor_class.unwrap_or(DEFAULT_ARMOR_CLASS))
            .with_attack_bonus(self.attack_bonus.unwrap_or(DEFAULT_PLAYER_ATTACK))
            .with_damage(self.damage.unwrap_or_default())
            .with_element(self.element.unwrap_or_default())
            .with_stagger_threshold(self.stagger_threshold.unwrap_or(0))
    }
}

/// Everything needed to start one battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    pub enemy: EnemyConfig,
    #[serde(default)]
    pub player: PlayerOverrides,
    #[serde(flatten)]
    pub scenes: SceneTargets,
    /// Summon definitions used when the data tables cannot supply one
    #[serde(default)]
    pub summons: Vec<SummonDef>,
    /// Overrides the engine's battle style for this fight
    #[serde(default)]
    pub style: Option<StyleKind>,
    #[serde(default)]
    pub music: Option<String>,
}

impl BattleConfig {
    pub fn new(enemy: EnemyConfig, scenes: SceneTargets) -> Self {
        Self {
            enemy,
            player: PlayerOverrides::default(),
            scenes,
            summons: Vec::new(),
            style: None,
            music: None,
        }
    }

    pub fn with_player(mut self, player: PlayerOverrides) -> Self {
        self.player = player;
        self
    }

    /// Load from a TOML or JSON file, chosen by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Figment::from(Json::file(path)),
            _ => Figment::from(Toml::file(path)),
        };
        let config: BattleConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enemy.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }
        let enemy_max = self.enemy.max_hp.unwrap_or(self.enemy.hp);
        if self.enemy.hp <= 0 || enemy_max <= 0 {
            return Err(ConfigError::InvalidHp {
                who: self.enemy.name.clone(),
                hp: self.enemy.hp.min(enemy_max),
            });
        }
        if let Some(hp) = self.player.max_hp.filter(|hp| *hp <= 0) {
            return Err(ConfigError::InvalidHp {
                who: "player".to_string(),
                hp,
            });
        }
        if self.scenes.win.trim().is_empty() {
            return Err(ConfigError::MissingScene("win"));
        }
        if self.scenes.lose.trim().is_empty() {
            return Err(ConfigError::MissingScene("lose"));
        }
        Ok(())
    }

    pub fn build_player(&self) -> Combatant {
        self.player.build()
    }

    pub fn build_enemy(&self) -> Combatant {
        self.enemy.build()
    }

    /// Inline summon definition by id
    pub fn summon(&self, id: &str) -> Option<&SummonDef> {
        self.summons.iter().find(|s| s.id == id)
    }

    /// Inline player skill by id
    pub fn skill(&self, id: &str) -> Option<&SkillDef> {
        self.player.skills.iter().find(|s| s.id == id)
    }
}

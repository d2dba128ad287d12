//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `SKIRMISH_`-prefixed environment variables (`__` separates nested
//! keys, e.g. `SKIRMISH_RULES__FLEE_THRESHOLD=15`).

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::{DamageDice, DiceRoll, StyleKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Figment(#[from] figment::Error),

    #[error("{who} hp must be positive, got {hp}")]
    InvalidHp { who: String, hp: i32 },

    #[error("missing {0} scene target")]
    MissingScene(&'static str),

    #[error("enemy name must not be empty")]
    MissingName,
}

/// Fixed combat constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Minimum d20 roll to escape
    pub flee_threshold: u32,
    /// Enemy turns a defend stance lasts
    pub defend_turns: u32,
    /// AC added while defending
    pub defend_bonus: i32,
    /// Die size of confusion self-damage
    pub confusion_die: u32,
    /// Duration of confusion given by a confuse/fail reaction
    pub qte_confusion_turns: u32,
    /// Damage a parry reflects
    pub parry_reflect: i32,
    pub max_summons_per_side: usize,
    pub limit_max: u32,
    pub limit_break_dice: DamageDice,
    pub status_stack_cap: u32,
    /// Stun duration when a stagger meter fills
    pub stagger_turns: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            flee_threshold: 11,
            defend_turns: 2,
            defend_bonus: 4,
            confusion_die: 5,
            qte_confusion_turns: 2,
            parry_reflect: 3,
            max_summons_per_side: 2,
            limit_max: 100,
            limit_break_dice: DamageDice::Roll(DiceRoll::new(3, 8, 5)),
            status_stack_cap: 3,
            stagger_turns: 1,
        }
    }
}

/// Delays between turn phases, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub roll_beat_ms: u64,
    pub text_beat_ms: u64,
    pub enemy_delay_ms: u64,
    pub summon_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            roll_beat_ms: 600,
            text_beat_ms: 400,
            enemy_delay_ms: 800,
            summon_delay_ms: 500,
        }
    }
}

/// Optional subsystems; disabling one falls back to the plain roll loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub intents: bool,
    pub summons: bool,
    pub qte: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            intents: true,
            summons: true,
            qte: true,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rules: RulesConfig,
    pub timing: TimingConfig,
    pub style: StyleKind,
    pub features: FeatureFlags,
    /// Fixed dice seed; random when unset
    pub seed: Option<u64>,
}

impl EngineConfig {
    /// Defaults plus an optional TOML file, without the environment layer
    pub fn figment(path: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        match path {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        }
    }

    /// Load defaults, then `path`, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
        }
        let config = Self::figment(path)
            .merge(Env::prefixed("SKIRMISH_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Parse TOML text over the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::string(toml))
            .extract()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rules.flee_threshold, 11);
        assert_eq!(config.rules.defend_turns, 2);
        assert_eq!(config.rules.defend_bonus, 4);
        assert_eq!(config.rules.confusion_die, 5);
        assert_eq!(config.rules.limit_break_dice.to_string(), "3d8+5");
        assert_eq!(config.style, StyleKind::Classic);
        assert!(config.features.intents && config.features.summons && config.features.qte);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            style = "pokemon"

            [rules]
            flee_threshold = 15
            limit_break_dice = "2d10"

            [features]
            summons = false
            "#,
        )
        .unwrap();
        assert_eq!(config.style, StyleKind::Elemental);
        assert_eq!(config.rules.flee_threshold, 15);
        assert_eq!(config.rules.defend_turns, 2);
        assert_eq!(config.rules.limit_break_dice.max(), 20);
        assert!(!config.features.summons);
        assert!(config.features.intents);
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn test_bad_dice_rejected() {
        let err = EngineConfig::from_toml_str("[rules]\nlimit_break_dice = \"three\"").unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed = 42\n[timing]\nenemy_delay_ms = 10").unwrap();

        let config = EngineConfig::figment(Some(file.path())).extract::<EngineConfig>().unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.timing.enemy_delay_ms, 10);
        assert_eq!(config.timing.roll_beat_ms, 600);
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/skirmish.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }
}

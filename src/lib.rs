//! skirmish - turn-based combat resolution engine
//!
//! Decides, from player and enemy actions, dice, status effects,
//! telegraphed enemy intents, timed-input outcomes and summoned allies,
//! what happens each turn and when control returns to the player.
//! Rendering, narrative, audio, inventory and static data are external
//! collaborators reached through the traits in [`collab`] and [`data`].

pub mod battle;
pub mod collab;
pub mod combat;
pub mod config;
pub mod data;
pub mod intents;
pub mod qte;
pub mod summons;
pub mod timers;

pub use battle::{
    ActionError, Battle, BattleConfig, BattleEvent, BattleSession, EnemyConfig, Outcome, Phase,
    PlayerAction, PlayerOverrides, SceneTargets, Submission,
};
pub use collab::Capabilities;
pub use config::{ConfigError, EngineConfig};

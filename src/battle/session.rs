//! The aggregate state of one battle

use serde::Serialize;

use super::events::{BattleEvent, Outcome};
use super::pending::{Effect, Target};
use super::setup::BattleConfig;
use super::Phase;
use crate::combat::Combatant;
use crate::intents::IntentTracker;
use crate::summons::SummonRoster;

/// Owned exclusively by the orchestrator; subsystems receive borrows
#[derive(Debug, Clone, Serialize)]
pub struct BattleSession {
    pub player: Combatant,
    pub enemy: Combatant,
    pub summons: SummonRoster,
    pub intents: IntentTracker,
    /// Starts at 1, incremented once per full cycle
    pub turn: u32,
    pub phase: Phase,
    /// Decided by the player's last status tick
    pub player_can_act: bool,
    pub outcome: Option<Outcome>,
    #[serde(skip)]
    pub(crate) config: BattleConfig,
    /// Effects resolved but waiting for their presentation beat
    #[serde(skip)]
    pub(crate) staged: Vec<Effect>,
    #[serde(skip)]
    pub(crate) fled: bool,
    #[serde(skip)]
    pub(crate) events: Vec<BattleEvent>,
}

impl BattleSession {
    pub fn new(config: BattleConfig, max_summons_per_side: usize) -> Self {
        Self {
            player: config.build_player(),
            enemy: config.build_enemy(),
            summons: SummonRoster::new(max_summons_per_side),
            intents: IntentTracker::new(),
            turn: 1,
            phase: Phase::Player,
            player_can_act: true,
            outcome: None,
            config,
            staged: Vec::new(),
            fled: false,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub(crate) fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub(crate) fn combatant(&self, target: Target) -> Option<&Combatant> {
        match target {
            Target::Player => Some(&self.player),
            Target::Enemy => Some(&self.enemy),
            Target::Summon(id) => self.summons.get(id).map(|s| &s.combatant),
        }
    }

    pub(crate) fn combatant_mut(&mut self, target: Target) -> Option<&mut Combatant> {
        match target {
            Target::Player => Some(&mut self.player),
            Target::Enemy => Some(&mut self.enemy),
            Target::Summon(id) => self.summons.get_mut(id).map(|s| &mut s.combatant),
        }
    }

    /// Display name of a target, empty if it no longer exists
    pub(crate) fn name_of(&self, target: Target) -> String {
        self.combatant(target)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }
}

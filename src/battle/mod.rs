//! Turn orchestrator
//!
//! A phase state machine driving one battle at a time:
//!
//! ```text
//! Player --submit--> Animating --ApplyPlayer--> Enemy
//!    ^                                            |
//!    |   PlayerUpkeep <-- SummonTurns <-- EnemyUpkeep <-- ApplyEnemy <-- EnemyTurn
//!    +-------+
//! ```
//!
//! Every phase transition is a named [`Step`] that returns a [`Next`]
//! telling the orchestrator what to wait for: a scheduler delay, a
//! presentation cue, or the player. Only one action is ever in flight; the
//! guard taken at submission is released when the phase returns to
//! `Player`. The battle ends the moment any main combatant's HP reaches 0.

mod actions;
mod driver;
mod enemy;
mod events;
mod pending;
mod session;
mod setup;

pub use actions::PlayerAction;
pub use driver::{run_realtime, run_virtual};
pub use events::{BattleEvent, Outcome};
pub use pending::{hit_effects, periodic_effects, Effect, Target};
pub use session::BattleSession;
pub use setup::{BattleConfig, EnemyAction, EnemyConfig, EnemyMove, PlayerOverrides, SceneTargets};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collab::{Animation, Bars, Beat, Capabilities, CueId, RenderCommand};
use crate::combat::{BattleStyle, Combatant, Dice};
use crate::config::{ConfigError, EngineConfig};
use crate::data::{DataTables, SkillDef, SummonDef};
use crate::summons::{SpawnError, SummonId};
use crate::timers::Scheduler;

/// Where the battle is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Waiting for one player action
    Player,
    /// The player's action is locked in and resolving
    Animating,
    /// Enemy and summons are acting
    Enemy,
    Ended,
}

/// A discrete phase transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ApplyPlayer,
    EnemyTurn,
    ApplyEnemy,
    EnemyUpkeep,
    SummonTurns,
    PlayerUpkeep,
}

/// What a step asks the orchestrator to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    After(u64, Step),
    AwaitCue(CueId, Step),
    AwaitPlayer,
    Ended,
}

/// Why a player action was refused. Nothing changes when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("no battle in progress")]
    NoSession,

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("not enough mana: need {need}, have {have}")]
    NotEnoughMana { need: i32, have: i32 },

    #[error("cannot flee from this battle")]
    CannotFlee,

    #[error("limit break not ready ({charge}/{max})")]
    LimitNotReady { charge: u32, max: u32 },

    #[error("summon failed: {0}")]
    SummonFailed(#[from] SpawnError),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// How a submitted action was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The action is resolving
    Accepted,
    /// A preventing status cost the player this turn
    Skipped,
    /// Another action is still in flight
    Ignored,
}

/// The battle orchestrator
pub struct Battle {
    config: EngineConfig,
    style: Box<dyn BattleStyle>,
    dice: Dice,
    caps: Capabilities,
    scheduler: Scheduler<Step>,
    session: Option<BattleSession>,
    /// Held from submission until the phase returns to `Player`
    in_flight: bool,
    awaiting: Option<(CueId, Step)>,
    next_cue: u64,
}

impl Battle {
    pub fn new(config: EngineConfig, caps: Capabilities) -> Self {
        let dice = config.seed.map(Dice::seeded).unwrap_or_default();
        Self {
            style: config.style.build(),
            config,
            dice,
            caps,
            scheduler: Scheduler::new(),
            session: None,
            in_flight: false,
            awaiting: None,
            next_cue: 0,
        }
    }

    pub fn session(&self) -> Option<&BattleSession> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.session.as_ref().map(|s| s.phase)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.session.as_ref().and_then(|s| s.outcome)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn style(&self) -> &dyn BattleStyle {
        self.style.as_ref()
    }

    /// Dice source, for forcing rolls
    pub fn dice_mut(&mut self) -> &mut Dice {
        &mut self.dice
    }

    /// Virtual clock in milliseconds
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// Clock time of the next scheduled step
    pub fn next_fire_at(&self) -> Option<u64> {
        self.scheduler.next_fire_at()
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    /// Cue the battle is stalled on, if any
    pub fn awaiting_cue(&self) -> Option<CueId> {
        self.awaiting.map(|(cue, _)| cue)
    }

    /// Start a new battle, discarding any current one
    pub fn start(&mut self, battle: BattleConfig) -> Result<(), ConfigError> {
        battle.validate()?;
        self.reset();

        if let Some(style) = battle.style {
            self.style = style.build();
        }
        let music = battle.music.clone();
        let mut session = BattleSession::new(battle, self.config.rules.max_summons_per_side);
        info!(
            "Battle started: {} vs {} ({} style)",
            session.player.name,
            session.enemy.name,
            self.style.kind()
        );
        session.push(BattleEvent::Started {
            enemy: session.enemy.name.clone(),
            style: self.style.kind(),
        });
        self.session = Some(session);

        if let Some(music) = music {
            if let Err(e) = self.caps.audio.play_music(&music) {
                debug!("Music {} not played: {}", music, e);
            }
        }
        self.render_bars();
        Ok(())
    }

    /// Submit one player action
    pub fn submit(&mut self, action: PlayerAction) -> Result<Submission, ActionError> {
        let session = self.session.as_ref().ok_or(ActionError::NoSession)?;
        if self.in_flight || session.phase != Phase::Player {
            debug!("Ignoring {:?} while {:?}", action, session.phase);
            return Ok(Submission::Ignored);
        }

        let checked = self.check(&action)?;

        let can_act = session.player_can_act;
        let enemy_delay = self.config.timing.enemy_delay_ms;

        if !can_act {
            let Some(session) = self.session.as_mut() else {
                return Err(ActionError::NoSession);
            };
            self.in_flight = true;
            info!("{} cannot act this turn", session.player.name);
            session.push(BattleEvent::Skipped {
                actor: session.player.name.clone(),
            });
            session.phase = Phase::Enemy;
            self.dispatch(Next::After(enemy_delay, Step::EnemyTurn));
            return Ok(Submission::Skipped);
        }

        let prepared = self.prepare(checked)?;
        self.in_flight = true;
        if let Some(session) = self.session.as_mut() {
            session.staged = prepared.effects;
            session.phase = Phase::Animating;
        }
        debug!("Player action {:?} locked in", action);
        let next = self.beat(prepared.animation, prepared.delay, Step::ApplyPlayer);
        self.dispatch(next);
        Ok(Submission::Accepted)
    }

    /// Advance virtual time, running every step that comes due
    pub fn advance(&mut self, ms: u64) -> usize {
        let deadline = self.scheduler.now() + ms;
        let mut ran = 0;
        while let Some((_, step)) = self.scheduler.pop_due(deadline) {
            let next = self.run_step(step);
            self.dispatch(next);
            ran += 1;
        }
        self.scheduler.settle(deadline);
        ran
    }

    /// Report a presentation cue finished. Returns false for a stale cue.
    pub fn cue_finished(&mut self, cue: CueId) -> bool {
        match self.awaiting {
            Some((waiting, step)) if waiting == cue => {
                self.awaiting = None;
                self.scheduler.schedule(0, step);
                self.advance(0);
                true
            }
            _ => false,
        }
    }

    /// Freeze every pending step
    pub fn pause(&mut self) -> bool {
        self.scheduler.pause()
    }

    pub fn resume(&mut self) -> bool {
        self.scheduler.resume()
    }

    /// Tear down the session and cancel everything scheduled
    pub fn reset(&mut self) {
        self.scheduler.cancel_all();
        self.scheduler.resume();
        self.session = None;
        self.in_flight = false;
        self.awaiting = None;
        self.dice.clear_forced();
        self.style = self.config.style.build();
    }

    /// Take every event recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        self.session
            .as_mut()
            .map(|s| std::mem::take(&mut s.events))
            .unwrap_or_default()
    }

    /// Remove a summon from either side
    pub fn dismiss_summon(&mut self, id: SummonId) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.is_over() {
            return false;
        }
        match session.summons.dismiss(id) {
            Some(summon) => {
                debug!("Dismissed {} ({})", summon.name(), id);
                session.push(BattleEvent::SummonDismissed {
                    id,
                    name: summon.name().to_string(),
                });
                true
            }
            None => false,
        }
    }

    fn run_step(&mut self, step: Step) -> Next {
        if self.session.as_ref().map_or(true, |s| s.is_over()) {
            return Next::Ended;
        }
        debug!("Step {:?}", step);
        match step {
            Step::ApplyPlayer => self.apply_player(),
            Step::EnemyTurn => self.enemy_turn(),
            Step::ApplyEnemy => self.apply_enemy(),
            Step::EnemyUpkeep => self.enemy_upkeep(),
            Step::SummonTurns => self.summon_turns(),
            Step::PlayerUpkeep => self.player_upkeep(),
        }
    }

    fn dispatch(&mut self, next: Next) {
        match next {
            Next::After(delay, step) => {
                self.scheduler.schedule(delay, step);
            }
            Next::AwaitCue(cue, step) => {
                debug!("Waiting on {} before {:?}", cue, step);
                self.awaiting = Some((cue, step));
            }
            Next::AwaitPlayer => {
                if let Some(session) = self.session.as_mut() {
                    session.phase = Phase::Player;
                }
                self.in_flight = false;
                self.render_bars();
            }
            Next::Ended => self.finish(),
        }
    }

    /// Play an animation and decide how to wait for it
    fn beat(&mut self, animation: Animation, delay: u64, step: Step) -> Next {
        self.next_cue += 1;
        let cue = CueId(self.next_cue);
        match self.caps.presentation.play(cue, animation) {
            Beat::Immediate => Next::After(delay, step),
            Beat::Callback => Next::AwaitCue(cue, step),
        }
    }

    /// Apply effects and draw what changed. Returns true if the battle ended.
    fn apply(&mut self, effects: Vec<Effect>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return true;
        };
        let mark = session.events.len();
        let outcome = session.apply_effects(effects, &self.config.rules);
        for event in &session.events[mark..] {
            let command = match event {
                BattleEvent::Damaged { target, amount, .. } => RenderCommand::FloatingDamage {
                    target: target.clone(),
                    amount: *amount,
                    critical: false,
                },
                BattleEvent::Healed { target, amount, .. } => RenderCommand::FloatingHeal {
                    target: target.clone(),
                    amount: *amount,
                },
                BattleEvent::IntentBroken { intent, line, .. } => RenderCommand::Text {
                    line: line
                        .clone()
                        .unwrap_or_else(|| format!("{} was broken!", intent)),
                },
                BattleEvent::Staggered { target } => RenderCommand::Text {
                    line: format!("{} is staggered!", target),
                },
                _ => continue,
            };
            self.caps.presentation.render(command);
        }
        outcome.is_some()
    }

    fn apply_player(&mut self) -> Next {
        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };
        if session.fled {
            session.outcome = Some(Outcome::Fled);
            return Next::Ended;
        }
        let staged = std::mem::take(&mut session.staged);
        if self.apply(staged) {
            return Next::Ended;
        }
        if let Some(session) = self.session.as_mut() {
            session.phase = Phase::Enemy;
        }
        self.render_bars();
        Next::After(self.config.timing.enemy_delay_ms, Step::EnemyTurn)
    }

    fn finish(&mut self) {
        self.scheduler.cancel_all();
        self.awaiting = None;
        self.in_flight = false;

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.phase == Phase::Ended {
            return;
        }
        session.phase = Phase::Ended;
        let outcome = session.outcome.unwrap_or(Outcome::Defeat);
        let scene = match outcome {
            Outcome::Victory => session.config.scenes.win.clone(),
            Outcome::Defeat => session.config.scenes.lose.clone(),
            Outcome::Fled => session
                .config
                .scenes
                .flee
                .clone()
                .unwrap_or_else(|| session.config.scenes.lose.clone()),
        };
        info!("Battle ended: {:?} on turn {}, loading {}", outcome, session.turn, scene);
        session.push(BattleEvent::Ended {
            outcome,
            scene: scene.clone(),
        });

        self.render_bars();
        let sfx = match outcome {
            Outcome::Victory => "victory",
            Outcome::Defeat => "defeat",
            Outcome::Fled => "flee",
        };
        self.sfx(sfx);
        if outcome == Outcome::Victory {
            self.caps.narrative.mark_battle_won();
        }
        self.caps.narrative.load_scene(&scene, outcome);
    }

    fn render_bars(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let command = RenderCommand::Bars {
            player: bars(&session.player),
            enemy: bars(&session.enemy),
        };
        self.caps.presentation.render(command);
    }

    fn sfx(&mut self, name: &str) {
        if let Err(e) = self.caps.audio.play_sfx(name) {
            debug!("Sound {} not played: {}", name, e);
        }
    }

    /// Skill by id: data tables first, then the battle's inline skills
    fn find_skill(&self, id: &str) -> Option<SkillDef> {
        let inline = || {
            self.session
                .as_ref()
                .and_then(|s| s.config.skill(id).cloned())
                .map(|skill| self.caps.tables.tune_skill(skill))
        };
        table_skill(self.caps.tables.as_ref(), id).or_else(inline)
    }

    /// Summon by id: data tables first, then the battle's inline summons
    fn find_summon(&self, id: &str) -> Option<SummonDef> {
        let from_tables = match self.caps.tables.summon(id) {
            Ok(def) => def,
            Err(e) => {
                warn!("Summon table lookup for {} failed: {}", id, e);
                None
            }
        };
        from_tables.or_else(|| {
            self.session
                .as_ref()
                .and_then(|s| s.config.summon(id).cloned())
        })
    }
}

/// Look up a skill, treating an unavailable table as a miss. Its statuses
/// carry the tables' magnitudes.
fn table_skill(tables: &dyn DataTables, id: &str) -> Option<SkillDef> {
    match tables.skill(id) {
        Ok(skill) => skill.map(|s| tables.tune_skill(s)),
        Err(e) => {
            warn!("Skill table lookup for {} failed: {}", id, e);
            None
        }
    }
}

fn bars(c: &Combatant) -> Bars {
    Bars {
        name: c.name.clone(),
        hp: c.hp,
        max_hp: c.max_hp,
        mana: c.mana,
        max_mana: c.max_mana,
        statuses: c.statuses.iter().map(|s| s.status).collect(),
    }
}

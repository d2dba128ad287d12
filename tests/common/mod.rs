//! Common test utilities - SkirmishTest harness for end-to-end battles

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use skirmish::battle::{run_virtual, BattleEvent, Outcome, Phase, PlayerAction, Submission};
use skirmish::collab::{
    Animation, Audio, AudioError, Beat, CueId, Inventory, ItemBag, Narrative, Presentation,
    RenderCommand,
};
use skirmish::qte::{QteInput, QteRequest, QteTier};
use skirmish::{ActionError, Battle, BattleConfig, Capabilities, EngineConfig};

/// Everything the fake collaborators saw
#[derive(Debug, Default)]
pub struct Log {
    pub renders: Vec<RenderCommand>,
    pub animations: Vec<(CueId, Animation)>,
    pub scenes: Vec<(String, Outcome)>,
    pub won: u32,
    pub sounds: Vec<String>,
    pub qte_requests: Vec<QteRequest>,
}

pub type SharedLog = Rc<RefCell<Log>>;

pub struct RecordingPresentation {
    log: SharedLog,
    beat: Beat,
}

impl Presentation for RecordingPresentation {
    fn render(&mut self, command: RenderCommand) {
        self.log.borrow_mut().renders.push(command);
    }

    fn play(&mut self, cue: CueId, animation: Animation) -> Beat {
        self.log.borrow_mut().animations.push((cue, animation));
        self.beat
    }
}

pub struct RecordingNarrative(SharedLog);

impl Narrative for RecordingNarrative {
    fn load_scene(&mut self, scene: &str, outcome: Outcome) {
        self.0.borrow_mut().scenes.push((scene.to_string(), outcome));
    }

    fn mark_battle_won(&mut self) {
        self.0.borrow_mut().won += 1;
    }
}

/// Records every sound, then reports the device missing
pub struct BrokenAudio(SharedLog);

impl Audio for BrokenAudio {
    fn play_sfx(&mut self, name: &str) -> Result<(), AudioError> {
        self.0.borrow_mut().sounds.push(name.to_string());
        Err(AudioError::Unavailable)
    }

    fn play_music(&mut self, name: &str) -> Result<(), AudioError> {
        self.0.borrow_mut().sounds.push(name.to_string());
        Err(AudioError::Unavailable)
    }
}

/// Answers every timed-input request with the same tier
pub struct ScriptedQte {
    log: SharedLog,
    tier: QteTier,
}

impl QteInput for ScriptedQte {
    fn outcome(&mut self, request: &QteRequest) -> Option<QteTier> {
        self.log.borrow_mut().qte_requests.push(request.clone());
        Some(self.tier)
    }
}

/// Claims to hold everything but never gives anything up
pub struct StaleInventory;

impl Inventory for StaleInventory {
    fn has(&self, _item: &str) -> bool {
        true
    }

    fn consume(&mut self, _item: &str) -> bool {
        false
    }
}

/// Builder for a battle wired to recording collaborators
pub struct SkirmishTest {
    pub config: EngineConfig,
    pub log: SharedLog,
    beat: Beat,
    qte: Option<QteTier>,
    items: ItemBag,
    stale_inventory: bool,
    tables: Option<skirmish::data::Catalog>,
}

impl SkirmishTest {
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                seed: Some(7),
                ..EngineConfig::default()
            },
            log: SharedLog::default(),
            beat: Beat::Immediate,
            qte: None,
            items: ItemBag::new(),
            stale_inventory: false,
            tables: None,
        }
    }

    /// Presentation answers every animation with a callback cue
    pub fn with_callbacks(mut self) -> Self {
        self.beat = Beat::Callback;
        self
    }

    pub fn with_qte(mut self, tier: QteTier) -> Self {
        self.qte = Some(tier);
        self
    }

    pub fn with_item(mut self, item: &str, count: u32) -> Self {
        self.items.add(item, count);
        self
    }

    pub fn with_stale_inventory(mut self) -> Self {
        self.stale_inventory = true;
        self
    }

    pub fn with_tables(mut self, json: &str) -> Self {
        self.tables = Some(skirmish::data::Catalog::from_json_str(json).expect("bad catalog"));
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut EngineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Build the battle and start it from a JSON start configuration
    pub fn start(self, battle: Value) -> Harness {
        let log = self.log.clone();
        let mut caps = Capabilities::new()
            .with_presentation(RecordingPresentation {
                log: log.clone(),
                beat: self.beat,
            })
            .with_narrative(RecordingNarrative(log.clone()))
            .with_audio(BrokenAudio(log.clone()))
            .with_inventory(self.items);
        if self.stale_inventory {
            caps = caps.with_inventory(StaleInventory);
        }
        if let Some(tier) = self.qte {
            caps = caps.with_qte(ScriptedQte {
                log: log.clone(),
                tier,
            });
        }
        if let Some(tables) = self.tables {
            caps = caps.with_tables(tables);
        }

        let config: BattleConfig = serde_json::from_value(battle).expect("bad battle config");
        let mut battle = Battle::new(self.config, caps);
        battle.start(config).expect("battle failed to start");
        Harness { battle, log }
    }
}

pub struct Harness {
    pub battle: Battle,
    pub log: SharedLog,
}

impl Harness {
    /// Submit an action and run the cycle to completion in virtual time
    pub fn play(&mut self, action: PlayerAction) -> Vec<BattleEvent> {
        let submitted = self.battle.submit(action.clone());
        assert!(
            matches!(
                submitted,
                Ok(Submission::Accepted) | Ok(Submission::Skipped)
            ),
            "{} was not taken: {:?}",
            action,
            submitted
        );
        run_virtual(&mut self.battle);
        self.battle.drain_events()
    }

    /// Submit an action expected to be refused
    pub fn reject(&mut self, action: PlayerAction) -> ActionError {
        match self.battle.submit(action) {
            Err(e) => e,
            Ok(s) => panic!("expected a rejection, got {:?}", s),
        }
    }

    pub fn force_d20(&mut self, rolls: &[u32]) {
        for roll in rolls {
            self.battle.dice_mut().force_d20(*roll);
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        self.battle.phase()
    }

    pub fn player_hp(&self) -> i32 {
        self.battle.session().map_or(0, |s| s.player.hp)
    }

    pub fn enemy_hp(&self) -> i32 {
        self.battle.session().map_or(0, |s| s.enemy.hp)
    }
}

/// Attacks made by `attacker` in an event list
pub fn attacks_by<'a>(events: &'a [BattleEvent], attacker: &str) -> Vec<&'a BattleEvent> {
    events
        .iter()
        .filter(|e| matches!(e, BattleEvent::Attack { attacker: a, .. } if a == attacker))
        .collect()
}

//! External collaborators
//!
//! The engine talks to the outside world only through these traits:
//! - [`Presentation`]: bars, floating numbers and roll animations
//! - [`Narrative`]: scene loading at battle end
//! - [`Audio`]: fire-and-forget sound
//! - [`Inventory`]: item possession and consumption
//!
//! plus [`DataTables`] and [`QteInput`]. A [`Capabilities`] bundle is handed
//! to the battle at construction; anything not supplied falls back to an
//! inert stand-in so the core loop keeps running.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::battle::Outcome;
use crate::combat::{StatusType, D20};
use crate::data::{DataTables, UnavailableTables};
use crate::qte::QteInput;

/// Identifier of one animation the presentation layer was asked to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CueId(pub u64);

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cue-{}", self.0)
    }
}

/// How the presentation layer will signal that an animation is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Proceed after the configured beat delay
    Immediate,
    /// Wait for `Battle::cue_finished`
    Callback,
}

/// Snapshot of one combatant's bars
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bars {
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub statuses: Vec<StatusType>,
}

/// Stateless drawing instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "render", rename_all = "snake_case")]
pub enum RenderCommand {
    Bars { player: Bars, enemy: Bars },
    FloatingDamage { target: String, amount: i32, critical: bool },
    FloatingHeal { target: String, amount: i32 },
    IntentIcon { intent: Option<String> },
    Text { line: String },
}

/// Something the presentation layer animates before the battle moves on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "animation", rename_all = "snake_case")]
pub enum Animation {
    AttackRoll {
        attacker: String,
        roll: D20,
        total: i32,
        target_ac: i32,
        hit: bool,
    },
    HealRoll { target: String, amount: i32 },
    Text { line: String },
}

/// Rendering and animation sink
pub trait Presentation {
    fn render(&mut self, command: RenderCommand);

    /// Start an animation. With [`Beat::Callback`] the battle stalls until
    /// the host reports the cue finished.
    fn play(&mut self, cue: CueId, animation: Animation) -> Beat;
}

/// Scene engine hooks
pub trait Narrative {
    /// Called once when the battle ends
    fn load_scene(&mut self, scene: &str, outcome: Outcome);

    /// Called once, before `load_scene`, on victory
    fn mark_battle_won(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("unknown sound: {0}")]
    UnknownSound(String),

    #[error("audio device unavailable")]
    Unavailable,
}

/// Sound playback; errors are dropped by the engine
pub trait Audio {
    fn play_sfx(&mut self, name: &str) -> Result<(), AudioError>;
    fn play_music(&mut self, name: &str) -> Result<(), AudioError>;
}

/// Player inventory owned by the host
pub trait Inventory {
    fn has(&self, item: &str) -> bool;

    /// Remove one of `item`. Returns false if none was held.
    fn consume(&mut self, item: &str) -> bool;
}

/// Presentation that draws nothing and never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn render(&mut self, _command: RenderCommand) {}

    fn play(&mut self, _cue: CueId, _animation: Animation) -> Beat {
        Beat::Immediate
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullNarrative;

impl Narrative for NullNarrative {
    fn load_scene(&mut self, _scene: &str, _outcome: Outcome) {}
    fn mark_battle_won(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudio;

impl Audio for SilentAudio {
    fn play_sfx(&mut self, _name: &str) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }

    fn play_music(&mut self, _name: &str) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }
}

/// Simple counted inventory
#[derive(Debug, Clone, Default)]
pub struct ItemBag {
    items: HashMap<String, u32>,
}

impl ItemBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, item: impl Into<String>, count: u32) -> Self {
        self.add(item, count);
        self
    }

    pub fn add(&mut self, item: impl Into<String>, count: u32) {
        *self.items.entry(item.into()).or_insert(0) += count;
    }

    pub fn count(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }
}

impl Inventory for ItemBag {
    fn has(&self, item: &str) -> bool {
        self.count(item) > 0
    }

    fn consume(&mut self, item: &str) -> bool {
        match self.items.get_mut(item) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }
}

/// Everything the battle may call out to
pub struct Capabilities {
    pub presentation: Box<dyn Presentation>,
    pub narrative: Box<dyn Narrative>,
    pub audio: Box<dyn Audio>,
    pub tables: Box<dyn DataTables>,
    pub inventory: Box<dyn Inventory>,
    /// `None` resolves every attack from the roll alone
    pub qte: Option<Box<dyn QteInput>>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            presentation: Box::new(NullPresentation),
            narrative: Box::new(NullNarrative),
            audio: Box::new(SilentAudio),
            tables: Box::new(UnavailableTables),
            inventory: Box::new(ItemBag::new()),
            qte: None,
        }
    }
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_presentation(mut self, presentation: impl Presentation + 'static) -> Self {
        self.presentation = Box::new(presentation);
        self
    }

    pub fn with_narrative(mut self, narrative: impl Narrative + 'static) -> Self {
        self.narrative = Box::new(narrative);
        self
    }

    pub fn with_audio(mut self, audio: impl Audio + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_tables(mut self, tables: impl DataTables + 'static) -> Self {
        self.tables = Box::new(tables);
        self
    }

    pub fn with_inventory(mut self, inventory: impl Inventory + 'static) -> Self {
        self.inventory = Box::new(inventory);
        self
    }

    pub fn with_qte(mut self, qte: impl QteInput + 'static) -> Self {
        self.qte = Some(Box::new(qte));
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("qte", &self.qte.is_some())
            .finish_non_exhaustive()
    }
}

//! Battle notices for hosts and logs

use serde::Serialize;

use crate::combat::{AttackResult, StatusType, StyleKind, D20};
use crate::qte::{QtePath, QteTier};
use crate::summons::{Side, SummonId};

/// How a battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Victory,
    Defeat,
    Fled,
}

/// Everything observable that happened, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BattleEvent {
    Started {
        enemy: String,
        style: StyleKind,
    },
    Attack {
        attacker: String,
        defender: String,
        #[serde(rename = "move")]
        move_name: String,
        result: AttackResult,
    },
    Damaged {
        target: String,
        amount: i32,
        hp: i32,
    },
    Healed {
        target: String,
        amount: i32,
        hp: i32,
    },
    ManaRestored {
        target: String,
        amount: i32,
        mana: i32,
    },
    StatusApplied {
        target: String,
        status: StatusType,
        stacks: u32,
        remaining: u32,
    },
    StatusExpired {
        target: String,
        status: StatusType,
    },
    Cured {
        target: String,
        status: StatusType,
    },
    /// A preventing status cost this combatant its action
    Skipped {
        actor: String,
    },
    Staggered {
        target: String,
    },
    Defending {
        turns: u32,
    },
    StanceBroken,
    SkillUsed {
        skill: String,
        mana_cost: i32,
    },
    ItemUsed {
        item: String,
    },
    FleeAttempt {
        roll: D20,
        success: bool,
    },
    LimitBreak {
        damage: i32,
    },
    Qte {
        tier: QteTier,
        path: QtePath,
    },
    IntentAnnounced {
        intent: String,
        prep_turns: u32,
        line: Option<String>,
    },
    IntentCharging {
        intent: String,
        remaining: u32,
    },
    IntentExecuted {
        intent: String,
        damage: i32,
        hits: usize,
        halved: bool,
        line: Option<String>,
    },
    IntentBroken {
        intent: String,
        status: StatusType,
        line: Option<String>,
    },
    SummonSpawned {
        id: SummonId,
        name: String,
        side: Side,
    },
    SummonFailed {
        summoner: String,
        reason: String,
    },
    SummonExpired {
        id: SummonId,
        name: String,
    },
    SummonDefeated {
        id: SummonId,
        name: String,
    },
    SummonDismissed {
        id: SummonId,
        name: String,
    },
    Intercepted {
        summon: String,
        amount: i32,
    },
    TurnEnded {
        turn: u32,
    },
    Ended {
        outcome: Outcome,
        scene: String,
    },
}

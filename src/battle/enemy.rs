//! Enemy reaction, summon turns and end-of-cycle upkeep

use tracing::{debug, info};

use super::actions::{attack_event, roll_animation};
use super::events::BattleEvent;
use super::pending::{hit_effects, periodic_effects, Effect, Target};
use super::session::BattleSession;
use super::setup::EnemyAction;
use super::{table_skill, Battle, Next, Phase, Step};
use crate::collab::{Animation, RenderCommand};
use crate::combat::{tick_statuses, Move, StatusEffect, StatusType, TickReport};
use crate::intents::{resolve_intent, IntentTick};
use crate::qte::{QteModifiers, QtePath, QteRequest};
use crate::summons::{Side, SummonAction, SummonId};

/// Record expiry notices from a tick
fn push_expired(session: &mut BattleSession, target: Target, report: &TickReport) {
    let name = session.name_of(target);
    for status in &report.expired {
        debug!("{} on {} expired", status, name);
        session.push(BattleEvent::StatusExpired {
            target: name.clone(),
            status: *status,
        });
    }
}

impl Battle {
    /// The enemy's action window
    pub(super) fn enemy_turn(&mut self) -> Next {
        let intents_enabled = self.config.features.intents;
        let text_beat = self.config.timing.text_beat_ms;
        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };
        session.phase = Phase::Enemy;
        let defending = session.player.is_defending();

        if session.enemy.statuses.prevents_action() {
            // The stance still wears off on a skipped enemy turn
            if defending {
                session.player.consume_stance();
            }
            let name = session.enemy.name.clone();
            info!("{} cannot act", name);
            session.push(BattleEvent::Skipped { actor: name.clone() });
            let line = format!("{} cannot act!", name);
            return self.beat(Animation::Text { line }, text_beat, Step::EnemyUpkeep);
        }

        if intents_enabled && !session.config.enemy.intents.is_empty() {
            match session.intents.tick() {
                IntentTick::Ready { index } => return self.execute_intent(index, defending),
                IntentTick::Charging { remaining } => {
                    if let Some(pending) = session.intents.pending() {
                        let intent = pending.intent_id.clone();
                        session.push(BattleEvent::IntentCharging { intent, remaining });
                    }
                }
                IntentTick::Idle => {
                    let announced = session.intents.generate(
                        &session.config.enemy.intents,
                        &session.enemy,
                        &mut self.dice,
                        session.turn,
                    );
                    if let Some(index) = announced {
                        return self.announce_intent(index, defending);
                    }
                }
            }
        }

        self.enemy_move(defending)
    }

    /// The announcement is the enemy's whole action this cycle
    fn announce_intent(&mut self, index: usize, defending: bool) -> Next {
        let text_beat = self.config.timing.text_beat_ms;
        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };
        let Some(def) = session.config.enemy.intents.get(index).cloned() else {
            return Next::After(text_beat, Step::EnemyUpkeep);
        };
        if defending {
            session.player.consume_stance();
        }

        info!("{} announces {}", session.enemy.name, def.id);
        session.push(BattleEvent::IntentAnnounced {
            intent: def.id.clone(),
            prep_turns: def.prep_turns.max(1),
            line: def.dialogue.announce.clone(),
        });
        if def.telegraph {
            self.caps.presentation.render(RenderCommand::IntentIcon {
                intent: Some(def.id.clone()),
            });
        }
        let line = def
            .dialogue
            .announce
            .unwrap_or_else(|| format!("{} is preparing {}!", session.enemy.name, def.id));
        self.beat(Animation::Text { line }, text_beat, Step::EnemyUpkeep)
    }

    /// Always hits; halved and stance-consuming when the player defends
    fn execute_intent(&mut self, index: usize, defending: bool) -> Next {
        let roll_beat = self.config.timing.roll_beat_ms;
        let bound = {
            let Some(session) = self.session.as_ref() else {
                return Next::Ended;
            };
            session
                .config
                .enemy
                .intents
                .get(index)
                .and_then(|def| def.skill.as_deref())
                .and_then(|id| table_skill(self.caps.tables.as_ref(), id))
        };

        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };
        let Some(mut def) = session.config.enemy.intents.get(index).cloned() else {
            session.intents.complete(session.turn);
            return Next::After(roll_beat, Step::EnemyUpkeep);
        };
        def.status = def.status.as_ref().map(|s| self.caps.tables.tune(s));

        let outcome = resolve_intent(
            &def,
            bound.as_ref(),
            &session.enemy,
            &session.player,
            &mut self.dice,
        );
        if defending {
            session.player.consume_stance();
        }
        session.intents.complete(session.turn);

        let mut effects = Vec::new();
        for amount in &outcome.hits {
            effects.push(Effect::InterceptCheck {
                target: Target::Player,
                source: Target::Enemy,
                amount: *amount,
            });
        }
        for effect in &outcome.on_player {
            effects.push(Effect::ApplyStatus {
                target: Target::Player,
                effect: effect.clone(),
            });
        }
        if outcome.heal > 0 {
            effects.push(Effect::Heal {
                target: Target::Enemy,
                amount: outcome.heal,
            });
        }
        for effect in &outcome.on_enemy {
            effects.push(Effect::ApplyStatus {
                target: Target::Enemy,
                effect: effect.clone(),
            });
        }
        session.staged = effects;

        info!(
            "{} executes {}: {} damage over {} hits{}",
            session.enemy.name,
            def.id,
            outcome.total_damage(),
            outcome.hits.len(),
            if outcome.halved { " (halved)" } else { "" }
        );
        session.push(BattleEvent::IntentExecuted {
            intent: def.id.clone(),
            damage: outcome.total_damage(),
            hits: outcome.hits.len(),
            halved: outcome.halved,
            line: def.dialogue.execute.clone(),
        });
        let line = def
            .dialogue
            .execute
            .unwrap_or_else(|| format!("{} unleashes {}!", session.enemy.name, def.id));

        self.caps
            .presentation
            .render(RenderCommand::IntentIcon { intent: None });
        self.beat(Animation::Text { line }, roll_beat, Step::ApplyEnemy)
    }

    /// A regular move from the enemy's list, or its basic attack
    fn enemy_move(&mut self, defending: bool) -> Next {
        let text_beat = self.config.timing.text_beat_ms;
        let roll_beat = self.config.timing.roll_beat_ms;
        let summons_enabled = self.config.features.summons;

        let action = {
            let Some(session) = self.session.as_ref() else {
                return Next::Ended;
            };
            let moves = &session.config.enemy.moves;
            if moves.is_empty() {
                EnemyAction::Attack(Move::basic(&session.enemy))
            } else {
                let chosen = &moves[self.dice.pick(moves.len())];
                let skill = chosen
                    .skill
                    .as_deref()
                    .and_then(|id| table_skill(self.caps.tables.as_ref(), id));
                chosen.resolve(&session.enemy, skill.as_ref())
            }
        };

        match action {
            EnemyAction::Attack(mv) => self.enemy_attack(mv, defending),
            EnemyAction::Summon(id) if summons_enabled => {
                let def = self.find_summon(&id);
                let Some(session) = self.session.as_mut() else {
                    return Next::Ended;
                };
                if defending {
                    session.player.consume_stance();
                }
                let enemy = session.enemy.name.clone();
                let line = match def {
                    Some(def) => match session.summons.spawn(&def, &enemy, Side::Enemy) {
                        Ok(summon) => {
                            info!("{} summons {}", enemy, def.name);
                            session.push(BattleEvent::SummonSpawned {
                                id: summon,
                                name: def.name.clone(),
                                side: Side::Enemy,
                            });
                            format!("{} summons {}!", enemy, def.name)
                        }
                        Err(e) => {
                            debug!("{} failed to summon: {}", enemy, e);
                            session.push(BattleEvent::SummonFailed {
                                summoner: enemy.clone(),
                                reason: e.to_string(),
                            });
                            format!("{}'s summon fizzles!", enemy)
                        }
                    },
                    None => {
                        session.push(BattleEvent::SummonFailed {
                            summoner: enemy.clone(),
                            reason: format!("summon not found: {}", id),
                        });
                        format!("{}'s summon fizzles!", enemy)
                    }
                };
                self.beat(Animation::Text { line }, text_beat, Step::EnemyUpkeep)
            }
            EnemyAction::Summon(_) => {
                // Summons disabled: fall back to a plain attack
                let Some(session) = self.session.as_ref() else {
                    return Next::Ended;
                };
                let mv = Move::basic(&session.enemy);
                self.enemy_attack(mv, defending)
            }
            EnemyAction::Heal(amount) => {
                let Some(session) = self.session.as_mut() else {
                    return Next::Ended;
                };
                if defending {
                    session.player.consume_stance();
                }
                session.staged = vec![Effect::Heal {
                    target: Target::Enemy,
                    amount,
                }];
                let animation = Animation::HealRoll {
                    target: session.enemy.name.clone(),
                    amount,
                };
                self.beat(animation, roll_beat, Step::ApplyEnemy)
            }
        }
    }

    /// Roll-based enemy attack, with a timed reaction when the style asks
    fn enemy_attack(&mut self, mut mv: Move, defending: bool) -> Next {
        mv.status = mv.status.as_ref().map(|s| self.caps.tables.tune(s));
        let rules = &self.config.rules;
        let roll_beat = self.config.timing.roll_beat_ms;
        let path = if defending {
            QtePath::Defend
        } else {
            QtePath::Dodge
        };
        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };

        let mut qte = None;
        if self.config.features.qte && self.style.solicits_qte(path) {
            if let Some(input) = self.caps.qte.as_mut() {
                let request = QteRequest {
                    attacker: session.enemy.name.clone(),
                    defender: session.player.name.clone(),
                    move_name: mv.name.clone(),
                    path,
                };
                qte = input.outcome(&request).map(|tier| QteModifiers {
                    tier,
                    path,
                    reflect_damage: rules.parry_reflect,
                    confusion: StatusEffect::new(StatusType::Confusion, rules.qte_confusion_turns, 0),
                });
            }
        }

        let result = self.style.resolve(
            &mut self.dice,
            &session.enemy,
            &session.player,
            &mv,
            rules.defend_bonus,
            qte,
        );

        if defending {
            session.player.consume_stance();
        }
        if result.breaks_stance && session.player.is_defending() {
            session.player.defending_turns_remaining = 0;
            session.push(BattleEvent::StanceBroken);
        }

        let enemy = session.enemy.name.clone();
        let player = session.player.name.clone();
        session.push(attack_event(&enemy, &player, &mv, &result));
        if let Some(tier) = result.qte {
            session.push(BattleEvent::Qte { tier, path });
        }
        session.staged = hit_effects(Target::Player, Target::Enemy, &result);

        let animation = roll_animation(&enemy, &result);
        self.beat(animation, roll_beat, Step::ApplyEnemy)
    }

    pub(super) fn apply_enemy(&mut self) -> Next {
        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };
        let staged = std::mem::take(&mut session.staged);
        if self.apply(staged) {
            return Next::Ended;
        }
        self.render_bars();
        Next::After(self.config.timing.text_beat_ms, Step::EnemyUpkeep)
    }

    /// Enemy status tick, after its own action
    pub(super) fn enemy_upkeep(&mut self) -> Next {
        let confusion_die = self.config.rules.confusion_die;
        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };
        let report = tick_statuses(&mut session.enemy, &mut self.dice, confusion_die);
        push_expired(session, Target::Enemy, &report);
        let has_summons = !session.summons.is_empty();

        if self.apply(periodic_effects(Target::Enemy, &report)) {
            return Next::Ended;
        }
        if has_summons {
            Next::After(self.config.timing.summon_delay_ms, Step::SummonTurns)
        } else {
            Next::After(0, Step::PlayerUpkeep)
        }
    }

    /// Every summon acts once, player side first, then ticks its duration
    pub(super) fn summon_turns(&mut self) -> Next {
        let defend_bonus = self.config.rules.defend_bonus;
        let ids: Vec<SummonId> = match self.session.as_ref() {
            Some(session) => session
                .summons
                .ids(Side::Player)
                .into_iter()
                .chain(session.summons.ids(Side::Enemy))
                .collect(),
            None => return Next::Ended,
        };

        for id in ids {
            let Some(session) = self.session.as_mut() else {
                return Next::Ended;
            };
            let Some(summon) = session.summons.get(id) else {
                continue;
            };
            let side = summon.side;
            let attacker = summon.combatant.clone();
            let owner = match side {
                Side::Player => Target::Player,
                Side::Enemy => Target::Enemy,
            };
            let opponent = match side.opposing() {
                Side::Player => Target::Player,
                Side::Enemy => Target::Enemy,
            };

            let effects = match summon.action() {
                SummonAction::Attack(mv) => {
                    let defender = match opponent {
                        Target::Player => &session.player,
                        _ => &session.enemy,
                    };
                    let result = self.style.resolve(
                        &mut self.dice,
                        &attacker,
                        defender,
                        &mv,
                        defend_bonus,
                        None,
                    );
                    let defender = defender.name.clone();
                    session.push(attack_event(&attacker.name, &defender, &mv, &result));
                    hit_effects(opponent, Target::Summon(id), &result)
                }
                SummonAction::HealOwner(amount) => vec![Effect::Heal {
                    target: owner,
                    amount,
                }],
                SummonAction::Hold => Vec::new(),
            };

            if self.apply(effects) {
                return Next::Ended;
            }

            let Some(session) = self.session.as_mut() else {
                return Next::Ended;
            };
            let expired = session.summons.get_mut(id).is_some_and(|s| s.tick());
            if expired {
                if let Some(summon) = session.summons.dismiss(id) {
                    debug!("{} ({}) leaves the battle", summon.name(), id);
                    session.push(BattleEvent::SummonExpired {
                        id,
                        name: summon.name().to_string(),
                    });
                }
            }
        }

        self.render_bars();
        Next::After(self.config.timing.text_beat_ms, Step::PlayerUpkeep)
    }

    /// Player status tick, then control returns to the player
    pub(super) fn player_upkeep(&mut self) -> Next {
        let confusion_die = self.config.rules.confusion_die;
        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };
        let report = tick_statuses(&mut session.player, &mut self.dice, confusion_die);
        session.player_can_act = report.can_act;
        push_expired(session, Target::Player, &report);

        if self.apply(periodic_effects(Target::Player, &report)) {
            return Next::Ended;
        }

        let Some(session) = self.session.as_mut() else {
            return Next::Ended;
        };
        let turn = session.turn;
        session.push(BattleEvent::TurnEnded { turn });
        session.turn += 1;
        debug!("Turn {} complete", turn);
        Next::AwaitPlayer
    }
}

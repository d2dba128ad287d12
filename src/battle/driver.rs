//! Clock drivers for a battle's scheduler
//!
//! The orchestrator never waits on its own. A host either fast-forwards
//! virtual time or feeds it wall-clock time from tokio.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::Battle;

/// Fire every scheduled step immediately until the battle needs the player,
/// waits on a presentation cue, is paused, or ends. Returns the virtual time
/// that passed.
pub fn run_virtual(battle: &mut Battle) -> u64 {
    let start = battle.now();
    while let Some(at) = battle.next_fire_at() {
        let wait = at.saturating_sub(battle.now());
        battle.advance(wait);
    }
    battle.now() - start
}

/// Like [`run_virtual`], but each step fires after its real delay
pub async fn run_realtime(battle: &mut Battle) -> u64 {
    let start = battle.now();
    let origin = Instant::now();
    while let Some(at) = battle.next_fire_at() {
        let wait = at.saturating_sub(battle.now());
        let deadline = origin + Duration::from_millis(at - start);
        debug!("Sleeping {}ms until next step", wait);
        sleep_until(deadline).await;
        battle.advance(wait);
    }
    battle.now() - start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{BattleConfig, EnemyConfig, Phase, PlayerAction, SceneTargets};
    use crate::collab::Capabilities;
    use crate::config::EngineConfig;

    fn battle() -> Battle {
        let config = EngineConfig {
            seed: Some(9),
            ..EngineConfig::default()
        };
        let mut battle = Battle::new(config, Capabilities::default());
        let mut enemy = EnemyConfig::new("dummy", 500);
        enemy.damage = "1d2".parse().unwrap();
        battle
            .start(BattleConfig::new(enemy, SceneTargets::new("win", "lose")))
            .unwrap();
        battle
    }

    #[test]
    fn test_virtual_cycle_returns_to_player() {
        let mut battle = battle();
        battle.submit(PlayerAction::Defend).unwrap();
        let elapsed = run_virtual(&mut battle);
        assert!(elapsed > 0);
        assert_eq!(battle.phase(), Some(Phase::Player));
        assert_eq!(battle.session().unwrap().turn, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_follows_tokio_clock() {
        let mut battle = battle();
        battle.submit(PlayerAction::Defend).unwrap();
        let before = Instant::now();
        let elapsed = run_realtime(&mut battle).await;
        assert_eq!(before.elapsed(), Duration::from_millis(elapsed));
        assert_eq!(battle.phase(), Some(Phase::Player));
    }
}

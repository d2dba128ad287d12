//! skirmish - play a scripted battle headless and print its event log

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish::battle::{run_realtime, run_virtual, Outcome, Phase, PlayerAction, Submission};
use skirmish::collab::{ItemBag, Narrative};
use skirmish::data::Catalog;
use skirmish::{Battle, BattleConfig, Capabilities, EngineConfig};

/// Turn-based combat engine runner
#[derive(Parser, Debug)]
#[command(name = "skirmish", version, about = "Play a scripted battle and print its events")]
struct Args {
    /// Battle start configuration (TOML or JSON)
    #[arg(short, long)]
    battle: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data tables catalog (JSON)
    #[arg(short, long)]
    tables: Option<PathBuf>,

    /// Dice seed
    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated actions: attack, defend, flee, limit, skill:<id>, item:<id>
    #[arg(short, long, value_delimiter = ',', default_value = "attack")]
    script: Vec<String>,

    /// Repeat the script until the battle ends
    #[arg(long)]
    repeat: bool,

    /// Stop after this many turns
    #[arg(long, default_value_t = 200)]
    max_turns: u32,

    /// Inventory entries as <id> or <id>=<count> (can be specified multiple times)
    #[arg(long = "item")]
    items: Vec<String>,

    /// Force the first d20 rolls, in order
    #[arg(long = "force-d20", value_delimiter = ',')]
    force_d20: Vec<u32>,

    /// Wait out each phase delay in real time
    #[arg(long)]
    realtime: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

/// Logs the scene the narrative engine would load
struct SceneLog;

impl Narrative for SceneLog {
    fn load_scene(&mut self, scene: &str, outcome: Outcome) {
        info!("Loading scene {} after {:?}", scene, outcome);
    }

    fn mark_battle_won(&mut self) {
        info!("Battle marked as won");
    }
}

fn parse_items(entries: &[String]) -> Result<ItemBag> {
    let mut bag = ItemBag::new();
    for entry in entries {
        let (id, count) = match entry.split_once('=') {
            Some((id, count)) => {
                let count = count
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid item count in {}", entry))?;
                (id.trim(), count)
            }
            None => (entry.trim(), 1),
        };
        if id.is_empty() {
            bail!("Empty item id in {}", entry);
        }
        bag.add(id, count);
    }
    Ok(bag)
}

fn print_events(battle: &mut Battle) -> Result<()> {
    for event in battle.drain_events() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

async fn settle(battle: &mut Battle, realtime: bool) {
    if realtime {
        run_realtime(battle).await;
    } else {
        run_virtual(battle);
    }
}

/// Why a scripted run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Ended,
    TurnLimit,
    ScriptDone,
    /// A full pass of the script was refused
    Stuck,
}

async fn play_script(
    battle: &mut Battle,
    actions: &[PlayerAction],
    repeat: bool,
    max_turns: u32,
    realtime: bool,
) -> Result<Stop> {
    let passes = if repeat { usize::MAX } else { 1 };
    let mut script = actions
        .iter()
        .cycle()
        .take(actions.len().saturating_mul(passes));
    let mut refused = 0;

    while battle.phase() == Some(Phase::Player) {
        let turn = battle.session().map_or(0, |s| s.turn);
        if turn > max_turns {
            warn!("Stopping after {} turns", max_turns);
            return Ok(Stop::TurnLimit);
        }
        let Some(action) = script.next() else {
            info!("Script finished with the battle still running");
            return Ok(Stop::ScriptDone);
        };

        match battle.submit(action.clone()) {
            Ok(Submission::Ignored) => {
                warn!("{} ignored", action);
                refused += 1;
            }
            Ok(_) => {
                refused = 0;
                settle(battle, realtime).await;
            }
            Err(e) => {
                warn!("{} rejected: {}", action, e);
                refused += 1;
            }
        }
        print_events(battle)?;

        if refused >= actions.len() {
            warn!("Every scripted action was refused, stopping");
            return Ok(Stop::Stuck);
        }
    }
    Ok(Stop::Ended)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "skirmish=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    let mut config = EngineConfig::load(args.config.as_deref())?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let battle_config = BattleConfig::load(&args.battle)
        .with_context(|| format!("Failed to load battle {}", args.battle.display()))?;

    let mut caps = Capabilities::new()
        .with_narrative(SceneLog)
        .with_inventory(parse_items(&args.items)?);
    if let Some(path) = &args.tables {
        let catalog = Catalog::load(path)
            .with_context(|| format!("Failed to load tables {}", path.display()))?;
        caps = caps.with_tables(catalog);
    }

    let actions = args
        .script
        .iter()
        .map(|s| s.parse::<PlayerAction>())
        .collect::<Result<Vec<_>, _>>()?;
    if actions.is_empty() {
        bail!("Script is empty");
    }

    let mut battle = Battle::new(config, caps);
    battle.start(battle_config)?;
    for value in &args.force_d20 {
        battle.dice_mut().force_d20(*value);
    }
    print_events(&mut battle)?;

    let stop = play_script(
        &mut battle,
        &actions,
        args.repeat,
        args.max_turns,
        args.realtime,
    )
    .await?;
    debug!("Script stopped: {:?}", stop);

    match battle.outcome() {
        Some(outcome) => info!("Outcome: {:?}", outcome),
        None => info!("No outcome"),
    }
    Ok(())
}

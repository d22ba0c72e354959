//! Minigame Arena Server
//!
//! Standalone engine process. Registers the duel templates, starts the arena
//! scheduler and plays one demo duel against a logging host.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use minigame_arena::{
    core::{Clock, SystemClock},
    default_providers,
    game::{ParticipantHost, Position, TracingHost},
    ArenaManager, ArenaScheduler, DuelSettings, DuelTemplate, EngineConfig, ParticipantId, Phase,
    TemplateRegistry, VERSION,
};

/// Environment variable pointing at a JSON list of duel templates.
const TEMPLATES_PATH_ENV: &str = "DUEL_TEMPLATES_PATH";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Minigame Arena v{}", VERSION);

    let config = EngineConfig::from_env();
    info!(
        "Tick period: {} ms, scheduling: {:?}, arena prefix: {}",
        config.tick_period.as_millis(),
        config.scheduling,
        config.name_prefix
    );

    let host: Arc<dyn ParticipantHost> = Arc::new(TracingHost);
    let templates = Arc::new(TemplateRegistry::new());
    for settings in load_duel_settings() {
        let template = DuelTemplate::new(settings, host.clone())
            .context("Invalid duel template")?;
        templates.register(Arc::new(template));
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let manager = Arc::new(ArenaManager::new(
        config,
        templates,
        default_providers(clock),
    ));
    manager.init();

    let scheduler = ArenaScheduler::new(manager.clone());
    let handle = scheduler.spawn();

    let result = demo_match(&manager).await;

    scheduler.shutdown();
    handle.await.context("Scheduler task failed")?;
    manager.clear();

    result
}

/// Duel templates from `DUEL_TEMPLATES_PATH`, or the built-in quick duel.
fn load_duel_settings() -> Vec<DuelSettings> {
    match std::env::var(TEMPLATES_PATH_ENV) {
        Ok(path) => match read_templates(Path::new(&path)) {
            Ok(templates) if !templates.is_empty() => {
                info!("Loaded {} duel template(s) from {}", templates.len(), path);
                return templates;
            }
            Ok(_) => warn!("{} lists no templates, using built-in duel", path),
            Err(e) => warn!("Could not load {}: {:#}, using built-in duel", path, e),
        },
        Err(_) => info!("{} not set, using built-in duel", TEMPLATES_PATH_ENV),
    }

    vec![DuelSettings {
        waiting_seconds: 3,
        ending_seconds: 2,
        spawns: DuelSettings::default()
            .spawns
            .into_iter()
            .chain([Position::new(0.5, 65.0, 10.5)])
            .collect(),
        ..Default::default()
    }]
}

fn read_templates(path: &Path) -> Result<Vec<DuelSettings>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let templates: Vec<DuelSettings> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(templates)
}

/// Play one duel: three participants join, two are eliminated.
async fn demo_match(manager: &ArenaManager) -> Result<()> {
    info!("=== Starting Demo Duel ===");

    let template_id = manager
        .templates()
        .ids()
        .into_iter()
        .next()
        .context("No templates registered")?;

    let names = ["alice", "bob", "carol"];
    let participants: Vec<ParticipantId> =
        names.iter().map(|n| ParticipantId::from_name(n)).collect();

    let arena = manager
        .create_arena_with_template(&template_id, Some(participants[0]))
        .context("Failed to create demo arena")?;
    let name = arena.name().to_string();
    info!("Arena {} created from template {}", name, template_id);

    wait_for(manager, &name, Phase::Waiting).await?;
    for (participant, n) in participants.iter().zip(names) {
        let response = manager.join(&name, *participant)?;
        info!("{} ({}) join: {:?}", n, participant, response);
    }

    wait_for(manager, &name, Phase::InGame).await?;
    let game = arena.game()?;
    for participant in &participants[1..] {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let outcome = game.eliminate(*participant);
        info!("Eliminated {}: {:?}", participant, outcome);
    }

    wait_for(manager, &name, Phase::Ending).await?;
    let status = game.status();
    info!("Final status: {}", serde_json::to_string(&status)?);

    while manager.get_arena(&name).is_some() {
        tokio::time::sleep(manager.config().tick_period).await;
    }
    info!("Arena {} removed after {} ticks", name, arena.tick_count());

    Ok(())
}

/// Poll until the arena reaches `phase`.
async fn wait_for(manager: &ArenaManager, name: &str, phase: Phase) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    loop {
        let arena = manager
            .get_arena(name)
            .with_context(|| format!("arena {} disappeared before {}", name, phase))?;
        if arena.phase() == phase {
            info!("Arena {} is now {}", name, phase);
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("arena {} stuck in {}", name, arena.phase());
        }
        tokio::time::sleep(manager.config().tick_period).await;
    }
}

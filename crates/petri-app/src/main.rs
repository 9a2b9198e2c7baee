//! Headless arena driver: runs the simulation with a scripted pilot and
//! logs per-interval summaries. Useful for soak runs and profiling
//! without a rendering front end.

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use petri_core::{AbilityKey, ArenaConfig, ClassKind, InputFrame, Vec2, World};

const LOG_INTERVAL: u64 = 120;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => {
            let value = raw
                .parse()
                .ok()
                .with_context(|| format!("{key} is not a valid value: {raw}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

fn env_class(key: &str) -> Result<Option<ClassKind>> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    ClassKind::ALL
        .iter()
        .copied()
        .find(|kind| format!("{kind:?}").eq_ignore_ascii_case(&raw))
        .map(Some)
        .with_context(|| format!("{key} names an unknown class: {raw}"))
}

/// Deterministic stand-in for a human player: chases the nearest food,
/// splits and ejects opportunistically, picks a class once the picker
/// unlocks, and fires abilities on a jittered timer.
struct ScriptedPilot {
    rng: SmallRng,
    class: ClassKind,
    next_ability_tick: u64,
}

impl ScriptedPilot {
    fn new(seed: u64, class: ClassKind) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            class,
            next_ability_tick: 600,
        }
    }

    fn frame(&mut self, world: &World) -> InputFrame {
        if !world.player.alive {
            let mut input = InputFrame::at_cursor(world.camera.screen_size() * 0.5);
            input.respawn = true;
            return input;
        }

        let tick = world.tick().0;
        let centroid = world.player.centroid();
        let mass = world.player.total_mass();

        let target = world
            .food
            .iter()
            .min_by(|a, b| {
                a.position
                    .distance(centroid)
                    .total_cmp(&b.position.distance(centroid))
            })
            .map(|pellet| pellet.position)
            .unwrap_or(centroid);
        let jitter = Vec2::new(
            self.rng.random_range(-30.0..30.0),
            self.rng.random_range(-30.0..30.0),
        );
        let mut input = InputFrame::at_cursor(world.camera.world_to_screen(target + jitter));

        input.split = mass > world.config.min_split_mass * 4.0
            && world.player.cell_count() < 4
            && self.rng.random_bool(0.01);
        input.eject = mass > world.config.min_eject_mass * 3.0 && self.rng.random_bool(0.05);

        if world.class.is_none() && mass > world.config.class_pick_mass {
            input.select_class = Some(self.class);
        }
        if world.class.is_some() && tick >= self.next_ability_tick {
            let abilities = self.class.abilities();
            input.ability = Some(abilities[self.rng.random_range(0..abilities.len())]);
            self.next_ability_tick = tick + self.rng.random_range(300..900);
        }
        if world.class.is_some() && tick % 1_800 == 0 {
            input.upgrade = Some(self.class.abilities()[0]);
        }
        input
    }
}

fn log_ability(fired: Option<AbilityKey>, tick: u64) {
    if let Some(key) = fired {
        debug!(tick, ability = ?key, "ability fired");
    }
}

fn main() -> Result<()> {
    init_tracing();

    let seed: u64 = env_parse("PETRI_SEED")?.unwrap_or(0xA11CE);
    let ticks: u64 = env_parse("PETRI_TICKS")?.unwrap_or(7_200);
    let class = env_class("PETRI_CLASS")?.unwrap_or(ClassKind::Necromancer);

    let mut config = ArenaConfig {
        rng_seed: Some(seed),
        ..ArenaConfig::default()
    };
    if let Some(bots) = env_parse::<usize>("PETRI_BOTS")? {
        config.initial_bots = bots;
        config.max_bots = bots.max(config.max_bots);
    }

    let mut world = World::new(config).context("failed to build the arena")?;
    let mut pilot = ScriptedPilot::new(seed ^ 0x5EED, class);
    info!(seed, ticks, class = ?class, bots = world.bots.len(), "arena primed");

    let mut deaths = 0u64;
    for _ in 0..ticks {
        let input = pilot.frame(&world);
        let events = world.step(&input);
        log_ability(events.ability_fired, events.tick);
        if let Some(kind) = events.class_selected {
            info!(tick = events.tick, class = ?kind, "class selected");
        }
        if events.player_died {
            deaths += 1;
            info!(tick = events.tick, deaths, "pilot died");
        }
        if events.tick % LOG_INTERVAL == 0
            && let Some(summary) = world.latest_summary()
        {
            info!(
                tick = summary.tick,
                mass = summary.player_mass,
                cells = summary.player_cells,
                bots = summary.bots,
                zombies = summary.zombies,
                employees = summary.employees,
                eaten = summary.eaten,
                "arena status"
            );
        }
    }

    if let Some(summary) = world.latest_summary() {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    info!(ticks, deaths, "run complete");
    Ok(())
}

//! Steering AI: free-roaming bots and the owner-bound swarm units.
//!
//! Planning is split from application so the per-actor scans can run in
//! parallel: [`plan_bot`] is a pure function over read-only views of the
//! arena, while the serial apply step owns the RNG (wander targets, state
//! timers) and mutates bodies. Keeping RNG out of the parallel stage keeps
//! ticks reproducible under a fixed seed.

use crate::config::ArenaConfig;
use crate::geom::{Vec2, max_speed_for_mass};
use crate::transient::Food;
use crate::{BotId, CellId, EmployeeId, ZombieId};
use crate::body::Body;
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Tagged handle to any living actor, revalidated against the arenas
/// every tick before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRef {
    PlayerCell(CellId),
    Bot(BotId),
    Zombie(ZombieId),
    Employee(EmployeeId),
}

/// Read-only view of one living actor, snapshotted for the planning pass.
#[derive(Debug, Clone, Copy)]
pub struct ActorView {
    pub reference: ActorRef,
    pub position: Vec2,
    pub mass: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Personality {
    Timid,
    Aggressive,
    Opportunist,
}

impl Personality {
    pub(crate) fn roll(rng: &mut SmallRng) -> Self {
        match rng.random_range(0..3u8) {
            0 => Personality::Timid,
            1 => Personality::Aggressive,
            _ => Personality::Opportunist,
        }
    }
}

/// A free-roaming autonomous bot.
#[derive(Debug, Clone)]
pub struct Bot {
    pub body: Body,
    pub name: String,
    pub personality: Personality,
    /// Current steering target in world coordinates.
    pub target: Vec2,
    /// Persistent prey lock for aggressive hunters.
    pub hunting: Option<ActorRef>,
}

impl Bot {
    #[must_use]
    pub fn new(
        position: Vec2,
        mass: f32,
        color: [u8; 3],
        name: String,
        personality: Personality,
    ) -> Self {
        Self {
            body: Body::new(position, mass, color),
            name,
            personality,
            target: position,
            hunting: None,
        }
    }
}

/// What the planning pass decided a bot wants this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BotDesire {
    /// Head away from a threat at this position.
    Flee(Vec2),
    /// Chase a live actor, locking it as prey.
    Hunt(ActorRef, Vec2),
    /// Head to a food pellet.
    Food(Vec2),
    /// Nothing urgent; keep or refresh the wander target.
    Wander,
}

fn nearest_actor<'a>(
    from: Vec2,
    actors: &'a [ActorView],
    mut keep: impl FnMut(&ActorView) -> bool,
) -> Option<&'a ActorView> {
    let mut best: Option<(&ActorView, f32)> = None;
    for actor in actors {
        if !keep(actor) {
            continue;
        }
        let dist = from.distance(actor.position);
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((actor, dist));
        }
    }
    best.map(|(actor, _)| actor)
}

fn nearest_food(from: Vec2, food: &[Food]) -> Option<Vec2> {
    let mut best: Option<(Vec2, f32)> = None;
    for pellet in food {
        let dist = from.distance(pellet.position);
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((pellet.position, dist));
        }
    }
    best.map(|(position, _)| position)
}

/// Nearest pellet with no out-eating threat within `threat.radius + margin`
/// of it. Swarm units use this so they never graze inside a predator's
/// reach.
#[must_use]
pub fn nearest_safe_food(
    from: Vec2,
    self_mass: f32,
    food: &[Food],
    actors: &[ActorView],
    margin: f32,
) -> Option<Vec2> {
    let mut best: Option<(Vec2, f32)> = None;
    'pellets: for pellet in food {
        for actor in actors {
            if actor.mass > self_mass * 1.1
                && actor.position.distance(pellet.position) < actor.radius + margin
            {
                continue 'pellets;
            }
        }
        let dist = from.distance(pellet.position);
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((pellet.position, dist));
        }
    }
    best.map(|(position, _)| position)
}

/// Inverse-square repulsion from every threat inside the dodge range.
/// Dominates seek steering only at short distances.
#[must_use]
pub fn flee_field(from: Vec2, threats: &[ActorView], dodge_range: f32, weight: f32) -> Vec2 {
    let mut sum = Vec2::ZERO;
    for threat in threats {
        let away = from - threat.position;
        let dist_sq = away.length_sq();
        if dist_sq >= dodge_range * dodge_range {
            continue;
        }
        sum += away.normalized() * (weight / dist_sq.max(1.0));
    }
    sum
}

/// Pure planning step for one free bot. `actors` holds every living actor
/// including the bot itself, which is skipped via `self_ref`.
#[must_use]
pub fn plan_bot(
    bot: &Bot,
    self_ref: ActorRef,
    actors: &[ActorView],
    food: &[Food],
    vision: f32,
) -> BotDesire {
    let position = bot.body.position;
    let mass = bot.body.mass();

    match bot.personality {
        Personality::Timid => {
            let threat = nearest_actor(position, actors, |actor| {
                actor.reference != self_ref
                    && actor.mass > mass * 1.1
                    && position.distance(actor.position) < vision
            });
            if let Some(threat) = threat {
                return BotDesire::Flee(threat.position);
            }
            if let Some(pellet) = nearest_food(position, food) {
                return BotDesire::Food(pellet);
            }
            BotDesire::Wander
        }
        Personality::Aggressive => {
            // A held prey lock survives until the prey dies or outgrows us.
            if let Some(held) = bot.hunting {
                if let Some(prey) = actors.iter().find(|actor| actor.reference == held) {
                    if prey.mass * 1.1 < mass {
                        return BotDesire::Hunt(held, prey.position);
                    }
                }
            }
            let prey = nearest_actor(position, actors, |actor| {
                actor.reference != self_ref
                    && actor.mass * 1.1 < mass
                    && position.distance(actor.position) < vision
            });
            if let Some(prey) = prey {
                return BotDesire::Hunt(prey.reference, prey.position);
            }
            let threat = nearest_actor(position, actors, |actor| {
                actor.reference != self_ref
                    && actor.mass >= mass * 2.5
                    && position.distance(actor.position) < vision
            });
            if let Some(threat) = threat {
                return BotDesire::Flee(threat.position);
            }
            BotDesire::Wander
        }
        Personality::Opportunist => {
            let threat = nearest_actor(position, actors, |actor| {
                actor.reference != self_ref
                    && actor.mass >= mass * 1.5
                    && position.distance(actor.position) < vision
            });
            if let Some(threat) = threat {
                return BotDesire::Flee(threat.position);
            }
            // Only player cells that are both smaller and fragile are
            // worth the risk of approaching the blob.
            let prey = nearest_actor(position, actors, |actor| {
                matches!(actor.reference, ActorRef::PlayerCell(_))
                    && mass > actor.mass * 1.1
                    && actor.mass < actor.radius * 2.0
                    && position.distance(actor.position) < vision
            });
            if let Some(prey) = prey {
                return BotDesire::Hunt(prey.reference, prey.position);
            }
            if let Some(pellet) = nearest_food(position, food) {
                return BotDesire::Food(pellet);
            }
            BotDesire::Wander
        }
    }
}

/// Serial application of a plan: resolves wander targets with the world
/// RNG and steers the body.
pub fn apply_bot_plan(bot: &mut Bot, desire: BotDesire, config: &ArenaConfig, rng: &mut SmallRng) {
    bot.hunting = None;
    match desire {
        BotDesire::Flee(threat) => {
            let away = (bot.body.position - threat).normalized();
            let dir = if away == Vec2::ZERO { Vec2::new(1.0, 0.0) } else { away };
            bot.target = bot.body.position + dir * 300.0;
        }
        BotDesire::Hunt(prey, position) => {
            bot.hunting = Some(prey);
            bot.target = position;
        }
        BotDesire::Food(position) => {
            bot.target = position;
        }
        BotDesire::Wander => {
            if bot.body.position.distance(bot.target) < 20.0 {
                bot.target = Vec2::new(
                    (bot.body.position.x + rng.random_range(-500.0..500.0))
                        .clamp(0.0, config.world_width),
                    (bot.body.position.y + rng.random_range(-500.0..500.0))
                        .clamp(0.0, config.world_height),
                );
            }
        }
    }
    let max_speed = max_speed_for_mass(bot.body.mass());
    let target = bot.target;
    bot.body.steer_toward(target, max_speed, 0.0, config.steer_lerp);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZombieState {
    /// Circle the owner centroid; `angle` advances a fixed step per frame.
    Orbiting { angle: f32 },
    /// Rush wherever the owner is pointing.
    ChasingCursor,
}

/// An undead ally raised from an eaten bot.
#[derive(Debug, Clone)]
pub struct Zombie {
    pub body: Body,
    pub state: ZombieState,
    /// Frames left in the current state.
    pub state_timer: u32,
}

impl Zombie {
    #[must_use]
    pub fn new(position: Vec2, mass: f32, rng: &mut SmallRng) -> Self {
        Self {
            body: Body::new(position, mass, [90, 160, 90]),
            state: ZombieState::Orbiting {
                angle: rng.random_range(0.0..std::f32::consts::TAU),
            },
            state_timer: rng.random_range(120..240),
        }
    }

    /// One steering frame. `threats` must already exclude the owner's own
    /// units; `cursor_world` is the owner's pointer position.
    pub fn steer(
        &mut self,
        owner_centroid: Vec2,
        cursor_world: Vec2,
        food: &[Food],
        threats: &[ActorView],
        config: &ArenaConfig,
        rng: &mut SmallRng,
    ) {
        if self.state_timer == 0 {
            self.state = match self.state {
                ZombieState::Orbiting { .. } => {
                    self.state_timer = rng.random_range(180..300);
                    ZombieState::ChasingCursor
                }
                ZombieState::ChasingCursor => {
                    self.state_timer = rng.random_range(120..240);
                    ZombieState::Orbiting {
                        angle: rng.random_range(0.0..std::f32::consts::TAU),
                    }
                }
            };
        }
        self.state_timer = self.state_timer.saturating_sub(1);

        let role_target = match &mut self.state {
            ZombieState::Orbiting { angle } => {
                *angle += 0.02;
                owner_centroid
                    + Vec2::new(angle.cos(), angle.sin()) * config.zombie_orbit_distance
            }
            ZombieState::ChasingCursor => cursor_world,
        };

        // Grab a safe pellet when it is closer than the role target.
        let target = match nearest_safe_food(
            self.body.position,
            self.body.mass(),
            food,
            threats,
            config.safe_food_margin,
        ) {
            Some(pellet)
                if self.body.position.distance(pellet)
                    < self.body.position.distance(role_target) =>
            {
                pellet
            }
            _ => role_target,
        };

        let max_speed = max_speed_for_mass(self.body.mass());
        let seek = (target - self.body.position).normalized() * max_speed;
        let flee = flee_field(
            self.body.position,
            threats,
            config.swarm_dodge_range,
            config.swarm_flee_weight,
        );
        let desired = seek + flee;
        self.body.velocity += (desired - self.body.velocity) * config.swarm_lerp;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeState {
    Gathering,
    Returning,
}

/// A hired drone that ferries food mass back to its owner.
#[derive(Debug, Clone)]
pub struct Employee {
    pub body: Body,
    pub state: EmployeeState,
    /// Food mass picked up but not yet delivered.
    pub carried: f32,
    pub trips_left: u32,
    pub ttl: u32,
}

impl Employee {
    #[must_use]
    pub fn new(position: Vec2, config: &ArenaConfig) -> Self {
        Self {
            body: Body::new(position, config.employee_mass, [230, 200, 90]),
            state: EmployeeState::Gathering,
            carried: 0.0,
            trips_left: config.employee_trips_base,
            ttl: config.employee_ttl,
        }
    }

    /// Credit a pickup and turn for home.
    pub fn load(&mut self, mass: f32) {
        self.carried += mass;
        self.state = EmployeeState::Returning;
    }

    /// Hand over the cargo; returns the delivered amount.
    pub fn deliver(&mut self) -> f32 {
        let cargo = self.carried;
        self.carried = 0.0;
        self.trips_left = self.trips_left.saturating_sub(1);
        self.state = EmployeeState::Gathering;
        cargo
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.ttl == 0 || self.trips_left == 0
    }

    pub fn steer(
        &mut self,
        owner_centroid: Vec2,
        leash_range: f32,
        food: &[Food],
        threats: &[ActorView],
        config: &ArenaConfig,
    ) {
        self.ttl = self.ttl.saturating_sub(1);

        let beyond_leash = self.body.position.distance(owner_centroid) > leash_range;
        let target = if beyond_leash || self.state == EmployeeState::Returning {
            owner_centroid
        } else {
            nearest_safe_food(
                self.body.position,
                self.body.mass(),
                food,
                threats,
                config.safe_food_margin,
            )
            .unwrap_or(owner_centroid)
        };

        let max_speed = max_speed_for_mass(self.body.mass());
        let seek = (target - self.body.position).normalized() * max_speed;
        let flee = flee_field(
            self.body.position,
            threats,
            config.swarm_dodge_range,
            config.swarm_flee_weight,
        );
        let desired = seek + flee;
        self.body.velocity += (desired - self.body.velocity) * config.swarm_lerp;
    }
}

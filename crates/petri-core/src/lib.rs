//! petri-core: deterministic frame-stepped simulation of a cell-growth
//! arena.
//!
//! One [`World`] owns every entity collection and mutates them only inside
//! [`World::step`], which runs a fixed stage pipeline each tick: timers,
//! input intents, class hooks, AI steering, physics, player collision and
//! merging, consumption, cleanup, camera follow, history. All timeouts are
//! integer frame counts, so a fixed config, seed, and input sequence
//! reproduce a session exactly.
//!
//! Entities live in generational arenas ([`slotmap`]); cross-entity
//! references are typed keys revalidated on use, never raw indices.

pub mod body;
pub mod bots;
pub mod camera;
pub mod classes;
pub mod config;
pub mod geom;
pub mod input;
pub mod player;
pub mod transient;
pub mod web;
pub mod world;

slotmap::new_key_type! {
    /// Key for one of the player's cells.
    pub struct CellId;
    /// Key for a free-roaming bot.
    pub struct BotId;
    /// Key for an undead swarm unit.
    pub struct ZombieId;
    /// Key for a hired gatherer drone.
    pub struct EmployeeId;
}

pub use body::Body;
pub use bots::{ActorRef, Bot, Employee, EmployeeState, Personality, Zombie, ZombieState};
pub use camera::Camera;
pub use classes::{AbilityKey, ClassKind, ClassState};
pub use config::ArenaConfig;
pub use geom::{Vec2, max_speed_for_mass, radius_for_mass};
pub use input::InputFrame;
pub use player::{Player, PlayerCell};
pub use transient::{EjectedMass, Food, IceWall, MassTarget, PullProfile, TargetedMass};
pub use web::{CreepBlot, InfestBolt, WebState};
pub use world::{Tick, TickEvents, TickSummary, World, WorldError};

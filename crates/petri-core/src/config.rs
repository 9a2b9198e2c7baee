//! Static tunables for an arena session.

use crate::world::WorldError;
use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

/// Static configuration for a petri arena world.
///
/// Every numeric tunable the simulation consults lives here; the defaults
/// reproduce the classic balance. Timers are frame counts at the nominal
/// 60 Hz step rate, never wall-clock durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// World extent in world units.
    pub world_width: f32,
    pub world_height: f32,
    /// Reference viewport used for camera zoom and AI vision math.
    pub screen_width: f32,
    pub screen_height: f32,
    /// Optional RNG seed for reproducible sessions.
    pub rng_seed: Option<u64>,
    /// Maximum number of retained tick summaries.
    pub history_capacity: usize,
    /// Display name given to the player's cells.
    pub player_name: String,

    // Masses and populations.
    pub player_start_mass: f32,
    pub bot_spawn_mass: f32,
    pub zombie_mass: f32,
    pub employee_mass: f32,
    pub food_mass: f32,
    pub food_count: usize,
    pub initial_bots: usize,
    pub max_bots: usize,

    // Movement and decay.
    /// Isotropic velocity retention per frame.
    pub friction: f32,
    /// Steering smoothing for the player and free bots.
    pub steer_lerp: f32,
    /// Steering smoothing for owner-bound swarm units.
    pub swarm_lerp: f32,
    /// Mass shaved per frame from bodies above `decay_floor`.
    pub mass_decay_rate: f32,
    pub decay_floor: f32,

    // Split / merge / eject.
    pub min_split_mass: f32,
    pub split_velocity: f32,
    /// Frames before split children may recombine, plus a mass-scaled term.
    pub base_merge_frames: u32,
    pub merge_mass_factor: f32,
    pub collision_cooldown_frames: u32,
    pub min_eject_mass: f32,
    pub eject_mass: f32,
    pub eject_velocity: f32,
    pub eject_cooldown_frames: u32,

    // Spawn timers.
    pub bot_spawn_interval: u32,
    /// Food top-up cadence while the spawn-boost input is held.
    pub boost_food_interval: u32,

    // Transient mass.
    pub ejected_ttl: u32,
    pub targeted_ttl: u32,
    /// Frames during which freshly emitted targeted mass refuses its source.
    pub targeted_eat_cooldown: u32,

    // Feeder cheat.
    pub feeder_drain: f32,
    pub feeder_drain_pct: f32,
    pub feeder_chunk_mass: f32,
    pub feeder_chunk_pct: f32,
    pub feeder_interval: u32,
    pub feeder_chunk_speed: f32,

    // Swarm behaviour.
    pub zombie_orbit_distance: f32,
    pub swarm_dodge_range: f32,
    pub swarm_flee_weight: f32,
    /// Food within this margin of a threat's rim is considered unsafe.
    pub safe_food_margin: f32,

    // Class system.
    pub class_pick_mass: f32,
    pub ability_max_tier: u8,
    /// Mass cost of raising an ability to tier n is `upgrade_cost_base * n`.
    pub upgrade_cost_base: f32,

    // Juggernaut.
    pub charge_frames: u32,
    pub charge_thrust: f32,
    pub kinetic_gain: f32,
    pub kinetic_decay: f32,
    pub kinetic_max: f32,
    pub kinetic_angle_threshold: f32,

    // Mage.
    pub wall_ttl: u32,
    pub wall_thickness: f32,

    // Broodmother web.
    pub web_reach: f32,
    pub web_step: f32,
    pub web_member_base: usize,
    pub web_member_per_tier: usize,
    pub creep_growth: f32,
    pub creep_max: f32,
    pub web_slow_frames: u32,
    pub infest_bolt_speed: f32,
    pub infest_bolt_ttl: u32,

    // Overseer employees.
    pub hire_cost: f32,
    pub employee_cap_base: usize,
    pub employee_ttl: u32,
    pub employee_trips_base: u32,

    // Purifier purge.
    pub purge_base_fraction: f32,
    pub purge_fraction_per_tier: f32,
    pub purge_frames: u32,
    pub purge_decay_multiplier: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            world_width: 2_500.0,
            world_height: 2_500.0,
            screen_width: 1_920.0,
            screen_height: 1_080.0,
            rng_seed: None,
            history_capacity: 256,
            player_name: "Player".to_string(),

            player_start_mass: 20.0,
            bot_spawn_mass: 15.0,
            zombie_mass: 25.0,
            employee_mass: 18.0,
            food_mass: 2.0,
            food_count: 300,
            initial_bots: 15,
            max_bots: 50,

            friction: 0.98,
            steer_lerp: 0.1,
            swarm_lerp: 0.2,
            mass_decay_rate: 0.005,
            decay_floor: 100.0,

            min_split_mass: 40.0,
            split_velocity: 40.0,
            base_merge_frames: 900,
            merge_mass_factor: 0.5,
            collision_cooldown_frames: 60,
            min_eject_mass: 30.0,
            eject_mass: 10.0,
            eject_velocity: 12.0,
            eject_cooldown_frames: 5,

            bot_spawn_interval: 90,
            boost_food_interval: 15,

            ejected_ttl: 180,
            targeted_ttl: 300,
            targeted_eat_cooldown: 30,

            feeder_drain: 2.0,
            feeder_drain_pct: 0.002,
            feeder_chunk_mass: 2.0,
            feeder_chunk_pct: 0.01,
            feeder_interval: 5,
            feeder_chunk_speed: 15.0,

            zombie_orbit_distance: 250.0,
            swarm_dodge_range: 250.0,
            swarm_flee_weight: 8_000.0,
            safe_food_margin: 150.0,

            class_pick_mass: 150.0,
            ability_max_tier: 3,
            upgrade_cost_base: 50.0,

            charge_frames: 150,
            charge_thrust: 2.0,
            kinetic_gain: 0.01,
            kinetic_decay: 0.1,
            kinetic_max: 2.5,
            kinetic_angle_threshold: 0.2,

            wall_ttl: 300,
            wall_thickness: 15.0,

            web_reach: 350.0,
            web_step: 6.0,
            web_member_base: 4,
            web_member_per_tier: 4,
            creep_growth: 0.3,
            creep_max: 60.0,
            web_slow_frames: 90,
            infest_bolt_speed: 14.0,
            infest_bolt_ttl: 120,

            hire_cost: 25.0,
            employee_cap_base: 2,
            employee_ttl: 3_600,
            employee_trips_base: 3,

            purge_base_fraction: 0.2,
            purge_fraction_per_tier: 0.1,
            purge_frames: 240,
            purge_decay_multiplier: 40.0,
        }
    }
}

impl ArenaConfig {
    /// Validates the configuration before a world is built around it.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.world_width <= 0.0 || self.world_height <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "world dimensions must be positive",
            ));
        }
        if self.screen_width <= 0.0 || self.screen_height <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "reference viewport must be positive",
            ));
        }
        if self.history_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(WorldError::InvalidConfig("friction must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.steer_lerp) || !(0.0..=1.0).contains(&self.swarm_lerp) {
            return Err(WorldError::InvalidConfig(
                "steering lerp factors must lie in [0, 1]",
            ));
        }
        if self.player_start_mass <= 0.0
            || self.bot_spawn_mass <= 0.0
            || self.zombie_mass <= 0.0
            || self.employee_mass <= 0.0
            || self.food_mass <= 0.0
        {
            return Err(WorldError::InvalidConfig("spawn masses must be positive"));
        }
        if self.mass_decay_rate < 0.0 || self.decay_floor < 0.0 {
            return Err(WorldError::InvalidConfig(
                "decay parameters must be non-negative",
            ));
        }
        if self.min_split_mass <= 0.0 || self.split_velocity <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "split parameters must be positive",
            ));
        }
        if self.eject_mass <= 0.0 || self.min_eject_mass < self.eject_mass {
            return Err(WorldError::InvalidConfig(
                "eject floor must cover the ejected amount",
            ));
        }
        if self.max_bots < self.initial_bots {
            return Err(WorldError::InvalidConfig(
                "max_bots cannot be below initial_bots",
            ));
        }
        if self.class_pick_mass <= self.player_start_mass {
            return Err(WorldError::InvalidConfig(
                "class_pick_mass must exceed the starting mass",
            ));
        }
        if self.ability_max_tier == 0 {
            return Err(WorldError::InvalidConfig(
                "ability_max_tier must be at least 1",
            ));
        }
        let purge_max =
            self.purge_base_fraction + self.purge_fraction_per_tier * self.ability_max_tier as f32;
        if self.purge_base_fraction < 0.0 || purge_max > 1.0 {
            return Err(WorldError::InvalidConfig(
                "purge fractions must stay within [0, 1] at every tier",
            ));
        }
        if self.creep_max <= 0.0 || self.creep_growth <= 0.0 || self.web_step <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "web growth parameters must be positive",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, generating a seed from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ArenaConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = ArenaConfig::default();
        config.friction = 1.5;
        assert!(config.validate().is_err());

        let mut config = ArenaConfig::default();
        config.min_eject_mass = 5.0;
        assert!(config.validate().is_err());

        let mut config = ArenaConfig::default();
        config.purge_base_fraction = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = ArenaConfig {
            rng_seed: Some(7),
            ..ArenaConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let back: ArenaConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.rng_seed, Some(7));
        assert_eq!(back.food_count, config.food_count);
    }
}

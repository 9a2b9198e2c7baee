//! Shared state and per-frame behaviour for every circular body.

use crate::config::ArenaConfig;
use crate::geom::{Vec2, radius_for_mass};
use crate::transient::IceWall;
use serde::{Deserialize, Serialize};

/// Physical core of every simulated entity: players, bots, swarm units,
/// and loose mass all embed one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    mass: f32,
    radius: f32,
    pub color: [u8; 3],
    /// Frames remaining at half speed.
    pub slow_timer: u32,
    /// Whether ambient mass decay applies above the configured floor.
    pub decays: bool,
}

impl Body {
    #[must_use]
    pub fn new(position: Vec2, mass: f32, color: [u8; 3]) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            mass,
            radius: radius_for_mass(mass),
            color,
            slow_timer: 0,
            decays: true,
        }
    }

    #[must_use]
    pub const fn mass(&self) -> f32 {
        self.mass
    }

    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Set mass and keep the derived radius in sync.
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.radius = radius_for_mass(mass);
    }

    pub fn add_mass(&mut self, delta: f32) {
        self.set_mass(self.mass + delta);
    }

    /// One physics frame: ambient decay, slow-effect bookkeeping, obstacle
    /// slide response, integration, friction, and hard boundary clamping.
    pub fn advance(&mut self, config: &ArenaConfig, walls: &[IceWall]) {
        if self.decays && self.mass > config.decay_floor {
            self.set_mass(self.mass - config.mass_decay_rate);
        }

        let speed_multiplier = if self.slow_timer > 0 {
            self.slow_timer -= 1;
            0.5
        } else {
            1.0
        };

        for wall in walls {
            self.deflect_from(wall);
        }

        self.position += self.velocity * speed_multiplier;
        self.velocity = self.velocity * config.friction;

        self.position.x = self
            .position
            .x
            .clamp(self.radius, config.world_width - self.radius);
        self.position.y = self
            .position
            .y
            .clamp(self.radius, config.world_height - self.radius);
    }

    /// Cancel the inward velocity component against an oriented rectangle,
    /// leaving the tangential part intact so bodies slide along the surface.
    fn deflect_from(&mut self, wall: &IceWall) {
        let next = self.position + self.velocity;
        let relative = next - wall.center;
        let (sin, cos) = wall.angle.sin_cos();

        // Project into the wall's local frame and clamp to its half extents.
        let local = Vec2::new(
            relative.x * cos + relative.y * sin,
            -relative.x * sin + relative.y * cos,
        );
        let closest = Vec2::new(
            local.x.clamp(-wall.half_extents.x, wall.half_extents.x),
            local.y.clamp(-wall.half_extents.y, wall.half_extents.y),
        );

        if local.distance(closest) >= self.radius {
            return;
        }

        let local_normal = local - closest;
        let world_normal = Vec2::new(
            local_normal.x * cos - local_normal.y * sin,
            local_normal.x * sin + local_normal.y * cos,
        )
        .normalized();
        let inward = self.velocity.dot(world_normal);
        if inward < 0.0 {
            self.velocity = self.velocity - world_normal * inward;
        }
    }

    /// Steer toward a world-space target: seek velocity capped by the
    /// mass-dependent speed limit, blended in with exponential smoothing.
    pub fn steer_toward(&mut self, target: Vec2, max_speed: f32, dead_zone: f32, lerp: f32) {
        let offset = target - self.position;
        let desired = if offset.length() > dead_zone {
            offset.normalized() * max_speed
        } else {
            Vec2::ZERO
        };
        self.velocity = self.velocity.lerp_toward(desired, lerp);
    }
}

//! Short-lived, self-expiring bodies: loose mass, pulled mass, obstacles.

use crate::body::Body;
use crate::config::ArenaConfig;
use crate::geom::Vec2;
use crate::{BotId, CellId};
use serde::{Deserialize, Serialize};

/// A food pellet. Fixed population: every eaten pellet respawns elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub position: Vec2,
    pub mass: f32,
    pub color: [u8; 3],
}

/// Mass flung out by an eject, drifting ballistically until eaten or stale.
#[derive(Debug, Clone)]
pub struct EjectedMass {
    pub body: Body,
    pub ttl: u32,
}

impl EjectedMass {
    pub fn advance(&mut self, config: &ArenaConfig) {
        self.ttl = self.ttl.saturating_sub(1);
        self.body.advance(config, &[]);
    }

    #[must_use]
    pub const fn expired(&self) -> bool {
        self.ttl == 0
    }
}

/// What a pulled mass chunk is homing toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MassTarget {
    PlayerCell(CellId),
    Bot(BotId),
    /// Target vanished; the chunk keeps its momentum.
    None,
}

/// Homing parameters for pulled mass.
#[derive(Debug, Clone, Copy)]
pub struct PullProfile {
    pub strength: f32,
    pub lerp: f32,
}

impl PullProfile {
    /// Slow drift used by feeder chunks.
    pub const FEED: Self = Self {
        strength: 5.0,
        lerp: 0.1,
    };
    /// Fast convergence used by reform/possess chunks.
    pub const REFORM: Self = Self {
        strength: 15.0,
        lerp: 0.25,
    };
}

/// Mass chunk pulled toward a (possibly vanished) target entity.
#[derive(Debug, Clone)]
pub struct TargetedMass {
    pub body: Body,
    pub target: MassTarget,
    pub pull: PullProfile,
    pub ttl: u32,
    /// Frames during which the player may not reconsume this chunk.
    pub player_eat_cooldown: u32,
}

impl TargetedMass {
    /// One frame of homing plus regular body physics. The caller resolves
    /// the target handle to a live position (or `None` when stale).
    pub fn advance(&mut self, config: &ArenaConfig, target_position: Option<Vec2>) {
        if self.player_eat_cooldown > 0 {
            self.player_eat_cooldown -= 1;
        }
        if target_position.is_none() {
            self.target = MassTarget::None;
        }
        if let Some(goal) = target_position {
            let offset = goal - self.body.position;
            if offset.length() > 1.0 {
                let desired = offset.normalized() * self.pull.strength;
                self.body.velocity = self.body.velocity.lerp_toward(desired, self.pull.lerp);
            }
        }
        self.ttl = self.ttl.saturating_sub(1);
        self.body.advance(config, &[]);
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.ttl == 0 || self.body.mass() <= 0.0
    }
}

/// Oriented rectangular obstacle. Deflects bodies, is never consumable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceWall {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub angle: f32,
    pub ttl: u32,
}

impl IceWall {
    pub fn advance(&mut self) {
        self.ttl = self.ttl.saturating_sub(1);
    }

    #[must_use]
    pub const fn expired(&self) -> bool {
        self.ttl == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ArenaConfig {
        ArenaConfig {
            rng_seed: Some(3),
            ..ArenaConfig::default()
        }
    }

    #[test]
    fn targeted_mass_homes_toward_live_target() {
        let config = config();
        let mut chunk = TargetedMass {
            body: Body::new(Vec2::new(100.0, 100.0), 5.0, [0; 3]),
            target: MassTarget::None,
            pull: PullProfile::REFORM,
            ttl: 300,
            player_eat_cooldown: 0,
        };
        let goal = Vec2::new(200.0, 100.0);
        for _ in 0..30 {
            chunk.advance(&config, Some(goal));
        }
        assert!(chunk.body.position.x > 130.0, "chunk should close distance");
        assert!((chunk.body.position.y - 100.0).abs() < 5.0);
    }

    #[test]
    fn stale_target_clears_and_keeps_momentum() {
        let config = config();
        let mut chunk = TargetedMass {
            body: Body::new(Vec2::new(100.0, 100.0), 5.0, [0; 3]),
            target: MassTarget::PlayerCell(CellId::default()),
            pull: PullProfile::FEED,
            ttl: 300,
            player_eat_cooldown: 10,
        };
        chunk.body.velocity = Vec2::new(4.0, 0.0);
        chunk.advance(&config, None);
        assert_eq!(chunk.target, MassTarget::None);
        assert!(chunk.body.velocity.x > 0.0);
        assert_eq!(chunk.player_eat_cooldown, 9);
    }

    #[test]
    fn expiry_covers_ttl_and_mass_collapse() {
        let mut chunk = TargetedMass {
            body: Body::new(Vec2::new(100.0, 100.0), 5.0, [0; 3]),
            target: MassTarget::None,
            pull: PullProfile::FEED,
            ttl: 1,
            player_eat_cooldown: 0,
        };
        assert!(!chunk.expired());
        chunk.advance(&config(), None);
        assert!(chunk.expired());

        let mut drained = TargetedMass {
            body: Body::new(Vec2::new(100.0, 100.0), 5.0, [0; 3]),
            target: MassTarget::None,
            pull: PullProfile::FEED,
            ttl: 100,
            player_eat_cooldown: 0,
        };
        drained.body.set_mass(0.0);
        assert!(drained.expired());
    }
}

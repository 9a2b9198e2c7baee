//! Smooth-follow view transform shared with the rendering layer.
//!
//! The simulation core keeps the camera because several AI and ability
//! computations need `screen_to_world` and the zoom-scaled vision range;
//! rendering itself happens elsewhere.

use crate::geom::Vec2;
use crate::player::Player;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    screen: Vec2,
    pub center: Vec2,
    pub zoom: f32,
    target_center: Vec2,
    target_zoom: f32,
}

impl Camera {
    const LERP: f32 = 0.04;

    #[must_use]
    pub fn new(screen_width: f32, screen_height: f32) -> Self {
        Self {
            screen: Vec2::new(screen_width, screen_height),
            center: Vec2::ZERO,
            zoom: 1.0,
            target_center: Vec2::ZERO,
            target_zoom: 1.0,
        }
    }

    /// Snap onto a position (used on respawn so the view does not pan
    /// across the whole world).
    pub fn snap_to(&mut self, position: Vec2) {
        self.center = position;
        self.target_center = position;
    }

    /// Track the player's mass-weighted centroid; zoom out as the cells
    /// spread or grow.
    pub fn follow(&mut self, player: &Player) {
        if player.cell_count() > 0 {
            let centroid = player.centroid();
            self.target_center = centroid;

            let mut max_dist: f32 = 100.0;
            let mut radius_sum = 0.0;
            for cell in player.cells() {
                max_dist = max_dist.max(cell.body.position.distance(centroid) + cell.body.radius());
                radius_sum += cell.body.radius();
            }
            let zoom_radius = (radius_sum / 2.0).max(max_dist);
            self.target_zoom = (self.screen.y / (zoom_radius * 4.0 + 300.0)).clamp(0.15, 1.5);
        }
        self.center = self.center.lerp_toward(self.target_center, Self::LERP);
        self.zoom += (self.target_zoom - self.zoom) * Self::LERP;
    }

    #[must_use]
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.center) * self.zoom + self.screen * 0.5
    }

    #[must_use]
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.screen * 0.5) * (1.0 / self.zoom) + self.center
    }

    /// How far AI actors can see: half the reference viewport, unzoomed.
    #[must_use]
    pub fn vision_range(&self) -> f32 {
        (self.screen.x / 2.0) / self.zoom
    }

    /// Maximum wander range for owner-bound swarm units.
    #[must_use]
    pub fn leash_range(&self) -> f32 {
        (self.screen.x / 2.5) / self.zoom
    }

    #[must_use]
    pub const fn screen_size(&self) -> Vec2 {
        self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_are_inverse() {
        let mut camera = Camera::new(1_920.0, 1_080.0);
        camera.center = Vec2::new(1_000.0, 800.0);
        camera.zoom = 0.5;
        let world = Vec2::new(1_234.0, 567.0);
        let back = camera.screen_to_world(camera.world_to_screen(world));
        assert!((back.x - world.x).abs() < 1e-3);
        assert!((back.y - world.y).abs() < 1e-3);
    }

    #[test]
    fn vision_scales_inversely_with_zoom() {
        let mut camera = Camera::new(1_920.0, 1_080.0);
        camera.zoom = 1.0;
        let near = camera.vision_range();
        camera.zoom = 0.5;
        assert!((camera.vision_range() - near * 2.0).abs() < 1e-3);
    }
}

//! The player's multi-cell blob: split, eject, separation, and merging.

use crate::CellId;
use crate::body::Body;
use crate::config::ArenaConfig;
use crate::geom::{Vec2, max_speed_for_mass};
use crate::transient::EjectedMass;
use slotmap::SlotMap;
use std::collections::HashSet;

/// One cell owned by the player.
#[derive(Debug, Clone)]
pub struct PlayerCell {
    pub body: Body,
    /// Frames until this cell may recombine with a sibling.
    pub merge_timer: u32,
    /// Frames of solid pairwise collision after a split.
    pub collision_cooldown: u32,
}

impl PlayerCell {
    #[must_use]
    pub fn new(position: Vec2, mass: f32, color: [u8; 3]) -> Self {
        Self {
            body: Body::new(position, mass, color),
            merge_timer: 0,
            collision_cooldown: 0,
        }
    }
}

/// The player: an insertion-ordered set of cells plus identity.
#[derive(Debug, Clone)]
pub struct Player {
    cells: SlotMap<CellId, PlayerCell>,
    order: Vec<CellId>,
    pub name: String,
    pub alive: bool,
}

impl Player {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            cells: SlotMap::with_key(),
            order: Vec::new(),
            name: name.into(),
            alive: false,
        }
    }

    /// Drop every cell and start over as a single fresh cell.
    pub fn respawn_at(&mut self, position: Vec2, mass: f32, color: [u8; 3]) {
        self.cells.clear();
        self.order.clear();
        let id = self.cells.insert(PlayerCell::new(position, mass, color));
        self.order.push(id);
        self.alive = true;
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.order.len()
    }

    /// Cells in stable insertion order.
    pub fn cells(&self) -> impl Iterator<Item = &PlayerCell> {
        self.order.iter().filter_map(|id| self.cells.get(*id))
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut PlayerCell> {
        self.cells.values_mut()
    }

    #[must_use]
    pub fn cell_ids(&self) -> &[CellId] {
        &self.order
    }

    #[must_use]
    pub fn get(&self, id: CellId) -> Option<&PlayerCell> {
        self.cells.get(id)
    }

    pub fn get_mut(&mut self, id: CellId) -> Option<&mut PlayerCell> {
        self.cells.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(id)
    }

    pub fn remove_cell(&mut self, id: CellId) -> Option<PlayerCell> {
        let removed = self.cells.remove(id);
        if removed.is_some() {
            self.order.retain(|other| *other != id);
            if self.order.is_empty() {
                self.alive = false;
            }
        }
        removed
    }

    /// Replace the whole collection with a single cell (possess/reform).
    pub fn collapse_to(&mut self, cell: PlayerCell) -> CellId {
        self.cells.clear();
        self.order.clear();
        let id = self.cells.insert(cell);
        self.order.push(id);
        self.alive = true;
        id
    }

    /// Keep one cell, removing and returning all the others.
    pub fn retain_only(&mut self, keep: CellId) -> Vec<PlayerCell> {
        let discard: Vec<CellId> = self
            .order
            .iter()
            .copied()
            .filter(|id| *id != keep)
            .collect();
        let mut removed = Vec::with_capacity(discard.len());
        for id in discard {
            if let Some(cell) = self.cells.remove(id) {
                removed.push(cell);
            }
        }
        self.order.retain(|id| *id == keep);
        removed
    }

    #[must_use]
    pub fn total_mass(&self) -> f32 {
        self.cells().map(|cell| cell.body.mass()).sum()
    }

    /// Mass-weighted centroid; falls back to the first cell when the total
    /// mass has collapsed.
    #[must_use]
    pub fn centroid(&self) -> Vec2 {
        let total = self.total_mass();
        if total <= 0.0 {
            return self
                .cells()
                .next()
                .map_or(Vec2::ZERO, |cell| cell.body.position);
        }
        let mut sum = Vec2::ZERO;
        for cell in self.cells() {
            sum += cell.body.position * cell.body.mass();
        }
        sum * (1.0 / total)
    }

    /// The heaviest cell; ties keep the earliest in insertion order.
    #[must_use]
    pub fn largest_cell_id(&self) -> Option<CellId> {
        let mut best: Option<(CellId, f32)> = None;
        for &id in &self.order {
            if let Some(cell) = self.cells.get(id) {
                let mass = cell.body.mass();
                if best.is_none_or(|(_, best_mass)| mass > best_mass) {
                    best = Some((id, mass));
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// The cell nearest a world position; ties keep the earliest.
    #[must_use]
    pub fn closest_cell_id(&self, target: Vec2) -> Option<CellId> {
        let mut best: Option<(CellId, f32)> = None;
        for &id in &self.order {
            if let Some(cell) = self.cells.get(id) {
                let dist = cell.body.position.distance(target);
                if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                    best = Some((id, dist));
                }
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn tick_timers(&mut self) {
        for cell in self.cells.values_mut() {
            cell.merge_timer = cell.merge_timer.saturating_sub(1);
            cell.collision_cooldown = cell.collision_cooldown.saturating_sub(1);
        }
    }

    /// Steer every cell toward the cursor's world position. The dead zone
    /// scales with the cell radius so big cells settle instead of jittering.
    pub fn apply_movement(&mut self, cursor_world: Vec2, config: &ArenaConfig) {
        for cell in self.cells.values_mut() {
            let max_speed = max_speed_for_mass(cell.body.mass());
            let dead_zone = cell.body.radius() * 0.8;
            cell.body
                .steer_toward(cursor_world, max_speed, dead_zone, config.steer_lerp);
        }
    }

    /// Split every eligible cell into two half-mass children. One child
    /// keeps the parent's velocity, the other launches toward the cursor.
    pub fn split(&mut self, cursor_world: Vec2, config: &ArenaConfig) {
        let candidates: Vec<CellId> = self.order.clone();
        for id in candidates {
            let Some(parent) = self.cells.get(id) else {
                continue;
            };
            if parent.body.mass() < config.min_split_mass {
                continue;
            }
            let Some(parent) = self.cells.remove(id) else {
                continue;
            };
            self.order.retain(|other| *other != id);

            let mut launch_dir = (cursor_world - parent.body.position).normalized();
            if launch_dir == Vec2::ZERO {
                launch_dir = Vec2::new(1.0, 0.0);
            }

            let child_mass = parent.body.mass() / 2.0;
            let merge_timer = config.base_merge_frames
                + (parent.body.mass() * config.merge_mass_factor).floor() as u32;

            let mut keeper = PlayerCell::new(parent.body.position, child_mass, parent.body.color);
            keeper.body.velocity = parent.body.velocity;
            keeper.merge_timer = merge_timer;
            keeper.collision_cooldown = config.collision_cooldown_frames;

            let mut launched = PlayerCell::new(parent.body.position, child_mass, parent.body.color);
            launched.body.velocity = launch_dir * config.split_velocity;
            launched.merge_timer = merge_timer;
            launched.collision_cooldown = config.collision_cooldown_frames;

            let keeper_id = self.cells.insert(keeper);
            let launched_id = self.cells.insert(launched);
            self.order.push(keeper_id);
            self.order.push(launched_id);
        }
    }

    /// Eject a fixed chunk of mass from every eligible cell toward the
    /// cursor. Returns the spawned particles for the world to own.
    pub fn eject(&mut self, cursor_world: Vec2, config: &ArenaConfig) -> Vec<EjectedMass> {
        let mut ejected = Vec::new();
        for cell in self.cells.values_mut() {
            if cell.body.mass() < config.min_eject_mass {
                continue;
            }
            cell.body.add_mass(-config.eject_mass);

            let mut dir = (cursor_world - cell.body.position).normalized();
            if dir == Vec2::ZERO {
                dir = Vec2::new(1.0, 0.0);
            }
            let mut body = Body::new(
                cell.body.position + dir * cell.body.radius(),
                config.eject_mass,
                cell.body.color,
            );
            body.velocity = dir * config.eject_velocity;
            ejected.push(EjectedMass {
                body,
                ttl: config.ejected_ttl,
            });
        }
        ejected
    }

    /// Soft positional separation while either sibling's post-split
    /// collision cooldown is still running.
    pub fn resolve_collisions(&mut self) {
        if self.order.len() <= 1 {
            return;
        }
        let ids = self.order.clone();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let Some([a, b]) = self.cells.get_disjoint_mut([ids[i], ids[j]]) else {
                    continue;
                };
                if a.collision_cooldown == 0 && b.collision_cooldown == 0 {
                    continue;
                }
                let offset = b.body.position - a.body.position;
                let dist = offset.length();
                let min_dist = a.body.radius() + b.body.radius();
                if dist >= min_dist || dist <= 0.0 {
                    continue;
                }
                let push = offset.normalized() * ((min_dist - dist) * 0.5);
                a.body.position = a.body.position - push;
                b.body.position = b.body.position + push;
            }
        }
    }

    /// Merge any pair whose timers have run out and whose centers are
    /// within the larger cell's radius. A cell absorbed this frame is
    /// never reconsidered.
    pub fn merge_pass(&mut self) {
        if self.order.len() <= 1 {
            return;
        }
        let ids = self.order.clone();
        let mut merged: HashSet<CellId> = HashSet::new();
        for i in 0..ids.len() {
            if merged.contains(&ids[i]) {
                continue;
            }
            for j in (i + 1)..ids.len() {
                if merged.contains(&ids[j]) {
                    continue;
                }
                let Some([a, b]) = self.cells.get_disjoint_mut([ids[i], ids[j]]) else {
                    continue;
                };
                if a.merge_timer != 0 || b.merge_timer != 0 {
                    continue;
                }
                let dist = a.body.position.distance(b.body.position);
                let (larger, smaller, smaller_id) = if a.body.mass() > b.body.mass() {
                    (a, b, ids[j])
                } else {
                    (b, a, ids[i])
                };
                if dist >= larger.body.radius() {
                    continue;
                }
                larger.body.add_mass(smaller.body.mass());
                merged.insert(smaller_id);
                if smaller_id == ids[i] {
                    break;
                }
            }
        }
        // Remove in the order snapshot's order, not the set's.
        for id in ids {
            if merged.contains(&id) {
                self.remove_cell(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ArenaConfig {
        ArenaConfig {
            rng_seed: Some(5),
            ..ArenaConfig::default()
        }
    }

    fn single_cell_player(mass: f32) -> Player {
        let mut player = Player::new("Tester");
        player.respawn_at(Vec2::new(1_000.0, 1_000.0), mass, [10, 20, 30]);
        player
    }

    #[test]
    fn split_halves_mass_and_launches_toward_cursor() {
        let config = config();
        let mut player = single_cell_player(40.0);
        {
            let id = player.cell_ids()[0];
            player.get_mut(id).expect("cell").body.velocity = Vec2::new(2.0, 0.0);
        }

        player.split(Vec2::new(1_500.0, 1_000.0), &config);
        assert_eq!(player.cell_count(), 2);

        let cells: Vec<&PlayerCell> = player.cells().collect();
        assert!((cells[0].body.mass() - 20.0).abs() < 1e-6);
        assert!((cells[1].body.mass() - 20.0).abs() < 1e-6);
        // Keeper inherits the parent's velocity, the other launches.
        assert!((cells[0].body.velocity.x - 2.0).abs() < 1e-6);
        assert!((cells[1].body.velocity.length() - config.split_velocity).abs() < 1e-3);
        assert!(cells[1].body.velocity.x > 0.0);

        let expected_timer =
            config.base_merge_frames + (40.0 * config.merge_mass_factor).floor() as u32;
        assert_eq!(cells[0].merge_timer, expected_timer);
        assert_eq!(cells[1].merge_timer, expected_timer);
        assert_eq!(cells[0].collision_cooldown, config.collision_cooldown_frames);
    }

    #[test]
    fn split_below_threshold_is_a_no_op() {
        let config = config();
        let mut player = single_cell_player(39.0);
        player.split(Vec2::new(1_500.0, 1_000.0), &config);
        assert_eq!(player.cell_count(), 1);
    }

    #[test]
    fn split_at_cursor_distance_zero_picks_default_direction() {
        let config = config();
        let mut player = single_cell_player(80.0);
        player.split(Vec2::new(1_000.0, 1_000.0), &config);
        let launched = player.cells().nth(1).expect("launched child");
        assert!(launched.body.velocity.x > 0.0);
        assert!((launched.body.velocity.y).abs() < 1e-6);
    }

    #[test]
    fn eject_spawns_particle_and_deducts_mass() {
        let config = config();
        let mut player = single_cell_player(50.0);
        let ejected = player.eject(Vec2::new(2_000.0, 1_000.0), &config);
        assert_eq!(ejected.len(), 1);
        assert!((player.total_mass() - 40.0).abs() < 1e-6);
        assert!((ejected[0].body.mass() - config.eject_mass).abs() < 1e-6);
        assert!(ejected[0].body.velocity.x > 0.0);

        let mut light = single_cell_player(20.0);
        assert!(light.eject(Vec2::new(2_000.0, 1_000.0), &config).is_empty());
    }

    #[test]
    fn merge_waits_for_both_timers_then_conserves_mass() {
        let config = config();
        let mut player = single_cell_player(40.0);
        player.split(Vec2::new(1_200.0, 1_000.0), &config);
        let ids: Vec<CellId> = player.cell_ids().to_vec();

        // Bring the cells together; timers still running, so no merge yet.
        for id in &ids {
            let cell = player.get_mut(*id).expect("cell");
            cell.body.position = Vec2::new(1_000.0, 1_000.0);
            cell.body.velocity = Vec2::ZERO;
        }
        player.merge_pass();
        assert_eq!(player.cell_count(), 2);

        for id in &ids {
            player.get_mut(*id).expect("cell").merge_timer = 0;
        }
        player.merge_pass();
        assert_eq!(player.cell_count(), 1);
        assert!((player.total_mass() - 40.0).abs() < 1e-4);
    }

    #[test]
    fn multi_merge_leaves_identical_slot_reuse_in_twin_players() {
        // A triple merge frees three slots; the free-list order they leave
        // behind decides which keys later splits hand out, so it must not
        // depend on set iteration order.
        fn build(config: &ArenaConfig) -> Player {
            let mut player = single_cell_player(200.0);
            player.split(Vec2::new(1_500.0, 1_000.0), config);
            player.split(Vec2::new(1_500.0, 1_000.0), config);
            assert_eq!(player.cell_count(), 4);
            let ids: Vec<CellId> = player.cell_ids().to_vec();
            for id in ids {
                let cell = player.get_mut(id).expect("cell");
                cell.body.position = Vec2::new(1_000.0, 1_000.0);
                cell.body.velocity = Vec2::ZERO;
                cell.merge_timer = 0;
            }
            player.merge_pass();
            assert_eq!(player.cell_count(), 1);
            player
        }

        let config = config();
        let mut a = build(&config);
        let mut b = build(&config);
        a.split(Vec2::new(1_200.0, 1_000.0), &config);
        b.split(Vec2::new(1_200.0, 1_000.0), &config);
        assert_eq!(a.cell_ids(), b.cell_ids());
    }

    #[test]
    fn collision_cooldown_pushes_overlapping_siblings_apart() {
        let config = config();
        let mut player = single_cell_player(80.0);
        player.split(Vec2::new(1_400.0, 1_000.0), &config);
        let ids: Vec<CellId> = player.cell_ids().to_vec();
        player.get_mut(ids[0]).expect("cell").body.position = Vec2::new(1_000.0, 1_000.0);
        player.get_mut(ids[1]).expect("cell").body.position = Vec2::new(1_004.0, 1_000.0);

        player.resolve_collisions();
        let a = player.get(ids[0]).expect("cell").body.position;
        let b = player.get(ids[1]).expect("cell").body.position;
        assert!(a.distance(b) > 4.0, "overlap must shrink");

        // Once cooldowns expire the cells pass through each other freely.
        for id in &ids {
            let cell = player.get_mut(*id).expect("cell");
            cell.collision_cooldown = 0;
            cell.body.position = Vec2::new(1_000.0, 1_000.0);
        }
        player.resolve_collisions();
        let a = player.get(ids[0]).expect("cell").body.position;
        let b = player.get(ids[1]).expect("cell").body.position;
        assert_eq!(a.distance(b), 0.0);
    }

    #[test]
    fn death_flag_follows_last_cell() {
        let mut player = single_cell_player(30.0);
        assert!(player.alive);
        let id = player.cell_ids()[0];
        player.remove_cell(id);
        assert!(!player.alive);
        assert_eq!(player.cell_count(), 0);
    }
}

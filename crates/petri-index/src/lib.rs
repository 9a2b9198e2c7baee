//! Spatial indexing for neighborhood queries over circular bodies.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors emitted by spatial index implementations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., non-positive cell size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Common behaviour exposed by neighborhood indices.
pub trait NeighborhoodIndex {
    /// Rebuild internal structures from entity positions.
    fn rebuild(&mut self, positions: &[(f32, f32)]) -> Result<(), IndexError>;

    /// Visit every indexed entity within `radius_sq` of `center`, passing its
    /// position-list index and squared distance. Visit order follows bucket
    /// order and is deterministic for a fixed rebuild.
    fn neighbors_within(
        &self,
        center: (f32, f32),
        radius_sq: f32,
        visitor: &mut dyn FnMut(usize, OrderedFloat<f32>),
    );
}

/// Uniform grid over a bounded world. Positions outside the bounds are
/// clamped into the border cells rather than dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformGridIndex {
    cell_size: f32,
    cols: usize,
    rows: usize,
    #[serde(skip)]
    buckets: Vec<Vec<usize>>,
    #[serde(skip)]
    positions: Vec<(f32, f32)>,
}

impl UniformGridIndex {
    /// Create a grid covering a `width` x `height` world with square cells.
    #[must_use]
    pub fn new(cell_size: f32, width: f32, height: f32) -> Self {
        let cols = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            cols,
            rows,
            buckets: vec![Vec::new(); cols * rows],
            positions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, x: f32, y: f32) -> (usize, usize) {
        let col = ((x / self.cell_size).floor().max(0.0) as usize).min(self.cols - 1);
        let row = ((y / self.cell_size).floor().max(0.0) as usize).min(self.rows - 1);
        (col, row)
    }
}

impl NeighborhoodIndex for UniformGridIndex {
    fn rebuild(&mut self, positions: &[(f32, f32)]) -> Result<(), IndexError> {
        if self.cell_size <= 0.0 {
            return Err(IndexError::InvalidConfig("cell_size must be positive"));
        }
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        for (idx, &(x, y)) in positions.iter().enumerate() {
            let (col, row) = self.cell_of(x, y);
            self.buckets[row * self.cols + col].push(idx);
        }
        Ok(())
    }

    fn neighbors_within(
        &self,
        center: (f32, f32),
        radius_sq: f32,
        visitor: &mut dyn FnMut(usize, OrderedFloat<f32>),
    ) {
        if radius_sq < 0.0 {
            return;
        }
        let radius = radius_sq.sqrt();
        let (min_col, min_row) = self.cell_of(center.0 - radius, center.1 - radius);
        let (max_col, max_row) = self.cell_of(center.0 + radius, center.1 + radius);
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                for &idx in &self.buckets[row * self.cols + col] {
                    let (x, y) = self.positions[idx];
                    let dx = x - center.0;
                    let dy = y - center.1;
                    let dist_sq = dx * dx + dy * dy;
                    if dist_sq <= radius_sq {
                        visitor(idx, OrderedFloat(dist_sq));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_within(
        index: &UniformGridIndex,
        center: (f32, f32),
        radius_sq: f32,
    ) -> Vec<(usize, f32)> {
        let mut hits = Vec::new();
        index.neighbors_within(center, radius_sq, &mut |idx, dist_sq| {
            hits.push((idx, dist_sq.into_inner()));
        });
        hits.sort_by_key(|(idx, _)| *idx);
        hits
    }

    #[test]
    fn rebuild_rejects_bad_cell_size() {
        let mut index = UniformGridIndex::new(10.0, 100.0, 100.0);
        index.cell_size = 0.0;
        assert!(index.rebuild(&[(1.0, 1.0)]).is_err());
    }

    #[test]
    fn finds_neighbors_across_bucket_borders() {
        let mut index = UniformGridIndex::new(10.0, 100.0, 100.0);
        let positions = [(9.0, 9.0), (11.0, 11.0), (55.0, 55.0)];
        index.rebuild(&positions).expect("rebuild");

        let hits = collect_within(&index, (10.0, 10.0), 9.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 1);
        assert!((hits[0].1 - 2.0).abs() < 1e-5);
    }

    #[test]
    fn out_of_bounds_positions_are_clamped_not_lost() {
        let mut index = UniformGridIndex::new(10.0, 100.0, 100.0);
        index
            .rebuild(&[(-5.0, -5.0), (150.0, 150.0)])
            .expect("rebuild");

        let near_origin = collect_within(&index, (0.0, 0.0), 100.0);
        assert_eq!(near_origin.len(), 1);
        assert_eq!(near_origin[0].0, 0);

        let near_corner = collect_within(&index, (100.0, 100.0), 10_000.0);
        assert!(near_corner.iter().any(|(idx, _)| *idx == 1));
    }

    #[test]
    fn zero_radius_visits_exact_matches_only() {
        let mut index = UniformGridIndex::new(10.0, 100.0, 100.0);
        index.rebuild(&[(5.0, 5.0), (5.0, 6.0)]).expect("rebuild");
        let hits = collect_within(&index, (5.0, 5.0), 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);
    }
}

//! Scalar and vector helpers shared across the simulation.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// 2D world-space vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    #[must_use]
    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector pointing the same way, or zero for (near-)zero input.
    /// Never produces NaN components.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len < 1e-4 {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    #[must_use]
    pub fn lerp_toward(self, target: Self, factor: f32) -> Self {
        self + (target - self) * factor
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Body radius derived from mass. Transiently negative masses clamp to a
/// zero radius instead of propagating NaN out of the square root.
#[must_use]
pub fn radius_for_mass(mass: f32) -> f32 {
    ((mass.max(0.0) / std::f32::consts::PI).sqrt() * 6.0).floor()
}

/// Top speed shrinks with mass; heavyweights never drop below the floor.
#[must_use]
pub fn max_speed_for_mass(mass: f32) -> f32 {
    (6.0 - mass / 100.0).max(1.5)
}

//! Planar rotation with wrap-aware subtraction.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::ops::Sub;

/// Rotation in the plane, stored in radians.
///
/// Construction keeps the raw (possibly multi-turn) value; [`Rotation2d::minus`]
/// and [`Rotation2d::wrapped`] normalise into (-π, π].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation2d {
    radians: f64,
}

impl Rotation2d {
    #[inline]
    pub fn from_radians(radians: f64) -> Self {
        Self { radians }
    }

    #[inline]
    pub fn from_degrees(degrees: f64) -> Self {
        Self::from_radians(degrees.to_radians())
    }

    #[inline]
    pub fn from_rotations(rotations: f64) -> Self {
        Self::from_radians(rotations * TAU)
    }

    #[inline]
    pub fn radians(&self) -> f64 {
        self.radians
    }

    #[inline]
    pub fn degrees(&self) -> f64 {
        self.radians.to_degrees()
    }

    #[inline]
    pub fn rotations(&self) -> f64 {
        self.radians / TAU
    }

    /// Same direction, normalised into (-π, π].
    pub fn wrapped(&self) -> Self {
        let mut r = self.radians.rem_euclid(TAU);
        if r > PI {
            r -= TAU;
        }
        Self::from_radians(r)
    }

    /// Shortest signed angle from `other` to `self`, in (-π, π].
    pub fn minus(&self, other: Rotation2d) -> Self {
        Self::from_radians(self.radians - other.radians).wrapped()
    }
}

impl Sub for Rotation2d {
    type Output = Rotation2d;

    fn sub(self, rhs: Rotation2d) -> Self::Output {
        self.minus(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_subtraction() {
        let raw = Rotation2d::from_degrees(210.0);
        let offset = Rotation2d::from_degrees(203.0);
        assert!(((raw - offset).degrees() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_minus_wraps_across_zero() {
        let a = Rotation2d::from_degrees(2.0);
        let b = Rotation2d::from_degrees(358.0);
        assert!((a.minus(b).degrees() - 4.0).abs() < 1e-9);
        assert!((b.minus(a).degrees() + 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrapped_half_turn_is_positive() {
        let r = Rotation2d::from_degrees(-180.0).wrapped();
        assert!((r.degrees() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotations_round_trip() {
        let r = Rotation2d::from_rotations(1.0);
        assert!((r.radians() - TAU).abs() < 1e-12);
        assert!((r.rotations() - 1.0).abs() < 1e-12);
    }
}

//! Relative/absolute turn encoder reconciliation
//!
//! The relative encoder on the steering motor is precise but accumulates
//! error; the absolute encoder on the output is coarse but never drifts. Every
//! `interval_periods` periods the two are compared and, past the threshold,
//! the relative encoder is re-seeded.

use contracts::{DriftCorrectionConfig, GearRatio, Rotation2d};

use crate::units::truncate_to_decimals;

/// Period counter and re-seed computation for one module
#[derive(Debug, Clone)]
pub struct DriftCorrector {
    interval_periods: u32,
    threshold: f64,
    precision_decimals: u32,
    periods: u32,
    corrections: u64,
}

impl DriftCorrector {
    pub fn new(config: &DriftCorrectionConfig) -> Self {
        Self {
            interval_periods: config.interval_periods.max(1),
            threshold: config.threshold_deg.to_radians(),
            precision_decimals: config.precision_decimals,
            periods: 0,
            corrections: 0,
        }
    }

    /// Count one period; `true` when a check is due
    pub fn tick(&mut self) -> bool {
        self.periods += 1;
        if self.periods >= self.interval_periods {
            self.periods = 0;
            true
        } else {
            false
        }
    }

    /// New relative encoder position (motor rotations) if a re-seed is needed
    ///
    /// `relative_rotations` is the raw motor-side reading, `absolute` the
    /// calibrated steering angle. The re-seed keeps the relative encoder's
    /// whole-turn count and moves only the fractional angle onto the absolute
    /// reading, truncated to the configured precision.
    pub fn correction(
        &self,
        relative_rotations: f64,
        absolute: Rotation2d,
        ratio: GearRatio,
    ) -> Option<f64> {
        let relative = Rotation2d::from_rotations(relative_rotations / ratio.value());
        let error = relative.minus(absolute);
        if error.radians().abs() <= self.threshold {
            return None;
        }

        let target = relative.rotations() - error.rotations();
        Some(truncate_to_decimals(
            target * ratio.value(),
            self.precision_decimals,
        ))
    }

    pub fn record_correction(&mut self) {
        self.corrections += 1;
    }

    /// Re-seeds applied so far
    pub fn corrections(&self) -> u64 {
        self.corrections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector(interval_periods: u32) -> DriftCorrector {
        DriftCorrector::new(&DriftCorrectionConfig {
            interval_periods,
            ..Default::default()
        })
    }

    #[test]
    fn test_tick_cadence() {
        let mut drift = corrector(3);
        let due: Vec<_> = (0..7).map(|_| drift.tick()).collect();
        assert_eq!(due, [false, false, true, false, false, true, false]);
    }

    #[test]
    fn test_within_threshold_is_left_alone() {
        let drift = corrector(1);
        let ratio = GearRatio::new(10.0, 1.0);
        // 0.2 degrees apart
        let relative = 10.0 * (10.2 / 360.0);
        assert!(drift
            .correction(relative, Rotation2d::from_degrees(10.0), ratio)
            .is_none());
    }

    #[test]
    fn test_reseed_matches_absolute() {
        let drift = corrector(1);
        let ratio = GearRatio::new(10.0, 1.0);
        let relative = 10.0 * (12.0 / 360.0);

        let seed = drift
            .correction(relative, Rotation2d::from_degrees(10.0), ratio)
            .unwrap();
        let expected = truncate_to_decimals(10.0 * (10.0 / 360.0), 3);
        assert!((seed - expected).abs() < 1e-12);

        let corrected = Rotation2d::from_rotations(seed / ratio.value());
        assert!(corrected.minus(Rotation2d::from_degrees(10.0)).degrees().abs() < 0.3);
    }

    #[test]
    fn test_reseed_keeps_turn_count() {
        let drift = corrector(1);
        let ratio = GearRatio::new(1.0, 1.0);
        // two full turns plus 5 degrees, absolute says 1 degree
        let relative = 2.0 + 5.0 / 360.0;

        let seed = drift
            .correction(relative, Rotation2d::from_degrees(1.0), ratio)
            .unwrap();
        assert!((seed - truncate_to_decimals(2.0 + 1.0 / 360.0, 3)).abs() < 1e-12);
    }

    #[test]
    fn test_correction_across_wrap() {
        let drift = corrector(1);
        let ratio = GearRatio::new(1.0, 1.0);
        // relative at -1 degree, absolute at +359 == -1: no drift
        assert!(drift
            .correction(-1.0 / 360.0, Rotation2d::from_degrees(359.0), ratio)
            .is_none());
    }

    #[test]
    fn test_reseed_settles_on_swerve_ratio() {
        let drift = DriftCorrector::new(&DriftCorrectionConfig {
            interval_periods: 1,
            threshold_deg: 0.3,
            precision_decimals: 2,
        });
        let ratio = GearRatio::swerve_turn();
        let absolute = Rotation2d::from_degrees(10.7);
        let relative = 12.0 / 360.0 * ratio.value();

        let seed = drift.correction(relative, absolute, ratio).unwrap();
        // the truncated seed is within threshold, so no second correction
        assert!(drift.correction(seed, absolute, ratio).is_none());
        let settled = Rotation2d::from_rotations(seed / ratio.value());
        assert!(settled.minus(absolute).degrees().abs() < 0.3);
    }
}

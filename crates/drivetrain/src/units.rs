//! Unit conversion between raw sensor units and physical units

use std::f64::consts::TAU;

use contracts::GearRatio;

/// Rotations to radians
#[inline]
pub fn rotations_to_radians(rotations: f64) -> f64 {
    rotations * TAU
}

/// Rotations per minute to radians per second
#[inline]
pub fn rpm_to_radians_per_second(rpm: f64) -> f64 {
    rpm * TAU / 60.0
}

/// Motor-side quantity to mechanism-side quantity
#[inline]
pub fn motor_to_mechanism(value: f64, ratio: GearRatio) -> f64 {
    value / ratio.value()
}

/// Motor rotations to mechanism radians
#[inline]
pub fn motor_rotations_to_radians(rotations: f64, ratio: GearRatio) -> f64 {
    motor_to_mechanism(rotations_to_radians(rotations), ratio)
}

/// Motor RPM to mechanism radians per second
#[inline]
pub fn motor_rpm_to_radians_per_second(rpm: f64, ratio: GearRatio) -> f64 {
    motor_to_mechanism(rpm_to_radians_per_second(rpm), ratio)
}

/// Drop (not round) everything past `decimals` decimal places
#[inline]
pub fn truncate_to_decimals(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).trunc() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_rotation() {
        assert!((rotations_to_radians(1.0) - TAU).abs() < 1e-12);

        let ratio = GearRatio::new(6.75, 1.0);
        assert!((motor_rotations_to_radians(1.0, ratio) - TAU / 6.75).abs() < 1e-12);
    }

    #[test]
    fn test_rpm() {
        assert!((rpm_to_radians_per_second(60.0) - TAU).abs() < 1e-12);
        let ratio = GearRatio::new(2.0, 1.0);
        assert!((motor_rpm_to_radians_per_second(120.0, ratio) - TAU).abs() < 1e-12);
    }

    #[test]
    fn test_truncate_not_round() {
        assert_eq!(truncate_to_decimals(1.23456, 3), 1.234);
        assert_eq!(truncate_to_decimals(-1.23456, 3), -1.234);
        assert_eq!(truncate_to_decimals(0.9999, 0), 0.0);
    }
}

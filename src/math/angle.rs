//! Heading normalisation.
//!
//! Two ranges are in use across the planner and they are not interchangeable:
//! headings stored on waypoints live in `[0, 2π)`, while heading errors fed to
//! controllers live in `(-π, π]`.

use std::f64::consts::{PI, TAU};

/// Maps any angle into `[0, 2π)`.
pub fn fix_negative_angle(a: f64) -> f64 {
    let angle = a.rem_euclid(TAU);
    // `rem_euclid` rounds tiny negative inputs up to exactly 2π
    if angle >= TAU {
        0.0
    } else {
        angle
    }
}

/// Maps any angle into `(-π, π]`.
pub fn split_positive_angle(a: f64) -> f64 {
    let angle = fix_negative_angle(a);
    if angle > PI {
        angle - TAU
    } else {
        angle
    }
}

/// The absolute difference between two angles, in `[0, π]`.
pub fn angle_between_two_angles_positive(a1: f64, a2: f64) -> f64 {
    let diff = fix_negative_angle(a1 - a2);
    if diff > PI {
        TAU - diff
    } else {
        diff
    }
}

/// The opposite heading, in `[0, 2π)`.
pub fn inverse_angle(a: f64) -> f64 {
    fix_negative_angle(a + PI)
}

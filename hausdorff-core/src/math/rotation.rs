use std::f64::consts::PI;

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::Dimension;

/// Wraps `angle` into the half-open interval `[-PI, PI)`
/// ```
/// # use hausdorff_core::math::wrap_angle;
/// # use std::f64::consts::PI;
/// assert_eq!(wrap_angle(PI), -PI);
/// assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
/// ```
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Projects an axis-angle vector onto the ball of radius `PI`. Vectors that are already inside the
/// ball are returned unchanged
pub fn clamp_rotation_vector(v: Vector3<f64>) -> Vector3<f64> {
    let angle = v.norm();
    if angle > PI {
        v * (PI / angle)
    } else {
        v
    }
}

/// Brings rotation parameters into their canonical range: planar angles are wrapped into `[-PI, PI)`,
/// spatial axis-angle vectors are clamped to a magnitude of at most `PI`
pub fn normalize_rotation(dimension: Dimension, v: Vector3<f64>) -> Vector3<f64> {
    match dimension {
        Dimension::Planar => Vector3::new(0.0, 0.0, wrap_angle(v.z)),
        Dimension::Spatial => clamp_rotation_vector(v),
    }
}

/// Rotation matrix for the given (already normalized) rotation parameters
pub fn rotation_matrix(dimension: Dimension, v: &Vector3<f64>) -> Matrix3<f64> {
    match dimension {
        Dimension::Planar => {
            // Built by hand so that the z-row and z-column are exactly zero
            let (sin, cos) = v.z.sin_cos();
            Matrix3::new(cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0)
        }
        Dimension::Spatial => Rotation3::new(*v).into_inner(),
    }
}

/// The fixed reflection that is applied before rotating: negation of the x-axis
pub fn reflection_matrix() -> Matrix3<f64> {
    Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, 1.0))
}

/// Extracts rotation parameters from a proper rotation matrix
pub fn rotation_parameters(dimension: Dimension, rotation: &Matrix3<f64>) -> Vector3<f64> {
    match dimension {
        Dimension::Planar => Vector3::new(0.0, 0.0, rotation[(1, 0)].atan2(rotation[(0, 0)])),
        Dimension::Spatial => Rotation3::from_matrix_unchecked(*rotation).scaled_axis(),
    }
}

/// Maximum distance that a point at distance `radius` from the rotation origin can move when the
/// rotation changes by `angle`. This is the chord length `sqrt(2(1 - cos(angle))) * radius`, with
/// the angle capped at `PI`
/// ```
/// # use hausdorff_core::math::chordal_displacement;
/// # use std::f64::consts::PI;
/// assert!((chordal_displacement(PI, 1.0) - 2.0).abs() < 1e-12);
/// assert_eq!(chordal_displacement(0.0, 5.0), 0.0);
/// ```
pub fn chordal_displacement(angle: f64, radius: f64) -> f64 {
    let angle = angle.abs().min(PI);
    (2.0 * (1.0 - angle.cos())).max(0.0).sqrt() * radius
}

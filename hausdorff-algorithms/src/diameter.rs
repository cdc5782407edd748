use anyhow::{ensure, Result};
use hausdorff_core::{nalgebra::Vector3, PointCloud};
use itertools::Itertools;

use crate::convexhull::convex_hull_points;

/// Computes the diameter (largest pairwise distance) of the given `points`. The diameter is always realized by two
/// vertices of the convex hull, so only hull vertices are compared. Returns zero for empty or single-point inputs
/// ```
/// # use hausdorff_algorithms::diameter::diameter_of_points;
/// # use hausdorff_core::nalgebra::Vector3;
/// let points = vec![
///     Vector3::new(0.0, 0.0, 0.0),
///     Vector3::new(3.0, 4.0, 0.0),
///     Vector3::new(1.0, 1.0, 0.0),
/// ];
/// assert_eq!(diameter_of_points(&points), 5.0);
/// ```
pub fn diameter_of_points(points: &[Vector3<f64>]) -> f64 {
    convex_hull_points(points)
        .into_iter()
        .tuple_combinations()
        .map(|(a, b)| (points[a] - points[b]).magnitude())
        .fold(0.0, f64::max)
}

/// Computes the diameter of a point cloud
pub fn diameter(cloud: &PointCloud) -> f64 {
    diameter_of_points(cloud.points())
}

/// The larger of the diameters of `a` and `b`
pub fn max_diameter(a: &PointCloud, b: &PointCloud) -> f64 {
    diameter(a).max(diameter(b))
}

/// Converts a relative `target_accuracy` in `(0, 1)` into an absolute error tolerance, relative to the larger
/// diameter of the two clouds
pub fn target_error(a: &PointCloud, b: &PointCloud, target_accuracy: f64) -> Result<f64> {
    ensure!(
        target_accuracy > 0.0 && target_accuracy < 1.0,
        "Target accuracy must be in (0, 1), got {}",
        target_accuracy
    );
    Ok(target_accuracy * max_diameter(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};

    fn brute_force_diameter(points: &[Vector3<f64>]) -> f64 {
        points
            .iter()
            .tuple_combinations()
            .map(|(a, b)| (a - b).magnitude())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_diameter_single_point_is_zero() -> Result<()> {
        let cloud = PointCloud::from_coordinates(&[[4.0, 2.0]])?;
        assert_eq!(diameter(&cloud), 0.0);
        Ok(())
    }

    #[test]
    fn test_diameter_matches_brute_force_3d() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = Uniform::new(-50.0, 50.0);
        for count in [2usize, 3, 4, 10, 100, 500].iter().copied() {
            let points = (0..count)
                .map(|_| Vector3::new(rng.sample(range), rng.sample(range), rng.sample(range)))
                .collect::<Vec<_>>();
            assert_approx_eq!(diameter_of_points(&points), brute_force_diameter(&points), 1e-9);
        }
    }

    #[test]
    fn test_diameter_matches_brute_force_planar() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(8);
        let range = Uniform::new(-5.0, 5.0);
        for _ in 0..10 {
            let coordinates = (0..60)
                .map(|_| [rng.sample(range), rng.sample(range)])
                .collect::<Vec<_>>();
            let cloud = PointCloud::from_coordinates(&coordinates)?;
            assert_approx_eq!(diameter(&cloud), brute_force_diameter(cloud.points()), 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_target_error() -> Result<()> {
        let a = PointCloud::from_coordinates(&[[0.0, 0.0], [4.0, 0.0]])?;
        let b = PointCloud::from_coordinates(&[[0.0, 0.0], [0.0, 10.0]])?;
        assert_approx_eq!(target_error(&a, &b, 0.05)?, 0.5, 1e-12);
        assert!(target_error(&a, &b, 0.0).is_err());
        assert!(target_error(&a, &b, 1.0).is_err());
        Ok(())
    }
}

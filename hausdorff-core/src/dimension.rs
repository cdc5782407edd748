use anyhow::{bail, ensure, Result};
use nalgebra::Vector3;

/// The dimensionality of a point cloud. Planar data is stored with a zero z-coordinate, so that all
/// geometry can use `Vector3<f64>` regardless of the dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimension {
    /// 2D points, rotations about the z-axis
    Planar,
    /// 3D points, rotations encoded as axis-angle vectors
    Spatial,
}

impl Dimension {
    /// Returns the `Dimension` for points with `dim` coordinates. Only 2 and 3 are supported
    /// ```
    /// # use hausdorff_core::Dimension;
    /// assert_eq!(Dimension::from_dim(2).unwrap(), Dimension::Planar);
    /// assert!(Dimension::from_dim(4).is_err());
    /// ```
    pub fn from_dim(dim: usize) -> Result<Self> {
        match dim {
            2 => Ok(Dimension::Planar),
            3 => Ok(Dimension::Spatial),
            other => bail!(
                "Unsupported point dimension {} (only 2D and 3D data is supported)",
                other
            ),
        }
    }

    /// Number of coordinates per point
    pub fn dim(self) -> usize {
        match self {
            Dimension::Planar => 2,
            Dimension::Spatial => 3,
        }
    }

    /// Number of rotation parameters, which is `k(k-1)/2` for `k = self.dim()`
    pub fn rotation_dim(self) -> usize {
        match self {
            Dimension::Planar => 1,
            Dimension::Spatial => 3,
        }
    }

    /// Lifts a coordinate tuple of this dimension to a `Vector3<f64>`
    pub fn lift(self, coordinates: &[f64]) -> Result<Vector3<f64>> {
        ensure!(
            coordinates.len() == self.dim(),
            "Expected {} coordinates but got {}",
            self.dim(),
            coordinates.len()
        );
        ensure!(
            coordinates.iter().all(|c| c.is_finite()),
            "Coordinates must be finite, got {:?}",
            coordinates
        );
        Ok(match self {
            Dimension::Planar => Vector3::new(coordinates[0], coordinates[1], 0.0),
            Dimension::Spatial => Vector3::new(coordinates[0], coordinates[1], coordinates[2]),
        })
    }

    /// Lifts rotation parameters of this dimension to an axis-angle vector. Planar angles become
    /// rotations about the z-axis
    pub fn lift_rotation(self, parameters: &[f64]) -> Result<Vector3<f64>> {
        ensure!(
            parameters.len() == self.rotation_dim(),
            "Expected {} rotation parameters but got {}",
            self.rotation_dim(),
            parameters.len()
        );
        ensure!(
            parameters.iter().all(|c| c.is_finite()),
            "Rotation parameters must be finite, got {:?}",
            parameters
        );
        Ok(match self {
            Dimension::Planar => Vector3::new(0.0, 0.0, parameters[0]),
            Dimension::Spatial => Vector3::new(parameters[0], parameters[1], parameters[2]),
        })
    }

    /// Drops the coordinates of `v` that do not exist in this dimension
    pub fn project(self, v: &Vector3<f64>) -> Vec<f64> {
        match self {
            Dimension::Planar => vec![v.x, v.y],
            Dimension::Spatial => vec![v.x, v.y, v.z],
        }
    }

    /// Inverse of [lift_rotation](Dimension::lift_rotation)
    pub fn project_rotation(self, v: &Vector3<f64>) -> Vec<f64> {
        match self {
            Dimension::Planar => vec![v.z],
            Dimension::Spatial => vec![v.x, v.y, v.z],
        }
    }

    /// Zeroes out the components of `v` that are meaningless in this dimension
    pub(crate) fn restrict(self, v: Vector3<f64>) -> Vector3<f64> {
        match self {
            Dimension::Planar => Vector3::new(v.x, v.y, 0.0),
            Dimension::Spatial => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_sizes() {
        assert_eq!(Dimension::Planar.dim(), 2);
        assert_eq!(Dimension::Planar.rotation_dim(), 1);
        assert_eq!(Dimension::Spatial.dim(), 3);
        assert_eq!(Dimension::Spatial.rotation_dim(), 3);
    }

    #[test]
    fn test_from_dim_rejects_unsupported() {
        assert!(Dimension::from_dim(1).is_err());
        assert!(Dimension::from_dim(0).is_err());
        assert!(Dimension::from_dim(4).is_err());
    }

    #[test]
    fn test_lift_and_project() -> Result<()> {
        let lifted = Dimension::Planar.lift(&[1.0, 2.0])?;
        assert_eq!(lifted, Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(Dimension::Planar.project(&lifted), vec![1.0, 2.0]);

        let rotation = Dimension::Planar.lift_rotation(&[0.5])?;
        assert_eq!(rotation, Vector3::new(0.0, 0.0, 0.5));
        assert_eq!(Dimension::Planar.project_rotation(&rotation), vec![0.5]);

        assert!(Dimension::Spatial.lift(&[1.0, 2.0]).is_err());
        assert!(Dimension::Spatial.lift(&[1.0, f64::NAN, 2.0]).is_err());
        assert!(Dimension::Planar.lift_rotation(&[0.1, 0.2, 0.3]).is_err());
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<()> {
        let json = serde_json::to_string(&Dimension::Spatial)?;
        assert_eq!(json, "\"Spatial\"");
        let dimension: Dimension = serde_json::from_str(&json)?;
        assert_eq!(dimension, Dimension::Spatial);
        Ok(())
    }
}

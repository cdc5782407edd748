use anyhow::{ensure, Result};
use nalgebra::{Matrix3, Vector3};

use crate::{
    math::{normalize_rotation, reflection_matrix, rotation_matrix, rotation_parameters},
    Dimension,
};

/// A rigid motion, optionally composed with a reflection. Applying it to a point `x` computes
/// `R * S * x + t`, where `S` negates the x-axis if the transformation reflects and is the identity
/// otherwise, `R` is the rotation described by the rotation parameters and `t` is the translation.
///
/// Rotation parameters are a single angle in `[-PI, PI)` for planar data and an axis-angle vector of
/// magnitude at most `PI` for spatial data. Transformations are immutable values; all operations
/// return new instances
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    dimension: Dimension,
    translation: Vector3<f64>,
    rotation: Vector3<f64>,
    reflect: bool,
    linear: Matrix3<f64>,
}

impl Transformation {
    /// Creates a new `Transformation` from raw parameters. `translation` must have `dimension.dim()`
    /// entries and `rotation` must have `dimension.rotation_dim()` entries
    /// ```
    /// # use hausdorff_core::{Dimension, Transformation};
    /// # use hausdorff_core::nalgebra::Vector3;
    /// let t = Transformation::new(Dimension::Planar, &[1.0, 0.0], &[std::f64::consts::FRAC_PI_2], false).unwrap();
    /// let p = t.apply_point(&Vector3::new(1.0, 0.0, 0.0));
    /// assert!((p - Vector3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
    /// ```
    pub fn new(
        dimension: Dimension,
        translation: &[f64],
        rotation: &[f64],
        reflect: bool,
    ) -> Result<Self> {
        let translation = dimension.lift(translation)?;
        let rotation = dimension.lift_rotation(rotation)?;
        Ok(Self::from_vectors(dimension, translation, rotation, reflect))
    }

    /// Creates a new `Transformation` from lifted parameters. Components that do not exist in the given
    /// `dimension` (the z-translation and the x/y rotation axes of planar data) are ignored
    pub fn from_vectors(
        dimension: Dimension,
        translation: Vector3<f64>,
        rotation: Vector3<f64>,
        reflect: bool,
    ) -> Self {
        let translation = dimension.restrict(translation);
        let rotation = normalize_rotation(dimension, rotation);
        let mut linear = rotation_matrix(dimension, &rotation);
        if reflect {
            linear *= reflection_matrix();
        }
        Self {
            dimension,
            translation,
            rotation,
            reflect,
            linear,
        }
    }

    /// The identity transformation
    pub fn identity(dimension: Dimension) -> Self {
        Self::from_vectors(dimension, Vector3::zeros(), Vector3::zeros(), false)
    }

    /// Returns a copy of this transformation with the translation replaced by `translation`
    pub fn with_translation(&self, translation: Vector3<f64>) -> Self {
        Self::from_vectors(self.dimension, translation, self.rotation, self.reflect)
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// The translation, lifted to 3D
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// The rotation parameters as an axis-angle vector. For planar data only the z-component is used
    pub fn rotation(&self) -> &Vector3<f64> {
        &self.rotation
    }

    /// The rotation parameters in their native dimension (1 angle or 3 axis-angle components)
    pub fn rotation_parameters(&self) -> Vec<f64> {
        self.dimension.project_rotation(&self.rotation)
    }

    pub fn reflects(&self) -> bool {
        self.reflect
    }

    /// The linear part `R * S` of this transformation
    pub fn linear_part(&self) -> &Matrix3<f64> {
        &self.linear
    }

    /// Applies this transformation to a single point
    pub fn apply_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.linear * point + self.translation
    }

    /// Applies this transformation to all `points`
    pub fn apply(&self, points: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        points.iter().map(|p| self.apply_point(p)).collect()
    }

    /// Returns the inverse transformation. The inverse has the same form (rotation, reflection flag and
    /// translation): for `x -> R*S*x + t` it is `y -> R'*S*y + t'` with `R' = S*R^T*S` and `t' = -(R*S)^T * t`
    pub fn invert(&self) -> Self {
        let rotation = if self.reflect {
            // S * R(v)^T * S is the rotation about S*v by the same angle
            Vector3::new(-self.rotation.x, self.rotation.y, self.rotation.z)
        } else {
            -self.rotation
        };
        let translation = -(self.linear.transpose() * self.translation);
        Self::from_vectors(self.dimension, translation, rotation, self.reflect)
    }

    /// Returns the transformation that first applies `other` and then `self`
    pub fn compose(&self, other: &Transformation) -> Result<Self> {
        ensure!(
            self.dimension == other.dimension,
            "Can't compose a {:?} transformation with a {:?} transformation",
            self.dimension,
            other.dimension
        );
        let linear = self.linear * other.linear;
        let translation = self.linear * other.translation + self.translation;
        let reflect = self.reflect != other.reflect;
        let rotation_part = if reflect {
            linear * reflection_matrix()
        } else {
            linear
        };
        let rotation = rotation_parameters(self.dimension, &rotation_part);
        Ok(Self::from_vectors(
            self.dimension,
            translation,
            rotation,
            reflect,
        ))
    }
}

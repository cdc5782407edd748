use std::{cell::OnceCell, fmt};

use anyhow::{anyhow, ensure, Result};
use kd_tree::KdTree;
use nalgebra::Vector3;

use crate::{Dimension, Transformation};

/// An immutable, non-empty, finite set of 2D or 3D points.
///
/// Positions are stored as `Vector3<f64>`, planar clouds have a z-coordinate of zero. The first time a
/// `PointCloud` is used as the target of [directed_distance](PointCloud::directed_distance), a kd-tree
/// over its points is built and cached, so that repeated queries against the same cloud are fast
pub struct PointCloud {
    dimension: Dimension,
    points: Vec<Vector3<f64>>,
    index: OnceCell<KdTree<[f64; 3]>>,
}

impl PointCloud {
    /// Creates a new `PointCloud` from the given `points`. Fails if `points` is empty, if any coordinate
    /// is not finite, or if a planar cloud contains a point with non-zero z-coordinate
    pub fn new(dimension: Dimension, points: Vec<Vector3<f64>>) -> Result<Self> {
        ensure!(!points.is_empty(), "A point cloud must contain at least one point");
        if let Some(bad) = points.iter().find(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(anyhow!("Point {:?} has non-finite coordinates", bad));
        }
        if dimension == Dimension::Planar {
            ensure!(
                points.iter().all(|p| p.z == 0.0),
                "Planar point clouds must have a z-coordinate of zero"
            );
        }
        Ok(Self::from_raw(dimension, points))
    }

    /// Creates a new `PointCloud` from raw coordinate tuples. The dimension is taken from the first tuple
    /// and must be 2 or 3; all other tuples must have the same length
    /// ```
    /// # use hausdorff_core::{Dimension, PointCloud};
    /// let cloud = PointCloud::from_coordinates(&[[0.0, 0.0], [1.0, 2.0]]).unwrap();
    /// assert_eq!(cloud.dimension(), Dimension::Planar);
    /// assert_eq!(cloud.len(), 2);
    /// assert!(PointCloud::from_coordinates(&[vec![0.0, 0.0], vec![1.0, 2.0, 3.0]]).is_err());
    /// ```
    pub fn from_coordinates<C: AsRef<[f64]>>(coordinates: &[C]) -> Result<Self> {
        let first = coordinates
            .first()
            .ok_or_else(|| anyhow!("A point cloud must contain at least one point"))?;
        let dimension = Dimension::from_dim(first.as_ref().len())?;
        let points = coordinates
            .iter()
            .enumerate()
            .map(|(index, c)| {
                dimension
                    .lift(c.as_ref())
                    .map_err(|e| anyhow!("Invalid point #{}: {}", index, e))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(dimension, points)
    }

    /// Creates a planar `PointCloud` from 2D coordinates
    pub fn from_planar(coordinates: &[[f64; 2]]) -> Result<Self> {
        let points = coordinates
            .iter()
            .map(|[x, y]| Vector3::new(*x, *y, 0.0))
            .collect();
        Self::new(Dimension::Planar, points)
    }

    /// Creates a spatial `PointCloud` from 3D coordinates
    pub fn from_spatial(coordinates: &[[f64; 3]]) -> Result<Self> {
        let points = coordinates
            .iter()
            .map(|[x, y, z]| Vector3::new(*x, *y, *z))
            .collect();
        Self::new(Dimension::Spatial, points)
    }

    fn from_raw(dimension: Dimension, points: Vec<Vector3<f64>>) -> Self {
        Self {
            dimension,
            points,
            index: OnceCell::new(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`, a `PointCloud` can't be empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    /// Returns the points as coordinate tuples in the native dimension of this cloud
    pub fn coordinates(&self) -> Vec<Vec<f64>> {
        self.points
            .iter()
            .map(|p| self.dimension.project(p))
            .collect()
    }

    /// The arithmetic mean of all points
    pub fn centroid(&self) -> Vector3<f64> {
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc: Vector3<f64>, p| acc + p);
        sum / self.points.len() as f64
    }

    /// Returns a copy of this cloud that is translated so that its centroid is the origin
    pub fn centered(&self) -> PointCloud {
        let centroid = self.centroid();
        let points = self.points.iter().map(|p| p - centroid).collect();
        Self::from_raw(self.dimension, points)
    }

    /// The largest distance of any point in this cloud from the origin
    pub fn max_norm(&self) -> f64 {
        self.points.iter().map(|p| p.norm()).fold(0.0, f64::max)
    }

    /// Returns a copy of this cloud with all coordinates multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Result<PointCloud> {
        ensure!(
            factor.is_finite() && factor > 0.0,
            "Scale factor must be finite and positive, got {}",
            factor
        );
        let points = self.points.iter().map(|p| p * factor).collect();
        Ok(Self::from_raw(self.dimension, points))
    }

    /// Applies `transformation` to every point, returning the result as a new `PointCloud`
    pub fn transform(&self, transformation: &Transformation) -> Result<PointCloud> {
        ensure!(
            transformation.dimension() == self.dimension,
            "Can't apply a {:?} transformation to a {:?} point cloud",
            transformation.dimension(),
            self.dimension
        );
        Ok(Self::from_raw(
            self.dimension,
            transformation.apply(&self.points),
        ))
    }

    /// The one-sided Hausdorff distance from this cloud to `other`: the largest distance of any point
    /// in `self` to its nearest neighbour in `other`. Note that this is not symmetric!
    pub fn directed_distance(&self, other: &PointCloud) -> Result<f64> {
        ensure!(
            self.dimension == other.dimension,
            "Can't compare a {:?} point cloud with a {:?} point cloud",
            self.dimension,
            other.dimension
        );
        let index = other.index();
        let max_squared_distance = self
            .points
            .iter()
            .map(|p| {
                index
                    .nearest(&[p.x, p.y, p.z])
                    .map(|nearest| nearest.squared_distance)
                    .unwrap_or(f64::INFINITY)
            })
            .fold(0.0, f64::max);
        Ok(max_squared_distance.sqrt())
    }

    fn index(&self) -> &KdTree<[f64; 3]> {
        self.index.get_or_init(|| {
            let positions = self
                .points
                .iter()
                .map(|p| [p.x, p.y, p.z])
                .collect::<Vec<_>>();
            KdTree::build_by_ordered_float(positions)
        })
    }
}

impl Clone for PointCloud {
    fn clone(&self) -> Self {
        Self::from_raw(self.dimension, self.points.clone())
    }
}

impl fmt::Debug for PointCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointCloud")
            .field("dimension", &self.dimension)
            .field("points", &self.points)
            .finish()
    }
}

/// The symmetric Hausdorff distance between `a` and `b` after moving `a` by `transformation`:
/// `max(h(T(a), b), h(T^-1(b), a))`, where `h` is the [directed distance](PointCloud::directed_distance)
pub fn symmetric_hausdorff(
    a: &PointCloud,
    b: &PointCloud,
    transformation: &Transformation,
) -> Result<f64> {
    let forward = a.transform(transformation)?.directed_distance(b)?;
    let backward = b.transform(&transformation.invert())?.directed_distance(a)?;
    Ok(forward.max(backward))
}

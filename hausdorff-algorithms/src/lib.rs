#![warn(clippy::all)]
//! Algorithms for pose-invariant matching of point clouds.
//!
//! The main entry point is the branch-and-bound [search](crate::search) that approximates the minimum
//! Hausdorff distance between two point clouds over all rigid motions, together with a bound on the error of
//! that approximation.

// Convex hull of a point set, used to compute diameters efficiently.
pub mod convexhull;
// Diameter of point clouds and conversion of relative accuracies into absolute error tolerances.
pub mod diameter;
// Regular lattices that cover a ball in translation or rotation parameter space.
pub mod grid;
// The branch-and-bound search itself.
pub mod search;

pub use search::{approximate_hausdorff, match_clouds, HausdorffSearch, SearchConfig, SearchResult};

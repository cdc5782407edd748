#![warn(clippy::all)]

//! Core data structures for pose-invariant shape matching
//!
//! This crate provides the two building blocks that every Hausdorff matching algorithm works on:
//! the immutable [PointCloud](crate::cloud::PointCloud) and the rigid (possibly reflected) motion
//! [Transformation](crate::transform::Transformation). Both 2D and 3D data is supported, see
//! [Dimension](crate::dimension::Dimension).

pub extern crate nalgebra;

/// Finite point sets and the directed/symmetric Hausdorff distance between them
pub mod cloud;
/// Supported dimensionalities of the input data
pub mod dimension;
/// Math helpers for rotations and rotation parameters
pub mod math;
/// Rigid motions with optional reflection
pub mod transform;

pub use cloud::{symmetric_hausdorff, PointCloud};
pub use dimension::Dimension;
pub use transform::Transformation;

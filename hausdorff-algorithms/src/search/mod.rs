//! Branch-and-bound search for the rigid motion that minimizes the symmetric Hausdorff distance between two
//! point clouds.
//!
//! Both clouds are centered on their centroids, so the search covers translations within the larger radius of
//! the two clouds and all rotations. The joint translation/rotation space is partitioned into cells at increasing
//! resolution levels. Each cell is evaluated exactly at its representative motion, and a Lipschitz bound turns
//! that value into a lower bound for every motion in the cell. The cell with the smallest key is always refined
//! next, until either the proven gap is small enough (accuracy mode) or the best distance stops improving (stall
//! mode).
use std::f64::consts::PI;

use anyhow::{ensure, Result};
use hausdorff_core::{
    math::chordal_displacement,
    nalgebra::{DVector, Vector3},
    symmetric_hausdorff, Dimension, PointCloud, Transformation,
};
use itertools::Itertools;
use log::debug;

use crate::{
    diameter::max_diameter,
    grid::{covering_radius, GridBuilder, LatticeVertex},
};

mod config;
pub use self::config::*;

mod frontier;
use self::frontier::{Candidate, Frontier};

mod trace;
pub use self::trace::*;

/// Why a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// The proven gap is within the target error
    Converged,
    /// Too many refinements in a row did not improve the best distance
    Stalled,
    /// The configured maximum number of iterations was reached
    IterationLimit,
    /// Both clouds collapse to a single location, so a translation aligns them exactly
    Degenerate,
    /// No cells are left to refine
    FrontierExhausted,
    /// The search was stopped by the caller before any criterion was met
    Interrupted,
}

/// Result of a single [step](HausdorffSearch::step)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Running,
    Finished(TerminationReason),
}

impl SearchStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, SearchStatus::Finished(_))
    }
}

/// Outcome of a search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Smallest symmetric Hausdorff distance that was found
    pub distance: f64,
    /// Upper bound on `distance - optimum`. Certified in accuracy mode, an estimate in stall mode
    pub error_bound: f64,
    /// The motion that realizes `distance`, mapping the first cloud onto the second
    pub transformation: Transformation,
    pub iterations: usize,
    pub termination: TerminationReason,
}

/// Incremental branch-and-bound search. Construct with [new](HausdorffSearch::new) and either call
/// [run](HausdorffSearch::run) or drive it with [step](HausdorffSearch::step), e.g. to enforce a timeout
pub struct HausdorffSearch {
    source: PointCloud,
    target: PointCloud,
    source_centroid: Vector3<f64>,
    target_centroid: Vector3<f64>,
    config: SearchConfig,
    termination: Termination,
    target_error: Option<f64>,
    radius: f64,
    translation_grid: GridBuilder,
    rotation_grid: GridBuilder,
    translation_edge: f64,
    rotation_edge: f64,
    frontier: Frontier,
    best_found: f64,
    best_motion: Option<(DVector<f64>, DVector<f64>, bool)>,
    seed_candidates: usize,
    iterations: usize,
    stall_count: usize,
    stall_estimate: Option<f64>,
    finished: Option<TerminationReason>,
}

impl HausdorffSearch {
    /// Validates the inputs, centers both clouds and evaluates the level-0 candidates
    pub fn new(a: &PointCloud, b: &PointCloud, config: SearchConfig) -> Result<Self> {
        ensure!(
            a.dimension() == b.dimension(),
            "Point clouds must have the same dimension, got {} and {}",
            a.dimension().dim(),
            b.dimension().dim()
        );
        ensure!(!a.is_empty() && !b.is_empty(), "Point clouds must not be empty");
        let termination = config.validate()?;

        let dimension = a.dimension();
        let source = a.centered();
        let target = b.centered();
        let diameter = max_diameter(a, b);
        // centering identical points can leave rounding noise, the diameter is exact
        let radius = if diameter == 0.0 {
            0.0
        } else {
            source.max_norm().max(target.max_norm())
        };
        let target_error = match termination {
            Termination::Accuracy { target_accuracy } => Some(target_accuracy * diameter),
            Termination::Stall { .. } => None,
        };

        let translation_grid = GridBuilder::new(DVector::zeros(dimension.dim()), 4.0 * radius, radius);
        let rotation_edge = match dimension {
            Dimension::Planar => 2.0,
            Dimension::Spatial => 4.0,
        };
        let rotation_grid = GridBuilder::new(DVector::zeros(dimension.rotation_dim()), rotation_edge, PI);

        let mut search = Self {
            source,
            target,
            source_centroid: a.centroid(),
            target_centroid: b.centroid(),
            config,
            termination,
            target_error,
            radius,
            translation_grid,
            rotation_grid,
            translation_edge: 0.0,
            rotation_edge: 0.0,
            frontier: Frontier::default(),
            best_found: f64::INFINITY,
            best_motion: None,
            seed_candidates: 0,
            iterations: 0,
            stall_count: 0,
            stall_estimate: None,
            finished: None,
        };

        if radius == 0.0 {
            debug!("Both point clouds collapse to a single location, aligning centroids");
            search.best_found = 0.0;
            search.finished = Some(TerminationReason::Degenerate);
            return Ok(search);
        }

        search.seed()?;
        debug!(
            "Seeded search over {:?} clouds with {} and {} points: radius {}, {} candidates, target error {:?}",
            dimension,
            a.len(),
            b.len(),
            radius,
            search.seed_candidates,
            search.target_error
        );
        search.check_termination();
        Ok(search)
    }

    fn seed(&mut self) -> Result<()> {
        let translations = self.translation_grid.build()?;
        let rotations = self.rotation_grid.build()?;
        self.translation_edge = translations.cell_edge();
        self.rotation_edge = rotations.cell_edge();

        let candidates = translations
            .vertices()
            .iter()
            .cartesian_product(rotations.vertices().iter())
            .map(|(translation, rotation)| self.evaluate(translation, rotation, 0))
            .collect::<Result<Vec<_>>>()?;
        self.seed_candidates = candidates.len();
        for candidate in candidates {
            let key = self.key_of(&candidate, 0.0);
            self.frontier.push(key, candidate);
        }
        Ok(())
    }

    /// Cell edge lengths of the translation and rotation cells at the given level
    fn cell_edges(&self, level: u32) -> (f64, f64) {
        let scale = (self.config.branching_factor as f64).powi(level as i32);
        (self.translation_edge / scale, self.rotation_edge / scale)
    }

    /// Upper bound on how much the symmetric Hausdorff distance can change between the representative motion of a
    /// cell at the given level and any other motion in that cell
    pub fn lipschitz_bound(&self, level: u32) -> f64 {
        let (translation_edge, rotation_edge) = self.cell_edges(level);
        let dimension = self.source.dimension();
        let translation_radius = covering_radius(dimension.dim(), translation_edge);
        let rotation_radius = covering_radius(dimension.rotation_dim(), rotation_edge);
        translation_radius + chordal_displacement(rotation_radius.min(PI), self.radius)
    }

    /// Evaluates the motion of the given cells for all allowed reflections and keeps the best one
    fn evaluate(
        &self,
        translation: &LatticeVertex,
        rotation: &LatticeVertex,
        level: u32,
    ) -> Result<Candidate> {
        let dimension = self.source.dimension();
        let mut best = (f64::INFINITY, false);
        for &reflect in self.config.reflection_choices() {
            let transformation = Transformation::new(
                dimension,
                translation.position.as_slice(),
                rotation.position.as_slice(),
                reflect,
            )?;
            let distance = symmetric_hausdorff(&self.source, &self.target, &transformation)?;
            if distance < best.0 {
                best = (distance, reflect);
            }
        }
        let (distance, reflect) = best;
        Ok(Candidate {
            translation: translation.clone(),
            rotation: rotation.clone(),
            level,
            distance,
            reflect,
            lower_bound: (distance - self.lipschitz_bound(level)).max(0.0),
        })
    }

    /// Frontier key of a candidate. In accuracy mode this is a lower bound for all motions in the cell, which
    /// never drops below the bound of the parent cell. In stall mode it is the exact distance
    fn key_of(&self, candidate: &Candidate, parent_key: f64) -> f64 {
        match self.termination {
            Termination::Accuracy { .. } => parent_key.max(candidate.lower_bound),
            Termination::Stall { .. } => candidate.distance,
        }
    }

    /// Smallest Lipschitz lower bound over all frontier cells. Linear in the frontier size
    fn frontier_lower_bound(&self) -> f64 {
        self.frontier
            .candidates()
            .map(|candidate| candidate.lower_bound)
            .fold(f64::INFINITY, f64::min)
    }

    /// Lower bound that is known without scanning the frontier. In stall mode this is zero until the search
    /// finishes
    fn tracked_lower_bound(&self) -> f64 {
        let bound = match self.termination {
            Termination::Accuracy { .. } => self.frontier.min_key().unwrap_or(self.best_found),
            Termination::Stall { .. } => self.stall_estimate.unwrap_or(0.0),
        };
        bound.min(self.best_found).max(0.0)
    }

    fn record(&mut self, candidate: &Candidate) {
        if candidate.distance < self.best_found {
            self.best_found = candidate.distance;
            self.best_motion = Some((
                candidate.translation.position.clone(),
                candidate.rotation.position.clone(),
                candidate.reflect,
            ));
        }
    }

    fn check_termination(&mut self) {
        if self.finished.is_some() {
            return;
        }
        let reason = match self.termination {
            Termination::Accuracy { .. } => {
                let target_error = self.target_error.unwrap_or(0.0);
                if self.best_found - self.best_possible() <= target_error {
                    Some(TerminationReason::Converged)
                } else {
                    None
                }
            }
            Termination::Stall {
                max_stall_iterations,
                ..
            } => {
                if self.stall_count > max_stall_iterations {
                    Some(TerminationReason::Stalled)
                } else {
                    None
                }
            }
        };
        let reason = reason.or_else(|| match self.config.max_iterations {
            Some(max_iterations) if self.iterations >= max_iterations => {
                Some(TerminationReason::IterationLimit)
            }
            _ => None,
        });
        if let Some(reason) = reason {
            if let Termination::Stall { .. } = self.termination {
                self.stall_estimate = Some(self.frontier_lower_bound());
            }
            debug!(
                "Search finished after {} iterations ({:?}): best found {}, best possible {}",
                self.iterations,
                reason,
                self.best_found,
                self.best_possible()
            );
            self.finished = Some(reason);
        }
    }

    /// Performs one refinement: pops the cell with the smallest key, splits it into `branching_factor` sub-cells
    /// per axis in translation and rotation space and pushes all sub-cells back. Does nothing once the search is
    /// finished
    pub fn step(&mut self) -> Result<SearchStatus> {
        self.step_traced(&mut NoTrace)
    }

    /// Like [step](HausdorffSearch::step), but reports the refinement to `trace`
    pub fn step_traced(&mut self, trace: &mut dyn SearchTrace) -> Result<SearchStatus> {
        if let Some(reason) = self.finished {
            return Ok(SearchStatus::Finished(reason));
        }
        let (key, parent) = match self.frontier.pop() {
            Some(entry) => entry,
            None => {
                self.finished = Some(TerminationReason::FrontierExhausted);
                return Ok(SearchStatus::Finished(TerminationReason::FrontierExhausted));
            }
        };

        let branching = self.config.branching_factor;
        let (translation_edge, rotation_edge) = self.cell_edges(parent.level);
        let translations =
            self.translation_grid
                .subdivide(&parent.translation.cell_center, translation_edge, branching)?;
        let rotations =
            self.rotation_grid
                .subdivide(&parent.rotation.cell_center, rotation_edge, branching)?;
        let level = parent.level + 1;
        let children = translations
            .vertices()
            .iter()
            .cartesian_product(rotations.vertices().iter())
            .map(|(translation, rotation)| self.evaluate(translation, rotation, level))
            .collect::<Result<Vec<_>>>()?;

        let previous_best = self.best_found;
        let child_count = children.len();
        let mut best_child = f64::INFINITY;
        for child in children {
            best_child = best_child.min(child.distance);
            self.record(&child);
            let child_key = self.key_of(&child, key);
            self.frontier.push(child_key, child);
        }
        self.iterations += 1;

        if let Termination::Stall {
            improvement_margin, ..
        } = self.termination
        {
            if improves(best_child, previous_best, improvement_margin) {
                self.stall_count = 0;
            } else {
                self.stall_count += 1;
            }
        }

        trace.on_iteration(&IterationEvent {
            iteration: self.iterations,
            level: parent.level,
            key,
            children: child_count,
            best_child,
            best_found: self.best_found,
            best_possible: self.tracked_lower_bound(),
            frontier_len: self.frontier.len(),
            stall_count: self.stall_count,
        });

        self.check_termination();
        Ok(match self.finished {
            Some(reason) => SearchStatus::Finished(reason),
            None => SearchStatus::Running,
        })
    }

    /// Runs the search until one of the termination criteria is met
    pub fn run(self) -> Result<SearchResult> {
        self.run_with_trace(&mut NoTrace)
    }

    /// Runs the search until one of the termination criteria is met, reporting progress to `trace`
    pub fn run_with_trace(mut self, trace: &mut dyn SearchTrace) -> Result<SearchResult> {
        trace.on_seed(&self.seed_event());
        while !self.step_traced(trace)?.is_finished() {}
        let result = self.result();
        trace.on_finish(&result);
        Ok(result)
    }

    pub fn seed_event(&self) -> SeedEvent {
        SeedEvent {
            candidates: self.seed_candidates,
            best_found: self.best_found,
            best_possible: self.tracked_lower_bound(),
            target_error: self.target_error,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Why the search stopped, if it did
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.finished
    }

    /// Smallest exact distance found so far. Never increases
    pub fn best_found(&self) -> f64 {
        self.best_found
    }

    /// Lower bound on the optimal distance. In accuracy mode this is the smallest key in the frontier and never
    /// decreases. In stall mode it is the smallest Lipschitz bound of the frontier cells and only serves as an
    /// estimate. It is computed once when the search finishes; calling this on an unfinished stall-mode search
    /// scans the whole frontier
    pub fn best_possible(&self) -> f64 {
        match (self.termination, self.stall_estimate) {
            (Termination::Stall { .. }, None) => {
                self.frontier_lower_bound().min(self.best_found).max(0.0)
            }
            _ => self.tracked_lower_bound(),
        }
    }

    /// Current gap between [best_found](HausdorffSearch::best_found) and
    /// [best_possible](HausdorffSearch::best_possible)
    pub fn error_bound(&self) -> f64 {
        (self.best_found - self.best_possible()).max(0.0)
    }

    /// Absolute error tolerance, only available in accuracy mode
    pub fn target_error(&self) -> Option<f64> {
        self.target_error
    }

    /// Number of refinements performed so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// The best motion found so far, mapping the first cloud onto the second in their original positions
    pub fn best_transformation(&self) -> Result<Transformation> {
        let dimension = self.source.dimension();
        let centered = match &self.best_motion {
            Some((translation, rotation, reflect)) => {
                Transformation::new(dimension, translation.as_slice(), rotation.as_slice(), *reflect)?
            }
            None => Transformation::identity(dimension),
        };
        // x -> L(x - c_a) + t + c_b
        let translation = centered.translation() + self.target_centroid
            - centered.linear_part() * self.source_centroid;
        Ok(centered.with_translation(translation))
    }

    /// Snapshot of the current state. Searches that were not finished report
    /// [Interrupted](TerminationReason::Interrupted)
    pub fn result(&self) -> SearchResult {
        let transformation = self
            .best_transformation()
            .unwrap_or_else(|_| Transformation::identity(self.source.dimension()));
        SearchResult {
            distance: self.best_found,
            error_bound: self.error_bound(),
            transformation,
            iterations: self.iterations,
            termination: self.finished.unwrap_or(TerminationReason::Interrupted),
        }
    }
}

/// Whether a refinement whose best child has distance `best_child` improves on `previous_best` by at least the
/// relative `margin`. Nothing improves on a distance of zero
fn improves(best_child: f64, previous_best: f64, margin: f64) -> bool {
    previous_best > 0.0 && best_child <= previous_best * (1.0 - margin)
}

/// Approximates the minimum symmetric Hausdorff distance between `a` and `b` over all rigid motions of `a`
/// (and reflections, unless `config.proper_rigid_only` is set)
pub fn match_clouds(a: &PointCloud, b: &PointCloud, config: &SearchConfig) -> Result<SearchResult> {
    HausdorffSearch::new(a, b, config.clone())?.run()
}

/// Raw coordinate version of [match_clouds]. Each coordinate tuple must have 2 or 3 entries, consistently within
/// and between both clouds. Returns the approximate distance and its error bound
/// ```
/// # use hausdorff_algorithms::search::{approximate_hausdorff, SearchConfig};
/// let a = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 2.0]];
/// let b = vec![[5.0, 5.0], [5.0, 6.0], [3.0, 5.0]];
/// let (distance, error_bound) = approximate_hausdorff(&a, &b, &SearchConfig::accuracy(0.1)).unwrap();
/// assert!(distance <= error_bound + 1e-9);
/// ```
pub fn approximate_hausdorff<C: AsRef<[f64]>>(
    coords_a: &[C],
    coords_b: &[C],
    config: &SearchConfig,
) -> Result<(f64, f64)> {
    let a = PointCloud::from_coordinates(coords_a)?;
    let b = PointCloud::from_coordinates(coords_b)?;
    let result = match_clouds(&a, &b, config)?;
    Ok((result.distance, result.error_bound))
}

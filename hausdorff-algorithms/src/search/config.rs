use anyhow::{bail, ensure, Result};

/// Configuration of a [HausdorffSearch](super::HausdorffSearch). Exactly one of `target_accuracy` and
/// `max_stall_iterations` must be set, which selects between the certified accuracy mode and the heuristic
/// stall mode
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SearchConfig {
    /// Stop once the proven gap between the best found and the best possible distance is at most
    /// `target_accuracy` times the larger diameter of the two clouds. Must be in `(0, 1)`
    pub target_accuracy: Option<f64>,
    /// Stop after this many refinements in a row that did not improve the best distance by at least
    /// `improvement_margin`
    pub max_stall_iterations: Option<usize>,
    /// Relative improvement that resets the stall counter. Only used in stall mode
    pub improvement_margin: f64,
    /// Forbid reflections, i.e. only search proper rigid motions
    pub proper_rigid_only: bool,
    /// Number of sub-cells per axis when refining a cell
    pub branching_factor: usize,
    /// Optional hard limit on the number of refinements, regardless of the mode
    pub max_iterations: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target_accuracy: None,
            max_stall_iterations: None,
            improvement_margin: 0.01,
            proper_rigid_only: false,
            branching_factor: 2,
            max_iterations: None,
        }
    }
}

impl SearchConfig {
    /// Accuracy mode with the given relative target accuracy
    pub fn accuracy(target_accuracy: f64) -> Self {
        Self {
            target_accuracy: Some(target_accuracy),
            ..Default::default()
        }
    }

    /// Stall mode with the given number of non-improving refinements
    pub fn stall(max_stall_iterations: usize) -> Self {
        Self {
            max_stall_iterations: Some(max_stall_iterations),
            ..Default::default()
        }
    }

    pub fn with_improvement_margin(mut self, improvement_margin: f64) -> Self {
        self.improvement_margin = improvement_margin;
        self
    }

    pub fn with_proper_rigid_only(mut self, proper_rigid_only: bool) -> Self {
        self.proper_rigid_only = proper_rigid_only;
        self
    }

    pub fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Number of reflection choices that are evaluated per candidate
    pub fn reflection_choices(&self) -> &'static [bool] {
        if self.proper_rigid_only {
            &[false]
        } else {
            &[false, true]
        }
    }

    /// Checks this configuration and returns the selected termination criterion
    /// ```
    /// # use hausdorff_algorithms::search::SearchConfig;
    /// assert!(SearchConfig::accuracy(0.05).validate().is_ok());
    /// assert!(SearchConfig::default().validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<Termination> {
        ensure!(
            self.branching_factor >= 2,
            "Branching factor must be at least 2, got {}",
            self.branching_factor
        );
        ensure!(
            self.max_iterations != Some(0),
            "Maximum number of iterations must be positive"
        );
        match (self.target_accuracy, self.max_stall_iterations) {
            (Some(_), Some(_)) => bail!(
                "Exactly one of target accuracy and maximum stall iterations must be set, got both"
            ),
            (None, None) => bail!(
                "Exactly one of target accuracy and maximum stall iterations must be set, got none"
            ),
            (Some(target_accuracy), None) => {
                ensure!(
                    target_accuracy > 0.0 && target_accuracy < 1.0,
                    "Target accuracy must be in (0, 1), got {}",
                    target_accuracy
                );
                Ok(Termination::Accuracy { target_accuracy })
            }
            (None, Some(max_stall_iterations)) => {
                ensure!(
                    self.improvement_margin >= 0.0 && self.improvement_margin < 1.0,
                    "Improvement margin must be in [0, 1), got {}",
                    self.improvement_margin
                );
                Ok(Termination::Stall {
                    max_stall_iterations,
                    improvement_margin: self.improvement_margin,
                })
            }
        }
    }
}

/// The termination criterion selected by a [SearchConfig]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    /// Certified mode: stop once `best_found - best_possible <= target_accuracy * max_diameter`
    Accuracy { target_accuracy: f64 },
    /// Heuristic mode: stop once the stall counter exceeds `max_stall_iterations`
    Stall {
        max_stall_iterations: usize,
        improvement_margin: f64,
    },
}

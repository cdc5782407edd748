use log::{debug, trace};

use super::SearchResult;

/// State of a search right after the level-0 candidates were evaluated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedEvent {
    /// Number of level-0 candidates (translation cells times rotation cells)
    pub candidates: usize,
    pub best_found: f64,
    pub best_possible: f64,
    /// Absolute error tolerance in accuracy mode
    pub target_error: Option<f64>,
}

/// State of a search after one refinement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationEvent {
    pub iteration: usize,
    /// Resolution level of the refined cell. Its children live at `level + 1`
    pub level: u32,
    /// Frontier key of the refined cell
    pub key: f64,
    pub children: usize,
    /// Smallest exact distance among the children
    pub best_child: f64,
    pub best_found: f64,
    /// Lower bound on the optimum. Always zero in stall mode, where the estimate is only computed once the
    /// search finishes
    pub best_possible: f64,
    pub frontier_len: usize,
    /// Number of non-improving refinements in a row. Always zero in accuracy mode
    pub stall_count: usize,
}

/// Receives progress events of a [HausdorffSearch](super::HausdorffSearch). All methods do nothing by default
pub trait SearchTrace {
    fn on_seed(&mut self, _event: &SeedEvent) {}
    fn on_iteration(&mut self, _event: &IterationEvent) {}
    fn on_finish(&mut self, _result: &SearchResult) {}
}

/// Ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl SearchTrace for NoTrace {}

/// Forwards all events to the `log` crate. Seeding and the final result are logged at `debug` level, single
/// iterations at `trace` level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl SearchTrace for LogTrace {
    fn on_seed(&mut self, event: &SeedEvent) {
        debug!(
            "Seeded {} candidates: best found {}, best possible {}, target error {:?}",
            event.candidates, event.best_found, event.best_possible, event.target_error
        );
    }

    fn on_iteration(&mut self, event: &IterationEvent) {
        trace!(
            "Iteration {} (level {}, key {}): {} children, best child {}, best found {}, best possible {}, frontier {}, stall {}",
            event.iteration,
            event.level,
            event.key,
            event.children,
            event.best_child,
            event.best_found,
            event.best_possible,
            event.frontier_len,
            event.stall_count
        );
    }

    fn on_finish(&mut self, result: &SearchResult) {
        debug!(
            "Finished after {} iterations ({:?}): distance {} +- {}",
            result.iterations, result.termination, result.distance, result.error_bound
        );
    }
}

/// Collects all events in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingTrace {
    pub seed: Option<SeedEvent>,
    pub iterations: Vec<IterationEvent>,
    pub finish: Option<SearchResult>,
}

impl SearchTrace for RecordingTrace {
    fn on_seed(&mut self, event: &SeedEvent) {
        self.seed = Some(*event);
    }

    fn on_iteration(&mut self, event: &IterationEvent) {
        self.iterations.push(*event);
    }

    fn on_finish(&mut self, result: &SearchResult) {
        self.finish = Some(result.clone());
    }
}

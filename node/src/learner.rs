use comms::msg::{LevelIndexPair, LevelIndexVector};

use crate::Result;

/// One class's fitted contribution from a local batch, ready to be merged
/// into the master's model.
#[derive(Debug, Clone)]
pub struct BatchFit {
    pub class_index: u64,
    /// Samples that produced these coefficients; the master weights
    /// concurrent contributions by it.
    pub batch_size: u64,
    pub coefficients: Vec<f64>,
}

/// Grid topology diff produced by one refinement step for one class.
#[derive(Debug, Clone, Default)]
pub struct RefinementResult {
    pub deleted_grid_point_indexes: Vec<u64>,
    pub added_grid_points: Vec<LevelIndexVector>,
}

impl RefinementResult {
    pub fn is_empty(&self) -> bool {
        self.deleted_grid_point_indexes.is_empty() && self.added_grid_points.is_empty()
    }
}

/// Collaborator surface of the statistical learner. The protocol layer
/// never touches grid or model math; it routes decoded commands here.
pub trait Learner {
    fn dimensionality(&self) -> usize;

    /// The grid topology version this process holds for `class_index`.
    /// Incremented only by the master on successful refinement.
    fn current_grid_version(&self, class_index: u64) -> u64;

    /// Adopts the version carried by a grid update after its diff applied.
    fn set_grid_version(&mut self, class_index: u64, version: u64);

    fn apply_added_point(&mut self, class_index: u64, point: &[LevelIndexPair]) -> Result<()>;

    fn apply_deleted_point(&mut self, class_index: u64, point_index: u64) -> Result<()>;

    /// Splices `values` into the class model at `offset`, weighting the
    /// contribution by `batch_size`.
    fn merge_coefficients(
        &mut self,
        class_index: u64,
        offset: usize,
        values: &[f64],
        batch_size: u64,
    ) -> Result<()>;

    /// Fits the local model on the assigned dataset window and returns the
    /// per-class coefficient deltas to send back to the master.
    fn run_local_batch(
        &mut self,
        batch_offset: u64,
        batch_size: u64,
        cross_validate: bool,
    ) -> Result<Vec<BatchFit>>;

    fn shutdown(&mut self);
}

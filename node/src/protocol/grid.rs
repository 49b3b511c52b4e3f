//! Master to workers: chunked broadcast of refinement diffs.

use comms::Envelope;
use comms::envelope::CommandKind;
use comms::msg::{self, LevelIndexPair, LevelIndexVector};
use log::info;

use crate::{NodeErr, Result, learner::Learner, node::Node, transport::Transport};

impl<T: Transport, L: Learner> Node<T, L> {
    /// Broadcasts one class's refinement diff, chunked to envelope
    /// capacity, deleted indices before added points. Workers are assumed
    /// to receive broadcasts atomically and in send order; no
    /// acknowledgement is expected.
    pub fn broadcast_refinement(&mut self, class_index: u64, diff: &crate::RefinementResult) -> Result<()> {
        let grid_version = self.learner.current_grid_version(class_index);
        info!(
            class_index = class_index,
            additions = diff.added_grid_points.len(),
            deletions = diff.deleted_grid_point_indexes.len(),
            grid_version = grid_version;
            "updating grid on workers"
        );

        self.broadcast_deleted(class_index, grid_version, &diff.deleted_grid_point_indexes)?;
        self.broadcast_added(class_index, grid_version, &diff.added_grid_points)
    }

    fn broadcast_deleted(
        &mut self,
        class_index: u64,
        grid_version: u64,
        deleted: &[u64],
    ) -> Result<()> {
        let mut rest = deleted;
        while !rest.is_empty() {
            let mut env = Envelope::for_command(CommandKind::UpdateGrid);
            let consumed =
                msg::encode_deleted_chunk(env.payload_mut(), class_index, grid_version, rest)?;
            self.post_broadcast_envelope(env)?;
            rest = &rest[consumed..];
        }
        Ok(())
    }

    fn broadcast_added(
        &mut self,
        class_index: u64,
        grid_version: u64,
        points: &[LevelIndexVector],
    ) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let dims = self.learner.dimensionality();
        let mut flat: Vec<LevelIndexPair> = Vec::with_capacity(points.len() * dims);
        for point in points {
            if point.len() != dims {
                return Err(NodeErr::DimensionMismatch {
                    expected: dims,
                    got: point.len(),
                });
            }
            flat.extend_from_slice(point);
        }

        let mut rest = flat.as_slice();
        while !rest.is_empty() {
            let mut env = Envelope::for_command(CommandKind::UpdateGrid);
            let consumed =
                msg::encode_added_chunk(env.payload_mut(), class_index, grid_version, dims, rest)?;
            self.post_broadcast_envelope(env)?;
            rest = &rest[consumed * dims..];
        }
        Ok(())
    }
}

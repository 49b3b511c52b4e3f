//! Routes a received envelope to its handler by command kind.

use comms::Envelope;
use comms::envelope::CommandKind;
use comms::msg::{self, UpdateType};
use log::{debug, info, warn};

use crate::{
    NodeErr, Result, StaleMergePolicy, learner::Learner, node::Node, transport::Transport,
};

impl<T: Transport, L: Learner> Node<T, L> {
    /// Dispatches one incoming command. An unknown or null command id is
    /// a protocol violation and fails the process, never a silent skip.
    pub(crate) fn dispatch(&mut self, env: &Envelope) -> Result<()> {
        let kind = env
            .kind()
            .map_err(|_| NodeErr::UnknownCommand(env.kind_id()))?;
        debug!(kind = format!("{kind:?}").as_str(); "processing incoming command");

        match kind {
            CommandKind::Null => Err(NodeErr::NullCommand),
            CommandKind::AssignBatch => self.on_assign_batch(env.payload()),
            CommandKind::UpdateGrid => self.on_update_grid(env.payload()),
            CommandKind::MergeGrid => self.on_merge_grid(env.payload()),
            CommandKind::StartSync => {
                self.sync_in_progress = true;
                debug!("packet synchronization started");
                Ok(())
            }
            CommandKind::EndSync => {
                self.sync_in_progress = false;
                debug!("packet synchronization ended");
                Ok(())
            }
            CommandKind::Shutdown => {
                info!("shutdown requested");
                self.learner.shutdown();
                self.shutdown = true;
                Ok(())
            }
        }
    }

    fn on_assign_batch(&mut self, payload: &[u8]) -> Result<()> {
        let assign = msg::decode_assign_batch(payload)?;
        debug!(
            batch_offset = assign.batch_offset,
            batch_size = assign.batch_size;
            "running assigned batch"
        );
        let fits = self.learner.run_local_batch(
            assign.batch_offset,
            assign.batch_size,
            assign.do_cross_validation,
        )?;
        for fit in fits {
            self.send_merge(&fit)?;
        }
        Ok(())
    }

    fn on_update_grid(&mut self, payload: &[u8]) -> Result<()> {
        let view = msg::decode_refinement(payload)?;
        debug!(
            class_index = view.class_index,
            modifications = view.list_len;
            "applying grid update"
        );

        match view.update_type {
            UpdateType::Deleted => {
                for &point_index in view.deleted()? {
                    self.learner
                        .apply_deleted_point(view.class_index, point_index)?;
                }
            }
            UpdateType::Added => {
                let dims = self.learner.dimensionality();
                for point in view.added(dims)?.chunks(dims) {
                    self.learner.apply_added_point(view.class_index, point)?;
                }
            }
        }

        self.learner
            .set_grid_version(view.class_index, view.grid_version);
        Ok(())
    }

    fn on_merge_grid(&mut self, payload: &[u8]) -> Result<()> {
        let view = msg::decode_merge(payload)?;
        let local = self.learner.current_grid_version(view.class_index);

        if view.grid_version != local {
            match self.config.stale_merge_policy {
                StaleMergePolicy::Fatal => {
                    return Err(NodeErr::GridVersionMismatch {
                        class_index: view.class_index,
                        local,
                        remote: view.grid_version,
                    });
                }
                StaleMergePolicy::Drop => {
                    warn!(
                        class_index = view.class_index,
                        local = local,
                        remote = view.grid_version;
                        "dropping stale merge chunk"
                    );
                    return Ok(());
                }
            }
        }

        debug!(
            class_index = view.class_index,
            offset = view.offset,
            len = view.values.len();
            "merging coefficient chunk"
        );
        self.learner.merge_coefficients(
            view.class_index,
            view.offset as usize,
            view.values,
            view.batch_size,
        )
    }
}

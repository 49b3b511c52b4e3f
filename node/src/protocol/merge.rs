//! Worker to master: version-stamped coefficient chunks.

use comms::Envelope;
use comms::envelope::CommandKind;
use comms::msg;
use log::debug;

use crate::{
    Result,
    learner::{BatchFit, Learner},
    node::Node,
    transport::{MASTER_RANK, Transport},
};

impl<T: Transport, L: Learner> Node<T, L> {
    /// Sends one class's fitted coefficients to the master as one or more
    /// chunks. Each chunk carries its own offset, so the master may apply
    /// them in any arrival order.
    pub fn send_merge(&mut self, fit: &BatchFit) -> Result<()> {
        let grid_version = self.learner.current_grid_version(fit.class_index);

        let mut offset = 0;
        while offset < fit.coefficients.len() {
            let mut env = Envelope::for_command(CommandKind::MergeGrid);
            let consumed = msg::encode_merge_chunk(
                env.payload_mut(),
                fit.class_index,
                grid_version,
                fit.batch_size,
                offset as u64,
                &fit.coefficients[offset..],
            )?;
            debug!(
                class_index = fit.class_index,
                offset = offset,
                values = consumed,
                grid_version = grid_version;
                "sending merge chunk"
            );
            self.post_envelope(MASTER_RANK, env)?;
            offset += consumed;
        }
        Ok(())
    }
}

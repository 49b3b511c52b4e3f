//! Master to one worker: dataset window assignment.

use comms::Envelope;
use comms::envelope::CommandKind;
use comms::msg::{self, AssignBatch};
use log::debug;

use crate::{
    Result,
    learner::Learner,
    node::Node,
    transport::{Rank, Transport},
};

impl<T: Transport, L: Learner> Node<T, L> {
    /// Assigns a dataset window to `worker`.
    pub fn assign_batch(
        &mut self,
        worker: Rank,
        batch_offset: u64,
        batch_size: u64,
        do_cross_validation: bool,
    ) -> Result<()> {
        debug!(
            worker = worker,
            batch_offset = batch_offset,
            batch_size = batch_size;
            "assigning batch"
        );
        let mut env = Envelope::for_command(CommandKind::AssignBatch);
        msg::encode_assign_batch(
            env.payload_mut(),
            &AssignBatch {
                batch_offset,
                batch_size,
                do_cross_validation,
            },
        )?;
        self.post_envelope(worker, env)
    }
}

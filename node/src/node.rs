//! The per-process coordinator: owns the transport endpoint, the learner
//! collaborator, and the registry of pending non-blocking operations.

use comms::Envelope;
use comms::envelope::CommandKind;
use log::{debug, info};

use crate::{
    NodeConfig, Result,
    learner::Learner,
    pending::{Action, PendingOp},
    transport::{MASTER_RANK, Rank, Transport},
};

pub struct Node<T: Transport, L: Learner> {
    pub(crate) transport: T,
    pub(crate) learner: L,
    pub(crate) config: NodeConfig,
    pub(crate) pending: Vec<PendingOp<T, L>>,
    pub(crate) sync_in_progress: bool,
    pub(crate) shutdown: bool,
}

impl<T: Transport, L: Learner> Node<T, L> {
    pub fn new(transport: T, learner: L, config: NodeConfig) -> Self {
        Self {
            transport,
            learner,
            config,
            pending: Vec::new(),
            sync_in_progress: false,
            shutdown: false,
        }
    }

    pub fn is_master(&self) -> bool {
        self.transport.rank() == MASTER_RANK
    }

    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    pub fn world_size(&self) -> usize {
        self.transport.world_size()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    pub fn learner_mut(&mut self) -> &mut L {
        &mut self.learner
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
    }

    /// Whether the reserved packet-synchronization window is open.
    pub fn sync_in_progress(&self) -> bool {
        self.sync_in_progress
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn barrier(&self) {
        self.transport.barrier();
    }

    /// Arms the long-lived inbound channels: one unicast receive from any
    /// source on every rank, plus one broadcast receive rooted at the
    /// master on workers. Their callbacks dispatch the payload, zero the
    /// envelope, and re-post the receive, listening until shutdown.
    pub fn listen(&mut self) -> Result<()> {
        let handle = self.transport.post_receive()?;
        self.pending.push(PendingOp::perpetual(
            handle,
            Envelope::zeroed(),
            Box::new(|env, node| {
                debug!("incoming unicast command");
                node.dispatch(env)?;
                env.clear();
                let handle = node.transport.post_receive()?;
                Ok(Action::Rearm(handle))
            }),
        ));
        info!("listening for unicasts from any source");

        if !self.is_master() {
            let env = Envelope::zeroed();
            let handle = self.transport.post_broadcast(MASTER_RANK, env.bytes())?;
            self.pending.push(PendingOp::perpetual(
                handle,
                env,
                Box::new(|env, node| {
                    debug!("incoming broadcast command");
                    node.dispatch(env)?;
                    env.clear();
                    let handle = node.transport.post_broadcast(MASTER_RANK, env.bytes())?;
                    Ok(Action::Rearm(handle))
                }),
            ));
            info!("listening for broadcasts from the master");
        }

        Ok(())
    }

    /// Drains at most one completed operation.
    ///
    /// The first completed entry is detached from the registry before its
    /// callback runs, so the callback may register new operations or
    /// re-arm this one without invalidating the scan. Callers loop on the
    /// return value; every call restarts the scan from the front.
    ///
    /// # Returns
    /// Whether a completion was handled.
    pub fn poll_completed(&mut self) -> Result<bool> {
        for idx in 0..self.pending.len() {
            let op = &mut self.pending[idx];
            let done = self.transport.test_completion(&mut op.handle, op.buf.bytes_mut())?;
            if done {
                self.complete_at(idx)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Blocks until every transient operation has completed and run its
    /// callback. Long-lived listeners are skipped: they never complete by
    /// design. Used only at coarse sync points (startup, teardown).
    pub fn wait_all(&mut self) -> Result<()> {
        loop {
            let Some(idx) = self.pending.iter().position(|op| op.dispose_after_callback) else {
                return Ok(());
            };
            let op = &mut self.pending[idx];
            self.transport.wait(&mut op.handle, op.buf.bytes_mut())?;
            self.complete_at(idx)?;
        }
    }

    fn complete_at(&mut self, idx: usize) -> Result<()> {
        let mut op = self.pending.swap_remove(idx);
        match (op.callback)(&mut op.buf, self)? {
            Action::Dispose => {}
            Action::Rearm(handle) => {
                op.handle = handle;
                self.pending.push(op);
            }
        }
        Ok(())
    }

    /// Cooperative worker loop: drains completions, yielding between
    /// empty polls, until a shutdown command flips the flag.
    pub fn run_worker(&mut self) -> Result<()> {
        info!("worker loop started");
        while !self.shutdown {
            if !self.poll_completed()? {
                std::thread::yield_now();
            }
        }
        info!("worker loop finished");
        Ok(())
    }

    /// Broadcasts an argument-free command to the pool.
    pub fn broadcast_command(&mut self, kind: CommandKind) -> Result<()> {
        self.post_broadcast_envelope(Envelope::for_command(kind))
    }

    pub fn broadcast_shutdown(&mut self) -> Result<()> {
        info!("broadcasting shutdown");
        self.broadcast_command(CommandKind::Shutdown)
    }

    pub(crate) fn post_envelope(&mut self, dest: Rank, env: Envelope) -> Result<()> {
        let handle = self.transport.post_send(dest, env.bytes())?;
        self.pending.push(PendingOp::transient(handle, env));
        Ok(())
    }

    pub(crate) fn post_broadcast_envelope(&mut self, env: Envelope) -> Result<()> {
        let handle = self.transport.post_broadcast(MASTER_RANK, env.bytes())?;
        self.pending.push(PendingOp::transient(handle, env));
        Ok(())
    }
}

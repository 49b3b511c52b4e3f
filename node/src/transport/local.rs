//! In-process cluster transport: one endpoint per rank, mailboxes backed
//! by `tokio::sync::mpsc` unbounded channels used synchronously
//! (`try_recv` for completion tests, `blocking_recv` for waits).

use std::sync::{Arc, Barrier};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

use super::{Rank, Transport};
use crate::{NodeErr, Result};

struct Shared {
    unicast_tx: Vec<UnboundedSender<Vec<u8>>>,
    bcast_tx: Vec<UnboundedSender<Vec<u8>>>,
    barrier: Barrier,
}

/// Builder for a pool of in-process endpoints sharing one barrier.
pub struct LocalCluster;

impl LocalCluster {
    /// Creates `size` connected endpoints, one per rank in order.
    pub fn new(size: usize) -> Vec<LocalEndpoint> {
        assert!(size > 0);

        let mut unicast_tx = Vec::with_capacity(size);
        let mut unicast_rx = Vec::with_capacity(size);
        let mut bcast_tx = Vec::with_capacity(size);
        let mut bcast_rx = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = mpsc::unbounded_channel();
            unicast_tx.push(tx);
            unicast_rx.push(rx);
            let (tx, rx) = mpsc::unbounded_channel();
            bcast_tx.push(tx);
            bcast_rx.push(rx);
        }

        let shared = Arc::new(Shared {
            unicast_tx,
            bcast_tx,
            barrier: Barrier::new(size),
        });

        unicast_rx
            .into_iter()
            .zip(bcast_rx)
            .enumerate()
            .map(|(rank, (unicast, bcast))| LocalEndpoint {
                rank,
                shared: Arc::clone(&shared),
                unicast_rx: Mutex::new(unicast),
                bcast_rx: Mutex::new(bcast),
            })
            .collect()
    }
}

/// One rank's handle into the in-process cluster.
pub struct LocalEndpoint {
    rank: Rank,
    shared: Arc<Shared>,
    unicast_rx: Mutex<UnboundedReceiver<Vec<u8>>>,
    bcast_rx: Mutex<UnboundedReceiver<Vec<u8>>>,
}

/// An in-flight operation. Sends complete at post time because mailboxes
/// are unbounded; receives complete when a message is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalHandle {
    Sent,
    RecvAny,
    RecvBcast,
}

impl LocalEndpoint {
    fn deliver(msg: Vec<u8>, buf: &mut [u8]) -> Result<bool> {
        if msg.len() != buf.len() {
            return Err(NodeErr::Transport(format!(
                "received {} bytes into a {} byte buffer",
                msg.len(),
                buf.len()
            )));
        }
        buf.copy_from_slice(&msg);
        Ok(true)
    }

    fn try_drain(rx: &Mutex<UnboundedReceiver<Vec<u8>>>, buf: &mut [u8]) -> Result<bool> {
        match rx.lock().try_recv() {
            Ok(msg) => Self::deliver(msg, buf),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => {
                Err(NodeErr::Transport("mailbox channel closed".into()))
            }
        }
    }

    fn drain_blocking(rx: &Mutex<UnboundedReceiver<Vec<u8>>>, buf: &mut [u8]) -> Result<()> {
        match rx.lock().blocking_recv() {
            Some(msg) => Self::deliver(msg, buf).map(drop),
            None => Err(NodeErr::Transport("mailbox channel closed".into())),
        }
    }
}

impl Transport for LocalEndpoint {
    type Handle = LocalHandle;

    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.shared.unicast_tx.len()
    }

    fn post_send(&self, dest: Rank, buf: &[u8]) -> Result<LocalHandle> {
        let tx = self
            .shared
            .unicast_tx
            .get(dest)
            .ok_or_else(|| NodeErr::Transport(format!("destination rank {dest} out of range")))?;
        tx.send(buf.to_vec())
            .map_err(|_| NodeErr::Transport(format!("mailbox of rank {dest} closed")))?;
        Ok(LocalHandle::Sent)
    }

    fn post_receive(&self) -> Result<LocalHandle> {
        Ok(LocalHandle::RecvAny)
    }

    fn post_broadcast(&self, root: Rank, buf: &[u8]) -> Result<LocalHandle> {
        if self.rank != root {
            return Ok(LocalHandle::RecvBcast);
        }
        for (rank, tx) in self.shared.bcast_tx.iter().enumerate() {
            if rank == root {
                continue;
            }
            tx.send(buf.to_vec())
                .map_err(|_| NodeErr::Transport(format!("broadcast mailbox {rank} closed")))?;
        }
        Ok(LocalHandle::Sent)
    }

    fn test_completion(&self, handle: &mut LocalHandle, buf: &mut [u8]) -> Result<bool> {
        match handle {
            LocalHandle::Sent => Ok(true),
            LocalHandle::RecvAny => Self::try_drain(&self.unicast_rx, buf),
            LocalHandle::RecvBcast => Self::try_drain(&self.bcast_rx, buf),
        }
    }

    fn wait(&self, handle: &mut LocalHandle, buf: &mut [u8]) -> Result<()> {
        match handle {
            LocalHandle::Sent => Ok(()),
            LocalHandle::RecvAny => Self::drain_blocking(&self.unicast_rx, buf),
            LocalHandle::RecvBcast => Self::drain_blocking(&self.bcast_rx, buf),
        }
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }
}

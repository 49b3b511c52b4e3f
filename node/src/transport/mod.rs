mod local;

pub use local::{LocalCluster, LocalEndpoint, LocalHandle};

use crate::Result;

/// Process identifier inside the pool.
pub type Rank = usize;

/// Exactly one process coordinates the pool.
pub const MASTER_RANK: Rank = 0;

/// The six non-blocking primitives the protocol needs from a transport.
/// Any provider of these can host the command/merge protocol.
///
/// Two preconditions are assumed, not checked: delivery is reliable
/// inside the cluster (a completion-test failure is fatal), and a
/// broadcast arrives atomically at each worker, in send order relative to
/// other broadcasts from the same root.
pub trait Transport {
    type Handle;

    fn rank(&self) -> Rank;

    fn world_size(&self) -> usize;

    /// Begins a non-blocking send of `buf` to `dest`.
    fn post_send(&self, dest: Rank, buf: &[u8]) -> Result<Self::Handle>;

    /// Begins a non-blocking receive from any source.
    fn post_receive(&self) -> Result<Self::Handle>;

    /// Begins a non-blocking broadcast rooted at `root`. On the root the
    /// operation sends `buf`; on every other rank it receives the next
    /// broadcast into the buffer passed at completion time.
    fn post_broadcast(&self, root: Rank, buf: &[u8]) -> Result<Self::Handle>;

    /// Tests one in-flight operation, filling `buf` when an inbound
    /// operation completed.
    fn test_completion(&self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<bool>;

    /// Blocks until the operation completes, filling `buf` when inbound.
    fn wait(&self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<()>;

    /// Synchronous rendezvous across the whole pool.
    fn barrier(&self);
}

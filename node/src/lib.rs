pub mod config;
mod dispatch;
pub mod error;
pub mod learner;
pub mod node;
pub mod pending;
mod protocol;
pub mod transport;

pub use config::{NodeConfig, StaleMergePolicy};
pub use error::{NodeErr, Result};
pub use learner::{BatchFit, Learner, RefinementResult};
pub use node::Node;
pub use transport::{LocalCluster, MASTER_RANK, Rank, Transport};

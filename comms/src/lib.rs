pub mod envelope;
pub mod msg;
pub mod pack;

pub use envelope::{CommandKind, ENVELOPE_BYTES, Envelope, PAYLOAD_BYTES};
pub use msg::{AssignBatch, LevelIndexPair, LevelIndexVector, MergeView, RefinementView, UpdateType};

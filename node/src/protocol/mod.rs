//! Master/worker protocol operations layered on the pending registry:
//! grid update broadcasts, coefficient merge unicasts, batch assignment.

mod batch;
mod grid;
mod merge;

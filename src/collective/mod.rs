mod exchange;
mod group;

pub use group::{OpCode, RankContext, WorkerGroup};

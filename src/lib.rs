//! Collective writing of a partitioned dataset by an in-process worker group.
//!
//! Each worker holds a differently-sized local segment. The group exchanges
//! segment sizes, every rank resolves its disjoint offset by prefix sum, and
//! all ranks write one globally ordered dataset into a shared container
//! file. The persisted bytes depend only on the logical data and its order,
//! never on how many workers produced it.

pub mod collective;
pub mod dataset;
pub mod errors;
pub mod partition;
pub mod sources;
pub mod tasks;
pub mod utils;

pub use collective::{OpCode, RankContext, WorkerGroup};
pub use errors::{CoordinationError, Result};
pub use partition::{Placement, Region, SizeTable};

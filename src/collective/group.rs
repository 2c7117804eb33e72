use crate::errors::{CoordinationError, Result};
use std::sync::Arc;
use tokio::sync::{Barrier, Mutex};
use tracing::trace;

/// Tag carried by every collective round.
///
/// Ranks that enter different collectives in the same round deposit
/// different tags, which turns the mixup into a [`CoordinationError::SyncViolation`]
/// on every participant instead of silent corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Barrier,
    SizeExchange,
    ContainerCreate,
    DatasetDefine,
    RegionWrite,
    ContainerSeal,
}

impl OpCode {
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Barrier => "barrier",
            OpCode::SizeExchange => "size exchange",
            OpCode::ContainerCreate => "container create",
            OpCode::DatasetDefine => "dataset define",
            OpCode::RegionWrite => "region write",
            OpCode::ContainerSeal => "container seal",
        }
    }
}

struct GroupShared {
    size: usize,
    // Rank-indexed deposit slots for the round in flight. A deposit stays in
    // place until the owning rank overwrites it in the next round.
    slots: Mutex<Vec<Option<(OpCode, Vec<u8>)>>>,
    barrier: Barrier,
    poisoned: Mutex<Option<String>>,
}

/// Formation handle for an in-process worker group.
pub struct WorkerGroup;

impl WorkerGroup {
    /// Forms a group of `size` workers and hands out one context per rank.
    ///
    /// Ranks are assigned `0..size` in order, so uniqueness holds by
    /// construction. Any `size >= 1` is accepted.
    pub fn form(size: usize) -> Result<Vec<RankContext>> {
        if size == 0 {
            return Err(CoordinationError::GroupInit(
                "a worker group needs at least one member".to_string(),
            ));
        }
        let shared = Arc::new(GroupShared {
            size,
            slots: Mutex::new((0..size).map(|_| None).collect()),
            barrier: Barrier::new(size),
            poisoned: Mutex::new(None),
        });
        Ok((0..size)
            .map(|rank| RankContext {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }
}

/// One worker's identity inside its group.
///
/// Holds the worker's immutable rank and a handle onto the group's shared
/// exchange state. All collective calls must be made by every member of the
/// group; a worker that never makes its call leaves the others suspended
/// indefinitely, which is a caller obligation, not a detected condition.
pub struct RankContext {
    rank: usize,
    shared: Arc<GroupShared>,
}

impl RankContext {
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of workers in the group.
    pub fn size(&self) -> usize {
        self.shared.size
    }

    /// Blocks until every worker in the group has entered the barrier.
    pub async fn barrier(&self) -> Result<()> {
        self.all_gather_bytes(OpCode::Barrier, &[]).await?;
        Ok(())
    }

    /// Gathers one byte payload from every worker, rank-ordered.
    ///
    /// Blocks until all workers have deposited their payload for this round,
    /// then returns the full set indexed by rank, identical on every worker
    /// regardless of arrival order. Tag mismatches poison the group: this and
    /// every later round fail with a `SyncViolation` on all ranks.
    pub async fn all_gather_bytes(&self, op: OpCode, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        {
            let poisoned = self.shared.poisoned.lock().await;
            if let Some(reason) = poisoned.as_ref() {
                return Err(CoordinationError::SyncViolation {
                    operation: op.name().to_string(),
                    reason: reason.clone(),
                });
            }
        }
        trace!(rank = self.rank, op = op.name(), "entering collective round");

        {
            let mut slots = self.shared.slots.lock().await;
            slots[self.rank] = Some((op, payload.to_vec()));
        }
        // All deposits are in place once every rank has passed this point.
        self.shared.barrier.wait().await;

        let mut rows = Vec::with_capacity(self.shared.size);
        let mut mismatch: Option<String> = None;
        {
            let slots = self.shared.slots.lock().await;
            for (rank, slot) in slots.iter().enumerate() {
                match slot {
                    Some((slot_op, bytes)) => {
                        if *slot_op != op && mismatch.is_none() {
                            mismatch = Some(format!(
                                "rank {} entered {} while rank {} entered {}",
                                self.rank,
                                op.name(),
                                rank,
                                slot_op.name()
                            ));
                        }
                        rows.push(bytes.clone());
                    }
                    None => {
                        if mismatch.is_none() {
                            mismatch = Some(format!("rank {} deposited nothing", rank));
                        }
                    }
                }
            }
        }

        if let Some(reason) = mismatch {
            {
                let mut poisoned = self.shared.poisoned.lock().await;
                if poisoned.is_none() {
                    *poisoned = Some(reason.clone());
                }
            }
            // Mixed tags are visible to every rank of the round, so each one
            // takes this branch and barrier counts stay aligned.
            self.shared.barrier.wait().await;
            return Err(CoordinationError::SyncViolation {
                operation: op.name().to_string(),
                reason,
            });
        }

        // The second wait keeps next-round deposits from racing the copies
        // taken above.
        self.shared.barrier.wait().await;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_is_rejected() {
        assert!(matches!(
            WorkerGroup::form(0),
            Err(CoordinationError::GroupInit(_))
        ));
    }

    #[test]
    fn contexts_are_rank_ordered() {
        let contexts = WorkerGroup::form(3).unwrap();
        let ranks: Vec<usize> = contexts.iter().map(|c| c.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(contexts.iter().all(|c| c.size() == 3));
    }

    #[tokio::test]
    async fn single_worker_gather_returns_own_row() {
        let mut contexts = WorkerGroup::form(1).unwrap();
        let ctx = contexts.remove(0);
        let rows = ctx
            .all_gather_bytes(OpCode::SizeExchange, &[7, 7])
            .await
            .unwrap();
        assert_eq!(rows, vec![vec![7, 7]]);
    }
}

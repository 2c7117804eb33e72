use crate::collective::group::{OpCode, RankContext};
use crate::errors::{CoordinationError, Result};
use crate::partition::SizeTable;

impl RankContext {
    /// Exchanges this worker's segment size against the whole group.
    ///
    /// Blocking all-gather: suspends until every worker has reported, then
    /// returns the rank-ordered [`SizeTable`], identical on every worker.
    /// Must be called exactly once per round by every group member.
    pub async fn exchange_sizes(&self, local: u64) -> Result<SizeTable> {
        let rows = self
            .all_gather_bytes(OpCode::SizeExchange, &local.to_le_bytes())
            .await?;
        let mut sizes = Vec::with_capacity(rows.len());
        for (rank, row) in rows.iter().enumerate() {
            let bytes: [u8; 8] =
                row.as_slice()
                    .try_into()
                    .map_err(|_| CoordinationError::SyncViolation {
                        operation: OpCode::SizeExchange.name().to_string(),
                        reason: format!(
                            "rank {} contributed {} bytes, expected 8",
                            rank,
                            row.len()
                        ),
                    })?;
            sizes.push(u64::from_le_bytes(bytes));
        }
        Ok(SizeTable::new(sizes))
    }

    /// Agrees on the outcome of a collective step.
    ///
    /// Every worker contributes its local result's status; if any rank
    /// failed, the whole round fails. Ranks that failed locally keep their
    /// own error, ranks that succeeded get a [`CoordinationError::PeerFailure`]
    /// naming the ranks that did not.
    pub async fn confirm<T>(&self, op: OpCode, outcome: Result<T>) -> Result<T> {
        let status = [if outcome.is_ok() { 0u8 } else { 1u8 }];
        let rows = self.all_gather_bytes(op, &status).await?;
        let failed: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.first().copied().unwrap_or(1) != 0)
            .map(|(rank, _)| rank)
            .collect();
        if failed.is_empty() {
            return outcome;
        }
        match outcome {
            Err(err) => Err(err),
            Ok(_) => Err(CoordinationError::PeerFailure {
                operation: op.name().to_string(),
                ranks: failed,
            }),
        }
    }
}

pub mod fill2dataset;

use crate::collective::{RankContext, WorkerGroup};
use crate::errors::{CoordinationError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use tracing::{debug, warn};

/// Spawns one worker future per rank and drives the group to completion.
///
/// On success the workers' outputs come back in rank order. On the first
/// worker failure the remaining workers are aborted (a surviving worker
/// would otherwise suspend forever at its next collective call) and that
/// first error is returned.
pub async fn run_group<T, F, Fut>(size: usize, worker: F) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Fn(RankContext) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let contexts = WorkerGroup::form(size)?;
    debug!(size, "spawning worker group");

    let mut abort_handles = Vec::with_capacity(size);
    let mut pending = FuturesUnordered::new();
    for ctx in contexts {
        let rank = ctx.rank();
        let handle = tokio::spawn(worker(ctx));
        abort_handles.push(handle.abort_handle());
        pending.push(async move { (rank, handle.await) });
    }

    let mut outputs: Vec<Option<T>> = Vec::with_capacity(size);
    outputs.resize_with(size, || None);
    let mut first_error: Option<CoordinationError> = None;

    while let Some((rank, joined)) = pending.next().await {
        match joined {
            Ok(Ok(output)) => {
                outputs[rank] = Some(output);
            }
            Ok(Err(error)) => {
                if first_error.is_none() {
                    warn!(rank, error = %error, "worker failed, aborting the group");
                    first_error = Some(error);
                    for handle in &abort_handles {
                        handle.abort();
                    }
                }
            }
            Err(join_error) => {
                if join_error.is_cancelled() {
                    continue;
                }
                if first_error.is_none() {
                    warn!(rank, error = %join_error, "worker panicked, aborting the group");
                    first_error = Some(CoordinationError::WorkerAborted {
                        rank,
                        reason: join_error.to_string(),
                    });
                    for handle in &abort_handles {
                        handle.abort();
                    }
                }
            }
        }
    }

    if let Some(error) = first_error {
        return Err(error);
    }
    outputs
        .into_iter()
        .enumerate()
        .map(|(rank, output)| {
            output.ok_or_else(|| CoordinationError::WorkerAborted {
                rank,
                reason: "worker produced no output".to_string(),
            })
        })
        .collect()
}

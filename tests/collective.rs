use sediment::dataset::{ElementType, SharedContainer};
use sediment::errors::CoordinationError;
use sediment::tasks::run_group;
use std::path::PathBuf;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn gathered_rows_are_rank_ordered_regardless_of_arrival() {
    let tables = run_group(4, |ctx| async move {
        // Later ranks arrive first.
        tokio::time::sleep(Duration::from_millis(30 * (3 - ctx.rank() as u64))).await;
        ctx.exchange_sizes(ctx.rank() as u64 * 100).await
    })
    .await
    .unwrap();

    for table in tables {
        assert_eq!(table.sizes(), &[0, 100, 200, 300]);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn mixing_collectives_is_reported_on_every_rank() {
    let outcomes = run_group(2, |ctx| async move {
        let result = if ctx.rank() == 0 {
            ctx.exchange_sizes(1).await.map(|_| ())
        } else {
            ctx.barrier().await
        };
        Ok(matches!(
            result,
            Err(CoordinationError::SyncViolation { .. })
        ))
    })
    .await
    .unwrap();
    assert_eq!(outcomes, vec![true, true]);
}

#[tokio::test(flavor = "multi_thread")]
async fn poisoned_groups_fail_fast_afterwards() {
    let outcomes = run_group(2, |ctx| async move {
        let first = if ctx.rank() == 0 {
            ctx.exchange_sizes(1).await.map(|_| ())
        } else {
            ctx.barrier().await
        };
        assert!(first.is_err());

        // The next round must fail without blocking.
        let second = ctx.barrier().await;
        Ok(matches!(
            second,
            Err(CoordinationError::SyncViolation { .. })
        ))
    })
    .await
    .unwrap();
    assert_eq!(outcomes, vec![true, true]);
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_worker_aborts_the_group() {
    let err = run_group(2, |ctx| async move {
        if ctx.rank() == 1 {
            panic!("worker crashed");
        }
        ctx.barrier().await?;
        Ok(())
    })
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        CoordinationError::WorkerAborted { rank: 1, .. }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_worker_releases_blocked_peers() {
    let err = run_group(3, |ctx| async move {
        if ctx.rank() == 2 {
            return Err(CoordinationError::Storage(std::io::Error::other(
                "disk gone",
            )));
        }
        // Ranks 0 and 1 block on a collective that rank 2 never joins.
        ctx.barrier().await?;
        Ok(())
    })
    .await
    .unwrap_err();
    assert!(matches!(err, CoordinationError::Storage(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn storage_failure_fails_the_whole_group() {
    let outcomes = run_group(2, |ctx| async move {
        let path = PathBuf::from("/nonexistent-sediment-dir/out.sed");
        let label = match SharedContainer::create(&ctx, &path).await {
            Err(CoordinationError::Storage(_)) => "storage",
            Err(CoordinationError::PeerFailure { ranks, .. }) => {
                assert_eq!(ranks, vec![0]);
                "peer"
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("create unexpectedly succeeded"),
        };
        Ok(label)
    })
    .await
    .unwrap();
    assert_eq!(outcomes, vec!["storage", "peer"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn divergent_descriptors_fail_all_workers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("divergent.sed");

    let outcomes = run_group(2, {
        let path = path.clone();
        move |ctx| {
            let path = path.clone();
            async move {
                let table = ctx.exchange_sizes(4).await?;
                let placement = table.placement(ctx.rank())?;
                let mut container = SharedContainer::create(&ctx, &path).await?;
                let name = if ctx.rank() == 0 { "Left" } else { "Right" };
                let result = container
                    .define_dataset(&ctx, name, ElementType::I32, placement.total)
                    .await;
                Ok(matches!(
                    result,
                    Err(CoordinationError::SyncViolation { .. })
                ))
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(outcomes, vec![true, true]);
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_buffer_length_fails_the_write_round() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mismatch.sed");

    let outcomes = run_group(2, {
        let path = path.clone();
        move |ctx| {
            let path = path.clone();
            async move {
                let table = ctx.exchange_sizes(4).await?;
                let placement = table.placement(ctx.rank())?;
                let mut container = SharedContainer::create(&ctx, &path).await?;
                let dataset = container
                    .define_dataset(&ctx, "Numbers", ElementType::I32, placement.total)
                    .await?;

                let buffer = vec![1i32; if ctx.rank() == 1 { 3 } else { 4 }];
                let label = match dataset
                    .write_region(&ctx, placement.region(), &buffer)
                    .await
                {
                    Err(CoordinationError::SyncViolation { .. }) => "violation",
                    Err(CoordinationError::PeerFailure { operation, ranks }) => {
                        assert_eq!(operation, "region write");
                        assert_eq!(ranks, vec![1]);
                        "peer"
                    }
                    Err(other) => panic!("unexpected error: {:?}", other),
                    Ok(_) => panic!("write unexpectedly succeeded"),
                };
                Ok(label)
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(outcomes, vec!["peer", "violation"]);
}

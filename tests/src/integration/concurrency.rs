//! # Concurrency
//!
//! Many tasks and many submitters against one service on a multi-threaded
//! runtime. Real time, so every wait is bounded.

#[cfg(test)]
mod tests {
    use crate::integration::support::{
        digest_of, equal_stake_operators, AggregatorHarness, PriceUpdate,
    };
    use avs_bls_aggregation::{
        BlsAggregationApi, BlsAggregationError, BlsAggregatorConfig, QuorumNum,
        SignatureVerificationError, TaskIndex,
    };
    use primitive_types::U256;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use tokio::task::JoinSet;
    use tokio::time;

    const EXPIRY: Duration = Duration::from_secs(30);
    const WAIT: Duration = Duration::from_secs(10);

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_tasks_each_yield_one_response() {
        const TASKS: TaskIndex = 50;
        let mut h = AggregatorHarness::new(equal_stake_operators(4, 100));

        let mut submitters = JoinSet::new();
        for task_index in 0..TASKS {
            h.init(task_index, 75, EXPIRY, Duration::ZERO).unwrap();

            let service = h.service.clone();
            let operators = h.operators[..3].to_vec();
            let cancel = h.cancel.clone();
            submitters.spawn(async move {
                let update = PriceUpdate::new(task_index as u64, 1_000 + task_index as u64);
                let digest = digest_of(&update);
                for op in &operators {
                    service
                        .process_new_signature(
                            &cancel,
                            task_index,
                            update.clone(),
                            op.sign(&digest),
                            op.id,
                        )
                        .await?;
                }
                Ok::<_, BlsAggregationError>(())
            });
        }

        while let Some(joined) = submitters.join_next().await {
            joined.unwrap().unwrap();
        }

        let mut finished = BTreeSet::new();
        for _ in 0..TASKS {
            let response = time::timeout(WAIT, h.next_response())
                .await
                .expect("every task finishes")
                .unwrap();
            assert_eq!(response.task_response.price, 1_000 + response.task_index as u64);
            assert_eq!(response.non_signer_operator_ids, vec![h.operators[3].id]);
            finished.insert(response.task_index);
        }

        assert_eq!(finished, (0..TASKS).collect::<BTreeSet<_>>());
        assert_eq!(h.service.active_task_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submitters_to_one_task() {
        let mut h = AggregatorHarness::new(equal_stake_operators(20, 100));
        let update = PriceUpdate::new(1, 77);
        h.init(1, 100, EXPIRY, Duration::ZERO).unwrap();

        let mut submitters = JoinSet::new();
        for op in h.operators.clone() {
            let service = h.service.clone();
            let cancel = h.cancel.clone();
            let update = update.clone();
            submitters.spawn(async move {
                let signature = op.sign(&digest_of(&update));
                service
                    .process_new_signature(&cancel, 1, update, signature, op.id)
                    .await
            });
        }
        while let Some(joined) = submitters.join_next().await {
            joined.unwrap().unwrap();
        }

        let response = time::timeout(WAIT, h.next_response())
            .await
            .expect("task finishes")
            .unwrap();
        assert!(response.non_signer_operator_ids.is_empty());
        assert_eq!(
            response.signed_stake_per_quorum[&QuorumNum(0)],
            U256::from(2_000u64)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_duplicates_accept_exactly_one() {
        let h = AggregatorHarness::new(equal_stake_operators(2, 100));
        let update = PriceUpdate::new(2, 5);
        h.init(2, 100, EXPIRY, Duration::ZERO).unwrap();

        let op = h.operators[0].clone();
        let signature = op.sign(&digest_of(&update));
        let mut submitters = JoinSet::new();
        for _ in 0..8 {
            let service = h.service.clone();
            let cancel = h.cancel.clone();
            let update = update.clone();
            let operator_id = op.id;
            submitters.spawn(async move {
                service
                    .process_new_signature(&cancel, 2, update, signature, operator_id)
                    .await
            });
        }

        let mut accepted = 0;
        let mut duplicates = 0;
        while let Some(joined) = submitters.join_next().await {
            match joined.unwrap() {
                Ok(()) => accepted += 1,
                Err(BlsAggregationError::Signature {
                    source: SignatureVerificationError::DuplicateSignature { .. },
                    ..
                }) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(duplicates, 7);
        assert!(h.service.is_task_active(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_task_limit_frees_up_after_completion() {
        let config = BlsAggregatorConfig {
            max_active_tasks: 2,
            ..Default::default()
        };
        let mut h = AggregatorHarness::with_config(equal_stake_operators(1, 100), config);
        let update = PriceUpdate::new(3, 3);

        h.init(1, 100, EXPIRY, Duration::ZERO).unwrap();
        h.init(2, 100, EXPIRY, Duration::ZERO).unwrap();
        assert_eq!(
            h.init(3, 100, EXPIRY, Duration::ZERO),
            Err(BlsAggregationError::TooManyActiveTasks {
                task_index: 3,
                limit: 2
            })
        );

        h.submit(1, 0, &update).await.unwrap();
        time::timeout(WAIT, h.next_response())
            .await
            .expect("task 1 finishes")
            .unwrap();

        h.init(3, 100, EXPIRY, Duration::ZERO).unwrap();
        assert_eq!(h.service.active_task_count(), 2);
    }
}

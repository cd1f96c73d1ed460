//! # Task Lifecycle Scenarios
//!
//! End-to-end runs through the public API: initialize, submit, read the
//! single terminal response.

#[cfg(test)]
mod tests {
    use crate::integration::support::{
        digest_of, equal_stake_operators, AggregatorHarness, PriceUpdate,
    };
    use avs_bls_aggregation::domain::bls;
    use avs_bls_aggregation::testing::TestOperator;
    use avs_bls_aggregation::{
        BlsAggregationApi, BlsAggregationError, OperatorId, QuorumNum, SignatureVerificationError,
    };
    use primitive_types::U256;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use std::time::Duration;
    use tokio::time::{self, Instant};

    const EXPIRY: Duration = Duration::from_secs(30);
    const NO_WINDOW: Duration = Duration::ZERO;

    fn ids(operators: &[TestOperator]) -> Vec<OperatorId> {
        operators.iter().map(|op| op.id).collect()
    }

    // =========================================================================
    // SINGLE QUORUM
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_single_quorum_completes_at_two_thirds() {
        let operators = vec![
            TestOperator::new(1, &[(0, 40)]),
            TestOperator::new(2, &[(0, 30)]),
            TestOperator::new(3, &[(0, 20)]),
            TestOperator::new(4, &[(0, 10)]),
        ];
        let mut h = AggregatorHarness::new(operators);
        let update = PriceUpdate::new(7, 3_150);

        h.init(1, 67, EXPIRY, NO_WINDOW).unwrap();
        h.submit(1, 0, &update).await.unwrap();
        assert!(h.service.is_task_active(1));
        h.submit(1, 1, &update).await.unwrap();

        let response = h.next_response().await.unwrap();
        assert_eq!(response.task_index, 1);
        assert_eq!(response.task_response, update);
        assert_eq!(response.task_response_digest, digest_of(&update));
        assert_eq!(response.non_signer_operator_ids, ids(&h.operators[2..]));
        assert_eq!(
            response.non_signers_pubkeys_g1,
            vec![h.operators[2].g1(), h.operators[3].g1()]
        );
        assert_eq!(
            response.signed_stake_per_quorum[&QuorumNum(0)],
            U256::from(70u64)
        );
        assert_eq!(
            response.total_stake_per_quorum[&QuorumNum(0)],
            U256::from(100u64)
        );
        assert_eq!(response.quorum_apks_g1.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aggregate_signature_verifies_against_signer_key() {
        let mut h = AggregatorHarness::new(equal_stake_operators(4, 25));
        let update = PriceUpdate::new(1, 99);

        h.init(3, 50, EXPIRY, NO_WINDOW).unwrap();
        h.submit(3, 2, &update).await.unwrap();
        h.submit(3, 0, &update).await.unwrap();

        let response = h.next_response().await.unwrap();
        assert_eq!(
            bls::verify_signature(
                &response.task_response_digest,
                &response.signers_agg_sig_g1,
                &response.signers_apk_g2,
            ),
            Ok(true)
        );
        let expected_apk =
            bls::aggregate_g2_pubkeys(&[h.operators[0].g2(), h.operators[2].g2()]).unwrap();
        assert_eq!(response.signers_apk_g2, expected_apk);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrival_order_does_not_change_aggregate() {
        let mut h = AggregatorHarness::new(equal_stake_operators(8, 100));
        let update = PriceUpdate::new(1, 1);
        let mut rng = StdRng::seed_from_u64(0xA5);

        let mut aggregates = Vec::new();
        for task_index in 30..34 {
            let mut order: Vec<usize> = (0..h.operators.len()).collect();
            order.shuffle(&mut rng);

            h.init(task_index, 100, EXPIRY, NO_WINDOW).unwrap();
            for operator in order {
                h.submit(task_index, operator, &update).await.unwrap();
            }
            let response = h.next_response().await.unwrap();
            aggregates.push((response.signers_agg_sig_g1, response.signers_apk_g2));
        }

        assert!(aggregates.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_boundary_is_exact() {
        let operators = vec![
            TestOperator::new(1, &[(0, 200)]),
            TestOperator::new(2, &[(0, 1)]),
            TestOperator::new(3, &[(0, 99)]),
        ];
        let mut h = AggregatorHarness::new(operators);
        let update = PriceUpdate::new(2, 10);

        h.init(5, 67, EXPIRY, NO_WINDOW).unwrap();

        // 200 of 300 is one unit short of 67%.
        h.submit(5, 0, &update).await.unwrap();
        time::sleep(Duration::from_secs(1)).await;
        assert!(h.service.is_task_active(5));

        h.submit(5, 1, &update).await.unwrap();
        let response = h.next_response().await.unwrap();
        assert_eq!(response.non_signer_operator_ids, vec![h.operators[2].id]);
        assert_eq!(
            response.signed_stake_per_quorum[&QuorumNum(0)],
            U256::from(201u64)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_signers_sorted_by_operator_id() {
        let operators = vec![
            TestOperator::new(900, &[(0, 10)]),
            TestOperator::new(5, &[(0, 10)]),
            TestOperator::new(77, &[(0, 10)]),
            TestOperator::new(12, &[(0, 70)]),
        ];
        let mut h = AggregatorHarness::new(operators);
        let update = PriceUpdate::new(3, 1);

        h.init(8, 70, EXPIRY, NO_WINDOW).unwrap();
        h.submit(8, 3, &update).await.unwrap();

        let response = h.next_response().await.unwrap();
        let expected: Vec<OperatorId> = [5u64, 77, 900]
            .iter()
            .map(|id| OperatorId::from(U256::from(*id)))
            .collect();
        assert_eq!(response.non_signer_operator_ids, expected);
        assert_eq!(h.provider.indices_requests(), vec![expected]);
    }

    // =========================================================================
    // MULTI QUORUM
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_every_quorum_must_reach_its_threshold() {
        let operators = vec![
            TestOperator::new(1, &[(0, 100)]),
            TestOperator::new(2, &[(0, 100), (1, 100)]),
            TestOperator::new(3, &[(1, 100)]),
            TestOperator::new(4, &[(0, 100)]),
        ];
        let mut h = AggregatorHarness::new(operators);
        let update = PriceUpdate::new(4, 44);

        h.service
            .initialize_new_task(
                2,
                1,
                vec![QuorumNum(0), QuorumNum(1)],
                vec![50, 100],
                EXPIRY,
            )
            .unwrap();

        h.submit(2, 0, &update).await.unwrap();
        h.submit(2, 1, &update).await.unwrap();
        // Quorum 0 is satisfied but quorum 1 only has half its stake.
        time::sleep(Duration::from_secs(1)).await;
        assert!(h.service.is_task_active(2));

        h.submit(2, 2, &update).await.unwrap();
        let response = h.next_response().await.unwrap();

        assert_eq!(response.non_signer_operator_ids, vec![h.operators[3].id]);
        assert_eq!(response.non_signers_pubkeys_g1, vec![h.operators[3].g1()]);
        assert_eq!(response.quorum_apks_g1.len(), 2);
        assert_eq!(
            response.signed_stake_per_quorum[&QuorumNum(0)],
            U256::from(200u64)
        );
        assert_eq!(
            response.signed_stake_per_quorum[&QuorumNum(1)],
            U256::from(200u64)
        );
        assert_eq!(
            response.total_stake_per_quorum[&QuorumNum(0)],
            U256::from(300u64)
        );
        assert_eq!(response.indices.quorum_apk_indices.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operator_outside_task_quorums_is_rejected() {
        let operators = vec![
            TestOperator::new(1, &[(0, 100)]),
            TestOperator::new(2, &[(1, 100)]),
        ];
        let h = AggregatorHarness::new(operators);
        let update = PriceUpdate::new(5, 5);

        h.init(4, 100, EXPIRY, NO_WINDOW).unwrap();
        let err = h.submit(4, 1, &update).await.unwrap_err();

        assert!(matches!(
            err,
            BlsAggregationError::Signature {
                task_index: 4,
                source: SignatureVerificationError::OperatorNotInQuorum { .. },
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operator_deregistered_before_task_block_is_rejected() {
        let h = AggregatorHarness::new(equal_stake_operators(3, 100));
        h.provider.deregister_operator(&h.operators[2].id, 1);
        let update = PriceUpdate::new(6, 6);

        h.init(6, 50, EXPIRY, NO_WINDOW).unwrap();
        let err = h.submit(6, 2, &update).await.unwrap_err();

        assert!(matches!(
            err,
            BlsAggregationError::Signature {
                source: SignatureVerificationError::OperatorNotInQuorum { .. },
                ..
            }
        ));
    }

    // =========================================================================
    // WINDOW
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_window_admits_late_signer() {
        let mut h = AggregatorHarness::new(equal_stake_operators(4, 100));
        let update = PriceUpdate::new(9, 1_000);
        let window = Duration::from_secs(2);

        h.init(10, 50, EXPIRY, window).unwrap();
        let started = Instant::now();
        h.submit(10, 0, &update).await.unwrap();
        h.submit(10, 1, &update).await.unwrap();

        time::sleep(Duration::from_secs(1)).await;
        h.submit(10, 2, &update).await.unwrap();

        let response = h.next_response().await.unwrap();
        assert!(started.elapsed() >= window);
        assert_eq!(response.non_signer_operator_ids, vec![h.operators[3].id]);
        assert_eq!(
            response.signed_stake_per_quorum[&QuorumNum(0)],
            U256::from(300u64)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_cuts_window_short() {
        let mut h = AggregatorHarness::new(equal_stake_operators(3, 100));
        let update = PriceUpdate::new(11, 11);

        h.init(11, 60, Duration::from_secs(3), Duration::from_secs(10))
            .unwrap();
        let started = Instant::now();
        h.submit(11, 0, &update).await.unwrap();
        h.submit(11, 1, &update).await.unwrap();

        let response = h.next_response().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(response.non_signer_operator_ids, vec![h.operators[2].id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_digest_meeting_threshold_wins() {
        let mut h = AggregatorHarness::new(equal_stake_operators(6, 100));
        let first = PriceUpdate::new(12, 100);
        let second = PriceUpdate::new(12, 101);

        h.init(12, 30, EXPIRY, Duration::from_secs(5)).unwrap();
        h.submit(12, 0, &first).await.unwrap();
        h.submit(12, 1, &first).await.unwrap();
        h.submit(12, 2, &second).await.unwrap();
        h.submit(12, 3, &second).await.unwrap();

        let response = h.next_response().await.unwrap();
        assert_eq!(response.task_response, second);
        assert_eq!(response.task_response_digest, digest_of(&second));
        let expected = vec![
            h.operators[0].id,
            h.operators[1].id,
            h.operators[4].id,
            h.operators[5].id,
        ];
        assert_eq!(response.non_signer_operator_ids, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_minority_digest_does_not_displace_winner() {
        let mut h = AggregatorHarness::new(equal_stake_operators(6, 100));
        let majority = PriceUpdate::new(13, 500);
        let minority = PriceUpdate::new(13, 501);

        h.init(13, 30, EXPIRY, Duration::from_secs(5)).unwrap();
        h.submit(13, 0, &majority).await.unwrap();
        h.submit(13, 1, &majority).await.unwrap();
        h.submit(13, 2, &minority).await.unwrap();

        let response = h.next_response().await.unwrap();
        assert_eq!(response.task_response, majority);
        assert_eq!(response.non_signer_operator_ids, ids(&h.operators[2..]));
    }

    // =========================================================================
    // FAILURE PATHS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_task_without_signatures_expires() {
        let mut h = AggregatorHarness::new(equal_stake_operators(3, 100));

        h.init(20, 67, Duration::from_secs(5), NO_WINDOW).unwrap();
        let started = Instant::now();
        let err = h.next_response().await.unwrap_err();

        assert_eq!(err, BlsAggregationError::TaskExpired { task_index: 20 });
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(!h.service.is_task_active(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_submission_is_not_double_counted() {
        let mut h = AggregatorHarness::new(equal_stake_operators(3, 100));
        let update = PriceUpdate::new(21, 21);

        h.init(21, 60, Duration::from_secs(5), NO_WINDOW).unwrap();
        h.submit(21, 0, &update).await.unwrap();
        let err = h.submit(21, 0, &update).await.unwrap_err();
        assert!(matches!(
            err,
            BlsAggregationError::Signature {
                source: SignatureVerificationError::DuplicateSignature { .. },
                ..
            }
        ));

        // One operator of three never reaches 60%, however often it signs.
        assert_eq!(
            h.next_response().await.unwrap_err(),
            BlsAggregationError::TaskExpired { task_index: 21 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_rejected_after_others_signed() {
        let mut h = AggregatorHarness::new(equal_stake_operators(5, 100));
        let update = PriceUpdate::new(24, 24);

        h.init(24, 100, Duration::from_secs(5), NO_WINDOW).unwrap();
        h.submit(24, 0, &update).await.unwrap();
        for operator in 1..4 {
            h.submit(24, operator, &update).await.unwrap();
        }
        let err = h.submit(24, 0, &update).await.unwrap_err();
        assert_eq!(
            err,
            BlsAggregationError::Signature {
                task_index: 24,
                source: SignatureVerificationError::DuplicateSignature {
                    operator_id: h.operators[0].id
                },
            }
        );

        // The duplicate added nothing: the last operator still completes the task
        // with exactly the five distinct signatures.
        h.submit(24, 4, &update).await.unwrap();
        let response = h.next_response().await.unwrap();
        assert!(response.non_signer_operator_ids.is_empty());
        assert_eq!(
            response.signed_stake_per_quorum[&QuorumNum(0)],
            U256::from(500u64)
        );
        let signatures: Vec<_> = h
            .operators
            .iter()
            .map(|op| op.sign(&digest_of(&update)))
            .collect();
        assert_eq!(
            response.signers_agg_sig_g1,
            bls::aggregate_signatures(&signatures).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_forged_signature_is_rejected_and_task_continues() {
        let mut h = AggregatorHarness::new(equal_stake_operators(3, 100));
        let update = PriceUpdate::new(22, 22);
        let forged = h.operators[1].sign(&digest_of(&update));

        h.init(22, 60, EXPIRY, NO_WINDOW).unwrap();
        let err = h
            .service
            .process_new_signature(&h.cancel, 22, update.clone(), forged, h.operators[0].id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BlsAggregationError::Signature {
                source: SignatureVerificationError::IncorrectSignature { .. },
                ..
            }
        ));

        h.submit(22, 0, &update).await.unwrap();
        h.submit(22, 1, &update).await.unwrap();
        assert!(h.next_response().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_one_response_then_task_not_found() {
        let mut h = AggregatorHarness::new(equal_stake_operators(2, 100));
        let update = PriceUpdate::new(23, 23);

        h.init(23, 50, EXPIRY, NO_WINDOW).unwrap();
        h.submit(23, 0, &update).await.unwrap();
        h.next_response().await.unwrap();

        assert_eq!(
            h.submit(23, 1, &update).await.unwrap_err(),
            BlsAggregationError::TaskNotFound { task_index: 23 }
        );
        let nothing_else = time::timeout(Duration::from_secs(60), h.next_response()).await;
        assert!(nothing_else.is_err());
    }
}

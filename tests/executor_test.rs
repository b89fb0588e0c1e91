// Step executor tests
// Allowance check ordering, approval submission and error classification
//
// Numan Thabit 2025 Nov

mod mocks;

use std::sync::Arc;

use mocks::*;
use xswap::errors::{SignerError, SwapError};
use xswap::router::{Route, StepExecutor, VenueKind};
use xswap::venues::{RouteSource, VenueSet};
use xswap::{Asset, ChainFamily};

fn executor(log: &CallLog, source: MockSource) -> (StepExecutor, Arc<MockSource>) {
    let source = Arc::new(source);
    let venues = VenueSet::new(
        Some(source.clone() as Arc<dyn RouteSource>),
        Arc::new(MockSource::new(VenueKind::Bridge, log.clone())),
    );
    (StepExecutor::new(venues), source)
}

fn token_route() -> Route {
    route(
        VenueKind::SingleChain,
        ETH,
        ETH,
        vec![step(ETH, ETH, Asset::token(USDC), Some(SPENDER))],
    )
}

#[tokio::test]
async fn insufficient_allowance_approves_before_swapping() {
    let log = CallLog::default();
    let (executor, _) = executor(&log, MockSource::new(VenueKind::SingleChain, log.clone()));
    let signer = MockSigner::new(ChainFamily::Evm, 0, log.clone());

    let tx_hash = executor
        .execute_step(&token_route(), 0, &signer)
        .await
        .unwrap();

    assert_eq!(tx_hash, "0xtx2");
    assert_eq!(
        log.entries(),
        vec![
            "template:single:0".to_string(),
            format!("allowance:{USDC}:{SPENDER}"),
            "sign:approve:1".to_string(),
            "sign:step:2".to_string(),
        ]
    );
    let sent = signer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].payload["spender"], SPENDER);
    assert_eq!(sent[0].payload["amount"], "1000000");
    assert_eq!(executor.stats().approvals_sent, 1);
}

#[tokio::test]
async fn sufficient_allowance_sends_only_the_step() {
    let log = CallLog::default();
    let (executor, _) = executor(&log, MockSource::new(VenueKind::SingleChain, log.clone()));
    let signer = MockSigner::new(ChainFamily::Evm, u128::MAX, log.clone());

    executor
        .execute_step(&token_route(), 0, &signer)
        .await
        .unwrap();

    assert_eq!(log.count("allowance:"), 1);
    assert_eq!(log.count("sign:"), 1);
    assert_eq!(signer.sent().len(), 1);
}

#[tokio::test]
async fn native_input_skips_allowance_check() {
    let log = CallLog::default();
    let (executor, _) = executor(&log, MockSource::new(VenueKind::SingleChain, log.clone()));
    let signer = MockSigner::new(ChainFamily::Evm, 0, log.clone());
    let route = route(
        VenueKind::SingleChain,
        ETH,
        ETH,
        vec![step(ETH, ETH, Asset::Native, Some(SPENDER))],
    );

    executor.execute_step(&route, 0, &signer).await.unwrap();

    assert_eq!(log.count("allowance:"), 0);
    assert_eq!(log.entries(), vec!["template:single:0", "sign:step:1"]);
}

#[tokio::test]
async fn rejected_approval_is_retry_safe() {
    let log = CallLog::default();
    let (executor, _) = executor(&log, MockSource::new(VenueKind::SingleChain, log.clone()));
    let signer = MockSigner::new(ChainFamily::Evm, 0, log.clone())
        .failing_with(SignerError::Rejected("insufficient funds for gas".into()));

    let err = executor
        .execute_step(&token_route(), 0, &signer)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SwapError::ApprovalFailed {
            step: 0,
            may_have_landed: false,
            ..
        }
    ));
    assert!(err.retry_safe());
    // the swap itself is never attempted
    assert_eq!(log.count("sign:step"), 0);
    assert_eq!(executor.stats().steps_failed, 1);
}

#[tokio::test]
async fn unconfirmed_submission_may_have_landed() {
    let log = CallLog::default();
    let (executor, _) = executor(&log, MockSource::new(VenueKind::SingleChain, log.clone()));
    let signer = MockSigner::new(ChainFamily::Evm, u128::MAX, log.clone()).failing_with(
        SignerError::InclusionTimeout {
            tx_hash: "0xfeed".into(),
        },
    );

    let err = executor
        .execute_step(&token_route(), 0, &signer)
        .await
        .unwrap_err();

    match &err {
        SwapError::StepSubmissionFailed {
            tx_hash,
            may_have_landed,
            ..
        } => {
            assert_eq!(tx_hash.as_deref(), Some("0xfeed"));
            assert!(*may_have_landed);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!err.retry_safe());
}

#[tokio::test]
async fn template_failure_never_reaches_signer() {
    let log = CallLog::default();
    let source = MockSource::new(VenueKind::SingleChain, log.clone())
        .with_template_error(SwapError::Upstream("quote expired".into()));
    let (executor, _) = executor(&log, source);
    let signer = MockSigner::new(ChainFamily::Evm, 0, log.clone());

    let err = executor
        .execute_step(&token_route(), 0, &signer)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SwapError::StepSubmissionFailed {
            may_have_landed: false,
            ..
        }
    ));
    assert!(signer.sent().is_empty());
    assert_eq!(log.count("allowance:"), 0);
}

#[tokio::test]
async fn out_of_range_step_is_malformed() {
    let log = CallLog::default();
    let (executor, _) = executor(&log, MockSource::new(VenueKind::SingleChain, log.clone()));
    let signer = MockSigner::new(ChainFamily::Evm, 0, log.clone());

    let err = executor
        .execute_step(&token_route(), 3, &signer)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), xswap::ErrorKind::MalformedRoute);
    assert!(log.entries().is_empty());
}

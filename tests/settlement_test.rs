// Settlement tracker tests
// Poll cadence, terminal emission, deadline and cancellation on paused time
//
// Numan Thabit 2025 Nov

mod mocks;

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use mocks::*;
use xswap::errors::SwapError;
use xswap::settlement::{SettlementStatus, SettlementTracker};
use xswap::venues::StatusQuery;
use xswap::ChainId;

const INTERVAL: Duration = Duration::from_secs(5);

fn query() -> StatusQuery {
    StatusQuery {
        tx_hash: "0xbridge".into(),
        tool: "stargate".into(),
        from_chain: ChainId(ETH),
        to_chain: ChainId(ARB),
    }
}

fn tracker(status: &Arc<MockStatus>, deadline: Duration) -> SettlementTracker {
    SettlementTracker::with_timing(status.clone(), INTERVAL, deadline)
}

#[tokio::test(start_paused = true)]
async fn first_lookup_waits_one_interval() {
    let status = Arc::new(MockStatus::new(CallLog::default()).then("DONE", Some("COMPLETED")));
    let mut handle = tracker(&status, Duration::from_secs(60)).track(query());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(status.polls(), 0);

    assert_eq!(handle.next_status().await, Some(SettlementStatus::Done));
    assert_eq!(status.polls(), 1);
    assert_eq!(status.queries()[0], query());
}

#[tokio::test(start_paused = true)]
async fn emits_one_terminal_status_and_stops() {
    let status = Arc::new(
        MockStatus::new(CallLog::default())
            .then("PENDING", Some("WAIT_SOURCE_CONFIRMATIONS"))
            .then("DONE", Some("COMPLETED")),
    );
    let handle = tracker(&status, Duration::from_secs(600)).track(query());

    let seen: Vec<_> = handle.collect().await;
    assert_eq!(
        seen,
        vec![
            SettlementStatus::Pending {
                substatus: Some("WAIT_SOURCE_CONFIRMATIONS".into())
            },
            SettlementStatus::Done,
        ]
    );

    tokio::time::sleep(INTERVAL * 10).await;
    assert_eq!(status.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_status_keeps_substatus() {
    let status =
        Arc::new(MockStatus::new(CallLog::default()).then("FAILED", Some("SLIPPAGE_EXCEEDED")));
    let terminal = tracker(&status, Duration::from_secs(60))
        .track(query())
        .wait_terminal(|_| {})
        .await;

    assert_eq!(
        terminal,
        SettlementStatus::Failed {
            substatus: Some("SLIPPAGE_EXCEEDED".into())
        }
    );
}

#[tokio::test(start_paused = true)]
async fn lookup_errors_do_not_end_tracking() {
    let status = Arc::new(
        MockStatus::new(CallLog::default())
            .then_error(SwapError::Upstream("status 502".into()))
            .then_error(SwapError::Upstream("connection reset".into()))
            .then("DONE", None),
    );
    let mut pending = 0;
    let terminal = tracker(&status, Duration::from_secs(60))
        .track(query())
        .wait_terminal(|_| pending += 1)
        .await;

    assert_eq!(terminal, SettlementStatus::Done);
    assert_eq!(pending, 0);
    assert_eq!(status.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn deadline_yields_unknown() {
    let status = Arc::new(MockStatus::new(CallLog::default()));
    let seen: Vec<_> = tracker(&status, Duration::from_secs(12))
        .track(query())
        .collect()
        .await;

    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], SettlementStatus::Pending { .. }));
    assert!(matches!(seen[1], SettlementStatus::Pending { .. }));
    assert_eq!(seen[2], SettlementStatus::Unknown);
    assert_eq!(status.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_polling() {
    let status = Arc::new(MockStatus::new(CallLog::default()));
    let mut handle = tracker(&status, Duration::from_secs(600)).track(query());

    assert!(matches!(
        handle.next_status().await,
        Some(SettlementStatus::Pending { .. })
    ));
    drop(handle);

    tokio::time::sleep(INTERVAL * 20).await;
    assert_eq!(status.polls(), 1);
}

// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Races between claims, transfers, closes and sync.
//!
//! Each test spawns real tasks on a multi-threaded runtime against one
//! temp database and checks the resulting store, not the interleaving.

use std::collections::HashMap;

use attend_core::{
    AttendError, Attendance, AttendanceFilter, AttendanceStatus, CloseRequest, EventType,
    HistoryAction, TransferRequest,
};
use attend_test_utils::TestHarness;

fn release_to(department_id: &str) -> TransferRequest {
    TransferRequest {
        target_department_id: Some(department_id.to_string()),
        ..TransferRequest::default()
    }
}

/// Exactly one of two racing results is a success; the other is a conflict.
fn single_winner(
    first: Result<Attendance, AttendError>,
    second: Result<Attendance, AttendError>,
) -> Attendance {
    match (first, second) {
        (Ok(won), Err(AttendError::Conflict(_))) | (Err(AttendError::Conflict(_)), Ok(won)) => won,
        (first, second) => panic!("expected one winner and one conflict, got {first:?} / {second:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_one_concurrent_claim_wins() {
    let harness = TestHarness::builder().with_retries(2).build().await.unwrap();
    harness.seed_lead("t1", "l1", "new").await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let engine = harness.engine.clone();
        tasks.push(tokio::spawn(async move {
            let ctx = TestHarness::agent("t1", &format!("u{i}"));
            engine.claim(&ctx, "l1", None, None).await
        }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(attendance) => winners.push(attendance),
            Err(AttendError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 15);

    let admin = TestHarness::admin("t1", "boss");
    let details = harness.engine.get_details(&admin, &winners[0].id).await.unwrap();
    assert_eq!(details.history.len(), 1);
    assert_eq!(harness.events.count_of(EventType::Claimed), 1);
    assert_eq!(harness.events.count_of(EventType::New), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sync_racing_claims_never_duplicates_attendances() {
    let harness = TestHarness::builder()
        .with_retries(2)
        .with_sync_batch_size(4)
        .build()
        .await
        .unwrap();
    for i in 0..20 {
        harness.seed_lead("t1", &format!("l{i:02}"), "new").await.unwrap();
    }

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let engine = harness.engine.clone();
        tasks.push(tokio::spawn(async move {
            engine.sync("t1").await.map(|_| ())
        }));
    }
    for i in 0..20 {
        let engine = harness.engine.clone();
        tasks.push(tokio::spawn(async move {
            let ctx = TestHarness::agent("t1", &format!("u{i}"));
            match engine.claim(&ctx, &format!("l{i:02}"), None, None).await {
                Ok(_) | Err(AttendError::Conflict(_)) => Ok(()),
                Err(e) => Err(e),
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let admin = TestHarness::admin("t1", "boss");
    let all = harness
        .engine
        .list(&admin, &AttendanceFilter::default(), Some(500))
        .await
        .unwrap();
    let mut per_lead: HashMap<String, usize> = HashMap::new();
    for attendance in all.iter().filter(|a| a.status != AttendanceStatus::Closed) {
        *per_lead.entry(attendance.lead_id.clone()).or_default() += 1;
    }
    assert_eq!(per_lead.len(), 20);
    assert!(per_lead.values().all(|&n| n == 1));
    assert!(all.iter().all(|a| a.status == AttendanceStatus::InProgress));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_closes_record_one_history_entry() {
    let harness = TestHarness::builder().with_retries(2).build().await.unwrap();
    harness.seed_lead("t1", "l1", "new").await.unwrap();
    let owner = TestHarness::agent("t1", "u1");
    let claimed = harness.engine.claim(&owner, "l1", None, None).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = harness.engine.clone();
        let owner = owner.clone();
        let id = claimed.id.clone();
        tasks.push(tokio::spawn(async move {
            engine.close(&owner, &id, &CloseRequest::default(), None).await
        }));
    }
    for task in tasks {
        let closed = task.await.unwrap().unwrap();
        assert_eq!(closed.status, AttendanceStatus::Closed);
    }

    let details = harness.engine.get_details(&owner, &claimed.id).await.unwrap();
    assert_eq!(details.history.len(), 2);
    assert_eq!(harness.events.count_of(EventType::Updated), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transfer_racing_close_has_one_winner() {
    let harness = TestHarness::builder().with_retries(2).build().await.unwrap();
    let sales = harness.seed_department("t1", "Sales", &[]).await.unwrap();
    let owner = TestHarness::agent("t1", "u1");

    for round in 0..10 {
        let lead_id = format!("l{round}");
        harness.seed_lead("t1", &lead_id, "new").await.unwrap();
        let claimed = harness.engine.claim(&owner, &lead_id, None, None).await.unwrap();

        let transfer = {
            let engine = harness.engine.clone();
            let owner = owner.clone();
            let id = claimed.id.clone();
            let request = release_to(&sales.id);
            tokio::spawn(async move { engine.transfer(&owner, &id, &request, None).await })
        };
        let close = {
            let engine = harness.engine.clone();
            let owner = owner.clone();
            let id = claimed.id.clone();
            tokio::spawn(async move {
                engine.close(&owner, &id, &CloseRequest::default(), None).await
            })
        };
        let won = single_winner(transfer.await.unwrap(), close.await.unwrap());

        let admin = TestHarness::admin("t1", "boss");
        let details = harness.engine.get_details(&admin, &claimed.id).await.unwrap();
        assert_eq!(details.history.len(), 2, "round {round}");
        assert_eq!(details.attendance.status, won.status);
        assert_eq!(details.attendance.version, won.version);
        let expected = match won.status {
            AttendanceStatus::Open => HistoryAction::Transfer,
            AttendanceStatus::Closed => HistoryAction::Close,
            other => panic!("unexpected winning status {other}"),
        };
        assert_eq!(details.history[1].action, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_transfers_have_one_winner() {
    let harness = TestHarness::builder().with_retries(2).build().await.unwrap();
    let sales = harness.seed_department("t1", "Sales", &[]).await.unwrap();
    let support = harness.seed_department("t1", "Support", &[]).await.unwrap();
    let owner = TestHarness::agent("t1", "u1");

    for round in 0..10 {
        let lead_id = format!("l{round}");
        harness.seed_lead("t1", &lead_id, "new").await.unwrap();
        let claimed = harness.engine.claim(&owner, &lead_id, None, None).await.unwrap();

        let mut tasks = Vec::new();
        for department in [&sales, &support] {
            let engine = harness.engine.clone();
            let owner = owner.clone();
            let id = claimed.id.clone();
            let request = release_to(&department.id);
            tasks.push(tokio::spawn(async move {
                engine.transfer(&owner, &id, &request, None).await
            }));
        }
        let second = tasks.pop().unwrap().await.unwrap();
        let first = tasks.pop().unwrap().await.unwrap();
        let won = single_winner(first, second);

        let admin = TestHarness::admin("t1", "boss");
        let details = harness.engine.get_details(&admin, &claimed.id).await.unwrap();
        assert_eq!(details.history.len(), 2, "round {round}");
        assert_eq!(details.attendance.department_id, won.department_id);
        assert_eq!(
            details.history[1].to_department_id, won.department_id,
            "the recorded transfer is the one that won"
        );
    }
    assert_eq!(harness.events.count_of(EventType::Transferred), 10);
}

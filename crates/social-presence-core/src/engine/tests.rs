use super::*;
use crate::constants::{AWAY_TTL, DEFAULT_SHADOW_GRACE, OFFLINE_TTL};
use crate::storage::testing::RecordingStore;
use proptest::prelude::*;
use tokio::time::advance;

fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}

fn engine() -> (PresenceEngine<RecordingStore>, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::new(DEFAULT_SHADOW_GRACE));
    let engine = PresenceEngine::new(Arc::clone(&store), Duration::from_secs(2));
    (engine, store)
}

const PAST_ONLINE: Duration = Duration::from_secs(31);

#[tokio::test(start_paused = true)]
async fn set_then_get_every_settable_status() {
    let (engine, _) = engine();
    let u = user("user_1");

    for status in Status::SETTABLE {
        engine.set_status(&u, status).await.unwrap();
        let read = engine.get_status(&u).await.unwrap();
        assert_eq!(read.status, status);
        assert!(read.since.is_some());
        assert!(read.transition.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn named_setters_write_their_status() {
    let (engine, _) = engine();
    let u = user("user_1");

    engine.set_away(&u).await.unwrap();
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Away);
    engine.set_offline(&u).await.unwrap();
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Offline);
    engine.set_invisible(&u).await.unwrap();
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Invisible);
    engine.set_dnd(&u).await.unwrap();
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Dnd);
}

#[tokio::test(start_paused = true)]
async fn unknown_cannot_be_set() {
    let (engine, store) = engine();
    let err = engine.set_status(&user("user_1"), Status::Unknown).await.unwrap_err();
    assert!(matches!(err, PresenceError::InvalidStatus(_)));
    assert_eq!(store.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn never_seen_user_is_unknown_without_writes() {
    let (engine, store) = engine();
    let read = engine.get_status(&user("user_ghost")).await.unwrap();
    assert_eq!(read.status, Status::Unknown);
    assert!(read.transition.is_none());
    assert_eq!(store.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn expired_online_becomes_away_and_is_persisted() {
    let (engine, store) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();
    advance(PAST_ONLINE).await;

    let read = engine.get_status(&u).await.unwrap();
    assert_eq!(read.status, Status::Away);
    assert_eq!(
        read.transition,
        Some(AutoTransition { from: Status::Online, to: Status::Away, persist_error: None })
    );
    assert_eq!(store.writes(), 2);

    // The second read sees the persisted away record and writes nothing.
    let again = engine.get_status(&u).await.unwrap();
    assert_eq!(again.status, Status::Away);
    assert!(again.transition.is_none());
    assert_eq!(store.writes(), 2);
}

#[tokio::test(start_paused = true)]
async fn invisible_and_dnd_decay_to_away() {
    let (engine, _) = engine();
    for (id, status) in [("user_inv", Status::Invisible), ("user_dnd", Status::Dnd)] {
        let u = user(id);
        engine.set_status(&u, status).await.unwrap();
        advance(PAST_ONLINE).await;
        let read = engine.get_status(&u).await.unwrap();
        assert_eq!(read.status, Status::Away, "{status} did not decay to away");
        assert_eq!(read.transition.unwrap().from, status);
    }
}

#[tokio::test(start_paused = true)]
async fn expired_away_becomes_offline() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_away(&u).await.unwrap();
    advance(AWAY_TTL + Duration::from_secs(1)).await;

    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Offline);
}

#[tokio::test(start_paused = true)]
async fn expired_offline_becomes_unknown_without_write() {
    let (engine, store) = engine();
    let u = user("user_1");
    engine.set_offline(&u).await.unwrap();
    advance(OFFLINE_TTL + Duration::from_secs(1)).await;

    let read = engine.get_status(&u).await.unwrap();
    assert_eq!(read.status, Status::Unknown);
    assert!(read.transition.is_none());
    assert_eq!(store.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn full_decay_chain_with_a_read_at_each_step() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();

    advance(PAST_ONLINE).await;
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Away);

    advance(AWAY_TTL + Duration::from_secs(1)).await;
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Offline);

    advance(OFFLINE_TTL + Duration::from_secs(1)).await;
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Unknown);
}

#[tokio::test(start_paused = true)]
async fn unobserved_decay_advances_one_step_per_read() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();

    // Nobody reads while online and away would both have expired.
    advance(AWAY_TTL * 2).await;
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Away);
}

#[tokio::test(start_paused = true)]
async fn failed_transition_write_still_returns_derived_status() {
    let (engine, store) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();
    advance(PAST_ONLINE).await;

    store.fail_writes(true);
    let read = engine.get_status(&u).await.unwrap();
    assert_eq!(read.status, Status::Away);
    assert!(!read.is_persisted());
    let transition = read.transition.unwrap();
    assert!(matches!(transition.persist_error, Some(StoreError::Unavailable(_))));

    // Nothing was stored, so the next read derives the same transition.
    store.fail_writes(false);
    let retry = engine.get_status(&u).await.unwrap();
    assert_eq!(retry.status, Status::Away);
    assert!(retry.is_persisted());
    assert!(retry.transition.is_some());
}

#[tokio::test(start_paused = true)]
async fn read_failure_is_store_unavailable() {
    let (engine, store) = engine();
    store.fail_reads(true);
    let err = engine.get_status(&user("user_1")).await.unwrap_err();
    assert!(matches!(err, PresenceError::StoreUnavailable(StoreError::Unavailable(_))));
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn set_failure_is_store_unavailable() {
    let (engine, store) = engine();
    store.fail_writes(true);
    let err = engine.set_status(&user("user_1"), Status::Online).await.unwrap_err();
    assert!(matches!(err, PresenceError::StoreUnavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn stalled_store_times_out() {
    let (engine, store) = engine();
    store.stall(true);
    let err = engine.get_status(&user("user_1")).await.unwrap_err();
    assert!(matches!(err, PresenceError::StoreUnavailable(StoreError::Timeout)));

    let err = engine.ping().await.unwrap_err();
    assert!(matches!(err, PresenceError::StoreUnavailable(StoreError::Timeout)));
}

#[tokio::test(start_paused = true)]
async fn public_status_masks_invisible_only() {
    let (engine, _) = engine();
    let u = user("user_1");

    engine.set_invisible(&u).await.unwrap();
    let public = engine.get_public_status(&u).await.unwrap();
    assert_eq!(public.shown, Status::Offline);
    assert_eq!(public.actual.status, Status::Invisible);

    for status in [Status::Online, Status::Away, Status::Offline, Status::Dnd] {
        engine.set_status(&u, status).await.unwrap();
        assert_eq!(engine.get_public_status(&u).await.unwrap().shown, status);
    }
}

#[tokio::test(start_paused = true)]
async fn heartbeat_promotes_away() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_away(&u).await.unwrap();

    assert_eq!(engine.heartbeat(&u).await.unwrap(), HeartbeatOutcome::Promoted);
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Online);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_refreshes_online() {
    let (engine, store) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();

    advance(Duration::from_secs(20)).await;
    assert_eq!(engine.heartbeat(&u).await.unwrap(), HeartbeatOutcome::Refreshed);
    assert_eq!(store.refreshes(), 1);
    assert_eq!(store.writes(), 1);

    // Past the original deadline, still inside the refreshed one.
    advance(Duration::from_secs(20)).await;
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Online);
}

#[tokio::test(start_paused = true)]
async fn heartbeats_keep_user_online_indefinitely() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();

    for _ in 0..100 {
        advance(Duration::from_secs(25)).await;
        assert_eq!(engine.heartbeat(&u).await.unwrap(), HeartbeatOutcome::Refreshed);
    }
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Online);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_after_online_expiry_goes_through_away() {
    let (engine, store) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();
    advance(PAST_ONLINE).await;

    assert_eq!(engine.heartbeat(&u).await.unwrap(), HeartbeatOutcome::Promoted);
    // set, online -> away, away -> online
    assert_eq!(store.writes(), 3);
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Online);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_ignores_other_statuses() {
    let (engine, store) = engine();

    for status in [Status::Offline, Status::Invisible, Status::Dnd] {
        let u = user(&format!("user_{status}"));
        engine.set_status(&u, status).await.unwrap();
        let writes = store.writes();

        assert_eq!(engine.heartbeat(&u).await.unwrap(), HeartbeatOutcome::Ignored(status));
        assert_eq!(engine.get_status(&u).await.unwrap().status, status);
        assert_eq!(store.writes(), writes);
        assert_eq!(store.refreshes(), 0);
    }

    let ghost = user("user_ghost");
    assert_eq!(
        engine.heartbeat(&ghost).await.unwrap(),
        HeartbeatOutcome::Ignored(Status::Unknown)
    );
    assert_eq!(engine.get_status(&ghost).await.unwrap().status, Status::Unknown);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_surfaces_store_failures() {
    let (engine, store) = engine();
    let u = user("user_1");
    engine.set_away(&u).await.unwrap();

    store.fail_writes(true);
    let err = engine.heartbeat(&u).await.unwrap_err();
    assert!(matches!(err, PresenceError::StoreUnavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn get_multiple_reports_every_user_without_transitions() {
    let (engine, store) = engine();
    let (u1, u2, u3) = (user("user_1"), user("user_2"), user("user_3"));
    engine.set_status(&u1, Status::Dnd).await.unwrap();
    engine.set_status(&u2, Status::Online).await.unwrap();
    advance(PAST_ONLINE).await;
    engine.set_status(&u1, Status::Dnd).await.unwrap();
    let writes = store.writes();

    let statuses = engine
        .get_multiple(&[u1.clone(), u2.clone(), u3.clone()])
        .await
        .unwrap();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[&u1], Status::Dnd);
    assert_eq!(statuses[&u2], Status::Unknown);
    assert_eq!(statuses[&u3], Status::Unknown);
    assert_eq!(store.writes(), writes);
    assert_eq!(store.batch_reads(), 1);

    // A single read still performs the transition the batch skipped.
    assert_eq!(engine.get_status(&u2).await.unwrap().status, Status::Away);
}

#[tokio::test(start_paused = true)]
async fn get_multiple_does_not_mask_invisible() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_invisible(&u).await.unwrap();
    let statuses = engine.get_multiple(&[u.clone()]).await.unwrap();
    assert_eq!(statuses[&u], Status::Invisible);
}

#[tokio::test(start_paused = true)]
async fn get_multiple_empty_skips_the_store() {
    let (engine, store) = engine();
    assert!(engine.get_multiple(&[]).await.unwrap().is_empty());
    assert_eq!(store.batch_reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn get_multiple_collapses_duplicates() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_away(&u).await.unwrap();
    let statuses = engine.get_multiple(&[u.clone(), u.clone()]).await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[&u], Status::Away);
}

#[tokio::test(start_paused = true)]
async fn concurrent_reads_agree_on_the_transition() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();
    advance(PAST_ONLINE).await;

    let (a, b) = tokio::join!(engine.get_status(&u), engine.get_status(&u));
    assert_eq!(a.unwrap().status, Status::Away);
    assert_eq!(b.unwrap().status, Status::Away);
    assert_eq!(engine.get_status(&u).await.unwrap().status, Status::Away);
}

#[tokio::test(start_paused = true)]
async fn explicit_set_overrides_pending_decay() {
    let (engine, _) = engine();
    let u = user("user_1");
    engine.set_status(&u, Status::Online).await.unwrap();
    advance(PAST_ONLINE).await;

    engine.set_offline(&u).await.unwrap();
    let read = engine.get_status(&u).await.unwrap();
    assert_eq!(read.status, Status::Offline);
    assert!(read.transition.is_none());
}

fn settable_status() -> impl Strategy<Value = Status> {
    proptest::sample::select(Status::SETTABLE.to_vec())
}

proptest! {
    #[test]
    fn last_write_wins(statuses in proptest::collection::vec(settable_status(), 1..8)) {
        let (engine, _) = engine();
        let u = user("user_prop");
        let last = *statuses.last().unwrap();

        let read = tokio_test::block_on(async {
            for status in &statuses {
                engine.set_status(&u, *status).await.unwrap();
            }
            engine.get_status(&u).await.unwrap()
        });
        prop_assert_eq!(read.status, last);
    }
}

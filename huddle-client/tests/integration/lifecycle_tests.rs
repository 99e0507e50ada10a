use huddle_client::{CallError, CallEvent, EndReason, ErrorKind, LinkPhase};
use huddle_core::{EnvelopeKind, PeerId, RoomId, SignalingEnvelope};
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{Harness, TransportCall, join, peer};

fn room(id: &str) -> RoomId {
    RoomId::from(id)
}

#[tokio::test]
async fn test_join_acquires_media_and_announces_call() {
    init_tracing();
    let h = Harness::joined("r1", "a").await;

    assert!(h.manager.is_active());
    assert_eq!(h.manager.room_id(), Some(&room("r1")));
    assert_eq!(h.media.acquired(), 1);
    assert_eq!(h.relay.connect_count(), 1);
    assert_eq!(h.chat.messages(), vec!["r1: a started".to_string()]);

    let snapshot = h.snapshot().await;
    assert_eq!(snapshot.local_peer_id, peer("a"));
    assert!(snapshot.holds_local_stream);
    assert!(snapshot.peers.is_empty());
}

#[tokio::test]
async fn test_media_unavailable_leaves_manager_usable() {
    init_tracing();
    let mut h = Harness::new();
    h.media.set_deny(true);

    let err = h
        .manager
        .join(room("r1"), peer("a"))
        .await
        .expect_err("join must fail without media");
    assert_eq!(err.kind(), ErrorKind::MediaUnavailable);
    assert!(err.is_retryable());
    assert!(!h.manager.is_active());
    assert_eq!(h.relay.connect_count(), 0);
    assert!(h.events.drain().contains(&CallEvent::Error(err)));

    h.media.set_deny(false);
    h.manager
        .join(room("r1"), peer("a"))
        .await
        .expect("retry succeeds");
    assert!(h.manager.is_active());
}

#[tokio::test]
async fn test_relay_unreachable_releases_media() {
    init_tracing();
    let mut h = Harness::new();
    h.relay.set_refuse_connections(true);

    let err = h
        .manager
        .join(room("r1"), peer("a"))
        .await
        .expect_err("join must fail without relay");
    assert_eq!(err.kind(), ErrorKind::RelayUnreachable);
    assert_eq!(h.media.acquired(), 1);
    assert_eq!(h.media.released(), 1);
    assert!(!h.manager.is_active());
    assert!(h.chat.messages().is_empty());
}

#[tokio::test]
async fn test_join_same_room_is_noop_and_other_room_is_rejected() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;

    h.manager
        .join(room("r1"), peer("a"))
        .await
        .expect("rejoining the same room is a no-op");
    assert_eq!(h.media.acquired(), 1);

    let err = h
        .manager
        .join(room("r2"), peer("a"))
        .await
        .expect_err("second room needs leave first");
    assert_eq!(err, CallError::AlreadyJoined(room("r1")));
    assert_eq!(h.manager.room_id(), Some(&room("r1")));

    h.manager.leave().await;
    h.manager
        .join(room("r2"), peer("a"))
        .await
        .expect("join after leave");
    assert_eq!(h.manager.room_id(), Some(&room("r2")));
}

#[tokio::test]
async fn test_leave_is_idempotent() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;

    h.manager.leave().await;
    h.manager.leave().await;

    assert!(!h.manager.is_active());
    assert!(h.manager.snapshot().await.is_none());
    assert_eq!(h.media.released(), 1);
    assert_eq!(h.relay.sent_of(EnvelopeKind::Leave).await.len(), 1);
    assert_eq!(h.relay.close_count(), 1);
    assert_eq!(
        h.chat.messages(),
        vec!["r1: a started".to_string(), "r1: a ended".to_string()]
    );

    h.events.drain();
    let ended = h
        .events
        .count(|e| matches!(e, CallEvent::SessionEnded { .. }));
    assert_eq!(ended, 1);
}

#[tokio::test]
async fn test_leave_without_join_is_noop() {
    init_tracing();
    let mut h = Harness::new();

    h.manager.leave().await;

    assert!(!h.manager.is_active());
    assert!(h.events.drain().is_empty());
}

#[tokio::test]
async fn test_leave_sends_leave_envelope() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;

    h.manager.leave().await;

    assert_eq!(
        h.relay.sent().await,
        vec![SignalingEnvelope::leave(peer("a"))]
    );
}

#[tokio::test]
async fn test_leave_during_negotiation_closes_links_and_releases_stream_once() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;

    h.relay.deliver(join("c")).await;
    let snapshot = h.snapshot().await;
    assert_eq!(snapshot.peer(&peer("c")).unwrap().phase, LinkPhase::Negotiating);

    // b's offer never completes, so its negotiation is in flight at leave.
    h.connector.behavior().hang_offers.store(true, Ordering::SeqCst);
    h.relay.deliver(join("b")).await;
    let b = h
        .connector
        .wait_for_link("b", 2000)
        .await
        .expect("transport for b");
    assert!(b.wait_for_call(&TransportCall::CreateOffer, 2000).await);

    h.manager.leave().await;

    assert_eq!(
        b.calls().await,
        vec![TransportCall::CreateOffer, TransportCall::Close]
    );
    let c = h.connector.latest("c").await.unwrap();
    assert_eq!(c.calls().await.last(), Some(&TransportCall::Close));
    assert_eq!(h.media.released(), 1);
    assert!(h.manager.snapshot().await.is_none());

    // The in-flight offer never reached the relay.
    let offers: Vec<Option<PeerId>> = h
        .relay
        .sent_of(EnvelopeKind::Offer)
        .await
        .into_iter()
        .map(|e| e.to)
        .collect();
    assert_eq!(offers, vec![Some(peer("c"))]);

    h.events.drain();
    assert!(h.events.seen().contains(&CallEvent::SessionEnded {
        room_id: room("r1"),
        reason: EndReason::Left,
    }));
}

#[tokio::test]
async fn test_leave_during_failure_close_still_closes_transport() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;

    h.relay.deliver(join("b")).await;
    h.snapshot().await;
    let b = h.connector.latest("b").await.expect("transport for b");

    // b's close is still in progress when leave() lands.
    h.connector.behavior().hold_closes.store(true, Ordering::SeqCst);
    b.signal_failed("ICE connectivity failed").await;
    assert!(h.connector.wait_for_closes_started(1, 2000).await);

    let connector = h.connector.clone();
    let release = async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        connector.behavior().hold_closes.store(false, Ordering::SeqCst);
    };
    tokio::join!(h.manager.leave(), release);

    assert_eq!(b.calls().await.last(), Some(&TransportCall::Close));
    assert_eq!(h.media.released(), 1);

    let events = h.events.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        CallEvent::ConnectionFailed { peer_id, error }
            if *peer_id == peer("b") && error.kind() == ErrorKind::NegotiationFailed
    )));
    assert!(matches!(
        events.last(),
        Some(CallEvent::SessionEnded { reason: EndReason::Left, .. })
    ));
}

#[tokio::test]
async fn test_undeliverable_leave_does_not_block_teardown() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;
    h.relay.set_fail_sends(true);

    h.manager.leave().await;

    assert!(!h.manager.is_active());
    assert_eq!(h.media.released(), 1);
    assert_eq!(h.relay.close_count(), 1);
}

#[tokio::test]
async fn test_relay_loss_ends_session() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;

    h.relay.deliver(join("b")).await;
    h.snapshot().await;
    h.relay.disconnect().await;

    let ended = h
        .events
        .wait_for(2000, |e| matches!(e, CallEvent::SessionEnded { .. }))
        .await;
    assert_eq!(
        ended,
        Some(CallEvent::SessionEnded {
            room_id: room("r1"),
            reason: EndReason::RelayLost,
        })
    );
    assert_eq!(h.media.released(), 1);
    assert_eq!(
        h.connector.latest("b").await.unwrap().calls().await.last(),
        Some(&TransportCall::Close)
    );
    // No LEAVE over a relay that is already gone.
    assert!(h.relay.sent_of(EnvelopeKind::Leave).await.is_empty());

    assert!(!h.manager.is_active());
    h.manager
        .join(room("r1"), peer("a"))
        .await
        .expect("rejoin after relay loss");
    assert_eq!(h.media.acquired(), 2);
}

#[tokio::test]
async fn test_send_failure_stops_new_negotiation() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;

    h.relay.deliver(join("b")).await;
    h.snapshot().await;
    h.relay.set_fail_sends(true);

    h.relay.deliver(join("c")).await;
    let snapshot = h.snapshot().await;
    assert!(snapshot.relay_degraded);
    assert!(snapshot.peer(&peer("b")).is_some());
    assert!(snapshot.peer(&peer("c")).is_some());

    h.relay.deliver(join("d")).await;
    let snapshot = h.snapshot().await;
    assert!(snapshot.peer(&peer("d")).is_none());
    assert!(h.connector.latest("d").await.is_none());

    let events = h.events.drain();
    let relay_errors = events
        .iter()
        .filter(|e| matches!(e, CallEvent::Error(e) if e.kind() == ErrorKind::RelayUnreachable))
        .count();
    assert_eq!(relay_errors, 1);
    assert!(events.contains(&CallEvent::PeerJoined(peer("d"))));
}

#[tokio::test]
async fn test_dropping_manager_ends_session() {
    init_tracing();
    let mut h = Harness::joined("r1", "a").await;

    drop(h.manager);

    let ended = h
        .events
        .wait_for(2000, |e| matches!(e, CallEvent::SessionEnded { .. }))
        .await;
    assert!(ended.is_some());
    assert_eq!(h.media.released(), 1);
}

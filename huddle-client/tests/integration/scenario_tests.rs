use huddle_client::{CallEvent, LinkPhase, NegotiationRole, RelayConnector};
use huddle_core::{PeerId, RoomId, SdpType};
use huddle_relay::RelayHub;
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{HubRelayConnector, Participant, TransportCall, peer};

fn hub_relay(hub: &RelayHub) -> Arc<dyn RelayConnector> {
    Arc::new(HubRelayConnector::new(hub.clone()))
}

#[tokio::test]
async fn test_second_joiner_is_offered_and_answers() {
    init_tracing();
    let hub = RelayHub::new();
    let a = Participant::join(hub_relay(&hub), "r1", "a").await;
    let b = Participant::join(hub_relay(&hub), "r1", "b").await;

    let a_view = a.wait_negotiated("b", 2000).await.expect("a applied b's answer");
    let b_view = b.wait_negotiated("a", 2000).await.expect("b applied a's offer");

    let a_link = a_view.peer(&peer("b")).unwrap();
    assert_eq!(a_link.role, NegotiationRole::Offerer);
    assert_eq!(a_link.phase, LinkPhase::Negotiating);
    let b_link = b_view.peer(&peer("a")).unwrap();
    assert_eq!(b_link.role, NegotiationRole::Answerer);
    assert_eq!(b_link.phase, LinkPhase::Negotiating);

    assert_eq!(
        a.connector.latest("b").await.unwrap().calls().await,
        vec![
            TransportCall::CreateOffer,
            TransportCall::SetRemoteDescription(SdpType::Answer),
        ]
    );
    assert_eq!(
        b.connector.latest("a").await.unwrap().calls().await,
        vec![
            TransportCall::SetRemoteDescription(SdpType::Offer),
            TransportCall::CreateAnswer,
        ]
    );
}

#[tokio::test]
async fn test_trickled_candidates_reach_remote_transport() {
    init_tracing();
    let hub = RelayHub::new();
    let a = Participant::join(hub_relay(&hub), "r1", "a").await;
    let b = Participant::join(hub_relay(&hub), "r1", "b").await;
    a.wait_negotiated("b", 2000).await.expect("negotiated");
    b.wait_negotiated("a", 2000).await.expect("negotiated");

    a.connector
        .latest("b")
        .await
        .unwrap()
        .gather_candidate("candidate:a-1")
        .await;

    let b_side = b.connector.latest("a").await.unwrap();
    assert!(
        b_side
            .wait_for_call(&TransportCall::AddIceCandidate("candidate:a-1".into()), 2000)
            .await
    );
}

#[tokio::test]
async fn test_departure_closes_remote_link() {
    init_tracing();
    let hub = RelayHub::new();
    let mut a = Participant::join(hub_relay(&hub), "r1", "a").await;
    let mut b = Participant::join(hub_relay(&hub), "r1", "b").await;
    a.wait_negotiated("b", 2000).await.expect("negotiated");

    b.manager.leave().await;

    let left = a
        .events
        .wait_for(2000, |e| matches!(e, CallEvent::PeerLeft(_)))
        .await;
    assert_eq!(left, Some(CallEvent::PeerLeft(peer("b"))));
    assert!(a.manager.snapshot().await.unwrap().peers.is_empty());
    assert_eq!(
        a.connector.latest("b").await.unwrap().calls().await.last(),
        Some(&TransportCall::Close)
    );
    assert_eq!(hub.members(&RoomId::from("r1")), vec![peer("a")]);
    assert_eq!(b.media.released(), 1);

    a.events.drain();
    assert_eq!(a.events.count(|e| matches!(e, CallEvent::PeerLeft(_))), 1);
}

#[tokio::test]
async fn test_third_joiner_gets_one_link_per_member() {
    init_tracing();
    let hub = RelayHub::new();
    let a = Participant::join(hub_relay(&hub), "r1", "a").await;
    let b = Participant::join(hub_relay(&hub), "r1", "b").await;
    a.wait_negotiated("b", 2000).await.expect("negotiated");

    let c = Participant::join(hub_relay(&hub), "r1", "c").await;
    a.wait_negotiated("c", 2000).await.expect("a offered c");
    b.wait_negotiated("c", 2000).await.expect("b offered c");
    let c_view = c.wait_negotiated("b", 2000).await.expect("c answered");

    let roles: Vec<(PeerId, NegotiationRole)> = c_view
        .peers
        .iter()
        .map(|p| (p.peer_id.clone(), p.role))
        .collect();
    assert_eq!(
        roles,
        vec![
            (peer("a"), NegotiationRole::Answerer),
            (peer("b"), NegotiationRole::Answerer),
        ]
    );
}

#[tokio::test]
async fn test_rooms_do_not_cross_talk() {
    init_tracing();
    let hub = RelayHub::new();
    let a = Participant::join(hub_relay(&hub), "r1", "a").await;
    let b = Participant::join(hub_relay(&hub), "r2", "b").await;

    assert!(a.manager.snapshot().await.unwrap().peers.is_empty());
    assert!(b.manager.snapshot().await.unwrap().peers.is_empty());
    assert_eq!(a.connector.link_count().await, 0);
    assert_eq!(b.connector.link_count().await, 0);
    assert_eq!(hub.room_count(), 2);
}

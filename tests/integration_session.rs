//! Integration tests for the session controller
//!
//! These tests drive a `ChatSession` against the scripted transport:
//! connection lifecycle, outbound wire shape, routed frame stream,
//! reconnection, cancellation, and retry exhaustion.

mod common;

use chatwire::{
    endpoint_with_identity, ChatWireError, ExponentialBackoff, FixedDelay, NeverReconnect,
    ChatSession, ReconnectPolicy, SessionEvent, SessionState,
};
use common::{drain_events, init_logging, poll_until, wait_for_event, ScriptedTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
const SETTLE: Duration = Duration::from_millis(300);

async fn session_with(
    transport: ScriptedTransport,
    policy: impl ReconnectPolicy + 'static,
) -> ChatSession {
    init_logging();
    chatwire::builder()
        .endpoint(endpoint_with_identity("ws://localhost:9/ws", "alice"))
        .identity("alice")
        .reconnect_policy(policy)
        .transport(transport)
        .build()
        .await
        .expect("session builds")
}

fn is_chat(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Chat(_))
}

#[test]
fn test_endpoint_with_identity() {
    assert_eq!(
        endpoint_with_identity("ws://localhost:8080/ws", "alice"),
        "ws://localhost:8080/ws?username=alice"
    );
    assert_eq!(
        endpoint_with_identity("ws://localhost:8080/ws?room=1", "bob"),
        "ws://localhost:8080/ws?room=1&username=bob"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_session_lifecycle() {
    let transport = ScriptedTransport::new();
    let link = transport.push_link();
    let session = session_with(transport.clone(), NeverReconnect).await;
    let events = session.event_receiver();

    // Nothing is live yet
    assert_eq!(session.session_state(), SessionState::Idle);
    assert!(!session.is_connected());
    assert!(matches!(
        session.send_chat("too early"),
        Err(ChatWireError::NotConnected(_))
    ));

    session.connect().expect("connect command");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Connected
    ))
    .is_some());
    assert!(session.is_connected());
    assert_eq!(session.session_state(), SessionState::Open);

    // Outbound: local event materialized, id stripped from the wire
    let local = session.send_chat("hello").expect("send while open");
    assert_eq!(local.author, "alice");
    assert_eq!(local.body, "hello");
    assert!(!local.id.is_empty());

    assert!(poll_until(EVENT_TIMEOUT, || link.sent_payloads().len() == 1));
    let wire: serde_json::Value =
        serde_json::from_str(&link.sent_payloads()[0]).expect("outbound frame is JSON");
    assert_eq!(wire["username"], "alice");
    assert_eq!(wire["text"], "hello");
    assert!(wire["timestamp"].is_i64());
    assert!(
        wire.get("id").is_none(),
        "local identifier must not go on the wire"
    );

    // Inbound chat from someone else routes through
    link.inject(r#"{"type":"message","username":"bob","text":"yo","timestamp":1000}"#);
    match wait_for_event(&events, EVENT_TIMEOUT, is_chat) {
        Some(SessionEvent::Chat(event)) => {
            assert_eq!(event.author, "bob");
            assert_eq!(event.body, "yo");
            assert_eq!(event.timestamp, 1000);
            assert!(!event.id.is_empty());
        }
        other => panic!("expected chat event, got {:?}", other),
    }

    // Our own echo is suppressed: the next chat event to arrive is the
    // system marker injected after it, not the echo
    link.inject(r#"{"type":"message","username":"alice","text":"hello","timestamp":2000}"#);
    link.inject(r#"{"type":"system","username":"System","text":"marker","timestamp":2001}"#);
    match wait_for_event(&events, EVENT_TIMEOUT, is_chat) {
        Some(SessionEvent::Chat(event)) => {
            assert_eq!(event.author, "System", "echo must not be routed");
            assert!(event.system);
        }
        other => panic!("expected system marker, got {:?}", other),
    }

    // Presence snapshots replace wholesale; empty clears
    link.inject(r#"{"type":"users","users":["alice","bob"]}"#);
    match wait_for_event(&events, EVENT_TIMEOUT, |e| {
        matches!(e, SessionEvent::Presence(_))
    }) {
        Some(SessionEvent::Presence(users)) => assert_eq!(users, vec!["alice", "bob"]),
        other => panic!("expected presence, got {:?}", other),
    }
    link.inject(r#"{"type":"users","users":[]}"#);
    match wait_for_event(&events, EVENT_TIMEOUT, |e| {
        matches!(e, SessionEvent::Presence(_))
    }) {
        Some(SessionEvent::Presence(users)) => assert!(users.is_empty()),
        other => panic!("expected empty presence, got {:?}", other),
    }

    // Malformed frames are dropped without touching session state
    link.inject("garbage");
    link.inject(r#"{"type":"bogus"}"#);
    assert!(poll_until(EVENT_TIMEOUT, || {
        session.metrics().frames_rejected == 2
    }));
    assert_eq!(session.session_state(), SessionState::Open);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        drain_events(&events).is_empty(),
        "rejected frames emit no events"
    );

    // Explicit disconnect: down, and stays down
    session.disconnect().expect("disconnect command");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Disconnected
    ))
    .is_some());
    assert!(poll_until(EVENT_TIMEOUT, || {
        session.session_state() == SessionState::Idle
    }));
    assert!(link.was_closed());

    tokio::time::sleep(SETTLE).await;
    assert_eq!(
        transport.connect_count(),
        1,
        "explicit disconnect never reconnects"
    );

    let metrics = session.metrics();
    assert_eq!(metrics.messages_sent, 1);
    assert_eq!(metrics.messages_received, 7);

    session.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reconnects_after_unexpected_close() {
    let transport = ScriptedTransport::new();
    let first = transport.push_link();
    let second = transport.push_link();
    let session = session_with(
        transport.clone(),
        FixedDelay::new(Duration::from_millis(100), Some(5)),
    )
    .await;
    let events = session.event_receiver();

    session.connect().expect("connect command");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Connected
    ))
    .is_some());

    // A transport error alone does not change state; the close event
    // that follows is authoritative
    first.inject_error("connection reset by peer");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Error(_)
    ))
    .is_some());
    assert_eq!(session.session_state(), SessionState::Open);

    // Server drops us
    first.close(1006, "abnormal closure");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Disconnected
    ))
    .is_some());
    match wait_for_event(&events, EVENT_TIMEOUT, |e| {
        matches!(e, SessionEvent::Reconnecting(_))
    }) {
        Some(SessionEvent::Reconnecting(attempt)) => assert_eq!(attempt, 1),
        other => panic!("expected reconnecting, got {:?}", other),
    }
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Connected
    ))
    .is_some());

    assert_eq!(transport.connect_count(), 2);
    assert_eq!(session.metrics().reconnect_count, 1);
    assert_eq!(session.session_state(), SessionState::Open);

    // The fresh link is live
    second.inject(r#"{"type":"message","username":"bob","text":"back","timestamp":1}"#);
    assert!(wait_for_event(&events, EVENT_TIMEOUT, is_chat).is_some());

    session.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_connect_is_reentrant_noop() {
    let transport = ScriptedTransport::new();
    let _link = transport.push_link();
    let session = session_with(transport.clone(), NeverReconnect).await;
    let events = session.event_receiver();

    // Double connect before and after the open transition
    session.connect().expect("first connect");
    session.connect().expect("second connect is a no-op");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Connected
    ))
    .is_some());
    session.connect().expect("connect while open is a no-op");

    tokio::time::sleep(SETTLE).await;
    assert_eq!(
        transport.connect_count(),
        1,
        "at most one live connection per controller"
    );

    session.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exhaustion_fires_once_then_explicit_connect_resets() {
    // No scripts queued: every attempt is refused
    let transport = ScriptedTransport::new();
    let session = session_with(
        transport.clone(),
        ExponentialBackoff::new(Duration::from_millis(50), 2),
    )
    .await;
    let events = session.event_receiver();

    session.connect().expect("connect command");
    assert!(wait_for_event(&events, Duration::from_secs(3), |e| matches!(
        e,
        SessionEvent::ReconnectExhausted
    ))
    .is_some());

    // Initial attempt plus two retries
    assert_eq!(transport.connect_count(), 3);
    assert!(poll_until(EVENT_TIMEOUT, || {
        session.session_state() == SessionState::Closed
    }));

    // Terminal: no further attempts, no second exhausted signal
    tokio::time::sleep(SETTLE).await;
    assert_eq!(transport.connect_count(), 3);
    assert!(!drain_events(&events)
        .iter()
        .any(|e| matches!(e, SessionEvent::ReconnectExhausted)));

    // An explicit connect resets the counter and tries again
    let _link = transport.push_link();
    session.connect().expect("reconnect after exhaustion");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Connected
    ))
    .is_some());
    assert_eq!(transport.connect_count(), 4);
    assert!(session.is_connected());

    session.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disconnect_cancels_pending_reconnect() {
    let transport = ScriptedTransport::new();
    let link = transport.push_link();
    let session = session_with(
        transport.clone(),
        FixedDelay::new(Duration::from_millis(500), Some(5)),
    )
    .await;
    let events = session.event_receiver();

    session.connect().expect("connect command");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Connected
    ))
    .is_some());

    // Unexpected loss schedules a retry 500ms out; cancel it first
    link.close(1006, "abnormal closure");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Disconnected
    ))
    .is_some());
    session.disconnect().expect("disconnect during backoff");

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(
        transport.connect_count(),
        1,
        "cancelled timer must not fire a reconnect"
    );
    assert_eq!(session.session_state(), SessionState::Idle);

    session.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_shutdown_flag_stops_controller() {
    init_logging();
    let transport = ScriptedTransport::new();
    let _link = transport.push_link();
    let flag = Arc::new(AtomicBool::new(true));

    let session = chatwire::builder()
        .endpoint("ws://localhost:9/ws?username=alice")
        .identity("alice")
        .reconnect_policy(NeverReconnect)
        .transport(transport.clone())
        .shutdown_flag(Arc::clone(&flag))
        .build()
        .await
        .expect("session builds");
    let events = session.event_receiver();

    session.connect().expect("connect command");
    assert!(wait_for_event(&events, EVENT_TIMEOUT, |e| matches!(
        e,
        SessionEvent::Connected
    ))
    .is_some());

    flag.store(false, Ordering::Release);
    assert!(poll_until(EVENT_TIMEOUT, || {
        session.session_state() == SessionState::Idle
    }));

    session.shutdown().await.expect("shutdown");
}

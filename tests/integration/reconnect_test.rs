//! Integration tests for reconnect, resync, and the polling fallback.

mod helpers;

use serde_json::json;

use notifyhub_realtime::ConnectionState;

#[tokio::test]
async fn test_drop_reconnects_and_resync_keeps_one_copy() {
    let backend = helpers::Backend::spawn().await;
    let hub = helpers::Hub::spawn().await;
    backend.set_rows(vec![helpers::row(41, 1, true)]);

    let session = helpers::session(&helpers::config(&backend, &hub));
    session.start().await;
    assert!(helpers::wait_until(|| hub.handshakes() == 1).await);

    hub.push_notification(json!({"id": 42, "title": "Pushed", "createdDate": "2024-05-01T10:02:00Z"}));
    assert!(helpers::wait_until(|| session.store.get(42).is_some()).await);

    let mut rows = vec![helpers::row(41, 1, true), helpers::row(42, 2, true)];
    rows[1]["title"] = json!("Pushed");
    backend.set_rows(rows);
    let calls = backend.history_calls();

    hub.drop_all();
    assert!(helpers::wait_until(|| hub.handshakes() == 2).await);
    assert!(
        helpers::wait_until(|| {
            session.connection_state() == ConnectionState::Connected
                && backend.history_calls() > calls
        })
        .await
    );
    assert!(helpers::wait_until(|| session.store.get(42).is_some_and(|n| n.is_read())).await);

    let ids: Vec<i64> = session.store.notifications().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![42, 41]);
    assert_eq!(session.store.unread_count(), 0);
    assert!(session.metrics.snapshot().reconnects >= 1);

    session.dispose();
}

#[tokio::test]
async fn test_hub_down_polls_until_it_returns() {
    let backend = helpers::Backend::spawn().await;
    let hub = helpers::Hub::spawn().await;
    hub.set_accepting(false);
    backend.set_rows(vec![helpers::row(1, 1, false)]);

    let session = helpers::session(&helpers::config(&backend, &hub));
    session.start().await;
    assert_ne!(session.connection_state(), ConnectionState::Connected);
    assert!(session.polling.is_active());
    assert_eq!(session.store.notifications().len(), 1);

    backend.set_rows(vec![helpers::row(1, 1, false), helpers::row(9, 9, false)]);
    assert!(helpers::wait_until(|| session.store.get(9).is_some()).await);
    assert_eq!(session.store.notifications()[0].id, 9);

    hub.set_accepting(true);
    assert!(
        helpers::wait_until(|| session.connection_state() == ConnectionState::Connected).await
    );
    assert!(!session.polling.is_active());

    session.dispose();
}

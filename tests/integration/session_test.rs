//! Integration tests for a connected notification session.

mod helpers;

use serde_json::json;

use notifyhub_realtime::ConnectionState;

#[tokio::test]
async fn test_start_loads_history_and_receives_pushes() {
    let backend = helpers::Backend::spawn().await;
    let hub = helpers::Hub::spawn().await;
    backend.set_rows(vec![helpers::row(1, 1, false), helpers::row(2, 2, true)]);

    let session = helpers::session(&helpers::config(&backend, &hub));
    session.start().await;

    assert_eq!(session.connection_state(), ConnectionState::Connected);
    assert!(!session.polling.is_active());
    let ids: Vec<i64> = session.store.notifications().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(session.store.unread_count(), 1);

    assert!(helpers::wait_until(|| hub.handshakes() == 1).await);
    hub.push_notification(json!({
        "id": 3,
        "title": "Order approved",
        "type": 2,
        "severity": 1,
        "isRead": false,
        "createdDate": "2024-05-01T10:03:00Z"
    }));
    assert!(helpers::wait_until(|| session.store.get(3).is_some()).await);
    assert_eq!(session.store.notifications()[0].id, 3);
    assert_eq!(session.store.unread_count(), 2);

    hub.invoke("UnreadCountUpdated", json!(5));
    assert!(helpers::wait_until(|| session.store.unread_count() == 5).await);

    session.dispose();
}

#[tokio::test]
async fn test_mark_as_read_reaches_backend() {
    let backend = helpers::Backend::spawn().await;
    let hub = helpers::Hub::spawn().await;
    backend.set_rows(vec![helpers::row(1, 1, false), helpers::row(2, 2, false)]);

    let session = helpers::session(&helpers::config(&backend, &hub));
    session.start().await;
    assert_eq!(session.store.unread_count(), 2);

    session.mark_as_read(1).await.expect("mark as read");
    assert_eq!(backend.marked(), vec![1]);
    assert!(session.store.get(1).is_some_and(|n| n.is_read()));
    assert_eq!(session.store.unread_count(), 1);

    session.mark_all_as_read().await.expect("mark all");
    assert_eq!(backend.mark_all_calls(), 1);
    assert_eq!(session.store.unread_count(), 0);

    session.mark_all_as_read().await.expect("noop");
    assert_eq!(backend.mark_all_calls(), 1);

    session.dispose();
}

#[tokio::test]
async fn test_fetch_next_page_walks_history() {
    let backend = helpers::Backend::spawn().await;
    let hub = helpers::Hub::spawn().await;
    backend.set_rows((1..=5).map(|id| helpers::row(id, id as u32, true)).collect());

    let mut config = helpers::config(&backend, &hub);
    config.history.page_size = 2;
    let session = helpers::session(&config);
    session.start().await;
    assert_eq!(session.store.notifications().len(), 2);

    assert_eq!(session.fetch_next_page().await, 2);
    assert_eq!(session.fetch_next_page().await, 1);
    assert_eq!(session.fetch_next_page().await, 0);

    let ids: Vec<i64> = session.store.notifications().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    assert!(!session.store.cursor().has_next_page);

    session.dispose();
}

#[tokio::test]
async fn test_dispose_clears_state_and_disconnects() {
    let backend = helpers::Backend::spawn().await;
    let hub = helpers::Hub::spawn().await;
    backend.set_rows(vec![helpers::row(1, 1, false)]);

    let session = helpers::session(&helpers::config(&backend, &hub));
    session.start().await;
    session.dispose();

    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert!(session.store.notifications().is_empty());
    assert_eq!(session.store.unread_count(), 0);
    assert!(!session.polling.is_active());
}

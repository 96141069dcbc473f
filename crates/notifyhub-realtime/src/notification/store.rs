//! Notification store: the single source of truth for UI consumers.
//!
//! Holds the ordered notification list, the recently pushed ("live") items,
//! the unread count, the push connection state and the history cursor.
//! Every mutation goes through [`NotificationStore::mutate`], which keeps
//! the list sorted and de-duplicated and publishes a fresh
//! [`StoreSnapshot`] to subscribers.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, trace};

use notifyhub_core::types::Page;

use crate::connection::state::ConnectionState;

use super::merge::{self, MergePolicy, Provenance};
use super::model::{Notification, NotificationId, ReadState};

/// Where the history pagination stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    /// Last page loaded (0 before the first load).
    pub page_number: u64,
    /// Total pages reported by the backend.
    pub total_pages: u64,
    /// Total rows reported by the backend.
    pub total_count: u64,
    /// Whether "load older" can fetch more.
    pub has_next_page: bool,
}

impl<T> From<&Page<T>> for PageCursor {
    fn from(page: &Page<T>) -> Self {
        Self {
            page_number: page.page_number,
            total_pages: page.total_pages,
            total_count: page.total_count,
            has_next_page: page.has_next_page,
        }
    }
}

/// Read-only view published after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    /// Notifications, newest first.
    pub notifications: Vec<Notification>,
    /// Known unread count.
    pub unread_count: u64,
    /// Push connection state.
    pub connection_state: ConnectionState,
    /// History cursor.
    pub cursor: PageCursor,
}

/// Outcome of a local mark-as-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTransition {
    /// Was unread, now read; the unread count went down by one.
    Marked,
    /// Was already read; nothing changed.
    AlreadyRead,
    /// No such id in the store.
    Unknown,
}

#[derive(Debug, Default)]
struct StoreState {
    notifications: Vec<Notification>,
    live: Vec<Notification>,
    unread_count: u64,
    connection_state: ConnectionState,
    cursor: PageCursor,
}

impl StoreState {
    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            notifications: self.notifications.clone(),
            unread_count: self.unread_count,
            connection_state: self.connection_state,
            cursor: self.cursor,
        }
    }

    fn find(&self, id: NotificationId) -> Option<&Notification> {
        self.notifications
            .iter()
            .chain(self.live.iter())
            .find(|n| n.id == id)
    }
}

/// Process-wide notification state, owned by one session.
#[derive(Debug)]
pub struct NotificationStore {
    state: Mutex<StoreState>,
    max_live: usize,
    snapshots: watch::Sender<StoreSnapshot>,
}

impl NotificationStore {
    /// Create an empty store tracking at most `max_live` pushed items for
    /// the live view.
    pub fn new(max_live: usize) -> Self {
        let (snapshots, _) = watch::channel(StoreSnapshot::default());
        Self {
            state: Mutex::new(StoreState::default()),
            max_live: max_live.max(1),
            snapshots,
        }
    }

    /// Subscribe to snapshots. The receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshots.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.read(StoreState::snapshot)
    }

    /// Notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.read(|s| s.notifications.clone())
    }

    /// Look one notification up by id.
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.read(|s| s.find(id).cloned())
    }

    /// Known unread count.
    pub fn unread_count(&self) -> u64 {
        self.read(|s| s.unread_count)
    }

    /// Push connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.read(|s| s.connection_state)
    }

    /// History cursor.
    pub fn cursor(&self) -> PageCursor {
        self.read(|s| s.cursor)
    }

    /// History merged with live-pushed items not yet seen in history.
    pub fn live_view(&self) -> Vec<Notification> {
        self.read(|s| merge::reconcile(&s.notifications, &s.live))
    }

    /// Live push path. Returns `true` if the id was not known before.
    pub fn add_notification(&self, notification: Notification) -> bool {
        self.ingest(vec![notification], Provenance::Push) > 0
    }

    /// Single ingestion point for both sources. Returns how many ids were
    /// new to the store.
    pub fn ingest(&self, items: Vec<Notification>, provenance: Provenance) -> usize {
        let max_live = self.max_live;
        self.mutate(|state| match provenance {
            Provenance::Push => items
                .into_iter()
                .map(|n| ingest_push(state, n, max_live))
                .filter(|new| *new)
                .count(),
            Provenance::Rest(policy) => ingest_rest(state, items, policy),
        })
    }

    /// Fold a REST page in and move the cursor. A prepend (poll) leaves the
    /// cursor alone.
    pub fn ingest_page(&self, page: Page<Notification>, policy: MergePolicy) -> usize {
        let cursor = PageCursor::from(&page);
        self.mutate(|state| {
            let added = ingest_rest(state, page.data, policy);
            match policy {
                MergePolicy::Replace => state.cursor = cursor,
                MergePolicy::Append => {
                    state.cursor = PageCursor {
                        page_number: cursor.page_number.max(state.cursor.page_number),
                        ..cursor
                    }
                }
                MergePolicy::Prepend => {}
            }
            added
        })
    }

    /// Overwrite the unread count with an authoritative value.
    pub fn set_unread_count(&self, count: u64) {
        self.mutate(|state| state.unread_count = count);
    }

    /// Record a connection state. Returns the previous state.
    pub fn set_connection_state(&self, next: ConnectionState) -> ConnectionState {
        self.mutate(|state| std::mem::replace(&mut state.connection_state, next))
    }

    /// Optimistically mark one notification read.
    pub fn mark_read_local(&self, id: NotificationId, at: DateTime<Utc>) -> ReadTransition {
        self.mutate(|state| {
            if state.find(id).is_none() {
                return ReadTransition::Unknown;
            }
            let mut transitioned = false;
            for n in state
                .notifications
                .iter_mut()
                .chain(state.live.iter_mut())
                .filter(|n| n.id == id)
            {
                transitioned |= n.mark_read(at);
            }
            if transitioned {
                state.unread_count = state.unread_count.saturating_sub(1);
                ReadTransition::Marked
            } else {
                ReadTransition::AlreadyRead
            }
        })
    }

    /// Optimistically mark everything read. Returns how many records changed.
    pub fn mark_all_read_local(&self, at: DateTime<Utc>) -> usize {
        self.mutate(|state| {
            let mut marked = HashSet::new();
            for n in state.notifications.iter_mut().chain(state.live.iter_mut()) {
                if n.mark_read(at) {
                    marked.insert(n.id);
                }
            }
            state.unread_count = 0;
            marked.len()
        })
    }

    /// Forget everything (logout).
    pub fn clear(&self) {
        self.mutate(|state| *state = StoreState::default());
        debug!("Notification store cleared");
    }

    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let result = f(&mut state);
            (result, state.snapshot())
        };
        self.snapshots.send_replace(snapshot);
        result
    }
}

fn ingest_push(state: &mut StoreState, mut incoming: Notification, max_live: usize) -> bool {
    let known = state.find(incoming.id).map(|n| n.read_state);
    if let Some(previous) = known {
        let was_unread = previous == ReadState::Unread;
        // A re-delivered push never un-reads a record.
        if !incoming.is_read() {
            incoming.read_state = previous;
        } else if was_unread {
            state.unread_count = state.unread_count.saturating_sub(1);
        }
    } else if !incoming.is_read() {
        state.unread_count += 1;
    }

    upsert(&mut state.notifications, incoming.clone());
    upsert(&mut state.live, incoming);
    merge::sort_newest_first(&mut state.notifications);
    merge::sort_newest_first(&mut state.live);
    state.live.truncate(max_live);

    trace!(new = known.is_none(), "Push ingested");
    known.is_none()
}

fn ingest_rest(state: &mut StoreState, items: Vec<Notification>, policy: MergePolicy) -> usize {
    let incoming: HashSet<NotificationId> = items.iter().map(|n| n.id).collect();
    let added = merge::merge_additive(&mut state.notifications, items, policy);
    // Pushed items that history now returns have aged into history.
    state.live.retain(|n| !incoming.contains(&n.id));
    added
}

fn upsert(list: &mut Vec<Notification>, incoming: Notification) {
    match list.iter_mut().find(|n| n.id == incoming.id) {
        Some(existing) => *existing = incoming,
        None => list.push(incoming),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    fn n(id: i64, minute: u32) -> Notification {
        Notification::new(id, format!("#{id}"), "", at(minute))
    }

    fn ids(list: &[Notification]) -> Vec<i64> {
        list.iter().map(|n| n.id).collect()
    }

    fn page(items: Vec<Notification>, page_number: u64, total_pages: u64) -> Page<Notification> {
        let total_count = items.len() as u64 * total_pages;
        Page {
            data: items,
            total_count,
            page_number,
            total_pages,
            has_next_page: page_number < total_pages,
        }
    }

    #[test]
    fn test_push_inserts_sorted_and_counts_unread() {
        let store = NotificationStore::new(10);
        assert!(store.add_notification(n(1, 1)));
        assert!(store.add_notification(n(2, 5)));
        assert_eq!(ids(&store.notifications()), vec![2, 1]);
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn test_repeated_push_is_not_counted_twice() {
        let store = NotificationStore::new(10);
        store.add_notification(n(7, 1));
        assert!(!store.add_notification(n(7, 1)));
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_repush_keeps_local_read_state() {
        let store = NotificationStore::new(10);
        store.add_notification(n(7, 1));
        assert_eq!(store.mark_read_local(7, at(2)), ReadTransition::Marked);
        store.add_notification(n(7, 1));
        assert!(store.get(7).expect("present").is_read());
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_repush_as_read_elsewhere_decrements_once() {
        let store = NotificationStore::new(10);
        store.add_notification(n(7, 1));
        store.add_notification(n(8, 2));
        assert_eq!(store.unread_count(), 2);

        let mut read = n(7, 1);
        read.mark_read(at(3));
        assert!(!store.add_notification(read.clone()));
        assert!(store.get(7).expect("present").is_read());
        assert_eq!(store.unread_count(), 1);

        store.add_notification(read);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_push_then_resync_returning_same_id_leaves_one_record() {
        let store = NotificationStore::new(10);
        store.add_notification(n(42, 5));
        store.ingest_page(page(vec![n(42, 5), n(41, 4)], 1, 1), MergePolicy::Replace);

        let list = store.notifications();
        assert_eq!(list.iter().filter(|x| x.id == 42).count(), 1);
        let view = store.live_view();
        assert_eq!(ids(&view), vec![42, 41]);
    }

    #[test]
    fn test_replace_keeps_unseen_live_items_in_live_view() {
        let store = NotificationStore::new(10);
        store.add_notification(n(50, 9));
        store.ingest_page(page(vec![n(41, 4)], 1, 3), MergePolicy::Replace);

        assert_eq!(ids(&store.notifications()), vec![41]);
        assert_eq!(ids(&store.live_view()), vec![50, 41]);
        assert_eq!(store.cursor().total_pages, 3);
        assert!(store.cursor().has_next_page);
    }

    #[test]
    fn test_mark_read_decrements_once() {
        let store = NotificationStore::new(10);
        store.add_notification(n(1, 1));
        store.add_notification(n(2, 2));

        assert_eq!(store.mark_read_local(1, at(3)), ReadTransition::Marked);
        assert_eq!(store.mark_read_local(1, at(4)), ReadTransition::AlreadyRead);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.get(1).and_then(|x| x.read_date()), Some(at(3)));
    }

    #[test]
    fn test_unread_count_never_negative() {
        let store = NotificationStore::new(10);
        store.add_notification(n(1, 1));
        store.set_unread_count(0);
        assert_eq!(store.mark_read_local(1, at(2)), ReadTransition::Marked);
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.mark_read_local(99, at(2)), ReadTransition::Unknown);
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_mark_all_read() {
        let store = NotificationStore::new(10);
        store.add_notification(n(1, 1));
        store.add_notification(n(2, 2));
        assert_eq!(store.mark_all_read_local(at(3)), 2);
        assert_eq!(store.unread_count(), 0);
        assert!(store.notifications().iter().all(Notification::is_read));
    }

    #[test]
    fn test_append_moves_cursor_prepend_does_not() {
        let store = NotificationStore::new(10);
        store.ingest_page(page(vec![n(10, 50), n(9, 40)], 1, 3), MergePolicy::Replace);
        store.ingest_page(page(vec![n(8, 30), n(7, 20)], 2, 3), MergePolicy::Append);
        assert_eq!(store.cursor().page_number, 2);

        store.ingest_page(page(vec![n(11, 59), n(10, 50)], 1, 3), MergePolicy::Prepend);
        assert_eq!(store.cursor().page_number, 2);
        assert_eq!(ids(&store.notifications()), vec![11, 10, 9, 8, 7]);
    }

    #[test]
    fn test_live_list_is_bounded() {
        let store = NotificationStore::new(2);
        for id in 1..=5 {
            store.add_notification(n(id, id as u32));
        }
        assert_eq!(store.notifications().len(), 5);
        store.ingest_page(page(Vec::new(), 1, 0), MergePolicy::Replace);
        assert_eq!(ids(&store.live_view()), vec![5, 4]);
    }

    #[test]
    fn test_snapshots_follow_mutations() {
        let store = NotificationStore::new(10);
        let rx = store.subscribe();
        store.add_notification(n(1, 1));
        store.set_connection_state(ConnectionState::Connected);
        let snap = rx.borrow().clone();
        assert_eq!(snap.notifications.len(), 1);
        assert_eq!(snap.unread_count, 1);
        assert_eq!(snap.connection_state, ConnectionState::Connected);
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = NotificationStore::new(10);
        store.add_notification(n(1, 1));
        store.set_connection_state(ConnectionState::Connected);
        store.clear();
        assert_eq!(store.snapshot(), StoreSnapshot::default());
        assert!(store.live_view().is_empty());
    }
}

//! Reconciliation of independently sourced notification sets.
//!
//! Every function here leaves its output sorted newest-first and free of
//! duplicate ids. Applying the same input twice yields the same list, so a
//! late poll that lands after a resync only causes a redundant re-sort.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::model::{Notification, NotificationId};

/// How a REST page is folded into the current list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// The page becomes the entire list (connect, reconnect, explicit refresh).
    Replace,
    /// New rows go in front (polling: results assumed newer).
    Prepend,
    /// New rows go at the back ("load older" pagination).
    Append,
}

/// Where an ingested batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Live push event.
    Push,
    /// REST history page, with the merge the caller intends.
    Rest(MergePolicy),
}

/// Newest first by `timestamp` (falling back to `created_date`); ties broken
/// by descending id so the order is total.
pub fn newest_first(a: &Notification, b: &Notification) -> Ordering {
    b.sort_key()
        .cmp(&a.sort_key())
        .then_with(|| b.id.cmp(&a.id))
}

/// Sort in place, newest first.
pub fn sort_newest_first(list: &mut [Notification]) {
    list.sort_by(newest_first);
}

/// Drop later occurrences of an id already seen.
pub fn dedup_by_id(items: Vec<Notification>) -> Vec<Notification> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|n| seen.insert(n.id))
        .collect()
}

/// Full replace: `incoming` becomes the list.
pub fn replace(list: &mut Vec<Notification>, incoming: Vec<Notification>) {
    *list = dedup_by_id(incoming);
    sort_newest_first(list);
}

/// Fold `incoming` into `list` under `policy`. `Replace` swaps the list out
/// and returns its new length; the additive policies admit only ids not
/// already present and return how many rows were added.
pub fn merge_additive(
    list: &mut Vec<Notification>,
    incoming: Vec<Notification>,
    policy: MergePolicy,
) -> usize {
    if policy == MergePolicy::Replace {
        replace(list, incoming);
        return list.len();
    }

    let present: HashSet<NotificationId> = list.iter().map(|n| n.id).collect();
    let fresh: Vec<Notification> = dedup_by_id(incoming)
        .into_iter()
        .filter(|n| !present.contains(&n.id))
        .collect();
    let added = fresh.len();

    if policy == MergePolicy::Prepend {
        let older = std::mem::take(list);
        *list = fresh;
        list.extend(older);
    } else {
        list.extend(fresh);
    }
    sort_newest_first(list);
    added
}

/// Merged view of REST history and recently pushed items: live items whose
/// id already appears among the REST rows are dropped, the rest are joined
/// and sorted.
pub fn reconcile(rest: &[Notification], live: &[Notification]) -> Vec<Notification> {
    let rest_ids: HashSet<NotificationId> = rest.iter().map(|n| n.id).collect();
    let mut view: Vec<Notification> = rest.to_vec();
    view.extend(
        dedup_by_id(live.to_vec())
            .into_iter()
            .filter(|n| !rest_ids.contains(&n.id)),
    );
    sort_newest_first(&mut view);
    view
}

//! In-memory fakes shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use notifyhub_core::error::AppError;
use notifyhub_core::result::AppResult;
use notifyhub_core::traits::{NotificationApi, PushConnection, PushTransport, TransportEvent};
use notifyhub_core::types::{Page, PageRequest};

/// Let spawned tasks run to quiescence under a paused clock.
pub async fn settle() {
    time::sleep(Duration::from_millis(1)).await;
}

#[derive(Debug, Default)]
struct ApiState {
    rows: Vec<Value>,
    unread: u64,
    fail_history: bool,
    fail_unread: bool,
    fail_mark: bool,
    history_delay: Option<Duration>,
    history_calls: usize,
    unread_calls: usize,
    marked: Vec<i64>,
    mark_all_calls: usize,
}

/// REST API backed by a row list, served highest id first.
#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<ApiState>,
}

impl FakeApi {
    fn with<R>(&self, f: impl FnOnce(&mut ApiState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn set_history(&self, rows: Vec<Value>) {
        self.with(|s| s.rows = rows);
    }

    pub fn set_unread(&self, count: u64) {
        self.with(|s| s.unread = count);
    }

    /// Make every history call take `delay` before answering.
    pub fn delay_history(&self, delay: Duration) {
        self.with(|s| s.history_delay = Some(delay));
    }

    pub fn fail_history(&self, fail: bool) {
        self.with(|s| s.fail_history = fail);
    }

    pub fn fail_unread(&self, fail: bool) {
        self.with(|s| s.fail_unread = fail);
    }

    pub fn fail_mark(&self, fail: bool) {
        self.with(|s| s.fail_mark = fail);
    }

    pub fn history_calls(&self) -> usize {
        self.with(|s| s.history_calls)
    }

    pub fn unread_calls(&self) -> usize {
        self.with(|s| s.unread_calls)
    }

    pub fn marked(&self) -> Vec<i64> {
        self.with(|s| s.marked.clone())
    }

    pub fn mark_all_calls(&self) -> usize {
        self.with(|s| s.mark_all_calls)
    }
}

#[async_trait]
impl NotificationApi for FakeApi {
    async fn history(&self, request: &PageRequest) -> AppResult<Page<Value>> {
        let delay = self.with(|s| {
            s.history_calls += 1;
            s.history_delay
        });
        if let Some(delay) = delay {
            time::sleep(delay).await;
        }
        self.with(|s| {
            if s.fail_history {
                return Err(AppError::external("history unavailable"));
            }
            let mut rows = s.rows.clone();
            rows.sort_by_key(|r| std::cmp::Reverse(r.get("id").and_then(Value::as_i64)));
            let size = request.page_size.max(1);
            let total = rows.len() as u64;
            let skip = (request.page_number.saturating_sub(1) * size) as usize;
            let data: Vec<Value> = rows.into_iter().skip(skip).take(size as usize).collect();
            let total_pages = total.div_ceil(size);
            Ok(Page {
                data,
                total_count: total,
                page_number: request.page_number,
                total_pages,
                has_next_page: request.page_number < total_pages,
            })
        })
    }

    async fn unread_count(&self) -> AppResult<u64> {
        self.with(|s| {
            s.unread_calls += 1;
            if s.fail_unread {
                Err(AppError::external("unread count unavailable"))
            } else {
                Ok(s.unread)
            }
        })
    }

    async fn mark_as_read(&self, id: i64) -> AppResult<bool> {
        self.with(|s| {
            s.marked.push(id);
            if s.fail_mark {
                Err(AppError::external("mark failed"))
            } else {
                Ok(true)
            }
        })
    }

    async fn mark_all_as_read(&self) -> AppResult<bool> {
        self.with(|s| {
            s.mark_all_calls += 1;
            if s.fail_mark {
                Err(AppError::external("mark all failed"))
            } else {
                s.unread = 0;
                Ok(true)
            }
        })
    }
}

#[derive(Debug, Default)]
struct TransportState {
    script: VecDeque<bool>,
    attempts: Vec<Instant>,
    tokens: Vec<String>,
    live: Option<mpsc::Sender<TransportEvent>>,
}

/// Push transport whose connect outcomes are scripted. Unscripted
/// attempts succeed.
#[derive(Debug, Default)]
pub struct FakeTransport {
    state: Mutex<TransportState>,
}

impl FakeTransport {
    fn with<R>(&self, f: impl FnOnce(&mut TransportState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Queue outcomes for the next attempts (`true` succeeds).
    pub fn script(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.with(|s| s.script.extend(outcomes));
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.with(|s| s.attempts.clone())
    }

    pub fn tokens(&self) -> Vec<String> {
        self.with(|s| s.tokens.clone())
    }

    /// Deliver an event on the most recent connection.
    pub async fn emit(&self, event: TransportEvent) {
        let sender = self.with(|s| s.live.clone());
        if let Some(sender) = sender {
            sender.send(event).await.expect("connection dropped");
        }
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn connect(&self, _url: &str, token: &str) -> AppResult<PushConnection> {
        self.with(|s| {
            s.attempts.push(Instant::now());
            s.tokens.push(token.to_string());
            if !s.script.pop_front().unwrap_or(true) {
                return Err(AppError::transport("scripted connect failure"));
            }
            let (tx, rx) = mpsc::channel(16);
            s.live = Some(tx);
            Ok(PushConnection::new(rx, CancellationToken::new()))
        })
    }
}

//! Access-token source.

use std::sync::RwLock;

/// Supplies the current access token. Read at connect time only.
pub trait TokenSource: Send + Sync + std::fmt::Debug + 'static {
    /// The current token, or `None` when not authenticated.
    fn token(&self) -> Option<String>;
}

/// A token source backed by a replaceable in-memory value.
#[derive(Debug, Default)]
pub struct StaticToken {
    token: RwLock<Option<String>>,
}

impl StaticToken {
    /// Create a source holding `token`. Blank tokens count as absent.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    /// Replace the token (login).
    pub fn set(&self, token: impl Into<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.into());
    }

    /// Forget the token (logout).
    pub fn clear(&self) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

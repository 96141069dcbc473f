//! Pagination types for history queries.
//!
//! Backends disagree on how a page is wrapped: newer versions return the
//! rows under `data`, older ones under `items`, and some wrap the whole page
//! in a response envelope. [`Page::from_value`] folds all of these into one
//! shape at the boundary so callers only ever see `Page::data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::sorting::SortField;

/// Default page size.
const DEFAULT_PAGE_SIZE: u64 = 20;
/// Maximum page size.
const MAX_PAGE_SIZE: u64 = 100;

/// Request parameters for a history page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    pub page_number: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Sort specification.
    pub sort: SortField,
}

impl PageRequest {
    /// Create a new page request, clamping out-of-range values.
    pub fn new(page_number: u64, page_size: u64, sort: SortField) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            sort,
        }
    }

    /// First page with the given size and sort.
    pub fn first(page_size: u64, sort: SortField) -> Self {
        Self::new(1, page_size, sort)
    }

    /// The page following this one.
    pub fn next(&self) -> Self {
        Self::new(self.page_number + 1, self.page_size, self.sort.clone())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE, SortField::default())
    }
}

/// A normalized page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The rows on this page.
    pub data: Vec<T>,
    /// Total number of rows across all pages.
    pub total_count: u64,
    /// Current page number (1-based).
    pub page_number: u64,
    /// Total number of pages.
    pub total_pages: u64,
    /// Whether a further page exists.
    pub has_next_page: bool,
}

impl<T> Page<T> {
    /// An empty page: no rows, no pages, nothing further.
    pub fn empty(page_number: u64) -> Self {
        Self {
            data: Vec::new(),
            total_count: 0,
            page_number,
            total_pages: 0,
            has_next_page: false,
        }
    }

    /// Whether the page carries no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Transform the rows, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
        }
    }
}

/// Raw page envelope as sent by any backend version. Older field names are
/// separate fields so a body carrying both spellings still decodes; the
/// current name wins.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    items: Option<Vec<Value>>,
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    total_items: Option<u64>,
    #[serde(default)]
    page_number: Option<u64>,
    #[serde(default)]
    page: Option<u64>,
    #[serde(default)]
    page_size: Option<u64>,
    #[serde(default)]
    total_pages: Option<u64>,
    #[serde(default)]
    has_next_page: Option<bool>,
    #[serde(default)]
    has_next: Option<bool>,
}

impl Page<Value> {
    /// Normalize any supported page shape into a [`Page`].
    ///
    /// Accepted shapes: `{data: [...]}`, `{items: [...]}`, a bare array, and
    /// a response envelope whose `data` is itself one of those objects.
    pub fn from_value(value: Value) -> AppResult<Self> {
        match value {
            Value::Array(rows) => {
                let count = rows.len() as u64;
                Ok(Self {
                    data: rows,
                    total_count: count,
                    page_number: 1,
                    total_pages: u64::from(count > 0),
                    has_next_page: false,
                })
            }
            Value::Object(_) => {
                let envelope: PageEnvelope = serde_json::from_value(value)?;
                if let Some(inner @ Value::Object(_)) = envelope.data {
                    return Self::from_value(inner);
                }
                Ok(envelope.into_page())
            }
            other => Err(AppError::external(format!(
                "unexpected history page shape: {}",
                kind_of(&other)
            ))),
        }
    }
}

impl PageEnvelope {
    fn into_page(self) -> Page<Value> {
        let data = match self.data {
            Some(Value::Array(rows)) => rows,
            _ => self.items.unwrap_or_default(),
        };
        let total_count = self
            .total_count
            .or(self.total_items)
            .unwrap_or(data.len() as u64);
        let page_number = self.page_number.or(self.page).unwrap_or(1).max(1);
        let total_pages = self.total_pages.unwrap_or_else(|| match self.page_size {
            Some(size) if size > 0 => total_count.div_ceil(size),
            _ => u64::from(total_count > 0),
        });
        let has_next_page = self
            .has_next_page
            .or(self.has_next)
            .unwrap_or(page_number < total_pages);

        Page {
            data,
            total_count,
            page_number,
            total_pages,
            has_next_page,
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

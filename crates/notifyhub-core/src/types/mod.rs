//! Core type definitions used across the NotifyHub workspace.

pub mod pagination;
pub mod sorting;

pub use pagination::{Page, PageRequest};
pub use sorting::{SortDirection, SortField};

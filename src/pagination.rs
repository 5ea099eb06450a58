//! List pagination (RFC 7644 §3.4.2.4).
//!
//! SCIM pages are addressed by a 1-based `startIndex` and a `count`. A
//! [`PageWindow`] clamps the requested values and turns them into the
//! zero-based offset and limit a backend understands.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Schema URI of a list response.
pub const LIST_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// A clamped page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    /// 1-based index of the first result.
    pub start_index: usize,
    /// Page size after defaulting and clamping.
    pub items_per_page: usize,
    pub total_results: usize,
}

impl PageWindow {
    /// Compute a window from the client's requested values.
    ///
    /// A start below 1 becomes 1. A missing count uses `default_count`, a
    /// count above `max_count` becomes `max_count` and a negative count
    /// becomes 0.
    pub fn compute(
        requested_start: Option<i64>,
        requested_count: Option<i64>,
        total_results: usize,
        default_count: usize,
        max_count: usize,
    ) -> Self {
        let start_index = requested_start
            .filter(|&start| start >= 1)
            .map_or(1, |start| usize::try_from(start).unwrap_or(usize::MAX));
        let items_per_page = match requested_count {
            None => default_count.min(max_count),
            Some(count) if count <= 0 => 0,
            Some(count) => usize::try_from(count).unwrap_or(usize::MAX).min(max_count),
        };
        Self {
            start_index,
            items_per_page,
            total_results,
        }
    }

    /// Zero-based offset for the backend.
    pub fn offset(&self) -> usize {
        self.start_index - 1
    }

    pub fn limit(&self) -> usize {
        self.items_per_page
    }

    /// The indexes of the full result set this window selects.
    pub fn range(&self) -> Range<usize> {
        let start = self.offset().min(self.total_results);
        let end = start.saturating_add(self.items_per_page).min(self.total_results);
        start..end
    }
}

/// Query parameters of a list request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub start_index: Option<i64>,
    #[serde(default)]
    pub count: Option<i64>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_start_index(mut self, start_index: i64) -> Self {
        self.start_index = Some(start_index);
        self
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }
}

/// A list response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub schemas: Vec<String>,
    pub total_results: usize,
    /// Number of resources actually returned.
    pub items_per_page: usize,
    pub start_index: usize,
    #[serde(rename = "Resources")]
    pub resources: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(window: &PageWindow, resources: Vec<T>) -> Self {
        Self {
            schemas: vec![LIST_RESPONSE_SCHEMA.to_string()],
            total_results: window.total_results,
            items_per_page: resources.len(),
            start_index: window.start_index,
            resources,
        }
    }
}

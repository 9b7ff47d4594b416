//! Observable fetch state of a cache entry

use std::any::Any;
use std::sync::Arc;

use crate::error::ApiError;

/// Type-erased payload stored in an entry.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl FetchStatus {
    /// True once a fetch has resolved one way or the other.
    pub fn is_settled(self) -> bool {
        matches!(self, FetchStatus::Success | FetchStatus::Error)
    }
}

/// What the watch channel of an entry carries.
#[derive(Clone)]
pub(crate) struct RawState {
    pub(crate) data: Option<Payload>,
    pub(crate) error: Option<ApiError>,
    pub(crate) status: FetchStatus,
}

impl RawState {
    pub(crate) fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: FetchStatus::Idle,
        }
    }
}

/// Snapshot of an entry as seen by one subscriber.
///
/// A failed refetch keeps the last successful `data` next to `error`, and a
/// refetch in progress keeps it next to `Loading`.
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<ApiError>,
    pub status: FetchStatus,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            status: self.status,
        }
    }
}

impl<T: Send + Sync + 'static> QueryState<T> {
    pub(crate) fn from_raw(raw: &RawState) -> Self {
        Self {
            data: raw
                .data
                .clone()
                .and_then(|payload| payload.downcast::<T>().ok()),
            error: raw.error.clone(),
            status: raw.status,
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == FetchStatus::Error
    }
}

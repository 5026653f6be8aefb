use crate::error::Error;
use std::sync::Arc;

/// The outcome of fetching one record. Failures are shared so results can be
/// held on to while the next one is fetched.
pub type FetchResult<T> = std::result::Result<T, Arc<Error>>;

/// What happened to a single record between two consecutive fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent<T> {
    Created(T),
    Changed(T),
    Deleted,
}

impl<T: PartialEq> ChangeEvent<T> {
    /// Classify the transition from `previous` to `current`. Equal values and
    /// failure-to-failure transitions are not changes.
    pub fn between(previous: &FetchResult<T>, current: FetchResult<T>) -> Option<Self> {
        match (previous, current) {
            (Ok(before), Ok(after)) if *before != after => Some(ChangeEvent::Changed(after)),
            (Ok(_), Ok(_)) => None,
            (Ok(_), Err(_)) => Some(ChangeEvent::Deleted),
            (Err(_), Ok(after)) => Some(ChangeEvent::Created(after)),
            (Err(_), Err(_)) => None,
        }
    }
}

impl<T> ChangeEvent<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            ChangeEvent::Created(value) | ChangeEvent::Changed(value) => Some(value),
            ChangeEvent::Deleted => None,
        }
    }
}

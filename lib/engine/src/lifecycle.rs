use crate::snapshot::Snapshot;
use serde::Serialize;
use std::sync::Arc;

/// Tagged lifecycle of an [`Engine`](crate::Engine)
#[derive(Debug, Clone)]
pub enum Lifecycle {
    Unfitted,
    /// A fit is in progress; `prior` is restored if it fails
    Fitting { prior: Box<Lifecycle> },
    Fitted(Arc<Snapshot>),
    /// The upstream catalog changed since this snapshot was fitted
    Stale(Arc<Snapshot>),
}

/// Lifecycle without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Unfitted,
    Fitting,
    Fitted,
    Stale,
}

impl Lifecycle {
    pub fn state(&self) -> State {
        match self {
            Lifecycle::Unfitted => State::Unfitted,
            Lifecycle::Fitting { .. } => State::Fitting,
            Lifecycle::Fitted(_) => State::Fitted,
            Lifecycle::Stale(_) => State::Stale,
        }
    }

    /// The snapshot queries may run against.
    ///
    /// A fitted snapshot keeps serving while its replacement is being fitted.
    pub fn serving(&self) -> Option<&Arc<Snapshot>> {
        match self {
            Lifecycle::Fitted(snapshot) => Some(snapshot),
            Lifecycle::Fitting { prior } => prior.serving(),
            Lifecycle::Unfitted | Lifecycle::Stale(_) => None,
        }
    }

    /// The same lifecycle with its fitted snapshot (if any) marked stale
    pub fn into_stale(self) -> Lifecycle {
        match self {
            Lifecycle::Fitted(snapshot) => Lifecycle::Stale(snapshot),
            Lifecycle::Fitting { prior } => Lifecycle::Fitting {
                prior: Box::new(prior.into_stale()),
            },
            other => other,
        }
    }
}

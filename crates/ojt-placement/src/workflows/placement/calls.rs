use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::PlacementError;
use super::store::Transient;

/// Outcome of a single bounded call.
#[derive(Debug)]
pub(crate) enum Bounded<E> {
    TimedOut,
    Failed(E),
}

/// Timeout and retry discipline applied to every external call.
///
/// Reads are retried once after a timeout or a transient failure. Writes are attempted
/// exactly once so side effects are never duplicated.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallPolicy {
    timeout: Duration,
}

impl CallPolicy {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub(crate) async fn bounded<T, E, Fut>(&self, call: Fut) -> Result<T, Bounded<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Bounded::Failed(err)),
            Err(_) => Err(Bounded::TimedOut),
        }
    }

    pub(crate) async fn read<T, E, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, PlacementError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::fmt::Display + Into<PlacementError>,
    {
        match self.bounded(call()).await {
            Ok(value) => return Ok(value),
            Err(Bounded::Failed(err)) if !err.is_transient() => return Err(err.into()),
            Err(Bounded::Failed(err)) => warn!(operation, error = %err, "read failed; retrying once"),
            Err(Bounded::TimedOut) => warn!(operation, "read timed out; retrying once"),
        }

        match self.bounded(call()).await {
            Ok(value) => Ok(value),
            Err(Bounded::Failed(err)) => Err(err.into()),
            Err(Bounded::TimedOut) => Err(PlacementError::Timeout {
                operation,
                mutating: false,
            }),
        }
    }

    pub(crate) async fn write<T, E, Fut>(
        &self,
        operation: &'static str,
        call: Fut,
    ) -> Result<T, PlacementError>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<PlacementError>,
    {
        match self.bounded(call).await {
            Ok(value) => Ok(value),
            Err(Bounded::Failed(err)) => Err(err.into()),
            Err(Bounded::TimedOut) => Err(PlacementError::Timeout {
                operation,
                mutating: true,
            }),
        }
    }
}

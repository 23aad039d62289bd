//! Per-call cancellation.
//!
//! Every public operation takes a [`CancellationToken`] owned by the caller. Backend
//! round trips are raced against it, so a cancelled crawl request stops waiting on
//! the store immediately and reports [`SessionError::Cancelled`].

use crate::errors::{Result, SessionError};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Runs `fut` unless `cancel` fires first.
///
/// Cancellation wins ties: a token that is already cancelled never starts the
/// backend call.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionError::Cancelled),
        r = fut => r,
    }
}

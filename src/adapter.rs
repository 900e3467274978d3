//! Error normalization for remote calls.
//!
//! Every remote operation goes through [`invoke_remote`]. It runs the call
//! once, passes successful results through untouched and turns any
//! [`CallFailure`] into a [`LegacySystemError`], logging the operation name,
//! category and full cause chain before returning it.

use crate::error::{CallFailure, LegacySystemError};
use std::error::Error as StdError;
use std::future::Future;
use tracing::{error, trace};

/// Run a remote call and normalize its failure.
///
/// No retries: a failed call is reported once.
pub async fn invoke_remote<T, F, Fut>(operation: &str, call: F) -> Result<T, LegacySystemError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, CallFailure>>,
{
    trace!(operation = %operation, "Invoking remote operation");

    match call().await {
        Ok(value) => {
            trace!(operation = %operation, "Remote operation completed");
            Ok(value)
        }
        Err(failure) => {
            let err = LegacySystemError::from_failure(failure);
            error!(
                operation = %operation,
                category = %err.category(),
                error = %err,
                chain = %error_chain(&err),
                cause = ?err.cause(),
                "Remote operation failed"
            );
            Err(err)
        }
    }
}

/// Render an error and all of its sources, outermost first.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(" <- ")
}

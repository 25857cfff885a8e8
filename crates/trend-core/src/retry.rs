use std::future::Future;
use std::time::Duration;

use crate::error::{ApiFailure, AppError, Service};

/// Pause before the single retry of a failed API call
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Run `call`, retrying it exactly once after `delay` if it fails.
///
/// The second failure is classified into an [`AppError`]; no further
/// attempts are made.
pub async fn with_one_retry<T, F, Fut>(service: Service, delay: Duration, mut call: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiFailure>>,
{
    let failure = match call().await {
        Ok(value) => return Ok(value),
        Err(failure) => failure,
    };

    tracing::warn!(?service, error = %failure, "API call failed, retrying in {:?}", delay);
    tokio::time::sleep(delay).await;

    call().await.map_err(|failure| {
        let kind = AppError::classify(&failure, service);
        tracing::error!(?service, kind = kind.code(), error = %failure, "API call failed after retry");
        kind
    })
}

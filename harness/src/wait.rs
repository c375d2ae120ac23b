//! Condition polling. The harness never sleeps for a fixed time and hopes;
//! it re-checks the real postcondition until it holds or the budget runs out.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll `check` until it yields `Some`, failing with
/// [`HarnessError::Timeout`] once `timeout` has elapsed. Errors from `check`
/// abort immediately. The check always runs at least once.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if let Some(value) = check().await? {
            debug!("{what} after {attempts} attempt(s)");
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(HarnessError::Timeout {
                what: what.to_string(),
                after: timeout,
            });
        }
        sleep(interval).await;
    }
}

/// [`poll_until`] for plain boolean conditions.
pub async fn wait_for<F, Fut>(
    what: &str,
    timeout: Duration,
    mut condition: F,
) -> HarnessResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<bool>>,
{
    poll_until(what, timeout, DEFAULT_POLL_INTERVAL, || {
        let fut = condition();
        async move { Ok(fut.await?.then_some(())) }
    })
    .await
}

use std::future::Future;
use std::time::Instant;
use tracing::{debug, info};

/// Log level used by [`measure_dur_async`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingLevel {
    Info,
    Debug,
}

/// Await `operation` and log how long it took, on success and on failure.
pub async fn measure_dur_async<Fut, T, E>(
    metric_name: &str,
    level: TimingLevel,
    operation: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let result = operation.await;
    let took = start.elapsed().as_millis();
    let outcome = if result.is_ok() { "ok" } else { "failed" };
    match level {
        TimingLevel::Info => info!("{} | outcome={}, took={}", metric_name, outcome, took),
        TimingLevel::Debug => debug!("{} | outcome={}, took={}", metric_name, outcome, took),
    }
    result
}

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use recon_types::{FetchResult, ResponseBody, Side, TestCase};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};

use crate::{save_response_bodies, HttpResponse, HttpTransport, TransportError};

/// Default bound on concurrently fetched test cases.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 50;
/// Error recorded for cases never started because shutdown was requested.
pub const CANCELLED_BEFORE_DISPATCH: &str = "cancelled before dispatch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Maximum test cases (source+target pairs) in flight at once.
    pub max_in_flight: usize,
    /// When set, raw bodies are saved as `<test_id>_SOURCE.json` / `_TARGET.json`.
    pub responses_dir: Option<PathBuf>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            responses_dir: None,
        }
    }
}

/// Fetches every test case against both environments, at most
/// `max_in_flight` cases at a time.
pub struct ParallelFetcher {
    transport: Arc<dyn HttpTransport>,
    config: FetcherConfig,
    semaphore: Arc<Semaphore>,
}

impl ParallelFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: FetcherConfig) -> Self {
        let permits = config.max_in_flight.max(1);
        Self {
            transport,
            config: FetcherConfig {
                max_in_flight: permits,
                ..config
            },
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Fetches all cases. Results arrive in completion order, one per case.
    pub async fn run(&self, cases: &[TestCase]) -> Vec<FetchResult> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run_with_shutdown(cases, shutdown_rx).await
    }

    /// Like [`ParallelFetcher::run`], but stops dispatching once `shutdown`
    /// becomes `true`. Cases already in flight finish; the rest are returned
    /// with [`CANCELLED_BEFORE_DISPATCH`].
    pub async fn run_with_shutdown(
        &self,
        cases: &[TestCase],
        mut shutdown: watch::Receiver<bool>,
    ) -> Vec<FetchResult> {
        let started = Instant::now();
        tracing::info!(
            test_cases = cases.len(),
            max_in_flight = self.config.max_in_flight,
            "starting paired fetch"
        );

        let mut results = Vec::with_capacity(cases.len());
        let mut outstanding = BTreeMap::new();
        let mut tasks = JoinSet::new();
        let mut cancelled = false;

        for (index, case) in cases.iter().enumerate() {
            let permit = if cancelled {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = wait_for_shutdown(&mut shutdown) => None,
                    permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
                }
            };
            let Some(permit) = permit else {
                if !cancelled {
                    tracing::warn!(
                        remaining = cases.len() - index,
                        "shutdown requested; remaining test cases will not be fetched"
                    );
                }
                cancelled = true;
                let mut result = FetchResult::pending(case);
                result.error = Some(CANCELLED_BEFORE_DISPATCH.to_string());
                results.push(result);
                continue;
            };

            while let Some(joined) = tasks.try_join_next() {
                collect(joined, &mut outstanding, &mut results);
            }

            outstanding.insert(index, FetchResult::pending(case));
            let transport = Arc::clone(&self.transport);
            let responses_dir = self.config.responses_dir.clone();
            let case = case.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = AssertUnwindSafe(fetch_pair(transport.as_ref(), &case))
                    .catch_unwind()
                    .await;
                let result = match outcome {
                    Ok(result) => result,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(test_id = %case.id, "fetch task panicked: {message}");
                        let mut result = FetchResult::pending(&case);
                        result.error = Some(format!("fetch task panicked: {message}"));
                        result
                    }
                };
                if let Some(dir) = responses_dir {
                    save_off_runtime(dir, &result).await;
                }
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            collect(joined, &mut outstanding, &mut results);
        }
        for (_, mut result) in outstanding {
            result.error = Some("fetch task did not complete".to_string());
            results.push(result);
        }

        let failed = results.iter().filter(|result| result.error.is_some()).count();
        tracing::info!(
            test_cases = results.len(),
            with_errors = failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "paired fetch finished"
        );
        results
    }
}

fn collect(
    joined: Result<(usize, FetchResult), JoinError>,
    outstanding: &mut BTreeMap<usize, FetchResult>,
    results: &mut Vec<FetchResult>,
) {
    let (index, result) = match joined {
        Ok(joined) => joined,
        Err(error) => {
            tracing::error!("fetch task failed to join: {error}");
            return;
        }
    };
    outstanding.remove(&index);
    results.push(result);
}

/// Saves both bodies on the blocking pool so file IO never stalls the runtime.
async fn save_off_runtime(dir: PathBuf, result: &FetchResult) {
    let snapshot = result.clone();
    let saved = tokio::task::spawn_blocking(move || save_response_bodies(&dir, &snapshot)).await;
    match saved {
        Ok(Ok(_)) => {}
        Ok(Err(error)) => tracing::warn!(test_id = %result.test_id, "{error}"),
        Err(error) => {
            tracing::warn!(test_id = %result.test_id, "response writer task failed: {error}")
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone: shutdown can no longer be requested.
            std::future::pending::<()>().await;
        }
    }
}

/// Issues the source and target requests together and folds both outcomes
/// into one result.
async fn fetch_pair(transport: &dyn HttpTransport, case: &TestCase) -> FetchResult {
    let started = Instant::now();
    tracing::debug!(test_id = %case.id, source = %case.source_url, target = %case.target_url, "fetching");
    let (source, target) = tokio::join!(
        transport.get(&case.source_url),
        transport.get(&case.target_url)
    );

    let mut result = FetchResult::pending(case);
    apply_outcome(&mut result, Side::Source, source);
    apply_outcome(&mut result, Side::Target, target);
    result.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    result
}

fn apply_outcome(
    result: &mut FetchResult,
    side: Side,
    outcome: Result<HttpResponse, TransportError>,
) {
    match outcome {
        Ok(response) => {
            let body = ResponseBody::decode(&response.body);
            if matches!(body, ResponseBody::Text(_)) {
                tracing::debug!(
                    test_id = %result.test_id,
                    side = %side,
                    status = response.status,
                    "response body is not JSON; keeping raw text"
                );
            }
            match side {
                Side::Source => {
                    result.source_status = Some(response.status);
                    result.source_body = Some(body);
                }
                Side::Target => {
                    result.target_status = Some(response.status);
                    result.target_body = Some(body);
                }
            }
        }
        Err(error) => {
            tracing::warn!(test_id = %result.test_id, side = %side, "request failed: {error}");
            if let Some(status) = error.status() {
                match side {
                    Side::Source => result.source_status = Some(status),
                    Side::Target => result.target_status = Some(status),
                }
            }
            result.record_error(side, &error.to_string());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

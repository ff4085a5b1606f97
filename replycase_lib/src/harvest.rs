//! Concurrent detail harvesting.
//!
//! Uses the Semaphore + JoinSet + mpsc pattern: one task per listing record,
//! a semaphore bounding how many fetch at once, and a channel feeding a
//! single collector. Every input record yields exactly one
//! [`CombinedRecord`] unless the run is cancelled, in which case the records
//! never started are returned as unprocessed.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use replycase_api::types::RecordType;

use crate::config::{jittered_sleep, HarvestConfig, RetryPolicy, MAX_CONCURRENCY};
use crate::detail::DetailFetcher;
use crate::extract::FieldExtractor;
use crate::model::{CombinedRecord, ListRecord};
use crate::parse::parse_detail;

/// One failed record kept for the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureSample {
    pub record_id: i64,
    pub record_type: RecordType,
    pub reason: String,
}

/// Aggregate outcome of a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records with at least one field found only by regex recovery.
    pub recovered_by_regex: usize,
    /// Fields found by regex recovery across the batch.
    pub regex_fields: usize,
    /// First failures in completion order.
    pub samples: Vec<FailureSample>,
}

impl FailureReport {
    fn record(&mut self, combined: &CombinedRecord, sample_size: usize) {
        self.total += 1;
        match &combined.failure {
            Some(reason) => {
                self.failed += 1;
                if self.samples.len() < sample_size {
                    self.samples.push(FailureSample {
                        record_id: combined.list.record_id,
                        record_type: combined.list.record_type,
                        reason: reason.clone(),
                    });
                }
            }
            None => {
                self.succeeded += 1;
                if let Some(report) = &combined.extraction {
                    if report.used_recovery() {
                        self.recovered_by_regex += 1;
                        self.regex_fields += report.recovered.len();
                    }
                }
            }
        }
    }
}

/// Result of a harvest run.
#[derive(Debug)]
pub struct HarvestOutcome {
    /// Completed records, in completion order.
    pub records: Vec<CombinedRecord>,
    pub report: FailureReport,
    pub cancelled: bool,
    /// Records never attempted because the run was cancelled.
    pub unprocessed: Vec<ListRecord>,
}

impl HarvestOutcome {
    /// Restores listing order.
    pub fn sort_by_sequence(&mut self) {
        self.records.sort_by_key(|r| r.list.sequence_number);
    }
}

/// Fans detail fetches out over a bounded worker pool.
pub struct Harvester {
    fetcher: DetailFetcher,
    extractor: Arc<FieldExtractor>,
    concurrency: usize,
    delay: (Duration, Duration),
    retry: RetryPolicy,
    failure_sample_size: usize,
}

impl Harvester {
    pub fn new(fetcher: DetailFetcher) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(FieldExtractor::default()),
            concurrency: 16,
            delay: (Duration::from_millis(200), Duration::from_millis(500)),
            retry: RetryPolicy::default(),
            failure_sample_size: 3,
        }
    }

    pub fn from_config(fetcher: DetailFetcher, config: &HarvestConfig) -> Self {
        let (min, max) = config.delay_range();
        Self::new(fetcher)
            .with_concurrency(config.concurrency)
            .with_delay(min, max)
            .with_retry(config.retry.clone())
            .with_failure_sample_size(config.failure_sample_size)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Random pause each worker takes before its request.
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.delay = (min, max);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_failure_sample_size(mut self, n: usize) -> Self {
        self.failure_sample_size = n;
        self
    }

    pub fn with_extractor(mut self, extractor: FieldExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub async fn harvest(
        &self,
        records: Vec<ListRecord>,
        cancel: CancellationToken,
    ) -> HarvestOutcome {
        self.harvest_with_progress(records, cancel, |_| {}).await
    }

    /// Harvests all records, calling `on_item` as each one completes.
    pub async fn harvest_with_progress<F>(
        &self,
        records: Vec<ListRecord>,
        cancel: CancellationToken,
        mut on_item: F,
    ) -> HarvestOutcome
    where
        F: FnMut(&CombinedRecord),
    {
        let total = records.len();
        tracing::info!(
            "Harvesting {} detail pages with {} workers",
            total,
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<(usize, CombinedRecord)>(self.concurrency * 2);
        let mut join_set = JoinSet::new();

        for (index, list) in records.iter().cloned().enumerate() {
            let sem = Arc::clone(&semaphore);
            let sender = tx.clone();
            let fetcher = self.fetcher.clone();
            let extractor = Arc::clone(&self.extractor);
            let retry = self.retry.clone();
            let (min, max) = self.delay;
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return;
                };
                if cancel.is_cancelled() {
                    return;
                }
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = jittered_sleep(min, max) => {}
                }
                if let Some(combined) =
                    harvest_one(&fetcher, &extractor, &retry, list, &cancel).await
                {
                    let _ = sender.send((index, combined)).await;
                }
            });
        }
        drop(tx);

        let mut report = FailureReport::default();
        let mut completed = Vec::with_capacity(total);
        let mut done = vec![false; total];

        while let Some((index, combined)) = rx.recv().await {
            done[index] = true;
            report.record(&combined, self.failure_sample_size);
            on_item(&combined);
            completed.push(combined);
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Harvest worker ended abnormally: {}", e);
            }
        }

        let cancelled = cancel.is_cancelled();
        let mut unprocessed = Vec::new();
        for (index, list) in records.into_iter().enumerate() {
            if done[index] {
                continue;
            }
            if cancelled {
                unprocessed.push(list);
            } else {
                // a worker died without reporting; keep the 1:1 guarantee
                let combined = CombinedRecord::failed(list, "worker ended without a result");
                report.record(&combined, self.failure_sample_size);
                on_item(&combined);
                completed.push(combined);
            }
        }

        tracing::info!(
            "Harvest finished: {} succeeded, {} failed, {} unprocessed",
            report.succeeded,
            report.failed,
            unprocessed.len()
        );
        if report.recovered_by_regex > 0 {
            tracing::warn!(
                "{} records ({} fields) relied on regex recovery",
                report.recovered_by_regex,
                report.regex_fields
            );
        }
        for sample in &report.samples {
            tracing::warn!(
                "Failed {} {}: {}",
                sample.record_type,
                sample.record_id,
                sample.reason
            );
        }

        HarvestOutcome {
            records: completed,
            report,
            cancelled,
            unprocessed,
        }
    }
}

/// Fetches and parses one record, retrying retryable fetch failures.
/// `None` when cancellation interrupted a retry backoff.
async fn harvest_one(
    fetcher: &DetailFetcher,
    extractor: &FieldExtractor,
    retry: &RetryPolicy,
    list: ListRecord,
    cancel: &CancellationToken,
) -> Option<CombinedRecord> {
    let mut attempt = 0usize;
    let html = loop {
        match fetcher.fetch(list.record_id, list.record_type).await {
            Ok(html) => break html,
            Err(err) => {
                attempt += 1;
                if attempt > retry.max_retries || !err.is_retryable() {
                    tracing::debug!(
                        "Giving up on {} {} after {} attempts: {}",
                        list.record_type,
                        list.record_id,
                        attempt,
                        err
                    );
                    return Some(CombinedRecord::failed(list, format!("fetch failed: {}", err)));
                }
                let delay = retry.delay_for_attempt(attempt);
                tracing::warn!(
                    "{} {} failed (attempt {}/{}), retrying in {:.1}s: {}",
                    list.record_type,
                    list.record_id,
                    attempt,
                    retry.max_retries + 1,
                    delay.as_secs_f64(),
                    err
                );
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    };

    match parse_detail(extractor, list.record_type, &html) {
        Ok(parsed) => Some(CombinedRecord::succeeded(list, parsed.detail, parsed.report)),
        Err(e) => Some(CombinedRecord::failed(list, format!("parse failed: {}", e))),
    }
}

//! Paginated listing retrieval.
//!
//! Pages are requested in increasing offset order with a DataTables-style
//! `start`/`length` pair. Pagination stops on an empty page, a short page,
//! the server-reported total, the caller's item cap, or a failed request.
//! A failed page ends the listing cleanly with what was collected so far.

use std::sync::Arc;
use std::time::Duration;

use replycase_api::types::{
    IntegListRow, LateListRow, ListResponse, PastListRow, RecordType, SourceFamily,
};
use replycase_api::{Client, Endpoints, IntegListQuery, Query, ReplyListQuery};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::{jittered_sleep, HarvestConfig};
use crate::model::ListRecord;

/// Filters applied to listing requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub integ_search_type: Option<String>,
}

impl ListingFilter {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            date_start: Some(config.date_start.clone()),
            date_end: Some(config.date_end_or_today()),
            integ_search_type: config.integ_search_type.clone(),
        }
    }
}

/// Why pagination ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EmptyPage,
    ShortPage,
    ReachedTotal,
    MaxItems,
    Cancelled,
    Error(String),
}

/// Result of listing one family.
#[derive(Clone, Debug, Serialize)]
pub struct ListingOutcome {
    pub family: SourceFamily,
    pub records: Vec<ListRecord>,
    pub pages_requested: usize,
    /// Last `recordsTotal` the server reported.
    pub total_reported: Option<i64>,
    /// Rows whose type label matched no known record type.
    pub unrecognized: usize,
    pub stop_reason: StopReason,
}

impl ListingOutcome {
    /// Keeps only records of the given types; returns how many were dropped.
    pub fn retain_types(&mut self, types: &[RecordType]) -> usize {
        let before = self.records.len();
        self.records.retain(|r| types.contains(&r.record_type));
        before - self.records.len()
    }
}

struct Page {
    total: i64,
    rows: usize,
    records: Vec<ListRecord>,
}

/// Drives listing pagination for any family. Stateless between calls.
#[derive(Clone)]
pub struct ListPager {
    client: Client,
    endpoints: Arc<Endpoints>,
    delay: (Duration, Duration),
    cancel: CancellationToken,
}

impl ListPager {
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        Self {
            client,
            endpoints: Arc::new(endpoints),
            delay: (Duration::from_millis(200), Duration::from_millis(500)),
            cancel: CancellationToken::new(),
        }
    }

    /// Random pause taken between consecutive page requests.
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.delay = (min, max);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Lists a family until exhaustion or `max_items` rows.
    pub async fn list_all(
        &self,
        family: SourceFamily,
        page_size: u64,
        max_items: Option<u64>,
        filter: &ListingFilter,
    ) -> ListingOutcome {
        let page_size = page_size.max(1);
        let mut records = Vec::new();
        let mut received = 0u64;
        let mut pages_requested = 0usize;
        let mut total_reported = None;

        let stop_reason = loop {
            if max_items.is_some_and(|max| received >= max) {
                break StopReason::MaxItems;
            }
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            let length = match max_items {
                Some(max) => page_size.min(max - received),
                None => page_size,
            };
            if pages_requested > 0 {
                jittered_sleep(self.delay.0, self.delay.1).await;
            }

            pages_requested += 1;
            let page = match self
                .fetch_page(family, received, length, received + 1, filter)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        "Listing {} stopped at offset {} after request failure: {}",
                        family,
                        received,
                        e
                    );
                    break StopReason::Error(e.to_string());
                }
            };

            total_reported = Some(page.total);
            received += page.rows as u64;
            records.extend(page.records);
            tracing::info!(
                "{} page {}: {} rows ({} of {})",
                family,
                pages_requested,
                page.rows,
                received,
                page.total
            );

            if page.rows == 0 {
                break StopReason::EmptyPage;
            }
            if page.total > 0 && received >= page.total as u64 {
                break StopReason::ReachedTotal;
            }
            if (page.rows as u64) < length {
                break StopReason::ShortPage;
            }
        };

        let unrecognized = received as usize - records.len();
        if unrecognized > 0 {
            tracing::warn!("{} {} rows had an unrecognized type label", unrecognized, family);
        }

        ListingOutcome {
            family,
            records,
            pages_requested,
            total_reported,
            unrecognized,
            stop_reason,
        }
    }

    async fn fetch_page(
        &self,
        family: SourceFamily,
        start: u64,
        length: u64,
        first_sequence: u64,
        filter: &ListingFilter,
    ) -> Result<Page, replycase_api::Error> {
        let endpoint = self.endpoints.list(family);
        let length_usize = length as usize;
        match family {
            SourceFamily::Past | SourceFamily::Late => {
                let mut query = ReplyListQuery::default()
                    .with_start(start)
                    .with_length(length);
                query.reg_date_start = filter.date_start.clone();
                query.reg_date_end = filter.date_end.clone();
                if family == SourceFamily::Past {
                    let resp: ListResponse<PastListRow> =
                        self.client.list_page(endpoint, &query).await?;
                    let rows = resp.data.len().min(length_usize);
                    let records = resp
                        .data
                        .iter()
                        .take(rows)
                        .enumerate()
                        .map(|(i, row)| ListRecord::from_past(first_sequence + i as u64, row))
                        .collect();
                    Ok(Page {
                        total: resp.records_total,
                        rows,
                        records,
                    })
                } else {
                    let resp: ListResponse<LateListRow> =
                        self.client.list_page(endpoint, &query).await?;
                    let rows = resp.data.len().min(length_usize);
                    let records = resp
                        .data
                        .iter()
                        .take(rows)
                        .enumerate()
                        .filter_map(|(i, row)| ListRecord::from_late(first_sequence + i as u64, row))
                        .collect();
                    Ok(Page {
                        total: resp.records_total,
                        rows,
                        records,
                    })
                }
            }
            SourceFamily::Integ => {
                let mut query = IntegListQuery::default()
                    .with_start(start)
                    .with_length(length);
                query.search_type = filter.integ_search_type.clone();
                let resp: ListResponse<IntegListRow> =
                    self.client.list_page(endpoint, &query).await?;
                let rows = resp.data.len().min(length_usize);
                let records = resp
                    .data
                    .iter()
                    .take(rows)
                    .enumerate()
                    .filter_map(|(i, row)| ListRecord::from_integ(first_sequence + i as u64, row))
                    .collect();
                Ok(Page {
                    total: resp.records_total,
                    rows,
                    records,
                })
            }
        }
    }
}

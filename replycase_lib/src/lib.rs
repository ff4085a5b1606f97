//! Library layer for the reply-case harvester: detail-page extraction,
//! paginated listing, concurrent harvesting, and harmonization of the three
//! record families into one table.
//!
//! Wraps the `replycase_api` wire crate with the pipeline that turns listing
//! rows and detail pages into [`model::HarmonizedRecord`]s.

pub mod config;
pub mod detail;
pub mod error;
pub mod extract;
pub mod harmonize;
pub mod harvest;
pub mod model;
pub mod pager;
pub mod parse;
pub mod text;

pub use replycase_api;
pub use replycase_api::types;
pub use replycase_api::types::{RecordType, SourceFamily};

pub use config::{ConfigError, HarvestConfig, RetryPolicy};
pub use detail::{DetailFetcher, FetchError};
pub use error::ReplyCaseError;
pub use extract::{ExtractionReport, FieldExtractor, PageModel};
pub use harmonize::{harmonize, FamilyTable, HarmonizeReport};
pub use harvest::{FailureReport, HarvestOutcome, Harvester};
pub use model::{CombinedRecord, DetailRecord, HarmonizedRecord, ListRecord};
pub use pager::{ListPager, ListingFilter, ListingOutcome, StopReason};

//! Listing response envelope and the per-family row shapes.

use serde::{Deserialize, Serialize};

use super::lenient;

/// DataTables-style listing envelope: a server-reported total and one page of rows.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Total number of rows the listing would return without paging.
    #[serde(default, deserialize_with = "lenient::int")]
    pub records_total: i64,

    /// Rows on this page, in server order.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Row of the pre-2014 reply-case listing.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PastListRow {
    #[serde(default, deserialize_with = "lenient::int")]
    pub rownumber: i64,

    /// Identifier passed as `pastreqIdx` to the detail endpoint.
    #[serde(deserialize_with = "lenient::int")]
    pub pastreq_idx: i64,

    /// Type label; the registry reports these as law interpretations.
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub pastreq_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub pastreq_subject: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub serial_num: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub reg_date: Option<String>,
}

/// Row of the recent law-interpretation / no-action-opinion listing.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LateListRow {
    #[serde(default, deserialize_with = "lenient::int")]
    pub rownumber: i64,

    #[serde(deserialize_with = "lenient::int")]
    pub idx: i64,

    /// `법령해석` or `비조치의견서`.
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub gubun: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub reg_date: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub number: Option<String>,
}

/// Row of the integrated listing.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IntegListRow {
    #[serde(default, deserialize_with = "lenient::int")]
    pub rownumber: i64,

    #[serde(deserialize_with = "lenient::int")]
    pub data_idx: i64,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub pastreq_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub reply_reg_date: Option<String>,
}

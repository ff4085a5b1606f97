//! Endpoint table for the registry: listing paths per family, detail paths
//! per record type, and the fixed parameters every request carries.
//!
//! The table is plain data so it can be loaded from configuration; the
//! [`Default`] impl describes the production site.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::query::DetailRequest;
use crate::types::{RecordType, SourceFamily};

/// One listing endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEndpoint {
    /// Path relative to the base URL.
    pub path: String,
    /// Referer header the listing page's own scripts send.
    pub referer: String,
    /// Menu number of the listing page (`muNo`).
    pub mu_no: String,
}

/// One detail endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEndpoint {
    pub path: String,
    /// Name of the form field carrying the record identifier.
    pub id_param: String,
    pub mu_no: String,
    /// Referer of the listing page the record is opened from. Empty sends none.
    #[serde(default)]
    pub referer: String,
    /// Fixed discriminator parameters sent alongside the identifier.
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEndpoints {
    pub past: ListEndpoint,
    pub late: ListEndpoint,
    pub integ: ListEndpoint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEndpoints {
    pub law_interpretation: DetailEndpoint,
    pub no_action_opinion: DetailEndpoint,
    pub field_proposal: DetailEndpoint,
    pub legacy_past_case: DetailEndpoint,
}

/// The complete endpoint table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub base_url: String,
    /// Site number (`stNo`).
    pub st_no: String,
    /// Action code (`actCd`).
    pub act_cd: String,
    /// Static headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub lists: ListEndpoints,
    pub details: DetailEndpoints,
}

const BASE_URL: &str = "https://better.fsc.go.kr";

fn list_endpoint(path: &str, page: &str, mu_no: &str) -> ListEndpoint {
    ListEndpoint {
        path: path.to_string(),
        referer: format!(
            "{}/fsc_new/replyCase/{}?stNo=11&muNo={}&muGpNo=75",
            BASE_URL, page, mu_no
        ),
        mu_no: mu_no.to_string(),
    }
}

fn detail_endpoint(path: &str, id_param: &str, list: &ListEndpoint) -> DetailEndpoint {
    DetailEndpoint {
        path: path.to_string(),
        id_param: id_param.to_string(),
        mu_no: list.mu_no.clone(),
        referer: list.referer.clone(),
        extra_params: BTreeMap::new(),
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Origin".to_string(), BASE_URL.to_string());
        headers.insert(
            "Accept-Language".to_string(),
            "ko-KR,ko;q=0.9,en-US;q=0.8".to_string(),
        );
        headers.insert("X-Requested-With".to_string(), "XMLHttpRequest".to_string());

        let lists = ListEndpoints {
            past: list_endpoint(
                "/fsc_new/replyCase/selectReplyCasePastReqList.do",
                "PastReqList.do",
                "172",
            ),
            late: list_endpoint(
                "/fsc_new/replyCase/selectReplyCasePastReplyList.do",
                "PastReplyList.do",
                "171",
            ),
            integ: list_endpoint(
                "/fsc_new/replyCase/selectReplyCaseTotalReplyList.do",
                "TotalReplyList.do",
                "117",
            ),
        };

        let mut field_proposal =
            detail_endpoint("/fsc_new/ExmntTaskDetail.do", "checkplaceNo", &lists.integ);
        field_proposal
            .extra_params
            .insert("checkplaceSetIdx".to_string(), "2".to_string());
        let details = DetailEndpoints {
            law_interpretation: detail_endpoint(
                "/fsc_new/replyCase/LawreqDetail.do",
                "lawreqIdx",
                &lists.late,
            ),
            no_action_opinion: detail_endpoint(
                "/fsc_new/replyCase/OpinionDetail.do",
                "opinionIdx",
                &lists.late,
            ),
            field_proposal,
            legacy_past_case: detail_endpoint(
                "/fsc_new/replyCase/PastReqDetail.do",
                "pastreqIdx",
                &lists.past,
            ),
        };

        Self {
            base_url: BASE_URL.to_string(),
            st_no: "11".to_string(),
            act_cd: "R".to_string(),
            headers,
            lists,
            details,
        }
    }
}

impl Endpoints {
    /// Listing endpoint for a family.
    pub fn list(&self, family: SourceFamily) -> &ListEndpoint {
        match family {
            SourceFamily::Past => &self.lists.past,
            SourceFamily::Late => &self.lists.late,
            SourceFamily::Integ => &self.lists.integ,
        }
    }

    /// Detail endpoint for a record type.
    pub fn detail(&self, record_type: RecordType) -> &DetailEndpoint {
        match record_type {
            RecordType::LawInterpretation => &self.details.law_interpretation,
            RecordType::NoActionOpinion => &self.details.no_action_opinion,
            RecordType::FieldProposal => &self.details.field_proposal,
            RecordType::LegacyPastCase => &self.details.legacy_past_case,
        }
    }

    /// Shapes the detail request for one record: `muNo`, `stNo`, the
    /// type's identifier field, any fixed extras, then `actCd`.
    pub fn detail_request(&self, record_type: RecordType, record_id: i64) -> DetailRequest {
        let endpoint = self.detail(record_type);
        let mut form = vec![
            ("muNo".to_string(), endpoint.mu_no.clone()),
            ("stNo".to_string(), self.st_no.clone()),
            (endpoint.id_param.clone(), record_id.to_string()),
        ];
        for (key, value) in &endpoint.extra_params {
            form.push((key.clone(), value.clone()));
        }
        form.push(("actCd".to_string(), self.act_cd.clone()));
        DetailRequest {
            path: endpoint.path.clone(),
            form,
            referer: Some(endpoint.referer.clone()).filter(|r| !r.is_empty()),
        }
    }
}

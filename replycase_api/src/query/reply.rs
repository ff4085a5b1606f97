use super::common::{Query, QueryCommon};

/// Query for the date-filtered reply listings (the past and late families).
#[derive(Clone, Debug, Default)]
pub struct ReplyListQuery {
    pub common: QueryCommon,
    /// Inclusive lower bound on the registration date, `YYYY-MM-DD`.
    pub reg_date_start: Option<String>,
    /// Inclusive upper bound on the registration date, `YYYY-MM-DD`.
    pub reg_date_end: Option<String>,
}

impl Query for ReplyListQuery {
    fn get_common(&mut self) -> &mut QueryCommon {
        &mut self.common
    }
    fn common(&self) -> &QueryCommon {
        &self.common
    }
    fn add_to_form(&self, form: &mut Vec<(String, String)>) {
        self.common.add_to_form(form);
        if let Some(start) = &self.reg_date_start {
            form.push(("searchReplyRegDateStart".to_string(), start.clone()));
        }
        if let Some(end) = &self.reg_date_end {
            form.push(("searchReplyRegDateEnd".to_string(), end.clone()));
        }
    }
}

impl ReplyListQuery {
    pub fn with_reg_date_start(mut self, date: &str) -> Self {
        self.reg_date_start = Some(date.to_string());
        self
    }

    pub fn with_reg_date_end(mut self, date: &str) -> Self {
        self.reg_date_end = Some(date.to_string());
        self
    }
}

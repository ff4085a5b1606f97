use super::common::{Query, QueryCommon};

/// Columns the integrated listing's DataTables front end declares.
const COLUMNS: [&str; 4] = ["rownumber", "pastreqType", "title", "replyRegDate"];

/// Query for the integrated listing.
///
/// The endpoint ignores date filters; only `searchType` and the keyword
/// change the result set. The column descriptors must be present or the
/// server answers with an empty page.
#[derive(Clone, Debug, Default)]
pub struct IntegListQuery {
    pub common: QueryCommon,
    pub search_type: Option<String>,
    pub search_keyword: Option<String>,
}

impl Query for IntegListQuery {
    fn get_common(&mut self) -> &mut QueryCommon {
        &mut self.common
    }
    fn common(&self) -> &QueryCommon {
        &self.common
    }
    fn add_to_form(&self, form: &mut Vec<(String, String)>) {
        self.common.add_to_form(form);
        for (i, column) in COLUMNS.iter().enumerate() {
            let key = |suffix: &str| format!("columns[{}]{}", i, suffix);
            form.push((key("[data]"), column.to_string()));
            form.push((key("[name]"), String::new()));
            form.push((key("[searchable]"), "true".to_string()));
            form.push((key("[orderable]"), "false".to_string()));
            form.push((key("[search][value]"), String::new()));
            form.push((key("[search][regex]"), "false".to_string()));
        }
        form.push(("order[0][column]".to_string(), "0".to_string()));
        form.push(("order[0][dir]".to_string(), "asc".to_string()));
        form.push(("search[value]".to_string(), "title".to_string()));
        form.push(("search[regex]".to_string(), String::new()));
        form.push((
            "searchKeyword".to_string(),
            self.search_keyword.clone().unwrap_or_default(),
        ));
        form.push(("searchCondition".to_string(), String::new()));
        form.push((
            "searchType".to_string(),
            self.search_type.clone().unwrap_or_default(),
        ));
    }
}

impl IntegListQuery {
    pub fn with_search_type(mut self, search_type: &str) -> Self {
        self.search_type = Some(search_type.to_string());
        self
    }

    pub fn with_search_keyword(mut self, keyword: &str) -> Self {
        self.search_keyword = Some(keyword.to_string());
        self
    }
}

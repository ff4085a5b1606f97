/// A fully shaped detail-page request: endpoint path plus form body.
///
/// Built by [`crate::Endpoints::detail_request`], which knows each record
/// type's identifier parameter name and fixed extra parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailRequest {
    pub path: String,
    pub form: Vec<(String, String)>,
    /// Referer header to send, if any.
    pub referer: Option<String>,
}

impl DetailRequest {
    /// Looks up a form value by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

//! Shared query infrastructure: the [`Query`] trait and the [`QueryCommon`] paging fields.

/// Trait implemented by all listing query builders. Provides form
/// serialization and shared builder methods for DataTables paging.
pub trait Query {
    /// Appends this query's parameters to the form body.
    fn add_to_form(&self, form: &mut Vec<(String, String)>);

    /// Returns a mutable reference to the common paging fields.
    fn get_common(&mut self) -> &mut QueryCommon;

    /// Returns the common paging fields.
    fn common(&self) -> &QueryCommon;

    /// Serializes the query into an ordered list of form pairs.
    fn to_form(&self) -> Vec<(String, String)> {
        let mut form = Vec::new();
        self.add_to_form(&mut form);
        form
    }

    /// Sets the zero-based row offset of the requested page.
    fn with_start(mut self, start: u64) -> Self
    where
        Self: Sized,
    {
        self.get_common().start = start;
        self
    }

    /// Sets the number of rows requested.
    fn with_length(mut self, length: u64) -> Self
    where
        Self: Sized,
    {
        self.get_common().length = length;
        self
    }

    /// Sets the DataTables draw counter echoed back by the server.
    fn with_draw(mut self, draw: u64) -> Self
    where
        Self: Sized,
    {
        self.get_common().draw = draw;
        self
    }
}

/// Fields shared by all listing queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryCommon {
    /// DataTables draw counter. Defaults to 1.
    pub draw: u64,
    /// Zero-based offset of the first row. Defaults to 0.
    pub start: u64,
    /// Rows per page. Defaults to 10, the registry's own page size.
    pub length: u64,
}

impl Default for QueryCommon {
    fn default() -> QueryCommon {
        QueryCommon {
            draw: 1,
            start: 0,
            length: 10,
        }
    }
}

impl QueryCommon {
    /// Appends the paging parameters to the form body.
    pub fn add_to_form(&self, form: &mut Vec<(String, String)>) {
        form.push(("draw".to_string(), self.draw.to_string()));
        form.push(("start".to_string(), self.start.to_string()));
        form.push(("length".to_string(), self.length.to_string()));
    }
}

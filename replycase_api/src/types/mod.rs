mod lenient;

mod record;
pub use self::record::{RecordType, SourceFamily, UnknownVariant};

mod list;
pub use self::list::{IntegListRow, LateListRow, ListResponse, PastListRow};

mod common;
pub use self::common::{Query, QueryCommon};

mod reply;
pub use self::reply::ReplyListQuery;

mod integ;
pub use self::integ::IntegListQuery;

mod detail;
pub use self::detail::DetailRequest;

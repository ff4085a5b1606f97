mod client;
pub mod endpoints;
mod errors;
mod query;
pub mod types;
pub mod user_agent;
pub use self::client::{Client, ClientBuilder};
pub use self::endpoints::{DetailEndpoint, DetailEndpoints, Endpoints, ListEndpoint, ListEndpoints};
pub use self::errors::Error;
pub use self::query::{DetailRequest, IntegListQuery, Query, QueryCommon, ReplyListQuery};

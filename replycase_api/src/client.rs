//! HTTP client for the reply-case registry.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, REFERER};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    endpoints::{Endpoints, ListEndpoint},
    query::{DetailRequest, Query},
    types::ListResponse,
    user_agent::get_user_agent,
    Error,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Connection-pooled client for the registry's listing and detail endpoints.
///
/// The underlying `reqwest::Client` is built once and shared; clone the
/// `Client` (cheap, reference-counted) to hand it to worker tasks.
#[derive(Clone, Debug)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    base_url: String,
    timeout: Duration,
    pool_max_idle_per_host: usize,
    headers: Vec<(String, String)>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        let endpoints = Endpoints::default();
        Self {
            base_url: endpoints.base_url,
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 16,
            headers: endpoints.headers.into_iter().collect(),
        }
    }
}

impl ClientBuilder {
    /// Overrides the base URL. Used for testing with wiremock.
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Idle connections kept per host; match this to the worker count.
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_max_idle_per_host = size;
        self
    }

    /// Replaces the static headers sent with every request.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        Url::parse(&self.base_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Build(format!("header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Build(format!("header value {:?}: {}", value, e)))?;
            default_headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .default_headers(default_headers)
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::Build(e.to_string())
            })?;

        Ok(Client {
            base_url: self.base_url,
            http,
        })
    }
}

impl Client {
    /// Creates a client for the production registry with default settings.
    pub fn new() -> Result<Self, Error> {
        ClientBuilder::default().build()
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        ClientBuilder::default().base_url(base_url).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_url(&self, path: &str) -> Result<Url, Error> {
        Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidUrl(format!("{}{}: {}", self.base_url, path, e))
        })
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
        referer: Option<&str>,
    ) -> Result<String, Error> {
        let url = self.get_url(path)?;
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .form(form);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::error!("Request to {} timed out", path);
                Error::Timeout
            } else {
                tracing::error!("Failed to send request to {}: {}", path, e);
                Error::RequestFailed(e.to_string())
            }
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                tracing::error!("Failed to read response body: {}", e);
                Error::RequestFailed(e.to_string())
            }
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        Ok(body)
    }

    /// Fetches one page of a listing endpoint.
    pub async fn list_page<T, Q>(
        &self,
        endpoint: &ListEndpoint,
        query: &Q,
    ) -> Result<ListResponse<T>, Error>
    where
        T: DeserializeOwned,
        Q: Query,
    {
        let body = self
            .post_form(&endpoint.path, &query.to_form(), Some(&endpoint.referer))
            .await?;
        serde_json::from_str::<ListResponse<T>>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse listing: {} | body: {}", e, snippet);
            Error::Decode(e.to_string())
        })
    }

    /// Fetches a detail page and returns its raw HTML.
    pub async fn get_detail(&self, request: &DetailRequest) -> Result<String, Error> {
        self.post_form(&request.path, &request.form, request.referer.as_deref())
            .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

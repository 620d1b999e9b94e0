//! Pipedrive person API client
//!
//! [`PersonDirectory`] is the seam between the sync pipeline and the CRM.
//! [`PipedriveClient`] implements it over HTTP:
//!
//! | Operation | Request                                                             |
//! |-----------|---------------------------------------------------------------------|
//! | search    | `GET  {base}/persons/search?term=..&fields=name&exact_match=true`   |
//! | create    | `POST {base}/persons`                                               |
//! | update    | `PUT  {base}/persons/{id}`                                          |
//!
//! Every request carries `api_token` as a query parameter. Nothing is retried.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::PipedriveConfig;
use crate::error::{Error, Result};
use crate::mapping::PersonPayload;
use crate::person::{Envelope, Person, PersonId, SearchData};

/// Remote call kinds, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    /// Exact-match person search
    Search,
    /// Person creation
    Create,
    /// Person update
    Update,
}

impl RemoteOperation {
    /// Lowercase operation name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Person storage in the CRM
#[async_trait]
pub trait PersonDirectory: Send + Sync {
    /// Find the first person whose name matches `name` exactly
    async fn find_by_name(&self, name: &str) -> Result<Option<Person>>;

    /// Create a person
    async fn create_person(&self, payload: &PersonPayload) -> Result<Person>;

    /// Update the person with `id`
    async fn update_person(&self, id: PersonId, payload: &PersonPayload) -> Result<Person>;
}

/// HTTP client for the Pipedrive v1 person API
pub struct PipedriveClient {
    base_url: String,
    api_token: String,
    http: Client,
}

impl fmt::Debug for PipedriveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipedriveClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl PipedriveClient {
    /// Build a client from validated connection settings
    pub fn new(config: &PipedriveConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config.resolve_base_url()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("crmsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            http,
        })
    }

    /// API root every endpoint is relative to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send `request` and unwrap the `data` member of the response.
    ///
    /// `url` is only used for logging and never carries the token.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: RemoteOperation,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>> {
        debug!(%operation, %url, "Sending Pipedrive request");

        let response = request
            .query(&[("api_token", self.api_token.as_str())])
            .send()
            .await
            .map_err(|e| Error::remote(operation, transport_message(e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::remote(operation, transport_message(e)))?;

        debug!(%operation, status = status.as_u16(), "Received Pipedrive response");

        let json: Option<Value> = serde_json::from_str(&body).ok();
        let rejected = json
            .as_ref()
            .and_then(|b| b.get("success"))
            .and_then(Value::as_bool)
            == Some(false);

        if !status.is_success() || rejected {
            return Err(Error::remote(
                operation,
                failure_message(status, json.as_ref()),
            ));
        }

        let json =
            json.ok_or_else(|| Error::remote(operation, "response body is not valid JSON"))?;
        let envelope: Envelope<T> = serde_json::from_value(json).map_err(|e| {
            Error::remote(operation, format!("unexpected response shape: {e}"))
        })?;

        Ok(envelope.data)
    }
}

#[async_trait]
impl PersonDirectory for PipedriveClient {
    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> Result<Option<Person>> {
        let url = self.endpoint("persons/search");
        let request = self.http.get(&url).query(&[
            ("term", name),
            ("fields", "name"),
            ("exact_match", "true"),
        ]);

        let data: Option<SearchData> = self.execute(RemoteOperation::Search, &url, request).await?;
        let found = data
            .and_then(|d| d.items.into_iter().next())
            .map(|hit| hit.item);

        debug!(found = found.as_ref().map(|p| p.id.get()), "Person search complete");
        Ok(found)
    }

    #[instrument(skip(self, payload), fields(fields = payload.len()))]
    async fn create_person(&self, payload: &PersonPayload) -> Result<Person> {
        let url = self.endpoint("persons");
        let request = self.http.post(&url).json(payload);

        self.execute(RemoteOperation::Create, &url, request)
            .await?
            .ok_or_else(|| {
                Error::remote(
                    RemoteOperation::Create,
                    "response did not contain a person record",
                )
            })
    }

    #[instrument(skip(self, payload), fields(fields = payload.len()))]
    async fn update_person(&self, id: PersonId, payload: &PersonPayload) -> Result<Person> {
        let url = self.endpoint(&format!("persons/{id}"));
        let request = self.http.put(&url).json(payload);

        self.execute(RemoteOperation::Update, &url, request)
            .await?
            .ok_or_else(|| {
                Error::remote(
                    RemoteOperation::Update,
                    "response did not contain a person record",
                )
            })
    }
}

/// Describe a transport failure without leaking the request URL.
fn transport_message(error: reqwest::Error) -> String {
    let error = error.without_url();
    let kind = if error.is_timeout() {
        "request timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "transport error"
    };

    let mut message = format!("{kind}: {error}");
    let mut source = std::error::Error::source(&error);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = std::error::Error::source(inner);
    }
    message
}

/// Prefer the CRM's own error text, then the HTTP status, then a fallback.
fn failure_message(status: StatusCode, body: Option<&Value>) -> String {
    match (str_field(body, "error"), str_field(body, "error_info")) {
        (Some(error), Some(info)) => format!("HTTP {status}: {error} ({info})"),
        (Some(error), None) => format!("HTTP {status}: {error}"),
        (None, _) if !status.is_success() => format!("HTTP {status}"),
        (None, _) => "unexpected response".to_string(),
    }
}

fn str_field<'a>(body: Option<&'a Value>, key: &str) -> Option<&'a str> {
    body.and_then(|b| b.get(key)).and_then(Value::as_str)
}

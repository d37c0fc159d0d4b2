use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use leadsflow_common::{Lead, LeadPatch, NewLead};
use reqwest::{Method, RequestBuilder, Url};
use serde_json::json;
use tracing::debug;

use super::schema;
use super::{ApiError, ApiResult, ImportSummary, LeadsApi, RemoteSettings};

const USER_AGENT: &str = concat!("leadsflow/", env!("CARGO_PKG_VERSION"));

/// `LeadsApi` over the backend's JSON REST endpoints.
pub struct HttpLeadsApi {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpLeadsApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry paths: {}", base_url);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build `<base>/api/<segments...>`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!(%method, %url, "Leads API request");
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and collect status + body. Transport failures (no response at all)
    /// classify as `Unavailable`.
    async fn send(&self, builder: RequestBuilder) -> ApiResult<(u16, Vec<u8>)> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::unavailable(format!("timed out reading response: {}", e))
            } else {
                ApiError::invalid_response(format!("failed to read response body: {}", e))
            }
            .with_status(status)
        })?;
        debug!(status, bytes = body.len(), "Leads API response");
        Ok((status, body.to_vec()))
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::unavailable(format!("request timed out: {}", e))
    } else if e.is_connect() {
        ApiError::unavailable(format!("connection failed: {}", e))
    } else if e.is_builder() {
        ApiError::rejected(format!("invalid request: {}", e))
    } else {
        ApiError::unavailable(format!("request failed: {}", e))
    }
}

#[async_trait]
impl LeadsApi for HttpLeadsApi {
    async fn list_leads(&self) -> ApiResult<Vec<Lead>> {
        let (status, body) = self.send(self.request(Method::GET, &["leads"])).await?;
        schema::decode_leads(status, &body)
    }

    async fn get_lead(&self, id: &str) -> ApiResult<Lead> {
        let (status, body) = self.send(self.request(Method::GET, &["leads", id])).await?;
        schema::decode_field(status, &body, "lead")
    }

    async fn create_lead(&self, lead: &NewLead) -> ApiResult<Lead> {
        let req = self.request(Method::POST, &["leads"]).json(lead);
        let (status, body) = self.send(req).await?;
        schema::decode_field(status, &body, "lead")
    }

    async fn update_lead(&self, id: &str, patch: &LeadPatch) -> ApiResult<Lead> {
        let req = self.request(Method::PATCH, &["leads", id]).json(patch);
        let (status, body) = self.send(req).await?;
        schema::decode_field(status, &body, "lead")
    }

    async fn delete_lead(&self, id: &str) -> ApiResult<()> {
        let (status, body) = self.send(self.request(Method::DELETE, &["leads", id])).await?;
        schema::decode_ack(status, &body)
    }

    async fn import_leads(&self, leads: &[NewLead]) -> ApiResult<ImportSummary> {
        let req = self
            .request(Method::POST, &["leads", "import"])
            .json(&json!({ "leads": leads }));
        let (status, body) = self.send(req).await?;
        schema::decode_object(status, &body)
    }

    async fn remove_duplicates(&self) -> ApiResult<usize> {
        let req = self.request(Method::POST, &["leads", "remove-duplicates"]);
        let (status, body) = self.send(req).await?;
        schema::decode_field(status, &body, "removed")
    }

    async fn get_settings(&self) -> ApiResult<RemoteSettings> {
        let (status, body) = self.send(self.request(Method::GET, &["settings"])).await?;
        schema::decode_field(status, &body, "settings")
    }

    async fn save_settings(&self, settings: &RemoteSettings) -> ApiResult<()> {
        let req = self
            .request(Method::PUT, &["settings"])
            .json(&json!({ "settings": settings }));
        let (status, body) = self.send(req).await?;
        schema::decode_ack(status, &body)
    }
}

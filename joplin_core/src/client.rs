// src/client.rs
//
// HTTP client for the Joplin Data API. Carries the connection-resilience
// layer: connect failures trigger at most one launch-and-retry cycle, and
// list endpoints are aggregated through a capped paginator.
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::JoplinConfig;
use crate::error::ConnectorError;
use crate::launcher::{AppLauncher, DesktopLauncher};

/// Generous timeout for a local service; large note bodies can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Grace period between issuing a launch command and retrying the request.
const LAUNCH_WAIT: Duration = Duration::from_secs(2);
/// Only retry once to avoid masking other issues.
const MAX_LAUNCH_RETRIES: u32 = 1;

/// Largest per-page size the Joplin API serves.
const SERVER_PAGE_MAX: usize = 100;
/// Hard ceiling on pages fetched in one aggregation, whatever the server
/// claims about further pages.
const MAX_PAGES: u32 = 50;

/// One page of a Joplin list endpoint. The API answers either with an
/// `{items, has_more}` envelope or (older endpoints) a bare array; the
/// shape is resolved once per page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListPage<T> {
    Envelope {
        items: Vec<T>,
        #[serde(default)]
        has_more: bool,
    },
    Bare(Vec<T>),
}

impl<T> ListPage<T> {
    /// Items of this page regardless of shape.
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListPage::Envelope { items, .. } => items,
            ListPage::Bare(items) => items,
        }
    }
}

pub struct ApiClient {
    config: JoplinConfig,
    http: reqwest::Client,
    launcher: Arc<dyn AppLauncher>,
}

impl ApiClient {
    /// Client for one operation, configured from the environment.
    pub fn from_env() -> Result<Self, ConnectorError> {
        Ok(Self::new(JoplinConfig::from_env()?))
    }

    pub fn new(config: JoplinConfig) -> Self {
        Self::with_launcher(config, Arc::new(DesktopLauncher))
    }

    pub fn with_launcher(config: JoplinConfig, launcher: Arc<dyn AppLauncher>) -> Self {
        ApiClient {
            config,
            http: reqwest::Client::new(),
            launcher,
        }
    }

    pub fn config(&self) -> &JoplinConfig {
        &self.config
    }

    /// Issue a request against the Joplin API. 204 or an empty body yields
    /// `None`; any other 2xx yields the parsed JSON body.
    ///
    /// On a connect-class failure with auto-launch enabled, the desktop app
    /// is probed, launched if absent, and the same request retried exactly
    /// once after a short grace period. Any other failure, or a second
    /// connect failure, propagates unchanged.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        params: &[(&str, String)],
    ) -> Result<Option<Value>, ConnectorError> {
        let mut attempt: u32 = 0;
        loop {
            match self.send(method.clone(), endpoint, body, params).await {
                Ok(value) => return Ok(value),
                Err(err)
                    if err.is_connect()
                        && self.config.auto_launch
                        && attempt < MAX_LAUNCH_RETRIES =>
                {
                    attempt += 1;
                    if self.launcher.is_running().await {
                        // Running but unreachable: a launch would not help.
                        return Err(err);
                    }
                    if !self.launcher.launch() {
                        return Err(err);
                    }
                    debug!(endpoint, "Launched Joplin, retrying request");
                    // Give Joplin time to start and bring up the Web Clipper.
                    tokio::time::sleep(LAUNCH_WAIT).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Like `request`, but an empty response is an error and the body is
    /// deserialized into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        params: &[(&str, String)],
    ) -> Result<T, ConnectorError> {
        let value = self
            .request(method, endpoint, body, params)
            .await?
            .ok_or_else(|| {
                ConnectorError::InternalError(format!("Empty response from {}", endpoint))
            })?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        params: &[(&str, String)],
    ) -> Result<Option<Value>, ConnectorError> {
        let url = format!("{}/{}", self.config.base_url, endpoint);
        debug!(%method, %url, "Joplin API request");

        let mut request = self
            .http
            .request(method, &url)
            .query(params)
            // The Data API authenticates via a token query parameter.
            .query(&[("token", self.config.token.as_str())])
            .timeout(REQUEST_TIMEOUT);
        if let Some(json_body) = body {
            request = request.json(json_body);
        }

        let response = request.send().await.map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ConnectorError::Authentication(format!(
                    "status {}: {}",
                    status.as_u16(),
                    body_text
                )),
                404 => ConnectorError::ResourceNotFound,
                code => ConnectorError::RequestFailed {
                    status: code,
                    body: body_text,
                },
            });
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await.map_err(classify_transport_error)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Fetch every page of a list endpoint, concatenating items.
    ///
    /// The loop ends when the envelope reports no more pages, a bare-array
    /// page comes back short, the response shape is unrecognized, or the
    /// page ceiling is reached. `limit` caps the final result; 0 means
    /// unbounded.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        limit: usize,
    ) -> Result<Vec<T>, ConnectorError> {
        let per_page = if limit == 0 {
            SERVER_PAGE_MAX
        } else {
            limit.min(SERVER_PAGE_MAX)
        };

        let mut items: Vec<T> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut query: Vec<(&str, String)> = params.to_vec();
            query.push(("page", page.to_string()));
            query.push(("limit", per_page.to_string()));

            let Some(result) = self.request(Method::GET, endpoint, None, &query).await? else {
                break;
            };

            match serde_json::from_value::<ListPage<T>>(result) {
                Ok(ListPage::Envelope { items: batch, has_more }) => {
                    items.extend(batch);
                    if !has_more {
                        break;
                    }
                }
                Ok(ListPage::Bare(batch)) => {
                    let got = batch.len();
                    items.extend(batch);
                    // A short page signals the last one.
                    if got < per_page {
                        break;
                    }
                }
                Err(err) => {
                    warn!(endpoint, %err, "Unexpected list response shape, stopping pagination");
                    break;
                }
            }

            page += 1;
            if page > MAX_PAGES {
                debug!(endpoint, "Pagination page ceiling reached");
                break;
            }
        }

        if limit > 0 {
            items.truncate(limit);
        }
        Ok(items)
    }
}

fn classify_transport_error(err: reqwest::Error) -> ConnectorError {
    if err.is_connect() {
        ConnectorError::Connection(err.to_string())
    } else if err.is_timeout() {
        ConnectorError::Timeout(err.to_string())
    } else {
        ConnectorError::HttpRequest(err)
    }
}

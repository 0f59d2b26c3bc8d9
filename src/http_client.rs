use anyhow::{Context, Result as AnyResult};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::multipart::Form;
use reqwest::{Client, Method, Request, Response, Url};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Which pre-configured client a request goes through
///
/// `Req` and `Res` are the two intercepted channels; `Plain` is the defaults
/// client used by the auth endpoints themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Req,
    Res,
    Plain,
}

/// A rebuildable description of one request
///
/// Multipart bodies are streams and can't be cloned once built, so replays
/// rebuild the request from this instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub method: Method,
    pub path: String,
    pub fields: Option<Vec<(String, String)>>,
}

impl RequestConfig {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            fields: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a multipart form field
    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.to_string()));
        self
    }
}

/// HTTP client wrapper for the social API
/// All channels share one cookie jar so auth cookies set by login/refresh
/// are sent by every channel.
pub struct ApiClient {
    req: Client,
    res: Client,
    plain: Client,

    /// Base origin, always ends with '/'
    base_url: Url,

    jar: Arc<Jar>,
}

impl ApiClient {
    /// Create the client set for a base origin
    pub fn new(base_url: &str, connect_timeout: u64, request_timeout: u64) -> AnyResult<Self> {
        let base_url = normalize_base_url(base_url)?;
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let build = || {
            Client::builder()
                .cookie_provider(Arc::clone(&jar))
                .default_headers(headers.clone())
                .connect_timeout(Duration::from_secs(connect_timeout))
                .timeout(Duration::from_secs(request_timeout))
                .build()
                .context("Failed to create HTTP client")
        };

        let req = build()?;
        let res = build()?;
        let plain = build()?;

        Ok(Self {
            req,
            res,
            plain,
            base_url,
            jar,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Cookie jar shared by every channel
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    fn client(&self, channel: Channel) -> &Client {
        match channel {
            Channel::Req => &self.req,
            Channel::Res => &self.res,
            Channel::Plain => &self.plain,
        }
    }

    /// Resolve a path against the base origin
    /// Leading slashes are ignored, so "/followers/" and "followers/" both
    /// land under the base path.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid request path: {}", path))
            .map_err(ClientError::Internal)
    }

    /// Build a concrete request, POST fields go out as multipart form data
    pub fn build(&self, channel: Channel, config: &RequestConfig) -> Result<Request> {
        let url = self.url(&config.path)?;
        let mut builder = self.client(channel).request(config.method.clone(), url);

        if let Some(ref fields) = config.fields {
            let form = fields
                .iter()
                .fold(Form::new(), |form, (name, value)| {
                    form.text(name.clone(), value.clone())
                });
            builder = builder.multipart(form);
        }

        Ok(builder.build()?)
    }

    /// Send a request on a channel without any interception
    /// Non-success statuses become `ClientError::Api`.
    pub async fn execute(&self, channel: Channel, config: &RequestConfig) -> Result<Response> {
        let request = self.build(channel, config)?;

        tracing::debug!(
            channel = ?channel,
            method = %request.method(),
            url = %request.url(),
            "Sending HTTP request"
        );

        let response = match self.client(channel).execute(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    error_kind = error_kind(&e),
                    error = %e,
                    path = %config.path,
                    "HTTP request error"
                );
                return Err(ClientError::Transport(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, "Request successful");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            status = status.as_u16(),
            path = %config.path,
            response_body = %body,
            "Received error response"
        );

        Err(ClientError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// Categorize a transport error for logging
fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

fn normalize_base_url(base_url: &str) -> AnyResult<Url> {
    let mut url =
        Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

use futures::{StreamExt, TryStreamExt};
use reqwest::{header::{HeaderMap, AUTHORIZATION}, Client, Url};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::{BoxError, FragmentStream, TextSource, Utf8Fragments};

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Upstream answered with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Clone, Debug)]
pub enum AuthMethod {
    BearerToken(String),
    ApiKey { key: String, header: String },
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub auth: Option<AuthMethod>,
    /// Name of the JSON body field that carries the prompt.
    pub prompt_field: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            timeout: Duration::from_secs(300),
            auth: None,
            prompt_field: "prompt".into(),
        }
    }
}

/// Text generator reached over HTTP: the prompt is POSTed as JSON and the
/// response body is streamed back as text fragments.
pub struct HttpTextSource {
    client: Client,
    url: Url,
    config: HttpConfig,
}

impl HttpTextSource {
    pub fn new(url: &str, config: HttpConfig) -> Result<Self, ConnectorError> {
        let url = Url::parse(url).map_err(|e| ConnectorError::Config(e.to_string()))?;
        let client = Client::builder()
            .default_headers(config.headers.clone())
            .build()?;
        Ok(Self { client, url, config })
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            Some(AuthMethod::BearerToken(token)) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            Some(AuthMethod::ApiKey { key, header }) => request.header(header.as_str(), key.as_str()),
            None => request,
        }
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let body = HashMap::from([(self.config.prompt_field.as_str(), prompt)]);
        let request = self
            .client
            .post(self.url.clone())
            .timeout(self.config.timeout)
            .json(&body);
        self.apply_auth(request)
    }
}

impl TextSource for HttpTextSource {
    fn stream(&self, prompt: &str) -> FragmentStream {
        let request = self.request(prompt);
        let url = self.url.clone();

        let body = async move {
            debug!("Requesting {}", url);
            let response = request.send().await.map_err(ConnectorError::from)?;
            if !response.status().is_success() {
                return Err(ConnectorError::Status(response.status()));
            }
            Ok::<_, ConnectorError>(response.bytes_stream().map_err(ConnectorError::from))
        };

        let bytes = futures::stream::once(body)
            .try_flatten()
            .map_err(BoxError::from);
        Utf8Fragments::new(Box::pin(bytes)).boxed()
    }
}

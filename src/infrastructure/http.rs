//! HTTP implementation of the parser backend.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::ServerConfig;
use crate::infrastructure::error::{InfraError, InfraResult, RemoteError};
use crate::infrastructure::traits::ParserBackend;

#[derive(Serialize)]
struct SaveCodeRequest<'a> {
    code: &'a str,
}

/// Talks to the parser service over HTTP.
///
/// Timeouts are applied per call by the submission pipeline, not here.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    server: ServerConfig,
}

impl HttpBackend {
    pub fn new(server: ServerConfig) -> InfraResult<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InfraError::Client {
                message: e.to_string(),
            })?;
        Ok(Self { client, server })
    }

    /// Join the base URL and an endpoint path with exactly one slash.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.server.base_url, path)
    }

    async fn get_text(&self, path: &str) -> Result<String, RemoteError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        let response = check_status(&url, response)?;
        response.text().await.map_err(|e| RemoteError::transport(&url, e))
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn check_status(url: &str, response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RemoteError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl ParserBackend for HttpBackend {
    #[instrument(level = "debug", skip(self, code), fields(bytes = code.len()))]
    async fn save_code(&self, code: &str) -> Result<(), RemoteError> {
        let url = self.url(&self.server.save_path);
        let response = self
            .client
            .post(&url)
            .json(&SaveCodeRequest { code })
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        check_status(&url, response).map(|_| ())
    }

    #[instrument(level = "debug", skip(self))]
    async fn run_parser(&self) -> Result<(), RemoteError> {
        let url = self.url(&self.server.parse_path);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        check_status(&url, response).map(|_| ())
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_tree(&self) -> Result<String, RemoteError> {
        self.get_text(&self.server.tree_path).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_trace(&self) -> Result<String, RemoteError> {
        self.get_text(&self.server.trace_path).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_sample(&self) -> Result<String, RemoteError> {
        self.get_text(&self.server.sample_path).await
    }
}

// ABOUTME: HTTP client for the platform API.
// ABOUTME: Implements every API-backed collaborator the deploy flow needs.

use super::error::ApiError;
use super::types::{
    AppConfigResponse, DeployImageInput, DeployImageResponse, DeploymentStatus, Release,
    ReleaseCommandStatus, RemoteBuilderInfo,
};
use super::{ReleaseApi, StatusApi};
use crate::build::BuilderLocator;
use crate::config::{ConfigSource, Definition};
use crate::types::{AppName, EvaluationId, ReleaseCommandId, ReleaseId};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use urlencoding::encode;

/// Authenticated client for the platform's REST API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hoist/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        tracing::debug!(%path, "GET");
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;
        decode(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(%path, "POST");
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: message.trim().to_string(),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl ReleaseApi for ApiClient {
    async fn deploy_image(&self, input: &DeployImageInput) -> Result<DeployImageResponse, ApiError> {
        self.post(&format!("apps/{}/releases", encode(input.app.as_str())), input)
            .await
    }

    async fn get_release(&self, app: &AppName, id: &ReleaseId) -> Result<Release, ApiError> {
        self.get(&format!(
            "apps/{}/releases/{}",
            encode(app.as_str()),
            encode(id.as_str())
        ))
        .await
    }
}

#[async_trait]
impl StatusApi for ApiClient {
    async fn release_command_status(
        &self,
        id: &ReleaseCommandId,
    ) -> Result<ReleaseCommandStatus, ApiError> {
        self.get(&format!("release_commands/{}", encode(id.as_str())))
            .await
    }

    async fn deployment_status(
        &self,
        evaluation: &EvaluationId,
    ) -> Result<DeploymentStatus, ApiError> {
        self.get(&format!("evaluations/{}/deployment", encode(evaluation.as_str())))
            .await
    }
}

#[async_trait]
impl ConfigSource for ApiClient {
    async fn fetch_config(&self, app: &AppName) -> Result<Definition, ApiError> {
        let response: AppConfigResponse = self
            .get(&format!("apps/{}/config", encode(app.as_str())))
            .await?;
        Ok(response.definition)
    }
}

#[async_trait]
impl BuilderLocator for ApiClient {
    async fn remote_builder(&self, app: &AppName) -> Result<RemoteBuilderInfo, ApiError> {
        self.get(&format!("apps/{}/remote_builder", encode(app.as_str())))
            .await
    }
}

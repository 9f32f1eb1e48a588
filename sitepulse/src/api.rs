//! REST client for the blog backend: health polling, comments and votes.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};
use crate::types::{ApiEnvelope, Comment, HealthData, HealthSnapshot, VoteRequest, VoteTally};

pub const HEALTH_PATH: &str = "health";

/// What a vote targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post,
    Comment,
}

impl VoteTarget {
    fn segment(self) -> &'static str {
        match self {
            VoteTarget::Post => "posts",
            VoteTarget::Comment => "comments",
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ClientError::invalid_url(base_url, e))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::invalid_url(
                base_url.as_str(),
                "expected http or https",
            ));
        }
        // join() treats the last segment as a file unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::invalid_url(path, e))
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        req: RequestBuilder,
    ) -> Result<ApiEnvelope<T>> {
        let response = self.authed(req).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: ApiEnvelope<T> = response.json().await?;
        debug!(path, success = envelope.success, "api response");
        Ok(envelope)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiEnvelope<T>> {
        let url = self.endpoint(path)?;
        self.send(path, self.client.get(url)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>> {
        let url = self.endpoint(path)?;
        self.send(path, self.client.post(url).json(body)).await
    }

    /// `GET /health`, converted into a snapshot.
    pub async fn health(&self) -> Result<HealthSnapshot> {
        let env: ApiEnvelope<HealthData> = self.get(HEALTH_PATH).await?;
        match (env.success, env.data) {
            (true, Some(data)) => Ok(HealthSnapshot::from_response(data, env.meta)),
            _ => Err(ClientError::Envelope {
                endpoint: HEALTH_PATH.into(),
            }),
        }
    }

    /// Flat comment list for a post; see [`crate::comments::CommentTree`].
    pub async fn comments(&self, post_id: u64) -> Result<Vec<Comment>> {
        let path = format!("posts/{post_id}/comments");
        let env: ApiEnvelope<Vec<Comment>> = self.get(&path).await?;
        match (env.success, env.data) {
            (true, Some(list)) => Ok(list),
            _ => Err(ClientError::Envelope { endpoint: path }),
        }
    }

    /// Cast (or clear, with 0) a vote; returns the server's new tally.
    pub async fn vote(&self, target: VoteTarget, id: u64, value: i8) -> Result<VoteTally> {
        let path = format!("{}/{id}/vote", target.segment());
        let env: ApiEnvelope<VoteTally> = self.post(&path, &VoteRequest { value }).await?;
        match (env.success, env.data) {
            (true, Some(tally)) => Ok(tally),
            _ => Err(ClientError::Envelope { endpoint: path }),
        }
    }
}

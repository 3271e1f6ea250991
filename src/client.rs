use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::errors::{ClientError, ErrorResponse};
use crate::models::*;

/// The REST surface of the flashcard store as seen by a client.
#[async_trait]
pub trait FlashcardApi: Send + Sync {
    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, ClientError>;
    async fn list_by_category(&self, category: &str) -> Result<Vec<Flashcard>, ClientError>;
    async fn create_flashcard(&self, request: &CreateFlashcardRequest) -> Result<Flashcard, ClientError>;
    async fn update_flashcard(
        &self,
        id: Uuid,
        request: &UpdateFlashcardRequest,
    ) -> Result<Flashcard, ClientError>;
    async fn delete_flashcard(&self, id: Uuid) -> Result<String, ClientError>;
    async fn increment_review(&self, id: Uuid) -> Result<Flashcard, ClientError>;
    async fn categories(&self) -> Result<Vec<String>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpFlashcardClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpFlashcardClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Flashcard API response");

        if status.is_success() {
            return Ok(response);
        }

        // Prefer the server's message; fall back to the status reason.
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout_secs)
        } else {
            ClientError::Transport(err)
        }
    }
}

#[async_trait]
impl FlashcardApi for HttpFlashcardClient {
    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, ClientError> {
        self.send_json(self.request(Method::GET, "/api/flashcards")).await
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Flashcard>, ClientError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| ClientError::Decode(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Decode(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "flashcards", "category", category]);
        self.send_json(self.client.get(url)).await
    }

    async fn create_flashcard(&self, request: &CreateFlashcardRequest) -> Result<Flashcard, ClientError> {
        self.send_json(self.request(Method::POST, "/api/flashcards").json(request))
            .await
    }

    async fn update_flashcard(
        &self,
        id: Uuid,
        request: &UpdateFlashcardRequest,
    ) -> Result<Flashcard, ClientError> {
        let path = format!("/api/flashcards/{}", id);
        self.send_json(self.request(Method::PUT, &path).json(request)).await
    }

    async fn delete_flashcard(&self, id: Uuid) -> Result<String, ClientError> {
        let path = format!("/api/flashcards/{}", id);
        let response: MessageResponse = self.send_json(self.request(Method::DELETE, &path)).await?;
        Ok(response.message)
    }

    async fn increment_review(&self, id: Uuid) -> Result<Flashcard, ClientError> {
        let path = format!("/api/flashcards/{}/review", id);
        self.send_json(self.request(Method::PATCH, &path)).await
    }

    async fn categories(&self) -> Result<Vec<String>, ClientError> {
        self.send_json(self.request(Method::GET, "/api/categories")).await
    }
}

//! Cloud document-store backend
//!
//! One JSON document per authenticated user at `{base_url}/users/{user_id}`.
//! Reads are plain `GET`s; writes `PATCH` the whole Document with merge
//! semantics.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::storage::backend::{Backend, BackendKind};
use crate::storage::{Document, StorageError};

/// Authenticated user for the cloud store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudSession {
    pub user_id: String,
    pub token: String,
}

pub struct CloudBackend {
    client: reqwest::Client,
    base_url: String,
    session: CloudSession,
}

impl CloudBackend {
    pub fn new(base_url: impl Into<String>, session: CloudSession) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn document_url(&self) -> String {
        format!("{}/users/{}", self.base_url, self.session.user_id)
    }
}

#[async_trait]
impl Backend for CloudBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cloud
    }

    async fn is_available(&self) -> bool {
        !self.session.user_id.trim().is_empty() && !self.base_url.is_empty()
    }

    async fn load(&self) -> Result<Document, StorageError> {
        let response = self
            .client
            .get(self.document_url())
            .bearer_auth(&self.session.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::info!("No cloud document for user {} yet", self.session.user_id);
            return Ok(Document::new());
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StorageError::PermissionDenied(format!(
                "cloud store rejected credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(StorageError::Unavailable(format!(
                "cloud store returned {}",
                status
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(Document::new());
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn flush(&self, doc: &Document) -> Result<(), StorageError> {
        let response = self
            .client
            .patch(self.document_url())
            .query(&[("merge", "true")])
            .bearer_auth(&self.session.token)
            .json(doc)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::Unavailable(format!(
                "cloud write failed ({}): {}",
                status, text
            )));
        }

        tracing::debug!("Flushed document to cloud for user {}", self.session.user_id);
        Ok(())
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{RemoteError, RemoteTasks};
use crate::model::{Task, User};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON client for the task API.
///
/// Routes: `GET /api/user/info`, `GET /api/tasks/user`, `POST /api/tasks`,
/// `PUT /api/tasks/{id}`, `DELETE /api/tasks/{id}`, `POST /api/logout`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    session: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, session: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed building HTTP client for task sync")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::ACCEPT, "application/json");
        match &self.session {
            Some(cookie) => request.header(header::COOKIE, cookie.as_str()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = self
            .with_session(request)
            .send()
            .await
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        response
            .json::<T>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

#[async_trait]
impl RemoteTasks for HttpRemote {
    async fn current_user(&self) -> Result<Option<User>, RemoteError> {
        let request = self.client.get(self.url("/api/user/info"));
        match self.send(request).await {
            Ok(response) => Self::decode(response).await.map(Some),
            Err(RemoteError::Unauthenticated) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        let response = self.send(self.client.get(self.url("/api/tasks/user"))).await?;
        Self::decode(response).await
    }

    async fn create_task(&self, task: &Task) -> Result<Task, RemoteError> {
        let request = self.client.post(self.url("/api/tasks")).json(task);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    async fn update_task(&self, task: &Task) -> Result<(), RemoteError> {
        let path = format!("/api/tasks/{}", task.id);
        self.send(self.client.put(self.url(&path)).json(task))
            .await
            .map(|_| ())
    }

    async fn delete_task(&self, id: &str) -> Result<(), RemoteError> {
        let path = format!("/api/tasks/{}", id);
        self.send(self.client.delete(self.url(&path)))
            .await
            .map(|_| ())
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        self.send(self.client.post(self.url("/api/logout")))
            .await
            .map(|_| ())
    }
}

//! Token-authenticated JSON client for one service endpoint

use osmachine_cloud::{CloudError, Result};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ServiceClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = self.http.get(self.url(path)).query(query);
        let response = self.send(request).await?;
        read_json(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(path)).json(body);
        let response = self.send(request).await?;
        read_json(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.put(self.url(path)).json(body);
        let response = self.send(request).await?;
        read_json(response).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<()> {
        let request = self.http.delete(self.url(path)).query(query);
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .header(AUTH_TOKEN_HEADER, &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} returned {}: {}", self.base_url, status, body);
        Err(CloudError::from_status(status.as_u16(), error_message(&body)))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| CloudError::Transport(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull the human-readable message out of an OpenStack error body
///
/// Services wrap it differently (`{"itemNotFound": {"message": ..}}` from
/// Nova, `{"NeutronError": {"message": ..}}` from Neutron); fall back to the
/// raw body.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.as_object())
        .and_then(|obj| {
            obj.get("message").and_then(|m| m.as_str()).or_else(|| {
                obj.values()
                    .find_map(|inner| inner.get("message").and_then(|m| m.as_str()))
            })
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

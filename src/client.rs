//! CRUD Client: JSON requests against the fleet REST backend.
//!
//! A call either resolves with the parsed body of a 2xx response or fails
//! once. There is no retry, no timeout and no backoff.

use crate::errors::ClientError;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

#[derive(Clone)]
pub struct CrudClient {
    http: Client,
    base_url: String,
}

impl CrudClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send("POST", path, self.http.post(self.url(path)).json(body))
            .await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send("PUT", path, self.http.put(self.url(path)).json(body))
            .await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send("DELETE", path, self.http.delete(self.url(path))).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send("GET", path, self.http.get(self.url(path))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        debug!(method, path, "sending request");
        let result: Result<T, ClientError> = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = response.bytes().await?;
            serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
        }
        .await;

        if let Err(err) = &result {
            error!(method, path, "request failed: {err}");
        }
        result
    }
}

//! Authenticated HTTP transport for the Cirrus REST API.
//!
//! The client owns a base URL, the TLS-verification flag, and credential
//! material. [`RestClient::ensure_token`] produces a validated bearer token
//! (cached on disk across invocations) before any collection call is made.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::resource::Resource;
use crate::settings::{token_cache_path, Settings};

/// Header carrying the bearer token.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Body of `GET /api/auth`.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    auth_token: String,
}

/// Error body shape used by the server.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Collection listing body.
#[derive(Debug, Deserialize)]
struct CollectionBody {
    #[serde(default)]
    resources: Vec<Value>,
}

/// Authenticated client for the Cirrus REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    token: Option<String>,
    explicit_token: bool,
    token_cache: PathBuf,
}

impl RestClient {
    /// Build a client from merged settings. No network call is made here;
    /// call [`ensure_token`](Self::ensure_token) before using the client.
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!settings.enable_ssl_verify)
            .build()?;

        Ok(Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            token: settings.token.clone(),
            explicit_token: settings.token.is_some(),
            token_cache: token_cache_path()?,
        })
    }

    /// Override the token cache location.
    pub fn with_token_cache(mut self, path: PathBuf) -> Self {
        self.token_cache = path;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Make sure the client holds a server-validated token.
    ///
    /// An explicitly supplied token is validated and never replaced; a
    /// rejected one is a configuration error. Otherwise the cached token is
    /// tried, and as a last resort a new token is obtained from `/api/auth`
    /// with username and password. The final valid token is persisted to the
    /// cache file.
    pub async fn ensure_token(&mut self) -> Result<()> {
        if self.explicit_token {
            let Some(token) = self.token.clone() else {
                return Err(ClientError::Config(
                    "supplied token is empty".to_string(),
                ));
            };
            if self.validate(&token).await? {
                write_cached_token(&self.token_cache, &token)?;
                return Ok(());
            }
            return Err(ClientError::Config(
                "supplied token was rejected by the server".to_string(),
            ));
        }

        if let Some(cached) = read_cached_token(&self.token_cache) {
            if self.validate(&cached).await? {
                debug!("using cached auth token");
                self.token = Some(cached);
                return Ok(());
            }
        }

        if self.username.is_empty() || self.password.is_empty() {
            return Err(ClientError::Config(
                "username and password are required to obtain a token".to_string(),
            ));
        }

        let response = self
            .http
            .get(self.api_url("/auth"))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| ClientError::Config(format!("authentication request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ClientError::Config(format!(
                "authentication failed with status {}",
                response.status().as_u16()
            )));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Config(format!("unexpected auth response: {e}")))?;

        write_cached_token(&self.token_cache, &auth.auth_token)?;
        self.token = Some(auth.auth_token);
        Ok(())
    }

    /// Probe the API entry point with the given token.
    ///
    /// Returns whether the server accepted it. A connection failure here is
    /// a fatal configuration error, not a validity answer.
    pub async fn validate(&self, token: &str) -> Result<bool> {
        let response = self
            .http
            .get(self.api_url(""))
            .header(AUTH_TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| {
                ClientError::Config(format!("server unreachable during token validation: {e}"))
            })?;

        Ok(response.status() == reqwest::StatusCode::OK)
    }

    fn auth_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            ClientError::Config("no auth token available; call ensure_token first".to_string())
        })
    }

    /// Authenticated GET returning the decoded JSON body.
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let response = self
            .http
            .get(self.api_url(path))
            .header(AUTH_TOKEN_HEADER, self.auth_token()?)
            .query(query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Authenticated POST with a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.api_url(path))
            .header(AUTH_TOKEN_HEADER, self.auth_token()?)
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Fetch a collection listing restricted by rendered filter parameters.
    pub async fn filter_collection(
        &self,
        collection: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<Resource>> {
        let mut query = vec![("expand".to_string(), "resources".to_string())];
        query.extend_from_slice(filters);

        let value = self.get(&format!("/{collection}"), &query).await?;
        let body: CollectionBody = serde_json::from_value(value)?;
        Ok(body.resources.into_iter().map(Resource).collect())
    }

    /// Fetch a single resource, optionally expanding extra attributes the
    /// base listing omits.
    pub async fn fetch(&self, collection: &str, id: &str, attrs: &[&str]) -> Result<Resource> {
        let mut query = Vec::new();
        if !attrs.is_empty() {
            query.push(("attributes".to_string(), attrs.join(",")));
        }

        let value = self.get(&format!("/{collection}/{id}"), &query).await?;
        Ok(Resource(value))
    }

    /// Invoke an action against a collection.
    pub async fn post_action(&self, collection: &str, body: &Value) -> Result<Value> {
        self.post(&format!("/{collection}"), body).await
    }

    /// Invoke an action against a single resource.
    pub async fn post_resource_action(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> Result<Value> {
        self.post(&format!("/{collection}/{id}"), body).await
    }
}

/// Read the cached token, stripping trailing whitespace. Returns `None` when
/// the file is absent or empty.
pub fn read_cached_token(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let token = contents.trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Persist the token, creating parent directories on first use.
pub fn write_cached_token(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ClientError::Config(format!("could not create token cache directory: {e}"))
        })?;
    }
    fs::write(path, token)
        .map_err(|e| ClientError::Config(format!("could not write token cache: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth").join("token");

        write_cached_token(&path, "abcd1234").unwrap();
        assert_eq!(read_cached_token(&path), Some("abcd1234".to_string()));
    }

    #[test]
    fn token_cache_strips_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");

        fs::write(&path, "abcd1234\n").unwrap();
        assert_eq!(read_cached_token(&path), Some("abcd1234".to_string()));
    }

    #[test]
    fn missing_cache_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_cached_token(&dir.path().join("token")), None);
    }
}

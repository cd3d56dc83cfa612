//! Access tokens
//!
//! Token acquisition is delegated to a [`TokenProvider`]. Any failure to obtain a
//! token is an authentication error and is never retried. Tokens are cached only
//! for the duration of one execute() call ([`CallTokens`]).

use crate::error::{QueryError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| at <= Utc::now())
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn into_token(self) -> AccessToken {
        // Identity endpoints send expires_in as a number or a numeric string
        let seconds = match &self.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_i64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        AccessToken {
            token: self.access_token,
            expires_at: seconds.map(|s| Utc::now() + ChronoDuration::seconds(s)),
        }
    }
}

/// A fixed token, e.g. from `AZURE_ACCESS_TOKEN`
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("AZURE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        Ok(AccessToken::new(self.token.clone()))
    }
}

/// OAuth2 client-credentials grant against the identity authority
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority: String,
    client: Client,
}

impl ClientSecretCredential {
    pub fn new(tenant_id: String, client_id: String, client_secret: String, client: Client) -> Self {
        Self {
            tenant_id,
            client_id,
            client_secret,
            authority: DEFAULT_AUTHORITY.to_string(),
            client,
        }
    }

    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }

    /// From `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`
    pub fn from_env(client: Client) -> Option<Self> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Some(Self::new(
            var("AZURE_TENANT_ID")?,
            var("AZURE_CLIENT_ID")?,
            var("AZURE_CLIENT_SECRET")?,
            client,
        ))
    }
}

#[async_trait]
impl TokenProvider for ClientSecretCredential {
    fn name(&self) -> &str {
        "client_secret"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope),
            ])
            .send()
            .await
            .map_err(|e| QueryError::Authentication(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Authentication(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| QueryError::Authentication(format!("Failed to parse token response: {}", e)))?;
        Ok(parsed.into_token())
    }
}

/// Token from the instance metadata endpoint of a managed identity
pub struct ManagedIdentityCredential {
    endpoint: String,
    client_id: Option<String>,
    client: Client,
}

impl ManagedIdentityCredential {
    pub fn new(client: Client) -> Self {
        Self {
            endpoint: IMDS_ENDPOINT.to_string(),
            client_id: std::env::var("AZURE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            client,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl TokenProvider for ManagedIdentityCredential {
    fn name(&self) -> &str {
        "managed_identity"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope.trim_end_matches("/.default");
        let mut query = vec![("api-version", IMDS_API_VERSION), ("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .header("Metadata", "true")
            .query(&query)
            .send()
            .await
            .map_err(|e| QueryError::Authentication(format!("Managed identity unavailable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Authentication(format!(
                "Managed identity endpoint returned {}",
                status
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| QueryError::Authentication(format!("Failed to parse token response: {}", e)))?;
        Ok(parsed.into_token())
    }
}

/// Tries each provider in order; the first token wins
pub struct ChainedTokenProvider {
    providers: Vec<Arc<dyn TokenProvider>>,
}

impl ChainedTokenProvider {
    pub fn new(providers: Vec<Arc<dyn TokenProvider>>) -> Self {
        Self { providers }
    }

    /// Static token, then client secret, then managed identity
    pub fn from_env(client: Client) -> Self {
        let mut providers: Vec<Arc<dyn TokenProvider>> = Vec::new();
        if let Some(p) = StaticTokenProvider::from_env() {
            providers.push(Arc::new(p));
        }
        if let Some(p) = ClientSecretCredential::from_env(client.clone()) {
            providers.push(Arc::new(p));
        }
        providers.push(Arc::new(ManagedIdentityCredential::new(client)));
        Self::new(providers)
    }
}

#[async_trait]
impl TokenProvider for ChainedTokenProvider {
    fn name(&self) -> &str {
        "chained"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.get_token(scope).await {
                Ok(token) => {
                    debug!("Token for {} from {}", scope, provider.name());
                    return Ok(token);
                }
                Err(e) => {
                    warn!("Credential {} failed: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }
        Err(QueryError::Authentication(format!(
            "No credential produced a token ({})",
            failures.join("; ")
        )))
    }
}

/// Tokens acquired during one execute() call, keyed by scope
pub struct CallTokens<'a> {
    provider: &'a dyn TokenProvider,
    cache: HashMap<String, AccessToken>,
}

impl<'a> CallTokens<'a> {
    pub fn new(provider: &'a dyn TokenProvider) -> Self {
        Self {
            provider,
            cache: HashMap::new(),
        }
    }

    pub async fn get(&mut self, scope: &str) -> Result<String> {
        if let Some(token) = self.cache.get(scope) {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }
        let token = self.provider.get_token(scope).await?;
        let value = token.token.clone();
        self.cache.insert(scope.to_string(), token);
        Ok(value)
    }
}

// src/services/github.rs
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

const USER_AGENT: &str = "DonorPortal";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Profile lookup failed: {0}")]
    ProfileLookup(String),
}

#[derive(Debug, Deserialize)]
pub struct GitHubTokenResponse {
    pub access_token: Option<String>,
}

/// Authenticated GitHub user profile
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubEmail {
    pub email: String,
    pub primary: bool,
    pub verified: bool,
}

/// GitHub OAuth client (authorization-code grant)
pub struct GitHubOAuth {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GitHubOAuth {
    pub fn new(http: Client, client_id: String, client_secret: String, base_url: &str) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            redirect_uri: format!("{}/auth/github/callback", base_url),
        }
    }

    /// Build the GitHub authorization URL
    pub fn authorization_url(&self, state: &str, scopes: &[&str]) -> String {
        format!(
            "https://github.com/login/oauth/authorize?client_id={}&redirect_uri={}&state={}&scope={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state),
            urlencoding::encode(&scopes.join(" ")),
        )
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, GitHubError> {
        let response = self
            .http
            .post("https://github.com/login/oauth/access_token")
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .json(&json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
                "redirect_uri": self.redirect_uri,
            }))
            .send()
            .await
            .map_err(|e| GitHubError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GitHubError::TokenExchange(format!(
                "status {}",
                response.status()
            )));
        }

        let data: GitHubTokenResponse = response
            .json()
            .await
            .map_err(|e| GitHubError::TokenExchange(e.to_string()))?;

        data.access_token
            .ok_or_else(|| GitHubError::TokenExchange("no access token in response".to_string()))
    }

    /// Get the authenticated user's profile
    pub async fn user_profile(&self, access_token: &str) -> Result<GitHubUser, GitHubError> {
        let response = self
            .http
            .get("https://api.github.com/user")
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| GitHubError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GitHubError::ProfileLookup(format!(
                "status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GitHubError::ProfileLookup(e.to_string()))
    }

    /// Get the user's email addresses. Failure here is logged and degrades to
    /// `None`; the caller can still fall back to the profile email.
    pub async fn user_emails(&self, access_token: &str) -> Option<Vec<GitHubEmail>> {
        let response = match self
            .http
            .get("https://api.github.com/user/emails")
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Failed to fetch GitHub user emails");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "GitHub user emails request rejected");
            return None;
        }

        match response.json().await {
            Ok(emails) => Some(emails),
            Err(e) => {
                warn!(error = %e, "Failed to parse GitHub user emails");
                None
            }
        }
    }

    /// The primary verified email address, if one exists
    pub async fn primary_email(&self, access_token: &str) -> Option<String> {
        let emails = self.user_emails(access_token).await?;
        emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email)
    }

    /// Complete the OAuth flow: exchange the code, then fetch the profile and
    /// the primary verified email.
    pub async fn complete_flow(
        &self,
        code: &str,
    ) -> Result<(GitHubUser, Option<String>), GitHubError> {
        let access_token = self.exchange_code(code).await?;
        let user = self.user_profile(&access_token).await?;
        let primary_email = self.primary_email(&access_token).await;
        Ok((user, primary_email))
    }
}

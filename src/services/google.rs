// src/services/google.rs
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

const USER_AGENT: &str = "DonorPortal";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Userinfo lookup failed: {0}")]
    UserInfo(String),
}

#[derive(Debug, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: Option<String>,
}

/// Authenticated Google user profile
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    pub name: Option<String>,
}

/// Google OAuth 2.0 client (authorization-code grant)
pub struct GoogleOAuth {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuth {
    pub fn new(http: Client, client_id: String, client_secret: String, base_url: &str) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            redirect_uri: format!("{}/auth/google/callback", base_url),
        }
    }

    /// Build the Google authorization URL
    pub fn authorization_url(&self, state: &str, scopes: &[&str]) -> String {
        format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=online&prompt=select_account",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, GoogleError> {
        let response = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .header("User-Agent", USER_AGENT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::TokenExchange(format!(
                "status {} - {}",
                status, body
            )));
        }

        let data: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::TokenExchange(e.to_string()))?;

        data.access_token
            .ok_or_else(|| GoogleError::TokenExchange("no access token in response".to_string()))
    }

    /// Get the authenticated user's profile
    pub async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, GoogleError> {
        let response = self
            .http
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(access_token)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::UserInfo(format!("status {} - {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| GoogleError::UserInfo(e.to_string()))
    }

    /// Complete the OAuth flow: exchange the code and fetch the user profile
    pub async fn complete_flow(&self, code: &str) -> Result<GoogleUserInfo, GoogleError> {
        let access_token = self.exchange_code(code).await?;
        self.user_info(&access_token).await
    }
}

//! Authentication data models

use serde::{Deserialize, Serialize};

/// Identity provider that authenticated a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Github,
    Google,
    MagicLink,
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Github => "github",
            AuthProvider::Google => "google",
            AuthProvider::MagicLink => "magic_link",
        }
    }
}

/// Session payload stored client-side in the signed `user_session` cookie.
/// The cookie is the record; there is no server-side session table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub email: String,
    pub provider: AuthProvider,
}

/// CSRF state stored in a short-lived signed cookie while an OAuth flow
/// is in flight. The callback must present a matching `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthStateData {
    pub state: String,
}

/// Decoded contents of the `state` parameter embedded in a magic-link URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicLinkState {
    pub email: String,
    pub code: String,
}

/// Form body for requesting a magic-link email
#[derive(Debug, Deserialize)]
pub struct EmailAuthForm {
    pub email: String,
}

/// Query parameters on an OAuth callback. Everything is optional: the
/// provider sends `error` instead of `code` when the user denies consent.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Query parameters on a magic-link callback
#[derive(Debug, Deserialize)]
pub struct MagicLinkCallbackQuery {
    pub state: Option<String>,
}

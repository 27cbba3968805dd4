//! Signed cookie store
//!
//! Tamper-evident key/value cookies signed with a server-held secret. The
//! cookie value is `base64url(json)` + `.` + `base64url(hmac_sha256(payload))`;
//! a forged or truncated value fails signature verification and reads as
//! "no cookie". All operations touch only the current request's jar.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use time::Duration;
use tracing::{error, warn};

type HmacSha256 = Hmac<Sha256>;

/// Well-known cookie names with their configured lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieName {
    UserSession,
    GithubOauthState,
    GoogleOauthState,
}

impl CookieName {
    pub fn as_str(self) -> &'static str {
        match self {
            CookieName::UserSession => "user_session",
            CookieName::GithubOauthState => "github_oauth_state",
            CookieName::GoogleOauthState => "google_oauth_state",
        }
    }

    pub fn max_age(self) -> Duration {
        match self {
            CookieName::UserSession => Duration::days(7),
            CookieName::GithubOauthState | CookieName::GoogleOauthState => Duration::minutes(10),
        }
    }
}

/// Signs, verifies, reads, and writes the application's cookies.
pub struct SignedCookies {
    secret: String,
    production: bool,
}

impl SignedCookies {
    pub fn new(secret: impl Into<String>, production: bool) -> Self {
        Self {
            secret: secret.into(),
            production,
        }
    }

    fn mac(&self, payload: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn sign(&self, json: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&payload));
        format!("{}.{}", payload, signature)
    }

    /// Verify the signature on a raw cookie value and return the JSON payload.
    fn unsign(&self, raw: &str) -> Option<String> {
        let (payload, signature) = raw.split_once('.')?;
        let presented = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let expected = self.mac(payload);
        if !constant_time_eq(&presented, &expected) {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Read and verify a cookie, returning `None` if it is absent, forged,
    /// or unparseable. A parse failure is logged and treated as "no cookie",
    /// never surfaced to the caller.
    pub fn read<T: DeserializeOwned>(&self, jar: &CookieJar, name: CookieName) -> Option<T> {
        let raw = jar.get(name.as_str())?.value();
        let json = match self.unsign(raw) {
            Some(json) => json,
            None => {
                warn!(cookie = name.as_str(), "Rejected cookie with invalid signature");
                return None;
            }
        };

        match serde_json::from_str::<T>(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(error = %e, cookie = name.as_str(), "Failed to parse cookie payload");
                None
            }
        }
    }

    /// True iff the cookie is present, its signature verifies, and the payload
    /// is valid JSON. No schema validation beyond parseability.
    pub fn is_valid(&self, jar: &CookieJar, name: CookieName) -> bool {
        let Some(cookie) = jar.get(name.as_str()) else {
            return false;
        };
        match self.unsign(cookie.value()) {
            Some(json) => serde_json::from_str::<serde_json::Value>(&json).is_ok(),
            None => false,
        }
    }

    /// Serialize, sign, and set a cookie with the name's configured max-age.
    pub fn write<T: Serialize>(&self, jar: CookieJar, name: CookieName, value: &T) -> CookieJar {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, cookie = name.as_str(), "Failed to serialize cookie payload");
                return jar;
            }
        };

        let cookie = Cookie::build((name.as_str(), self.sign(&json)))
            .http_only(true)
            .secure(self.production)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(name.max_age())
            .build();

        jar.add(cookie)
    }

    /// Remove a cookie.
    pub fn clear(&self, jar: CookieJar, name: CookieName) -> CookieJar {
        jar.remove(Cookie::build((name.as_str(), "")).path("/").build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{AuthProvider, SessionData};

    fn store() -> SignedCookies {
        SignedCookies::new("test_cookie_secret", false)
    }

    fn session() -> SessionData {
        SessionData {
            email: "test@example.com".to_string(),
            provider: AuthProvider::Github,
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let store = store();
        let jar = store.write(CookieJar::new(), CookieName::UserSession, &session());

        let read: Option<SessionData> = store.read(&jar, CookieName::UserSession);
        assert_eq!(read, Some(session()));
        assert!(store.is_valid(&jar, CookieName::UserSession));
    }

    #[test]
    fn absent_cookie_reads_as_none() {
        let store = store();
        let jar = CookieJar::new();

        let read: Option<SessionData> = store.read(&jar, CookieName::UserSession);
        assert_eq!(read, None);
        assert!(!store.is_valid(&jar, CookieName::UserSession));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let store = store();
        let jar = store.write(CookieJar::new(), CookieName::UserSession, &session());
        let signed = jar.get("user_session").unwrap().value().to_string();

        // Swap the payload for a different email, keeping the old signature
        let forged_payload =
            URL_SAFE_NO_PAD.encode(r#"{"email":"evil@example.com","provider":"github"}"#);
        let signature = signed.split_once('.').unwrap().1;
        let forged = format!("{}.{}", forged_payload, signature);

        let jar = CookieJar::new().add(Cookie::new("user_session", forged));
        let read: Option<SessionData> = store.read(&jar, CookieName::UserSession);
        assert_eq!(read, None);
        assert!(!store.is_valid(&jar, CookieName::UserSession));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let store = store();
        let jar = store.write(CookieJar::new(), CookieName::UserSession, &session());
        let signed = jar.get("user_session").unwrap().value().to_string();

        let other = SignedCookies::new("different_secret", false);
        let jar = CookieJar::new().add(Cookie::new("user_session", signed));
        let read: Option<SessionData> = other.read(&jar, CookieName::UserSession);
        assert_eq!(read, None);
    }

    #[test]
    fn unparseable_payload_reads_as_none_but_is_valid_checks_json_only() {
        let store = store();
        // Correctly signed, but the payload is not a SessionData
        let signed = store.sign(r#"{"unexpected":true}"#);
        let jar = CookieJar::new().add(Cookie::new("user_session", signed));

        let read: Option<SessionData> = store.read(&jar, CookieName::UserSession);
        assert_eq!(read, None);
        // Still valid JSON under a valid signature
        assert!(store.is_valid(&jar, CookieName::UserSession));
    }

    #[test]
    fn garbage_value_is_rejected() {
        let store = store();
        let jar = CookieJar::new().add(Cookie::new("user_session", "not-a-signed-cookie"));
        let read: Option<SessionData> = store.read(&jar, CookieName::UserSession);
        assert_eq!(read, None);
    }
}

//! Tests for auth module
//!
//! Cookie signing and magic-link verification have their own test modules
//! next to the implementations; these cover the session models and the OAuth
//! client URL construction.

use reqwest::Client;

use super::models::{AuthProvider, OAuthCallbackQuery, SessionData};
use crate::services::{GitHubOAuth, GoogleOAuth};

#[test]
fn session_data_serializes_with_snake_case_provider() {
    let session = SessionData {
        email: "a@b.com".to_string(),
        provider: AuthProvider::MagicLink,
    };

    let json = serde_json::to_string(&session).unwrap();
    assert_eq!(json, r#"{"email":"a@b.com","provider":"magic_link"}"#);

    let parsed: SessionData = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, session);
}

#[test]
fn legacy_session_payloads_still_parse() {
    // Cookies issued before a deploy keep working for their 7-day lifetime
    let parsed: SessionData =
        serde_json::from_str(r#"{"email":"a@b.com","provider":"github"}"#).unwrap();
    assert_eq!(parsed.provider, AuthProvider::Github);
}

#[test]
fn oauth_callback_query_tolerates_missing_fields() {
    let query: OAuthCallbackQuery =
        serde_json::from_str(r#"{"error":"access_denied"}"#).unwrap();
    assert_eq!(query.error.as_deref(), Some("access_denied"));
    assert!(query.code.is_none());
    assert!(query.state.is_none());
}

#[test]
fn github_authorization_url_carries_state_and_redirect() {
    let github = GitHubOAuth::new(
        Client::new(),
        "client123".to_string(),
        "secret".to_string(),
        "http://localhost:3000",
    );

    let url = github.authorization_url("nonce-abc", &["read:user", "user:email"]);
    assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
    assert!(url.contains("state=nonce-abc"));
    assert!(url.contains("client_id=client123"));
    assert!(url.contains(&urlencoding::encode("http://localhost:3000/auth/github/callback").into_owned()));
    assert!(url.contains("read%3Auser%20user%3Aemail"));
}

#[test]
fn google_authorization_url_requests_account_selection() {
    let google = GoogleOAuth::new(
        Client::new(),
        "client123".to_string(),
        "secret".to_string(),
        "http://localhost:3000",
    );

    let url = google.authorization_url("nonce-abc", &["openid", "email"]);
    assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains("prompt=select_account"));
    assert!(url.contains("state=nonce-abc"));
}

mod oauth_state {
    use axum_extra::extract::CookieJar;

    use crate::auth::cookies::{CookieName, SignedCookies};
    use crate::auth::handlers::take_oauth_state;
    use crate::auth::models::OAuthStateData;

    fn jar_with_state(cookies: &SignedCookies, nonce: &str) -> CookieJar {
        cookies.write(
            CookieJar::new(),
            CookieName::GithubOauthState,
            &OAuthStateData {
                state: nonce.to_string(),
            },
        )
    }

    #[test]
    fn matching_state_is_accepted_and_cookie_cleared() {
        let cookies = SignedCookies::new("secret", false);
        let jar = jar_with_state(&cookies, "nonce-abc");

        let (jar, ok) =
            take_oauth_state(&cookies, jar, CookieName::GithubOauthState, Some("nonce-abc"));
        assert!(ok);

        // The state cookie is single-flow; a replayed callback finds nothing
        let (_, ok) =
            take_oauth_state(&cookies, jar, CookieName::GithubOauthState, Some("nonce-abc"));
        assert!(!ok);
    }

    #[test]
    fn mismatched_state_is_rejected() {
        let cookies = SignedCookies::new("secret", false);
        let jar = jar_with_state(&cookies, "nonce-abc");

        let (_, ok) =
            take_oauth_state(&cookies, jar, CookieName::GithubOauthState, Some("nonce-xyz"));
        assert!(!ok);
    }

    #[test]
    fn absent_cookie_or_parameter_is_rejected() {
        let cookies = SignedCookies::new("secret", false);

        let (_, ok) = take_oauth_state(
            &cookies,
            CookieJar::new(),
            CookieName::GithubOauthState,
            Some("nonce-abc"),
        );
        assert!(!ok);

        let jar = jar_with_state(&cookies, "nonce-abc");
        let (_, ok) = take_oauth_state(&cookies, jar, CookieName::GithubOauthState, None);
        assert!(!ok);
    }
}

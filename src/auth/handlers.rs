//! Authentication handlers
//!
//! Three ways in: GitHub OAuth, Google OAuth, and email magic links. All of
//! them end the same way, with a signed `user_session` cookie holding the
//! email and provider. There is no server-side session table; signing out is
//! just clearing the cookie.

use axum::extract::{Extension, Query};
use axum::response::Redirect;
use axum::{Form, Json};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::cookies::CookieName;
use super::magic_link::decode_state;
use super::models::{
    AuthProvider, EmailAuthForm, MagicLinkCallbackQuery, OAuthCallbackQuery, OAuthStateData,
    SessionData,
};
use crate::common::{safe_email_log, ApiError, AppState};

/// Random nonce for the OAuth `state` parameter
fn oauth_state_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn establish_session(
    state: &AppState,
    jar: CookieJar,
    email: &str,
    provider: AuthProvider,
) -> CookieJar {
    info!(
        email = %safe_email_log(email),
        provider = provider.as_str(),
        "Session established"
    );
    let session = SessionData {
        email: email.to_string(),
        provider,
    };
    state.cookies.write(jar, CookieName::UserSession, &session)
}

/// Validate the CSRF state on an OAuth callback against the signed cookie
/// written when the flow started. The cookie is single-flow: it is cleared
/// here regardless of outcome.
pub(super) fn take_oauth_state(
    cookies: &super::cookies::SignedCookies,
    jar: CookieJar,
    cookie: CookieName,
    presented: Option<&str>,
) -> (CookieJar, bool) {
    let stored: Option<OAuthStateData> = cookies.read(&jar, cookie);
    let jar = cookies.clear(jar, cookie);

    let matches = match (stored, presented) {
        (Some(stored), Some(presented)) => stored.state == presented,
        _ => false,
    };
    (jar, matches)
}

// ---- GitHub ----

/// GET /auth/github/start
pub async fn github_start(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let nonce = oauth_state_nonce();
    let jar = state.cookies.write(
        jar,
        CookieName::GithubOauthState,
        &OAuthStateData {
            state: nonce.clone(),
        },
    );
    let url = state
        .github
        .authorization_url(&nonce, &["read:user", "user:email"]);

    info!("Starting GitHub OAuth flow");
    (jar, Redirect::to(&url))
}

/// GET /auth/github/callback
pub async fn github_callback(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> (CookieJar, Redirect) {
    let (jar, state_ok) = take_oauth_state(
        &state.cookies,
        jar,
        CookieName::GithubOauthState,
        query.state.as_deref(),
    );

    if let Some(error) = query.error {
        warn!(error = %error, "GitHub OAuth flow denied or failed at provider");
        return (jar, Redirect::to("/auth?error=github_oauth_failed"));
    }
    if !state_ok {
        warn!("GitHub OAuth callback with missing or mismatched state");
        return (jar, Redirect::to("/auth?error=github_oauth_failed"));
    }
    let Some(code) = query.code else {
        warn!("GitHub OAuth callback without a code");
        return (jar, Redirect::to("/auth?error=github_oauth_failed"));
    };

    let (user, primary_email) = match state.github.complete_flow(&code).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "GitHub OAuth flow failed");
            return (jar, Redirect::to("/auth?error=github_oauth_failed"));
        }
    };

    // The emails endpoint gives the verified primary address; the profile
    // email is a fallback for accounts that keep it public.
    let Some(email) = primary_email.or(user.email) else {
        warn!(login = %user.login, "GitHub account has no usable email address");
        return (jar, Redirect::to("/auth?error=email_required"));
    };

    let jar = establish_session(&state, jar, &email, AuthProvider::Github);
    (jar, Redirect::to("/manage"))
}

// ---- Google ----

/// GET /auth/google/start
pub async fn google_start(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let nonce = oauth_state_nonce();
    let jar = state.cookies.write(
        jar,
        CookieName::GoogleOauthState,
        &OAuthStateData {
            state: nonce.clone(),
        },
    );
    let url = state.google.authorization_url(&nonce, &["openid", "email"]);

    info!("Starting Google OAuth flow");
    (jar, Redirect::to(&url))
}

/// GET /auth/google/callback
pub async fn google_callback(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> (CookieJar, Redirect) {
    let (jar, state_ok) = take_oauth_state(
        &state.cookies,
        jar,
        CookieName::GoogleOauthState,
        query.state.as_deref(),
    );

    if let Some(error) = query.error {
        warn!(error = %error, "Google OAuth flow denied or failed at provider");
        return (jar, Redirect::to("/auth?error=google_oauth_failed"));
    }
    if !state_ok {
        warn!("Google OAuth callback with missing or mismatched state");
        return (jar, Redirect::to("/auth?error=google_oauth_failed"));
    }
    let Some(code) = query.code else {
        warn!("Google OAuth callback without a code");
        return (jar, Redirect::to("/auth?error=google_oauth_failed"));
    };

    let user = match state.google.complete_flow(&code).await {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, "Google OAuth flow failed");
            return (jar, Redirect::to("/auth?error=google_oauth_failed"));
        }
    };

    if !user.verified_email {
        warn!(email = %safe_email_log(&user.email), "Google account email is unverified");
        return (jar, Redirect::to("/auth?error=email_unverified"));
    }

    let jar = establish_session(&state, jar, &user.email, AuthProvider::Google);
    (jar, Redirect::to("/manage"))
}

// ---- Email magic links ----

/// POST /auth/email
///
/// Sends a magic-link email. The response is the same whether or not the
/// send succeeds, so the endpoint cannot be used to probe deliverability.
pub async fn email_auth(
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<EmailAuthForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }

    if let Err(e) = state.emails.send_magic_link_email(&email).await {
        error!(error = %e, email = %safe_email_log(&email), "Failed to send magic link email");
    }

    Ok(Json(json!({
        "message": "Check your email for a sign-in link"
    })))
}

/// GET /auth/email/callback
///
/// Verifies the HMAC code embedded in the link against the current time
/// window. Any malformed or expired link lands back on the sign-in page.
pub async fn email_callback(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<MagicLinkCallbackQuery>,
) -> (CookieJar, Redirect) {
    let Some(link_state) = query.state.as_deref().and_then(decode_state) else {
        warn!("Magic link callback with missing or malformed state");
        return (jar, Redirect::to("/auth?error=invalid_link"));
    };

    let now_ms = Utc::now().timestamp_millis();
    if !state
        .magic_link
        .verify(&link_state.email, &link_state.code, now_ms)
    {
        warn!(
            email = %safe_email_log(&link_state.email),
            "Magic link code expired or invalid"
        );
        return (jar, Redirect::to("/auth?error=invalid_link"));
    }

    let jar = establish_session(&state, jar, &link_state.email, AuthProvider::MagicLink);
    (jar, Redirect::to("/manage"))
}

/// GET /auth/signout
pub async fn signout(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let jar = state.cookies.clear(jar, CookieName::UserSession);
    (jar, Redirect::to("/"))
}

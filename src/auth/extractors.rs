//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::{debug, warn};

use super::cookies::CookieName;
use super::models::{AuthProvider, SessionData};
use crate::common::{safe_email_log, AppState};

/// Authenticated session extractor
///
/// Reads and verifies the signed session cookie. Browser flows that hit a
/// protected route without a valid session are redirected to the sign-in
/// page rather than answered with a 401.
#[derive(Debug)]
pub struct SessionUser {
    pub email: String,
    pub provider: AuthProvider,
}

/// Rejection that sends the visitor to the sign-in page with a message
pub struct AuthRedirect;

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::to("/auth?error=signin_required").into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthRedirect)?;

        let jar = CookieJar::from_headers(&parts.headers);

        let session: SessionData = match app_state.cookies.read(&jar, CookieName::UserSession) {
            Some(session) => session,
            None => {
                warn!("Request to protected route without a valid session cookie");
                return Err(AuthRedirect);
            }
        };

        debug!(
            email = %safe_email_log(&session.email),
            provider = session.provider.as_str(),
            "Session authenticated via signed cookie"
        );

        Ok(SessionUser {
            email: session.email,
            provider: session.provider,
        })
    }
}

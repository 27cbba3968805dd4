//! Magic-link token engine
//!
//! Passwordless authentication with no server-side token storage. A code is
//! `HMAC-SHA256(secret, "{email}:{secret}:{window}")` where `window` is a
//! 5-minute bucket of the current time; validity is a recomputed predicate,
//! not a stored flag. Verification accepts the previous, current, and next
//! window, so a link lives for up to just under 15 minutes and may be used
//! more than once inside that span. The replay-within-window behavior is an
//! accepted tradeoff of keeping this stateless; a single-use nonce store
//! would be the upgrade path if stricter semantics are ever required.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::error;

use super::models::MagicLinkState;

type HmacSha256 = Hmac<Sha256>;

/// Width of one code validity window
const WINDOW_MS: i64 = 5 * 60 * 1000;

pub struct MagicLinkService {
    secret: String,
    base_url: String,
}

impl MagicLinkService {
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_url: base_url.into(),
        }
    }

    /// Generate the HMAC code for an email at a given timestamp (unix millis).
    /// Deterministic and secret-dependent; no randomness.
    pub fn code(&self, email: &str, timestamp_ms: i64) -> String {
        let window = timestamp_ms.div_euclid(WINDOW_MS);
        let data = format!("{}:{}:{}", email, self.secret, window);

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a code against the window containing `timestamp_ms`, plus one
    /// window either side to tolerate clock skew and email latency.
    pub fn verify(&self, email: &str, code: &str, timestamp_ms: i64) -> bool {
        for offset in -1i64..=1 {
            let expected = self.code(email, timestamp_ms + offset * WINDOW_MS);
            if constant_time_eq(expected.as_bytes(), code.as_bytes()) {
                return true;
            }
        }
        false
    }

    /// Build the full callback URL carrying the base64-JSON encoded state.
    pub fn issue_url(&self, email: &str) -> String {
        let state = MagicLinkState {
            email: email.to_string(),
            code: self.code(email, Utc::now().timestamp_millis()),
        };
        let encoded = STANDARD.encode(serde_json::to_string(&state).unwrap_or_default());
        format!(
            "{}/auth/email/callback?state={}",
            self.base_url,
            urlencoding::encode(&encoded)
        )
    }
}

/// Decode the `state` parameter from a magic-link URL.
///
/// Every malformed input (bad base64, bad JSON, missing or mistyped fields)
/// degrades to `None` with an error log; this must never panic or error so
/// that a mangled link lands the user back at "request a new link".
pub fn decode_state(encoded: &str) -> Option<MagicLinkState> {
    let bytes = match STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Magic link state is not valid base64");
            return None;
        }
    };

    let json = match String::from_utf8(bytes) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Magic link state is not valid UTF-8");
            return None;
        }
    };

    match serde_json::from_str::<MagicLinkState>(&json) {
        Ok(state) => Some(state),
        Err(e) => {
            error!(error = %e, "Magic link state is missing email or code");
            None
        }
    }
}

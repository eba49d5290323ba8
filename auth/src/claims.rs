//! Session claims.
//!
//! A session token carries:
//!
//! | claim | meaning |
//! |---|---|
//! | `sess` | session id (required) |
//! | `usr.id`, `usr.nam` | subject id and display name (optional) |
//! | `iat`, `exp` | validity window, seconds since the epoch |
//!
//! Anything else is kept untouched in [`SessionClaims::raw`].

use crate::error::{Result, SessionError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::time::Duration;

/// Verified identity attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionClaims {
    /// Session identifier (`sess`).
    pub session_id: String,

    /// Subject identifier (`usr.id`). Numeric ids are rendered as strings.
    pub subject_id: Option<String>,

    /// Subject display name (`usr.nam`).
    pub subject_name: Option<String>,

    /// Start of the validity window (`iat`).
    pub issued_at: DateTime<Utc>,

    /// End of the validity window (`exp`), exclusive.
    pub expiry: DateTime<Utc>,

    /// Every claim as decoded.
    pub raw: Map<String, Json>,
}

impl SessionClaims {
    /// Pick the well-known claims out of a decoded payload.
    ///
    /// # Errors
    ///
    /// [`SessionError::Invalid`] if `sess`, `iat` or `exp` is missing or has
    /// the wrong shape.
    pub fn from_raw(raw: Map<String, Json>) -> Result<Self> {
        let session_id = raw
            .get("sess")
            .and_then(scalar_to_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SessionError::invalid("missing sess claim"))?;

        let subject = raw.get("usr").and_then(Json::as_object);
        let subject_id = subject.and_then(|usr| usr.get("id")).and_then(scalar_to_string);
        let subject_name = subject
            .and_then(|usr| usr.get("nam"))
            .and_then(Json::as_str)
            .map(str::to_owned);

        let issued_at = timestamp(&raw, "iat")?;
        let expiry = timestamp(&raw, "exp")?;

        Ok(Self { session_id, subject_id, subject_name, issued_at, expiry, raw })
    }

    /// Check the validity window against `now`, tolerating `leeway` of
    /// clock skew at both ends.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Invalid`] when `exp <= iat` or `now` is before `iat`
    /// - [`SessionError::Expired`] when `now >= exp`
    pub fn validate_window(&self, now: DateTime<Utc>, leeway: Duration) -> Result<()> {
        if self.expiry <= self.issued_at {
            return Err(SessionError::invalid("empty validity window (exp <= iat)"));
        }
        let leeway = TimeDelta::from_std(leeway).unwrap_or(TimeDelta::zero());
        if now.checked_add_signed(leeway).unwrap_or(now) < self.issued_at {
            return Err(SessionError::invalid("token not yet valid (iat in the future)"));
        }
        if now >= self.expiry.checked_add_signed(leeway).unwrap_or(self.expiry) {
            return Err(SessionError::Expired);
        }
        Ok(())
    }
}

fn scalar_to_string(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp(raw: &Map<String, Json>, claim: &str) -> Result<DateTime<Utc>> {
    raw.get(claim)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64)))
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| SessionError::invalid(format!("missing or malformed {claim} claim")))
}

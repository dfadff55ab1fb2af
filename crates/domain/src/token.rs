//! Persisted authentication state
//!
//! [`TokenState`] is the durable record of the last successful token refresh.
//! The access token is usable only while `now < refreshed_at + expires_in`;
//! the state is mutated only by a successful refresh or an explicit reset.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed textual format for the persisted refresh timestamp.
///
/// Part of the token-store contract: stores written by earlier processes must
/// stay readable, so this format never changes.
pub const REFRESH_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Access/refresh token pair with expiry metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    /// Bearer token attached to outgoing requests.
    pub access_token: String,

    /// Token posted to the refresh endpoint to obtain a new pair.
    /// Optional because a reset can leave the state without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds, counted from `refreshed_at`.
    pub expires_in_secs: i64,

    /// Moment of the last successful refresh, persisted in
    /// [`REFRESH_TIMESTAMP_FORMAT`].
    #[serde(with = "refresh_timestamp")]
    pub refreshed_at: DateTime<Utc>,
}

impl TokenState {
    /// Create a state stamped with the current time.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in_secs,
            refreshed_at: Utc::now(),
        }
    }

    /// Absolute expiry instant of the access token.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.refreshed_at + Duration::seconds(self.expires_in_secs)
    }

    /// Whether the access token has passed its expiry instant.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }

    /// The access token, if one is present and non-empty.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        if self.access_token.is_empty() {
            None
        } else {
            Some(&self.access_token)
        }
    }

    /// Clear only the access token, keeping the refresh token so a later
    /// refresh attempt remains possible.
    pub fn reset_access_token(&mut self) {
        self.access_token.clear();
    }
}

mod refresh_timestamp {
    //! Serde adapter for the fixed textual refresh timestamp.

    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::REFRESH_TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(REFRESH_TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&text, REFRESH_TIMESTAMP_FORMAT)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

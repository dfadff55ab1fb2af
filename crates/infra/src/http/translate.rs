//! Transport error translator
//!
//! Maps low-level transport failures and non-2xx envelopes into the closed
//! [`DataError`] taxonomy. Translation happens exactly once, at this
//! boundary; callers never see a raw `reqwest` error.

use courier_domain::envelope::GENERIC_FAILURE_MESSAGE;
use courier_domain::{DataError, Envelope};

/// Translate a `reqwest` failure into the domain taxonomy.
#[must_use]
pub fn from_reqwest(err: &reqwest::Error) -> DataError {
    if err.is_timeout() {
        return DataError::TimedOut;
    }
    if err.is_connect() {
        return DataError::NotConnected;
    }
    if err.is_builder() {
        return DataError::BadUrl(err.to_string());
    }
    if err.is_decode() || err.is_body() {
        return DataError::Decode(err.to_string());
    }
    if err.is_request() {
        // The request left the socket but never completed.
        return DataError::ConnectionLost;
    }
    DataError::ResourceUnavailable
}

/// Translate a non-success HTTP status plus its body into an API error,
/// extracting the server-reported message from the envelope's status block
/// when the body parses as an envelope.
#[must_use]
pub fn from_status(status: u16, body: &[u8]) -> DataError {
    let message = serde_json::from_slice::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.status)
        .and_then(|status| status.message)
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
    DataError::Api { status: Some(status), message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_translation_extracts_the_envelope_message() {
        let body = br#"{"status": {"code": "401", "message": "token expired"}}"#;
        let err = from_status(401, body);
        assert_eq!(err, DataError::api(401, "token expired"));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn status_translation_falls_back_on_non_envelope_bodies() {
        let err = from_status(502, b"<html>bad gateway</html>");
        assert_eq!(err, DataError::api(502, GENERIC_FAILURE_MESSAGE));
    }

    #[test]
    fn status_translation_falls_back_on_message_free_envelopes() {
        let body = br#"{"status": {"code": "500"}}"#;
        let err = from_status(500, body);
        assert_eq!(err, DataError::api(500, GENERIC_FAILURE_MESSAGE));
    }
}

//! User-facing messages for failed requests
//!
//! Maps a [`RequestError`] to one short, non-technical sentence. The error
//! code from the envelope decides first, then the HTTP status, then whether a
//! response arrived at all.

use crate::retry::RequestError;

pub const NOT_FOUND_MESSAGE: &str =
    "We couldn't find that location. Try adding the country (e.g. \"Dublin, Ireland\").";
pub const UNAVAILABLE_MESSAGE: &str =
    "The location service is temporarily unavailable. Please try again shortly.";
pub const BAD_RESPONSE_MESSAGE: &str =
    "The location service returned an unexpected response. Please try again.";
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests right now. Please try again shortly.";
pub const SERVER_MESSAGE: &str = "Server problem. Please try again shortly.";
pub const REQUEST_MESSAGE: &str =
    "There was an issue with the request. Please check your inputs and try again.";
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Translate a request failure into a sentence fit for the end user
pub fn user_message(error: &RequestError) -> String {
    match error {
        RequestError::Api(api) => match api.code.as_str() {
            // Validation messages are written for the user already
            "VALIDATION_ERROR" if !api.message.trim().is_empty() => api.message.clone(),
            "NOT_FOUND" => NOT_FOUND_MESSAGE.to_string(),
            "UPSTREAM_UNAVAILABLE" => UNAVAILABLE_MESSAGE.to_string(),
            "UPSTREAM_BAD_RESPONSE" => BAD_RESPONSE_MESSAGE.to_string(),
            _ if api.status == 429 => RATE_LIMIT_MESSAGE.to_string(),
            _ if api.status >= 500 => SERVER_MESSAGE.to_string(),
            _ => REQUEST_MESSAGE.to_string(),
        },
        RequestError::Network { .. } => NETWORK_MESSAGE.to_string(),
        RequestError::Invalid { .. } => GENERIC_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::ApiError;
    use rstest::rstest;

    fn api(status: u16, code: &str, message: &str) -> RequestError {
        RequestError::Api(ApiError {
            message: message.to_string(),
            status,
            code: code.to_string(),
            details: None,
        })
    }

    #[rstest]
    #[case(api(404, "NOT_FOUND", "Location not found"), NOT_FOUND_MESSAGE)]
    #[case(api(503, "UPSTREAM_UNAVAILABLE", "x"), UNAVAILABLE_MESSAGE)]
    #[case(api(502, "UPSTREAM_BAD_RESPONSE", "x"), BAD_RESPONSE_MESSAGE)]
    #[case(api(429, "UNKNOWN_ERROR", "x"), RATE_LIMIT_MESSAGE)]
    #[case(api(500, "INTERNAL_ERROR", "x"), SERVER_MESSAGE)]
    #[case(api(504, "UNKNOWN_ERROR", "x"), SERVER_MESSAGE)]
    #[case(api(418, "UNKNOWN_ERROR", "x"), REQUEST_MESSAGE)]
    #[case(api(400, "VALIDATION_ERROR", ""), REQUEST_MESSAGE)]
    #[case(RequestError::network("connection refused"), NETWORK_MESSAGE)]
    #[case(RequestError::invalid("bad url"), GENERIC_MESSAGE)]
    fn test_user_message(#[case] error: RequestError, #[case] expected: &str) {
        assert_eq!(user_message(&error), expected);
    }

    #[test]
    fn test_validation_message_passes_through() {
        let error = api(400, "VALIDATION_ERROR", "Both origin and destination are required.");
        assert_eq!(user_message(&error), "Both origin and destination are required.");
    }

    #[test]
    fn test_unavailable_mentions_try_again_shortly() {
        assert!(user_message(&api(503, "UPSTREAM_UNAVAILABLE", "")).contains("try again shortly"));
    }

    #[test]
    fn test_every_status_yields_a_sentence() {
        for status in 100..600u16 {
            for code in ["UNKNOWN_ERROR", "NOT_FOUND", "VALIDATION_ERROR", "INTERNAL_ERROR", ""] {
                assert!(!user_message(&api(status, code, "")).is_empty());
            }
        }
    }
}

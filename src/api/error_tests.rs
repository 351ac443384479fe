use std::error::Error;

use super::ApiError;

#[test]
fn response_timeout_is_only_the_exact_local_message() {
    assert!(ApiError::LocalApi("Response timeout".to_string()).is_response_timeout());
    assert!(!ApiError::LocalApi("Response timeout!".to_string()).is_response_timeout());
    assert!(!ApiError::LocalApi("response timeout".to_string()).is_response_timeout());
    assert!(!ApiError::Server("Response timeout".to_string()).is_response_timeout());
}

#[test]
fn classifiers_match_their_variants() {
    assert!(ApiError::RateLimit("slow down".to_string()).is_rate_limit());
    assert!(!ApiError::Validation("bad".to_string()).is_rate_limit());
    assert!(ApiError::NotFound("page not found: X".to_string()).is_not_found());
    assert!(!ApiError::Cancelled.is_not_found());
}

#[test]
fn display_and_source_cover_wrapped_variants() {
    let status = ApiError::Status {
        status: 418,
        body: "teapot".to_string(),
    };
    assert_eq!(status.to_string(), "API error (status 418): teapot");
    assert!(status.source().is_none());

    let server = ApiError::Server("boom".to_string());
    assert_eq!(server.to_string(), "server error: boom");

    let decode_err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
    let decode = ApiError::decode("query result", decode_err);
    assert!(decode.to_string().starts_with("failed to parse query result"));
    assert!(decode.source().is_some());

    let record = ApiError::batch_record(3, "missing block uid");
    assert_eq!(record.to_string(), "batch action 3: missing block uid");

    let action = ApiError::BatchAction {
        index: 1,
        source: Box::new(ApiError::LocalApi("nope".to_string())),
    };
    assert_eq!(action.to_string(), "batch action 1 failed: nope");
    assert!(action.source().is_some());

    let io: ApiError = std::io::Error::other("disk").into();
    assert!(io.to_string().contains("I/O error"));
    assert!(io.source().is_some());

    assert_eq!(ApiError::Cancelled.to_string(), "request cancelled");
}

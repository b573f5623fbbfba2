use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};

use crate::error::{not_found, HttpStatusCode, OpsdeskError};

async fn body_json(err: OpsdeskError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_not_found_renders_uniform_body() {
    let (status, json) = body_json(not_found("meeting m-1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["message"], "Not found: meeting m-1");
}

#[tokio::test]
async fn test_database_errors_do_not_leak_details() {
    let (status, json) =
        body_json(OpsdeskError::DatabaseError("no such table: meetings".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(!json["message"].as_str().unwrap().contains("meetings"));
}

#[test]
fn test_status_codes() {
    assert_eq!(OpsdeskError::RateLimitError("x".into()).status_code(), 429);
    assert_eq!(OpsdeskError::TimeoutError("x".into()).status_code(), 504);
    assert_eq!(
        OpsdeskError::ExternalServiceError {
            service_name: "gcal".into(),
            message: "down".into()
        }
        .status_code(),
        502
    );
}

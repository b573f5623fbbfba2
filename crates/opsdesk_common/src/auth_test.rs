use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use tower::ServiceExt;

use crate::auth::{operator_auth_middleware, OperatorAuthState, OperatorId};

fn app() -> Router {
    Router::new()
        .route(
            "/whoami",
            get(|Extension(OperatorId(id)): Extension<OperatorId>| async move { id }),
        )
        .layer(middleware::from_fn_with_state(
            OperatorAuthState::new("op-secret"),
            operator_auth_middleware,
        ))
}

#[tokio::test]
async fn test_valid_credentials_expose_operator_id() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header("Authorization", "Bearer op-secret")
                .header("X-Operator-Id", "op-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"op-42");
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header("Authorization", "Bearer nope")
                .header("X-Operator-Id", "op-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_missing_operator_header_is_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header("Authorization", "Bearer op-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

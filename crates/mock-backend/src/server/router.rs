//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    let api = Router::new()
        .route("/config", get(handlers::config))
        .route("/auth/login", post(handlers::login))
        .route("/keys", post(handlers::create_key))
        .route(
            "/keys/:name",
            get(handlers::read_key)
                .put(handlers::update_key)
                .delete(handlers::delete_key),
        );

    Router::new()
        .nest("/v1", api)
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use common::protocol::{ConfigResponse, ErrorResponse, KeyResponse, LoginResponse};
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    async fn json<T: DeserializeOwned>(resp: Response) -> T {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn bare(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn login(app: &Router) -> String {
        let resp = send(
            app,
            post_json("/v1/auth/login", None, serde_json::json!({"identity": "u", "secret": "p"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        json::<LoginResponse>(resp).await.token
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(AppState::default());
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
        let body: ErrorResponse = json(resp).await;
        assert_eq!(body.code, "not_found");
    }

    #[tokio::test]
    async fn health_route_exists() {
        let app = build(AppState::default());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn config_requires_registration_token() {
        let app = build(AppState::default());

        let req = Request::builder()
            .uri("/v1/config")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/v1/config")
            .header("X-Registration-Token", "tok-1")
            .body(Body::empty())
            .unwrap();
        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cfg: ConfigResponse = json(resp).await;
        assert_eq!(cfg.api_version, "1.0");
        assert!(cfg.features.iter().any(|f| f == "AES-256-GCM"));
    }

    #[tokio::test]
    async fn advertised_features_match_sdk_registry() {
        let app = build(AppState::default());
        let req = Request::builder()
            .uri("/v1/config")
            .header("X-Registration-Token", "tok-1")
            .body(Body::empty())
            .unwrap();
        let cfg: ConfigResponse = json(send(&app, req).await).await;

        let registered: Vec<&str> = cryptosdk::crypto::registry()
            .iter()
            .map(|spec| spec.algorithm_id)
            .collect();
        assert_eq!(cfg.features, registered);
    }

    #[tokio::test]
    async fn key_lifecycle() {
        let app = build(AppState::default());
        let token = login(&app).await;

        let create = post_json(
            "/v1/keys",
            Some(&token),
            serde_json::json!({"name": "K1", "material": "AQID"}),
        );
        assert_eq!(send(&app, create).await.status(), StatusCode::CREATED);

        let dup = post_json(
            "/v1/keys",
            Some(&token),
            serde_json::json!({"name": "K1", "material": "AQID"}),
        );
        assert_eq!(send(&app, dup).await.status(), StatusCode::CONFLICT);

        let resp = send(&app, bare("GET", "/v1/keys/K1", &token)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let key: KeyResponse = json(resp).await;
        assert_eq!(key.material, "AQID");

        let update = Request::builder()
            .method("PUT")
            .uri("/v1/keys/K1")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(r#"{"name":"K1","material":"BAUG"}"#))
            .unwrap();
        assert_eq!(send(&app, update).await.status(), StatusCode::OK);

        let resp = send(&app, bare("GET", "/v1/keys/K1", &token)).await;
        assert_eq!(json::<KeyResponse>(resp).await.material, "BAUG");

        let resp = send(&app, bare("DELETE", "/v1/keys/K1", &token)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, bare("GET", "/v1/keys/K1", &token)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = json(resp).await;
        assert_eq!(body.code, "not_found");
    }

    #[tokio::test]
    async fn key_routes_require_valid_bearer() {
        let app = build(AppState::default());

        let req = Request::builder()
            .uri("/v1/keys/K1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let resp = send(&app, bare("GET", "/v1/keys/K1", "u.99999999999.AAAA")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn percent_encoded_names_round_trip() {
        let app = build(AppState::default());
        let token = login(&app).await;

        let create = post_json(
            "/v1/keys",
            Some(&token),
            serde_json::json!({"name": "team/a key", "material": "AQID"}),
        );
        assert_eq!(send(&app, create).await.status(), StatusCode::CREATED);

        let resp = send(&app, bare("GET", "/v1/keys/team%2Fa%20key", &token)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json::<KeyResponse>(resp).await.name, "team/a key");
    }
}

use crate::config::ApiConfig;
use crate::error::ServiceError;
use crate::info::AlgorithmInfo;
use crate::sequencer::CandidateScore;
use crate::service::{CompareListRequest, CreateTemplateRequest, TemplateEntry, TemplateService};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::future::Future;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument};

const ALLOWED_METHODS: &str = "OPTIONS,GET,POST";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: TemplateService,
    pub service_name: String,
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/info", get(get_info))
        .route("/get_list", get(get_list))
        .route("/create_template", post(create_template))
        .route("/compare_list", post(compare_list))
        .layer(TraceLayer::new_for_http());

    if config.cors_enabled {
        let allow_origin = if config.cors_origins.is_empty() {
            AllowOrigin::any()
        } else {
            let origins: Vec<HeaderValue> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            AllowOrigin::list(origins)
        };

        let cors = CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::OPTIONS, Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]);

        router = router.layer(cors).layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ));
    }

    router.with_state(state)
}

/// Parse a JSON body, treating an unreadable body as one with no fields
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!(error = %e, "Request body is not a valid JSON object");
        T::default()
    })
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.service_name
    }))
}

/// Static algorithm description
async fn get_info(State(state): State<AppState>) -> Json<AlgorithmInfo> {
    Json(state.service.info())
}

/// List every stored template
#[instrument(skip(state))]
async fn get_list(State(state): State<AppState>) -> Result<Json<Vec<TemplateEntry>>, ServiceError> {
    state.service.list_templates().await.map(Json)
}

/// Store an image and return its template
#[instrument(skip(state, body), fields(body_bytes = body.len()))]
async fn create_template(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<String>, ServiceError> {
    let request: CreateTemplateRequest = parse_body(&body);
    state.service.create_template(&request).await.map(Json)
}

/// Compare one template against an ordered list of templates
#[instrument(skip(state, body), fields(body_bytes = body.len()))]
async fn compare_list(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<CandidateScore>>, ServiceError> {
    let request: CompareListRequest = parse_body(&body);
    state.service.compare_list(&request).await.map(Json)
}

/// Start the API server and run until `shutdown` resolves
pub async fn start_api_server(
    state: AppState,
    config: &ApiConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting compare API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::MockFaceComparator;
    use crate::object_store::MockObjectStore;
    use crate::template::Template;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BUCKET: &str = "face-templates";

    fn router(store: MockObjectStore, comparator: MockFaceComparator) -> Router {
        router_with_config(store, comparator, &ApiConfig::default())
    }

    fn router_with_config(
        store: MockObjectStore,
        comparator: MockFaceComparator,
        config: &ApiConfig,
    ) -> Router {
        let state = AppState {
            service: TemplateService::new(Arc::new(store), Arc::new(comparator), BUCKET),
            service_name: "compare-service".to_string(),
        };
        create_router(state, config)
    }

    fn no_comparisons() -> MockFaceComparator {
        let mut comparator = MockFaceComparator::new();
        comparator.expect_compare().never();
        comparator
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::ORIGIN, "https://dashboard.example")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::ORIGIN, "https://dashboard.example")
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn encoded(name: &str) -> String {
        Template::new(BUCKET, name).encode()
    }

    #[tokio::test]
    async fn test_compare_list_scenario() {
        let mut comparator = MockFaceComparator::new();
        comparator
            .expect_compare()
            .times(2)
            .returning(|_, target| match target.name() {
                "a.jpg" => Ok(Some(87.0)),
                _ => Ok(None),
            });

        let response = router(MockObjectStore::new(), comparator)
            .oneshot(post_json(
                "/compare_list",
                serde_json::json!({
                    "SingleTemplate": encoded("ref.jpg"),
                    "TemplateList": [encoded("a.jpg"), encoded("b.jpg")]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let scores: Vec<f64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 0.87).abs() < 1e-6);
        assert_eq!(scores[1], 0.0);
    }

    #[tokio::test]
    async fn test_compare_list_empty_list_is_bad_request() {
        let mut comparator = MockFaceComparator::new();
        comparator.expect_compare().never();

        let response = router(MockObjectStore::new(), comparator)
            .oneshot(post_json(
                "/compare_list",
                serde_json::json!({ "SingleTemplate": encoded("ref.jpg"), "TemplateList": [] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            "Request is not properly formated. TemplateList parameter is missing"
        );
    }

    #[tokio::test]
    async fn test_compare_list_invalid_candidate_is_bad_request() {
        let mut comparator = MockFaceComparator::new();
        comparator.expect_compare().never();

        let response = router(MockObjectStore::new(), comparator)
            .oneshot(post_json(
                "/compare_list",
                serde_json::json!({
                    "SingleTemplate": encoded("ref.jpg"),
                    "TemplateList": [encoded("a.jpg"), "bm90IGpzb24="]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, "TemplateList missing or invalid");
    }

    #[tokio::test]
    async fn test_create_template_rejects_malformed_image() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().never();

        let response = router(store, MockFaceComparator::new())
            .oneshot(post_json(
                "/create_template",
                serde_json::json!({ "ImageData": "***", "bucketname": BUCKET }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, "ImageData missing or invalid");
    }

    #[tokio::test]
    async fn test_create_template_rejects_non_json_body() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().never();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/create_template")
            .body(Body::from("not json"))
            .unwrap();

        let response = router(store, MockFaceComparator::new())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_template_returns_encoded_template() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().times(1).returning(|_, _, _| Ok(()));

        let response = router(store, MockFaceComparator::new())
            .oneshot(post_json(
                "/create_template",
                serde_json::json!({ "ImageData": STANDARD.encode(b"jpeg-bytes") }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ALLOWED_METHODS
        );

        let body = json_body(response).await;
        let template = Template::decode(body.as_str().unwrap()).unwrap();
        assert_eq!(template.bucket(), BUCKET);
        assert!(template.name().ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_get_list_returns_name_and_template() {
        let mut store = MockObjectStore::new();
        store
            .expect_list_objects()
            .returning(|_| Ok(vec!["1705314645123.jpg".to_string()]));

        let response = router(store, MockFaceComparator::new())
            .oneshot(get_request("/get_list"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!([{
                "Name": "1705314645123.jpg",
                "Template": encoded("1705314645123.jpg")
            }])
        );
    }

    #[tokio::test]
    async fn test_info_is_idempotent() {
        let app = router(MockObjectStore::new(), MockFaceComparator::new());

        let first = json_body(app.clone().oneshot(get_request("/info")).await.unwrap()).await;
        let second = json_body(app.oneshot(get_request("/info")).await.unwrap()).await;

        assert_eq!(first, second);
        assert_eq!(first["AlgorithmModality"], "Face");
    }

    #[tokio::test]
    async fn test_preflight_allows_methods() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/compare_list")
            .header(header::ORIGIN, "https://dashboard.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = router(MockObjectStore::new(), MockFaceComparator::new())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ALLOWED_METHODS
        );
    }

    #[tokio::test]
    async fn test_compare_list_non_string_reference_is_reported() {
        let response = router(MockObjectStore::new(), no_comparisons())
            .oneshot(post_json(
                "/compare_list",
                serde_json::json!({ "SingleTemplate": 42, "TemplateList": [encoded("a.jpg")] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, "SingleTemplate missing or invalid");
    }

    #[tokio::test]
    async fn test_compare_list_non_string_candidate_is_reported() {
        let response = router(MockObjectStore::new(), no_comparisons())
            .oneshot(post_json(
                "/compare_list",
                serde_json::json!({
                    "SingleTemplate": encoded("ref.jpg"),
                    "TemplateList": [encoded("a.jpg"), 7]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, "TemplateList missing or invalid");
    }

    #[tokio::test]
    async fn test_create_template_non_string_image_is_reported() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().never();

        let response = router(store, MockFaceComparator::new())
            .oneshot(post_json(
                "/create_template",
                serde_json::json!({ "ImageData": 42, "bucketname": BUCKET }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, "ImageData missing or invalid");
    }

    #[tokio::test]
    async fn test_configured_origins_are_echoed() {
        let config = ApiConfig {
            cors_origins: vec!["https://dashboard.example".to_string()],
            ..ApiConfig::default()
        };
        let app = router_with_config(MockObjectStore::new(), MockFaceComparator::new(), &config);

        let allowed = app.clone().oneshot(get_request("/info")).await.unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(
            allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://dashboard.example"
        );

        let other = Request::builder()
            .method(Method::GET)
            .uri("/info")
            .header(header::ORIGIN, "https://elsewhere.example")
            .body(Body::empty())
            .unwrap();
        let rejected = app.oneshot(other).await.unwrap();
        assert!(rejected
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_cors_disabled_sends_no_cors_headers() {
        let config = ApiConfig {
            cors_enabled: false,
            ..ApiConfig::default()
        };
        let response = router_with_config(MockObjectStore::new(), MockFaceComparator::new(), &config)
            .oneshot(get_request("/info"))
            .await
            .unwrap();

        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).is_none());
    }
}

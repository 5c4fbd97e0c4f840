//! PaperGraph API Gateway
//!
//! HTTP entry point for the paper graph.
//! Handles:
//! - Request routing to the graph controller
//! - Document upload and extraction
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use papergraph_common::{
    config::{AppConfig, ObservabilityConfig},
    llm::create_language_model,
    metrics,
    scholar::{BibliographySource, NoBibliography, SemanticScholarClient},
    LanguageModel,
};
use papergraph_graph::GraphController;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub controller: Arc<GraphController>,
    pub llm: Arc<dyn LanguageModel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // An explicit file replaces the layered config/ lookup
    let config = match std::env::var("APP_CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path),
        Err(_) => AppConfig::load(),
    };
    let config = Arc::new(config.context("Failed to load configuration")?);

    init_tracing(&config.observability);

    info!(
        version = papergraph_common::VERSION,
        service = %config.observability.service_name,
        "Starting PaperGraph API Gateway"
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Full(format!("{}_request_duration_seconds", metrics::METRICS_PREFIX)),
                metrics::LATENCY_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Full(format!("{}_llm_duration_seconds", metrics::METRICS_PREFIX)),
                metrics::LLM_BUCKETS,
            )?
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Collaborators
    let llm = create_language_model(&config.llm)?;
    let bibliography: Arc<dyn BibliographySource> = if config.scholar.api_base.trim().is_empty() {
        info!("Bibliographic lookups disabled");
        Arc::new(NoBibliography)
    } else {
        Arc::new(SemanticScholarClient::new(&config.scholar)?)
    };

    let controller = Arc::new(GraphController::new(&config, llm.clone(), bibliography));

    let state = AppState {
        config: config.clone(),
        controller,
        llm,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// JSON or plain logs; `RUST_LOG` wins over the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Whole graph
        .route("/graph", get(handlers::graph::get_graph))
        .route("/graph/layout", post(handlers::graph::relayout))

        // Paper nodes
        .route("/papers", post(handlers::papers::add_paper))
        .route("/papers/search", post(handlers::papers::search_paper))
        .route("/papers/{node_id}/expand", post(handlers::papers::expand_paper))
        .route("/papers/{node_id}/summary", patch(handlers::papers::update_summary))

        // Relationships between papers
        .route("/relationships", post(handlers::relationships::create_relationship))
        .route("/edges/{edge_id}/analyze", post(handlers::edges::analyze_edge))
        .route("/edges/{edge_id}/chat", post(handlers::edges::chat))

        // Document upload
        .route("/documents", post(handlers::documents::upload_document))
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_metrics));

    let body_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes);
    let timeout = TimeoutLayer::new(state.config.request_timeout());

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(body_limit)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // The last layer wraps the others, so ids are set before propagation
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use papergraph_common::errors::Result as AppResult;
    use papergraph_common::llm::MockLanguageModel;
    use papergraph_common::scholar::{ScholarAuthor, ScholarPaper};
    use serde_json::{json, Value};
    use tokio_test::assert_ok;
    use tower::ServiceExt;

    const CONCEPTS: &str = r#"{"concepts":[
        {"id":"concept-1","name":"Greedy Coloring","summary":"Colors vertices in order.","importance":"high"},
        {"id":"concept-2","name":"Chromatic Bound","summary":"Bounds the colors used.","importance":"medium"}
    ]}"#;

    const APPLIED: &str = r#"{"relationType":"Applied","summary":"B applies A.","confidenceScore":0.8}"#;

    /// Answers every search with the same record
    struct OneMatch(ScholarPaper);

    #[async_trait]
    impl BibliographySource for OneMatch {
        async fn search_paper(&self, _query: &str) -> AppResult<Option<ScholarPaper>> {
            Ok(Some(self.0.clone()))
        }

        async fn references(&self, _paper_id: &str, _limit: usize) -> AppResult<Vec<ScholarPaper>> {
            Ok(Vec::new())
        }
    }

    fn test_app(llm: MockLanguageModel, bibliography: Arc<dyn BibliographySource>) -> Router {
        let config = Arc::new(AppConfig::default());
        let llm: Arc<dyn LanguageModel> = Arc::new(llm);
        let controller = Arc::new(GraphController::new(&config, llm.clone(), bibliography));
        create_router(AppState { config, controller, llm })
    }

    fn offline_app() -> Router {
        test_app(MockLanguageModel::offline(), Arc::new(NoBibliography))
    }

    async fn read(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&value).unwrap())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        read(assert_ok!(app.clone().oneshot(request).await)).await
    }

    async fn add_paper(app: &Router, title: &str) -> String {
        let (status, node) = send(
            app,
            Method::POST,
            "/v1/papers",
            Some(json!({ "title": title, "summary": format!("Summary of {}.", title) })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        node["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&offline_app(), Method::GET, "/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_model_status() {
        let (_, body) = send(&offline_app(), Method::GET, "/v1/ready", None).await;
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["language_model"]["status"], "down");

        let app = test_app(MockLanguageModel::replying("{}"), Arc::new(NoBibliography));
        let (_, body) = send(&app, Method::GET, "/v1/ready", None).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["language_model"]["model_available"], true);
    }

    #[tokio::test]
    async fn test_request_id_is_returned() {
        let request = Request::builder().uri("/v1/health").body(Body::empty()).unwrap();
        let response = offline_app().oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_add_paper_then_get_graph() {
        let app = offline_app();
        let (status, node) = send(
            &app,
            Method::POST,
            "/v1/papers",
            Some(json!({ "title": "Graph Coloring", "summary": "Colors graphs." })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(node["data"]["type"], "paper");
        assert_eq!(node["data"]["title"], "Graph Coloring");

        let (status, graph) = send(&app, Method::GET, "/v1/graph", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 1);
        assert!(graph["edges"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_paper_rejects_empty_title() {
        let (status, body) = send(
            &offline_app(),
            Method::POST,
            "/v1/papers",
            Some(json!({ "title": "", "summary": "x" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_add_paper_with_lookup_fills_metadata() {
        let found = ScholarPaper {
            paper_id: Some("abc123".into()),
            title: "Graph Coloring".into(),
            authors: vec![ScholarAuthor { name: "Jane Smith".into() }],
            year: Some(2020),
            venue: Some("SODA".into()),
            citation_count: Some(10),
            reference_count: Some(20),
        };
        let app = test_app(MockLanguageModel::offline(), Arc::new(OneMatch(found)));

        let (status, node) = send(
            &app,
            Method::POST,
            "/v1/papers",
            Some(json!({ "title": "Graph Coloring", "summary": "Colors graphs.", "lookup": true })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(node["id"], "paper-abc123");
        assert_eq!(node["data"]["paperId"], "abc123");
        assert_eq!(node["data"]["authors"][0], "Jane Smith");
        assert_eq!(node["data"]["year"], 2020);
    }

    #[tokio::test]
    async fn test_search_errors() {
        let app = offline_app();
        let (status, body) = send(&app, Method::POST, "/v1/papers/search", Some(json!({ "query": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = send(&app, Method::POST, "/v1/papers/search", Some(json!({ "query": "nothing" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "PAPER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_expand_unknown_node() {
        let (status, body) = send(&offline_app(), Method::POST, "/v1/papers/paper-missing/expand", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NODE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_expand_paper() {
        let app = test_app(MockLanguageModel::replying(CONCEPTS), Arc::new(NoBibliography));
        let node_id = add_paper(&app, "Graph Coloring").await;

        let (status, report) = send(&app, Method::POST, &format!("/v1/papers/{}/expand", node_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["nodeId"], node_id.as_str());
        assert_eq!(report["usedFallback"], false);
        assert_eq!(report["conceptNodeIds"].as_array().unwrap().len(), 2);

        let (_, graph) = send(&app, Method::GET, "/v1/graph", None).await;
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(graph["edges"][0]["kind"], "contains");
    }

    #[tokio::test]
    async fn test_relationship_and_chat() {
        let app = test_app(MockLanguageModel::replying(APPLIED), Arc::new(NoBibliography));
        let a = add_paper(&app, "Graph Coloring").await;
        let b = add_paper(&app, "Register Allocation").await;

        let (status, outcome) = send(
            &app,
            Method::POST,
            "/v1/relationships",
            Some(json!({ "source": a, "target": b })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["edge"]["relationship"]["relationType"], "Applied");
        assert_eq!(outcome["edge"]["relationship"]["confidenceScore"], 0.8);
        assert_eq!(outcome["usedFallback"], false);

        let edge_id = outcome["edge"]["id"].as_str().unwrap().to_string();
        let (status, reply) = send(
            &app,
            Method::POST,
            &format!("/v1/edges/{}/chat", edge_id),
            Some(json!({ "question": "How are they related?", "history": [{ "role": "user", "content": "Hi" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["answer"], APPLIED);

        let (status, outcome) = send(&app, Method::POST, &format!("/v1/edges/{}/analyze", edge_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["edge"]["id"], edge_id.as_str());
    }

    #[tokio::test]
    async fn test_relationship_fallback_when_model_offline() {
        let app = offline_app();
        let a = add_paper(&app, "Graph Coloring").await;
        let b = add_paper(&app, "Register Allocation").await;

        let (status, outcome) = send(
            &app,
            Method::POST,
            "/v1/relationships",
            Some(json!({ "source": a, "target": b })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["usedFallback"], true);
        assert_eq!(outcome["edge"]["relationship"]["relationType"], "Background Reference");
        assert_eq!(outcome["edge"]["relationship"]["confidenceScore"], 0.3);
    }

    #[tokio::test]
    async fn test_relationship_requires_both_papers() {
        let (status, body) = send(
            &offline_app(),
            Method::POST,
            "/v1/relationships",
            Some(json!({ "source": "paper-a" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_FIELD");
        assert_eq!(body["error"]["field"], "target");
    }

    #[tokio::test]
    async fn test_update_summary_and_relayout() {
        let app = offline_app();
        let node_id = add_paper(&app, "Graph Coloring").await;

        let (status, node) = send(
            &app,
            Method::PATCH,
            &format!("/v1/papers/{}/summary", node_id),
            Some(json!({ "summary": "A richer summary." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(node["data"]["summary"], "A richer summary.");

        let (status, graph) = send(&app, Method::POST, "/v1/graph/layout", Some(json!({ "direction": "LR" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(graph["nodes"][0]["position"]["x"], 0.0);
        assert_eq!(graph["nodes"][0]["position"]["y"], 0.0);
    }

    #[tokio::test]
    async fn test_document_upload_rejects_non_pdf() {
        let app = offline_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/documents")
            .header(handlers::documents::FILE_NAME_HEADER, "notes.txt")
            .body(Body::from("just some notes"))
            .unwrap();
        let (status, body) = read(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/documents")
            .body(Body::empty())
            .unwrap();
        let (status, body) = read(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_FIELD");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = send(&offline_app(), Method::GET, "/v1/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

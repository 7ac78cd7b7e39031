// Flowgraph API server

mod app_state;
mod error;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use flowgraph_anthropic::AnthropicProvider;
use flowgraph_contracts::{ExecutionEnvelope, HistoryEntry, PauseType, Step, ToolDefinition, Workflow, WorkflowSummary};
use flowgraph_core::{EmbeddingProvider, LlmProvider};
use flowgraph_data::DataStore;
use flowgraph_engine::{CheckKnownOutagesTool, CreateTicketTool, Engine, LexicalReranker, Services};
use flowgraph_openai::OpenAiProvider;
use flowgraph_storage::Database;
use flowgraph_vector::VectorStore;
use routes::executions::{ExecutionResponse, ResumeExecutionRequest, StartExecutionRequest, UploadedFile};
use routes::workflows::SaveWorkflowRequest;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app_state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::workflows::save_workflow,
        routes::workflows::list_workflows,
        routes::workflows::get_workflow,
        routes::workflows::delete_workflow,
        routes::executions::start_execution,
        routes::executions::start_execution_by_id,
        routes::executions::resume_execution,
        routes::tools::list_tools,
    ),
    components(schemas(
        Workflow, WorkflowSummary, Step, ExecutionEnvelope, HistoryEntry, PauseType, ToolDefinition,
        SaveWorkflowRequest, StartExecutionRequest, ResumeExecutionRequest, UploadedFile, ExecutionResponse,
    )),
    tags(
        (name = "workflows", description = "Workflow definition management"),
        (name = "executions", description = "Execution lifecycle: start, start-by-id, resume"),
        (name = "tools", description = "Registered built-in tools"),
    ),
    info(title = "Flowgraph API", version = "0.1.0", description = "Durable, pausable generative-AI workflow engine")
)]
struct ApiDoc;

fn build_llm_provider() -> Result<Arc<dyn LlmProvider>> {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        Ok(Arc::new(OpenAiProvider::from_env()?))
    } else if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        Ok(Arc::new(AnthropicProvider::from_env()?))
    } else {
        anyhow::bail!("neither OPENAI_API_KEY nor ANTHROPIC_API_KEY is set")
    }
}

fn build_embedding_provider() -> Option<Arc<dyn EmbeddingProvider>> {
    OpenAiProvider::from_env().ok().map(|p| Arc::new(p) as Arc<dyn EmbeddingProvider>)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "flowgraph_api=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("flowgraph-api starting...");

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let db = Database::connect(&database_url).await.context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;
    tracing::info!("connected to database and applied migrations");

    let data = DataStore::new(db.pool().clone());
    let vector_store_dir = std::env::var("VECTOR_STORE_DIR").unwrap_or_else(|_| "./vector_stores".to_string());
    let vectors = VectorStore::new(vector_store_dir);

    let llm = build_llm_provider().context("failed to configure an LLM provider")?;
    let embeddings = build_embedding_provider();
    if embeddings.is_none() {
        tracing::warn!("no embedding provider configured; vector_db_ingestion/vector_db_query steps will fail");
    }

    let tools = flowgraph_core::ToolRegistryBuilder::new()
        .with_tool(CheckKnownOutagesTool::default())
        .with_tool(CreateTicketTool::default())
        .build();

    let default_model = std::env::var("DEFAULT_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let http_timeout_secs: u64 = std::env::var("HTTP_REQUEST_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

    let services = Services::new(
        llm,
        embeddings,
        Arc::new(LexicalReranker),
        tools,
        db.clone(),
        data,
        vectors,
        default_model,
        Duration::from_secs(http_timeout_secs),
    );
    let engine = Arc::new(Engine::new(services));

    let state = AppState { db, engine };

    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::workflows::routes(state.clone()))
        .merge(routes::executions::routes(state.clone()))
        .merge(routes::tools::routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.context("failed to bind to address")?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

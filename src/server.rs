use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::agent::{Agent, AgentOutput};
use crate::config::ServerConfig;
use crate::providers::ProviderError;
use crate::state::Status;
use crate::streaming::{event_chunks, final_chunk};

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub stream: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/query", post(query_handler))
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> axum::response::Response {
    if request.stream {
        stream_query(state, request.query).into_response()
    } else {
        match state.agent.handle_query(&request.query, None).await {
            Ok(output) => Json(output).into_response(),
            Err(e) => {
                // Only configuration/logic faults land here; in-scope
                // failures come back as a normal payload with a non-success
                // status.
                error!(error = %e, "Query pipeline failed");
                let message = e
                    .downcast_ref::<ProviderError>()
                    .map(ProviderError::user_message)
                    .unwrap_or_else(|| e.to_string());
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": message})),
                )
                    .into_response()
            }
        }
    }
}

fn stream_query(state: AppState, query: String) -> Sse<ReceiverStream<Result<Event, Infallible>>> {
    let (sse_tx, sse_rx) = mpsc::channel::<Result<Event, Infallible>>(64);

    tokio::spawn(async move {
        let (graph_tx, mut graph_rx) = mpsc::channel(64);
        let agent = state.agent.clone();
        let pipeline = tokio::spawn(async move {
            let result = agent.handle_query(&query, Some(&graph_tx)).await;
            drop(graph_tx);
            result
        });

        while let Some(event) = graph_rx.recv().await {
            for chunk in event_chunks(&event) {
                if let Ok(sse_event) = Event::default().json_data(&chunk) {
                    if sse_tx.send(Ok(sse_event)).await.is_err() {
                        return; // client disconnected
                    }
                }
            }
        }

        let output = match pipeline.await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!(error = %e, "Streaming query pipeline failed");
                AgentOutput {
                    username: None,
                    start_time: None,
                    end_time: None,
                    agent_summary: format!("Pipeline error: {}", e),
                    status: Status::Failure,
                    messages: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "Streaming query task panicked");
                AgentOutput {
                    username: None,
                    start_time: None,
                    end_time: None,
                    agent_summary: "Pipeline task failed".to_string(),
                    status: Status::Failure,
                    messages: vec![],
                }
            }
        };

        if let Ok(sse_event) = Event::default().json_data(&final_chunk(&output)) {
            let _ = sse_tx.send(Ok(sse_event)).await;
        }
    });

    Sse::new(ReceiverStream::new(sse_rx)).keep_alive(KeepAlive::default())
}

pub async fn serve(agent: Arc<Agent>, config: &ServerConfig) -> anyhow::Result<()> {
    let app = build_router(AppState { agent });

    let ip: std::net::IpAddr = config
        .host
        .parse()
        .unwrap_or_else(|_| std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
    let addr = std::net::SocketAddr::new(ip, config.port);
    info!("profagent listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

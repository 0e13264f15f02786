//! OpenAI-compatible HTTP surface.
//!
//! `GET /models` and `POST /chat/completions` are served both at the root and
//! under `/v1`, so clients configured with either base URL work unchanged.

use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use clawapi_core::{ChatMessage, flatten_prompt};

use crate::error::GatewayError;
use crate::providers::RelayError;
use crate::state::AppState;

/// Fixed creation timestamp advertised for every listed model
pub const MODEL_CREATED: i64 = 1677610602;

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize)]
pub struct Choice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
}

/// Character counts standing in for token counts
#[derive(Debug, Serialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Serialize)]
pub struct ModelEntry {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub owned_by: String,
    pub provider: String,
    pub display_name: String,
    pub vendor: String,
    pub active: bool,
    pub authenticated: bool,
}

/// Run the HTTP server until `shutdown` resolves.
pub async fn run(
    state: Arc<AppState>,
    bind_addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("ClawAPI gateway listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/models", get(list_models))
        .route("/chat/completions", post(chat_completions));

    Router::new()
        .route("/health", get(health))
        .merge(api.clone())
        .nest("/v1", api)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_providers": state.runtime.active_names(),
    }))
}

/// Provider named by a model string: the last `/`-separated segment.
pub fn provider_from_model(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}

/// Run filesystem-backed checks off the async workers.
async fn blocking<T, F>(task: F) -> Result<T, GatewayError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))
}

async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<ModelList>, GatewayError> {
    let sessions = {
        let state = Arc::clone(&state);
        blocking(move || {
            state
                .registry
                .iter()
                .map(|descriptor| state.store.validate(descriptor))
                .collect::<Vec<_>>()
        })
        .await?
    };

    let prefix = state.model_prefix.as_str();
    let mut data = Vec::new();
    for (descriptor, authenticated) in state.registry.iter().zip(sessions) {
        let active = state.runtime.is_active(&descriptor.name);
        for id in [format!("{prefix}/{}", descriptor.name), descriptor.name.clone()] {
            data.push(ModelEntry {
                id,
                object: "model",
                created: MODEL_CREATED,
                owned_by: prefix.to_string(),
                provider: descriptor.name.clone(),
                display_name: descriptor.display_name.clone(),
                vendor: descriptor.vendor.clone(),
                active,
                authenticated,
            });
        }
    }

    Ok(Json(ModelList {
        object: "list",
        data,
    }))
}

async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Json<ChatCompletionResponse>, GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    let Some(model) = request.model.filter(|m| !m.trim().is_empty()) else {
        let available: Vec<String> = state.registry.names().iter().map(|n| n.to_string()).collect();
        return Err(GatewayError::MissingModel {
            prefix: state.model_prefix.clone(),
            example: available.first().cloned().unwrap_or_default(),
            available,
        });
    };
    let provider = provider_from_model(model.trim());

    let descriptor = state
        .registry
        .get(provider)
        .cloned()
        .ok_or_else(|| GatewayError::UnknownProvider(provider.to_string()))?;
    let (authenticated, installed) = {
        let state = Arc::clone(&state);
        blocking(move || {
            let authenticated = state.store.validate(&descriptor);
            (authenticated, state.paths.is_installed(&descriptor.name))
        })
        .await?
    };
    if !authenticated {
        return Err(GatewayError::Unauthenticated(provider.to_string()));
    }
    if !installed {
        return Err(GatewayError::NotInstalled(provider.to_string()));
    }
    if !state.runtime.is_active(provider) {
        return Err(GatewayError::NotActive(provider.to_string()));
    }
    let adapter = state
        .adapter(provider)
        .ok_or_else(|| RelayError::Unimplemented(provider.to_string()))?;

    let prompt = flatten_prompt(&request.messages);
    info!(
        "Relaying {} messages to '{}' ({} chars)",
        request.messages.len(),
        provider,
        prompt.chars().count()
    );

    let prompt_ref = prompt.as_str();
    let content = state
        .serializer
        .with_lock(provider, |runtime_state| async move {
            adapter.complete(&runtime_state, prompt_ref).await
        })
        .await
        .inspect_err(|e| warn!("Relay via '{}' failed: {}", provider, e))?;

    let now = chrono::Utc::now();
    let prompt_tokens = prompt.chars().count();
    let completion_tokens = content.chars().count();
    Ok(Json(ChatCompletionResponse {
        id: format!("chatcmpl-{}", now.timestamp_millis()),
        object: "chat.completion",
        created: now.timestamp(),
        model,
        choices: vec![Choice {
            index: 0,
            message: AssistantMessage {
                role: "assistant",
                content,
            },
            finish_reason: "stop",
        }],
        usage: Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
    }))
}

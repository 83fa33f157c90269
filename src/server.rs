//! HTTP Host Bridge
//!
//! TigerStyle: Lets an out-of-process bot framework drive the plugin. The
//! framework posts chat events; the response carries the outcome and the
//! chat messages it should send on our behalf.

use crate::action_log::{ActionLog, ActionRecord};
use crate::host::{CollectingChat, Host, InvocationContext, ReplyRewriter};
use crate::pipeline::{FailureKind, RenameOutcome};
use crate::plugin::{ComponentInfo, Plugin};
use crate::triggers::{ActionParams, ActivationMode};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Default HTTP bind address
pub const HTTP_BIND_ADDRESS_DEFAULT: &str = "127.0.0.1:8285";

// =============================================================================
// State
// =============================================================================

/// Shared by all requests
pub struct ServerState {
    pub plugin: Plugin,
    pub actions: ActionLog,
    pub rewriter: Arc<dyn ReplyRewriter>,
}

impl ServerState {
    fn host(&self, chat: Arc<CollectingChat>) -> Host {
        Host {
            chat,
            rewriter: self.rewriter.clone(),
            actions: Arc::new(self.actions.clone()),
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    pub platform: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEvent {
    pub platform: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationQuery {
    pub mode: ActivationMode,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub llm_judged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationResponse {
    pub activate: bool,
}

/// Result of a chat event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    /// Whether the plugin handled the event at all
    pub intercepted: bool,
    pub success: Option<bool>,
    pub message: Option<String>,
    pub failure: Option<FailureKind>,
    /// Chat messages to send, in order
    pub replies: Vec<String>,
}

impl EventResponse {
    fn new(outcome: Option<RenameOutcome>, replies: Vec<String>) -> Self {
        match outcome {
            Some(outcome) => Self {
                intercepted: true,
                success: Some(outcome.success),
                message: Some(outcome.message),
                failure: outcome.failure,
                replies,
            },
            None => Self {
                intercepted: false,
                success: None,
                message: None,
                failure: None,
                replies,
            },
        }
    }
}

// =============================================================================
// Router
// =============================================================================

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/components", get(components))
        .route("/v1/actions", get(actions))
        .route("/v1/activation", post(activation))
        .route("/v1/command", post(command))
        .route("/v1/action", post(action))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP host bridge listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn components(State(state): State<Arc<ServerState>>) -> Json<Vec<ComponentInfo>> {
    Json(state.plugin.components())
}

async fn actions(State(state): State<Arc<ServerState>>) -> Json<Vec<ActionRecord>> {
    Json(state.actions.records().await)
}

async fn activation(
    State(state): State<Arc<ServerState>>,
    Json(query): Json<ActivationQuery>,
) -> Json<ActivationResponse> {
    Json(ActivationResponse {
        activate: state
            .plugin
            .should_activate(query.mode, &query.text, query.llm_judged),
    })
}

async fn command(
    State(state): State<Arc<ServerState>>,
    Json(event): Json<CommandEvent>,
) -> Json<EventResponse> {
    let chat = Arc::new(CollectingChat::new());
    let host = state.host(chat.clone());
    let context = InvocationContext {
        platform: event.platform,
        group_id: event.group_id,
        user_id: event.user_id,
    };

    let outcome = state.plugin.on_message(&event.text, context, &host).await;
    Json(EventResponse::new(outcome, chat.drain().await))
}

async fn action(
    State(state): State<Arc<ServerState>>,
    Json(event): Json<ActionEvent>,
) -> Json<EventResponse> {
    let chat = Arc::new(CollectingChat::new());
    let host = state.host(chat.clone());
    let context = InvocationContext {
        platform: event.platform,
        group_id: event.group_id,
        user_id: event.user_id,
    };
    let params = ActionParams {
        new_name: event.new_name,
        reason: event.reason,
    };

    let outcome = state.plugin.on_action(params, context, &host).await;
    Json(EventResponse::new(outcome, chat.drain().await))
}

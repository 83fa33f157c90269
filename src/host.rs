//! Host Interfaces
//!
//! TigerStyle: Everything the bot framework owns, reduced to three traits.
//!
//! - [`ChatSink`] sends a text message into the invoking chat
//! - [`ReplyRewriter`] restyles a raw reply through the host's LLM
//! - [`ActionStore`] appends to the host's action history
//!
//! The local adapters at the bottom are what the CLI and HTTP hosts use.

use crate::action_log::ActionRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where an invocation came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Platform identifier, e.g. `qq`
    pub platform: String,
    /// Group id; `None` outside of group chats
    pub group_id: Option<String>,
    /// Sender id; `None` when the host lacks sender info
    pub user_id: Option<String>,
}

impl InvocationContext {
    pub fn group(platform: &str, group_id: &str, user_id: &str) -> Self {
        Self {
            platform: platform.to_string(),
            group_id: Some(group_id.to_string()),
            user_id: Some(user_id.to_string()),
        }
    }
}

/// Outbound chat messages
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_text(&self, text: &str) -> anyhow::Result<()>;
}

/// LLM-driven reply rewriting
#[async_trait]
pub trait ReplyRewriter: Send + Sync {
    /// Returns the segments to emit verbatim, in order
    async fn rewrite_reply(&self, raw_reply: &str, reason: &str) -> anyhow::Result<Vec<String>>;
}

/// Host-owned, append-only action history
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn store_action_info(&self, record: ActionRecord) -> anyhow::Result<()>;
}

/// Collaborators for a single invocation
#[derive(Clone)]
pub struct Host {
    pub chat: Arc<dyn ChatSink>,
    pub rewriter: Arc<dyn ReplyRewriter>,
    pub actions: Arc<dyn ActionStore>,
}

// =============================================================================
// Local Adapters
// =============================================================================

/// Prints messages to stdout
#[derive(Debug, Default)]
pub struct ConsoleChat;

#[async_trait]
impl ChatSink for ConsoleChat {
    async fn send_text(&self, text: &str) -> anyhow::Result<()> {
        println!("{}", text);
        Ok(())
    }
}

/// Buffers messages so a caller can return them
#[derive(Debug, Default)]
pub struct CollectingChat {
    messages: Mutex<Vec<String>>,
}

impl CollectingChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything sent so far
    pub async fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().await)
    }
}

#[async_trait]
impl ChatSink for CollectingChat {
    async fn send_text(&self, text: &str) -> anyhow::Result<()> {
        self.messages.lock().await.push(text.to_string());
        Ok(())
    }
}

/// Emits the raw reply unchanged as a single segment
#[derive(Debug, Default)]
pub struct VerbatimRewriter;

#[async_trait]
impl ReplyRewriter for VerbatimRewriter {
    async fn rewrite_reply(&self, raw_reply: &str, _reason: &str) -> anyhow::Result<Vec<String>> {
        Ok(vec![raw_reply.to_string()])
    }
}

// =============================================================================
// Tests
// =============================================================================

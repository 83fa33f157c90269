//! Group Renamer - Chat Bot Group Rename Plugin
//!
//! TigerStyle: Rename a group chat from inside a bot, either because the model
//! judged the conversation asked for it or because an operator typed
//! `/change_group_name`.
//!
//! Both entry points feed the same pipeline:
//!
//! ```text
//! Trigger ─▶ Permission Gate ─▶ Validator ─▶ NapCat set_group_name ─▶ Feedback
//!                  │                 │                 │
//!                  └────── fixed error message, halt ──┘
//! ```
//!
//! The hosting bot framework stays outside this crate. It is reached through
//! the traits in [`host`], and two local hosts ship with the binary
//! (one-shot CLI and an axum HTTP bridge).

pub mod action_log;
pub mod config;
pub mod host;
pub mod permissions;
pub mod pipeline;
pub mod plugin;
pub mod rename_api;
pub mod server;
pub mod templates;
pub mod triggers;
pub mod validation;

pub use config::PluginConfig;
pub use pipeline::{FailureKind, RenameError, RenameOutcome, RenamePipeline, RenameRequest};
pub use plugin::Plugin;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Plugin name as registered with the host
pub const PLUGIN_NAME: &str = "change_group_name_plugin";

/// Application name
pub const APP_NAME: &str = "group-renamer";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reason used when the trigger supplies none
pub const REASON_DEFAULT: &str = "管理员操作";

//! Group Renamer - Chat Bot Group Rename Plugin
//!
//! Runs the rename plugin outside of a bot framework:
//! - `serve`: HTTP bridge the framework posts chat events to
//! - `command` / `action`: one-shot invocations printing chat output to stdout
//! - `components`: print the registration descriptors

use clap::{Parser, Subcommand};
use group_renamer::action_log::ActionLog;
use group_renamer::host::{ConsoleChat, Host, InvocationContext, VerbatimRewriter};
use group_renamer::rename_api::NapcatClient;
use group_renamer::server::{self, ServerState, HTTP_BIND_ADDRESS_DEFAULT};
use group_renamer::triggers::ActionParams;
use group_renamer::{Plugin, PluginConfig, RenameOutcome, APP_NAME, APP_VERSION};
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Default config file location
const CONFIG_PATH_DEFAULT: &str = "~/.config/group-renamer/config.toml";

/// Platform assumed when none is given
const PLATFORM_DEFAULT: &str = "qq";

// =============================================================================
// CLI
// =============================================================================

/// Group rename plugin for chat bots
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Rename group chats through the NapCat set_group_name API")]
#[command(version)]
struct Cli {
    /// Plugin config file (TOML)
    #[arg(short, long, default_value = CONFIG_PATH_DEFAULT)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the HTTP host bridge
    Serve {
        #[arg(short, long, default_value = HTTP_BIND_ADDRESS_DEFAULT)]
        bind: String,
    },

    /// Handle one chat message as if typed in a group
    Command {
        #[arg(long, default_value = PLATFORM_DEFAULT)]
        platform: String,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        user: Option<String>,
        /// Message text, e.g. "/change_group_name 新群名 更换主题"
        text: String,
    },

    /// Run the autonomous action with explicit parameters
    Action {
        #[arg(long, default_value = PLATFORM_DEFAULT)]
        platform: String,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        new_name: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Print the components the host should register
    Components,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config_path = PathBuf::from(shellexpand::tilde(&cli.config).to_string());
    let mut config = PluginConfig::load(&config_path)?;

    // Initialize logging
    let filter = match cli.verbose {
        0 => config.logging.level.as_filter(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("{} v{}", APP_NAME, APP_VERSION);
    if config_path.exists() {
        tracing::info!(path = %config_path.display(), "Loaded plugin config");
    } else {
        tracing::info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    for entry in config.unmatchable_permission_entries() {
        tracing::warn!(
            entry = %entry,
            "Permission entry is not in 'platform:id' form and will never match"
        );
    }
    config.apply_env_overrides();

    if !config.plugin.enabled {
        tracing::warn!(
            path = %config_path.display(),
            "plugin.enabled is false; no components will handle events"
        );
    }

    let renamer = NapcatClient::from_config(&config.rename_api)?;
    tracing::info!(url = %renamer.url(), "Rename API endpoint");
    let plugin = Plugin::new(config, Arc::new(renamer));

    match cli.mode {
        Mode::Serve { bind } => {
            let addr: std::net::SocketAddr = bind.parse()?;
            let state = Arc::new(ServerState {
                plugin,
                actions: ActionLog::new(),
                rewriter: Arc::new(VerbatimRewriter),
            });
            server::serve(addr, state).await?;
        }

        Mode::Command {
            platform,
            group,
            user,
            text,
        } => {
            let host = console_host();
            let context = InvocationContext {
                platform,
                group_id: group,
                user_id: user,
            };
            match plugin.on_message(&text, context, &host).await {
                Some(outcome) => report(&outcome),
                None => tracing::info!("Message not intercepted by any component"),
            }
        }

        Mode::Action {
            platform,
            group,
            user,
            new_name,
            reason,
        } => {
            let host = console_host();
            let context = InvocationContext {
                platform,
                group_id: group,
                user_id: user,
            };
            let params = ActionParams { new_name, reason };
            match plugin.on_action(params, context, &host).await {
                Some(outcome) => report(&outcome),
                None => tracing::info!("Smart rename action is disabled"),
            }
        }

        Mode::Components => {
            println!("{}", serde_json::to_string_pretty(&plugin.components())?);
        }
    }

    Ok(())
}

fn console_host() -> Host {
    Host {
        chat: Arc::new(ConsoleChat),
        rewriter: Arc::new(VerbatimRewriter),
        actions: Arc::new(ActionLog::new()),
    }
}

fn report(outcome: &RenameOutcome) {
    if outcome.success {
        tracing::info!(message = %outcome.message, "Rename succeeded");
    } else {
        tracing::warn!(failure = ?outcome.failure, message = %outcome.message, "Rename failed");
    }
}

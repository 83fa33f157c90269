//! Command trigger: `/change_group_name <new_name> [reason]`.

use super::{reason_or_default, Trigger};
use crate::host::InvocationContext;
use crate::pipeline::{Origin, RenameRequest};
use once_cell::sync::Lazy;
use regex::Regex;

/// Full command pattern; `reason` takes everything after the first gap
pub const COMMAND_PATTERN: &str = r"^/change_group_name\s+(?P<new_name>.+?)(?:\s+(?P<reason>.+))?$";

static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(COMMAND_PATTERN).expect("command pattern is a valid regex"));

/// Parsed command invocation
#[derive(Debug, Clone)]
pub struct CommandTrigger {
    new_name: Option<String>,
    reason: Option<String>,
    context: InvocationContext,
}

impl CommandTrigger {
    /// `None` when the text is not this command
    pub fn parse(text: &str, context: InvocationContext) -> Option<Self> {
        let captures = COMMAND_RE.captures(text.trim_end())?;
        Some(Self {
            new_name: captures.name("new_name").map(|m| m.as_str().to_string()),
            reason: captures.name("reason").map(|m| m.as_str().to_string()),
            context,
        })
    }
}

impl Trigger for CommandTrigger {
    fn extract(&self) -> RenameRequest {
        RenameRequest {
            new_name: self.new_name.clone(),
            reason: reason_or_default(self.reason.as_deref()),
            origin: Origin::Command,
            group_id: self.context.group_id.clone(),
            user_id: self.context.user_id.clone(),
            platform: self.context.platform.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

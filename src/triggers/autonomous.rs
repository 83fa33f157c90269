//! Autonomous trigger: the host's LLM decided a rename is wanted.

use super::{reason_or_default, Trigger};
use crate::host::InvocationContext;
use crate::pipeline::{Origin, RenameRequest};
use serde::{Deserialize, Serialize};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Keywords that activate the action in normal mode (case-insensitive)
pub const ACTIVATION_KEYWORDS: [&str; 4] = ["改群名", "修改群名", "change group name", "rename group"];

/// Parameters extracted by the host before invoking the action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionParams {
    pub new_name: Option<String>,
    pub reason: Option<String>,
}

/// How the host decides whether to offer the action at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// Host asks its LLM judge
    Focus,
    /// Keyword match on the message text
    Normal,
}

/// Does any activation keyword occur in `text`?
pub fn keyword_matches(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ACTIVATION_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

/// Whether the action should be offered for this message
pub fn should_activate(mode: ActivationMode, text: &str, llm_judged: bool) -> bool {
    match mode {
        ActivationMode::Focus => llm_judged,
        ActivationMode::Normal => keyword_matches(text),
    }
}

/// Action invocation with host-extracted parameters
#[derive(Debug, Clone)]
pub struct AutonomousTrigger {
    params: ActionParams,
    context: InvocationContext,
}

impl AutonomousTrigger {
    pub fn new(params: ActionParams, context: InvocationContext) -> Self {
        Self { params, context }
    }
}

impl Trigger for AutonomousTrigger {
    fn extract(&self) -> RenameRequest {
        RenameRequest {
            new_name: self.params.new_name.clone(),
            reason: reason_or_default(self.params.reason.as_deref()),
            origin: Origin::Autonomous,
            group_id: self.context.group_id.clone(),
            user_id: self.context.user_id.clone(),
            platform: self.context.platform.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

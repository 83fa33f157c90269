//! Plugin Surface
//!
//! TigerStyle: What the host registers and how it calls in.
//!
//! [`Plugin`] owns the config and the pipeline, describes its components so
//! the host can register them, and routes host events to the right trigger.

use crate::config::PluginConfig;
use crate::host::{Host, InvocationContext};
use crate::pipeline::{RenameOutcome, RenamePipeline, ACTION_NAME};
use crate::rename_api::GroupRenamer;
use crate::triggers::autonomous::{self, ACTIVATION_KEYWORDS};
use crate::triggers::command::COMMAND_PATTERN;
use crate::triggers::{ActionParams, ActivationMode, AutonomousTrigger, CommandTrigger, Trigger};
use serde::Serialize;
use std::sync::Arc;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Command component name
pub const COMMAND_NAME: &str = "change_group_name_command";

/// Prompt the host's LLM judge uses to decide on the action
pub const LLM_JUDGE_PROMPT: &str = "\
你是有温度的赛博群友，而非机械执行程序。修改群名决策需综合聊天语境和群组氛围判断
判定是否需要使用修改群名动作
修改群名动作的严格条件：

使用修改群名的情况：
1. 群主或管理员明确要求修改群名
2. 群名包含违规内容需要更改
3. 群名不符合群组主题需要优化
4. 特殊节日或活动需要临时更换群名

绝对不要使用的情况：
1. 没有明确授权的情况下擅自修改群名
2. 仅仅因为个人喜好而修改群名
3. 在没有讨论的情况下突然改变群名
";

// =============================================================================
// Component Descriptors
// =============================================================================

/// Parameter the host should extract for the action
#[derive(Debug, Clone, Serialize)]
pub struct ActionParameter {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registration info for the autonomous action
#[derive(Debug, Clone, Serialize)]
pub struct ActionInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Activation in focus mode
    pub focus_activation: &'static str,
    /// Activation in normal mode
    pub normal_activation: &'static str,
    pub activation_keywords: Vec<&'static str>,
    pub keyword_case_sensitive: bool,
    pub llm_judge_prompt: &'static str,
    pub parameters: Vec<ActionParameter>,
    pub require: Vec<&'static str>,
    pub associated_types: Vec<&'static str>,
    pub parallel_action: bool,
}

/// Registration info for the command
#[derive(Debug, Clone, Serialize)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub pattern: &'static str,
    pub help: &'static str,
    pub examples: Vec<&'static str>,
    pub intercept_message: bool,
    /// Advertised cooldown; enforcement is up to the host
    pub cooldown_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentInfo {
    Action(ActionInfo),
    Command(CommandInfo),
}

pub fn action_info() -> ActionInfo {
    ActionInfo {
        name: ACTION_NAME,
        description: "智能修改群名系统，基于LLM判断是否需要修改群名",
        focus_activation: "llm_judge",
        normal_activation: "keyword",
        activation_keywords: ACTIVATION_KEYWORDS.to_vec(),
        keyword_case_sensitive: false,
        llm_judge_prompt: LLM_JUDGE_PROMPT,
        parameters: vec![
            ActionParameter {
                name: "new_name",
                description: "新的群名称，必填，请仔细确认新群名符合群组主题且不包含违规内容",
            },
            ActionParameter {
                name: "reason",
                description: "修改群名理由，可选",
            },
        ],
        require: vec![
            "当群主或管理员明确要求修改群名时使用",
            "当群名包含违规内容需要更改时使用",
            "当群名不符合群组主题需要优化时使用",
        ],
        associated_types: vec!["text", "command"],
        parallel_action: true,
    }
}

pub fn command_info(cooldown_seconds: u64) -> CommandInfo {
    CommandInfo {
        name: COMMAND_NAME,
        description: "修改群名命令，手动执行修改群名操作",
        pattern: COMMAND_PATTERN,
        help: "修改群名，用法：/change_group_name <新群名> [理由]",
        examples: vec!["/change_group_name 新群名", "/change_group_name 新群名 更换主题"],
        intercept_message: true,
        cooldown_seconds,
    }
}

// =============================================================================
// Plugin
// =============================================================================

/// Configured plugin instance
pub struct Plugin {
    config: Arc<PluginConfig>,
    pipeline: RenamePipeline,
}

impl Plugin {
    pub fn new(config: PluginConfig, renamer: Arc<dyn GroupRenamer>) -> Self {
        let pipeline = RenamePipeline::new(&config, renamer);
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }

    /// Replace the pipeline built by [`Plugin::new`]
    pub fn with_pipeline(mut self, pipeline: RenamePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn action_enabled(&self) -> bool {
        self.config.plugin.enabled && self.config.components.enable_smart_change_name
    }

    pub fn command_enabled(&self) -> bool {
        self.config.plugin.enabled && self.config.components.enable_change_name_command
    }

    /// Components the host should register
    pub fn components(&self) -> Vec<ComponentInfo> {
        let mut components = Vec::new();
        if self.action_enabled() {
            components.push(ComponentInfo::Action(action_info()));
        }
        if self.command_enabled() {
            components.push(ComponentInfo::Command(command_info(
                self.config.change_name_command.cooldown_seconds,
            )));
        }
        components
    }

    /// Whether the host should offer the action for this message
    pub fn should_activate(&self, mode: ActivationMode, text: &str, llm_judged: bool) -> bool {
        self.action_enabled() && autonomous::should_activate(mode, text, llm_judged)
    }

    /// Handle a chat message. `None` means the message was not intercepted.
    pub async fn on_message(
        &self,
        text: &str,
        context: InvocationContext,
        host: &Host,
    ) -> Option<RenameOutcome> {
        if !self.command_enabled() {
            return None;
        }
        let trigger = CommandTrigger::parse(text, context)?;
        Some(self.pipeline.handle(trigger.extract(), host).await)
    }

    /// Run the action with host-extracted parameters. `None` when disabled.
    pub async fn on_action(
        &self,
        params: ActionParams,
        context: InvocationContext,
        host: &Host,
    ) -> Option<RenameOutcome> {
        if !self.action_enabled() {
            tracing::debug!("Smart rename action is disabled");
            return None;
        }
        let trigger = AutonomousTrigger::new(params, context);
        Some(self.pipeline.handle(trigger.extract(), host).await)
    }
}

// =============================================================================
// Tests
// =============================================================================

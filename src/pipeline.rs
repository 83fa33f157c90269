//! Rename Pipeline
//!
//! TigerStyle: permission → validation → NapCat call → feedback, shared by
//! both triggers.
//!
//! The two origins fail differently on purpose:
//! - Command: a permission failure aborts before validation with a direct
//!   error message.
//! - Autonomous: validation still runs, and a permitted-looking but refused
//!   request gets an apologetic, LLM-restyled reply plus an action record, so
//!   the bot stays in character. The rename API is never called.
//!
//! Every path ends in a [`RenameOutcome`]; nothing escapes to the host.

use crate::action_log::ActionRecord;
use crate::config::PluginConfig;
use crate::host::Host;
use crate::permissions::{PermissionKey, PermissionList};
use crate::rename_api::{GroupRenamer, RenameApiError};
use crate::templates::TemplateSet;
use crate::validation::{validate_name, NameViolation, GROUP_NAME_CHARS_MAX};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Action name used in action records
pub const ACTION_NAME: &str = "change_group_name";

/// Raw apology handed to the rewriter when the group is not permitted
const APOLOGY_RAW_REPLY: &str = "我想把群名改为{new_name}，但是我没有权限";

/// Rewrite intent for the apology
const APOLOGY_REASON: &str = "表达自己没有在这个群修改群名的能力";

// =============================================================================
// Types
// =============================================================================

/// Which trigger produced the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Autonomous,
    Command,
}

/// One rename attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RenameRequest {
    pub new_name: Option<String>,
    pub reason: String,
    pub origin: Origin,
    pub group_id: Option<String>,
    pub user_id: Option<String>,
    pub platform: String,
}

/// Failure categories reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    MissingName,
    NameTooLong,
    PermissionDenied,
    GroupIdMissing,
    TransportError,
    HttpError,
    ApiRejected,
}

/// Terminal result of an invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameOutcome {
    pub success: bool,
    /// Result string for host logging, not the chat message
    pub message: String,
    pub failure: Option<FailureKind>,
}

impl RenameOutcome {
    fn succeeded(new_name: &str) -> Self {
        Self {
            success: true,
            message: format!("成功修改群名为 {}", new_name),
            failure: None,
        }
    }

    fn failed(failure: Option<FailureKind>, message: String) -> Self {
        Self {
            success: false,
            message,
            failure,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Pipeline failures
#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error("new group name is missing")]
    MissingName,

    #[error("group name too long: {chars} > {max} characters")]
    NameTooLong { chars: usize, max: usize },

    #[error("{0}")]
    PermissionDenied(String),

    #[error("group id missing")]
    GroupIdMissing,

    #[error(transparent)]
    Api(#[from] RenameApiError),
}

impl RenameError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingName => FailureKind::MissingName,
            Self::NameTooLong { .. } => FailureKind::NameTooLong,
            Self::PermissionDenied(_) => FailureKind::PermissionDenied,
            Self::GroupIdMissing => FailureKind::GroupIdMissing,
            Self::Api(RenameApiError::Transport(_)) => FailureKind::TransportError,
            Self::Api(RenameApiError::Http { .. }) => FailureKind::HttpError,
            Self::Api(RenameApiError::Rejected { .. }) => FailureKind::ApiRejected,
        }
    }
}

impl From<NameViolation> for RenameError {
    fn from(violation: NameViolation) -> Self {
        match violation {
            NameViolation::Missing => Self::MissingName,
            NameViolation::TooLong { chars } => Self::NameTooLong {
                chars,
                max: GROUP_NAME_CHARS_MAX,
            },
        }
    }
}

impl Origin {
    /// Fixed chat message for a failure
    pub fn chat_message(self, err: &RenameError) -> String {
        match (self, err) {
            (Self::Autonomous, RenameError::MissingName) => "没有指定新群名呢~".to_string(),
            (Self::Autonomous, RenameError::NameTooLong { max, .. }) => {
                format!("群名太长啦，不能超过{}个字符哦~", max)
            }
            (Self::Autonomous, RenameError::PermissionDenied(reason)) => reason.clone(),
            (Self::Autonomous, RenameError::GroupIdMissing) => {
                "执行修改群名动作失败（群ID缺失）".to_string()
            }
            (Self::Autonomous, RenameError::Api(e)) => {
                format!("执行修改群名动作失败（{}）", api_failure_label(e))
            }
            (Self::Command, RenameError::MissingName) => "❌ 命令参数不完整，请检查格式".to_string(),
            (Self::Command, RenameError::NameTooLong { max, .. }) => {
                format!("❌ 群名太长啦，不能超过{}个字符哦~", max)
            }
            (Self::Command, RenameError::PermissionDenied(reason)) => format!("❌ {}", reason),
            (Self::Command, RenameError::GroupIdMissing) => "❌ 无法获取群聊ID".to_string(),
            (Self::Command, RenameError::Api(e)) => {
                format!("❌ 发送修改群名命令失败（{}）", api_failure_label(e))
            }
        }
    }

    /// Result string handed back to the host
    pub fn internal_message(self, err: &RenameError) -> String {
        match (self, err) {
            (_, RenameError::PermissionDenied(reason)) => reason.clone(),
            (_, RenameError::Api(e)) => e.to_string(),
            (Self::Autonomous, RenameError::MissingName) => "新群名不能为空".to_string(),
            (Self::Autonomous, RenameError::NameTooLong { max, .. }) => {
                format!("群名过长，不能超过{}个字符", max)
            }
            (Self::Autonomous, RenameError::GroupIdMissing) => "无法获取群聊ID".to_string(),
            (Self::Command, RenameError::MissingName) => "参数不完整".to_string(),
            (Self::Command, RenameError::NameTooLong { .. }) => "群名过长".to_string(),
            (Self::Command, RenameError::GroupIdMissing) => "群聊ID缺失".to_string(),
        }
    }
}

fn api_failure_label(err: &RenameApiError) -> &'static str {
    match err {
        RenameApiError::Transport(_) => "API异常",
        RenameApiError::Http { .. } => "API请求失败",
        RenameApiError::Rejected { .. } => "API返回失败",
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Shared rename logic for both triggers
pub struct RenamePipeline {
    /// Gates the autonomous action
    group_permissions: PermissionList,
    /// Gates the command
    user_permissions: PermissionList,
    templates: TemplateSet,
    renamer: Arc<dyn GroupRenamer>,
    log_prefix: String,
    /// Fixed seed for template selection; entropy when `None`
    seed: Option<u64>,
}

impl RenamePipeline {
    pub fn new(config: &PluginConfig, renamer: Arc<dyn GroupRenamer>) -> Self {
        Self {
            group_permissions: PermissionList::new(
                "smart_change_name",
                config.permissions.allowed_groups.clone(),
            ),
            user_permissions: PermissionList::new(
                "change_name_command",
                config.permissions.allowed_users.clone(),
            ),
            templates: TemplateSet::new(config.change_name.templates.clone()),
            renamer,
            log_prefix: config.logging.prefix.clone(),
            seed: None,
        }
    }

    /// Make template selection deterministic
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Run one request to completion
    pub async fn handle(&self, request: RenameRequest, host: &Host) -> RenameOutcome {
        let span = tracing::info_span!(
            "rename",
            prefix = %self.log_prefix,
            origin = ?request.origin,
            platform = %request.platform,
            group_id = request.group_id.as_deref().unwrap_or("-"),
        );

        async move {
            let origin = request.origin;
            let result = match origin {
                Origin::Autonomous => self.run_autonomous(&request, host).await,
                Origin::Command => self.run_command(&request, host).await,
            };

            match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Rename invocation failed unexpectedly");
                    if origin == Origin::Command {
                        if let Err(send_err) = host
                            .chat
                            .send_text(&format!("❌ 修改群名命令错误: {}", e))
                            .await
                        {
                            tracing::error!(error = %send_err, "Failed to report command error");
                        }
                    }
                    RenameOutcome::failed(None, e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_command(
        &self,
        request: &RenameRequest,
        host: &Host,
    ) -> anyhow::Result<RenameOutcome> {
        let origin = Origin::Command;

        if let Err(err) = self.check_user(request) {
            return self.fail(origin, err, host).await;
        }

        let name = match validate_name(request.new_name.as_deref()) {
            Ok(name) => name,
            Err(violation) => return self.fail(origin, violation.into(), host).await,
        };

        tracing::info!(new_name = %name, "Executing rename command");

        let group_id = match non_empty(request.group_id.as_deref()) {
            Some(id) => id,
            None => return self.fail(origin, RenameError::GroupIdMissing, host).await,
        };

        if let Err(e) = self.renamer.set_group_name(group_id, name).await {
            return self.fail(origin, e.into(), host).await;
        }

        let message = self.render(name, &request.reason)?;
        host.chat.send_text(&message).await?;

        tracing::info!(group_id = %group_id, new_name = %name, "Group renamed");
        Ok(RenameOutcome::succeeded(name))
    }

    async fn run_autonomous(
        &self,
        request: &RenameRequest,
        host: &Host,
    ) -> anyhow::Result<RenameOutcome> {
        let origin = Origin::Autonomous;
        tracing::info!("Executing smart rename action");

        // Evaluated now, acted on after validation
        let permission = self.check_group(request);

        let name = match validate_name(request.new_name.as_deref()) {
            Ok(name) => name,
            Err(violation) => return self.fail(origin, violation.into(), host).await,
        };

        if let Err(err) = permission {
            tracing::warn!(error = %err, "Permission check failed, replying with apology");

            let raw_reply = APOLOGY_RAW_REPLY.replace("{new_name}", name);
            self.emit_rewritten(host, &raw_reply, APOLOGY_REASON).await?;
            self.record(
                host,
                request,
                format!("尝试修改群名为 {}，但是没有权限，无法操作", name),
            )
            .await;

            return Ok(RenameOutcome::failed(
                Some(err.kind()),
                origin.internal_message(&err),
            ));
        }

        let group_id = match non_empty(request.group_id.as_deref()) {
            Some(id) => id,
            None => return self.fail(origin, RenameError::GroupIdMissing, host).await,
        };

        if let Err(e) = self.renamer.set_group_name(group_id, name).await {
            return self.fail(origin, e.into(), host).await;
        }

        tracing::info!(group_id = %group_id, new_name = %name, "Group renamed");

        let message = self.render(name, &request.reason)?;
        self.emit_rewritten(host, &message, &request.reason).await?;
        self.record(
            host,
            request,
            format!("尝试修改群名为 {}，原因：{}", name, request.reason),
        )
        .await;

        Ok(RenameOutcome::succeeded(name))
    }

    fn check_group(&self, request: &RenameRequest) -> Result<(), RenameError> {
        let Some(group_id) = request.group_id.as_deref() else {
            return Err(RenameError::PermissionDenied(
                "修改群名动作只能在群聊中使用".to_string(),
            ));
        };

        let key = PermissionKey::new(&request.platform, group_id);
        if self.group_permissions.allows(&key) {
            Ok(())
        } else {
            Err(RenameError::PermissionDenied(
                "当前群组没有使用修改群名动作的权限".to_string(),
            ))
        }
    }

    fn check_user(&self, request: &RenameRequest) -> Result<(), RenameError> {
        let Some(user_id) = request.user_id.as_deref() else {
            return Err(RenameError::PermissionDenied("无法获取聊天流信息".to_string()));
        };

        let key = PermissionKey::new(&request.platform, user_id);
        if self.user_permissions.allows(&key) {
            Ok(())
        } else {
            Err(RenameError::PermissionDenied(
                "你没有使用修改群名命令的权限".to_string(),
            ))
        }
    }

    /// Report a failure to chat and build the outcome
    async fn fail(
        &self,
        origin: Origin,
        err: RenameError,
        host: &Host,
    ) -> anyhow::Result<RenameOutcome> {
        let internal = origin.internal_message(&err);
        tracing::error!(kind = ?err.kind(), error = %internal, "Rename failed");

        host.chat.send_text(&origin.chat_message(&err)).await?;
        Ok(RenameOutcome::failed(Some(err.kind()), internal))
    }

    fn render(&self, new_name: &str, reason: &str) -> anyhow::Result<String> {
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.templates
            .render_random(&mut rng, new_name, reason)
            .ok_or_else(|| anyhow::anyhow!("no message templates configured"))
    }

    /// Send the host's rewrite of `raw_reply`, or `raw_reply` itself if the
    /// rewrite fails or comes back empty
    async fn emit_rewritten(&self, host: &Host, raw_reply: &str, reason: &str) -> anyhow::Result<()> {
        let segments = match host.rewriter.rewrite_reply(raw_reply, reason).await {
            Ok(segments) if segments.iter().any(|s| !s.is_empty()) => segments,
            Ok(_) => {
                tracing::debug!("Rewriter returned nothing, sending raw reply");
                vec![raw_reply.to_string()]
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reply rewrite failed, sending raw reply");
                vec![raw_reply.to_string()]
            }
        };

        for segment in segments.iter().filter(|s| !s.is_empty()) {
            host.chat.send_text(segment).await?;
        }
        Ok(())
    }

    async fn record(&self, host: &Host, request: &RenameRequest, display: String) {
        let record = ActionRecord::new(
            ACTION_NAME,
            &request.platform,
            request.group_id.as_deref(),
            display,
            true,
        );
        if let Err(e) = host.actions.store_action_info(record).await {
            tracing::error!(error = %e, "Failed to store action record");
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::ActionLog;
    use crate::host::{ChatSink, CollectingChat, ReplyRewriter, VerbatimRewriter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records calls and answers with a fixed result
    struct FakeRenamer {
        calls: AtomicUsize,
        fail_with: Option<fn() -> RenameApiError>,
    }

    impl FakeRenamer {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
            })
        }

        fn failing(f: fn() -> RenameApiError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_with: Some(f),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GroupRenamer for FakeRenamer {
        async fn set_group_name(&self, _: &str, _: &str) -> Result<(), RenameApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(f) => Err(f()),
                None => Ok(()),
            }
        }
    }

    struct FailingRewriter;

    #[async_trait]
    impl ReplyRewriter for FailingRewriter {
        async fn rewrite_reply(&self, _: &str, _: &str) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("llm unavailable")
        }
    }

    struct SplittingRewriter;

    #[async_trait]
    impl ReplyRewriter for SplittingRewriter {
        async fn rewrite_reply(&self, raw: &str, _: &str) -> anyhow::Result<Vec<String>> {
            Ok(vec!["嗯嗯".to_string(), raw.to_string()])
        }
    }

    /// Returns the same segments for every rewrite
    struct FixedRewriter(Vec<&'static str>);

    #[async_trait]
    impl ReplyRewriter for FixedRewriter {
        async fn rewrite_reply(&self, _: &str, _: &str) -> anyhow::Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct BrokenChat;

    #[async_trait]
    impl ChatSink for BrokenChat {
        async fn send_text(&self, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("chat stream closed")
        }
    }

    struct Harness {
        chat: Arc<CollectingChat>,
        actions: ActionLog,
        host: Host,
    }

    fn harness_with(rewriter: Arc<dyn ReplyRewriter>) -> Harness {
        let chat = Arc::new(CollectingChat::new());
        let actions = ActionLog::new();
        let host = Host {
            chat: chat.clone(),
            rewriter,
            actions: Arc::new(actions.clone()),
        };
        Harness {
            chat,
            actions,
            host,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(VerbatimRewriter))
    }

    fn config(groups: &[&str], users: &[&str]) -> PluginConfig {
        let mut config = PluginConfig::default();
        config.permissions.allowed_groups = groups.iter().map(|s| s.to_string()).collect();
        config.permissions.allowed_users = users.iter().map(|s| s.to_string()).collect();
        config
    }

    fn request(origin: Origin, name: Option<&str>, group: &str, user: &str) -> RenameRequest {
        RenameRequest {
            new_name: name.map(str::to_string),
            reason: "换个主题".to_string(),
            origin,
            group_id: Some(group.to_string()),
            user_id: Some(user.to_string()),
            platform: "qq".to_string(),
        }
    }

    #[tokio::test]
    async fn test_too_long_never_calls_api() {
        for origin in [Origin::Autonomous, Origin::Command] {
            let renamer = FakeRenamer::ok();
            let pipeline = RenamePipeline::new(&config(&[], &[]), renamer.clone());
            let h = harness();

            let long = "名".repeat(21);
            let outcome = pipeline
                .handle(request(origin, Some(long.as_str()), "111", "42"), &h.host)
                .await;

            assert!(!outcome.success);
            assert_eq!(outcome.failure, Some(FailureKind::NameTooLong));
            assert_eq!(renamer.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_missing_name_never_calls_api() {
        for name in [None, Some("")] {
            for origin in [Origin::Autonomous, Origin::Command] {
                let renamer = FakeRenamer::ok();
                let pipeline = RenamePipeline::new(&config(&[], &[]), renamer.clone());
                let h = harness();

                let outcome = pipeline.handle(request(origin, name, "111", "42"), &h.host).await;

                assert_eq!(outcome.failure, Some(FailureKind::MissingName));
                assert_eq!(renamer.calls(), 0);
            }
        }
    }

    #[tokio::test]
    async fn test_validation_messages_per_origin() {
        let pipeline = RenamePipeline::new(&config(&[], &[]), FakeRenamer::ok());

        let h = harness();
        let outcome = pipeline
            .handle(request(Origin::Autonomous, None, "111", "42"), &h.host)
            .await;
        assert_eq!(outcome.message, "新群名不能为空");
        assert_eq!(h.chat.drain().await, vec!["没有指定新群名呢~".to_string()]);

        let h = harness();
        let outcome = pipeline
            .handle(request(Origin::Command, None, "111", "42"), &h.host)
            .await;
        assert_eq!(outcome.message, "参数不完整");
        assert_eq!(h.chat.drain().await, vec!["❌ 命令参数不完整，请检查格式".to_string()]);
    }

    #[tokio::test]
    async fn test_group_allow_list() {
        let renamer = FakeRenamer::ok();
        let pipeline = RenamePipeline::new(&config(&["qq:111"], &[]), renamer.clone());

        let h = harness();
        let allowed = pipeline
            .handle(request(Origin::Autonomous, Some("新群名"), "111", "42"), &h.host)
            .await;
        assert!(allowed.success);
        assert_eq!(renamer.calls(), 1);

        let h = harness();
        let denied = pipeline
            .handle(request(Origin::Autonomous, Some("新群名"), "222", "42"), &h.host)
            .await;
        assert!(!denied.success);
        assert_eq!(denied.failure, Some(FailureKind::PermissionDenied));
        assert_eq!(renamer.calls(), 1);
    }

    #[tokio::test]
    async fn test_denied_autonomous_apologizes_and_records() {
        let renamer = FakeRenamer::ok();
        let pipeline = RenamePipeline::new(&config(&["qq:111"], &[]), renamer.clone());
        let h = harness();

        let outcome = pipeline
            .handle(request(Origin::Autonomous, Some("新群名"), "222", "42"), &h.host)
            .await;

        assert_eq!(renamer.calls(), 0);
        assert_eq!(outcome.message, "当前群组没有使用修改群名动作的权限");
        assert_eq!(
            h.chat.drain().await,
            vec!["我想把群名改为新群名，但是我没有权限".to_string()]
        );

        let records = h.actions.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].done);
        assert!(records[0].display.contains("没有权限"));
    }

    #[tokio::test]
    async fn test_denied_autonomous_still_validates_first() {
        let pipeline = RenamePipeline::new(&config(&["qq:111"], &[]), FakeRenamer::ok());
        let h = harness();

        let outcome = pipeline
            .handle(request(Origin::Autonomous, None, "222", "42"), &h.host)
            .await;

        assert_eq!(outcome.failure, Some(FailureKind::MissingName));
        assert!(h.actions.is_empty().await);
    }

    #[tokio::test]
    async fn test_not_a_group_chat() {
        let renamer = FakeRenamer::ok();
        let pipeline = RenamePipeline::new(&config(&[], &[]), renamer.clone());
        let h = harness();

        let mut req = request(Origin::Autonomous, Some("新群名"), "111", "42");
        req.group_id = None;
        let outcome = pipeline.handle(req, &h.host).await;

        assert_eq!(outcome.failure, Some(FailureKind::PermissionDenied));
        assert_eq!(outcome.message, "修改群名动作只能在群聊中使用");
        assert_eq!(renamer.calls(), 0);
    }

    #[tokio::test]
    async fn test_command_denied_aborts_before_validation() {
        let renamer = FakeRenamer::ok();
        let pipeline = RenamePipeline::new(&config(&[], &["qq:42"]), renamer.clone());
        let h = harness();

        // Invalid name too, but permission is reported
        let outcome = pipeline
            .handle(request(Origin::Command, None, "111", "7"), &h.host)
            .await;

        assert_eq!(outcome.failure, Some(FailureKind::PermissionDenied));
        assert_eq!(outcome.message, "你没有使用修改群名命令的权限");
        assert_eq!(
            h.chat.drain().await,
            vec!["❌ 你没有使用修改群名命令的权限".to_string()]
        );
        assert!(h.actions.is_empty().await);
        assert_eq!(renamer.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_user_list_allows_everyone() {
        let renamer = FakeRenamer::ok();
        let pipeline = RenamePipeline::new(&config(&[], &[]), renamer.clone());

        for user in ["1", "2", "999999"] {
            let h = harness();
            let outcome = pipeline
                .handle(request(Origin::Command, Some("新群名"), "111", user), &h.host)
                .await;
            assert!(outcome.success);
        }
        assert_eq!(renamer.calls(), 3);
    }

    #[tokio::test]
    async fn test_command_without_sender() {
        let pipeline = RenamePipeline::new(&config(&[], &[]), FakeRenamer::ok());
        let h = harness();

        let mut req = request(Origin::Command, Some("新群名"), "111", "42");
        req.user_id = None;
        let outcome = pipeline.handle(req, &h.host).await;

        assert_eq!(outcome.message, "无法获取聊天流信息");
    }

    #[tokio::test]
    async fn test_empty_group_id_is_group_id_missing() {
        for origin in [Origin::Autonomous, Origin::Command] {
            let renamer = FakeRenamer::ok();
            let pipeline = RenamePipeline::new(&config(&[], &[]), renamer.clone());
            let h = harness();

            let outcome = pipeline
                .handle(request(origin, Some("新群名"), "", "42"), &h.host)
                .await;

            assert_eq!(outcome.failure, Some(FailureKind::GroupIdMissing));
            assert_eq!(renamer.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_command_success_uses_template() {
        let pipeline = RenamePipeline::new(&config(&[], &[]), FakeRenamer::ok()).with_seed(3);
        let h = harness();

        let outcome = pipeline
            .handle(request(Origin::Command, Some("Foo"), "111", "42"), &h.host)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "成功修改群名为 Foo");

        let sent = h.chat.drain().await;
        assert_eq!(sent.len(), 1);
        let matches_template = pipeline
            .templates()
            .as_slice()
            .iter()
            .any(|t| crate::templates::render_template(t, "Foo", "换个主题") == sent[0]);
        assert!(matches_template, "unexpected message {}", sent[0]);
        // Commands do not write action records
        assert!(h.actions.is_empty().await);
    }

    #[tokio::test]
    async fn test_seeded_pipeline_is_deterministic() {
        let pipeline = RenamePipeline::new(&config(&[], &[]), FakeRenamer::ok()).with_seed(11);
        let mut sent = Vec::new();
        for _ in 0..3 {
            let h = harness();
            pipeline
                .handle(request(Origin::Command, Some("Foo"), "111", "42"), &h.host)
                .await;
            sent.extend(h.chat.drain().await);
        }
        assert!(sent.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_autonomous_success_records_action() {
        let pipeline = RenamePipeline::new(&config(&[], &[]), FakeRenamer::ok());
        let h = harness_with(Arc::new(SplittingRewriter));

        let outcome = pipeline
            .handle(request(Origin::Autonomous, Some("Foo"), "111", "42"), &h.host)
            .await;

        assert!(outcome.success);
        let sent = h.chat.drain().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], "嗯嗯");
        assert!(sent[1].contains("Foo"));

        let records = h.actions.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display, "尝试修改群名为 Foo，原因：换个主题");
        assert_eq!(records[0].group_id.as_deref(), Some("111"));
    }

    #[tokio::test]
    async fn test_rewrite_failure_falls_back_to_raw() {
        let pipeline = RenamePipeline::new(&config(&[], &[]), FakeRenamer::ok());
        let h = harness_with(Arc::new(FailingRewriter));

        let outcome = pipeline
            .handle(request(Origin::Autonomous, Some("Foo"), "111", "42"), &h.host)
            .await;

        assert!(outcome.success);
        let sent = h.chat.drain().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Foo") && sent[0].contains("换个主题"));
    }

    #[tokio::test]
    async fn test_apology_segments_sent_in_order() {
        let renamer = FakeRenamer::ok();
        let pipeline = RenamePipeline::new(&config(&["qq:111"], &[]), renamer.clone());
        let h = harness_with(Arc::new(FixedRewriter(vec!["抱歉", "", "这个群我改不了"])));

        let outcome = pipeline
            .handle(request(Origin::Autonomous, Some("新群名"), "222", "42"), &h.host)
            .await;

        assert_eq!(outcome.failure, Some(FailureKind::PermissionDenied));
        assert_eq!(renamer.calls(), 0);
        assert_eq!(
            h.chat.drain().await,
            vec!["抱歉".to_string(), "这个群我改不了".to_string()]
        );
        assert_eq!(h.actions.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_apology_rewrite_sends_raw() {
        for segments in [vec![], vec![""]] {
            let pipeline = RenamePipeline::new(&config(&["qq:111"], &[]), FakeRenamer::ok());
            let h = harness_with(Arc::new(FixedRewriter(segments)));

            let outcome = pipeline
                .handle(request(Origin::Autonomous, Some("新群名"), "222", "42"), &h.host)
                .await;

            assert_eq!(outcome.failure, Some(FailureKind::PermissionDenied));
            assert_eq!(
                h.chat.drain().await,
                vec!["我想把群名改为新群名，但是我没有权限".to_string()]
            );
        }
    }

    #[tokio::test]
    async fn test_empty_success_rewrite_sends_raw_template() {
        let pipeline = RenamePipeline::new(&config(&[], &[]), FakeRenamer::ok());
        let h = harness_with(Arc::new(FixedRewriter(vec![])));

        let outcome = pipeline
            .handle(request(Origin::Autonomous, Some("Foo"), "111", "42"), &h.host)
            .await;

        assert!(outcome.success);
        let sent = h.chat.drain().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Foo") && sent[0].contains("换个主题"));
    }

    #[tokio::test]
    async fn test_api_failures_map_to_kinds() {
        let cases: [(fn() -> RenameApiError, FailureKind, &str); 3] = [
            (
                || RenameApiError::Transport("connection refused".to_string()),
                FailureKind::TransportError,
                "执行修改群名动作失败（API异常）",
            ),
            (
                || RenameApiError::Http { status: 502 },
                FailureKind::HttpError,
                "执行修改群名动作失败（API请求失败）",
            ),
            (
                || RenameApiError::Rejected {
                    body: serde_json::json!({"status": "failed", "retcode": 1}),
                },
                FailureKind::ApiRejected,
                "执行修改群名动作失败（API返回失败）",
            ),
        ];

        for (make, kind, chat) in cases {
            let pipeline = RenamePipeline::new(&config(&[], &[]), FakeRenamer::failing(make));
            let h = harness();

            let outcome = pipeline
                .handle(request(Origin::Autonomous, Some("Foo"), "111", "42"), &h.host)
                .await;

            assert_eq!(outcome.failure, Some(kind));
            assert_eq!(h.chat.drain().await, vec![chat.to_string()]);
            assert!(h.actions.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_chat_failure_is_caught_for_command() {
        let renamer = FakeRenamer::ok();
        let pipeline = RenamePipeline::new(&config(&[], &[]), renamer.clone());
        let host = Host {
            chat: Arc::new(BrokenChat),
            rewriter: Arc::new(VerbatimRewriter),
            actions: Arc::new(ActionLog::new()),
        };

        let outcome = pipeline
            .handle(request(Origin::Command, Some("Foo"), "111", "42"), &host)
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.failure, None);
        assert_eq!(outcome.message, "chat stream closed");
        assert_eq!(renamer.calls(), 1);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RenameError::MissingName.kind(), FailureKind::MissingName);
        assert_eq!(
            RenameError::from(NameViolation::TooLong { chars: 30 }).kind(),
            FailureKind::NameTooLong
        );
        assert_eq!(
            RenameError::Api(RenameApiError::Http { status: 500 }).kind(),
            FailureKind::HttpError
        );
    }
}

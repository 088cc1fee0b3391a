//! 控制器：启动时接线，关闭时拆除
//!
//! 所有定时器、事件订阅和命令都挂在同一个 [`Controller`] 上，
//! 每次触发都会重新获取第一个仓库并独立完成一次检查。

pub mod actions;
pub mod observer;
pub mod scheduler;

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures_util::FutureExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::config::{ConfigurationProvider, CONFIG_SECTION};
use crate::git::{CommandRunner, GitApi, GIT_EXTENSION_ID};
use crate::host::{CommandHandler, CommandRegistry, Host, Workspace};
use crate::infrastructure::{GuideError, OutputChannel};
use crate::ui::Ui;

pub use actions::{ApplyStashOutcome, CreateBranchOutcome, UndoOutcome};
pub use observer::BranchSuggestionOutcome;
pub use scheduler::{CommitReminderOutcome, RepeatingTimer, SnapshotOutcome};

pub const OUTPUT_CHANNEL_NAME: &str = "GitGuide";

/// 对外注册的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuideCommand {
    UndoLastCommit,
    ApplyLastStash,
    CreateFeatureBranch,
}

impl GuideCommand {
    pub const ALL: [GuideCommand; 3] = [
        GuideCommand::UndoLastCommit,
        GuideCommand::ApplyLastStash,
        GuideCommand::CreateFeatureBranch,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            GuideCommand::UndoLastCommit => "gitguide.undoLastCommit",
            GuideCommand::ApplyLastStash => "gitguide.applyLastStash",
            GuideCommand::CreateFeatureBranch => "gitguide.createFeatureBranch",
        }
    }
}

pub struct Controller {
    output: Arc<OutputChannel>,
    git_api: Arc<dyn GitApi>,
    ui: Arc<dyn Ui>,
    runner: Arc<dyn CommandRunner>,
    workspace: Arc<dyn Workspace>,
    config: Arc<dyn ConfigurationProvider>,
    commands: Arc<CommandRegistry>,
    commit_reminder_timer: Mutex<Option<RepeatingTimer>>,
    auto_snapshot_timer: Mutex<Option<RepeatingTimer>>,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Controller {
    /// 只构造，不启动定时器也不注册任何东西
    pub fn new(output: Arc<OutputChannel>, git_api: Arc<dyn GitApi>, host: &Host) -> Self {
        Self {
            output,
            git_api,
            ui: host.ui.clone(),
            runner: host.runner.clone(),
            workspace: host.workspace.clone(),
            config: host.config.clone(),
            commands: host.commands.clone(),
            commit_reminder_timer: Mutex::new(None),
            auto_snapshot_timer: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// 启动：找不到 Git 能力时直接失败，其余什么都不初始化
    pub async fn activate(host: &Host) -> Result<Arc<Controller>, GuideError> {
        let controller = Self::connect(host).await?;

        controller.start_reminder_timer();
        controller.start_backup_timer();
        controller.subscribe();
        controller.spawn_branch_suggestion();

        Ok(controller)
    }

    /// 只解析 Git 能力并注册命令，用于单次执行命令的场景
    pub async fn connect(host: &Host) -> Result<Arc<Controller>, GuideError> {
        let output = host.create_output_channel(OUTPUT_CHANNEL_NAME);
        output.append_line("GitGuide activated");

        let extension = match host.extensions.get_extension(GIT_EXTENSION_ID) {
            Some(extension) => extension,
            None => {
                let error = GuideError::ProviderUnavailable {
                    id: GIT_EXTENSION_ID.to_string(),
                };
                output.append_line(format!("Error: {}", error));
                host.ui.show_error_message(&error.to_string()).await;
                return Err(error);
            }
        };
        output.append_line("Git extension found");

        let controller = Arc::new(Controller::new(output, extension.get_api(1), host));
        controller.register_commands();
        Ok(controller)
    }

    /// 关闭：取消定时器与订阅，可重复调用
    pub fn deactivate(&self) {
        if let Some(timer) = lock(&self.commit_reminder_timer).take() {
            timer.cancel();
        }
        if let Some(timer) = lock(&self.auto_snapshot_timer).take() {
            timer.cancel();
        }
        for handle in lock(&self.subscriptions).drain(..) {
            handle.abort();
        }
        for command in GuideCommand::ALL {
            self.commands.unregister(command.id());
        }
        self.output.append_line("GitGuide deactivated");
    }

    pub fn output(&self) -> Arc<OutputChannel> {
        self.output.clone()
    }

    pub fn has_active_timers(&self) -> bool {
        lock(&self.commit_reminder_timer).is_some() || lock(&self.auto_snapshot_timer).is_some()
    }

    /// 执行一个命令并记录结果，错误已经展示给用户
    pub async fn run_command(&self, command: GuideCommand) {
        match command {
            GuideCommand::UndoLastCommit => {
                let outcome = self.undo_last_commit().await;
                tracing::debug!(?outcome, "undo last commit finished");
            }
            GuideCommand::ApplyLastStash => {
                let outcome = self.apply_last_stash().await;
                tracing::debug!(?outcome, "apply last stash finished");
            }
            GuideCommand::CreateFeatureBranch => {
                let outcome = self.create_feature_branch().await;
                tracing::debug!(?outcome, "create feature branch finished");
            }
        }
    }

    fn register_commands(self: &Arc<Self>) {
        for command in GuideCommand::ALL {
            let weak = Arc::downgrade(self);
            let handler: CommandHandler = Arc::new(move || {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(controller) => {
                            controller.run_command(command).await;
                            Ok(())
                        }
                        None => anyhow::bail!("GitGuide is not active"),
                    }
                }
                .boxed()
            });
            self.commands.register(command.id(), handler);
        }
    }

    fn subscribe(self: &Arc<Self>) {
        let config_changes = spawn_listener(
            self.config.on_did_change_configuration(),
            Arc::downgrade(self),
            |controller, event| {
                if event.affects_configuration(CONFIG_SECTION) {
                    controller.restart_timers();
                }
            },
        );

        let folder_changes = spawn_listener(
            self.workspace.on_did_change_workspace_folders(),
            Arc::downgrade(self),
            |controller, ()| controller.spawn_branch_suggestion(),
        );

        let state_changes = spawn_listener(
            self.git_api.on_did_change_state(),
            Arc::downgrade(self),
            |controller, ()| controller.spawn_branch_suggestion(),
        );

        lock(&self.subscriptions).extend([config_changes, folder_changes, state_changes]);
    }
}

/// 监听广播事件，控制器被释放或通道关闭时退出
fn spawn_listener<T, F>(
    mut receiver: broadcast::Receiver<T>,
    controller: Weak<Controller>,
    on_event: F,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
    F: Fn(Arc<Controller>, T) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match controller.upgrade() {
                    Some(controller) => on_event(controller, event),
                    None => break,
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Event listener lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

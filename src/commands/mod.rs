use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{Args, Command};
use crate::config::{ConfigWatcher, ConfigurationProvider, GuideConfig, LayeredConfig};
use crate::controller::{Controller, GuideCommand};
use crate::git::{CliGitExtension, ExtensionRegistry, ShellRunner, GIT_EXTENSION_ID};
use crate::host::{Host, HostWorkspace};
use crate::infrastructure::{ErrorCategory, GuideError};
use crate::ui::TerminalUi;

/// 配置文件的轮询间隔
const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// 命令路由器，根据子命令决定执行什么
pub async fn route_command(args: &Args) -> anyhow::Result<()> {
    let workspace_root = args.workspace_root()?;
    let config = Arc::new(LayeredConfig::new(Some(workspace_root.as_path()), args.overrides()));

    match args.command() {
        Command::Config { json } => {
            print_config(&config.get_configuration(), json)?;
            Ok(())
        }
        Command::Watch {
            show_log,
            poll_interval,
        } => {
            let poll_interval = Duration::from_secs(poll_interval.max(1));
            watch(workspace_root, config, poll_interval, show_log).await
        }
        Command::UndoLastCommit => {
            run_once(workspace_root, config, GuideCommand::UndoLastCommit).await
        }
        Command::ApplyLastStash => {
            run_once(workspace_root, config, GuideCommand::ApplyLastStash).await
        }
        Command::CreateFeatureBranch => {
            run_once(workspace_root, config, GuideCommand::CreateFeatureBranch).await
        }
    }
}

struct Session {
    host: Host,
    git: Option<Arc<CliGitExtension>>,
}

impl Session {
    async fn start(
        workspace_root: PathBuf,
        config: Arc<LayeredConfig>,
        poll_interval: Duration,
    ) -> Self {
        let extensions = Arc::new(ExtensionRegistry::new());
        let git = CliGitExtension::detect(Some(workspace_root.clone()), poll_interval)
            .await
            .map(Arc::new);
        if let Some(git) = &git {
            extensions.register(GIT_EXTENSION_ID, git.clone());
        }

        let host = Host::new(
            extensions,
            Arc::new(TerminalUi::new(Some(workspace_root.clone()))),
            Arc::new(ShellRunner),
            Arc::new(HostWorkspace::new(vec![workspace_root])),
            config,
        );

        Self { host, git }
    }

    fn stop(&self) {
        if let Some(git) = &self.git {
            git.stop();
        }
    }
}

async fn watch(
    workspace_root: PathBuf,
    config: Arc<LayeredConfig>,
    poll_interval: Duration,
    show_log: bool,
) -> anyhow::Result<()> {
    let config_watcher = ConfigWatcher::spawn(config.clone(), CONFIG_POLL_INTERVAL);
    let session = Session::start(workspace_root.clone(), config, poll_interval).await;

    let controller = Controller::activate(&session.host).await?;
    tracing::info!("Watching {} (Ctrl+C to stop)", workspace_root.display());

    tokio::signal::ctrl_c().await?;

    controller.deactivate();
    config_watcher.stop();
    session.stop();

    if show_log {
        for line in controller.output().lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

async fn run_once(
    workspace_root: PathBuf,
    config: Arc<LayeredConfig>,
    command: GuideCommand,
) -> anyhow::Result<()> {
    // 单次命令不需要轮询，周期给大一些
    let session = Session::start(workspace_root, config, Duration::from_secs(3600)).await;

    let controller = Controller::connect(&session.host).await?;
    let result = session.host.commands.execute(command.id()).await;

    controller.deactivate();
    session.stop();
    result
}

/// 按错误类别记录命令失败，并返回该类别
pub fn report_error(error: &anyhow::Error) -> ErrorCategory {
    let category = error
        .downcast_ref::<GuideError>()
        .map(GuideError::category)
        .unwrap_or(ErrorCategory::Internal);

    match category {
        ErrorCategory::Fatal => tracing::error!("GitGuide cannot start: {}", error),
        ErrorCategory::Precondition => tracing::warn!("Nothing to do: {}", error),
        ErrorCategory::Operation => tracing::error!("Git operation failed: {}", error),
        ErrorCategory::Configuration => tracing::error!("Invalid configuration: {}", error),
        ErrorCategory::Internal => tracing::error!("{:#}", error),
    }
    category
}

fn print_config(config: &GuideConfig, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("gitguide.commitReminderInterval = {}", config.commit_reminder_interval);
        println!(
            "gitguide.maxFileChangesBeforeReminder = {}",
            config.max_file_changes_before_reminder
        );
        println!("gitguide.autoSnapshotInterval = {}", config.auto_snapshot_interval);
        println!("gitguide.autoBranchOnMain = {}", config.auto_branch_on_main);
    }
    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

use crate::config::PartialConfig;
use crate::infrastructure::{LogFormat, LogOutput, LoggingConfig};

#[derive(Parser, Debug, Default)]
#[command(
    name = "gitguide",
    version,
    about = "Git 习惯提醒 - 定时提醒提交与备份，在 main 分支上建议创建功能分支",
    long_about = "gitguide 在后台观察工作区所在的 Git 仓库：未提交的改动过多时提醒提交，定时询问是否 stash 备份，在 main / master 上有改动时建议创建功能分支。也可以单次执行撤销提交、应用 stash、创建分支等命令。"
)]
pub struct Args {
    /// 工作区目录（默认当前目录）
    #[arg(short = 'w', long, value_name = "PATH", global = true)]
    pub workspace: Option<PathBuf>,

    /// 日志级别（trace, debug, info, warn, error）
    #[arg(long = "log-level", default_value = "info", global = true)]
    pub log_level: String,

    /// 日志格式（pretty, compact, json）
    #[arg(long = "log-format", default_value = "compact", global = true)]
    pub log_format: String,

    /// 日志写入文件而不是 stderr
    #[arg(long = "log-file", value_name = "FILE", global = true, conflicts_with = "log_stdout")]
    pub log_file: Option<String>,

    /// 日志写入 stdout 而不是 stderr
    #[arg(long = "log-stdout", default_value_t = false, global = true)]
    pub log_stdout: bool,

    /// 自定义日志过滤规则（如 gitguide::output=warn），语法同 RUST_LOG
    #[arg(long = "log-filter", value_name = "DIRECTIVES", global = true)]
    pub log_filter: Option<String>,

    // =============== 配置覆盖 ===============
    /// 提交提醒间隔（分钟）
    #[arg(long = "commit-reminder-interval", value_name = "MINUTES", global = true)]
    pub commit_reminder_interval: Option<u64>,

    /// 达到该变更文件数才提醒提交
    #[arg(long = "max-file-changes", value_name = "COUNT", global = true)]
    pub max_file_changes: Option<usize>,

    /// 快照提醒间隔（分钟）
    #[arg(long = "auto-snapshot-interval", value_name = "MINUTES", global = true)]
    pub auto_snapshot_interval: Option<u64>,

    /// 是否在 main / master 上建议创建功能分支
    #[arg(long = "auto-branch-on-main", value_name = "BOOL", global = true)]
    pub auto_branch_on_main: Option<bool>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 常驻运行，按配置定时提醒（默认命令）
    Watch {
        /// 退出时打印本次会话的事件日志
        #[arg(long = "show-log", default_value_t = false)]
        show_log: bool,

        /// 仓库状态轮询间隔（秒）
        #[arg(long = "poll-interval", value_name = "SECONDS", default_value_t = 2)]
        poll_interval: u64,
    },
    /// 撤销最后一次提交，改动保留在暂存区
    UndoLastCommit,
    /// 应用最近的一个 stash
    ApplyLastStash,
    /// 创建并切换到新的功能分支
    CreateFeatureBranch,
    /// 打印生效的配置
    Config {
        /// 以 JSON 输出
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Watch {
            show_log: false,
            poll_interval: 2,
        }
    }
}

impl Args {
    /// 未指定子命令时为 watch
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }

    /// 命令行中的配置覆盖项
    pub fn overrides(&self) -> PartialConfig {
        PartialConfig {
            commit_reminder_interval: self.commit_reminder_interval,
            max_file_changes_before_reminder: self.max_file_changes,
            auto_snapshot_interval: self.auto_snapshot_interval,
            auto_branch_on_main: self.auto_branch_on_main,
        }
    }

    pub fn logging_config(&self) -> anyhow::Result<LoggingConfig> {
        let level: Level = self
            .log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid log level: {}", self.log_level))?;
        let format: LogFormat = self.log_format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        let output = match (&self.log_file, self.log_stdout) {
            (Some(path), _) => LogOutput::File(path.clone()),
            (None, true) => LogOutput::Stdout,
            (None, false) => LogOutput::Stderr,
        };

        Ok(LoggingConfig {
            level,
            format,
            output,
            // debug 及更详细的级别附带源码位置
            include_file_location: level >= Level::DEBUG,
            filter: self.log_filter.clone(),
        })
    }

    /// 工作区根目录，未指定时取当前目录
    pub fn workspace_root(&self) -> anyhow::Result<PathBuf> {
        let root = match &self.workspace {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        if !root.is_dir() {
            anyhow::bail!("workspace is not a directory: {}", root.display());
        }
        Ok(root.canonicalize()?)
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// gitguide 错误类型
#[derive(Error, Debug)]
pub enum GuideError {
    #[error("Git extension required")]
    ProviderUnavailable { id: String },

    #[error("No Git repository found.")]
    NoRepository,

    #[error("No current branch found")]
    NoBranch,

    #[error("No workspace folder found")]
    NoWorkspace,

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    #[error("command `{command}` exited with {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("command '{id}' not found")]
    UnknownCommand { id: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 错误类别，对应前置条件缺失、操作失败等处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 启动即失败，不再初始化任何东西
    Fatal,
    /// 缺少仓库 / 分支 / 工作区
    Precondition,
    /// 变更仓库的操作失败
    Operation,
    Configuration,
    Internal,
}

impl GuideError {
    /// 只有缺少 Git 能力时才是致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, GuideError::ProviderUnavailable { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GuideError::ProviderUnavailable { .. } => ErrorCategory::Fatal,
            GuideError::NoRepository | GuideError::NoBranch | GuideError::NoWorkspace => {
                ErrorCategory::Precondition
            }
            GuideError::Git { .. } | GuideError::CommandFailed { .. } => ErrorCategory::Operation,
            GuideError::Configuration { .. } => ErrorCategory::Configuration,
            GuideError::UnknownCommand { .. } | GuideError::Io(_) => ErrorCategory::Internal,
        }
    }

    pub fn git(command: impl Into<String>, message: impl Into<String>) -> Self {
        GuideError::Git {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        GuideError::Configuration {
            message: message.into(),
            path,
        }
    }
}

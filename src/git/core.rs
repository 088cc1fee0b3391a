use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::infrastructure::GuideError;

/// 在指定目录运行一条 shell 命令，只关心成功或失败
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn exec(&self, command: &str, cwd: &Path) -> anyhow::Result<()>;
}

/// 通过系统 shell 执行命令
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn exec(&self, command: &str, cwd: &Path) -> anyhow::Result<()> {
        tracing::debug!("exec `{}` in {}", command, cwd.display());

        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        };

        let output = cmd
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run `{}`: {}", command, e))?;

        if !output.status.success() {
            return Err(GuideError::CommandFailed {
                command: command.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// 基础 Git 操作工具函数
pub struct GitCore;

impl GitCore {
    /// 运行 git 并返回 stdout，非零退出码视为错误
    pub async fn run(cwd: &Path, args: &[&str]) -> anyhow::Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run git {}: {}", args.join(" "), e))?;

        if !output.status.success() {
            return Err(GuideError::git(
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// 运行 git，失败时返回 None
    pub async fn try_run(cwd: &Path, args: &[&str]) -> Option<String> {
        Self::run(cwd, args).await.ok()
    }

    /// 系统中是否装有 git
    pub async fn is_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// 检查目录是否在 Git 工作树内
    pub async fn is_inside_work_tree(cwd: &Path) -> bool {
        Self::try_run(cwd, &["rev-parse", "--is-inside-work-tree"])
            .await
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    /// 工作树的顶层目录
    pub async fn show_toplevel(cwd: &Path) -> anyhow::Result<std::path::PathBuf> {
        let out = Self::run(cwd, &["rev-parse", "--show-toplevel"]).await?;
        Ok(std::path::PathBuf::from(out.trim()))
    }
}

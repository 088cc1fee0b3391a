//! 用户交互界面：对话框、输入框和宿主命令

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::git::GitCore;

pub const YES: &str = "Yes";
pub const NO: &str = "No";

/// 打开源代码管理视图的宿主命令
pub const OPEN_SCM_VIEW_COMMAND: &str = "workbench.view.scm";

/// 输入框参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBoxOptions {
    pub prompt: String,
    pub place_holder: String,
}

/// 宿主提供的用户界面
///
/// 消息框返回用户点击的按钮，关闭对话框时返回 None。
#[async_trait]
pub trait Ui: Send + Sync {
    async fn show_information_message(&self, message: &str, items: &[&str]) -> Option<String>;

    async fn show_warning_message(&self, message: &str, items: &[&str]) -> Option<String>;

    async fn show_error_message(&self, message: &str);

    /// 空输入与取消都返回 None
    async fn show_input_box(&self, options: InputBoxOptions) -> Option<String>;

    async fn execute_command(&self, command: &str) -> anyhow::Result<()>;
}

/// 把终端输入映射到某个按钮：完整名称、首字母或序号，均不区分大小写
pub fn match_item(input: &str, items: &[&str]) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(n) = input.parse::<usize>() {
        return items.get(n.checked_sub(1)?).map(|s| s.to_string());
    }

    let lower = input.to_lowercase();
    items
        .iter()
        .find(|item| item.to_lowercase() == lower)
        .or_else(|| {
            let mut prefixed = items.iter().filter(|item| item.to_lowercase().starts_with(&lower));
            match (prefixed.next(), prefixed.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        })
        .map(|s| s.to_string())
}

/// 终端实现：对话框是 stdin 提示，同一时刻只显示一个
pub struct TerminalUi {
    workspace_root: Option<PathBuf>,
    prompt_lock: Mutex<()>,
}

impl TerminalUi {
    pub fn new(workspace_root: Option<PathBuf>) -> Self {
        Self {
            workspace_root,
            prompt_lock: Mutex::new(()),
        }
    }

    async fn ask(&self, prefix: &'static str, message: &str, items: &[&str]) -> Option<String> {
        let _guard = self.prompt_lock.lock().await;
        let message = message.to_string();
        let owned: Vec<String> = items.iter().map(|s| s.to_string()).collect();

        let answer = tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
            let mut stdout = io::stdout();
            if owned.is_empty() {
                writeln!(stdout, "{} {}", prefix, message)?;
                return Ok(None);
            }
            write!(stdout, "{} {} [{}]: ", prefix, message, owned.join("/"))?;
            stdout.flush()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
            Ok(match_item(&line, &refs))
        })
        .await;

        match answer {
            Ok(Ok(choice)) => choice,
            Ok(Err(e)) => {
                tracing::warn!("Failed to read answer: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Prompt task failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Ui for TerminalUi {
    async fn show_information_message(&self, message: &str, items: &[&str]) -> Option<String> {
        self.ask("ℹ️ ", message, items).await
    }

    async fn show_warning_message(&self, message: &str, items: &[&str]) -> Option<String> {
        self.ask("⚠️ ", message, items).await
    }

    async fn show_error_message(&self, message: &str) {
        let _guard = self.prompt_lock.lock().await;
        eprintln!("❌ {}", message);
    }

    async fn show_input_box(&self, options: InputBoxOptions) -> Option<String> {
        let _guard = self.prompt_lock.lock().await;

        let answer = tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
            let mut stdout = io::stdout();
            write!(stdout, "✏️  {} (e.g. {}): ", options.prompt, options.place_holder)?;
            stdout.flush()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            let value = line.trim().to_string();
            Ok(if value.is_empty() { None } else { Some(value) })
        })
        .await;

        match answer {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::warn!("Failed to read input: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Input task failed: {}", e);
                None
            }
        }
    }

    async fn execute_command(&self, command: &str) -> anyhow::Result<()> {
        match command {
            OPEN_SCM_VIEW_COMMAND => {
                let root = self
                    .workspace_root
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("No workspace folder found"))?;
                if !GitCore::is_inside_work_tree(root).await {
                    anyhow::bail!("{} is not inside a Git work tree", root.display());
                }
                let status = GitCore::run(root, &["status", "--short", "--branch"]).await?;
                let _guard = self.prompt_lock.lock().await;
                println!("📊 Source Control:");
                println!("{}", "─".repeat(40));
                print!("{}", status);
                Ok(())
            }
            other => anyhow::bail!("Unknown host command: {}", other),
        }
    }
}

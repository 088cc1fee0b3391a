pub mod watcher;

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::infrastructure::GuideError;

pub use watcher::ConfigWatcher;

/// 配置命名空间
pub const CONFIG_SECTION: &str = "gitguide";

/// 工作区配置文件名
pub const WORKSPACE_CONFIG_FILE: &str = ".gitguide.toml";

/// gitguide 的全部配置项，每次使用时重新读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideConfig {
    /// 提交提醒间隔（分钟）
    pub commit_reminder_interval: u64,
    /// 达到该变更文件数才提醒提交
    pub max_file_changes_before_reminder: usize,
    /// 快照（stash）提醒间隔（分钟）
    pub auto_snapshot_interval: u64,
    /// 在 main / master 上有改动时建议创建功能分支
    pub auto_branch_on_main: bool,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            commit_reminder_interval: 15,
            max_file_changes_before_reminder: 5,
            auto_snapshot_interval: 10,
            auto_branch_on_main: true,
        }
    }
}

impl GuideConfig {
    /// 与另一份配置相比发生变化的完整键名（`gitguide.xxx`）
    pub fn changed_keys(&self, other: &GuideConfig) -> Vec<String> {
        let mut keys = Vec::new();
        if self.commit_reminder_interval != other.commit_reminder_interval {
            keys.push(format!("{}.commitReminderInterval", CONFIG_SECTION));
        }
        if self.max_file_changes_before_reminder != other.max_file_changes_before_reminder {
            keys.push(format!("{}.maxFileChangesBeforeReminder", CONFIG_SECTION));
        }
        if self.auto_snapshot_interval != other.auto_snapshot_interval {
            keys.push(format!("{}.autoSnapshotInterval", CONFIG_SECTION));
        }
        if self.auto_branch_on_main != other.auto_branch_on_main {
            keys.push(format!("{}.autoBranchOnMain", CONFIG_SECTION));
        }
        keys
    }

    fn apply(&mut self, partial: &PartialConfig) {
        if let Some(v) = partial.commit_reminder_interval {
            self.commit_reminder_interval = v;
        }
        if let Some(v) = partial.max_file_changes_before_reminder {
            self.max_file_changes_before_reminder = v;
        }
        if let Some(v) = partial.auto_snapshot_interval {
            self.auto_snapshot_interval = v;
        }
        if let Some(v) = partial.auto_branch_on_main {
            self.auto_branch_on_main = v;
        }
    }
}

/// 配置文件或命令行中出现的部分配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialConfig {
    pub commit_reminder_interval: Option<u64>,
    pub max_file_changes_before_reminder: Option<usize>,
    pub auto_snapshot_interval: Option<u64>,
    pub auto_branch_on_main: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    gitguide: PartialConfig,
}

impl PartialConfig {
    /// 解析 `[gitguide]` 表
    pub fn from_toml_str(content: &str) -> Result<Self, GuideError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| GuideError::config(e.to_string(), None))?;
        Ok(file.gitguide)
    }

    pub fn from_file(path: &Path) -> Result<Option<Self>, GuideError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map(Some)
            .map_err(|e| match e {
                GuideError::Configuration { message, .. } => {
                    GuideError::config(message, Some(path.to_path_buf()))
                }
                other => other,
            })
    }

    /// 读取 `GITGUIDE_*` 环境变量，无法解析的值被忽略
    pub fn from_env() -> Self {
        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            let raw = env::var(key).ok()?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("Ignoring invalid value for {}: {}", key, raw);
                    None
                }
            }
        }

        Self {
            commit_reminder_interval: parsed("GITGUIDE_COMMIT_REMINDER_INTERVAL"),
            max_file_changes_before_reminder: parsed("GITGUIDE_MAX_FILE_CHANGES_BEFORE_REMINDER"),
            auto_snapshot_interval: parsed("GITGUIDE_AUTO_SNAPSHOT_INTERVAL"),
            auto_branch_on_main: parsed("GITGUIDE_AUTO_BRANCH_ON_MAIN"),
        }
    }
}

/// 配置变更事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationChangeEvent {
    pub keys: Vec<String>,
}

impl ConfigurationChangeEvent {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    /// 变更是否落在给定的配置节内
    pub fn affects_configuration(&self, section: &str) -> bool {
        self.keys.iter().any(|key| {
            key == section
                || key
                    .strip_prefix(section)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// 配置来源
pub trait ConfigurationProvider: Send + Sync {
    /// 读取当前生效的配置（不缓存）
    fn get_configuration(&self) -> GuideConfig;

    fn on_did_change_configuration(&self) -> broadcast::Receiver<ConfigurationChangeEvent>;
}

/// 分层配置：默认值 < 用户文件 < 工作区文件 < 环境变量 < 命令行
pub struct LayeredConfig {
    user_file: Option<PathBuf>,
    workspace_file: Option<PathBuf>,
    overrides: PartialConfig,
    sender: broadcast::Sender<ConfigurationChangeEvent>,
}

impl LayeredConfig {
    pub fn new(workspace_root: Option<&Path>, overrides: PartialConfig) -> Self {
        // .env 只在构造时加载一次
        #[cfg(not(test))]
        dotenvy::dotenv().ok();

        let (sender, _) = broadcast::channel(16);
        Self {
            user_file: Self::default_user_file(),
            workspace_file: workspace_root.map(|root| root.join(WORKSPACE_CONFIG_FILE)),
            overrides,
            sender,
        }
    }

    pub fn with_files(user_file: Option<PathBuf>, workspace_file: Option<PathBuf>) -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            user_file,
            workspace_file,
            overrides: PartialConfig::default(),
            sender,
        }
    }

    pub fn with_overrides(mut self, overrides: PartialConfig) -> Self {
        self.overrides = overrides;
        self
    }

    /// `~/.gitguide/config.toml`
    pub fn default_user_file() -> Option<PathBuf> {
        env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".gitguide").join("config.toml"))
    }

    /// 参与合并的配置文件，按优先级从低到高
    pub fn files(&self) -> Vec<PathBuf> {
        self.user_file
            .iter()
            .chain(self.workspace_file.iter())
            .cloned()
            .collect()
    }

    /// 通知订阅者配置已变更
    pub fn notify_changed(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        tracing::debug!("Configuration changed: {:?}", keys);
        // 没有订阅者时发送失败是正常的
        let _ = self.sender.send(ConfigurationChangeEvent::new(keys));
    }

    fn load(&self) -> GuideConfig {
        let mut config = GuideConfig::default();

        for path in self.files() {
            match PartialConfig::from_file(&path) {
                Ok(Some(partial)) => config.apply(&partial),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping config file {}: {}", path.display(), e),
            }
        }

        config.apply(&PartialConfig::from_env());
        config.apply(&self.overrides);
        config
    }
}

impl ConfigurationProvider for LayeredConfig {
    fn get_configuration(&self) -> GuideConfig {
        self.load()
    }

    fn on_did_change_configuration(&self) -> broadcast::Receiver<ConfigurationChangeEvent> {
        self.sender.subscribe()
    }
}

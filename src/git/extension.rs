use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;

use super::core::GitCore;
use super::repository::CliRepository;
use super::watcher::StateWatcher;
use super::{GitApi, GitExtension, Repository};

/// Git 能力在扩展注册表中的标识
pub const GIT_EXTENSION_ID: &str = "git";

/// 按标识查找 Git 能力
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: RwLock<HashMap<String, Arc<dyn GitExtension>>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: impl Into<String>, extension: Arc<dyn GitExtension>) {
        let mut extensions = match self.extensions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        extensions.insert(id.into(), extension);
    }

    pub fn get_extension(&self, id: &str) -> Option<Arc<dyn GitExtension>> {
        let extensions = match self.extensions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        extensions.get(id).cloned()
    }
}

/// 基于 git 命令行的 API：最多发现一个仓库，即工作区所在的仓库
pub struct CliGitApi {
    workspace_root: RwLock<Option<PathBuf>>,
    repositories: RwLock<Vec<Arc<CliRepository>>>,
    state_changed: broadcast::Sender<()>,
}

impl CliGitApi {
    pub fn new() -> Self {
        let (state_changed, _) = broadcast::channel(16);
        Self {
            workspace_root: RwLock::new(None),
            repositories: RwLock::new(Vec::new()),
            state_changed,
        }
    }

    /// 根据工作区根目录重新发现仓库
    pub async fn rescan(&self, workspace_root: Option<&Path>) {
        {
            let mut root = match self.workspace_root.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *root = workspace_root.map(Path::to_path_buf);
        }

        let found = match workspace_root {
            Some(root) => match GitCore::show_toplevel(root).await {
                Ok(toplevel) => match CliRepository::open(toplevel).await {
                    Ok(repo) => Some(Arc::new(repo)),
                    Err(e) => {
                        tracing::warn!("Failed to open repository at {}: {}", root.display(), e);
                        None
                    }
                },
                Err(_) => {
                    tracing::debug!("{} is not inside a Git repository", root.display());
                    None
                }
            },
            None => None,
        };

        let mut repos = match self.repositories.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *repos = found.into_iter().collect();
    }

    fn cli_repositories(&self) -> Vec<Arc<CliRepository>> {
        match self.repositories.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 刷新所有仓库，任一状态变化时返回 true
    ///
    /// 还没有仓库时重新扫描工作区，例如之后才执行了 `git init`。
    pub async fn poll_once(&self) -> anyhow::Result<bool> {
        let repos = self.cli_repositories();
        if repos.is_empty() {
            let root = match self.workspace_root.read() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            if root.is_none() {
                return Ok(false);
            }
            self.rescan(root.as_deref()).await;
            return Ok(!self.cli_repositories().is_empty());
        }

        let mut changed = false;
        for repo in repos {
            changed |= repo.refresh().await?;
        }
        Ok(changed)
    }

    pub fn fire_state_changed(&self) {
        // 没有订阅者时忽略
        let _ = self.state_changed.send(());
    }
}

impl Default for CliGitApi {
    fn default() -> Self {
        Self::new()
    }
}

impl GitApi for CliGitApi {
    fn repositories(&self) -> Vec<Arc<dyn Repository>> {
        self.cli_repositories()
            .into_iter()
            .map(|repo| repo as Arc<dyn Repository>)
            .collect()
    }

    fn on_did_change_state(&self) -> broadcast::Receiver<()> {
        self.state_changed.subscribe()
    }
}

/// git 命令行提供的 Git 能力
pub struct CliGitExtension {
    api: Arc<CliGitApi>,
    watcher: StateWatcher,
}

impl CliGitExtension {
    /// git 不可用时返回 None
    pub async fn detect(workspace_root: Option<PathBuf>, poll_interval: Duration) -> Option<Self> {
        if !GitCore::is_available().await {
            tracing::warn!("git executable not found");
            return None;
        }

        let api = Arc::new(CliGitApi::new());
        api.rescan(workspace_root.as_deref()).await;
        let watcher = StateWatcher::spawn(api.clone(), poll_interval);

        Some(Self { api, watcher })
    }

    pub fn cli_api(&self) -> Arc<CliGitApi> {
        self.api.clone()
    }

    pub fn stop(&self) {
        self.watcher.stop();
    }
}

impl GitExtension for CliGitExtension {
    fn get_api(&self, version: u32) -> Arc<dyn GitApi> {
        if version != 1 {
            tracing::debug!("Requested Git API version {}, serving version 1", version);
        }
        self.api.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopExtension;

    impl GitExtension for NoopExtension {
        fn get_api(&self, _version: u32) -> Arc<dyn GitApi> {
            Arc::new(CliGitApi::new())
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ExtensionRegistry::new();
        assert!(registry.get_extension(GIT_EXTENSION_ID).is_none());

        registry.register(GIT_EXTENSION_ID, Arc::new(NoopExtension));
        assert!(registry.get_extension(GIT_EXTENSION_ID).is_some());
        assert!(registry.get_extension("vscode.git").is_none());
    }

    #[tokio::test]
    async fn test_empty_api_has_no_repositories() {
        let api = CliGitApi::new();
        api.rescan(None).await;
        assert!(api.repositories().is_empty());
        assert!(api.first_repository().is_none());
        assert!(!api.poll_once().await.unwrap());
    }
}

pub mod core;
pub mod extension;
pub mod repository;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use self::core::{CommandRunner, GitCore, ShellRunner};
pub use extension::{CliGitApi, CliGitExtension, ExtensionRegistry, GIT_EXTENSION_ID};
pub use repository::CliRepository;
pub use watcher::StateWatcher;

/// 工作区变更的状态，与 git porcelain 的 13 种状态对应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    IndexModified,
    IndexAdded,
    IndexDeleted,
    IndexRenamed,
    IndexCopied,
    Modified,
    Deleted,
    Untracked,
    Ignored,
    IntentToAdd,
    IntentToRename,
    TypeChanged,
    Conflicted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamRef {
    pub name: String,
    pub commit: String,
}

/// HEAD 所在的分支
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Branch {
    /// 分离 HEAD 时为空
    pub name: Option<String>,
    pub commit: Option<String>,
    pub upstream: Option<UpstreamRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub uri: PathBuf,
    pub original_uri: PathBuf,
    pub rename_uri: Option<PathBuf>,
    pub status: Status,
}

impl Change {
    pub fn new(uri: impl Into<PathBuf>, status: Status) -> Self {
        let uri = uri.into();
        Self {
            original_uri: uri.clone(),
            uri,
            rename_uri: None,
            status,
        }
    }
}

/// 某一时刻的仓库状态快照
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepositoryState {
    pub head: Option<Branch>,
    pub working_tree_changes: Vec<Change>,
    pub index_changes: Vec<Change>,
    pub merge_changes: Vec<Change>,
}

impl RepositoryState {
    pub fn head_name(&self) -> Option<&str> {
        self.head.as_ref().and_then(|head| head.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    pub index: usize,
    pub description: String,
    pub commit: String,
}

/// 由外部 Git 引擎持有的仓库句柄
#[async_trait]
pub trait Repository: Send + Sync {
    fn root(&self) -> PathBuf;

    /// 最近一次已知的状态快照
    fn state(&self) -> RepositoryState;

    async fn stash(&self) -> anyhow::Result<()>;

    /// 最新的 stash 排在最前
    async fn get_stashes(&self) -> anyhow::Result<Vec<Stash>>;

    async fn apply(&self, stash: &Stash) -> anyhow::Result<()>;

    /// 丢弃工作区改动
    async fn revert(&self) -> anyhow::Result<()>;

    async fn create_branch(&self, name: &str, checkout: bool) -> anyhow::Result<()>;
}

pub trait GitApi: Send + Sync {
    fn repositories(&self) -> Vec<Arc<dyn Repository>>;

    fn on_did_change_state(&self) -> broadcast::Receiver<()>;

    /// 所有地方都只看第一个仓库
    fn first_repository(&self) -> Option<Arc<dyn Repository>> {
        self.repositories().into_iter().next()
    }
}

pub trait GitExtension: Send + Sync {
    fn get_api(&self, version: u32) -> Arc<dyn GitApi>;
}

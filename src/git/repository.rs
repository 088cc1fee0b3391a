use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::core::GitCore;
use super::{Branch, Change, Repository, RepositoryState, Stash, Status, UpstreamRef};

static STASH_REF_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^stash@\{(\d+)\}$").expect("valid stash ref regex"));

/// 基于 git 命令行的仓库实现
///
/// `state()` 返回缓存的快照，由 [`CliRepository::refresh`] 更新。
pub struct CliRepository {
    root: PathBuf,
    state: RwLock<RepositoryState>,
}

impl CliRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: RwLock::new(RepositoryState::default()),
        }
    }

    /// 打开并读取一次状态
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let repo = Self::new(root);
        repo.refresh().await?;
        Ok(repo)
    }

    /// 重新读取仓库状态，返回状态是否发生了变化
    pub async fn refresh(&self) -> anyhow::Result<bool> {
        let head = read_head(&self.root).await;
        let status = GitCore::run(
            &self.root,
            &["status", "--porcelain=v1", "-z", "--untracked-files=all"],
        )
        .await?;

        let mut next = parse_porcelain(&self.root, &status);
        next.head = head;

        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let changed = *guard != next;
        *guard = next;
        Ok(changed)
    }

    async fn refresh_quietly(&self) {
        if let Err(e) = self.refresh().await {
            tracing::debug!("Failed to refresh repository state: {}", e);
        }
    }
}

#[async_trait]
impl Repository for CliRepository {
    fn root(&self) -> PathBuf {
        self.root.clone()
    }

    fn state(&self) -> RepositoryState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn stash(&self) -> anyhow::Result<()> {
        GitCore::run(&self.root, &["stash", "push"]).await?;
        self.refresh_quietly().await;
        Ok(())
    }

    async fn get_stashes(&self) -> anyhow::Result<Vec<Stash>> {
        let out = GitCore::run(&self.root, &["stash", "list", "--format=%gd%x00%H%x00%gs"]).await?;
        Ok(parse_stash_list(&out))
    }

    async fn apply(&self, stash: &Stash) -> anyhow::Result<()> {
        let reference = format!("stash@{{{}}}", stash.index);
        GitCore::run(&self.root, &["stash", "apply", &reference]).await?;
        self.refresh_quietly().await;
        Ok(())
    }

    async fn revert(&self) -> anyhow::Result<()> {
        GitCore::run(&self.root, &["checkout", "--", "."]).await?;
        self.refresh_quietly().await;
        Ok(())
    }

    async fn create_branch(&self, name: &str, checkout: bool) -> anyhow::Result<()> {
        if checkout {
            GitCore::run(&self.root, &["checkout", "-b", name]).await?;
        } else {
            GitCore::run(&self.root, &["branch", name]).await?;
        }
        self.refresh_quietly().await;
        Ok(())
    }
}

async fn read_head(root: &Path) -> Option<Branch> {
    // 空仓库没有提交，但 HEAD 仍指向一个分支
    let name = match GitCore::try_run(root, &["symbolic-ref", "--short", "-q", "HEAD"]).await {
        Some(out) if !out.trim().is_empty() => Some(out.trim().to_string()),
        _ => None,
    };
    let commit = GitCore::try_run(root, &["rev-parse", "--verify", "-q", "HEAD"])
        .await
        .map(|out| out.trim().to_string())
        .filter(|c| !c.is_empty());

    if name.is_none() && commit.is_none() {
        return None;
    }

    let upstream = match GitCore::try_run(
        root,
        &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"],
    )
    .await
    {
        Some(upstream_name) => GitCore::try_run(root, &["rev-parse", "@{upstream}"])
            .await
            .map(|upstream_commit| UpstreamRef {
                name: upstream_name.trim().to_string(),
                commit: upstream_commit.trim().to_string(),
            }),
        None => None,
    };

    Some(Branch {
        name,
        commit,
        upstream,
    })
}

/// 解析 `git status --porcelain=v1 -z` 输出
pub fn parse_porcelain(root: &Path, output: &str) -> RepositoryState {
    let mut state = RepositoryState::default();
    let mut entries = output.split('\0').filter(|e| !e.is_empty());

    while let Some(entry) = entries.next() {
        if entry.len() < 4 {
            continue;
        }
        let mut codes = entry.chars();
        let x = codes.next().unwrap_or(' ');
        let y = codes.next().unwrap_or(' ');
        let path = root.join(&entry[3..]);

        // 暂存区或工作区的重命名 / 复制，下一个字段是原路径
        let original = if matches!(x, 'R' | 'C') || y == 'R' {
            entries.next().map(|p| root.join(p))
        } else {
            None
        };

        let make = |status: Status| match &original {
            Some(original) => Change {
                uri: path.clone(),
                original_uri: original.clone(),
                rename_uri: Some(path.clone()),
                status,
            },
            None => Change::new(path.clone(), status),
        };

        match (x, y) {
            ('?', '?') => state.working_tree_changes.push(make(Status::Untracked)),
            ('!', '!') => state.working_tree_changes.push(make(Status::Ignored)),
            ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A')
            | ('U', 'U') => state.merge_changes.push(make(Status::Conflicted)),
            _ => {
                let index_status = match x {
                    'M' => Some(Status::IndexModified),
                    'A' => Some(Status::IndexAdded),
                    'D' => Some(Status::IndexDeleted),
                    'R' => Some(Status::IndexRenamed),
                    'C' => Some(Status::IndexCopied),
                    'T' => Some(Status::TypeChanged),
                    _ => None,
                };
                if let Some(status) = index_status {
                    state.index_changes.push(make(status));
                }

                let worktree_status = match y {
                    'M' => Some(Status::Modified),
                    'D' => Some(Status::Deleted),
                    'T' => Some(Status::TypeChanged),
                    'A' => Some(Status::IntentToAdd),
                    'R' => Some(Status::IntentToRename),
                    _ => None,
                };
                match worktree_status {
                    Some(Status::IntentToRename) => {
                        state.working_tree_changes.push(make(Status::IntentToRename))
                    }
                    Some(status) => state
                        .working_tree_changes
                        .push(Change::new(path.clone(), status)),
                    None => {}
                }
            }
        }
    }

    state
}

/// 解析 `git stash list --format=%gd%x00%H%x00%gs`
pub fn parse_stash_list(output: &str) -> Vec<Stash> {
    let mut stashes: Vec<Stash> = output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\0');
            let reference = fields.next()?;
            let commit = fields.next()?;
            let description = fields.next().unwrap_or("");
            let index = STASH_REF_REGEX
                .captures(reference.trim())?
                .get(1)?
                .as_str()
                .parse()
                .ok()?;
            Some(Stash {
                index,
                description: description.to_string(),
                commit: commit.to_string(),
            })
        })
        .collect();

    stashes.sort_by_key(|s| s.index);
    stashes
}

use std::path::PathBuf;
use std::sync::RwLock;

use tokio::sync::broadcast;

/// 当前打开的工作区
pub trait Workspace: Send + Sync {
    /// 第一个工作区目录
    fn root(&self) -> Option<PathBuf>;

    fn on_did_change_workspace_folders(&self) -> broadcast::Receiver<()>;
}

/// 可在运行时替换目录的工作区
pub struct HostWorkspace {
    folders: RwLock<Vec<PathBuf>>,
    changed: broadcast::Sender<()>,
}

impl HostWorkspace {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        let (changed, _) = broadcast::channel(16);
        Self {
            folders: RwLock::new(folders),
            changed,
        }
    }

    pub fn folders(&self) -> Vec<PathBuf> {
        match self.folders.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 替换工作区目录并通知订阅者
    pub fn set_folders(&self, folders: Vec<PathBuf>) {
        {
            let mut guard = match self.folders.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = folders;
        }
        let _ = self.changed.send(());
    }
}

impl Workspace for HostWorkspace {
    fn root(&self) -> Option<PathBuf> {
        self.folders().into_iter().next()
    }

    fn on_did_change_workspace_folders(&self) -> broadcast::Receiver<()> {
        self.changed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_folders_notifies() {
        let workspace = HostWorkspace::new(vec![]);
        assert!(workspace.root().is_none());

        let mut rx = workspace.on_did_change_workspace_folders();
        workspace.set_folders(vec![PathBuf::from("/a"), PathBuf::from("/b")]);

        rx.recv().await.unwrap();
        assert_eq!(workspace.root(), Some(PathBuf::from("/a")));
        assert_eq!(workspace.folders().len(), 2);
    }
}

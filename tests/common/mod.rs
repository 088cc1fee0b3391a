#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use gitguide::config::{ConfigurationChangeEvent, ConfigurationProvider, GuideConfig};
use gitguide::git::{
    Branch, Change, CommandRunner, ExtensionRegistry, GitApi, GitExtension, Repository,
    RepositoryState, Stash, Status, GIT_EXTENSION_ID,
};
use gitguide::host::{Host, HostWorkspace};
use gitguide::ui::{InputBoxOptions, Ui};

pub const ROOT: &str = "/work/project";

/// 让所有就绪的任务跑完；需要暂停的时钟
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCall {
    Information { message: String, items: Vec<String> },
    Warning { message: String, items: Vec<String> },
    Error(String),
    InputBox(InputBoxOptions),
    Command(String),
}

/// Mock UI：按顺序回答带按钮的对话框和输入框，记录每次调用
#[derive(Default)]
pub struct MockUi {
    answers: Mutex<VecDeque<Option<String>>>,
    inputs: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<UiCall>>,
}

impl MockUi {
    pub fn answer(&self, answer: Option<&str>) {
        self.answers
            .lock()
            .unwrap()
            .push_back(answer.map(str::to_string));
    }

    pub fn input(&self, value: Option<&str>) {
        self.inputs
            .lock()
            .unwrap()
            .push_back(value.map(str::to_string));
    }

    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 带按钮的对话框（信息和警告）
    pub fn prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::Information { message, items } if !items.is_empty() => Some(message),
                UiCall::Warning { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::Information { message, items } if items.is_empty() => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn executed_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::Command(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn input_boxes(&self) -> Vec<InputBoxOptions> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::InputBox(options) => Some(options),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: UiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_answer(&self, items: &[&str]) -> Option<String> {
        if items.is_empty() {
            return None;
        }
        self.answers.lock().unwrap().pop_front().flatten()
    }
}

#[async_trait]
impl Ui for MockUi {
    async fn show_information_message(&self, message: &str, items: &[&str]) -> Option<String> {
        self.record(UiCall::Information {
            message: message.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        });
        self.next_answer(items)
    }

    async fn show_warning_message(&self, message: &str, items: &[&str]) -> Option<String> {
        self.record(UiCall::Warning {
            message: message.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        });
        self.next_answer(items)
    }

    async fn show_error_message(&self, message: &str) {
        self.record(UiCall::Error(message.to_string()));
    }

    async fn show_input_box(&self, options: InputBoxOptions) -> Option<String> {
        self.record(UiCall::InputBox(options));
        self.inputs.lock().unwrap().pop_front().flatten()
    }

    async fn execute_command(&self, command: &str) -> anyhow::Result<()> {
        self.record(UiCall::Command(command.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    Stash,
    GetStashes,
    Apply(usize),
    Revert,
    CreateBranch(String, bool),
}

/// Mock 仓库：状态可随时替换，写操作只记录
pub struct MockRepository {
    state: Mutex<RepositoryState>,
    stashes: Mutex<Vec<Stash>>,
    calls: Mutex<Vec<RepoCall>>,
    failing: AtomicBool,
}

impl MockRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RepositoryState::default()),
            stashes: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// 在给定分支上，带若干个工作区改动
    pub fn on_branch(name: &str, changes: usize) -> Self {
        let repo = Self::new();
        repo.set_branch(Some(name), changes);
        repo
    }

    pub fn set_branch(&self, name: Option<&str>, changes: usize) {
        let mut state = self.state.lock().unwrap();
        state.head = Some(Branch {
            name: name.map(str::to_string),
            commit: Some("4b825dc642cb6eb9a060e54bf8d69288fbee4904".to_string()),
            upstream: None,
        });
        state.working_tree_changes = (0..changes)
            .map(|i| Change::new(format!("{}/file{}.rs", ROOT, i), Status::Modified))
            .collect();
    }

    pub fn set_stashes(&self, count: usize) {
        *self.stashes.lock().unwrap() = (0..count)
            .map(|index| Stash {
                index,
                description: format!("WIP on main: stash {}", index),
                commit: format!("{:040x}", index + 1),
            })
            .collect();
    }

    pub fn fail_operations(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RepoCall) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("repository operation failed");
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MockRepository {
    fn root(&self) -> PathBuf {
        PathBuf::from(ROOT)
    }

    fn state(&self) -> RepositoryState {
        self.state.lock().unwrap().clone()
    }

    async fn stash(&self) -> anyhow::Result<()> {
        self.record(RepoCall::Stash)
    }

    async fn get_stashes(&self) -> anyhow::Result<Vec<Stash>> {
        self.record(RepoCall::GetStashes)?;
        Ok(self.stashes.lock().unwrap().clone())
    }

    async fn apply(&self, stash: &Stash) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(RepoCall::Apply(stash.index));
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("stash apply conflict");
        }
        Ok(())
    }

    async fn revert(&self) -> anyhow::Result<()> {
        self.record(RepoCall::Revert)
    }

    async fn create_branch(&self, name: &str, checkout: bool) -> anyhow::Result<()> {
        self.record(RepoCall::CreateBranch(name.to_string(), checkout))
    }
}

pub struct MockGitApi {
    repositories: Mutex<Vec<Arc<dyn Repository>>>,
    state_changed: broadcast::Sender<()>,
}

impl MockGitApi {
    pub fn new() -> Self {
        let (state_changed, _) = broadcast::channel(16);
        Self {
            repositories: Mutex::new(Vec::new()),
            state_changed,
        }
    }

    pub fn set_repository(&self, repo: Option<Arc<MockRepository>>) {
        *self.repositories.lock().unwrap() = repo
            .into_iter()
            .map(|repo| repo as Arc<dyn Repository>)
            .collect();
    }

    pub fn fire_state_changed(&self) {
        let _ = self.state_changed.send(());
    }
}

impl GitApi for MockGitApi {
    fn repositories(&self) -> Vec<Arc<dyn Repository>> {
        self.repositories.lock().unwrap().clone()
    }

    fn on_did_change_state(&self) -> broadcast::Receiver<()> {
        self.state_changed.subscribe()
    }
}

pub struct MockExtension {
    api: Arc<MockGitApi>,
}

impl GitExtension for MockExtension {
    fn get_api(&self, _version: u32) -> Arc<dyn GitApi> {
        self.api.clone()
    }
}

/// Mock 命令执行器：记录 (命令, 目录)，指定的命令返回失败
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<(String, PathBuf)>>,
    failing: Mutex<HashSet<String>>,
}

impl MockRunner {
    pub fn fail_command(&self, command: &str) {
        self.failing.lock().unwrap().insert(command.to_string());
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(recorded, _)| recorded == command)
            .count()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn exec(&self, command: &str, cwd: &Path) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), cwd.to_path_buf()));
        if self.failing.lock().unwrap().contains(command) {
            anyhow::bail!("`{}` exited with status 128", command);
        }
        Ok(())
    }
}

/// Mock 配置：`set` 会像编辑了配置文件一样发出变更事件
pub struct MockConfig {
    config: Mutex<GuideConfig>,
    sender: broadcast::Sender<ConfigurationChangeEvent>,
}

impl MockConfig {
    pub fn new(config: GuideConfig) -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            config: Mutex::new(config),
            sender,
        }
    }

    pub fn set(&self, config: GuideConfig) {
        let keys = {
            let mut current = self.config.lock().unwrap();
            let keys = current.changed_keys(&config);
            *current = config;
            keys
        };
        let _ = self.sender.send(ConfigurationChangeEvent::new(keys));
    }

    /// 发出一个与 gitguide 无关的变更事件
    pub fn touch_other_section(&self) {
        let _ = self
            .sender
            .send(ConfigurationChangeEvent::new(vec!["editor.fontSize".to_string()]));
    }
}

impl ConfigurationProvider for MockConfig {
    fn get_configuration(&self) -> GuideConfig {
        self.config.lock().unwrap().clone()
    }

    fn on_did_change_configuration(&self) -> broadcast::Receiver<ConfigurationChangeEvent> {
        self.sender.subscribe()
    }
}

/// 一套完整的 mock 宿主
pub struct Fixture {
    pub host: Host,
    pub ui: Arc<MockUi>,
    pub api: Arc<MockGitApi>,
    pub repo: Arc<MockRepository>,
    pub runner: Arc<MockRunner>,
    pub config: Arc<MockConfig>,
    pub workspace: Arc<HostWorkspace>,
}

impl Fixture {
    /// 已注册 Git 能力，仓库在 feature 分支上且没有改动
    pub fn new() -> Self {
        Self::build(true, GuideConfig::default())
    }

    pub fn with_config(config: GuideConfig) -> Self {
        Self::build(true, config)
    }

    /// 没有注册 Git 能力
    pub fn without_git() -> Self {
        Self::build(false, GuideConfig::default())
    }

    fn build(register_git: bool, config: GuideConfig) -> Self {
        let ui = Arc::new(MockUi::default());
        let api = Arc::new(MockGitApi::new());
        let repo = Arc::new(MockRepository::on_branch("feature/existing", 0));
        api.set_repository(Some(repo.clone()));
        let runner = Arc::new(MockRunner::default());
        let config = Arc::new(MockConfig::new(config));
        let workspace = Arc::new(HostWorkspace::new(vec![PathBuf::from(ROOT)]));

        let extensions = Arc::new(ExtensionRegistry::new());
        if register_git {
            extensions.register(
                GIT_EXTENSION_ID,
                Arc::new(MockExtension { api: api.clone() }),
            );
        }

        let host = Host::new(
            extensions,
            ui.clone(),
            runner.clone(),
            workspace.clone(),
            config.clone(),
        );

        Self {
            host,
            ui,
            api,
            repo,
            runner,
            config,
            workspace,
        }
    }

    pub fn remove_repository(&self) {
        self.api.set_repository(None);
    }
}

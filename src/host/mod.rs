pub mod commands;
pub mod workspace;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::ConfigurationProvider;
use crate::git::{CommandRunner, ExtensionRegistry};
use crate::infrastructure::OutputChannel;
use crate::ui::Ui;

pub use commands::{CommandHandler, CommandRegistry};
pub use workspace::{HostWorkspace, Workspace};

/// 控制器依赖的全部外部能力，启动时注入
pub struct Host {
    pub extensions: Arc<ExtensionRegistry>,
    pub ui: Arc<dyn Ui>,
    pub runner: Arc<dyn CommandRunner>,
    pub workspace: Arc<dyn Workspace>,
    pub config: Arc<dyn ConfigurationProvider>,
    pub commands: Arc<CommandRegistry>,
    output_channels: Mutex<HashMap<String, Arc<OutputChannel>>>,
}

impl Host {
    pub fn new(
        extensions: Arc<ExtensionRegistry>,
        ui: Arc<dyn Ui>,
        runner: Arc<dyn CommandRunner>,
        workspace: Arc<dyn Workspace>,
        config: Arc<dyn ConfigurationProvider>,
    ) -> Self {
        Self {
            extensions,
            ui,
            runner,
            workspace,
            config,
            commands: Arc::new(CommandRegistry::new()),
            output_channels: Mutex::new(HashMap::new()),
        }
    }

    /// 按名称获取输出通道，不存在时创建
    pub fn create_output_channel(&self, name: &str) -> Arc<OutputChannel> {
        let mut channels = match self.output_channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OutputChannel::new(name)))
            .clone()
    }
}

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use futures_util::future::BoxFuture;

use crate::infrastructure::GuideError;

pub type CommandHandler = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// 可按 id 调用的命令表
#[derive(Default)]
pub struct CommandRegistry {
    handlers: RwLock<BTreeMap<String, CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: impl Into<String>, handler: CommandHandler) {
        let id = id.into();
        let mut handlers = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if handlers.insert(id.clone(), handler).is_some() {
            tracing::warn!("Command '{}' was already registered, replacing it", id);
        }
    }

    pub fn unregister(&self, id: &str) -> bool {
        let mut handlers = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.remove(id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        match self.handlers.read() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        match self.handlers.read() {
            Ok(guard) => guard.contains_key(id),
            Err(poisoned) => poisoned.into_inner().contains_key(id),
        }
    }

    pub async fn execute(&self, id: &str) -> anyhow::Result<()> {
        let handler = {
            let handlers = match self.handlers.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            handlers.get(id).cloned()
        };

        match handler {
            Some(handler) => handler().await,
            None => Err(GuideError::UnknownCommand { id: id.to_string() }.into()),
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{ConfigurationProvider, LayeredConfig};

/// 轮询配置文件，生效配置变化时发出变更事件
pub struct ConfigWatcher {
    handle: JoinHandle<()>,
}

impl ConfigWatcher {
    pub fn spawn(config: Arc<LayeredConfig>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut last = config.get_configuration();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // 第一次 tick 立即返回
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let current = config.get_configuration();
                let keys = last.changed_keys(&current);
                if !keys.is_empty() {
                    tracing::info!("Configuration files changed: {}", keys.join(", "));
                    config.notify_changed(keys);
                    last = current;
                }
            }
        });

        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_edit_emits_change_event() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(".gitguide.toml");
        std::fs::write(&file, "[gitguide]\ncommitReminderInterval = 15\n").unwrap();

        let config = Arc::new(LayeredConfig::with_files(None, Some(file.clone())));
        let mut rx = config.on_did_change_configuration();
        let watcher = ConfigWatcher::spawn(config.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&file, "[gitguide]\ncommitReminderInterval = 1\n").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("change event should arrive")
            .unwrap();
        assert_eq!(event.keys, vec!["gitguide.commitReminderInterval".to_string()]);
        assert_eq!(config.get_configuration().commit_reminder_interval, 1);

        watcher.stop();
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::extension::CliGitApi;

/// 仓库状态轮询器，状态变化时触发 `on_did_change_state`
pub struct StateWatcher {
    handle: JoinHandle<()>,
}

impl StateWatcher {
    /// 开始监控仓库变化
    pub fn spawn(api: Arc<CliGitApi>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tracing::debug!("Starting repository monitoring (interval: {:?})", interval);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match api.poll_once().await {
                    Ok(true) => {
                        tracing::debug!("Repository state changed");
                        api.fire_state_changed();
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!("Error checking repository status: {}", e),
                }
            }
        });

        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for StateWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

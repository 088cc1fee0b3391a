use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{lock, Controller};
use crate::ui::{NO, OPEN_SCM_VIEW_COMMAND, YES};

const REV_PARSE_WORK_TREE: &str = "git rev-parse --is-inside-work-tree";

/// 周期定时器，第一次触发在一个周期之后
///
/// 取消只会停止后续的触发，已经派生出去的任务不受影响。
pub struct RepeatingTimer {
    handle: JoinHandle<()>,
    period: Duration,
}

impl RepeatingTimer {
    pub fn start<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick();
            }
        });

        Self { handle, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 分钟换算为定时器周期，最少一分钟
pub fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.max(1) * 60)
}

/// 提交提醒的一次检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitReminderOutcome {
    NoRepository,
    NoWorkspace,
    NotInWorkTree,
    NoChanges,
    BelowThreshold { changes: usize, threshold: usize },
    Accepted { changes: usize },
    Declined { changes: usize },
}

/// 快照提醒的一次检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    NoRepository,
    NoChanges,
    Stashed,
    Failed,
    Declined,
}

impl Controller {
    /// 按最新配置重建提交提醒定时器
    pub fn start_reminder_timer(self: &Arc<Self>) {
        let period = minutes(self.config.get_configuration().commit_reminder_interval);
        self.output
            .append_line(format!("Reminder timer: {}ms", period.as_millis()));

        let weak = Arc::downgrade(self);
        let timer = RepeatingTimer::start(period, move || {
            if let Some(controller) = weak.upgrade() {
                tokio::spawn(async move {
                    controller.commit_reminder_tick().await;
                });
            }
        });

        if let Some(old) = lock(&self.commit_reminder_timer).replace(timer) {
            old.cancel();
        }
    }

    /// 按最新配置重建快照提醒定时器
    pub fn start_backup_timer(self: &Arc<Self>) {
        let period = minutes(self.config.get_configuration().auto_snapshot_interval);
        self.output
            .append_line(format!("Backup timer: {}ms", period.as_millis()));

        let weak = Arc::downgrade(self);
        let timer = RepeatingTimer::start(period, move || {
            if let Some(controller) = weak.upgrade() {
                tokio::spawn(async move {
                    controller.snapshot_tick().await;
                });
            }
        });

        if let Some(old) = lock(&self.auto_snapshot_timer).replace(timer) {
            old.cancel();
        }
    }

    pub fn restart_timers(self: &Arc<Self>) {
        self.start_reminder_timer();
        self.start_backup_timer();
    }

    /// 当前两个定时器的周期（提交提醒，快照提醒）
    pub fn timer_periods(&self) -> (Option<Duration>, Option<Duration>) {
        (
            lock(&self.commit_reminder_timer).as_ref().map(RepeatingTimer::period),
            lock(&self.auto_snapshot_timer).as_ref().map(RepeatingTimer::period),
        )
    }

    pub async fn commit_reminder_tick(&self) -> CommitReminderOutcome {
        let repo = match self.git_api.first_repository() {
            Some(repo) => repo,
            None => {
                self.output.append_line("No repo found");
                return CommitReminderOutcome::NoRepository;
            }
        };

        // 工作区切换后仓库句柄可能已经过期
        let root = match self.workspace.root() {
            Some(root) => root,
            None => {
                self.output
                    .append_line("No workspace folder found, skipping commit reminder check");
                return CommitReminderOutcome::NoWorkspace;
            }
        };
        if self.runner.exec(REV_PARSE_WORK_TREE, &root).await.is_err() {
            self.output
                .append_line("Not in a Git repository, skipping commit reminder check");
            return CommitReminderOutcome::NotInWorkTree;
        }

        let changes = repo.state().working_tree_changes.len();
        if changes == 0 {
            self.output.append_line("No uncommitted changes found");
            return CommitReminderOutcome::NoChanges;
        }

        let threshold = self.config.get_configuration().max_file_changes_before_reminder;
        self.output.append_line(format!(
            "Found {} uncommitted changes (threshold: {})",
            changes, threshold
        ));
        if changes < threshold {
            return CommitReminderOutcome::BelowThreshold { changes, threshold };
        }

        self.output.append_line("Showing commit reminder");
        let message = format!("{} changes pending. Commit now?", changes);
        let response = self.ui.show_information_message(&message, &[YES, NO]).await;

        if response.as_deref() == Some(YES) {
            self.output.append_line("User chose to commit changes");
            if let Err(e) = self.ui.execute_command(OPEN_SCM_VIEW_COMMAND).await {
                self.output
                    .append_line(format!("Failed to open source control view: {}", e));
            }
            CommitReminderOutcome::Accepted { changes }
        } else {
            self.output.append_line("User declined to commit changes");
            CommitReminderOutcome::Declined { changes }
        }
    }

    pub async fn snapshot_tick(&self) -> SnapshotOutcome {
        let repo = match self.git_api.first_repository() {
            Some(repo) => repo,
            None => {
                self.output.append_line("No repo found, skipping snapshot check");
                return SnapshotOutcome::NoRepository;
            }
        };

        if repo.state().working_tree_changes.is_empty() {
            self.output.append_line("No uncommitted changes to back up");
            return SnapshotOutcome::NoChanges;
        }

        self.output
            .append_line("Found uncommitted changes, showing snapshot prompt");
        let response = self
            .ui
            .show_information_message("Backup your changes?", &[YES, NO])
            .await;

        if response.as_deref() != Some(YES) {
            self.output.append_line("User declined to create snapshot");
            return SnapshotOutcome::Declined;
        }

        self.output.append_line("User chose to create snapshot");
        match repo.stash().await {
            Ok(()) => {
                self.output.append_line("Snapshot created successfully");
                self.ui
                    .show_information_message("Changes have been stashed successfully.", &[])
                    .await;
                SnapshotOutcome::Stashed
            }
            Err(e) => {
                self.output
                    .append_line(format!("Error creating snapshot: {}", e));
                self.ui.show_error_message("Failed to create snapshot.").await;
                SnapshotOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_minutes_clamps_zero() {
        assert_eq!(minutes(0), Duration::from_secs(60));
        assert_eq!(minutes(15), Duration::from_secs(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let timer = RepeatingTimer::start(Duration::from_secs(60), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        timer.cancel();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }
}

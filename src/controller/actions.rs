use std::sync::Arc;

use super::Controller;
use crate::git::Repository;
use crate::infrastructure::GuideError;
use crate::ui::{InputBoxOptions, NO, YES};

const SOFT_RESET_LAST_COMMIT: &str = "git reset --soft HEAD~1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    NoRepository,
    Cancelled,
    Undone,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStashOutcome {
    NoRepository,
    NoStashes,
    Applied { index: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateBranchOutcome {
    NoRepository,
    Cancelled,
    Created { name: String },
    Failed { reason: String },
}

impl Controller {
    fn require_repository(&self) -> Option<Arc<dyn Repository>> {
        let repo = self.git_api.first_repository();
        if repo.is_none() {
            self.output
                .append_line(format!("Error: {}", GuideError::NoRepository));
        }
        repo
    }

    async fn report_missing_repository(&self) {
        self.ui
            .show_error_message(&GuideError::NoRepository.to_string())
            .await;
    }

    /// 撤销最后一次提交，改动保留在暂存区
    pub async fn undo_last_commit(&self) -> UndoOutcome {
        self.output.append_line("Attempting to undo last commit");
        let repo = match self.require_repository() {
            Some(repo) => repo,
            None => {
                self.report_missing_repository().await;
                return UndoOutcome::NoRepository;
            }
        };

        let response = self
            .ui
            .show_warning_message("Undo last commit?", &[YES, NO])
            .await;
        if response.as_deref() != Some(YES) {
            self.output.append_line("User cancelled undo commit");
            return UndoOutcome::Cancelled;
        }
        self.output.append_line("User confirmed undo commit");

        match self.soft_reset(repo.as_ref()).await {
            Ok(()) => {
                self.output.append_line("Last commit undone successfully");
                self.ui
                    .show_information_message(
                        "Last commit has been undone. Changes are now staged.",
                        &[],
                    )
                    .await;
                UndoOutcome::Undone
            }
            Err(e) => {
                self.output.append_line(format!("Error undoing commit: {}", e));
                self.ui.show_error_message("Failed to undo last commit.").await;
                UndoOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn soft_reset(&self, repo: &dyn Repository) -> anyhow::Result<()> {
        let root = self.workspace.root().ok_or(GuideError::NoWorkspace)?;
        let state = repo.state();
        let branch = state.head_name().ok_or(GuideError::NoBranch)?;
        self.output
            .append_line(format!("Undoing last commit on branch: {}", branch));

        if let Err(e) = self.runner.exec(SOFT_RESET_LAST_COMMIT, &root).await {
            self.output.append_line(format!("Git reset error: {}", e));
            return Err(e);
        }
        self.output
            .append_line("Git reset command executed successfully");
        Ok(())
    }

    /// 应用最近的一个 stash，不需要确认
    pub async fn apply_last_stash(&self) -> ApplyStashOutcome {
        self.output.append_line("Attempting to apply last stash");
        let repo = match self.require_repository() {
            Some(repo) => repo,
            None => {
                self.report_missing_repository().await;
                return ApplyStashOutcome::NoRepository;
            }
        };

        match self.apply_latest(repo.as_ref()).await {
            Ok(None) => {
                self.output.append_line("No stashes found");
                self.ui.show_information_message("No stashes found.", &[]).await;
                ApplyStashOutcome::NoStashes
            }
            Ok(Some(index)) => {
                self.output.append_line("Stash applied successfully");
                self.ui
                    .show_information_message("Latest stash has been applied.", &[])
                    .await;
                ApplyStashOutcome::Applied { index }
            }
            Err(e) => {
                self.output.append_line(format!("Error applying stash: {}", e));
                self.ui.show_error_message("Failed to apply stash.").await;
                ApplyStashOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 返回被应用的 stash 序号，没有 stash 时返回 None
    async fn apply_latest(&self, repo: &dyn Repository) -> anyhow::Result<Option<usize>> {
        let stashes = repo.get_stashes().await?;
        let Some(latest) = stashes.first() else {
            return Ok(None);
        };
        self.output.append_line(format!(
            "Found {} stashes, applying most recent",
            stashes.len()
        ));
        repo.apply(latest).await?;
        Ok(Some(latest.index))
    }

    /// 询问分支名，创建并切换过去
    pub async fn create_feature_branch(&self) -> CreateBranchOutcome {
        self.output.append_line("Attempting to create feature branch");
        let repo = match self.require_repository() {
            Some(repo) => repo,
            None => {
                self.report_missing_repository().await;
                return CreateBranchOutcome::NoRepository;
            }
        };

        let branch_name = self
            .ui
            .show_input_box(InputBoxOptions {
                prompt: "New branch name".to_string(),
                place_holder: "feature/my-feature".to_string(),
            })
            .await
            .filter(|name| !name.is_empty());

        let Some(name) = branch_name else {
            self.output.append_line("Branch creation cancelled by user");
            return CreateBranchOutcome::Cancelled;
        };

        self.output.append_line(format!("Creating branch: {}", name));
        match repo.create_branch(&name, true).await {
            Ok(()) => {
                self.output
                    .append_line(format!("Branch {} created successfully", name));
                self.ui
                    .show_information_message(
                        &format!("Created and switched to branch: {}", name),
                        &[],
                    )
                    .await;
                CreateBranchOutcome::Created { name }
            }
            Err(e) => {
                self.output.append_line(format!("Error creating branch: {}", e));
                self.ui.show_error_message("Failed to create branch.").await;
                CreateBranchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

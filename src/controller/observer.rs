use std::sync::Arc;

use super::{Controller, CreateBranchOutcome};
use crate::ui::{NO, YES};

/// 受保护的分支名，区分大小写
pub const PROTECTED_BRANCHES: [&str; 2] = ["main", "master"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchSuggestionOutcome {
    Disabled,
    NoRepository,
    NotOnProtectedBranch,
    NoChanges,
    Declined,
    Accepted(CreateBranchOutcome),
}

pub fn is_protected_branch(name: Option<&str>) -> bool {
    name.is_some_and(|name| PROTECTED_BRANCHES.contains(&name))
}

impl Controller {
    /// 派生一个独立任务执行分支建议检查
    pub fn spawn_branch_suggestion(self: &Arc<Self>) {
        let controller = self.clone();
        tokio::spawn(async move {
            controller.check_branch_suggestion().await;
        });
    }

    /// 在 main / master 上有未提交改动时建议创建功能分支
    pub async fn check_branch_suggestion(&self) -> BranchSuggestionOutcome {
        self.output
            .append_line("Checking if feature branch suggestion is needed");

        if !self.config.get_configuration().auto_branch_on_main {
            self.output
                .append_line("Auto branch suggestion is disabled in settings");
            return BranchSuggestionOutcome::Disabled;
        }

        let repo = match self.git_api.first_repository() {
            Some(repo) => repo,
            None => {
                self.output.append_line("No Git repository found");
                return BranchSuggestionOutcome::NoRepository;
            }
        };

        let state = repo.state();
        let current_branch = state.head_name();
        self.output.append_line(format!(
            "Current branch: {}",
            current_branch.unwrap_or("(none)")
        ));

        if !is_protected_branch(current_branch) {
            self.output
                .append_line("Not on main branch, skipping suggestion");
            return BranchSuggestionOutcome::NotOnProtectedBranch;
        }

        if state.working_tree_changes.is_empty() {
            self.output
                .append_line("On main branch but no changes, skipping suggestion");
            return BranchSuggestionOutcome::NoChanges;
        }

        self.output
            .append_line("On main branch with changes, showing branch suggestion");
        let response = self
            .ui
            .show_information_message(
                "You are working on the main branch. Would you like to create a feature branch?",
                &[YES, NO],
            )
            .await;

        if response.as_deref() == Some(YES) {
            self.output.append_line("User chose to create feature branch");
            BranchSuggestionOutcome::Accepted(self.create_feature_branch().await)
        } else {
            self.output.append_line("User declined branch suggestion");
            BranchSuggestionOutcome::Declined
        }
    }
}

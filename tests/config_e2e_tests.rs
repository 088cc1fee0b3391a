/// E2E 测试：分层配置
/// 配置文件、环境变量和命令行覆盖的优先级
use std::env;

use gitguide::config::{ConfigurationProvider, GuideConfig, LayeredConfig, PartialConfig};

const ENV_VARS: [&str; 4] = [
    "GITGUIDE_COMMIT_REMINDER_INTERVAL",
    "GITGUIDE_MAX_FILE_CHANGES_BEFORE_REMINDER",
    "GITGUIDE_AUTO_SNAPSHOT_INTERVAL",
    "GITGUIDE_AUTO_BRANCH_ON_MAIN",
];

/// 测试辅助函数：清理所有 GITGUIDE_* 环境变量
fn clear_all_env_vars() {
    for var in &ENV_VARS {
        env::remove_var(var);
    }
}

// 环境变量是进程级的，所有相关断言放在同一个测试里
#[test]
fn test_e2e_layer_priority() {
    clear_all_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let user = dir.path().join("config.toml");
    let workspace = dir.path().join(".gitguide.toml");
    std::fs::write(
        &user,
        "[gitguide]\ncommitReminderInterval = 20\nautoSnapshotInterval = 8\nmaxFileChangesBeforeReminder = 9\n",
    )
    .unwrap();
    std::fs::write(&workspace, "[gitguide]\ncommitReminderInterval = 12\n").unwrap();

    // 只有文件
    let config = LayeredConfig::with_files(Some(user.clone()), Some(workspace.clone()));
    let effective = config.get_configuration();
    assert_eq!(effective.commit_reminder_interval, 12);
    assert_eq!(effective.auto_snapshot_interval, 8);
    assert_eq!(effective.max_file_changes_before_reminder, 9);
    assert!(effective.auto_branch_on_main);

    // 环境变量覆盖文件，无法解析的值被忽略
    env::set_var("GITGUIDE_AUTO_SNAPSHOT_INTERVAL", "3");
    env::set_var("GITGUIDE_AUTO_BRANCH_ON_MAIN", "false");
    env::set_var("GITGUIDE_MAX_FILE_CHANGES_BEFORE_REMINDER", "many");
    let effective = config.get_configuration();
    assert_eq!(effective.auto_snapshot_interval, 3);
    assert!(!effective.auto_branch_on_main);
    assert_eq!(effective.max_file_changes_before_reminder, 9);

    // 命令行覆盖一切
    let config = LayeredConfig::with_files(Some(user), Some(workspace)).with_overrides(
        PartialConfig {
            auto_snapshot_interval: Some(1),
            ..Default::default()
        },
    );
    assert_eq!(config.get_configuration().auto_snapshot_interval, 1);

    clear_all_env_vars();
}

#[test]
fn test_e2e_config_is_reread_on_every_call() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = dir.path().join(".gitguide.toml");
    let config = LayeredConfig::with_files(None, Some(workspace.clone()));

    let before = config.get_configuration();
    std::fs::write(&workspace, "[gitguide]\nmaxFileChangesBeforeReminder = 2\n").unwrap();
    let after = config.get_configuration();

    assert_eq!(after.max_file_changes_before_reminder, 2);
    assert_eq!(
        before.changed_keys(&after),
        vec!["gitguide.maxFileChangesBeforeReminder".to_string()]
    );

    std::fs::remove_file(&workspace).unwrap();
    let reset = config.get_configuration();
    assert_eq!(
        reset.max_file_changes_before_reminder,
        GuideConfig::default().max_file_changes_before_reminder
    );
}

#[test]
fn test_e2e_config_serializes_camel_case() {
    let json = serde_json::to_value(GuideConfig::default()).unwrap();
    assert_eq!(json["commitReminderInterval"], 15);
    assert_eq!(json["maxFileChangesBeforeReminder"], 5);
    assert_eq!(json["autoSnapshotInterval"], 10);
    assert_eq!(json["autoBranchOnMain"], true);
}

use std::time::Duration;

use clap::Parser;
use gitguide::cli::Args;
use gitguide::commands;
use gitguide::infrastructure::setup_logging;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(args.logging_config()?)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(commands::route_command(&args));
    // 未回答的终端提示仍在阻塞读取 stdin，不等待它
    runtime.shutdown_timeout(Duration::from_millis(200));

    if let Err(error) = &result {
        commands::report_error(error);
    }
    result
}

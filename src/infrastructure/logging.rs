use std::io;
use std::sync::Mutex;

use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// 输出源文件和行号
    pub include_file_location: bool,
    /// 覆盖默认过滤规则，语法同 `RUST_LOG`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            include_file_location: false,
            filter: None,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读的格式
    Pretty,
    /// 紧凑格式
    Compact,
    /// JSON 格式
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// 日志输出目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File(String),
}

/// 设置日志系统，`RUST_LOG` 优先于配置的级别
pub fn setup_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = if let Some(filter) = &config.filter {
        EnvFilter::try_new(filter)?
    } else {
        EnvFilter::from_default_env().add_directive(format!("gitguide={}", config.level).parse()?)
    };

    match &config.output {
        LogOutput::Stdout => {
            let layer = create_fmt_layer(&config, io::stdout);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(layer)
                .try_init()?;
        }
        LogOutput::Stderr => {
            let layer = create_fmt_layer(&config, io::stderr);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(layer)
                .try_init()?;
        }
        LogOutput::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let layer = create_fmt_layer(&config, Mutex::new(file));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(layer)
                .try_init()?;
        }
    }

    Ok(())
}

fn create_fmt_layer<S, W>(config: &LoggingConfig, make_writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let mut layer = fmt::layer()
        .with_writer(make_writer)
        .with_target(true)
        .with_level(true);

    if config.include_file_location {
        layer = layer.with_file(true).with_line_number(true);
    }

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// 面向用户的事件日志（只追加，仅在本次会话内保留）
///
/// 每一行同时写入 tracing，target 为 `gitguide::output`。
#[derive(Debug)]
pub struct OutputChannel {
    name: String,
    lines: Mutex<Vec<String>>,
}

impl OutputChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append_line(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        tracing::info!(target: "gitguide::output", channel = %self.name, "{}", line);

        let stamped = format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), line);
        match self.lines.lock() {
            Ok(mut lines) => lines.push(stamped),
            Err(poisoned) => poisoned.into_inner().push(stamped),
        }
    }

    /// 本次会话的全部日志行
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 是否有某一行包含给定文本
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.lines().iter().filter(|line| line.contains(needle)).count()
    }
}

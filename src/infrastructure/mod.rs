pub mod error;
pub mod logging;

pub use error::{ErrorCategory, GuideError};
pub use logging::{setup_logging, LogFormat, LogOutput, LoggingConfig, OutputChannel};

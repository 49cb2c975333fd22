//! Named, level-filtered loggers.
//!
//! Every component owns a `static LOGGER: LazyLock<Logger>`. Output goes to
//! stdout/stderr through the default handler; a process-wide user handler
//! can observe every record (tests use it to capture diagnostics).

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

const INHERIT_LEVEL: u8 = u8::MAX;

static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static USER_LOG_HANDLER: RwLock<Option<UserLogHandler>> = RwLock::new(None);

#[derive(Clone)]
struct UserLogHandler {
    threshold: Option<LogLevel>,
    callback: LogCallback,
}

pub type LogCallback = Arc<dyn Fn(LogCallbackParams) + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Verbose = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Silent = 5,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Verbose,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Silent,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(LogError::InvalidLogLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => write!(f, "Invalid log level \"{level}\""),
        }
    }
}

impl std::error::Error for LogError {}

/// One argument of a log record: free text or a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub enum LogArgument {
    Text(String),
    Value(Value),
}

impl LogArgument {
    fn to_message_fragment(&self) -> Option<String> {
        match self {
            LogArgument::Text(text) => Some(text.clone()),
            LogArgument::Value(Value::Null) => None,
            LogArgument::Value(Value::String(text)) => Some(text.clone()),
            LogArgument::Value(other) => Some(other.to_string()),
        }
    }

    fn to_callback_value(&self) -> Value {
        match self {
            LogArgument::Text(text) => Value::String(text.clone()),
            LogArgument::Value(value) => value.clone(),
        }
    }
}

impl From<&str> for LogArgument {
    fn from(value: &str) -> Self {
        LogArgument::Text(value.to_owned())
    }
}

impl From<String> for LogArgument {
    fn from(value: String) -> Self {
        LogArgument::Text(value)
    }
}

impl From<Value> for LogArgument {
    fn from(value: Value) -> Self {
        LogArgument::Value(value)
    }
}

/// What a user log handler receives for each record.
#[derive(Debug, Clone)]
pub struct LogCallbackParams {
    pub level: LogLevel,
    pub message: String,
    pub args: Vec<Value>,
    pub logger_name: String,
}

#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    name: String,
    level: AtomicU8,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                name: name.into(),
                level: AtomicU8::new(INHERIT_LEVEL),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The logger's own level, or the global level when none was set.
    pub fn log_level(&self) -> LogLevel {
        match self.inner.level.load(Ordering::SeqCst) {
            INHERIT_LEVEL => LogLevel::from_u8(GLOBAL_LOG_LEVEL.load(Ordering::SeqCst)),
            level => LogLevel::from_u8(level),
        }
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.inner.level.store(level as u8, Ordering::SeqCst);
    }

    pub fn debug(&self, arg: impl Into<LogArgument>) {
        self.dispatch(LogLevel::Debug, vec![arg.into()]);
    }

    pub fn info(&self, arg: impl Into<LogArgument>) {
        self.dispatch(LogLevel::Info, vec![arg.into()]);
    }

    pub fn warn(&self, arg: impl Into<LogArgument>) {
        self.dispatch(LogLevel::Warn, vec![arg.into()]);
    }

    pub fn error(&self, arg: impl Into<LogArgument>) {
        self.dispatch(LogLevel::Error, vec![arg.into()]);
    }

    pub fn error_with<I>(&self, args: I)
    where
        I: IntoIterator<Item = LogArgument>,
    {
        self.dispatch(LogLevel::Error, args.into_iter().collect());
    }

    fn dispatch(&self, level: LogLevel, arguments: Vec<LogArgument>) {
        let user_handler = USER_LOG_HANDLER
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        if let Some(handler) = user_handler {
            let threshold = handler.threshold.unwrap_or_else(|| self.log_level());
            if level >= threshold && level != LogLevel::Silent {
                (handler.callback)(LogCallbackParams {
                    level,
                    message: build_message(&arguments),
                    args: arguments.iter().map(LogArgument::to_callback_value).collect(),
                    logger_name: self.name().to_owned(),
                });
            }
        }
        default_log_handler(self, level, &arguments);
    }
}

fn default_log_handler(logger: &Logger, level: LogLevel, args: &[LogArgument]) {
    if level < logger.log_level() || level == LogLevel::Silent {
        return;
    }

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let message = build_message(args);
    let line = format!("[{now}]  {} {level}: {message}", logger.name());
    match level {
        LogLevel::Warn | LogLevel::Error => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

fn build_message(args: &[LogArgument]) -> String {
    args.iter()
        .filter_map(LogArgument::to_message_fragment)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sets the level used by every logger that has no level of its own.
pub fn set_log_level(level: impl AsRef<str>) -> Result<(), LogError> {
    let level = LogLevel::from_str(level.as_ref())?;
    GLOBAL_LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    Ok(())
}

/// Installs (or with `None`, clears) the process-wide user log handler.
///
/// `threshold` overrides each logger's own level for this handler.
pub fn set_user_log_handler<F>(callback: Option<F>, threshold: Option<LogLevel>)
where
    F: Fn(LogCallbackParams) + Send + Sync + 'static,
{
    let handler = callback.map(|callback| UserLogHandler {
        threshold,
        callback: Arc::new(callback),
    });
    if let Ok(mut slot) = USER_LOG_HANDLER.write() {
        *slot = handler;
    }
}

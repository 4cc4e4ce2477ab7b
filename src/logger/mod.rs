//! Named loggers with replaceable handlers.
//!
//! Every tracker owns a [`Logger`]. Failures that are absorbed at the public tracking API
//! (malformed URLs, transport errors, rejected dimensions) are reported through it, so hosts can
//! observe them with [`Logger::set_user_log_handler`] or the process-wide
//! [`set_user_log_handler_fn`]. Without a custom handler, records are forwarded to the `log`
//! facade using the logger name as target.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INSTANCES: LazyLock<Mutex<Vec<Weak<LoggerInner>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

type SharedLogHandler = Arc<dyn Fn(&Logger, LogLevel, &[LogArgument]) + Send + Sync + 'static>;

#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("level", &self.log_level())
            .finish()
    }
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        let inner = Arc::new(LoggerInner::new(name.into()));
        INSTANCES
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::downgrade(&inner));
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.log_level.load(Ordering::SeqCst))
    }

    pub fn set_log_level<L>(&self, level: L) -> Result<(), LogError>
    where
        L: IntoLogLevel,
    {
        let level = level.into_log_level()?;
        self.inner.log_level.store(level as u8, Ordering::SeqCst);
        Ok(())
    }

    pub fn set_log_handler<F>(&self, handler: F)
    where
        F: Fn(&Logger, LogLevel, &[LogArgument]) + Send + Sync + 'static,
    {
        *write_lock(&self.inner.log_handler) = Arc::new(handler);
    }

    pub fn reset_log_handler(&self) {
        *write_lock(&self.inner.log_handler) = Arc::new(default_log_handler);
    }

    pub fn user_log_handler(&self) -> Option<SharedLogHandler> {
        read_lock(&self.inner.user_log_handler).clone()
    }

    /// Installs a handler that sees every record of this logger, regardless of level, before
    /// the regular handler runs.
    pub fn set_user_log_handler<F>(&self, handler: Option<F>)
    where
        F: Fn(&Logger, LogLevel, &[LogArgument]) + Send + Sync + 'static,
    {
        *write_lock(&self.inner.user_log_handler) =
            handler.map(|f| Arc::new(f) as SharedLogHandler);
    }

    pub fn clear_user_log_handler(&self) {
        write_lock(&self.inner.user_log_handler).take();
    }

    pub fn debug(&self, arg: impl IntoLogArgument) {
        self.dispatch(LogLevel::Debug, vec![arg.into_log_argument()]);
    }

    pub fn info(&self, arg: impl IntoLogArgument) {
        self.dispatch(LogLevel::Info, vec![arg.into_log_argument()]);
    }

    pub fn warn(&self, arg: impl IntoLogArgument) {
        self.dispatch(LogLevel::Warn, vec![arg.into_log_argument()]);
    }

    pub fn warn_with<I, T>(&self, args: I)
    where
        I: IntoIterator<Item = T>,
        T: IntoLogArgument,
    {
        self.emit_many(LogLevel::Warn, args);
    }

    pub fn error(&self, arg: impl IntoLogArgument) {
        self.dispatch(LogLevel::Error, vec![arg.into_log_argument()]);
    }

    pub fn error_with<I, T>(&self, args: I)
    where
        I: IntoIterator<Item = T>,
        T: IntoLogArgument,
    {
        self.emit_many(LogLevel::Error, args);
    }

    fn emit_many<I, T>(&self, level: LogLevel, args: I)
    where
        I: IntoIterator<Item = T>,
        T: IntoLogArgument,
    {
        let arguments = args.into_iter().map(IntoLogArgument::into_log_argument).collect();
        self.dispatch(level, arguments);
    }

    fn dispatch(&self, level: LogLevel, arguments: Vec<LogArgument>) {
        if let Some(handler) = self.user_log_handler() {
            handler(self, level, &arguments);
        }
        let handler = read_lock(&self.inner.log_handler).clone();
        handler(self, level, &arguments);
    }
}

struct LoggerInner {
    name: String,
    log_level: AtomicU8,
    log_handler: RwLock<SharedLogHandler>,
    user_log_handler: RwLock<Option<SharedLogHandler>>,
}

impl LoggerInner {
    fn new(name: String) -> Self {
        Self {
            name,
            log_level: AtomicU8::new(GLOBAL_LOG_LEVEL.load(Ordering::SeqCst)),
            log_handler: RwLock::new(Arc::new(default_log_handler)),
            user_log_handler: RwLock::new(None),
        }
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn default_log_handler(logger: &Logger, level: LogLevel, args: &[LogArgument]) {
    if level < logger.log_level() {
        return;
    }
    let Some(level) = level.as_log_level() else {
        return;
    };
    log::log!(target: logger.name(), level, "{}", build_message(args));
}

fn build_message(args: &[LogArgument]) -> String {
    args.iter()
        .filter_map(LogArgument::to_message_fragment)
        .collect::<Vec<_>>()
        .join(" ")
}

fn with_instances<F>(mut f: F)
where
    F: FnMut(Logger),
{
    let mut instances = INSTANCES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    instances.retain(|weak| weak.strong_count() > 0);
    for inner in instances.iter().filter_map(Weak::upgrade) {
        f(Logger { inner });
    }
}

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

    fn as_log_level(self) -> Option<log::Level> {
        match self {
            LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Verbose => Some(log::Level::Trace),
            LogLevel::Info => Some(log::Level::Info),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Error => Some(log::Level::Error),
            LogLevel::Silent => None,
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

pub trait IntoLogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError>;
}

impl IntoLogLevel for LogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        Ok(self)
    }
}

impl IntoLogLevel for &str {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        LogLevel::from_str(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub level: Option<LogLevel>,
}

#[derive(Debug, Clone)]
pub struct LogCallbackParams {
    pub level: LogLevel,
    pub message: String,
    pub args: Vec<Value>,
    pub logger_type: String,
}

pub type LogCallback = Arc<dyn Fn(LogCallbackParams) + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq)]
pub enum LogArgument {
    Text(String),
    Value(Value),
    Null,
}

impl LogArgument {
    pub fn to_message_fragment(&self) -> Option<String> {
        match self {
            LogArgument::Text(text) | LogArgument::Value(Value::String(text)) => Some(text.clone()),
            LogArgument::Value(Value::Null) | LogArgument::Null => None,
            LogArgument::Value(other) => Some(other.to_string()),
        }
    }

    pub fn to_callback_value(&self) -> Value {
        match self {
            LogArgument::Text(text) => Value::String(text.clone()),
            LogArgument::Value(value) => value.clone(),
            LogArgument::Null => Value::Null,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            LogArgument::Text(text) | LogArgument::Value(Value::String(text)) => Some(text),
            _ => None,
        }
    }
}

pub trait IntoLogArgument {
    fn into_log_argument(self) -> LogArgument;
}

impl IntoLogArgument for LogArgument {
    fn into_log_argument(self) -> LogArgument {
        self
    }
}

impl IntoLogArgument for String {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Text(self)
    }
}

impl IntoLogArgument for &str {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Text(self.to_owned())
    }
}

impl IntoLogArgument for bool {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Value(Value::Bool(self))
    }
}

macro_rules! impl_int_argument {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoLogArgument for $ty {
                fn into_log_argument(self) -> LogArgument {
                    LogArgument::Value(Value::Number(serde_json::Number::from(self)))
                }
            }
        )*
    };
}

impl_int_argument!(i32, i64, u32, u64, usize);

impl IntoLogArgument for Value {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Value(self)
    }
}

impl<T> IntoLogArgument for Option<T>
where
    T: IntoLogArgument,
{
    fn into_log_argument(self) -> LogArgument {
        match self {
            Some(value) => value.into_log_argument(),
            None => LogArgument::Null,
        }
    }
}

pub fn log_arg<T>(value: T) -> LogArgument
where
    T: IntoLogArgument,
{
    value.into_log_argument()
}

#[derive(Debug, Clone)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => {
                write!(f, "Invalid value \"{level}\" assigned to `logLevel`")
            }
        }
    }
}

impl std::error::Error for LogError {}

/// Sets the level of every live logger and of loggers created afterwards.
pub fn set_log_level<L>(level: L) -> Result<(), LogError>
where
    L: IntoLogLevel,
{
    let level = level.into_log_level()?;
    GLOBAL_LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    with_instances(|logger| {
        let _ = logger.set_log_level(level);
    });
    Ok(())
}

/// Installs `callback` as the user handler of every live logger, or clears it with `None`.
pub fn set_user_log_handler_fn<F>(callback: Option<F>, options: Option<LogOptions>)
where
    F: Fn(LogCallbackParams) + Send + Sync + 'static,
{
    let Some(callback) = callback.map(|cb| Arc::new(cb) as LogCallback) else {
        with_instances(|logger| logger.clear_user_log_handler());
        return;
    };

    let custom_level = options.unwrap_or_default().level;
    with_instances(|logger| {
        let callback = Arc::clone(&callback);
        logger.set_user_log_handler(Some(move |instance: &Logger, level, args: &[LogArgument]| {
            let threshold = custom_level.unwrap_or_else(|| instance.log_level());
            if level < threshold {
                return;
            }
            callback(LogCallbackParams {
                level,
                message: build_message(args),
                args: args.iter().map(LogArgument::to_callback_value).collect(),
                logger_type: instance.name().to_owned(),
            });
        }));
    });
}

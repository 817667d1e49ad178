//! Structured logging: one JSON object per line, warnings and errors on
//! stderr, everything else on stdout.

use std::{convert::Infallible, env, str::FromStr};

use chrono::{SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{Map, Value};

const DEFAULT_SERVICE: &str = "heartio-service";

/// Ordered from most to least severe, so `level <= threshold` means "emit".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl FromStr for Level {
    type Err = Infallible;

    /// Unknown names fall back to `info`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Level::Error,
            "warn" | "warning" => Level::Warn,
            "debug" | "trace" => Level::Debug,
            _ => Level::Info,
        })
    }
}

#[derive(Serialize)]
struct Line<'a> {
    timestamp: String,
    service: &'a str,
    env: &'a str,
    host: &'a str,
    level: Level,
    event: &'a str,
    #[serde(flatten)]
    context: Map<String, Value>,
}

pub struct Logger {
    service: String,
    environment: String,
    host: String,
    threshold: Level,
}

static LOGGER: OnceCell<Logger> = OnceCell::new();

pub fn init_logger(service: &str) -> &'static Logger {
    LOGGER.get_or_init(|| Logger::from_env(service))
}

/// The process logger. Falls back to the default service name when
/// `init_logger` has not run, as in library use and tests.
pub fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::from_env(DEFAULT_SERVICE))
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .or_else(|| env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Objects are merged into the line; other values land under `context`.
fn context_fields<T: Serialize>(context: T) -> Map<String, Value> {
    match serde_json::to_value(context) {
        Ok(Value::Object(fields)) => fields,
        Ok(Value::Null) | Err(_) => Map::new(),
        Ok(other) => Map::from_iter([("context".to_string(), other)]),
    }
}

impl Logger {
    fn from_env(service: &str) -> Self {
        Self {
            service: service.to_string(),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: host_name(),
            threshold: env::var("LOG_LEVEL")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(Level::Info),
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.threshold
    }

    fn line<T: Serialize>(&self, level: Level, event: &str, context: T) -> Value {
        let line = Line {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            service: &self.service,
            env: &self.environment,
            host: &self.host,
            level,
            event,
            context: context_fields(context),
        };
        serde_json::to_value(line).unwrap_or(Value::Null)
    }

    pub fn log<T: Serialize>(&self, level: Level, event: &str, context: T) {
        if !self.enabled(level) {
            return;
        }
        let line = self.line(level, event, context);
        if level <= Level::Warn {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    pub fn debug<T: Serialize>(&self, event: &str, context: T) {
        self.log(Level::Debug, event, context);
    }

    pub fn info<T: Serialize>(&self, event: &str, context: T) {
        self.log(Level::Info, event, context);
    }

    pub fn warn<T: Serialize>(&self, event: &str, context: T) {
        self.log(Level::Warn, event, context);
    }

    pub fn error<T: Serialize>(&self, event: &str, context: T) {
        self.log(Level::Error, event, context);
    }
}

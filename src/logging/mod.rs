//! Structured logging via `tracing`.
//!
//! - Level filtering per module, rendered to an `EnvFilter` string
//! - `RUST_LOG` overrides the configured filters
//! - Idempotent initialization (first call wins)
//!
//! Engine code logs with the `tracing` macros directly. Content errors go out
//! at warn, placement failures and selection exhaustion at debug, per-frame
//! behavior detail at trace.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Once;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

pub struct LoggingPlugin {
    pub config: TracingConfig,
}

impl Default for LoggingPlugin {
    fn default() -> Self {
        Self {
            config: TracingConfig::default(),
        }
    }
}

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing(&self.config);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Unknown names fall back to info
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_timestamps: bool,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    pub show_file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("horde_core::monster".to_string(), LogLevel::Info),
                ("horde_core::animation".to_string(), LogLevel::Warn),
                ("horde_core::spawn".to_string(), LogLevel::Info),
                ("horde_core::horde".to_string(), LogLevel::Info),
                ("horde_core::content".to_string(), LogLevel::Warn),
            ],
            show_timestamps: true,
            show_thread_ids: false,
            show_targets: true,
            show_file_line: false,
        }
    }
}

impl TracingConfig {
    /// Everything the behavior code says, down to per-frame trace output
    pub fn verbose() -> Self {
        Self {
            default_level: LogLevel::Debug,
            module_filters: vec![
                ("horde_core::monster".to_string(), LogLevel::Trace),
                ("horde_core::animation".to_string(), LogLevel::Trace),
                ("horde_core::attack".to_string(), LogLevel::Trace),
            ],
            show_file_line: true,
            ..Self::default()
        }
    }

    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{}={}", module, level.as_str()));
        }
        parts.join(",")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

static TRACING_INIT: Once = Once::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Install the global subscriber (idempotent, first call wins)
pub fn init_tracing(config: &TracingConfig) {
    let config = config.clone();
    TRACING_INIT.call_once(move || {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.to_env_filter_string()));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.show_targets)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .compact();

        // Someone else (e.g. Bevy's LogPlugin) may own the global subscriber
        let _ = if config.show_timestamps {
            builder.try_init()
        } else {
            builder.without_time().try_init()
        };
    });
}

/// Unstructured one-liners tagged with the subsystem that emitted them
pub fn log_info(system: &str, message: &str) {
    tracing::info!(target: "horde_core", system, "{}", message);
}

pub fn log_warn(system: &str, message: &str) {
    tracing::warn!(target: "horde_core", system, "{}", message);
}

pub fn log_error(system: &str, message: &str) {
    tracing::error!(target: "horde_core", system, "{}", message);
}

pub fn log_debug(system: &str, message: &str) {
    tracing::debug!(target: "horde_core", system, "{}", message);
}

/// Span guard that logs its own duration when dropped
pub struct TimingSpan {
    name: String,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn new(name: &str) -> Self {
        let span = tracing::debug_span!("timed", name);
        Self {
            name: name.to_string(),
            started: Instant::now(),
            _span: span.entered(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for TimingSpan {
    fn drop(&mut self) {
        tracing::debug!(target: "horde_core", name = %self.name, elapsed_ms = self.elapsed_ms(), "timed operation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("TRACE"), LogLevel::Trace);
        assert_eq!(LogLevel::parse(" warning "), LogLevel::Warn);
        assert_eq!(LogLevel::parse("error"), LogLevel::Error);
        assert_eq!(LogLevel::parse("loud"), LogLevel::Info);
    }

    #[test]
    fn test_env_filter_string() {
        let filter = TracingConfig::default().to_env_filter_string();
        assert!(filter.starts_with("info"));
        assert!(filter.contains("horde_core::content=warn"));
        assert!(filter.contains("horde_core::spawn=info"));
    }

    #[test]
    fn test_verbose_preset() {
        let config = TracingConfig::verbose();
        assert_eq!(config.default_level, LogLevel::Debug);
        assert!(config.to_env_filter_string().contains("horde_core::monster=trace"));
        assert!(config.show_file_line);
    }

    #[test]
    fn test_tracing_config_json_roundtrip() {
        let config = TracingConfig::default();
        let restored = TracingConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(restored.default_level, config.default_level);
        assert_eq!(restored.module_filters, config.module_filters);
    }

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing_default();
        init_tracing(&TracingConfig::verbose());
        log_info("test", "info message");
        log_warn("test", "warn message");
        log_error("test", "error message");
        log_debug("test", "debug message");
    }

    #[test]
    fn test_timing_span() {
        init_tracing_default();
        let span = TimingSpan::new("selection");
        let sum: u64 = (0..100).sum();
        assert!(sum > 0);
        assert!(span.elapsed_ms() >= 0.0);
    }
}

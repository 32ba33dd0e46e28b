//! Subscriber setup for the `chainsync` binary. Log lines go to stderr so that
//! stdout carries only decoded output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter and format settings for the CLI's log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base `EnvFilter` level.
    #[serde(default = "default_level")]
    pub level: String,
    /// Per-crate overrides, e.g. `chainsync-logs = "trace"`.
    #[serde(default)]
    pub components: BTreeMap<String, String>,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: BTreeMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Settings for the global CLI flags; `-v` lowers the level to `debug`.
    pub fn for_cli(verbose: bool, json: bool) -> Self {
        let mut config = Self {
            json,
            ..Self::default()
        };
        if verbose {
            config.level = "debug".into();
        }
        config
    }

    /// `EnvFilter` directives, e.g. `"info,chainsync_logs=trace"`.
    pub fn directives(&self) -> String {
        self.components
            .iter()
            .fold(self.level.clone(), |mut acc, (component, level)| {
                acc.push_str(&format!(",{}={}", component.replace('-', "_"), level));
                acc
            })
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over `config`.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let output = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry().with(output).with(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_include_components() {
        let mut cfg = LogConfig {
            level: "warn".into(),
            ..Default::default()
        };
        cfg.components.insert("chainsync-logs".into(), "debug".into());
        cfg.components.insert("chainsync-evm".into(), "trace".into());
        assert_eq!(cfg.directives(), "warn,chainsync_evm=trace,chainsync_logs=debug");
    }

    #[test]
    fn cli_defaults_to_info() {
        assert_eq!(LogConfig::for_cli(false, false).directives(), "info");
        let verbose = LogConfig::for_cli(true, true);
        assert_eq!(verbose.level, "debug");
        assert!(verbose.json);
    }
}

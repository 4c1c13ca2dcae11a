use anyhow::{Context, Result};
use clap::ValueEnum;
use config::{Config, Environment};
use serde::Deserialize;

use crate::pages::GroupingMode;

const ENV_PREFIX: &str = "UCB_TRACE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupingKind {
    /// Primary request plus the contiguous secondary run after it.
    Contiguous,
    /// Like contiguous, but a long gap also opens a new page.
    Timeout,
}

/// Run settings, read from `UCB_TRACE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Decode progress is reported every this many records (0 = never).
    pub progress_every: u64,
    pub page_timeout_secs: u32,
    pub grouping: GroupingKind,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self> {
        Config::builder()
            .set_default("progress_every", 1000)?
            .set_default("page_timeout_secs", 10)?
            .set_default("grouping", "contiguous")?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
            .context("Invalid UCB_TRACE_* settings")
    }

    pub fn grouping_mode(&self) -> GroupingMode {
        match self.grouping {
            GroupingKind::Contiguous => GroupingMode::Contiguous,
            GroupingKind::Timeout => GroupingMode::Timeout {
                secs: self.page_timeout_secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults() {
        let s = Settings::from_env(env(&[])).unwrap();
        assert_eq!(s.progress_every, 1000);
        assert_eq!(s.page_timeout_secs, 10);
        assert_eq!(s.grouping_mode(), GroupingMode::Contiguous);
    }

    #[test]
    fn environment_overrides() {
        let s = Settings::from_env(env(&[
            ("UCB_TRACE_PROGRESS_EVERY", "250"),
            ("UCB_TRACE_GROUPING", "timeout"),
            ("UCB_TRACE_PAGE_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(s.progress_every, 250);
        assert_eq!(s.grouping_mode(), GroupingMode::Timeout { secs: 30 });
    }

    #[test]
    fn rejects_unknown_grouping() {
        assert!(Settings::from_env(env(&[("UCB_TRACE_GROUPING", "hourly")])).is_err());
    }
}

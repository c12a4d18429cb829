//! Layered configuration for analyzer defaults.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. environment variables prefixed with `PROVWATCH_`, nested keys joined
//!    by `__` (`PROVWATCH_DROPS__MIN_DROPS=3`)
//!
//! Command-line flags are applied on top by the binary.
//!
//! ```toml
//! [paths]
//! top_n = 20
//!
//! [bottlenecks]
//! percentile = 99.0
//! min_samples = 10
//!
//! [drops]
//! window = "2h"
//! min_drops = 1
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, Map};
use provwatch_lineage::{
    bottleneck, drops, paths, BottleneckQuery, DropQuery, ModificationQuery, PathQuery,
    TraceOptions,
};
use serde::{Deserialize, Serialize};

use crate::duration::parse_window_minutes;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PROVWATCH";

/// Default number of components in the modification report.
pub const DEFAULT_MODIFICATION_LIMIT: usize = 15;

/// Analyzer defaults, grouped by command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub bottlenecks: BottleneckSettings,
    pub drops: DropSettings,
    pub modifications: ModificationSettings,
    pub trace: TraceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub top_n: usize,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            top_n: paths::DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BottleneckSettings {
    pub percentile: f64,
    pub min_samples: usize,
    pub limit: Option<usize>,
}

impl Default for BottleneckSettings {
    fn default() -> Self {
        Self {
            percentile: bottleneck::DEFAULT_PERCENTILE,
            min_samples: 1,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropSettings {
    /// Look-back window: bare minutes or a duration string ("90m", "2h").
    pub window: String,
    pub min_drops: usize,
}

impl Default for DropSettings {
    fn default() -> Self {
        Self {
            window: format!("{}m", drops::DEFAULT_WINDOW_MINUTES),
            min_drops: drops::DEFAULT_MIN_DROPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModificationSettings {
    pub limit: Option<usize>,
}

impl Default for ModificationSettings {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_MODIFICATION_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    pub max_depth: Option<usize>,
}

impl Settings {
    /// Load settings from the optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings: Settings = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        settings
            .drop_query()
            .context("invalid [drops] configuration")?;
        Ok(settings)
    }

    pub fn path_query(&self) -> PathQuery {
        PathQuery {
            top_n: self.paths.top_n,
        }
    }

    pub fn bottleneck_query(&self) -> BottleneckQuery {
        BottleneckQuery {
            percentile: self.bottlenecks.percentile,
            min_samples: self.bottlenecks.min_samples,
            limit: self.bottlenecks.limit,
        }
    }

    pub fn drop_query(&self) -> Result<DropQuery> {
        Ok(DropQuery {
            time_window_minutes: parse_window_minutes(&self.drops.window)?,
            min_drops: self.drops.min_drops,
        })
    }

    pub fn modification_query(&self) -> ModificationQuery {
        ModificationQuery {
            limit: self.modifications.limit,
        }
    }

    pub fn trace_options(&self) -> TraceOptions {
        TraceOptions {
            max_depth: self.trace.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn no_env() -> Option<Map<String, String>> {
        Some(Map::new())
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_env(None, no_env()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.path_query().top_n, 10);
        assert_eq!(settings.bottleneck_query().percentile, 90.0);
        assert_eq!(settings.drop_query().unwrap(), DropQuery::default());
        assert_eq!(settings.modification_query().limit, Some(15));
        assert_eq!(settings.trace_options().max_depth, None);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[paths]\ntop_n = 3\n\n[drops]\nwindow = \"2h\"\n\n[bottlenecks]\npercentile = 99.5"
        )
        .unwrap();

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.paths.top_n, 3);
        assert_eq!(settings.drop_query().unwrap().time_window_minutes, 120);
        assert_eq!(settings.bottlenecks.percentile, 99.5);
        // Untouched sections keep their defaults
        assert_eq!(settings.drops.min_drops, 5);
        assert_eq!(settings.modifications.limit, Some(15));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[drops]\nmin_drops = 9").unwrap();

        let env = Map::from([
            ("PROVWATCH_DROPS__MIN_DROPS".to_string(), "3".to_string()),
            ("PROVWATCH_TRACE__MAX_DEPTH".to_string(), "4".to_string()),
        ]);
        let settings = Settings::load_with_env(Some(file.path()), Some(env)).unwrap();
        assert_eq!(settings.drops.min_drops, 3);
        assert_eq!(settings.trace.max_depth, Some(4));
    }

    #[test]
    fn test_bad_window_is_rejected() {
        let env = Map::from([("PROVWATCH_DROPS__WINDOW".to_string(), "soon".to_string())]);
        assert!(Settings::load_with_env(None, Some(env)).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/provwatch.toml");
        assert!(Settings::load_with_env(Some(missing), no_env()).is_err());
    }
}

//! # Configuration
//!
//! YAML configuration for decoding and comparison runs.
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `COMP_CONFIG` environment variable
//! 2. `./comp.yaml` (current directory)
//! 3. `~/.config/comp/config.yaml` (user config)
//! 4. `/etc/comp/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! transform:
//!   modulation: BPSK
//!   keep_offset: true
//!
//! filters:
//!   methods: [zero_forcing, MMSE]
//!   snr_over_nt: 5.0
//!
//! annealing:
//!   num_reads: 30
//!   num_sweeps: 150
//!   seed: 42
//!
//! comparison:
//!   runs: 5
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compare::{Comparison, MIN_RUNS};
use crate::error::{Error, Result};
use crate::filters::{self, FilterMethod};
use crate::matrix::ChannelMatrix;
use crate::observe::LogConfig;
use crate::solver::SimulatedAnnealing;
use crate::transform::{ChannelToQubo, TransformConfig};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "COMP_CONFIG";

/// Linear filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub methods: Vec<FilterMethod>,
    /// SNR per transmitter for MMSE (`.inf` for the noiseless limit)
    pub snr_over_nt: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            methods: vec![FilterMethod::MatchedFilter],
            snr_over_nt: f64::INFINITY,
        }
    }
}

/// Comparison loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Number of instances a comparison run expects
    pub runs: usize,
    /// Seed for filter tie-breaking
    pub seed: u64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self { runs: 5, seed: 0 }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub transform: TransformConfig,
    pub filters: FilterConfig,
    pub annealing: SimulatedAnnealing,
    pub comparison: ComparisonConfig,
    pub logging: LogConfig,
}

impl DecoderConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the defaults if no file is found.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if Path::new(&path).exists() {
                return Self::load_from(Path::new(&path));
            }
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Get configuration search paths.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./comp.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "comp") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/comp/config.yaml"));
        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.filters.methods.contains(&FilterMethod::Mmse)
            && (self.filters.snr_over_nt.is_nan() || self.filters.snr_over_nt <= 0.0)
        {
            return Err(Error::Config("snr_over_nt must be positive".to_string()));
        }

        if self.annealing.num_reads == 0 {
            return Err(Error::Config("annealing.num_reads must be > 0".to_string()));
        }
        if let Some((hot, cold)) = self.annealing.beta_range {
            if !(hot > 0.0 && cold >= hot) {
                return Err(Error::Config("annealing.beta_range must satisfy 0 < hot <= cold".to_string()));
            }
        }

        if self.comparison.runs < MIN_RUNS {
            return Err(Error::Config(format!("comparison.runs must be >= {}", MIN_RUNS)));
        }

        Ok(())
    }

    pub fn transformer(&self) -> ChannelToQubo {
        ChannelToQubo::new(self.transform)
    }

    /// Comparison harness with the configured annealer, filters and run
    /// count.
    pub fn comparison(&self) -> Comparison {
        Comparison::new(self.transformer())
            .sampler(self.annealing.clone())
            .filters(&self.filters.methods)
            .snr_over_nt(self.filters.snr_over_nt)
            .seed(self.comparison.seed)
            .runs(self.comparison.runs)
    }

    /// Filter matrices for `h` according to this configuration.
    pub fn create_filters(&self, h: &ChannelMatrix) -> Result<BTreeMap<FilterMethod, ChannelMatrix>> {
        filters::create_filters(h, &self.filters.methods, self.filters.snr_over_nt)
    }
}

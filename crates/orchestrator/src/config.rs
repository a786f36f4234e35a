//! Run configuration parsing and validation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration faults. All of them abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Wrong number or shape of command-line arguments.
    #[error("usage: animate <workers> <frames> <input> [output]")]
    Usage,
    /// An argument failed to parse as the expected type.
    #[error("invalid {name}: {value:?}")]
    InvalidArgument {
        /// Which argument was malformed.
        name: &'static str,
        /// The offending raw value.
        value: String,
    },
    /// A parsed value is outside the accepted range.
    #[error("{0}")]
    Invalid(String),
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid JSON for this schema.
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One simulation run: pool size, frame count, and particle files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Worker-thread count; 1 selects the single-threaded policy.
    pub workers: usize,
    /// Number of frames to simulate.
    pub frames: u32,
    /// Input particle file.
    pub input: PathBuf,
    /// Optional output particle file for the final state.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl RunConfig {
    /// Build a configuration from positional command-line arguments
    /// (`<workers> <frames> <input> [output]`).
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        if args.len() < 3 || args.len() > 4 {
            return Err(ConfigError::Usage);
        }
        let workers = args[0]
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidArgument {
                name: "workers",
                value: args[0].clone(),
            })?;
        let frames = args[1]
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidArgument {
                name: "frames",
                value: args[1].clone(),
            })?;
        let config = Self {
            workers,
            frames,
            input: PathBuf::from(&args[2]),
            output: args.get(3).map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges; configuration faults abort startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.frames == 0 {
            return Err(ConfigError::Invalid(
                "frames must be at least 1".to_string(),
            ));
        }
        if self.input.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("input path is empty".to_string()));
        }
        Ok(())
    }
}

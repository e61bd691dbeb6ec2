//! Compile options.

use seqlang_types::MAX_SEQUENCE_LENGTH;
use serde::{Deserialize, Serialize};

/// Environment variable read by [`CompileOptions::from_env`].
pub const PARALLELISM_ENV: &str = "SEQLANG_PARALLELISM";

/// Errors from loading or validating [`CompileOptions`].
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SEQLANG_PARALLELISM must be a positive integer, got '{0}'")]
    InvalidParallelism(String),
    #[error("parallelism must be at least 1")]
    ZeroParallelism,
}

/// Knobs for a compile run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Number of chunks `map` / `reduce` split a sequence into.
    /// `None` uses one per available CPU.
    pub parallelism: Option<usize>,
    /// Largest allowed `stop - start` of a sequence literal.
    pub max_sequence_length: u64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            parallelism: None,
            max_sequence_length: MAX_SEQUENCE_LENGTH,
        }
    }
}

impl CompileOptions {
    /// Options that evaluate everything on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallelism: Some(1),
            ..Self::default()
        }
    }

    /// Parse options from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Defaults, with `parallelism` taken from `SEQLANG_PARALLELISM` if set.
    pub fn from_env() -> Result<Self, OptionsError> {
        let mut options = Self::default();
        if let Ok(value) = std::env::var(PARALLELISM_ENV) {
            options.parallelism = Some(parse_parallelism(&value)?);
        }
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.parallelism == Some(0) {
            return Err(OptionsError::ZeroParallelism);
        }
        Ok(())
    }

    /// The chunk count actually used.
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        })
    }
}

fn parse_parallelism(value: &str) -> Result<usize, OptionsError> {
    match value.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(OptionsError::InvalidParallelism(value.to_string())),
        Ok(n) => Ok(n),
    }
}

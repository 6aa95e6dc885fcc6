//! Deconvolution options.

use serde::{Deserialize, Serialize};

use crate::error::{DeconvError, Result};

/// Default number of Richardson-Lucy iterations
pub const DEFAULT_ITERATIONS: usize = 30;

/// Options recognized by the deconvolution algorithms
///
/// Deserializes from JSON; missing fields take their defaults and unrecognized fields
/// are ignored, so one options file can carry settings for several algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeconvolveOptions {
    /// Number of iterations, must be positive
    #[serde(alias = "num_iterations")]
    pub iterations: usize,
    /// Clamp the result to [0, 1]
    pub clip: bool,
}

impl Default for DeconvolveOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            clip: true,
        }
    }
}

impl DeconvolveOptions {
    pub fn new(iterations: usize, clip: bool) -> Self {
        Self { iterations, clip }
    }

    /// Parse options from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DeconvError::Configuration(format!("Invalid options: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(DeconvError::Configuration(
                "Iteration count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

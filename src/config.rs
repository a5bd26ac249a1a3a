//! Limits and defaults for one transformation.

use serde::{Deserialize, Serialize};

use crate::context::{Param, Params};
use crate::errors::Result;

/// Default ceiling on nested `matches` calls.
pub const DEFAULT_MAX_DEPTH: usize = 2000;

/// Default ceiling on nested function calls while rendering.
pub const DEFAULT_MAX_FUNCTION_DEPTH: usize = 64;

/// What the driver does with input no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unmatched {
    /// Copy the item to the output verbatim.
    #[default]
    Copy,
    /// Drop the item.
    Skip,
    /// Fail the transformation.
    Error,
}

/// Transformation settings.
///
/// ```rust,ignore
/// let config = Config::default()
///     .with_max_depth(500)
///     .with_unmatched(Unmatched::Error)
///     .with_param(Param::CaseInsensitive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_depth: usize,
    pub max_function_depth: usize,
    pub unmatched: Unmatched,
    /// Parameters active at the start of every top-level match.
    pub params: Params,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_function_depth: DEFAULT_MAX_FUNCTION_DEPTH,
            unmatched: Unmatched::default(),
            params: Params::empty(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_function_depth(mut self, depth: usize) -> Self {
        self.max_function_depth = depth;
        self
    }

    pub fn with_unmatched(mut self, mode: Unmatched) -> Self {
        self.unmatched = mode;
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params |= param.flag();
        self
    }
}

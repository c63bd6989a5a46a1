// Parser configuration
//
// Options are plain data so callers can build them in code or load them
// from JSON. Missing keys fall back to the defaults.

use esql_error::{EsqlError, Result};
use serde::{Deserialize, Serialize};

use crate::lexer::LexerOptions;

/// Default limit on expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default limit on query size in bytes.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseOptions {
    /// Recognize preview commands (INLINESTATS, LOOKUP, MATCH, METRICS).
    pub dev_features: bool,
    /// Deepest expression nesting accepted before a structural error.
    pub max_depth: usize,
    /// Largest query accepted by [`crate::try_parse`].
    pub max_input_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            dev_features: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub const fn with_dev_features(mut self, enabled: bool) -> Self {
        self.dev_features = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub const fn lexer_options(&self) -> LexerOptions {
        LexerOptions {
            dev_features: self.dev_features,
        }
    }

    /// Load options from a JSON object and validate them.
    pub fn from_json(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(EsqlError::config("max_depth must be at least 1"));
        }
        if self.max_input_bytes == 0 {
            return Err(EsqlError::config("max_input_bytes must be at least 1"));
        }
        Ok(())
    }
}

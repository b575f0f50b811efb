//! The literal tokens shared between the generation backend's output
//! convention and the parsers in this crate.
//!
//! The defaults are the wire contract. Overriding them is only meaningful when
//! the producing side is changed in the same step.

use serde::{Deserialize, Serialize};

pub const REGION_START: &str = "#region";
pub const REGION_END: &str = "#endregion";
pub const LINE_COMMENT: &str = "//";
pub const BEGIN_TOOL_CALL: &str = "===BEGIN_TOOL_CALL===";
pub const END_TOOL_CALL: &str = "===END_TOOL_CALL===";

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("invalid grammar file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("`{0}` must not be empty")]
    EmptyToken(&'static str),
    #[error("begin and end delimiters must differ")]
    IdenticalDelimiters,
}

/// Complete token set for both parsers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Grammar {
    pub region: RegionGrammar,
    pub delimiters: Delimiters,
}

/// Markers recognized by the region filter. Markers match ASCII
/// case-insensitively; the comment marker matches exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionGrammar {
    pub start_marker: String,
    pub end_marker: String,
    pub comment_marker: String,
}

impl Default for RegionGrammar {
    fn default() -> Self {
        RegionGrammar {
            start_marker: REGION_START.to_string(),
            end_marker: REGION_END.to_string(),
            comment_marker: LINE_COMMENT.to_string(),
        }
    }
}

/// Tokens bracketing an embedded directive payload. Matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Delimiters {
    pub begin: String,
    pub end: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            begin: BEGIN_TOOL_CALL.to_string(),
            end: END_TOOL_CALL.to_string(),
        }
    }
}

impl Grammar {
    /// Parse a TOML grammar. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, GrammarError> {
        let grammar: Grammar = toml::from_str(source)?;
        grammar.validate()?;
        Ok(grammar)
    }

    pub fn validate(&self) -> Result<(), GrammarError> {
        let tokens = [
            ("region.start_marker", &self.region.start_marker),
            ("region.end_marker", &self.region.end_marker),
            ("region.comment_marker", &self.region.comment_marker),
            ("delimiters.begin", &self.delimiters.begin),
            ("delimiters.end", &self.delimiters.end),
        ];
        for (key, token) in tokens {
            if token.trim().is_empty() {
                return Err(GrammarError::EmptyToken(key));
            }
        }
        if self.delimiters.begin == self.delimiters.end {
            return Err(GrammarError::IdenticalDelimiters);
        }
        Ok(())
    }
}

//! Options for a transformer run. Rule tables are configured separately, see
//! [`crate::RuleTables`].

use crate::EmbeddedMatching;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransformOptions {
    pub terse: bool,
    pub verbose: bool,
    /// Apply the rename and direct string tables in reverse.
    pub invert: bool,
    /// Allow replacing an existing output file.
    pub overwrite: bool,
    /// Extensions, with the leading dot, handled by the generic text action.
    pub text_extensions: Vec<String>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub embedded_matching: EmbeddedMatching,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            terse: false,
            verbose: false,
            invert: false,
            overwrite: false,
            text_extensions: default_text_extensions(),
            includes: Vec::new(),
            excludes: Vec::new(),
            embedded_matching: EmbeddedMatching::default(),
        }
    }
}

fn default_text_extensions() -> Vec<String> {
    [
        ".properties",
        ".xml",
        ".xhtml",
        ".html",
        ".htm",
        ".jsp",
        ".jspf",
        ".tld",
        ".txt",
        ".json",
        ".yaml",
        ".yml",
        ".sql",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

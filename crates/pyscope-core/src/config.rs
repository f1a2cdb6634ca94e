//! Analyzer options.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Recognized configuration keys. Unknown keys in the source mapping are
/// ignored (serde's default behavior), per the options contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Suppress informational output (the end-of-run summary).
    pub quiet: bool,
    /// Verbose logging.
    pub debug: bool,
}

impl AnalyzerOptions {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_are_ignored() {
        let options =
            AnalyzerOptions::from_json(json!({"quiet": true, "color": "always"})).unwrap();
        assert!(options.quiet);
        assert!(!options.debug);
    }

    #[test]
    fn defaults_are_off() {
        let options = AnalyzerOptions::default();
        assert!(!options.quiet);
        assert!(!options.debug);
    }
}

//! Diagnostic records emitted during analysis.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One finding, anchored to a byte range of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub severity: Severity,
    pub start: u32,
    pub end: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, start: u32, end: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            file: file.into(),
            severity: Severity::Error,
            start,
            end,
            message: message.into(),
        }
    }

    pub fn warning(file: impl Into<String>, start: u32, end: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            file: file.into(),
            severity: Severity::Warning,
            start,
            end,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}..{}: {}: {}",
            self.file, self.start, self.end, self.severity, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_location_and_severity() {
        let diag = Diagnostic::error("a.py", 0, 5, "Unused variable: x");
        assert_eq!(diag.to_string(), "a.py:0..5: error: Unused variable: x");
    }
}

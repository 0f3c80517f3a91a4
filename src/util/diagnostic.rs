//! User-friendly diagnostic messages.
//!
//! Every error reported to the user carries its root cause, the chain of
//! underlying errors as context, and a suggested fix where one is known.

use std::error::Error as StdError;
use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a matching file cannot be parsed.
    pub const MALFORMED_MATCHING_FILE: &str =
        "help: Run `gantry schema <FILE>` to check the attribute declarations";

    /// Suggestion when a request name is unknown.
    pub const UNKNOWN_REQUEST: &str = "help: Run `gantry select <FILE>` to evaluate every request";

    /// Suggestion when nothing matched.
    pub const NO_MATCH: &str = "help: Run `gantry explain <FILE> --request <NAME>` for details";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Stable error code, if known
    pub code: Option<String>,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            code: None,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Create a new note.
    pub fn note(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Note,
            ..Diagnostic::error(message)
        }
    }

    /// Build a diagnostic from a library error: code and help come from the
    /// error's miette metadata, context from its source chain.
    pub fn from_report(error: &dyn miette::Diagnostic) -> Self {
        let mut diag = Diagnostic::error(error.to_string());
        diag.code = error.code().map(|code| code.to_string());
        if let Some(help) = error.help() {
            diag = diag.with_suggestion(help.to_string());
        }
        diag.with_source_chain(error.source())
    }

    /// Build a diagnostic from an `anyhow` error chain.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let mut chain = error.chain();
        let message = chain
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        let mut diag = Diagnostic::error(message);
        for cause in chain {
            diag = diag.with_context(cause.to_string());
        }
        diag
    }

    fn with_source_chain(mut self, mut source: Option<&(dyn StdError + 'static)>) -> Self {
        while let Some(cause) = source {
            self = self.with_context(cause.to_string());
            source = cause.source();
        }
        self
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
            }
        };

        match &self.code {
            Some(code) => {
                output.push_str(&format!("{}[{}]: {}\n", severity_str, code, self.message))
            }
            None => output.push_str(&format!("{}: {}\n", severity_str, self.message)),
        }

        for ctx in &self.context {
            output.push_str(&format!("  caused by: {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelError;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("no candidate matched request `compile`")
            .with_context("candidate `apiElements` has usage=java-runtime")
            .with_suggestion("Add a compatibility rule for `usage`");

        let output = diag.format(false);
        assert!(output.contains("error: no candidate matched"));
        assert!(output.contains("caused by: candidate `apiElements`"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Add a compatibility rule"));
    }

    #[test]
    fn test_from_report_uses_code_and_help() {
        let err = ModelError::AbstractType {
            type_name: "Component".to_string(),
        };
        let diag = Diagnostic::from_report(&err);
        assert_eq!(diag.code.as_deref(), Some("gantry::model::abstract_type"));
        assert_eq!(diag.suggestions.len(), 1);
        assert!(diag.format(false).starts_with("error[gantry::model::abstract_type]"));
    }

    #[test]
    fn test_from_anyhow_keeps_chain() {
        let err = anyhow::anyhow!("root cause").context("outer");
        let diag = Diagnostic::from_anyhow(&err);
        assert_eq!(diag.message, "outer");
        assert_eq!(diag.context, vec!["root cause".to_string()]);
    }
}

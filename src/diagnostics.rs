// src/diagnostics.rs
// Source positions, semantic diagnostics and the two fatal error channels.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(index: usize, line: usize, column: usize) -> Self {
        Self {
            index,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(self, other: SourceRange) -> SourceRange {
        SourceRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub range: SourceRange,
}

impl Diagnostic {
    pub fn error(range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            range,
        }
    }

    pub fn warning(range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            range,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{label} at {}: {}", self.range.start, self.message)
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Unrecoverable failure of the lex/parse phase: no tree is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatalError {
    Lexical { message: String, position: Position },
    Syntax { message: String, range: SourceRange },
}

impl FatalError {
    pub fn range(&self) -> SourceRange {
        match self {
            FatalError::Lexical { position, .. } => SourceRange::new(*position, *position),
            FatalError::Syntax { range, .. } => *range,
        }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::Lexical { message, position } => {
                write!(f, "lexical error at {position}: {message}")
            }
            FatalError::Syntax { message, range } => {
                write!(f, "syntax error at {}: {message}", range.start)
            }
        }
    }
}

impl std::error::Error for FatalError {}

/// Result channel of a full compilation.
#[derive(Debug, Clone)]
pub enum CompileError {
    Fatal(FatalError),
    Semantic(Vec<Diagnostic>),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Fatal(e) => write!(f, "{e}"),
            CompileError::Semantic(diagnostics) => {
                for (i, d) in diagnostics.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{d}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<FatalError> for CompileError {
    fn from(e: FatalError) -> Self {
        CompileError::Fatal(e)
    }
}

use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// Everything the parsers can notice about malformed input.
///
/// None of these are raised to callers of `filter` or `extract`; they are
/// surfaced through the `analyze`/`scan` entry points for operator visibility.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Issue {
    #[error("directive payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("directive payload must be a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("directive payload has no usable `name` field")]
    MissingName,
    #[error("directive `arguments` must be a JSON object, found {0}")]
    InvalidArguments(&'static str),
    #[error("directive block is never closed")]
    UnterminatedDirective,
    #[error("nested region start ignored; the enclosing region is still open")]
    NestedRegion,
    #[error("region end marker without an open region")]
    StrayRegionEnd,
    #[error("region is never closed; it extends to the end of the document")]
    UnterminatedRegion,
}

/// An [`Issue`] with source location information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub issue: Issue,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl Finding {
    pub fn error(issue: Issue, span: Range<usize>, file_id: usize) -> Self {
        Finding {
            issue,
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn warning(issue: Issue, span: Range<usize>, file_id: usize) -> Self {
        Finding {
            issue,
            span,
            file_id,
            severity: Severity::Warning,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn message(&self) -> String {
        self.issue.to_string()
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(self.message())
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

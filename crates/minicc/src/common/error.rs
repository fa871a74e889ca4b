//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Buffer, ColorChoice, StandardStream};
use thiserror::Error;
use super::Span;

/// Compile error with source location
///
/// The checker stops at the first violation, so a compilation produces at
/// most one of these.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span:?}: {message}")]
    Parser { message: String, span: Span },

    /// Name resolution failures (undeclared identifier, call of a non-function)
    #[error("Semantic error at {span:?}: {message}")]
    Semantic { message: String, span: Span },

    /// A void operand in an assignment, comparison or arithmetic expression
    #[error("Type error at {span:?}: {message}")]
    Type { message: String, span: Span },

    /// Trailing return statement does not match the declared return type
    #[error("Return error in function '{function}': {message}")]
    Return {
        function: String,
        message: String,
        span: Span,
    },

    #[error("Array error at {span:?}: {message}")]
    ArrayDimension { message: String, span: Span },

    /// Pointer-to or dereference of a type tag with no mapping
    #[error("Type mapping error at {span:?}: {message}")]
    TypeMapping { message: String, span: Span },

    #[error("Symbol table full: at most {limit} symbols")]
    Capacity { limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::Semantic {
            message: message.into(),
            span,
        }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::Type {
            message: message.into(),
            span,
        }
    }

    pub fn return_error(function: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self::Return {
            function: function.into(),
            message: message.into(),
            span,
        }
    }

    pub fn array(message: impl Into<String>, span: Span) -> Self {
        Self::ArrayDimension {
            message: message.into(),
            span,
        }
    }

    pub fn type_mapping(message: impl Into<String>) -> Self {
        Self::TypeMapping {
            message: message.into(),
            span: Span::default(),
        }
    }

    /// Source location of the error, if it has one
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lexer { span, .. }
            | CompileError::Parser { span, .. }
            | CompileError::Semantic { span, .. }
            | CompileError::Type { span, .. }
            | CompileError::Return { span, .. }
            | CompileError::ArrayDimension { span, .. }
            | CompileError::TypeMapping { span, .. } => Some(*span),
            CompileError::Capacity { .. } | CompileError::Io(_) => None,
        }
    }

    /// Attach a location to an error raised without one (type-tag mapping
    /// happens below the tree, so the caller knows the node)
    pub fn with_span(mut self, at: Span) -> Self {
        if let CompileError::TypeMapping { span, .. } = &mut self {
            if span.is_empty() {
                *span = at;
            }
        }
        self
    }

    fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let labelled = |title: &str, message: &str, span: &Span| {
            Diagnostic::error()
                .with_message(title)
                .with_labels(vec![
                    Label::primary(file_id, span.range()).with_message(message)
                ])
        };

        match self {
            CompileError::Lexer { message, span } => labelled("Lexer error", message, span),
            CompileError::Parser { message, span } => labelled("Syntax error", message, span),
            CompileError::Semantic { message, span } => labelled("Semantic error", message, span),
            CompileError::Type { message, span } => labelled("Type error", message, span),
            CompileError::Return { function, message, span } => {
                labelled("Return error", message, span)
                    .with_notes(vec![format!("in function `{}`", function)])
            }
            CompileError::ArrayDimension { message, span } => labelled("Array error", message, span),
            CompileError::TypeMapping { message, span } => labelled("Type error", message, span),
            CompileError::Capacity { limit } => Diagnostic::error()
                .with_message(format!("symbol table full: at most {} symbols", limit)),
            CompileError::Io(err) => {
                Diagnostic::error().with_message(format!("IO error: {}", err))
            }
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    /// Write the error to stderr
    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        let writer = StandardStream::stderr(ColorChoice::Auto);
        let diagnostic = error.to_diagnostic(file_id);
        let _ = term::emit(&mut writer.lock(), &self.config, &self.files, &diagnostic);
    }

    /// Render the error without color, e.g. for tests and logs
    pub fn render(&self, file_id: usize, error: &CompileError) -> String {
        let mut buffer = Buffer::no_color();
        let diagnostic = error.to_diagnostic(file_id);
        if term::emit(&mut buffer, &self.config, &self.files, &diagnostic).is_err() {
            return error.to_string();
        }
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reports_line_and_file() {
        let mut reporter = DiagnosticReporter::new();
        let source = "int x;\nvoid f() {\n  x = f();\n}\n";
        let file_id = reporter.add_file("prog.c", source);
        let start = source.find("x = f()").unwrap();
        let error = CompileError::type_error(
            "assign between two types that are not compatible",
            Span::new(start, start + 7),
        );

        let text = reporter.render(file_id, &error);
        assert!(text.contains("prog.c:3:3"), "{text}");
        assert!(text.contains("not compatible"));
    }

    #[test]
    fn test_return_error_names_function() {
        let mut reporter = DiagnosticReporter::new();
        let file_id = reporter.add_file("prog.c", "int f() { }");
        let error = CompileError::return_error("f", "missing return statement in function f", Span::new(0, 3));

        let text = reporter.render(file_id, &error);
        assert!(text.contains("in function `f`"), "{text}");
    }

    #[test]
    fn test_with_span_only_fills_type_mapping() {
        let located = CompileError::type_mapping("bad").with_span(Span::new(2, 5));
        assert_eq!(located.span(), Some(Span::new(2, 5)));

        let kept = CompileError::type_error("x", Span::new(1, 2)).with_span(Span::new(7, 8));
        assert_eq!(kept.span(), Some(Span::new(1, 2)));

        assert_eq!(CompileError::Capacity { limit: 4 }.span(), None);
    }
}

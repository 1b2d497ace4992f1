use crate::{
    language::errors::{SyntaxError, SyntaxErrors},
    runtime::RuntimeError,
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

/// One syntax error, pointing into the script it was found in.
#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: &'static str,
}

impl SyntaxDiagnostic {
    fn new(src: NamedSource<String>, err: &SyntaxError) -> Self {
        let label = if err.is_missing_token() {
            "expected here"
        } else {
            "here"
        };
        Self {
            src,
            span: err.span.into(),
            help: err.help.clone(),
            message: err.message.clone(),
            label,
        }
    }
}

/// Every syntax error of one script in a single report.
#[derive(Debug, Error, Diagnostic)]
#[error("{summary}")]
#[diagnostic(code(proto_chain::syntax))]
pub struct ScriptDiagnostic {
    summary: String,
    #[related]
    errors: Vec<SyntaxDiagnostic>,
}

impl ScriptDiagnostic {
    pub fn new(path: &Path, source: &str, errors: &SyntaxErrors) -> Self {
        let name = path.display().to_string();
        let summary = match errors.len() {
            1 => format!("{name} has 1 syntax error"),
            count => format!("{name} has {count} syntax errors"),
        };
        let src = NamedSource::new(name, source.to_string());
        Self {
            summary,
            errors: errors
                .iter()
                .map(|err| SyntaxDiagnostic::new(src.clone(), err))
                .collect(),
        }
    }
}

pub fn emit_syntax_errors(path: &Path, source: &str, errors: &SyntaxErrors) {
    let report = Report::new(ScriptDiagnostic::new(path, source, errors));
    eprintln!("{report:?}");
}

pub fn report_runtime_error(error: &RuntimeError) {
    eprintln!("Runtime error: {}", error);
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}

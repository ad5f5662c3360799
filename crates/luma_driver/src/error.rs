use std::path::PathBuf;

/// One diagnostic message, optionally pinned to a source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), file: None, line: None, column: None }
    }

    pub fn at(message: impl Into<String>, file: PathBuf, line: u32, column: u32) -> Self {
        Self { message: message.into(), file: Some(file), line: Some(line), column: Some(column) }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => {
                write!(f, "{}:{}:{}: {}", file.display(), line, col, self.message)
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Top-level failure a build stage can raise. Each variant carries the
/// stage's own error type so the original message survives unmangled;
/// `FatalRuntime` is reserved for conditions outside any one stage (a
/// linker binary missing from `$PATH`, an unreadable source file).
#[derive(Debug, thiserror::Error)]
pub enum LumaError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Lex(#[from] luma_frontend::LexError),
    #[error("{0}")]
    Parse(#[from] luma_frontend::ParseError),
    #[error("{0}")]
    UnresolvedImport(#[from] luma_frontend::UnresolvedImport),
    #[error("typecheck failed with {0} error(s)", .0.len())]
    Typecheck(Vec<luma_check::CheckError>),
    #[error("{0}")]
    Codegen(#[from] luma_codegen::CodegenError),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("link error: {0}")]
    Link(String),
    #[error("fatal: {0}")]
    FatalRuntime(String),
}

pub type LumaResult<T> = Result<T, LumaError>;

/// Accumulates diagnostics raised within a single stage. The driver polls
/// [`ErrorReporter::has_errors`] between stages and bails before starting
/// the next one rather than letting a broken module cascade into codegen.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let reporter = ErrorReporter::new();
        assert!(!reporter.has_errors());
    }

    #[test]
    fn accumulates_across_pushes() {
        let mut reporter = ErrorReporter::new();
        reporter.push(Diagnostic::new("first"));
        reporter.push(Diagnostic::at("second", PathBuf::from("a.luma"), 3, 1));
        assert!(reporter.has_errors());
        assert_eq!(reporter.diagnostics().len(), 2);
    }

    #[test]
    fn take_drains_and_resets() {
        let mut reporter = ErrorReporter::new();
        reporter.push(Diagnostic::new("oops"));
        let drained = reporter.take();
        assert_eq!(drained.len(), 1);
        assert!(!reporter.has_errors());
    }

    #[test]
    fn display_includes_location_when_present() {
        let d = Diagnostic::at("bad token", PathBuf::from("main.luma"), 10, 4);
        assert_eq!(d.to_string(), "main.luma:10:4: bad token");
    }
}

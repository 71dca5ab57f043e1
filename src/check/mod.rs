use std::ops::Range;

use ariadne::{ColorGenerator, Label, Report, ReportKind};

use crate::codegen::LoweringError;
use crate::ir::Span;
use crate::parser::ParseError;

pub mod constraints;
pub mod errors;
pub mod rules;
pub mod symbols;
pub mod verifier;

pub use constraints::{ConstraintViolation, ViolationKind};
pub use errors::{SymbolResolutionError, VerificationError, VerifyErrorKind};
pub use symbols::{Symbol, SymbolKind, SymbolTable};
pub use verifier::{VerifiedModule, VerifyCtx, verify_module};

#[derive(Debug, Clone)]
pub struct FileSpan {
    pub span: Range<usize>,
    pub path: String,
}

impl FileSpan {
    pub fn new(path: String, span: Range<usize>) -> Self {
        Self { path, span }
    }

    /// Errors raised on operations built without a source location point at
    /// the start of the file.
    fn of(path: &str, span: Option<Span>) -> Self {
        Self::new(path.to_string(), span.map(Range::from).unwrap_or(0..0))
    }
}

impl ariadne::Span for FileSpan {
    type SourceId = String;

    fn source(&self) -> &Self::SourceId {
        &self.path
    }

    fn start(&self) -> usize {
        self.span.start
    }

    fn end(&self) -> usize {
        self.span.end
    }
}

/// Creates a report from a parse error.
pub fn parse_error_to_report(path: &str, error: &ParseError) -> Report<'static, FileSpan> {
    let mut colors = ColorGenerator::new();
    colors.next();
    let filespan = FileSpan::of(path, Some(error.span));
    Report::build(ReportKind::Error, filespan.clone())
        .with_code(error.kind.code())
        .with_label(
            Label::new(filespan)
                .with_message(error.kind.to_string())
                .with_color(colors.next()),
        )
        .with_message("Failed to parse module.")
        .finish()
}

/// Creates a report from a verification error.
pub fn verification_error_to_report(
    path: &str,
    error: &VerificationError,
) -> Report<'static, FileSpan> {
    let mut colors = ColorGenerator::new();
    colors.next();
    let filespan = FileSpan::of(path, error.span);
    let mut report = Report::build(ReportKind::Error, filespan.clone())
        .with_code("VerificationFailed")
        .with_label(
            Label::new(filespan)
                .with_message(format!("'{}' op {}", error.op, error.kind))
                .with_color(colors.next()),
        );

    if let VerifyErrorKind::Symbol(SymbolResolutionError::Unresolved { name }) = &error.kind {
        report = report.with_note(format!("declare @{name} with llvm.global or llvm.func"));
    }
    report.finish()
}

/// Creates a report from a lowering error.
pub fn lowering_error_to_report(path: &str, error: &LoweringError) -> Report<'static, FileSpan> {
    let mut colors = ColorGenerator::new();
    colors.next();
    let filespan = FileSpan::of(path, error.span);
    Report::build(ReportKind::Error, filespan.clone())
        .with_code("LoweringFailed")
        .with_label(
            Label::new(filespan)
                .with_message(format!("'{}' {}", error.op, error.kind))
                .with_color(colors.next()),
        )
        .with_message(format!("Function @{} was not lowered.", error.function))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    fn render(report: Report<'static, FileSpan>, path: &str, source: &str) -> String {
        let mut out = Vec::new();
        report
            .write(
                (path.to_string(), ariadne::Source::from(source.to_string())),
                &mut out,
            )
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_errors_carry_their_code() {
        let source = "llvm.func @f() {\n  llvm.bogus\n}\n";
        let error = parse_module(source).unwrap_err();
        let text = render(parse_error_to_report("f.mlir", &error), "f.mlir", source);
        assert!(text.contains("UnknownMnemonic"));
        assert!(text.contains("f.mlir"));
    }

    #[test]
    fn unresolved_symbols_get_a_note() {
        let source = "llvm.func @f() -> ptr<i32> {\n  %0 = llvm.mlir.addressof @missing : ptr<i32>\n  llvm.return %0 : ptr<i32>\n}\n";
        let module = parse_module(source).unwrap();
        let error = verify_module(&module).unwrap_err();
        let text = render(verification_error_to_report("f.mlir", &error), "f.mlir", source);
        assert!(text.contains("@missing"));
        assert!(text.contains("llvm.global or llvm.func"));
    }
}

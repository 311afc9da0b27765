// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! User-facing diagnostics raised while processing contracts.

use crate::{
    ast::{FileId, MethodDecl},
    error::ContractParseError,
};
use codespan_reporting::{
    diagnostic::{Diagnostic, Label, Severity},
    files::SimpleFiles,
    term::{self, termcolor::WriteColor},
};

pub const CONTRACT_PARSE_ERROR: &str = "flowexpr.parse.error";

/// Builds the diagnostic for a precondition whose expression does not resolve
/// at the method declaration.
pub fn contract_parse_diagnostic(
    method: &MethodDecl,
    error: &ContractParseError,
) -> Diagnostic<FileId> {
    let span = &method.syntax.span;
    Diagnostic::new(Severity::Error)
        .with_code(CONTRACT_PARSE_ERROR)
        .with_message(format!(
            "cannot resolve contract expression `{}` of `{}`",
            error.expression, method.name
        ))
        .with_labels(vec![
            Label::primary(span.file_id, span.range.clone()).with_message(error.reason.clone()),
        ])
}

/// Writes diagnostics of the given or higher severity to `dest`.
pub fn report_diagnostics<W: WriteColor>(
    dest: &mut W,
    files: &SimpleFiles<String, String>,
    diags: &[Diagnostic<FileId>],
    severity: Severity,
) -> Result<(), codespan_reporting::files::Error> {
    let config = term::Config::default();
    for diag in diags.iter().filter(|d| d.severity >= severity) {
        term::emit(dest, &config, files, diag)?;
    }
    Ok(())
}

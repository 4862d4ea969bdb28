// Copyright 2025 Cornell University
// released under MIT License
// author: Kevin Laeufer <laeufer@cornell.edu>

use std::collections::HashSet;
use std::io::Write;

use codespan_reporting::diagnostic::{
    Diagnostic as CodespanDiagnostic, Label as CodespanLabel, LabelStyle, Severity,
};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Buffer, Color, ColorChoice, ColorSpec, WriteColor};

use crate::errors::TheoryError;
use crate::logic::{ExprId, Module};

/// Severity of diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

/// A label representing a part of the source code
#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    message: Option<String>,
    range: (usize, usize),
}

impl Label {
    fn to_codespan_label(&self, fileid: usize) -> CodespanLabel<usize> {
        CodespanLabel::new(LabelStyle::Primary, fileid, self.range.0..self.range.1)
            .with_message(self.message.clone().unwrap_or_default())
    }
}

/// Diagnostic of a particular part of source code
struct Diagnostic {
    title: String,
    message: String,
    level: Level,
    location: Option<(usize, Label)>,
}

impl Diagnostic {
    fn emit(&self, buffer: &mut Buffer, files: &SimpleFiles<String, String>) {
        if let Some((fileid, label)) = &self.location {
            let severity = match self.level {
                Level::Error => Severity::Error,
                Level::Warning => Severity::Warning,
            };

            let diagnostic = CodespanDiagnostic::new(severity)
                .with_message(&self.message)
                .with_labels(vec![label.to_codespan_label(*fileid)]);

            let config = term::Config::default();
            term::emit(buffer, &config, files, &diagnostic).expect("Failed to write diagnostic");
        } else {
            let color = match self.level {
                Level::Error => Color::Red,
                Level::Warning => Color::Yellow,
            };

            buffer
                .set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))
                .expect("Failed to set color");
            writeln!(buffer, "{}", self.title).expect("Failed to write title");

            buffer
                .set_color(&ColorSpec::new())
                .expect("Failed to reset color");
        }
    }
}

pub struct DiagnosticHandler {
    files: SimpleFiles<String, String>,
    reported_errs: HashSet<ExprId>,
    error_string: String,
    /// `color_choice` indicates whether to emit error messages w/ ANSI colors
    color_choice: ColorChoice,
}

impl Default for DiagnosticHandler {
    /// Default `DiagnosticHandler` does not emit colored error messages
    fn default() -> Self {
        Self::new(ColorChoice::Never)
    }
}

impl DiagnosticHandler {
    pub fn new(color_choice: ColorChoice) -> Self {
        Self {
            files: SimpleFiles::new(),
            reported_errs: HashSet::new(),
            error_string: String::new(),
            color_choice,
        }
    }

    /// Creates a buffer for error diagnostics
    /// (different buffers are created based on whether we want colors or not)
    fn create_buffer(&self) -> Buffer {
        if self.color_choice == ColorChoice::Never {
            Buffer::no_color()
        } else {
            Buffer::ansi()
        }
    }

    pub fn add_file(&mut self, name: String, content: String) -> usize {
        self.files.add(name, content)
    }

    pub fn error_string(&self) -> &str {
        &self.error_string
    }

    /// Emits a diagnostic anchored at an expression, when the expression
    /// carries a source location.
    pub fn emit_diagnostic_expr(
        &mut self,
        module: &Module,
        expr_id: &ExprId,
        message: &str,
        level: Level,
    ) {
        // need to check errors to avoid recursive duplication of error message
        if !self.reported_errs.insert(*expr_id) {
            return;
        }
        let mut buffer = self.create_buffer();
        if let Some((start, end, fileid)) = module.get_expr_loc(*expr_id) {
            let label = Label {
                message: Some(message.to_string()),
                range: (start, end),
            };

            let diagnostic = Diagnostic {
                title: format!("{:?} in file {}", level, fileid),
                message: message.to_string(),
                level,
                location: Some((fileid, label)),
            };

            diagnostic.emit(&mut buffer, &self.files);

            let error_msg = String::from_utf8_lossy(buffer.as_slice());
            self.error_string.push_str(&error_msg);
            print!("{}", error_msg);
        }
    }

    pub fn emit_general_message(&mut self, message: &str, level: Level) {
        let buffer = &mut self.create_buffer();
        let diagnostic = Diagnostic {
            title: format!("{:?}: {}", level, message),
            message: message.to_string(),
            level,
            location: None,
        };

        diagnostic.emit(buffer, &self.files);

        let error_msg = String::from_utf8_lossy(buffer.as_slice());
        self.error_string.push_str(&error_msg);
        print!("{}", error_msg);
    }

    /// Reports a structural registration error. Parameter-type errors are
    /// anchored at the offending type expression when it carries a source
    /// location; everything else becomes a general message.
    pub fn emit_theory_error(&mut self, module: &Module, error: &TheoryError) {
        match error {
            TheoryError::BadParameterType { ty, .. } if module.get_expr_loc(*ty).is_some() => {
                self.emit_diagnostic_expr(module, ty, &error.to_string(), Level::Error);
            }
            _ => self.emit_general_message(&error.to_string(), Level::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strip_ansi_escapes::strip_str;

    #[test]
    fn labeled_diagnostic_points_at_the_expression() {
        let mut m = Module::new();
        let mut handler = DiagnosticHandler::new(ColorChoice::Never);
        let file_id = handler.add_file(
            "counters.act".to_string(),
            "action Inc [p: val.succ] { val' = p }\n".to_string(),
        );

        let bad_ty = m.var("val.succ");
        m.add_expr_loc(bad_ty, 15, 23, file_id);

        let err = TheoryError::BadParameterType {
            action: "Inc".to_string(),
            param: "p".to_string(),
            ty: bad_ty,
        };
        handler.emit_theory_error(&m, &err);

        let content = strip_str(handler.error_string());
        assert!(content.contains("counters.act"));
        assert!(content.contains("val.succ"));
        assert!(content.contains("must be typed by a simple signature reference"));
    }

    #[test]
    fn duplicate_reports_for_one_expression_are_suppressed() {
        let mut m = Module::new();
        let mut handler = DiagnosticHandler::default();
        let file_id = handler.add_file("a.act".to_string(), "xyz\n".to_string());
        let e = m.var("x");
        m.add_expr_loc(e, 0, 3, file_id);

        handler.emit_diagnostic_expr(&m, &e, "first", Level::Error);
        let len_after_first = handler.error_string().len();
        handler.emit_diagnostic_expr(&m, &e, "second", Level::Error);
        assert_eq!(handler.error_string().len(), len_after_first);
    }

    #[test]
    fn general_messages_carry_the_error_text() {
        let m = Module::new();
        let mut handler = DiagnosticHandler::default();
        let err = TheoryError::DuplicateAction("Inc".to_string());
        handler.emit_theory_error(&m, &err);
        let content = strip_str(handler.error_string());
        assert!(content.contains("action 'Inc' is already registered"));
    }
}

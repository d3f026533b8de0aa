//! Rendering of compile and runtime errors for the terminal.

use colored::Colorize;

use crate::{CompileError, backend::interpreter::RuntimeError, frontend::Span};

/// Formats an error the way it is shown to the user. With the
/// `error-backtrace` feature, lowering errors also name the place in the
/// compiler which raised them.
pub fn render_compile_error(error: &CompileError) -> String {
    match error {
        CompileError::Frame(error) => render("error", &error.to_string(), None),
        CompileError::Lower(error) => {
            let message = render("error", &error.kind.to_string(), Some(error.span));

            match error.backtrace() {
                Some(origin) => format!("{message}\n{}: {}", "backtrace".blue(), origin.white()),
                None => message,
            }
        }
    }
}

pub fn render_runtime_error(error: &RuntimeError) -> String {
    render("runtime error", &error.to_string(), None)
}

fn render(severity: &str, message: &str, span: Option<Span>) -> String {
    match span {
        Some(span) => format!("{}: {message} (at {span})", severity.red().bold()),
        None => format!("{}: {message}", severity.red().bold()),
    }
}

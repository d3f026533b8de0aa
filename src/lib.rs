//! Backend of the PINS compiler: frame layout, IR generation and an IR
//! interpreter for fully resolved and type checked programs.

use thiserror::Error;
use tracing::debug;

use crate::{
    backend::{
        ir::Program,
        lowering::{LowerError, lower_program},
    },
    frontend::ast::Defs,
    middle::{
        annotations::Annotations,
        frame::{FrameError, evaluate_frames},
    },
};

pub mod backend;
pub mod demos;
pub mod diagnostic;
pub mod frontend;
pub mod index;
pub mod middle;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Lower(#[from] LowerError),
}

/// Lays out frames and lowers the program to linear IR. Execution starts in
/// the top level function called `entry`.
pub fn compile(
    defs: &Defs,
    annotations: &Annotations,
    entry: &str,
) -> Result<Program, CompileError> {
    let layout = evaluate_frames(defs, annotations)?;
    debug!(
        frames = layout.frames.len(),
        accesses = layout.accesses.len(),
        "evaluated frames"
    );

    Ok(lower_program(defs, annotations, layout, entry)?)
}
